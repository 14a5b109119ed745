use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::IngestError;

/// Content types accepted on the ingest endpoint.
///
/// Serialized as the literal MIME string so stored entries remain readable
/// with any JSON tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    #[serde(rename = "application/x-protobuf")]
    Protobuf,
    #[serde(rename = "application/vnd.google.protobuf")]
    GoogleProtobuf,
    #[serde(rename = "application/json")]
    Json,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Protobuf => "application/x-protobuf",
            Self::GoogleProtobuf => "application/vnd.google.protobuf",
            Self::Json => "application/json",
        }
    }

    /// Parse a `Content-Type` header value. Returns `None` for anything
    /// other than the three supported types (exact match, no parameters).
    pub fn from_header(value: &str) -> Option<Self> {
        match value {
            "application/x-protobuf" => Some(Self::Protobuf),
            "application/vnd.google.protobuf" => Some(Self::GoogleProtobuf),
            "application/json" => Some(Self::Json),
            _ => None,
        }
    }

    /// The canonical persisted form. Both protobuf spellings normalize to
    /// `application/x-protobuf`; JSON payloads are re-encoded to protobuf
    /// before storage, so stored entries are always protobuf.
    pub fn canonical(self) -> Self {
        match self {
            Self::Protobuf | Self::GoogleProtobuf | Self::Json => Self::Protobuf,
        }
    }

    pub fn is_protobuf(self) -> bool {
        matches!(self, Self::Protobuf | Self::GoogleProtobuf)
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit of durability: one OTLP logs payload plus the metadata needed
/// to replay it.
///
/// Stored as JSON with an RFC-3339 timestamp and a base64 body. The body
/// always holds the canonical protobuf encoding regardless of the ingest
/// content type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditLogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub content_type: ContentType,
    #[serde(with = "base64_bytes")]
    pub body: Vec<u8>,
}

impl AuditLogEntry {
    /// Create a fresh entry with a v4 UUID id and the current wall clock.
    pub fn new(content_type: ContentType, body: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            content_type: content_type.canonical(),
            body,
        }
    }

    /// Serialize to the stored JSON form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, IngestError> {
        serde_json::to_vec(self)
            .map_err(|e| IngestError::BadPayload(format!("entry encode failed: {e}")))
    }

    /// Deserialize from the stored JSON form. Unknown fields and malformed
    /// base64 are rejected.
    pub fn from_bytes(data: &[u8]) -> Result<Self, IngestError> {
        serde_json::from_slice(data)
            .map_err(|e| IngestError::BadPayload(format!("entry decode failed: {e}")))
    }

}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entry_has_uuid_and_canonical_type() {
        let entry = AuditLogEntry::new(ContentType::Json, b"payload".to_vec());
        assert_eq!(entry.content_type, ContentType::Protobuf);
        assert_eq!(Uuid::parse_str(&entry.id).unwrap().get_version_num(), 4);
        assert_eq!(entry.body, b"payload");
    }

    #[test]
    fn google_protobuf_normalizes() {
        let entry = AuditLogEntry::new(ContentType::GoogleProtobuf, vec![1, 2, 3]);
        assert_eq!(entry.content_type, ContentType::Protobuf);
    }

    #[test]
    fn codec_round_trips() {
        let entry = AuditLogEntry::new(ContentType::Protobuf, vec![0x0a, 0x03, 0xff, 0x00, 0x7f]);
        let data = entry.to_bytes().unwrap();
        let decoded = AuditLogEntry::from_bytes(&data).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn stored_form_uses_mime_string_and_base64() {
        let entry = AuditLogEntry::new(ContentType::Protobuf, b"hello".to_vec());
        let json: serde_json::Value = serde_json::from_slice(&entry.to_bytes().unwrap()).unwrap();
        assert_eq!(json["content_type"], "application/x-protobuf");
        assert_eq!(json["body"], "aGVsbG8=");
        // RFC-3339 timestamp
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn unknown_fields_rejected() {
        let data = br#"{"id":"a","timestamp":"2026-01-01T00:00:00Z","content_type":"application/x-protobuf","body":"aGk=","extra":1}"#;
        let err = AuditLogEntry::from_bytes(data).unwrap_err();
        assert!(matches!(err, IngestError::BadPayload(_)));
    }

    #[test]
    fn malformed_base64_rejected() {
        let data = br#"{"id":"a","timestamp":"2026-01-01T00:00:00Z","content_type":"application/x-protobuf","body":"!!not-base64!!"}"#;
        let err = AuditLogEntry::from_bytes(data).unwrap_err();
        assert!(matches!(err, IngestError::BadPayload(_)));
    }

    #[test]
    fn unknown_content_type_rejected() {
        assert_eq!(ContentType::from_header("text/plain"), None);
        assert_eq!(ContentType::from_header("application/json; charset=utf-8"), None);
        assert_eq!(
            ContentType::from_header("application/vnd.google.protobuf"),
            Some(ContentType::GoogleProtobuf)
        );
    }

    #[test]
    fn timestamp_round_trips_with_nanosecond_precision() {
        let mut entry = AuditLogEntry::new(ContentType::Protobuf, vec![]);
        entry.timestamp = "2026-03-01T12:00:00.123456789Z".parse().unwrap();
        let decoded = AuditLogEntry::from_bytes(&entry.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.timestamp, entry.timestamp);
    }
}
