pub mod log_consumer;
pub mod otlp_http_consumer;
