#![forbid(unsafe_code)]

pub mod ingest_service_impl;
pub mod key_index;
pub mod reprocessor;
pub mod retry;
