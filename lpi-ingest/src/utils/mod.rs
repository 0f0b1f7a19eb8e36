//! Utility modules for lpi-ingest

pub mod retry;

pub use retry::{invoke_with_retry, Classify, FailureClass, RetryPolicy};
