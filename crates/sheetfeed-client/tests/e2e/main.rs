//! End-to-end tests for sheetfeed-client.
//!
//! Each test drives a [`SpreadsheetSession`](sheetfeed_client::SpreadsheetSession)
//! against `MockService`, a scripted feed service that answers by method and
//! URL and records every request, then asserts on the session's results and
//! on the requests it sent.

mod common;
mod reading;
mod retry;

// Re-export common utilities for submodules
pub use common::*;
