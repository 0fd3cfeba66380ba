//! Async client for the Atom-based spreadsheet feed service.
//!
//! The service exposes spreadsheets, worksheets, cells and list rows as Atom
//! feeds. Every resource advertises the URLs of related resources as links,
//! so the client discovers endpoints as it goes instead of building them.
//!
//! # Architecture
//!
//! - **Transport** (`transport.rs`): the [`HttpClient`] seam and the
//!   [`RetryingTransport`] that retries transient failures
//! - **Auth** (`auth.rs`): login form and token extraction
//! - **Session** (`session.rs`): the [`SpreadsheetSession`] state machine
//!   that tracks the token, selected spreadsheet and selected worksheet
//! - **Http** (`http.rs`, feature `reqwest`): the default [`HttpClient`]
//!
//! XML parsing, addressing and request bodies live in `sheetfeed-core`.
//!
//! # Example
//!
//! ```rust,no_run
//! use sheetfeed_client::{ReqwestClient, RowRecord, SessionConfig, SpreadsheetSession};
//!
//! # async fn example() -> sheetfeed_client::Result<()> {
//! let client = ReqwestClient::new()?;
//! let mut session = SpreadsheetSession::new(client, SessionConfig::default());
//!
//! session.authenticate("ann@example.com", "secret").await?;
//! session.select_spreadsheet("Budget").await?;
//! session.select_worksheet("2024", Some(&["Month", "Total"])).await?;
//!
//! let mut row = RowRecord::new();
//! row.insert("Month", "March");
//! row.insert("Total", "1200");
//! session.insert_row(&row).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
#[cfg(feature = "reqwest")]
pub mod http;
pub mod session;
pub mod transport;

// Re-export key types
pub use config::SessionConfig;
pub use error::{BatchFailure, Result, SheetsError, TransportError};
#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
pub use session::{CellQuery, SessionState, SpreadsheetSession};
pub use transport::{HttpClient, HttpRequest, HttpResponse, Method, RetryPolicy, RetryingTransport};

pub use sheetfeed_core::{
    CellAddress, CellGrid, ColumnMap, RowRecord, SpreadsheetInfo, WorksheetInfo,
};
