//! # sheetfeed-core
//!
//! Protocol-level building blocks for the sheetfeed spreadsheet client.
//! Nothing in this crate performs I/O:
//! - [`CellAddress`] and the [`address`] functions - A1 / R1C1 addressing
//! - [`LinkTable`] and [`Relation`] - hypermedia links advertised by the service
//! - [`Document`], [`Feed`], [`Entry`] - parsed Atom responses
//! - [`model`] - spreadsheet, worksheet, cell, row and batch views of entries
//! - [`request`] - XML bodies for the write operations
//!
//! ## Example
//!
//! ```rust
//! use sheetfeed_core::{request, CellAddress, Entry, GS_NS};
//!
//! let address = CellAddress::parse("B3").unwrap();
//! let body = request::update_cell("https://example.test/cells", address, "42");
//!
//! let entry = Entry::parse(body.as_bytes()).unwrap();
//! let cell = entry.element().child(GS_NS, "cell").unwrap();
//! assert_eq!(cell.attr("inputValue"), Some("42"));
//! ```

pub mod address;
pub mod error;
pub mod feed;
pub mod links;
pub mod model;
pub mod request;
pub mod xml;

// Re-exports for convenience
pub use address::{column_to_letters, letters_to_column, to_a1, to_r1c1, CellAddress};
pub use error::{Error, Result};
pub use feed::{Author, Document, Entry, Feed, Metadata};
pub use links::{LinkTable, Relation};
pub use model::{
    BatchResult, CellEntry, CellGrid, ColumnMap, ListRow, RowRecord, SpreadsheetInfo,
    WorksheetInfo,
};
pub use xml::{ATOM_NS, BATCH_NS, GSX_NS, GS_NS};
