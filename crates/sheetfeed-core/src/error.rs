//! Error types for sheetfeed-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while addressing cells or reading/building feeds
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid cell address (non-positive row/column or malformed A1 text)
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Malformed XML document
    #[error("XML parse error: {0}")]
    Parse(String),

    /// The feed did not contain the expected entry
    #[error("No entry in feed")]
    NoEntry,

    /// An element required by the caller was absent from the entry
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// The service did not advertise a link with this relation
    #[error("Link not advertised: {0}")]
    LinkNotFound(String),

    /// A column name that cannot be turned into a list-feed element name
    #[error("Invalid column name: {0:?}")]
    InvalidColumnName(String),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Parse(err.to_string())
    }
}
