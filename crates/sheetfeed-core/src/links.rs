//! Hypermedia links advertised by feeds and entries
//!
//! The service is navigated by following `<link rel=".." href=".."/>`
//! elements rather than by building URLs. A [`LinkTable`] holds every link of
//! one document keyed by its `rel`; [`Relation`] names the handful of
//! relations the client actually follows.

use ahash::AHashMap;
use std::fmt;

use crate::error::{Error, Result};

/// A link relation the client follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// `self`: the canonical URL of the resource
    SelfLink,
    /// `edit`: where updates and deletes are sent
    Edit,
    /// `content`: the `src` of an entry's `<content>` (the worksheets feed of
    /// a spreadsheet, the list feed of a worksheet)
    Content,
    /// The feed's own URL
    Feed,
    /// The feed's batch endpoint
    Batch,
    /// Where new entries are posted
    Post,
    /// A worksheet's cells feed
    CellsFeed,
    /// A worksheet's list (row) feed
    ListFeed,
}

impl Relation {
    /// The `rel` attribute value used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::SelfLink => "self",
            Relation::Edit => "edit",
            Relation::Content => "content",
            Relation::Feed => "http://schemas.google.com/g/2005#feed",
            Relation::Batch => "http://schemas.google.com/g/2005#batch",
            Relation::Post => "http://schemas.google.com/g/2005#post",
            Relation::CellsFeed => "http://schemas.google.com/spreadsheets/2006#cellsfeed",
            Relation::ListFeed => "http://schemas.google.com/spreadsheets/2006#listfeed",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relation name to URL mapping for one feed or entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkTable {
    links: AHashMap<String, String>,
}

impl LinkTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a link, replacing any earlier link with the same relation
    pub fn set(&mut self, relation: impl Into<String>, url: impl Into<String>) {
        self.links.insert(relation.into(), url.into());
    }

    /// Look up a link by its raw relation name
    pub fn get(&self, relation: &str) -> Result<&str> {
        self.links
            .get(relation)
            .map(String::as_str)
            .ok_or_else(|| Error::LinkNotFound(relation.to_string()))
    }

    /// Look up a link by typed relation
    pub fn relation(&self, relation: Relation) -> Result<&str> {
        self.get(relation.as_str())
    }

    /// Check whether a relation was advertised
    pub fn contains(&self, relation: &str) -> bool {
        self.links.contains_key(relation)
    }

    /// Number of links in the table
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Iterate over `(relation, url)` pairs in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.links.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn self_link(&self) -> Result<&str> {
        self.relation(Relation::SelfLink)
    }

    pub fn edit(&self) -> Result<&str> {
        self.relation(Relation::Edit)
    }

    pub fn content(&self) -> Result<&str> {
        self.relation(Relation::Content)
    }

    pub fn feed(&self) -> Result<&str> {
        self.relation(Relation::Feed)
    }

    pub fn batch(&self) -> Result<&str> {
        self.relation(Relation::Batch)
    }

    pub fn post(&self) -> Result<&str> {
        self.relation(Relation::Post)
    }

    pub fn cells_feed(&self) -> Result<&str> {
        self.relation(Relation::CellsFeed)
    }

    pub fn list_feed(&self) -> Result<&str> {
        self.relation(Relation::ListFeed)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LinkTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = LinkTable::new();
        for (rel, href) in iter {
            table.set(rel, href);
        }
        table
    }
}
