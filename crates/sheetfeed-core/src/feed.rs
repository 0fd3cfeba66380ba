//! Feed and entry documents
//!
//! Every response of the service is either an Atom `<feed>` holding entries or
//! a single `<entry>`. [`Document::parse`] accepts both; [`Entry::parse`]
//! yields the first entry wherever it sits, and reports [`Error::NoEntry`]
//! when a feed is empty (the "does not exist yet" answer to a title query).

use chrono::{DateTime, FixedOffset};

use crate::error::{Error, Result};
use crate::links::LinkTable;
use crate::xml::{self, Element, ATOM_NS};

/// Author of a feed or entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    pub email: Option<String>,
}

/// Metadata shared by feeds and entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Last path segment of the `<id>` URI
    pub id: Option<String>,
    pub title: Option<String>,
    pub updated: Option<DateTime<FixedOffset>>,
    pub author: Option<Author>,
}

impl Metadata {
    fn from_element(element: &Element) -> Result<Self> {
        let id = element
            .child_text(ATOM_NS, "id")
            .map(last_path_segment)
            .filter(|id| !id.is_empty());

        let title = element.child_text(ATOM_NS, "title").map(str::to_string);

        // An unreadable timestamp is dropped, not an error
        let updated = element.child_text(ATOM_NS, "updated").and_then(|text| {
            match DateTime::parse_from_rfc3339(text.trim()) {
                Ok(updated) => Some(updated),
                Err(e) => {
                    tracing::warn!("Ignoring unreadable updated timestamp {:?}: {e}", text.trim());
                    None
                }
            }
        });

        let author = element.child(ATOM_NS, "author").map(|author| Author {
            name: author
                .child_text(ATOM_NS, "name")
                .unwrap_or_default()
                .to_string(),
            email: author.child_text(ATOM_NS, "email").map(str::to_string),
        });

        Ok(Self {
            id,
            title,
            updated,
            author,
        })
    }
}

/// One entry: a spreadsheet, worksheet, cell or list row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub meta: Metadata,
    pub links: LinkTable,
    /// Text of an inline `<content>` element
    pub content: Option<String>,
    element: Element,
}

impl Entry {
    /// Parse a response and return its first entry
    pub fn parse(input: &[u8]) -> Result<Self> {
        Document::parse(input)?.first_entry()
    }

    pub(crate) fn from_element(element: Element) -> Result<Self> {
        let meta = Metadata::from_element(&element)?;
        let links = collect_links(&element);
        let content = element
            .child(ATOM_NS, "content")
            .filter(|c| c.attr("src").is_none())
            .map(|c| c.text.clone());

        Ok(Self {
            meta,
            links,
            content,
            element,
        })
    }

    /// The underlying element, for extension namespaces
    pub fn element(&self) -> &Element {
        &self.element
    }
}

/// A feed with its own links and its entries in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub meta: Metadata,
    pub links: LinkTable,
    pub entries: Vec<Entry>,
}

impl Feed {
    /// Parse a response whose root must be `<feed>`
    pub fn parse(input: &[u8]) -> Result<Self> {
        match Document::parse(input)? {
            Document::Feed(feed) => Ok(feed),
            Document::Entry(_) => Err(Error::Parse("expected <feed> root, found <entry>".into())),
        }
    }

    fn from_element(element: Element) -> Result<Self> {
        let meta = Metadata::from_element(&element)?;
        let links = collect_links(&element);

        let mut entries = Vec::new();
        for child in element.children {
            if child.is(ATOM_NS, "entry") {
                entries.push(Entry::from_element(child)?);
            }
        }

        Ok(Self {
            meta,
            links,
            entries,
        })
    }
}

/// A parsed response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Document {
    Feed(Feed),
    Entry(Entry),
}

impl Document {
    /// Parse a `<feed>` or `<entry>` document
    pub fn parse(input: &[u8]) -> Result<Self> {
        let root = xml::parse(input)?;

        if root.is(ATOM_NS, "feed") {
            Ok(Document::Feed(Feed::from_element(root)?))
        } else if root.is(ATOM_NS, "entry") {
            Ok(Document::Entry(Entry::from_element(root)?))
        } else {
            Err(Error::Parse(format!(
                "expected Atom <feed> or <entry>, found <{}>",
                root.name
            )))
        }
    }

    /// The first entry of a feed, or the entry itself
    pub fn first_entry(self) -> Result<Entry> {
        match self {
            Document::Feed(feed) => feed.entries.into_iter().next().ok_or(Error::NoEntry),
            Document::Entry(entry) => Ok(entry),
        }
    }

    /// Links of the root element
    pub fn links(&self) -> &LinkTable {
        match self {
            Document::Feed(feed) => &feed.links,
            Document::Entry(entry) => &entry.links,
        }
    }
}

/// Collect `<link rel href>` children plus `<content src>` into a table
fn collect_links(element: &Element) -> LinkTable {
    let mut links = LinkTable::new();

    for link in element.children_named(ATOM_NS, "link") {
        if let (Some(rel), Some(href)) = (link.attr("rel"), link.attr("href")) {
            links.set(rel, href);
        }
    }

    if let Some(src) = element
        .child(ATOM_NS, "content")
        .and_then(|content| content.attr("src"))
    {
        links.set("content", src);
    }

    links
}

fn last_path_segment(uri: &str) -> String {
    uri.trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}
