//! Atom request bodies for the write operations
//!
//! Every user-supplied string (titles, values, URLs echoed back as ids) goes
//! through [`escape`] before it is embedded, so the bodies are well-formed
//! whatever the caller passes in.

use std::fmt::Write;

use quick_xml::escape::escape;

use crate::address::CellAddress;
use crate::error::{Error, Result};
use crate::model::{list_column_tag, CellGrid, RowRecord};
use crate::xml::{ATOM_NS, BATCH_NS, GSX_NS, GS_NS};

/// Body for a new worksheet with one (header) row
pub fn create_worksheet(title: &str, column_count: u32) -> String {
    format!(
        r#"<entry xmlns="{ATOM_NS}" xmlns:gs="{GS_NS}">
    <title>{}</title>
    <gs:rowCount>1</gs:rowCount>
    <gs:colCount>{}</gs:colCount>
</entry>
"#,
        escape(title),
        column_count
    )
}

/// Body for a new list-feed row: one `gsx:` element per column
pub fn insert_row(record: &RowRecord) -> Result<String> {
    if record.is_empty() {
        return Err(Error::InvalidColumnName(String::new()));
    }

    let mut xml = format!(r#"<entry xmlns="{ATOM_NS}" xmlns:gsx="{GSX_NS}">"#);
    xml.push('\n');

    for (column, value) in record.iter() {
        let tag = list_column_tag(column)?;
        let _ = writeln!(xml, "    <gsx:{tag}>{}</gsx:{tag}>", escape(value));
    }

    xml.push_str("</entry>\n");
    Ok(xml)
}

/// Body for a single cell update posted to the cells feed
pub fn update_cell(cell_feed_url: &str, address: CellAddress, value: &str) -> String {
    let cell_url = cell_resource(cell_feed_url, address);

    format!(
        r#"<entry xmlns="{ATOM_NS}" xmlns:gs="{GS_NS}">
    <id>{id}</id>
    <link rel="edit" type="application/atom+xml" href="{id}"/>
    {cell}
</entry>
"#,
        id = escape(&cell_url),
        cell = cell_element(address, value),
    )
}

/// Body for a batch of cell updates, one entry per cell tagged by A1 address
pub fn batch_update_cells(batch_url: &str, cell_feed_url: &str, cells: &CellGrid) -> Result<String> {
    let mut xml = format!(
        r#"<feed xmlns="{ATOM_NS}" xmlns:batch="{BATCH_NS}" xmlns:gs="{GS_NS}">
    <id>{}</id>
"#,
        escape(batch_url)
    );

    for (&row, columns) in cells {
        for (&col, value) in columns {
            let address = CellAddress::new(row, col)?;
            let a1 = address.to_a1_string();
            let cell_url = cell_resource(cell_feed_url, address);

            let _ = write!(
                xml,
                r#"    <entry>
        <batch:id>{a1}</batch:id>
        <batch:operation type="update"/>
        <title type="text">{a1}</title>
        <id>{id}</id>
        <link rel="edit" type="application/atom+xml" href="{id}/0"/>
        {cell}
    </entry>
"#,
                id = escape(&cell_url),
                cell = cell_element(address, value),
            );
        }
    }

    xml.push_str("</feed>\n");
    Ok(xml)
}

/// Structured query matching every `(column tag, value)` pair
pub fn structured_query<'a>(terms: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    terms
        .into_iter()
        .map(|(tag, value)| {
            format!(
                "{} = \"{}\"",
                tag,
                value.replace('\\', "\\\\").replace('"', "\\\"")
            )
        })
        .collect::<Vec<_>>()
        .join(" and ")
}

/// URL of a cell resource: `<cells feed>/R<row>C<col>`
pub fn cell_resource(cell_feed_url: &str, address: CellAddress) -> String {
    format!(
        "{}/{}",
        cell_feed_url.trim_end_matches('/'),
        address.to_r1c1_string()
    )
}

fn cell_element(address: CellAddress, value: &str) -> String {
    format!(
        r#"<gs:cell row="{}" col="{}" inputValue="{}"/>"#,
        address.row,
        address.col,
        escape(value)
    )
}
