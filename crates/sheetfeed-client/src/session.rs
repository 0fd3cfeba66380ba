//! The stateful spreadsheet session.
//!
//! A session moves through four states as context accumulates:
//!
//! ```text
//! Unauthenticated -> Authenticated -> SpreadsheetSelected -> WorksheetSelected
//! ```
//!
//! The worksheet context lives inside the spreadsheet context, so selecting
//! another spreadsheet drops the worksheet selection and every link cached
//! for it. Operations called before their state is reached fail with
//! [`SheetsError::InvalidState`] without touching the network.
//!
//! All operations take `&mut self` or `&self` on a session owned by one
//! caller; share a session between tasks by putting it behind a lock.

use bytes::Bytes;
use sheetfeed_core::{
    model::list_column_tag, request, xml, CellAddress, CellEntry, CellGrid, ColumnMap, Entry,
    Feed, LinkTable, RowRecord, SpreadsheetInfo, WorksheetInfo,
};
use tokio_util::sync::CancellationToken;

use crate::auth;
use crate::config::SessionConfig;
use crate::error::{BatchFailure, Result, SheetsError};
use crate::transport::{body_text, HttpClient, HttpRequest, Method, RetryingTransport};

const GDATA_VERSION: &str = "3.0";
const ATOM_CONTENT_TYPE: &str = "application/atom+xml";
/// Query sent when fetching a feed only for the links it advertises.
const DISCOVERY_QUERY: (&str, &str) = ("q", "''");

/// How far a session has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    SpreadsheetSelected,
    WorksheetSelected,
}

/// Optional bounds for a cells feed query (all 1-based, inclusive).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellQuery {
    pub min_row: Option<u32>,
    pub max_row: Option<u32>,
    pub min_col: Option<u32>,
    pub max_col: Option<u32>,
}

impl CellQuery {
    /// Every cell of the worksheet.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn rows(mut self, min: u32, max: u32) -> Self {
        self.min_row = Some(min);
        self.max_row = Some(max);
        self
    }

    pub fn columns(mut self, min: u32, max: u32) -> Self {
        self.min_col = Some(min);
        self.max_col = Some(max);
        self
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        [
            ("min-row", self.min_row),
            ("max-row", self.max_row),
            ("min-col", self.min_col),
            ("max-col", self.max_col),
        ]
        .into_iter()
        .filter_map(|(name, bound)| bound.map(|b| (name, b.to_string())))
        .collect()
    }
}

#[derive(Debug)]
struct SpreadsheetContext {
    info: SpreadsheetInfo,
    worksheet: Option<WorksheetContext>,
}

#[derive(Debug)]
struct WorksheetContext {
    info: WorksheetInfo,
    /// Links of the cells feed, discovered on first use
    cell_links: Option<LinkTable>,
    /// Links of the list feed, discovered on first use
    list_links: Option<LinkTable>,
}

impl WorksheetContext {
    fn new(info: WorksheetInfo) -> Self {
        Self {
            info,
            cell_links: None,
            list_links: None,
        }
    }
}

/// A client session against the spreadsheet feed service.
pub struct SpreadsheetSession<C> {
    transport: RetryingTransport<C>,
    config: SessionConfig,
    token: Option<String>,
    spreadsheet: Option<SpreadsheetContext>,
}

impl<C: HttpClient> SpreadsheetSession<C> {
    pub fn new(client: C, config: SessionConfig) -> Self {
        Self {
            transport: RetryingTransport::new(client, config.retry),
            config,
            token: None,
            spreadsheet: None,
        }
    }

    /// Use an externally owned cancellation token for retry back-offs.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.transport = self.transport.with_cancellation(cancel);
        self
    }

    /// Cancelling this token aborts a pending retry back-off.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.transport.cancellation_token()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        self.transport.client()
    }

    pub fn state(&self) -> SessionState {
        match (&self.token, &self.spreadsheet) {
            (None, _) => SessionState::Unauthenticated,
            (Some(_), None) => SessionState::Authenticated,
            (Some(_), Some(ctx)) if ctx.worksheet.is_some() => SessionState::WorksheetSelected,
            (Some(_), Some(_)) => SessionState::SpreadsheetSelected,
        }
    }

    /// The selected spreadsheet, if any.
    pub fn spreadsheet(&self) -> Option<&SpreadsheetInfo> {
        self.spreadsheet.as_ref().map(|ctx| &ctx.info)
    }

    /// The selected worksheet, if any.
    pub fn worksheet(&self) -> Option<&WorksheetInfo> {
        self.spreadsheet
            .as_ref()
            .and_then(|ctx| ctx.worksheet.as_ref())
            .map(|ws| &ws.info)
    }

    // ========================================================================
    // Authentication and selection
    // ========================================================================

    /// Log in and keep the token for later calls.
    ///
    /// Any earlier token and selection are discarded first, so a failed
    /// attempt leaves the session unauthenticated.
    pub async fn authenticate(&mut self, email: &str, password: &str) -> Result<()> {
        self.token = None;
        self.spreadsheet = None;

        let form = auth::login_form(&self.config, email, password);
        let request = HttpRequest::post(self.config.auth_url.as_str(), form)
            .with_header("Content-Type", "application/x-www-form-urlencoded");

        let body = match self.transport.execute(&request).await {
            Ok(body) => body,
            Err(SheetsError::Cancelled) => return Err(SheetsError::Cancelled),
            Err(err) => return Err(SheetsError::AuthenticationFailed(err.to_string())),
        };

        let token = auth::extract_token(&body_text(&body)).ok_or_else(|| {
            SheetsError::AuthenticationFailed("no auth token in login response".into())
        })?;

        self.token = Some(token);
        tracing::info!("Authenticated with {}", self.config.auth_url);
        Ok(())
    }

    /// Spreadsheets visible to the account.
    pub async fn list_spreadsheets(&self) -> Result<Vec<SpreadsheetInfo>> {
        self.require("list_spreadsheets", SessionState::Authenticated)?;

        let body = self
            .fetch(self.request(Method::Get, &self.config.spreadsheets_feed_url)?)
            .await?;
        let feed = Feed::parse(&body)?;

        let spreadsheets = feed
            .entries
            .iter()
            .map(SpreadsheetInfo::from_entry)
            .collect::<sheetfeed_core::Result<_>>()?;
        Ok(spreadsheets)
    }

    /// Select a spreadsheet by title.
    ///
    /// The previous selection (and its worksheet) is dropped before the
    /// lookup, whatever its outcome.
    pub async fn select_spreadsheet(&mut self, title: &str) -> Result<SpreadsheetInfo> {
        self.require("select_spreadsheet", SessionState::Authenticated)?;
        self.spreadsheet = None;

        let url = with_query(&self.config.spreadsheets_feed_url, &[("title", title)]);
        let body = self.fetch(self.request(Method::Get, &url)?).await?;
        let feed = Feed::parse(&body)?;

        let entry = match pick_by_title(&feed.entries, title) {
            Some(entry) => entry,
            None => return Err(SheetsError::SpreadsheetNotFound(title.to_string())),
        };

        let info = SpreadsheetInfo::from_entry(entry)?;
        // Worksheet lookups go through the content link
        info.links.content()?;

        tracing::info!("Selected spreadsheet '{}' ({})", info.title, info.id);
        self.spreadsheet = Some(SpreadsheetContext {
            info: info.clone(),
            worksheet: None,
        });
        Ok(info)
    }

    /// Select a spreadsheet, creating it when it does not exist.
    ///
    /// Creation is not supported by this client, so a missing spreadsheet
    /// surfaces [`SheetsError::NotImplemented`].
    pub async fn select_or_create_spreadsheet(&mut self, title: &str) -> Result<SpreadsheetInfo> {
        match self.select_spreadsheet(title).await {
            Err(SheetsError::SpreadsheetNotFound(_)) => self.create_spreadsheet(title).await,
            other => other,
        }
    }

    /// Spreadsheet creation is not supported.
    pub async fn create_spreadsheet(&mut self, title: &str) -> Result<SpreadsheetInfo> {
        self.require("create_spreadsheet", SessionState::Authenticated)?;
        tracing::warn!("Cannot create spreadsheet '{title}'");
        Err(SheetsError::NotImplemented("spreadsheet creation"))
    }

    /// Worksheets of the selected spreadsheet.
    pub async fn list_worksheets(&self) -> Result<Vec<WorksheetInfo>> {
        self.require("list_worksheets", SessionState::SpreadsheetSelected)?;

        let url = self.spreadsheet_context("list_worksheets")?.info.links.content()?;
        let body = self.fetch(self.request(Method::Get, url)?).await?;
        let feed = Feed::parse(&body)?;

        let worksheets = feed
            .entries
            .iter()
            .map(WorksheetInfo::from_entry)
            .collect::<sheetfeed_core::Result<_>>()?;
        Ok(worksheets)
    }

    /// Select a worksheet of the selected spreadsheet by title.
    ///
    /// When no worksheet matches and `column_names` is given, the worksheet
    /// is created with those columns as its header row, then selected.
    pub async fn select_worksheet(
        &mut self,
        title: &str,
        column_names: Option<&[&str]>,
    ) -> Result<WorksheetInfo> {
        self.require("select_worksheet", SessionState::SpreadsheetSelected)?;
        self.spreadsheet_context_mut("select_worksheet")?.worksheet = None;

        if let Some(info) = self.find_worksheet(title).await? {
            return self.set_worksheet(info);
        }

        match column_names {
            Some(names) if !names.is_empty() => self.create_worksheet(title, names).await,
            _ => Err(SheetsError::WorksheetNotFound(title.to_string())),
        }
    }

    /// Add a worksheet to the selected spreadsheet, select it and write its
    /// header row.
    pub async fn create_worksheet(
        &mut self,
        title: &str,
        column_names: &[&str],
    ) -> Result<WorksheetInfo> {
        self.require("create_worksheet", SessionState::SpreadsheetSelected)?;

        let url = self
            .spreadsheet_context("create_worksheet")?
            .info
            .links
            .content()?
            .to_string();
        let body = request::create_worksheet(title, column_names.len() as u32);
        self.fetch(self.atom_request(Method::Post, &url, body)?)
            .await?;
        tracing::info!("Created worksheet '{title}'");

        let info = self
            .find_worksheet(title)
            .await?
            .ok_or_else(|| SheetsError::WorksheetNotFound(title.to_string()))?;
        let info = self.set_worksheet(info)?;

        let mut header = CellGrid::new();
        let row = header.entry(1).or_default();
        for (i, name) in column_names.iter().enumerate() {
            row.insert(i as u32 + 1, name.to_string());
        }
        self.update_cells(&header).await?;

        Ok(info)
    }

    // ========================================================================
    // Worksheet reads
    // ========================================================================

    /// Header row of the selected worksheet.
    pub async fn column_names(&mut self) -> Result<ColumnMap> {
        self.require("column_names", SessionState::WorksheetSelected)?;

        let feed_url = self.cell_links().await?.feed()?.to_string();
        let url = with_query(&feed_url, &[("min-row", "1"), ("max-row", "1")]);
        let cells = self.fetch_cells(&url).await?;

        Ok(ColumnMap::from_cells(&cells))
    }

    /// Data rows of the selected worksheet, header excluded.
    ///
    /// Re-reads the worksheet entry, refreshing the cached dimensions.
    pub async fn row_count(&mut self) -> Result<u32> {
        self.require("row_count", SessionState::WorksheetSelected)?;

        let url = self
            .worksheet_context("row_count")?
            .info
            .links
            .self_link()?
            .to_string();
        let body = self.fetch(self.request(Method::Get, &url)?).await?;
        let info = WorksheetInfo::from_entry(&Entry::parse(&body)?)?;
        let rows = info.data_rows();

        self.worksheet_context_mut("row_count")?.info = info;
        Ok(rows)
    }

    /// Cell values within the query bounds, keyed by row then column.
    pub async fn cell_rows(&mut self, query: CellQuery) -> Result<CellGrid> {
        self.require("cell_rows", SessionState::WorksheetSelected)?;

        let feed_url = self.cell_links().await?.feed()?.to_string();
        let url = with_query(&feed_url, query.params().as_slice());

        let mut grid = CellGrid::new();
        for cell in self.fetch_cells(&url).await? {
            grid.entry(cell.address.row)
                .or_default()
                .insert(cell.address.col, cell.content);
        }
        Ok(grid)
    }

    // ========================================================================
    // Worksheet writes
    // ========================================================================

    /// Append a row through the list feed.
    pub async fn insert_row(&mut self, record: &RowRecord) -> Result<()> {
        self.require("insert_row", SessionState::WorksheetSelected)?;

        let body = request::insert_row(record)?;
        let url = self.list_links().await?.post()?.to_string();
        self.fetch(self.atom_request(Method::Post, &url, body)?)
            .await?;

        tracing::debug!("Inserted row with {} columns", record.len());
        Ok(())
    }

    /// Set one cell's input value.
    pub async fn update_cell(&mut self, row: u32, col: u32, value: &str) -> Result<()> {
        self.require("update_cell", SessionState::WorksheetSelected)?;

        let address = CellAddress::new(row, col)?;
        let links = self.cell_links().await?;
        let body = request::update_cell(links.feed()?, address, value);
        let url = links.post()?;
        self.fetch(self.atom_request(Method::Post, url, body)?)
            .await?;

        tracing::debug!("Updated cell {address}");
        Ok(())
    }

    /// Set many cells in one batch request.
    ///
    /// The batch response is checked entry by entry; any entry the service
    /// rejected is reported in [`SheetsError::BatchFailed`].
    pub async fn update_cells(&mut self, cells: &CellGrid) -> Result<()> {
        self.require("update_cells", SessionState::WorksheetSelected)?;

        if cells.values().all(|row| row.is_empty()) {
            return Ok(());
        }

        let links = self.cell_links().await?;
        let batch_url = links.batch()?;
        let body = request::batch_update_cells(batch_url, links.feed()?, cells)?;
        let request = self
            .atom_request(Method::Post, batch_url, body)?
            .with_header("If-Match", "*");

        let response = self.fetch(request).await?;
        let feed = Feed::parse(&response)?;

        let mut failures = Vec::new();
        for entry in &feed.entries {
            if let Some(result) = sheetfeed_core::BatchResult::from_entry(entry)? {
                if !result.is_success() {
                    failures.push(BatchFailure {
                        id: result.id.unwrap_or_default(),
                        code: result.code,
                        reason: result.reason.unwrap_or_default(),
                    });
                }
            }
        }

        if !failures.is_empty() {
            return Err(SheetsError::BatchFailed(failures));
        }

        tracing::debug!(
            "Batch updated {} cells",
            cells.values().map(|row| row.len()).sum::<usize>()
        );
        Ok(())
    }

    /// Delete the row whose columns hold all the given values.
    ///
    /// Columns may be named (case-insensitive) or given by number. When
    /// several rows match, the last one listed by the service is deleted.
    pub async fn delete_row(&mut self, matching: &RowRecord) -> Result<()> {
        self.require("delete_row", SessionState::WorksheetSelected)?;

        if matching.is_empty() {
            return Err(sheetfeed_core::Error::InvalidColumnName(String::new()).into());
        }

        let columns = self.column_names().await?;
        let mut terms = Vec::with_capacity(matching.len());
        for (column, value) in matching.iter() {
            let name = resolve_column(&columns, column)
                .ok_or_else(|| SheetsError::UnknownColumn(column.to_string()))?;
            terms.push((list_column_tag(name)?, value));
        }
        let query =
            request::structured_query(terms.iter().map(|(tag, value)| (tag.as_str(), *value)));

        let feed_url = self.list_links().await?.feed()?.to_string();
        let url = with_query(&feed_url, &[("sq", query.as_str())]);
        let body = self.fetch(self.request(Method::Get, &url)?).await?;
        let feed = Feed::parse(&body)?;

        let matches = feed.entries.len();
        let entry = feed.entries.last().ok_or(sheetfeed_core::Error::NoEntry)?;
        if matches > 1 {
            tracing::debug!("{matches} rows match {query}, deleting the last one");
        }

        let edit_url = entry.links.edit()?;
        let request = self
            .request(Method::Delete, edit_url)?
            .with_header("If-Match", "*");
        self.fetch(request).await?;

        tracing::debug!("Deleted row matching {query}");
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn require(&self, operation: &'static str, required: SessionState) -> Result<()> {
        let actual = self.state();
        if actual < required {
            return Err(SheetsError::InvalidState {
                operation,
                required,
                actual,
            });
        }
        Ok(())
    }

    fn token(&self) -> Result<&str> {
        self.token.as_deref().ok_or(SheetsError::InvalidState {
            operation: "request",
            required: SessionState::Authenticated,
            actual: SessionState::Unauthenticated,
        })
    }

    fn spreadsheet_context(&self, operation: &'static str) -> Result<&SpreadsheetContext> {
        let actual = self.state();
        self.spreadsheet.as_ref().ok_or(SheetsError::InvalidState {
            operation,
            required: SessionState::SpreadsheetSelected,
            actual,
        })
    }

    fn spreadsheet_context_mut(&mut self, operation: &'static str) -> Result<&mut SpreadsheetContext> {
        let actual = self.state();
        self.spreadsheet.as_mut().ok_or(SheetsError::InvalidState {
            operation,
            required: SessionState::SpreadsheetSelected,
            actual,
        })
    }

    fn worksheet_context(&self, operation: &'static str) -> Result<&WorksheetContext> {
        let actual = self.state();
        self.spreadsheet
            .as_ref()
            .and_then(|ctx| ctx.worksheet.as_ref())
            .ok_or(SheetsError::InvalidState {
                operation,
                required: SessionState::WorksheetSelected,
                actual,
            })
    }

    fn worksheet_context_mut(&mut self, operation: &'static str) -> Result<&mut WorksheetContext> {
        let actual = self.state();
        self.spreadsheet
            .as_mut()
            .and_then(|ctx| ctx.worksheet.as_mut())
            .ok_or(SheetsError::InvalidState {
                operation,
                required: SessionState::WorksheetSelected,
                actual,
            })
    }

    fn set_worksheet(&mut self, info: WorksheetInfo) -> Result<WorksheetInfo> {
        // Cell and list feeds are reached through these two links
        info.links.cells_feed()?;
        info.links.content()?;

        tracing::info!("Selected worksheet '{}' ({})", info.title, info.id);
        let context = self.spreadsheet_context_mut("select_worksheet")?;
        context.worksheet = Some(WorksheetContext::new(info.clone()));
        Ok(info)
    }

    async fn find_worksheet(&self, title: &str) -> Result<Option<WorksheetInfo>> {
        let worksheets_url = self
            .spreadsheet_context("select_worksheet")?
            .info
            .links
            .content()?;
        let url = with_query(worksheets_url, &[("title", title)]);
        let body = self.fetch(self.request(Method::Get, &url)?).await?;
        let feed = Feed::parse(&body)?;

        pick_by_title(&feed.entries, title)
            .map(WorksheetInfo::from_entry)
            .transpose()
            .map_err(SheetsError::from)
    }

    /// Links of the selected worksheet's cells feed, discovered once.
    async fn cell_links(&mut self) -> Result<LinkTable> {
        let worksheet = self.worksheet_context("cell_links")?;
        if let Some(links) = &worksheet.cell_links {
            return Ok(links.clone());
        }

        let url = with_query(worksheet.info.links.cells_feed()?, &[DISCOVERY_QUERY]);
        let links = self.discover_links(&url).await?;
        self.worksheet_context_mut("cell_links")?.cell_links = Some(links.clone());
        Ok(links)
    }

    /// Links of the selected worksheet's list feed, discovered once.
    async fn list_links(&mut self) -> Result<LinkTable> {
        let worksheet = self.worksheet_context("list_links")?;
        if let Some(links) = &worksheet.list_links {
            return Ok(links.clone());
        }

        let url = with_query(worksheet.info.links.content()?, &[DISCOVERY_QUERY]);
        let links = self.discover_links(&url).await?;
        self.worksheet_context_mut("list_links")?.list_links = Some(links.clone());
        Ok(links)
    }

    async fn discover_links(&self, url: &str) -> Result<LinkTable> {
        let body = self.fetch(self.request(Method::Get, url)?).await?;
        let feed = Feed::parse(&body)?;
        tracing::debug!("Discovered {} links from {url}", feed.links.len());
        Ok(feed.links)
    }

    async fn fetch_cells(&self, url: &str) -> Result<Vec<CellEntry>> {
        let body = self.fetch(self.request(Method::Get, url)?).await?;
        let feed = Feed::parse(&body)?;
        let cells = feed
            .entries
            .iter()
            .map(CellEntry::from_entry)
            .collect::<sheetfeed_core::Result<_>>()?;
        Ok(cells)
    }

    /// An authorized request without a body.
    fn request(&self, method: Method, url: &str) -> Result<HttpRequest> {
        Ok(HttpRequest::new(method, url)
            .with_header("Authorization", format!("GoogleLogin auth={}", self.token()?))
            .with_header("GData-Version", GDATA_VERSION))
    }

    /// An authorized request carrying an Atom body.
    fn atom_request(&self, method: Method, url: &str, body: String) -> Result<HttpRequest> {
        Ok(self
            .request(method, url)?
            .with_header("Content-Type", ATOM_CONTENT_TYPE)
            .with_body(body))
    }

    async fn fetch(&self, request: HttpRequest) -> Result<Bytes> {
        let body = self.transport.execute(&request).await?;

        if tracing::enabled!(tracing::Level::TRACE) {
            if let Ok(pretty) = xml::pretty_print(&body) {
                tracing::trace!("{} {}\n{}", request.method, request.url, pretty);
            }
        }

        Ok(body)
    }
}

/// The entry whose title matches exactly.
///
/// Title queries are matched loosely by the service, so "Sheet1" may also
/// return "Sheet10". Such near misses count as no match.
fn pick_by_title<'a>(entries: &'a [Entry], title: &str) -> Option<&'a Entry> {
    entries
        .iter()
        .find(|e| e.meta.title.as_deref() == Some(title))
}

/// Column name for a header name (any case) or a column number.
fn resolve_column<'a>(columns: &'a ColumnMap, column: &str) -> Option<&'a str> {
    match column.trim().parse::<u32>() {
        Ok(index) => columns.name_of(index),
        Err(_) => columns
            .index_of(column)
            .and_then(|index| columns.name_of(index)),
    }
}

/// Append query parameters, percent-encoding their values.
fn with_query<V: AsRef<str>>(url: &str, params: &[(&str, V)]) -> String {
    let mut url = url.to_string();
    for (name, value) in params {
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(name);
        url.push('=');
        url.push_str(&urlencoding::encode(value.as_ref()));
    }
    url
}
