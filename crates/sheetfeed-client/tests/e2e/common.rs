//! Common utilities for E2E tests: a scripted feed service and its fixtures.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sheetfeed_client::{
    HttpClient, HttpRequest, HttpResponse, Method, RetryPolicy, SessionConfig, SpreadsheetSession,
    TransportError,
};
use sheetfeed_core::{ATOM_NS, BATCH_NS, GSX_NS, GS_NS};

pub const AUTH_URL: &str = "https://sheets.test/accounts/ClientLogin";
pub const SPREADSHEETS: &str = "https://sheets.test/feeds/spreadsheets/private/full";
pub const WORKSHEETS: &str = "https://sheets.test/feeds/worksheets/key1/private/full";
pub const CELLS: &str = "https://sheets.test/feeds/cells/key1/od6/private/full";
pub const LIST: &str = "https://sheets.test/feeds/list/key1/od6/private/full";
pub const TOKEN: &str = "DQAAAH4tok_en";

/// Percent-encoded `''`, the query used to discover a feed's links
pub const DISCOVERY: &str = "q=%27%27";

pub type Session = SpreadsheetSession<Arc<MockService>>;

struct Route {
    method: Method,
    url: String,
    responses: VecDeque<HttpResponse>,
    /// The only queued response has been handed out at least once
    served: bool,
}

/// Answers requests by exact method and URL.
///
/// Responses queued on a route are handed out in order; the last one
/// repeats until another response is queued behind it. Unrouted requests
/// get a 404. Every request is logged.
#[derive(Default)]
pub struct MockService {
    routes: Mutex<Vec<Route>>,
    log: Mutex<Vec<HttpRequest>>,
}

impl MockService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a response for `method url`.
    pub fn on(&self, method: Method, url: &str, status: u16, body: impl Into<String>) -> &Self {
        let response = HttpResponse::new(status, body.into());
        let mut routes = self.routes.lock().unwrap();
        match routes
            .iter_mut()
            .find(|r| r.method == method && r.url == url)
        {
            Some(route) => {
                if route.served {
                    route.responses.clear();
                    route.served = false;
                }
                route.responses.push_back(response);
            }
            None => routes.push(Route {
                method,
                url: url.to_string(),
                responses: VecDeque::from([response]),
                served: false,
            }),
        }
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.log.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: Method, url: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.url == url)
            .collect()
    }

    /// Route the login and the `Budget` / `Sheet1` selection fixtures.
    pub fn with_selection_routes(self: Arc<Self>) -> Arc<Self> {
        self.on(Method::Post, AUTH_URL, 200, login_response());
        self.on(
            Method::Get,
            &format!("{SPREADSHEETS}?title=Budget"),
            200,
            spreadsheets_feed(&[("key1", "Budget")]),
        );
        self.on(
            Method::Get,
            &format!("{WORKSHEETS}?title=Sheet1"),
            200,
            worksheets_feed(&[worksheet_entry("od6", "Sheet1", 3, 2)]),
        );
        self
    }
}

#[async_trait]
impl HttpClient for MockService {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.log.lock().unwrap().push(request.clone());

        let mut routes = self.routes.lock().unwrap();
        let route = routes
            .iter_mut()
            .find(|r| r.method == request.method && r.url == request.url);

        Ok(match route {
            Some(route) if route.responses.len() > 1 => route.responses.pop_front().unwrap(),
            Some(route) => {
                route.served = true;
                route.responses[0].clone()
            }
            None => HttpResponse::new(404, format!("no route for {} {}", request.method, request.url)),
        })
    }
}

pub fn config() -> SessionConfig {
    SessionConfig::default()
        .with_auth_url(AUTH_URL)
        .with_spreadsheets_feed_url(SPREADSHEETS)
        .with_retry(RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_secs(30),
        })
}

/// A session logged in with `Budget` / `Sheet1` selected.
pub async fn selected_session(service: &Arc<MockService>) -> Session {
    let mut session = SpreadsheetSession::new(service.clone(), config());
    session.authenticate("ann@example.com", "secret").await.unwrap();
    session.select_spreadsheet("Budget").await.unwrap();
    session.select_worksheet("Sheet1", None).await.unwrap();
    session
}

pub fn body_of(request: &HttpRequest) -> String {
    String::from_utf8_lossy(request.body.as_deref().unwrap_or_default()).into_owned()
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn login_response() -> String {
    format!("SID=sid123\nLSID=lsid456\nAuth={TOKEN}\n")
}

pub fn spreadsheets_feed(sheets: &[(&str, &str)]) -> String {
    let entries: String = sheets
        .iter()
        .map(|(key, title)| {
            format!(
                r#"
  <entry>
    <id>{SPREADSHEETS}/{key}</id>
    <updated>2024-03-01T10:00:00.000Z</updated>
    <title type="text">{title}</title>
    <content type="application/atom+xml;type=feed" src="https://sheets.test/feeds/worksheets/{key}/private/full"/>
    <link rel="self" type="application/atom+xml" href="{SPREADSHEETS}/{key}"/>
    <author><name>ann</name><email>ann@example.com</email></author>
  </entry>"#
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="{ATOM_NS}">
  <id>{SPREADSHEETS}</id>
  <title type="text">Available Spreadsheets</title>{entries}
</feed>"#
    )
}

/// A worksheet `<entry>` element (without namespace declarations)
pub fn worksheet_entry(key: &str, title: &str, rows: u32, cols: u32) -> String {
    format!(
        r#"
  <entry>
    <id>{WORKSHEETS}/{key}</id>
    <updated>2024-03-01T10:00:00.000Z</updated>
    <title type="text">{title}</title>
    <content type="application/atom+xml;type=feed" src="https://sheets.test/feeds/list/key1/{key}/private/full"/>
    <link rel="http://schemas.google.com/spreadsheets/2006#listfeed" type="application/atom+xml" href="https://sheets.test/feeds/list/key1/{key}/private/full"/>
    <link rel="http://schemas.google.com/spreadsheets/2006#cellsfeed" type="application/atom+xml" href="https://sheets.test/feeds/cells/key1/{key}/private/full"/>
    <link rel="self" type="application/atom+xml" href="{WORKSHEETS}/{key}"/>
    <link rel="edit" type="application/atom+xml" href="{WORKSHEETS}/{key}/v1"/>
    <gs:rowCount>{rows}</gs:rowCount>
    <gs:colCount>{cols}</gs:colCount>
  </entry>"#
    )
}

pub fn worksheets_feed(entries: &[String]) -> String {
    format!(
        r#"<feed xmlns="{ATOM_NS}" xmlns:gs="{GS_NS}">
  <id>{WORKSHEETS}</id>
  <title type="text">Budget</title>{}
</feed>"#,
        entries.concat()
    )
}

/// A single worksheet entry as the root element
pub fn worksheet_document(key: &str, title: &str, rows: u32, cols: u32) -> String {
    worksheet_entry(key, title, rows, cols).replacen(
        "<entry>",
        &format!(r#"<entry xmlns="{ATOM_NS}" xmlns:gs="{GS_NS}">"#),
        1,
    )
}

/// A feed carrying only its own links, as returned for discovery queries
pub fn links_feed(feed_url: &str) -> String {
    format!(
        r#"<feed xmlns="{ATOM_NS}">
  <id>{feed_url}</id>
  <title type="text">Sheet1</title>
  <link rel="http://schemas.google.com/g/2005#feed" type="application/atom+xml" href="{feed_url}"/>
  <link rel="http://schemas.google.com/g/2005#post" type="application/atom+xml" href="{feed_url}"/>
  <link rel="http://schemas.google.com/g/2005#batch" type="application/atom+xml" href="{feed_url}/batch"/>
  <link rel="self" type="application/atom+xml" href="{feed_url}?q=%27%27"/>
</feed>"#
    )
}

pub fn cells_feed(cells: &[(u32, u32, &str)]) -> String {
    let entries: String = cells
        .iter()
        .map(|(row, col, value)| {
            format!(
                r#"
  <entry>
    <id>{CELLS}/R{row}C{col}</id>
    <title type="text">R{row}C{col}</title>
    <content type="text">{value}</content>
    <gs:cell row="{row}" col="{col}" inputValue="{value}">{value}</gs:cell>
  </entry>"#
            )
        })
        .collect();

    format!(
        r#"<feed xmlns="{ATOM_NS}" xmlns:gs="{GS_NS}">
  <id>{CELLS}</id>
  <title type="text">Sheet1</title>{entries}
</feed>"#
    )
}

/// List rows as `(row id, [(column tag, value)])`
pub fn list_feed(rows: &[(&str, &[(&str, &str)])]) -> String {
    let entries: String = rows
        .iter()
        .map(|(id, values)| {
            let columns: String = values
                .iter()
                .map(|(tag, value)| format!("<gsx:{tag}>{value}</gsx:{tag}>"))
                .collect();
            format!(
                r#"
  <entry>
    <id>{LIST}/{id}</id>
    <title type="text">{id}</title>
    <link rel="self" type="application/atom+xml" href="{LIST}/{id}"/>
    <link rel="edit" type="application/atom+xml" href="{LIST}/{id}/v1"/>
    {columns}
  </entry>"#
            )
        })
        .collect();

    format!(
        r#"<feed xmlns="{ATOM_NS}" xmlns:gsx="{GSX_NS}">
  <id>{LIST}</id>
  <title type="text">Sheet1</title>{entries}
</feed>"#
    )
}

/// Batch response entries as `(batch id, status code, reason)`
pub fn batch_response(results: &[(&str, u16, &str)]) -> String {
    let entries: String = results
        .iter()
        .map(|(id, code, reason)| {
            format!(
                r#"
  <entry>
    <batch:id>{id}</batch:id>
    <batch:operation type="update"/>
    <batch:status code="{code}" reason="{reason}"/>
  </entry>"#
            )
        })
        .collect();

    format!(
        r#"<feed xmlns="{ATOM_NS}" xmlns:batch="{BATCH_NS}">
  <id>{CELLS}/batch/1</id>
  <title type="text">Batch Feed</title>{entries}
</feed>"#
    )
}
