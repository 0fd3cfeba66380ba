//! Tests for worksheet reads: header row, row count, cell ranges.

use crate::*;
use sheetfeed_client::{CellQuery, Method, SessionState};

fn with_cell_routes(service: &MockService) {
    service.on(
        Method::Get,
        &format!("{CELLS}?{DISCOVERY}"),
        200,
        links_feed(CELLS),
    );
    service.on(
        Method::Get,
        &format!("{CELLS}?min-row=1&max-row=1"),
        200,
        cells_feed(&[(1, 1, "Name"), (1, 2, "Age")]),
    );
}

#[tokio::test]
async fn test_column_names() {
    let service = MockService::new().with_selection_routes();
    with_cell_routes(&service);
    let mut session = selected_session(&service).await;

    let columns = session.column_names().await.unwrap();
    assert_eq!(columns.len(), 2);
    assert_eq!(columns.name_of(1), Some("Name"));
    assert_eq!(columns.index_of("age"), Some(2));

    let discovery = service.requests_to(Method::Get, &format!("{CELLS}?{DISCOVERY}")).remove(0);
    assert_eq!(discovery.header("GData-Version"), Some("3.0"));
}

#[tokio::test]
async fn test_cell_links_discovered_once() {
    let service = MockService::new().with_selection_routes();
    with_cell_routes(&service);
    let mut session = selected_session(&service).await;

    session.column_names().await.unwrap();
    session.column_names().await.unwrap();

    assert_eq!(
        service
            .requests_to(Method::Get, &format!("{CELLS}?{DISCOVERY}"))
            .len(),
        1
    );
    assert_eq!(
        service
            .requests_to(Method::Get, &format!("{CELLS}?min-row=1&max-row=1"))
            .len(),
        2
    );
}

#[tokio::test]
async fn test_row_count_excludes_header() {
    let service = MockService::new().with_selection_routes();
    service.on(
        Method::Get,
        &format!("{WORKSHEETS}/od6"),
        200,
        worksheet_document("od6", "Sheet1", 5, 2),
    );
    let mut session = selected_session(&service).await;

    assert_eq!(session.row_count().await.unwrap(), 4);
    // The cached worksheet picked up the new dimensions
    assert_eq!(session.worksheet().unwrap().reported_rows, 5);
    assert_eq!(session.state(), SessionState::WorksheetSelected);
}

#[tokio::test]
async fn test_cell_rows() {
    let service = MockService::new().with_selection_routes();
    with_cell_routes(&service);
    service.on(
        Method::Get,
        &format!("{CELLS}?min-row=2&max-row=3"),
        200,
        cells_feed(&[(2, 1, "Ann"), (2, 2, "30"), (3, 1, "Bob")]),
    );
    let mut session = selected_session(&service).await;

    let grid = session.cell_rows(CellQuery::all().rows(2, 3)).await.unwrap();
    assert_eq!(grid.len(), 2);
    assert_eq!(grid[&2][&1], "Ann");
    assert_eq!(grid[&2][&2], "30");
    assert_eq!(grid[&3].len(), 1);
    assert_eq!(grid[&3][&1], "Bob");
}

#[tokio::test]
async fn test_cell_rows_empty_range() {
    let service = MockService::new().with_selection_routes();
    with_cell_routes(&service);
    service.on(
        Method::Get,
        &format!("{CELLS}?min-row=10&max-row=20&min-col=1&max-col=1"),
        200,
        cells_feed(&[]),
    );
    let mut session = selected_session(&service).await;

    let grid = session
        .cell_rows(CellQuery::all().rows(10, 20).columns(1, 1))
        .await
        .unwrap();
    assert!(grid.is_empty());
}
