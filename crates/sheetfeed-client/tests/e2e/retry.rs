//! Tests for transient-failure retries and cancellation through a session.

use std::time::Duration;

use crate::*;
use sheetfeed_client::{Method, SessionState, SheetsError, SpreadsheetSession};

#[tokio::test(start_paused = true)]
async fn test_transient_failures_are_retried() {
    let service = MockService::new().with_selection_routes();
    service.on(Method::Get, SPREADSHEETS, 400, "backend unavailable");
    service.on(Method::Get, SPREADSHEETS, 400, "backend unavailable");
    service.on(
        Method::Get,
        SPREADSHEETS,
        200,
        spreadsheets_feed(&[("key1", "Budget")]),
    );
    let mut session = SpreadsheetSession::new(service.clone(), config());
    session.authenticate("ann@example.com", "secret").await.unwrap();

    let started = tokio::time::Instant::now();
    let spreadsheets = session.list_spreadsheets().await.unwrap();

    assert_eq!(spreadsheets.len(), 1);
    assert_eq!(service.requests_to(Method::Get, SPREADSHEETS).len(), 3);
    assert_eq!(started.elapsed(), Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn test_retries_are_bounded() {
    let service = MockService::new().with_selection_routes();
    service.on(Method::Get, SPREADSHEETS, 400, "backend unavailable");
    let mut session = SpreadsheetSession::new(service.clone(), config());
    session.authenticate("ann@example.com", "secret").await.unwrap();

    match session.list_spreadsheets().await {
        Err(SheetsError::TransientFailureExhausted { attempts, body, .. }) => {
            assert_eq!(attempts, 3);
            assert_eq!(body, "backend unavailable");
        }
        other => panic!("expected TransientFailureExhausted, got {other:?}"),
    }
    assert_eq!(service.requests_to(Method::Get, SPREADSHEETS).len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_other_failures_are_not_retried() {
    let service = MockService::new().with_selection_routes();
    service.on(Method::Get, SPREADSHEETS, 500, "internal error");
    let mut session = SpreadsheetSession::new(service.clone(), config());
    session.authenticate("ann@example.com", "secret").await.unwrap();

    let err = session.list_spreadsheets().await.unwrap_err();
    assert!(matches!(err, SheetsError::RequestFailed { status: 500, .. }));
    assert_eq!(service.requests_to(Method::Get, SPREADSHEETS).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_aborts_backoff() {
    let service = MockService::new().with_selection_routes();
    service.on(Method::Get, SPREADSHEETS, 400, "backend unavailable");
    let mut session = SpreadsheetSession::new(service.clone(), config());
    session.authenticate("ann@example.com", "secret").await.unwrap();

    let cancel = session.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        cancel.cancel();
    });

    let err = session.list_spreadsheets().await.unwrap_err();
    assert!(matches!(err, SheetsError::Cancelled));
    assert_eq!(service.requests_to(Method::Get, SPREADSHEETS).len(), 1);
    // Cancelling does not log the session out
    assert_eq!(session.state(), SessionState::Authenticated);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_login_is_not_an_auth_failure() {
    let service = MockService::new();
    service.on(Method::Post, AUTH_URL, 400, "try later");
    let mut session = SpreadsheetSession::new(service.clone(), config());
    session.cancellation_token().cancel();

    let err = session.authenticate("ann@example.com", "secret").await.unwrap_err();
    assert!(matches!(err, SheetsError::Cancelled));
    assert!(service.requests().is_empty());
}
