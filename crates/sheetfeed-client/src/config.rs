//! Session configuration.

use crate::transport::RetryPolicy;

/// Endpoints, client identity and retry behaviour of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// ClientLogin endpoint credentials are posted to.
    pub auth_url: String,
    /// Feed listing the spreadsheets visible to the account.
    pub spreadsheets_feed_url: String,
    /// `accountType` form field.
    pub account_type: String,
    /// `service` form field naming the spreadsheet service.
    pub service: String,
    /// `source` form field identifying this client to the service.
    pub source: String,
    pub retry: RetryPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auth_url: "https://www.google.com/accounts/ClientLogin".to_string(),
            spreadsheets_feed_url: "https://spreadsheets.google.com/feeds/spreadsheets/private/full"
                .to_string(),
            account_type: "HOSTED_OR_GOOGLE".to_string(),
            service: "wise".to_string(),
            source: concat!("sheetfeed-", env!("CARGO_PKG_VERSION")).to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl SessionConfig {
    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    pub fn with_spreadsheets_feed_url(mut self, url: impl Into<String>) -> Self {
        self.spreadsheets_feed_url = url.into();
        self
    }

    pub fn with_account_type(mut self, account_type: impl Into<String>) -> Self {
        self.account_type = account_type.into();
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
