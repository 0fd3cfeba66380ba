//! ClientLogin: credentials in, opaque token out.

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::SessionConfig;

lazy_static! {
    static ref TOKEN: Regex = Regex::new(r"(?i)auth=([a-z0-9_\-]+)").expect("valid token regex");
}

/// Form-encoded login body.
pub fn login_form(config: &SessionConfig, email: &str, password: &str) -> String {
    [
        ("accountType", config.account_type.as_str()),
        ("Email", email),
        ("Passwd", password),
        ("service", config.service.as_str()),
        ("source", config.source.as_str()),
    ]
    .iter()
    .map(|(name, value)| format!("{}={}", name, urlencoding::encode(value)))
    .collect::<Vec<_>>()
    .join("&")
}

/// Pull the token out of an `auth=<token>` line of a login response.
pub fn extract_token(body: &str) -> Option<String> {
    TOKEN
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
