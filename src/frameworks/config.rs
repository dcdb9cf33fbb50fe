use crate::use_cases::users::{DEFAULT_USER_EMAIL, DEFAULT_USER_NAME};
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

// Runtime/server settings read from the environment.

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

pub fn http_host() -> IpAddr {
    env::var("HOST")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

pub fn http_port() -> u16 {
    env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

pub fn http_addr() -> SocketAddr {
    SocketAddr::new(http_host(), http_port())
}

pub fn log_format() -> LogFormat {
    parse_log_format(env::var("LOG_FORMAT").ok().as_deref())
}

fn parse_log_format(raw: Option<&str>) -> LogFormat {
    match raw.map(str::trim) {
        Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
        _ => LogFormat::Compact,
    }
}

// Identity stamped on the synthesized users the fixture service returns.
pub fn user_name() -> String {
    non_empty_var("USER_DEFAULT_NAME").unwrap_or_else(|| DEFAULT_USER_NAME.to_string())
}

pub fn user_email() -> String {
    non_empty_var("USER_DEFAULT_EMAIL").unwrap_or_else(|| DEFAULT_USER_EMAIL.to_string())
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
