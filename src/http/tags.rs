//! Tag configuration for HTTP observations.
//!
//! # Server tags
//! `method`, `uri`, `status`, `exception`
//!
//! # Client tags
//! `method`, `uri`, `status`, `clientName`
//!
//! # Sentinels
//! - `uri`: `UNKNOWN` (server, no matched route), `none` (client, no template)
//! - `status`: `SERVER_ERROR` / `CLIENT_ERROR` (no response), `IO_ERROR`
//!   (client transport failure), `CANCELLED` (caller went away)
//! - `exception`: `None` when the request did not fail
//! - `clientName`: `none` when the target URI has no host

use axum::http::{Method, StatusCode, Uri};
use std::sync::Arc;

use crate::observability::tags::{TagFormatter, TagSet};

pub const UNKNOWN_URI: &str = "UNKNOWN";
pub const NO_URI: &str = "none";
pub const NO_EXCEPTION: &str = "None";
pub const NO_CLIENT_NAME: &str = "none";

/// Terminal status of a server-side exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    /// A response was produced.
    Code(StatusCode),
    /// The pipeline failed with an error attributed to the caller.
    ClientError,
    /// The pipeline failed without producing a response.
    ServerError,
    /// The request future was dropped before completion.
    Cancelled,
}

impl ServerStatus {
    pub fn as_tag(&self) -> String {
        match self {
            ServerStatus::Code(code) => code.as_u16().to_string(),
            ServerStatus::ClientError => "CLIENT_ERROR".to_string(),
            ServerStatus::ServerError => "SERVER_ERROR".to_string(),
            ServerStatus::Cancelled => "CANCELLED".to_string(),
        }
    }
}

/// Terminal status of a client-side exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientStatus {
    Code(StatusCode),
    IoError,
    Cancelled,
}

impl ClientStatus {
    pub fn as_tag(&self) -> String {
        match self {
            ClientStatus::Code(code) => code.as_u16().to_string(),
            ClientStatus::IoError => "IO_ERROR".to_string(),
            ClientStatus::Cancelled => "CANCELLED".to_string(),
        }
    }
}

/// Everything the configurer may use about an inbound request.
#[derive(Debug, Clone)]
pub struct ServerExchange<'a> {
    pub method: &'a Method,
    /// Matched route template, if routing got that far.
    pub route: Option<&'a str>,
    pub status: ServerStatus,
    /// Simple type name of the error that terminated the request.
    pub exception: Option<&'a str>,
}

/// Everything the configurer may use about an outbound request.
#[derive(Debug, Clone)]
pub struct ClientExchange<'a> {
    pub method: &'a Method,
    /// Final (substituted) request URI. Only its host is used.
    pub uri: &'a Uri,
    /// Captured URL template, if the call went through a capturing entry point.
    pub url_template: Option<&'a str>,
    pub status: ClientStatus,
}

/// Produces tag sets for server and client observations.
///
/// Implementations may add tags but must emit the required ones, and must
/// not panic.
pub trait WebMetricsTagConfigurer: Send + Sync {
    fn server_tags(&self, exchange: &ServerExchange<'_>) -> TagSet;

    fn client_tags(&self, exchange: &ClientExchange<'_>) -> TagSet;
}

/// Default configurer: required tags, every value through the formatter.
pub struct DefaultWebMetricsTagConfigurer {
    formatter: Arc<dyn TagFormatter>,
}

impl DefaultWebMetricsTagConfigurer {
    pub fn new(formatter: Arc<dyn TagFormatter>) -> Self {
        Self { formatter }
    }

    fn fmt(&self, value: &str) -> String {
        self.formatter.format(value)
    }
}

impl WebMetricsTagConfigurer for DefaultWebMetricsTagConfigurer {
    fn server_tags(&self, exchange: &ServerExchange<'_>) -> TagSet {
        let uri = exchange
            .route
            .filter(|route| !route.is_empty())
            .unwrap_or(UNKNOWN_URI);

        TagSet::with_capacity(4)
            .and("method", self.fmt(exchange.method.as_str()))
            .and("uri", self.fmt(uri))
            .and("status", self.fmt(&exchange.status.as_tag()))
            .and("exception", self.fmt(exchange.exception.unwrap_or(NO_EXCEPTION)))
    }

    fn client_tags(&self, exchange: &ClientExchange<'_>) -> TagSet {
        let uri = exchange
            .url_template
            .filter(|t| !t.is_empty())
            .unwrap_or(NO_URI);
        let client_name = exchange.uri.host().unwrap_or(NO_CLIENT_NAME);

        TagSet::with_capacity(4)
            .and("method", self.fmt(exchange.method.as_str()))
            .and("uri", self.fmt(uri))
            .and("status", self.fmt(&exchange.status.as_tag()))
            .and("clientName", self.fmt(client_name))
    }
}

/// Minimal configurer: required keys only, no route or host enrichment.
///
/// Selected by `build()` when `tags.request_introspection` is false; `uri`
/// is always a sentinel and `clientName` is always `none`.
pub struct EmptyWebMetricsTagConfigurer {
    formatter: Arc<dyn TagFormatter>,
}

impl EmptyWebMetricsTagConfigurer {
    pub fn new(formatter: Arc<dyn TagFormatter>) -> Self {
        Self { formatter }
    }
}

impl WebMetricsTagConfigurer for EmptyWebMetricsTagConfigurer {
    fn server_tags(&self, exchange: &ServerExchange<'_>) -> TagSet {
        let f = &self.formatter;
        TagSet::with_capacity(4)
            .and("method", f.format(exchange.method.as_str()))
            .and("uri", f.format(UNKNOWN_URI))
            .and("status", f.format(&exchange.status.as_tag()))
            .and("exception", f.format(exchange.exception.unwrap_or(NO_EXCEPTION)))
    }

    fn client_tags(&self, exchange: &ClientExchange<'_>) -> TagSet {
        let f = &self.formatter;
        TagSet::with_capacity(4)
            .and("method", f.format(exchange.method.as_str()))
            .and("uri", f.format(NO_URI))
            .and("status", f.format(&exchange.status.as_tag()))
            .and("clientName", f.format(NO_CLIENT_NAME))
    }
}

/// Simple (unqualified, non-generic) name of a type.
///
/// `std::io::error::Error` becomes `Error`; boxed trait objects report the
/// trait's name.
pub fn simple_type_name<T: ?Sized>() -> &'static str {
    simplify_type_name(std::any::type_name::<T>())
}

fn simplify_type_name(full: &'static str) -> &'static str {
    let mut name = full.trim();
    // Box<dyn Trait + Send> → Trait
    if let Some(inner) = name
        .strip_prefix("alloc::boxed::Box<")
        .and_then(|rest| rest.strip_suffix('>'))
    {
        name = inner.trim();
    }
    if let Some(rest) = name.strip_prefix("dyn ") {
        name = rest.split(" + ").next().unwrap_or(rest);
    }
    let base = name.split('<').next().unwrap_or(name);
    base.rsplit("::").next().unwrap_or(base)
}
