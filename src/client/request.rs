//! Request description replayable by the gateway.

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;

use crate::{Error, Result};

/// Method, URL, headers and JSON body of an authenticated call.
///
/// Kept as plain data so the gateway can rebuild the HTTP request for the
/// replay after a credential refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `body` as the JSON payload.
    pub fn json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self> {
        Ok(self.body(serde_json::to_value(body)?))
    }

    /// Merge headers for one attempt.
    ///
    /// Strategy headers go first, caller headers override them, and the
    /// `Authorization` value always comes from the credential.
    pub(crate) fn merged_headers(
        &self,
        strategy_headers: &[(String, String)],
        authorization: &str,
    ) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        for (name, value) in strategy_headers.iter().chain(self.headers.iter()) {
            let name = parse_name(name)?;
            if name == AUTHORIZATION {
                continue;
            }
            map.insert(name, parse_value(value)?);
        }
        map.insert(AUTHORIZATION, parse_value(authorization)?);
        Ok(map)
    }
}

fn parse_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| Error::InvalidRequest(format!("invalid header name '{}': {}", name, e)))
}

fn parse_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::InvalidRequest(format!("invalid header value: {}", e)))
}
