//! Request construction
//!
//! Headers are collected in layers and merged in a fixed order when the
//! request is built, later layers replacing earlier ones:
//! SDK identification, caller headers, operation headers, Accept override.

use crate::error::{Error, Result};
use codeengine_api::ValidationError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    url: Option<Url>,
    sdk_headers: HeaderMap,
    custom_headers: HeaderMap,
    operation_headers: HeaderMap,
    accept: Option<HeaderValue>,
    query: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl RequestBuilder {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            url: None,
            sdk_headers: HeaderMap::new(),
            custom_headers: HeaderMap::new(),
            operation_headers: HeaderMap::new(),
            accept: None,
            query: Vec::new(),
            body: None,
        }
    }

    /// Resolve `path_template` against `service_url`.
    ///
    /// Every `{name}` placeholder is replaced by the matching value in
    /// `path_params`. Values must be non-empty and are inserted once, never
    /// re-expanded. Each resulting segment is percent-encoded as a path segment.
    pub fn resolve_request_url(
        mut self,
        service_url: &str,
        path_template: &str,
        path_params: &[(&str, &str)],
    ) -> Result<Self> {
        if service_url.is_empty() {
            return Err(Error::ServiceUrlMissing);
        }

        let mut url = Url::parse(service_url)
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", service_url, e)))?;

        let segments = path_template
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| substitute(segment, path_params))
            .collect::<Result<Vec<_>>>()?;

        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| Error::InvalidUrl(format!("{} cannot be a base URL", service_url)))?;
            path.pop_if_empty();
            for segment in &segments {
                path.push(segment);
            }
        }

        self.url = Some(url);
        Ok(self)
    }

    /// Add an SDK identification header
    pub fn sdk_header(mut self, name: &str, value: &str) -> Result<Self> {
        let (name, value) = header_pair(name, value)?;
        self.sdk_headers.insert(name, value);
        Ok(self)
    }

    /// Add caller-supplied headers, verbatim
    pub fn custom_headers(mut self, headers: &BTreeMap<String, String>) -> Result<Self> {
        for (name, value) in headers {
            let (name, value) = header_pair(name, value)?;
            self.custom_headers.insert(name, value);
        }
        Ok(self)
    }

    /// Add a header that carries the operation's semantics
    pub fn operation_header(mut self, name: &str, value: &str) -> Result<Self> {
        let (name, value) = header_pair(name, value)?;
        self.operation_headers.insert(name, value);
        Ok(self)
    }

    /// Explicit Accept override, applied last
    pub fn accept(mut self, value: &str) -> Result<Self> {
        let (_, value) = header_pair(ACCEPT.as_str(), value)?;
        self.accept = Some(value);
        Ok(self)
    }

    pub fn add_query(mut self, name: &str, value: impl ToString) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    /// Serialize `body` as JSON and mark the request accordingly
    pub fn set_json_body<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        self.operation_header(CONTENT_TYPE.as_str(), "application/json")
    }

    /// Merge everything into a request; performs no I/O
    pub fn build(self) -> Result<reqwest::Request> {
        let mut url = self
            .url
            .ok_or_else(|| Error::InvalidUrl("request URL was not resolved".to_string()))?;

        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &self.query {
                pairs.append_pair(name, value);
            }
        }

        let mut headers = self.sdk_headers;
        for layer in [self.custom_headers, self.operation_headers] {
            for (name, value) in layer {
                if let Some(name) = name {
                    headers.insert(name, value);
                }
            }
        }
        if let Some(accept) = self.accept {
            headers.insert(ACCEPT, accept);
        }

        let mut request = reqwest::Request::new(self.method, url);
        *request.headers_mut() = headers;
        if let Some(body) = self.body {
            *request.body_mut() = Some(body.into());
        }

        Ok(request)
    }
}

fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    let header_value = HeaderValue::from_str(value).map_err(|e| Error::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    Ok((header_name, header_value))
}

/// Replace `{name}` placeholders in a single path segment
fn substitute(segment: &str, params: &[(&str, &str)]) -> Result<String> {
    let mut out = String::with_capacity(segment.len());
    let mut rest = segment;

    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        let name = &rest[open + 1..open + close];
        let value = params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
            .ok_or_else(|| ValidationError::PathParam {
                name: name.to_string(),
                reason: "no value supplied",
            })?;
        if value.is_empty() {
            return Err(ValidationError::PathParam {
                name: name.to_string(),
                reason: "value is empty",
            }
            .into());
        }

        out.push_str(&rest[..open]);
        out.push_str(value);
        rest = &rest[open + close + 1..];
    }
    out.push_str(rest);

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_params_are_substituted_verbatim() {
        let request = RequestBuilder::new(Method::GET)
            .resolve_request_url(
                "https://api.us-south.codeengine.cloud.ibm.com/api/v1",
                "/namespaces/{id}/config",
                &[("id", "testString")],
            )
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(
            request.url().as_str(),
            "https://api.us-south.codeengine.cloud.ibm.com/api/v1/namespaces/testString/config"
        );
    }

    #[test]
    fn test_trailing_slash_on_service_url() {
        let request = RequestBuilder::new(Method::GET)
            .resolve_request_url("http://localhost:8080/v2/", "/projects/{id}", &[("id", "abc")])
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.url().path(), "/v2/projects/abc");
    }

    #[test]
    fn test_special_characters_are_escaped_not_expanded() {
        let request = RequestBuilder::new(Method::GET)
            .resolve_request_url("http://localhost", "/projects/{id}", &[("id", "a/{id} b")])
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.url().path(), "/projects/a%2F%7Bid%7D%20b");
    }

    #[test]
    fn test_empty_service_url() {
        let err = RequestBuilder::new(Method::GET)
            .resolve_request_url("", "/projects", &[])
            .unwrap_err();
        assert!(matches!(err, Error::ServiceUrlMissing));
    }

    #[test]
    fn test_missing_and_empty_path_params() {
        let err = RequestBuilder::new(Method::GET)
            .resolve_request_url("http://localhost", "/projects/{id}", &[])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::PathParam { ref name, .. }) if name == "id"
        ));

        let err = RequestBuilder::new(Method::GET)
            .resolve_request_url("http://localhost", "/projects/{id}", &[("id", "")])
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::PathParam { .. })));
    }

    #[test]
    fn test_header_precedence() {
        let mut custom = BTreeMap::new();
        custom.insert("User-Agent".to_string(), "caller-agent".to_string());
        custom.insert("Refresh-Token".to_string(), "from-caller".to_string());
        custom.insert("accept".to_string(), "application/yaml".to_string());
        custom.insert("X-Extra".to_string(), "kept".to_string());

        let request = RequestBuilder::new(Method::GET)
            .resolve_request_url("http://localhost", "/config", &[])
            .unwrap()
            .sdk_header("User-Agent", "sdk-agent")
            .unwrap()
            .custom_headers(&custom)
            .unwrap()
            .operation_header("Refresh-Token", "from-operation")
            .unwrap()
            .operation_header("Accept", "text/plain")
            .unwrap()
            .accept("application/json")
            .unwrap()
            .build()
            .unwrap();

        let headers = request.headers();
        assert_eq!(headers.get("user-agent").unwrap(), "caller-agent");
        assert_eq!(headers.get("refresh-token").unwrap(), "from-operation");
        assert_eq!(headers.get("accept").unwrap(), "application/json");
        assert_eq!(headers.get("x-extra").unwrap(), "kept");
    }

    #[test]
    fn test_query_and_json_body() {
        let request = RequestBuilder::new(Method::POST)
            .resolve_request_url("http://localhost/v2", "/projects", &[])
            .unwrap()
            .add_query("limit", 10)
            .add_query("start", "a b")
            .set_json_body(&serde_json::json!({"name": "demo"}))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(request.url().query(), Some("limit=10&start=a+b"));
        assert_eq!(request.headers().get("content-type").unwrap(), "application/json");
        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(body, br#"{"name":"demo"}"#);
    }

    #[test]
    fn test_invalid_header_value() {
        let err = RequestBuilder::new(Method::GET)
            .operation_header("Refresh-Token", "line\nbreak")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidHeader { .. }));
    }

    #[test]
    fn test_build_without_url() {
        assert!(matches!(
            RequestBuilder::new(Method::GET).build(),
            Err(Error::InvalidUrl(_))
        ));
    }
}
