//! Base service: executes built requests and maps responses

use crate::auth::Authenticator;
use crate::error::{extract_error_message, Error, Result, TRANSACTION_ID_HEADER};
use crate::request::RequestBuilder;
use reqwest::header::{HeaderMap, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const SDK_ANALYTICS_HEADER: &str = "X-IBMCloud-SDK-Analytics";

/// Identifies an operation for SDK analytics and logging
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Operation {
    pub service_name: &'static str,
    pub service_version: &'static str,
    pub operation_id: &'static str,
}

impl Operation {
    fn analytics(&self) -> String {
        format!(
            "service_name={};service_version={};operation_id={}",
            self.service_name, self.service_version, self.operation_id
        )
    }
}

/// Status, headers and decoded body of a successful call
#[derive(Clone, Debug)]
pub struct DetailedResponse<T> {
    pub status_code: u16,
    pub headers: HeaderMap,
    pub result: T,
}

impl<T> DetailedResponse<T> {
    pub fn into_result(self) -> T {
        self.result
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.headers
            .get(TRANSACTION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
    }
}

struct RawResponse {
    status_code: u16,
    headers: HeaderMap,
    body: Vec<u8>,
}

/// BaseService holds the configuration shared by every call of a service.
///
/// Calls only borrow the service immutably; changing the URL or default
/// headers needs `&mut self` and so cannot race with calls in flight.
#[derive(Clone, Debug)]
pub struct BaseService {
    service_url: String,
    http: reqwest::Client,
    authenticator: Arc<dyn Authenticator>,
    default_headers: BTreeMap<String, String>,
}

impl BaseService {
    pub fn new(service_url: impl Into<String>, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            service_url: service_url.into(),
            http: reqwest::Client::new(),
            authenticator,
            default_headers: BTreeMap::new(),
        }
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    /// Point the service at another URL. An empty URL makes every later call
    /// fail with [`Error::ServiceUrlMissing`].
    pub fn set_service_url(&mut self, service_url: impl Into<String>) {
        self.service_url = service_url.into();
    }

    /// Headers sent with every request, below caller headers in precedence
    pub fn set_default_headers(&mut self, headers: BTreeMap<String, String>) {
        self.default_headers = headers;
    }

    pub fn authenticator(&self) -> &Arc<dyn Authenticator> {
        &self.authenticator
    }

    /// Start a request for `operation` with the URL resolved and SDK headers set
    pub fn request(
        &self,
        method: Method,
        path_template: &str,
        path_params: &[(&str, &str)],
        operation: &Operation,
    ) -> Result<RequestBuilder> {
        RequestBuilder::new(method)
            .resolve_request_url(&self.service_url, path_template, path_params)?
            .sdk_header(USER_AGENT.as_str(), &user_agent())?
            .sdk_header(SDK_ANALYTICS_HEADER, &operation.analytics())?
            .custom_headers(&self.default_headers)
    }

    /// Execute and return the body as text
    pub async fn invoke_text(
        &self,
        builder: RequestBuilder,
        timeout: Option<Duration>,
    ) -> Result<DetailedResponse<String>> {
        let raw = self.execute(builder, timeout).await?;
        let result = String::from_utf8(raw.body)
            .map_err(|e| Error::Decode(format!("body is not valid UTF-8: {}", e)))?;
        Ok(DetailedResponse {
            status_code: raw.status_code,
            headers: raw.headers,
            result,
        })
    }

    /// Execute and decode the body as JSON
    pub async fn invoke_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        timeout: Option<Duration>,
    ) -> Result<DetailedResponse<T>> {
        let raw = self.execute(builder, timeout).await?;
        if raw.body.is_empty() {
            return Err(Error::Decode("expected a JSON body, got none".to_string()));
        }
        if let Some(content_type) = raw.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
            if !content_type.contains("json") {
                return Err(Error::Decode(format!(
                    "expected a JSON body, got {}",
                    content_type
                )));
            }
        }
        let result = serde_json::from_slice(&raw.body).map_err(|e| Error::Decode(e.to_string()))?;
        Ok(DetailedResponse {
            status_code: raw.status_code,
            headers: raw.headers,
            result,
        })
    }

    /// Execute and discard any body
    pub async fn invoke_empty(
        &self,
        builder: RequestBuilder,
        timeout: Option<Duration>,
    ) -> Result<DetailedResponse<()>> {
        let raw = self.execute(builder, timeout).await?;
        Ok(DetailedResponse {
            status_code: raw.status_code,
            headers: raw.headers,
            result: (),
        })
    }

    async fn execute(
        &self,
        builder: RequestBuilder,
        timeout: Option<Duration>,
    ) -> Result<RawResponse> {
        let mut request = builder.build()?;

        let call = async {
            self.authenticator
                .authenticate(request.headers_mut())
                .await?;

            debug!("{} {}", request.method(), request.url());
            let response = self
                .http
                .execute(request)
                .await
                .map_err(Error::from_transport)?;

            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await.map_err(Error::from_transport)?;
            debug!("Response status {} ({} bytes)", status.as_u16(), body.len());

            Ok::<_, Error>((status, headers, body))
        };

        let (status, headers, body) = match timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| Error::DeadlineExceeded)??,
            None => call.await?,
        };

        if !status.is_success() {
            let transaction_id = headers
                .get(TRANSACTION_ID_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            let message = extract_error_message(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
            warn!(
                "Request failed with HTTP {} (transaction {}): {}",
                status.as_u16(),
                transaction_id.as_deref().unwrap_or("-"),
                message
            );
            return Err(Error::Status {
                status: status.as_u16(),
                transaction_id,
                message,
            });
        }

        Ok(RawResponse {
            status_code: status.as_u16(),
            headers,
            body: body.to_vec(),
        })
    }
}

fn user_agent() -> String {
    format!(
        "codeengine-sdk-rust/{} (arch={}; os={})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::ARCH,
        std::env::consts::OS
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{BearerTokenAuthenticator, NoAuthAuthenticator};
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const OPERATION: Operation = Operation {
        service_name: "code_engine",
        service_version: "V1",
        operation_id: "test_operation",
    };

    fn service(url: &str) -> BaseService {
        BaseService::new(url, Arc::new(NoAuthAuthenticator))
    }

    #[tokio::test]
    async fn test_sdk_and_auth_headers_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/things"))
            .and(header("authorization", "Bearer static-token"))
            .and(header(
                "x-ibmcloud-sdk-analytics",
                "service_name=code_engine;service_version=V1;operation_id=test_operation",
            ))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let service = BaseService::new(
            format!("{}/v1", server.uri()),
            Arc::new(BearerTokenAuthenticator::new("static-token")),
        );
        let builder = service
            .request(Method::GET, "/things", &[], &OPERATION)
            .unwrap();
        let response = service.invoke_text(builder, None).await.unwrap();
        assert_eq!(response.status_code, 200);
        assert_eq!(response.result, "ok");
    }

    #[tokio::test]
    async fn test_error_status_carries_details() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(
                ResponseTemplate::new(404)
                    .insert_header("X-Global-Transaction-Id", "tx-42")
                    .set_body_json(serde_json::json!({
                        "errors": [{"code": "not_found", "message": "Project not found"}]
                    })),
            )
            .mount(&server)
            .await;

        let service = service(&server.uri());
        let builder = service
            .request(Method::GET, "/missing", &[], &OPERATION)
            .unwrap();
        let err = service.invoke_text(builder, None).await.unwrap_err();

        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.transaction_id(), Some("tx-42"));
        assert_eq!(err.to_string(), "HTTP 404: Project not found");
    }

    #[tokio::test]
    async fn test_error_status_without_body_uses_reason() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let service = service(&server.uri());
        let builder = service
            .request(Method::DELETE, "/x", &[], &OPERATION)
            .unwrap();
        match service.invoke_empty(builder, None).await {
            Err(Error::Status {
                status,
                transaction_id,
                message,
            }) => {
                assert_eq!(status, 503);
                assert!(transaction_id.is_none());
                assert_eq!(message, "Service Unavailable");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_millis(100)),
            )
            .mount(&server)
            .await;

        let service = service(&server.uri());
        let builder = service.request(Method::GET, "/slow", &[], &OPERATION).unwrap();
        let err = service
            .invoke_text(builder, Some(Duration::from_millis(80)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_json_decode_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("{not json", "application/json"))
            .mount(&server)
            .await;

        let service = service(&server.uri());
        let builder = service.request(Method::GET, "/x", &[], &OPERATION).unwrap();
        let err = service
            .invoke_json::<serde_json::Value>(builder, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[tokio::test]
    async fn test_json_rejects_other_content_types() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "text/html"))
            .mount(&server)
            .await;

        let service = service(&server.uri());
        let builder = service.request(Method::GET, "/x", &[], &OPERATION).unwrap();
        let err = service
            .invoke_json::<serde_json::Value>(builder, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[tokio::test]
    async fn test_transport_error() {
        let service = service("http://127.0.0.1:1");
        let builder = service.request(Method::GET, "/x", &[], &OPERATION).unwrap();
        let err = service.invoke_text(builder, None).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[test]
    fn test_default_headers_sit_below_caller_headers() {
        let mut service = service("http://localhost");
        let mut defaults = BTreeMap::new();
        defaults.insert("X-Team".to_string(), "default".to_string());
        service.set_default_headers(defaults);

        let mut custom = BTreeMap::new();
        custom.insert("X-Team".to_string(), "caller".to_string());
        let request = service
            .request(Method::GET, "/x", &[], &OPERATION)
            .unwrap()
            .custom_headers(&custom)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.headers().get("x-team").unwrap(), "caller");
    }

    #[test]
    fn test_empty_service_url() {
        let mut service = service("http://localhost");
        service.set_service_url("");
        assert!(matches!(
            service.request(Method::GET, "/x", &[], &OPERATION),
            Err(Error::ServiceUrlMissing)
        ));
    }
}
