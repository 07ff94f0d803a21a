//! Bearer-authenticated HTTP access to one org.
//!
//! `OrgClient` owns the `reqwest` client and the session, builds Tooling API
//! URLs, and turns non-success responses into typed errors.
//!
//! ## Security
//!
//! - The access token is redacted in Debug output
//! - Error bodies are sanitized before they reach an error message

use std::sync::OnceLock;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, instrument};

use crate::config::ClientConfig;
use crate::credentials::Credentials;
use crate::error::{Error, ErrorKind, Result};

/// HTTP client bound to one org session.
#[derive(Clone)]
pub struct OrgClient {
    http: reqwest::Client,
    config: ClientConfig,
    instance_url: String,
    access_token: String,
    api_version: String,
}

impl std::fmt::Debug for OrgClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrgClient")
            .field("instance_url", &self.instance_url)
            .field("access_token", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl OrgClient {
    /// Create a client for the session described by `credentials`.
    pub fn new(credentials: &dyn Credentials) -> Result<Self> {
        Self::with_config(credentials, ClientConfig::default())
    }

    /// Create a client with custom HTTP configuration.
    pub fn with_config(credentials: &dyn Credentials, config: ClientConfig) -> Result<Self> {
        if !credentials.is_valid() {
            return Err(Error::new(ErrorKind::Config(
                "instance URL and access token must not be empty".to_string(),
            )));
        }
        url::Url::parse(credentials.instance_url())?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .gzip(config.accept_compressed)
            .deflate(config.accept_compressed)
            .build()
            .map_err(|e| Error::with_source(ErrorKind::Config(e.to_string()), e))?;

        Ok(Self {
            http,
            config,
            instance_url: credentials.instance_url().trim_end_matches('/').to_string(),
            access_token: credentials.access_token().to_string(),
            api_version: credentials.api_version().to_string(),
        })
    }

    /// Set the API version (e.g., "62.0").
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Get the instance URL.
    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    /// Get the API version.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Build the full URL for a path.
    ///
    /// Absolute URLs pass through; paths are appended to the instance URL.
    /// `nextRecordsUrl` values come back as instance-relative paths.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.instance_url, path)
        } else {
            format!("{}/{}", self.instance_url, path)
        }
    }

    /// Build the Tooling API URL for a path.
    ///
    /// Example: `tooling_url("runTestsAsynchronous/")` ->
    /// `{instance}/services/data/v62.0/tooling/runTestsAsynchronous/`
    pub fn tooling_url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!(
            "{}/services/data/v{}/tooling/{}",
            self.instance_url, self.api_version, path
        )
    }

    /// GET request with JSON response deserialization.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let request = self.http.get(self.url(url));
        self.send(request).await?.json().await.map_err(Into::into)
    }

    /// POST request with JSON body and response.
    #[instrument(skip(self, body), fields(url = %url))]
    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.http.post(self.url(url)).json(body);
        self.send(request).await?.json().await.map_err(Into::into)
    }

    /// Build the REST (data) API URL for a path.
    pub fn data_url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!(
            "{}/services/data/v{}/{}",
            self.instance_url, self.api_version, path
        )
    }

    /// Execute a Tooling API query (first page only).
    pub async fn tooling_query<T: DeserializeOwned>(&self, soql: &str) -> Result<QueryResult<T>> {
        self.query_page(&self.tooling_url("query/"), soql).await
    }

    /// Execute a Tooling API query and follow `nextRecordsUrl` to the end.
    pub async fn tooling_query_all<T: DeserializeOwned>(&self, soql: &str) -> Result<Vec<T>> {
        let first = self.tooling_query(soql).await?;
        self.drain_pages(first).await
    }

    /// Execute a REST API query and follow `nextRecordsUrl` to the end.
    ///
    /// Some objects (`AsyncApexJob`) are only queryable through the data API.
    pub async fn data_query_all<T: DeserializeOwned>(&self, soql: &str) -> Result<Vec<T>> {
        let first = self.query_page(&self.data_url("query/"), soql).await?;
        self.drain_pages(first).await
    }

    async fn query_page<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        soql: &str,
    ) -> Result<QueryResult<T>> {
        let url = format!("{}?q={}", endpoint, urlencoding::encode(soql));
        self.get_json(&url).await
    }

    async fn drain_pages<T: DeserializeOwned>(&self, mut result: QueryResult<T>) -> Result<Vec<T>> {
        let mut records = std::mem::take(&mut result.records);

        while let Some(next_url) = result.next_records_url.take() {
            result = self.get_json(&next_url).await?;
            records.append(&mut result.records);
        }

        Ok(records)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let request = request.bearer_auth(&self.access_token).build()?;
        let method = request.method().clone();

        if self.config.enable_tracing {
            debug!(%method, url = %request.url(), "Sending request");
        }

        let response = self.http.execute(request).await?;
        let status = response.status().as_u16();

        if response.status().is_success() {
            if self.config.enable_tracing {
                debug!(status, content_length = response.content_length(), "Response received");
            }
            return Ok(response);
        }

        if self.config.enable_tracing {
            info!(status, %method, "Non-success response");
        }
        let body = response.text().await.unwrap_or_default();
        Err(parse_error_response(status, &body))
    }
}

/// Result of a SOQL query.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct QueryResult<T> {
    /// Total number of records matching the query.
    #[serde(rename = "totalSize")]
    pub total_size: u64,

    /// Whether all records are returned (no more pages).
    pub done: bool,

    /// URL to fetch next batch of results.
    #[serde(rename = "nextRecordsUrl")]
    pub next_records_url: Option<String>,

    /// The records.
    pub records: Vec<T>,
}

/// Salesforce API error response format.
#[derive(Debug, serde::Deserialize)]
struct SalesforceErrorResponse {
    #[serde(alias = "errorCode")]
    error_code: String,
    message: String,
    fields: Option<Vec<String>>,
}

/// Map a non-success response to an error kind.
fn parse_error_response(status: u16, body: &str) -> Error {
    // Salesforce usually sends an array of errors, sometimes a single object.
    let first = serde_json::from_str::<Vec<SalesforceErrorResponse>>(body)
        .ok()
        .and_then(|errors| errors.into_iter().next())
        .or_else(|| serde_json::from_str::<SalesforceErrorResponse>(body).ok());

    if let Some(err) = first {
        return Error::new(ErrorKind::SalesforceApi {
            error_code: err.error_code,
            message: sanitize_error_message(&err.message),
            fields: err.fields.unwrap_or_default(),
        });
    }

    let sanitized = sanitize_error_message(body);
    let kind = match status {
        401 => ErrorKind::Authentication(sanitized),
        403 => ErrorKind::Authorization(sanitized),
        404 => ErrorKind::NotFound(sanitized),
        _ => ErrorKind::Http {
            status,
            message: sanitized,
        },
    };

    Error::new(kind)
}

/// Redact token-like strings and cap the length of an error message.
fn sanitize_error_message(message: &str) -> String {
    const MAX_LENGTH: usize = 500;

    static TOKEN: OnceLock<regex_lite::Regex> = OnceLock::new();
    static SESSION: OnceLock<regex_lite::Regex> = OnceLock::new();

    // Access tokens look like "00D<org id>!<secret>"
    let token = TOKEN.get_or_init(|| {
        regex_lite::Regex::new(r"00[A-Za-z0-9]{13,}![A-Za-z0-9_.]+").expect("valid token pattern")
    });
    let session = SESSION.get_or_init(|| {
        regex_lite::Regex::new(r"sid=[A-Za-z0-9]{20,}").expect("valid session pattern")
    });

    let sanitized = token.replace_all(message, "[REDACTED_TOKEN]");
    let mut sanitized = session.replace_all(&sanitized, "sid=[REDACTED]").into_owned();

    if sanitized.len() > MAX_LENGTH {
        let mut cut = MAX_LENGTH;
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
        sanitized.push_str("...[truncated]");
    }

    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::SalesforceCredentials;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(uri: &str) -> OrgClient {
        let creds = SalesforceCredentials::new(uri, "test-token", "62.0");
        OrgClient::new(&creds).unwrap()
    }

    #[test]
    fn test_url_building() {
        let client = client_for("https://na1.salesforce.com/");

        assert_eq!(client.instance_url(), "https://na1.salesforce.com");
        assert_eq!(
            client.url("/services/data/v62.0/tooling/query/01gxx-2000"),
            "https://na1.salesforce.com/services/data/v62.0/tooling/query/01gxx-2000"
        );
        assert_eq!(client.url("https://other.com/path"), "https://other.com/path");
        assert_eq!(
            client.tooling_url("runTestsAsynchronous/"),
            "https://na1.salesforce.com/services/data/v62.0/tooling/runTestsAsynchronous/"
        );

        assert_eq!(
            client.data_url("query/"),
            "https://na1.salesforce.com/services/data/v62.0/query/"
        );

        let client = client.with_api_version("60.0");
        assert_eq!(
            client.tooling_url("/query/"),
            "https://na1.salesforce.com/services/data/v60.0/tooling/query/"
        );
    }

    #[test]
    fn test_rejects_bad_credentials() {
        let creds = SalesforceCredentials::new("not a url", "token", "62.0");
        let err = OrgClient::new(&creds).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Config(_)));

        let creds = SalesforceCredentials::new("https://na1.salesforce.com", "", "62.0");
        assert!(OrgClient::new(&creds).is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = client_for("https://na1.salesforce.com");
        let debug = format!("{:?}", client);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("test-token"));
    }

    #[tokio::test]
    async fn test_query_all_follows_pagination() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/services/data/v62.0/tooling/query/"))
            .and(query_param("q", "SELECT Id FROM ApexClass"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "totalSize": 3,
                "done": false,
                "nextRecordsUrl": "/services/data/v62.0/tooling/query/01gxx-2000",
                "records": [{"Id": "a"}, {"Id": "b"}]
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/services/data/v62.0/tooling/query/01gxx-2000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "totalSize": 3,
                "done": true,
                "records": [{"Id": "c"}]
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server.uri());
        let records: Vec<serde_json::Value> = client
            .tooling_query_all("SELECT Id FROM ApexClass")
            .await
            .unwrap();

        let ids: Vec<&str> = records.iter().filter_map(|r| r["Id"].as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_salesforce_error_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/services/data/v62.0/tooling/query/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!([{
                "errorCode": "INVALID_FIELD",
                "message": "No such column 'Foo' on entity 'ApexClass'",
                "fields": ["Foo"]
            }])))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server.uri());
        let err = client
            .tooling_query::<serde_json::Value>("SELECT Foo FROM ApexClass")
            .await
            .unwrap_err();

        match err.kind {
            ErrorKind::SalesforceApi {
                error_code, fields, ..
            } => {
                assert_eq!(error_code, "INVALID_FIELD");
                assert_eq!(fields, vec!["Foo".to_string()]);
            }
            other => panic!("unexpected error kind: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/unauthorized"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Session expired or invalid"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server.uri());

        let err = client.get_json::<serde_json::Value>("/unauthorized").await.unwrap_err();
        assert!(err.is_auth_error());

        let err = client.get_json::<serde_json::Value>("/missing").await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::NotFound(_)));

        let err = client.get_json::<serde_json::Value>("/broken").await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Http { status: 503, .. }));
    }

    #[test]
    fn test_sanitize_error_message() {
        let message = "Bad session 00Dxx0000001gPL!AR8AQJXg5oRkHSZ2.secret and sid=ABCDEFGHIJKLMNOPQRSTUVWX";
        let sanitized = sanitize_error_message(message);

        assert!(sanitized.contains("[REDACTED_TOKEN]"));
        assert!(sanitized.contains("sid=[REDACTED]"));
        assert!(!sanitized.contains("secret"));

        let long = "x".repeat(800);
        let sanitized = sanitize_error_message(&long);
        assert!(sanitized.ends_with("...[truncated]"));
        assert_eq!(sanitized.len(), 500 + "...[truncated]".len());
    }
}
