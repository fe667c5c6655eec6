use http::Method;
use reqwest::{multipart, Client as ReqwestClient, Response};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};
use url::Url;

use crate::config::{ClientConfig, Context, Host};
use crate::request::RequestBuilder;
use crate::response::{ApiResult, ResponseClassifier, StatusError};
use crate::{OAuthParameters, Result, Secrets, Signer, TokenPair};

/// Member added to the result of a download.
pub const BYTES_WRITTEN_KEY: &str = "bytes_written";
/// Query parameter naming an uploaded file.
pub const UPLOAD_FILE_KEY: &str = "file";

/// A file sent as the single `file` part of a multipart upload.
#[derive(Debug, Clone)]
pub struct Upload {
    file_name: String,
    contents: Vec<u8>,
}

impl Upload {
    pub fn new<TName, TContents>(file_name: TName, contents: TContents) -> Self
    where
        TName: Into<String>,
        TContents: Into<Vec<u8>>,
    {
        Upload {
            file_name: file_name.into(),
            contents: contents.into(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    fn into_form(self) -> multipart::Form {
        let part = multipart::Part::bytes(self.contents).file_name(self.file_name);
        multipart::Form::new()
            .percent_encode_noop()
            .part(UPLOAD_FILE_KEY, part)
    }
}

/// One remote procedure call: where it goes and what it carries.
///
/// Paths are given as segments below the version prefix; each segment is
/// percent-encoded when the url is built.
#[derive(Debug, Clone)]
pub struct ApiCall {
    method: Method,
    host: Host,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    form: Vec<(String, String)>,
    upload: Option<Upload>,
}

impl ApiCall {
    pub fn new<I>(method: Method, host: Host, segments: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        ApiCall {
            method,
            host,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            form: Vec::new(),
            upload: None,
        }
    }

    pub fn get<I>(host: Host, segments: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        ApiCall::new(Method::GET, host, segments)
    }

    pub fn post<I>(host: Host, segments: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        ApiCall::new(Method::POST, host, segments)
    }

    /// Append the segments of a slash-separated remote path.
    pub fn path(mut self, path: &str) -> Self {
        self.segments.extend(path_segments(path).map(str::to_string));
        self
    }

    pub fn query<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn form<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.form.push((key.into(), value.into()));
        self
    }

    pub fn upload(self, upload: Upload) -> Self {
        ApiCall {
            upload: Some(upload),
            ..self
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

pub(crate) fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// Client of the storage API.
///
/// Holds the configuration and, once the handshake is done, the access
/// token every call is signed with. Calls made without an access token are
/// signed with the consumer pair only and fail on the server side.
#[derive(Debug, Clone)]
pub struct Client {
    inner: ReqwestClient,
    config: ClientConfig,
    access_token: Option<TokenPair>,
}

impl Client {
    /// Constructs a new `Client`.
    ///
    /// This method calls reqwest::Client::new() internally.
    pub fn new(config: ClientConfig) -> Self {
        Client::new_with_client(ReqwestClient::new(), config)
    }

    /// Constructs a new `Client` with specifying inner `reqwest::Client`.
    pub fn new_with_client(client: ReqwestClient, config: ClientConfig) -> Self {
        Client {
            inner: client,
            config,
            access_token: None,
        }
    }

    /// Use an access token obtained earlier instead of running the handshake.
    pub fn with_access_token(self, access_token: TokenPair) -> Self {
        Client {
            access_token: Some(access_token),
            ..self
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn context(&self) -> Context {
        self.config.context
    }

    /// Switch the root subsequent calls address.
    pub fn set_context(&mut self, context: Context) {
        self.config.context = context;
    }

    pub fn access_token(&self) -> Option<&TokenPair> {
        self.access_token.as_ref()
    }

    pub fn set_access_token(&mut self, access_token: TokenPair) {
        self.access_token = Some(access_token);
    }

    pub(crate) fn url(&self, host: Host, segments: &[&str]) -> Result<Url> {
        self.config.endpoints.url(host, segments)
    }

    /// Start building a signed `Request` with the `Method` and `Url`.
    pub(crate) fn request<'a>(
        &'a self,
        method: Method,
        url: Url,
        token: Option<&'a TokenPair>,
        parameters: OAuthParameters<'a>,
    ) -> RequestBuilder<'a, Secrets<'a>> {
        RequestBuilder::new(
            self.inner.request(method.clone(), url.clone()),
            method,
            url,
            Signer::new(self.config.secrets(token), parameters),
        )
    }

    /// Sends `call` and normalizes the answer with the default classifier.
    pub async fn invoke(&self, call: ApiCall) -> Result<ApiResult> {
        self.invoke_with(call, &StatusError).await
    }

    /// Sends `call`; non-2xx statuses are turned into results by `classifier`.
    ///
    /// # Errors
    ///
    /// Only failures without an HTTP status (connection, invalid endpoint
    /// url) are returned as `Err`.
    pub async fn invoke_with<C>(&self, call: ApiCall, classifier: &C) -> Result<ApiResult>
    where
        C: ResponseClassifier,
    {
        let response = self.send(call).await?;
        self.normalize(response, classifier).await
    }

    /// Sends `call` and streams a 2xx body into `sink` instead of decoding it.
    ///
    /// The result carries the status and the number of bytes written.
    pub async fn download_to<W, C>(
        &self,
        call: ApiCall,
        sink: &mut W,
        classifier: &C,
    ) -> Result<ApiResult>
    where
        W: AsyncWrite + Unpin + ?Sized,
        C: ResponseClassifier,
    {
        let mut response = self.send(call).await?;
        let status = response.status();
        if !status.is_success() {
            return self.normalize(response, classifier).await;
        }

        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;
        debug!(%status, bytes = written, "download finished");

        let mut result = ApiResult::status(status);
        result.insert(BYTES_WRITTEN_KEY, written.into());
        Ok(result)
    }

    async fn send(&self, call: ApiCall) -> Result<Response> {
        let ApiCall {
            method,
            host,
            segments,
            query,
            form,
            upload,
        } = call;
        let url = self.config.endpoints.url(host, &segments)?;
        debug!(%method, %url, "sending API request");

        let mut builder = self.request(
            method.clone(),
            url.clone(),
            self.access_token.as_ref(),
            OAuthParameters::new(),
        );
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if !form.is_empty() {
            builder = builder.form(&form);
        }
        if let Some(upload) = upload {
            builder = builder.query(&[(UPLOAD_FILE_KEY, upload.file_name())]);
            builder = builder.multipart(upload.into_form());
        }

        let response = builder.send().await?;
        debug!(%method, %url, status = %response.status(), "received API response");
        Ok(response)
    }

    async fn normalize<C>(&self, response: Response, classifier: &C) -> Result<ApiResult>
    where
        C: ResponseClassifier,
    {
        let status = response.status();
        if !status.is_success() {
            if self.config.debug {
                let body = response.text().await.unwrap_or_default();
                debug!(%status, %body, "API call failed");
            }
            return Ok(classifier.classify(status));
        }

        let body = response.bytes().await?;
        let result = ApiResult::from_body(status, &body);
        if result.is_error() {
            warn!(%status, length = body.len(), "response body is not a JSON object");
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use serde_json::{json, Value};
    use wiremock::matchers::{body_string_contains, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::Endpoints;
    use crate::response::{NotModified, INVALID_JSON_MESSAGE};

    fn client_for(server: &MockServer) -> Client {
        let config = ClientConfig::new("consumer_key", "consumer_secret")
            .endpoints(Endpoints::single_host(server.uri()));
        Client::new(config).with_access_token(TokenPair::new("access", "access_secret"))
    }

    fn authorization_of(request: &wiremock::Request) -> String {
        request
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    #[test]
    fn call_builder_splits_paths() {
        let call = ApiCall::get(Host::Api, vec!["metadata", "dropbox"]).path("/Photos//2020/");
        assert_eq!(call.segments(), ["metadata", "dropbox", "Photos", "2020"]);
        assert_eq!(call.method(), &Method::GET);
    }

    #[tokio::test]
    async fn decodes_json_and_adds_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/0/account/info"))
            .and(header_exists("authorization"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"uid": 12, "http_response_code": "spoofed"}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client
            .invoke(ApiCall::get(Host::Api, vec!["account", "info"]))
            .await
            .unwrap();
        assert_eq!(
            Value::from(result),
            json!({"uid": 12, "http_response_code": 200})
        );

        let requests = server.received_requests().await.unwrap();
        let authorization = authorization_of(&requests[0]);
        assert!(authorization.starts_with("OAuth "));
        assert!(authorization.contains("oauth_token=\"access\""));
        assert!(authorization.contains("oauth_consumer_key=\"consumer_key\""));
    }

    #[tokio::test]
    async fn invalid_json_becomes_error_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(202).set_body_string("<html/>"))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .invoke(ApiCall::get(Host::Api, vec!["account", "info"]))
            .await
            .unwrap();
        assert_eq!(
            Value::from(result),
            json!({"error": INVALID_JSON_MESSAGE, "http_response_code": 202})
        );
    }

    #[tokio::test]
    async fn not_modified_depends_on_classifier() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(304))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let call = ApiCall::get(Host::Api, vec!["metadata", "dropbox"]).query("hash", "abc");

        let result = client.invoke_with(call.clone(), &NotModified).await.unwrap();
        assert_eq!(Value::from(result), json!({"http_response_code": 304}));

        let result = client.invoke(call).await.unwrap();
        assert!(result.is_error());
        assert_eq!(result.http_response_code(), Some(304));
    }

    #[tokio::test]
    async fn failures_are_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"error": "gone"}"#))
            .mount(&server)
            .await;

        let mut client = client_for(&server);
        let call = ApiCall::post(Host::Api, vec!["fileops", "delete"]).form("path", "/x");
        let result = client.invoke(call.clone()).await.unwrap();
        assert_eq!(
            Value::from(result),
            json!({"error": "404 Not Found", "http_response_code": 404})
        );

        let custom = |status: reqwest::StatusCode| ApiResult::error("missing", status);
        client.config.debug = true;
        let result = client.invoke_with(call, &custom).await.unwrap();
        assert_eq!(result.error_message(), Some("missing"));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn debug_flag_logs_failed_bodies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(507).set_body_string("quota exhausted"))
            .mount(&server)
            .await;

        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut client = client_for(&server);
        let call = ApiCall::get(Host::Api, vec!["account", "info"]);
        let result = client.invoke(call.clone()).await.unwrap();
        assert_eq!(result.http_response_code(), Some(507));
        assert!(!logs.contents().contains("quota exhausted"));

        client.config.debug = true;
        let result = client.invoke(call).await.unwrap();
        assert_eq!(result.http_response_code(), Some(507));
        let output = logs.contents();
        assert!(output.contains("API call failed"), "logs: {}", output);
        assert!(output.contains("quota exhausted"), "logs: {}", output);
    }

    #[tokio::test]
    async fn unauthenticated_calls_are_still_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let config = ClientConfig::new("consumer_key", "consumer_secret")
            .endpoints(Endpoints::single_host(server.uri()));
        let result = Client::new(config)
            .invoke(ApiCall::get(Host::Api, vec!["account", "info"]))
            .await
            .unwrap();
        assert_eq!(result.error_message(), Some("401 Unauthorized"));

        let requests = server.received_requests().await.unwrap();
        assert!(!authorization_of(&requests[0]).contains("oauth_token="));
    }

    #[tokio::test]
    async fn uploads_multipart_with_file_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/0/files/dropbox/Docs"))
            .and(query_param("file", "résumé 2020.txt"))
            .and(body_string_contains("filename=\"résumé 2020.txt\""))
            .and(body_string_contains("hello world"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"result": "winner!"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let call = ApiCall::post(Host::Content, vec!["files", "dropbox"])
            .path("Docs")
            .upload(Upload::new("résumé 2020.txt", "hello world"));
        let result = client_for(&server).invoke(call).await.unwrap();
        assert_eq!(result.get("result"), Some(&json!("winner!")));
    }

    #[tokio::test]
    async fn download_streams_into_sink() {
        let server = MockServer::start().await;
        let content = vec![7u8; 64 * 1024];
        Mock::given(method("GET"))
            .and(path("/0/files/dropbox/big.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(content.clone()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut sink: Vec<u8> = Vec::new();
        let call = ApiCall::get(Host::Content, vec!["files", "dropbox"]).path("big.bin");
        let result = client.download_to(call, &mut sink, &StatusError).await.unwrap();

        assert_eq!(sink, content);
        assert_eq!(result.http_response_code(), Some(200));
        assert_eq!(result.get(BYTES_WRITTEN_KEY), Some(&json!(64 * 1024)));
    }

    #[tokio::test]
    async fn failed_download_writes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
            .mount(&server)
            .await;

        let mut sink: Vec<u8> = Vec::new();
        let call = ApiCall::get(Host::Content, vec!["files", "dropbox"]).path("nope");
        let result = client_for(&server)
            .download_to(call, &mut sink, &StatusError)
            .await
            .unwrap();
        assert!(sink.is_empty());
        assert_eq!(result.error_message(), Some("404 Not Found"));
    }

    #[tokio::test]
    async fn connection_failure_is_an_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = ClientConfig::new("key", "secret")
            .endpoints(Endpoints::single_host(format!("http://{}", addr)));
        let result = Client::new(config)
            .invoke(ApiCall::get(Host::Api, vec!["account", "info"]))
            .await;
        assert!(matches!(result, Err(crate::Error::Reqwest(_))));
    }

    #[tokio::test]
    async fn form_parameters_reach_the_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/0/fileops/copy"))
            .and(body_string_contains("from_path=%2Fa.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let call = ApiCall::post(Host::Api, vec!["fileops", "copy"])
            .form("root", "dropbox")
            .form("from_path", "/a.txt");
        let result = client_for(&server).invoke(call).await.unwrap();
        assert_eq!(result.http_response_code(), Some(200));
    }
}
