use std::sync::Arc;

use percent_encoding::percent_decode_str;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use dropbox_oauth1::{
    ApiCall, Client, ClientConfig, Context, Endpoints, Host, PendingTokens, TokenPair,
};

fn authorization_params(request: &Request) -> Vec<(String, String)> {
    let header = request
        .headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    header
        .trim_start_matches("OAuth ")
        .split(',')
        .filter_map(|pair| {
            let mut kv = pair.splitn(2, '=');
            let key = kv.next()?.trim().to_string();
            let value = kv.next()?.trim_matches('"');
            Some((key, percent_decode_str(value).decode_utf8_lossy().into_owned()))
        })
        .collect()
}

fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

async fn mount_handshake(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/0/oauth/request_token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "oauth_token=req_token&oauth_token_secret=req_secret&oauth_callback_confirmed=true",
        ))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/0/oauth/access_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("oauth_token=acc_token&oauth_token_secret=acc_secret&uid=7"),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn handshake_then_calls() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;
    Mock::given(method("GET"))
        .and(path("/0/account/info"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"uid": 7}"#))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/0/metadata/sandbox/Work"))
        .and(query_param("list", "true"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new("app_key", "app_secret")
        .callback("https://app.example/done")
        .context(Context::Sandbox)
        .endpoints(Endpoints::single_host(server.uri()));
    let mut client = Client::new(config);

    // the front end keeps the request token between the two legs
    let pending = Arc::new(PendingTokens::new());
    let request = client.begin_handshake().await.unwrap();
    assert!(request.callback_confirmed);
    let session = pending.insert(request.request_token.clone());

    let oauth_token = request
        .url
        .query_pairs()
        .find(|(key, _)| key == "oauth_token")
        .map(|(_, value)| value.into_owned())
        .unwrap();
    let request_token = pending.take(&session, &oauth_token).unwrap();
    let access_token = client.complete_handshake(request_token).await.unwrap();
    assert_eq!(access_token, TokenPair::new("acc_token", "acc_secret"));

    let info = client.account_info().await.unwrap();
    assert_eq!(info.get("uid"), Some(&json!(7)));
    assert_eq!(info.http_response_code(), Some(200));

    let missing = client.list("Work", None).await.unwrap();
    assert_eq!(missing.error_message(), Some("404 Not Found"));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 4);

    let first = authorization_params(&requests[0]);
    assert_eq!(param(&first, "oauth_callback"), Some("https://app.example/done"));
    assert_eq!(param(&first, "oauth_token"), None);
    assert_eq!(param(&first, "oauth_signature_method"), Some("HMAC-SHA1"));

    let second = authorization_params(&requests[1]);
    assert_eq!(param(&second, "oauth_token"), Some("req_token"));

    let mut nonces = Vec::new();
    for request in &requests[2..] {
        let params = authorization_params(request);
        assert_eq!(param(&params, "oauth_token"), Some("acc_token"));
        assert_eq!(param(&params, "oauth_consumer_key"), Some("app_key"));
        assert_eq!(param(&params, "oauth_version"), Some("1.0"));
        let nonce = param(&params, "oauth_nonce").unwrap().to_string();
        assert_eq!(nonce.len(), 16);
        assert!(nonce.chars().all(|c| c.is_ascii_alphanumeric()));
        nonces.push(nonce);
    }
    assert_ne!(nonces[0], nonces[1]);
}

#[tokio::test]
async fn custom_calls_share_the_signing_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/0/thumbnails/dropbox/Photos/a.jpg"))
        .and(query_param("size", "small"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok": true}"#))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new("app_key", "app_secret")
        .endpoints(Endpoints::single_host(server.uri()));
    let client = Client::new(config).with_access_token(TokenPair::new("acc", "acc_secret"));

    let call = ApiCall::get(Host::Content, vec!["thumbnails", "dropbox"])
        .path("/Photos/a.jpg")
        .query("size", "small");
    let result = client.invoke(call).await.unwrap();
    assert_eq!(result.get("ok"), Some(&json!(true)));
}

#[test]
fn configuration_from_json() {
    let config: ClientConfig = serde_json::from_value(json!({
        "consumer_key": "app_key",
        "consumer_secret": "app_secret",
        "context": "sandbox",
        "endpoints": { "web_host": "https://web.example" }
    }))
    .unwrap();

    let client = Client::new(config);
    assert_eq!(client.context(), Context::Sandbox);
    let url = client
        .authorization_url(&TokenPair::new("req", "secret"))
        .unwrap();
    assert_eq!(url.as_str(), "https://web.example/0/oauth/authorize?oauth_token=req");
    assert_eq!(client.config().endpoints.api_host, dropbox_oauth1::DEFAULT_API_HOST);
}
