/*!
dropbox-oauth1: the legacy Dropbox v0 API over reqwest and oauth1-request.

# Overview

This library signs every call with OAuth 1.0a (HMAC-SHA1) and wraps the
remote procedures of the v0 API: account information, metadata listings,
file operations, shared links, uploads and downloads.

Failed calls are data: every procedure returns an [`ApiResult`] carrying
`http_response_code`, plus `error` when the call failed. Only failures
without an HTTP status (an unreachable host, an invalid endpoint url, a
local I/O error) are reported as [`Error`].

# How to use

## Acquiring an access token

```rust,no_run
use dropbox_oauth1::{Client, ClientConfig};

# async fn run() -> dropbox_oauth1::Result<()> {
let config = ClientConfig::new("[CONSUMER_KEY]", "[CONSUMER_SECRET]")
    .callback("https://app.example/dropbox/done");
let mut client = Client::new(config);

// step 1: acquire a request token
let request = client.begin_handshake().await?;
println!("please access to: {}", request.url);

// step 2: the user authorizes the application and comes back

// step 3: acquire the access token; the client keeps it
let access_token = client.complete_handshake(request.request_token).await?;
println!("your token is: {}", access_token.token);
# Ok(())
# }
```

## Calling the API

```rust,no_run
use dropbox_oauth1::{Client, ClientConfig, Context, TokenPair};

# async fn run() -> dropbox_oauth1::Result<()> {
let config = ClientConfig::new("[CONSUMER_KEY]", "[CONSUMER_SECRET]")
    .context(Context::Sandbox);
let client = Client::new(config)
    .with_access_token(TokenPair::new("[ACCESS_TOKEN]", "[TOKEN_SECRET]"));

let listing = client.list("/Photos", None).await?;
if let Some(message) = listing.error_message() {
    eprintln!("listing failed: {}", message);
}

client.upload("/Photos", "beach.jpg", std::fs::read("beach.jpg")?).await?;

let mut file = tokio::fs::File::create("copy.jpg").await?;
client.download("/Photos/beach.jpg", &mut file).await?;
# Ok(())
# }
```
*/
mod api;
mod client;
mod config;
mod error;
mod handshake;
mod request;
mod response;
mod secrets;
mod session;
mod signer;
mod token_reader;

// exposed to external program
pub use client::{ApiCall, Client, Upload, BYTES_WRITTEN_KEY, UPLOAD_FILE_KEY};
pub use config::{
    ClientConfig, Context, Endpoints, Host, API_VERSION, DEFAULT_API_HOST, DEFAULT_CONTENT_HOST,
    DEFAULT_WEB_HOST,
};
pub use error::{Error, Result, TokenReaderError, TokenReaderResult};
pub use handshake::AuthorizationRequest;
pub use response::{
    ApiResult, NotModified, ResponseClassifier, StatusError, ERROR_KEY, HTTP_RESPONSE_CODE_KEY,
    INVALID_JSON_MESSAGE,
};
pub use secrets::{Secrets, SecretsProvider, TokenPair};
pub use session::{PendingTokens, SessionId};
pub use signer::{generate_nonce, OAuthParameters, Signer, NONCE_LENGTH};
pub use token_reader::{TokenReader, TokenReaderFuture, TokenResponse};

// exposed constant variables
/// Represents `oauth_callback`.
pub const OAUTH_CALLBACK_KEY: &str = "oauth_callback";
/// Represents `oauth_token`.
pub const OAUTH_TOKEN_KEY: &str = "oauth_token";
/// Represents `oauth_token_secret`.
pub const OAUTH_TOKEN_SECRET_KEY: &str = "oauth_token_secret";
/// Represents `realm`.
pub const REALM_KEY: &str = "realm";

// crate-private constant variables
pub(crate) const OAUTH_KEY_PREFIX: &str = "oauth_";
