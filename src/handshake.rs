//! The three-legged OAuth 1.0a flow.
//!
//! 1. [`Client::begin_handshake`] fetches a request token and builds the
//!    url the user has to visit.
//! 2. The user authorizes the application; the provider redirects to the
//!    configured callback.
//! 3. [`Client::complete_handshake`] trades the request token for the
//!    access token the resource calls are signed with.

use http::Method;
use tracing::debug;
use url::Url;

use crate::config::Host;
use crate::{
    Client, OAuthParameters, Result, TokenPair, TokenReaderFuture, OAUTH_CALLBACK_KEY,
    OAUTH_TOKEN_KEY,
};

/// What the first leg hands back to the caller.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Where the user authorizes the request token.
    pub url: Url,
    /// Keep it until the user comes back; it signs the access-token exchange.
    pub request_token: TokenPair,
    /// Whether the provider acknowledged the callback url.
    pub callback_confirmed: bool,
}

impl Client {
    /// Fetches a request token and builds the authorization url for it.
    ///
    /// Both token requests are signed for and sent as `POST`, so the method
    /// in the signature base string is the method on the wire.
    ///
    /// # Errors
    ///
    /// A non-2xx answer is returned as [`crate::Error::Status`]; a body without
    /// a token pair as [`crate::Error::TokenReader`].
    pub async fn begin_handshake(&self) -> Result<AuthorizationRequest> {
        let url = self.url(Host::Api, &["oauth", "request_token"])?;
        let mut parameters = OAuthParameters::new();
        if let Some(ref callback) = self.config().callback_url {
            parameters = parameters.callback(callback.as_str());
        }
        debug!(%url, "requesting request token");

        let response = self
            .request(Method::POST, url, None, parameters)
            .send()
            .parse_oauth_token()
            .await?;
        let callback_confirmed = response.callback_confirmed();
        let request_token = response.into_pair();

        Ok(AuthorizationRequest {
            url: self.authorization_url(&request_token)?,
            request_token,
            callback_confirmed,
        })
    }

    /// The url a user visits to authorize `request_token`.
    pub fn authorization_url(&self, request_token: &TokenPair) -> Result<Url> {
        let mut url = self.url(Host::Web, &["oauth", "authorize"])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair(OAUTH_TOKEN_KEY, &request_token.token);
            if let Some(ref callback) = self.config().callback_url {
                query.append_pair(OAUTH_CALLBACK_KEY, callback);
            }
        }
        Ok(url)
    }

    /// Trades an authorized request token for an access token, which is
    /// kept by the client for subsequent calls and returned for persisting.
    pub async fn complete_handshake(&mut self, request_token: TokenPair) -> Result<TokenPair> {
        self.exchange_request_token(request_token, None).await
    }

    /// Like [`Client::complete_handshake`], for providers that hand the user
    /// an `oauth_verifier`.
    pub async fn complete_handshake_with_verifier(
        &mut self,
        request_token: TokenPair,
        verifier: &str,
    ) -> Result<TokenPair> {
        self.exchange_request_token(request_token, Some(verifier)).await
    }

    async fn exchange_request_token(
        &mut self,
        request_token: TokenPair,
        verifier: Option<&str>,
    ) -> Result<TokenPair> {
        let url = self.url(Host::Api, &["oauth", "access_token"])?;
        let mut parameters = OAuthParameters::new();
        if let Some(verifier) = verifier {
            parameters = parameters.verifier(verifier);
        }
        debug!(%url, "exchanging request token");

        let access_token = self
            .request(Method::POST, url, Some(&request_token), parameters)
            .send()
            .parse_oauth_token()
            .await?
            .into_pair();
        self.set_access_token(access_token.clone());
        Ok(access_token)
    }
}
