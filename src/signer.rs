use std::borrow::Cow;
use std::time::{SystemTime, UNIX_EPOCH};

use http::Method;
use oauth1_request::signer::Signer as OAuthSigner;
use oauth1_request::{HmacSha1, Options};
use rand::{distributions::Alphanumeric, Rng};
use url::Url;

use crate::{SecretsProvider, OAUTH_KEY_PREFIX, REALM_KEY};

/// Length of the generated `oauth_nonce` values.
pub const NONCE_LENGTH: usize = 16;

/// Generates a fresh alphanumeric nonce of [`NONCE_LENGTH`] characters.
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LENGTH)
        .map(char::from)
        .collect()
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Computes the `Authorization` header for one request.
///
/// A signer is consumed by signing: nonce and timestamp are drawn fresh at
/// that moment unless they were pinned through [`OAuthParameters`].
#[derive(Debug, Clone)]
pub struct Signer<'a, TSecretsProvider>
where
    TSecretsProvider: SecretsProvider,
{
    secrets: TSecretsProvider,
    parameters: OAuthParameters<'a>,
}

impl<'a, TSecretsProvider> Signer<'a, TSecretsProvider>
where
    TSecretsProvider: SecretsProvider,
{
    pub fn new(secrets: TSecretsProvider, parameters: OAuthParameters<'a>) -> Self {
        Signer {
            secrets,
            parameters,
        }
    }

    /// Signs `method url` with the given url-encoded `payload`.
    ///
    /// `url` must not carry a query; its parameters belong in `payload`
    /// together with any form body parameters. Keys with the `oauth_` prefix
    /// in the payload are ignored, they come from [`OAuthParameters`].
    pub fn generate_signature(
        self,
        method: &Method,
        url: Url,
        payload: &str,
        is_url_query: bool,
    ) -> String {
        let (consumer_key, consumer_secret) = self.secrets.get_consumer_key_pair();
        let (token, token_secret) = self.secrets.get_token_option_pair();
        let nonce = match self.parameters.nonce {
            Some(ref nonce) => Cow::from(&**nonce),
            None => Cow::from(generate_nonce()),
        };
        let timestamp = self.parameters.timestamp.unwrap_or_else(current_timestamp);
        let options = self.parameters.build_options(token, &nonce, timestamp);

        // oauth1-request wants parameters in ascending order, with the
        // oauth_* block inserted at its sorted position
        let mut sorted: Vec<(Cow<str>, Cow<str>)> =
            url::form_urlencoded::parse(payload.as_bytes())
                .filter(|(key, _)| !key.starts_with(OAUTH_KEY_PREFIX))
                .collect();
        sorted.sort();
        let split = sorted.partition_point(|(key, _)| &**key < OAUTH_KEY_PREFIX);
        let (before_oauth, after_oauth) = sorted.split_at(split);

        let mut signer = if is_url_query {
            OAuthSigner::with_signature_method(
                HmacSha1,
                method.as_str(),
                url,
                consumer_secret,
                token_secret,
            )
        } else {
            OAuthSigner::form_with_signature_method(
                HmacSha1,
                method.as_str(),
                url,
                consumer_secret,
                token_secret,
            )
        };
        for (key, value) in before_oauth {
            signer.parameter(key, value);
        }
        let mut signer = signer.oauth_parameters(consumer_key, &options);
        for (key, value) in after_oauth {
            signer.parameter(key, value);
        }

        let sign = signer.finish().authorization;

        match self.parameters.realm {
            Some(ref realm) => format!("{},{}=\"{}\"", sign, REALM_KEY, realm),
            None => sign,
        }
    }
}

/// The protocol parameters of a single signed request.
#[derive(Debug, Clone)]
pub struct OAuthParameters<'a> {
    callback: Option<Cow<'a, str>>,
    nonce: Option<Cow<'a, str>>,
    realm: Option<Cow<'a, str>>,
    timestamp: Option<u64>,
    verifier: Option<Cow<'a, str>>,
    version: bool,
}

impl Default for OAuthParameters<'_> {
    fn default() -> Self {
        OAuthParameters {
            callback: None,
            nonce: None,
            realm: None,
            timestamp: None,
            verifier: None,
            version: true,
        }
    }
}

impl<'a> OAuthParameters<'a> {
    pub fn new() -> Self {
        Default::default()
    }

    /// set the oauth_callback value
    pub fn callback<T>(self, callback: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            callback: Some(callback.into()),
            ..self
        }
    }

    /// pin the oauth_nonce value instead of drawing a fresh one
    pub fn nonce<T>(self, nonce: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            nonce: Some(nonce.into()),
            ..self
        }
    }

    /// set the realm value
    pub fn realm<T>(self, realm: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            realm: Some(realm.into()),
            ..self
        }
    }

    /// pin the oauth_timestamp value instead of reading the clock
    pub fn timestamp<T>(self, timestamp: T) -> Self
    where
        T: Into<u64>,
    {
        OAuthParameters {
            timestamp: Some(timestamp.into()),
            ..self
        }
    }

    /// set the oauth_verifier value
    pub fn verifier<T>(self, verifier: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            verifier: Some(verifier.into()),
            ..self
        }
    }

    /// Include `oauth_version="1.0"` (the default) or leave it out.
    pub fn version<T>(self, version: T) -> Self
    where
        T: Into<bool>,
    {
        OAuthParameters {
            version: version.into(),
            ..self
        }
    }

    fn build_options<'b>(
        &'b self,
        token: Option<&'b str>,
        nonce: &'b str,
        timestamp: u64,
    ) -> Options<'b> {
        let mut opt = Options::new();

        // NOTE: items must be added by alphabetical order
        if let Some(ref callback) = self.callback {
            opt.callback(callback.as_ref());
        }
        opt.nonce(nonce);
        opt.timestamp(timestamp);
        if let Some(token) = token {
            opt.token(token);
        }
        if let Some(ref verifier) = self.verifier {
            opt.verifier(verifier.as_ref());
        }
        opt.version(self.version);

        opt
    }
}
