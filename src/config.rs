use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result, Secrets, TokenPair};

pub const DEFAULT_API_HOST: &str = "https://api.dropbox.com";
pub const DEFAULT_CONTENT_HOST: &str = "https://api-content.dropbox.com";
pub const DEFAULT_WEB_HOST: &str = "https://www.dropbox.com";
/// Version prefix of every endpoint path.
pub const API_VERSION: &str = "0";

/// The root an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Context {
    /// The whole account.
    Dropbox,
    /// The application's own folder.
    Sandbox,
}

impl Context {
    pub fn as_str(&self) -> &'static str {
        match self {
            Context::Dropbox => "dropbox",
            Context::Sandbox => "sandbox",
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::Dropbox
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of the service hosts a request goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Host {
    /// OAuth endpoints, metadata and file operations.
    Api,
    /// File upload and download.
    Content,
    /// User-facing pages: authorization and share links.
    Web,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub api_host: String,
    pub content_host: String,
    pub web_host: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            api_host: DEFAULT_API_HOST.to_string(),
            content_host: DEFAULT_CONTENT_HOST.to_string(),
            web_host: DEFAULT_WEB_HOST.to_string(),
        }
    }
}

impl Endpoints {
    /// Serve every host from the same base url, e.g. a local proxy.
    pub fn single_host<T: Into<String>>(base: T) -> Self {
        let base = base.into();
        Endpoints {
            api_host: base.clone(),
            content_host: base.clone(),
            web_host: base,
        }
    }

    pub fn host(&self, host: Host) -> &str {
        match host {
            Host::Api => &self.api_host,
            Host::Content => &self.content_host,
            Host::Web => &self.web_host,
        }
    }

    /// `{host}/0/{segments...}`, each segment percent-encoded on its own.
    ///
    /// `.` and `..` segments are rejected with [`Error::InvalidPath`]; a url
    /// cannot carry them verbatim.
    pub fn url<I>(&self, host: Host, segments: I) -> Result<Url>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = Url::parse(self.host(host))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
            path.pop_if_empty().push(API_VERSION);
            for segment in segments {
                let segment = segment.as_ref();
                if segment == "." || segment == ".." {
                    return Err(Error::InvalidPath(segment.to_string()));
                }
                path.push(segment);
            }
        }
        Ok(url)
    }
}

/// Everything the client needs besides the tokens.
#[derive(Clone, Deserialize)]
pub struct ClientConfig {
    pub consumer_key: String,
    pub consumer_secret: String,
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default)]
    pub context: Context,
    /// Log response bodies of failed calls.
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub endpoints: Endpoints,
}

impl ClientConfig {
    pub fn new<TKey, TSecret>(consumer_key: TKey, consumer_secret: TSecret) -> Self
    where
        TKey: Into<String>,
        TSecret: Into<String>,
    {
        ClientConfig {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            callback_url: None,
            context: Context::default(),
            debug: false,
            endpoints: Endpoints::default(),
        }
    }

    /// set the url the provider redirects the user to after authorization
    pub fn callback<T: Into<String>>(self, callback_url: T) -> Self {
        ClientConfig {
            callback_url: Some(callback_url.into()),
            ..self
        }
    }

    pub fn context(self, context: Context) -> Self {
        ClientConfig { context, ..self }
    }

    pub fn debug(self, debug: bool) -> Self {
        ClientConfig { debug, ..self }
    }

    pub fn endpoints(self, endpoints: Endpoints) -> Self {
        ClientConfig { endpoints, ..self }
    }

    pub(crate) fn secrets<'a>(&'a self, token: Option<&'a TokenPair>) -> Secrets<'a> {
        Secrets::new(self.consumer_key.as_str(), self.consumer_secret.as_str()).token_pair(token)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .field("callback_url", &self.callback_url)
            .field("context", &self.context)
            .field("debug", &self.debug)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}
