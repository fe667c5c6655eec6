// ----------------------------------------------------------------------------
// This source code contains derived artifacts from seanmonstar's `reqwest`.
// for further information(including license information),
// please visit their repository: https://github.com/seanmonstar/reqwest .
// ----------------------------------------------------------------------------
use std::future::Future;

use http::{header::AUTHORIZATION, Method};
use reqwest::{multipart, Error, RequestBuilder as ReqwestRequestBuilder, Response, Url};
use serde::Serialize;

use crate::{SecretsProvider, Signer};

/// A `reqwest` request builder that remembers what has to be signed.
///
/// Query parameters and url-encoded form bodies are captured as they are set
/// and enter the signature base string together; multipart bodies are sent
/// but never signed.
pub(crate) struct RequestBuilder<'a, TSecretsProvider>
where
    TSecretsProvider: SecretsProvider,
{
    method: Method,
    inner: ReqwestRequestBuilder,
    signer: Signer<'a, TSecretsProvider>,
    url: Url,
    body: String,
}

impl<'a, TSecretsProvider> RequestBuilder<'a, TSecretsProvider>
where
    TSecretsProvider: SecretsProvider,
{
    pub(crate) fn new(
        builder: ReqwestRequestBuilder,
        method: Method,
        url: Url,
        signer: Signer<'a, TSecretsProvider>,
    ) -> Self {
        RequestBuilder {
            inner: builder,
            method,
            url,
            body: String::new(),
            signer,
        }
    }

    // ------------------------------------------------------------------------
    // Finish building the request and send it to server with OAuth signature

    /// Constructs the Request and sends it to the target URL, returning a
    /// future Response.
    ///
    /// # Errors
    ///
    /// This method fails if there was an error while sending request,
    /// redirect loop was detected or redirect limit was exhausted.
    pub fn send(self) -> impl Future<Output = Result<Response, Error>> {
        self.generate_signature().send()
    }

    /// Generate an OAuth signature and return the reqwest's `RequestBuilder`.
    pub fn generate_signature(self) -> ReqwestRequestBuilder {
        let mut url = self.url;
        let mut payload = url.query().unwrap_or_default().to_string();
        url.set_query(None);
        if !self.body.is_empty() {
            if !payload.is_empty() {
                payload.push('&');
            }
            payload.push_str(&self.body);
        }
        let is_url_query = self.body.is_empty();
        let signature = self
            .signer
            .generate_signature(&self.method, url, &payload, is_url_query);
        self.inner.header(AUTHORIZATION, signature)
    }

    // ------------------------------------------------------------------------
    // Trapped with the wrapper

    /// Modify the query string of the URL.
    ///
    /// Appends the parameters provided; existing ones are kept. The
    /// parameters are part of the signature.
    pub fn query<T: Serialize + ?Sized>(mut self, query: &T) -> Self {
        {
            let mut pairs = self.url.query_pairs_mut();
            let serializer = serde_urlencoded::Serializer::new(&mut pairs);
            let _ = query.serialize(serializer);
        }
        if let Some("") = self.url.query() {
            self.url.set_query(None);
        }
        self.inner = self.inner.query(query);
        self
    }

    /// Send a url-encoded form body. The form parameters are part of the
    /// signature.
    pub fn form<T: Serialize + ?Sized>(mut self, form: &T) -> Self {
        match serde_urlencoded::to_string(form) {
            Ok(body) => {
                self.inner = self.inner.form(form);
                self.body = body;
                self
            }
            Err(_) => self.pass_through(|b| b.form(form)),
        }
    }

    // ------------------------------------------------------------------------
    // Pass-through to inner builder

    fn pass_through<F>(self, f: F) -> Self
    where
        F: FnOnce(ReqwestRequestBuilder) -> ReqwestRequestBuilder,
    {
        RequestBuilder {
            inner: f(self.inner),
            ..self
        }
    }

    /// Sends a multipart/form-data body.
    ///
    /// Note: multipart/form-data is not handled by the OAuth signer.
    pub fn multipart(self, multipart: multipart::Form) -> Self {
        self.pass_through(|b| b.multipart(multipart))
    }
}
