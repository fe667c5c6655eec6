//! The remote procedures of the v0 API.
//!
//! Each method maps its arguments onto one [`ApiCall`] and hands it to
//! [`Client::invoke`]. Paths are slash-separated and relative to the root
//! selected by the client's [`Context`](crate::Context).

use std::io;
use std::path::Path;

use tokio::io::AsyncWrite;

use crate::client::{ApiCall, Upload};
use crate::config::Host;
use crate::response::{ApiResult, NotModified, StatusError};
use crate::{Client, Result};

const ROOT_KEY: &str = "root";
const PATH_KEY: &str = "path";
const FROM_PATH_KEY: &str = "from_path";
const TO_PATH_KEY: &str = "to_path";
const LIST_KEY: &str = "list";
const HASH_KEY: &str = "hash";

impl Client {
    /// `GET {host}/0/{operation}/{context}/{path}`
    fn rooted(&self, host: Host, operation: &str, path: &str) -> ApiCall {
        ApiCall::get(host, vec![operation, self.context().as_str()]).path(path)
    }

    /// `POST /0/fileops/{operation}` with `root` and the given form fields.
    fn fileop(&self, operation: &str, fields: &[(&str, &str)]) -> ApiCall {
        let call = ApiCall::post(Host::Api, vec!["fileops", operation])
            .form(ROOT_KEY, self.context().as_str());
        fields
            .iter()
            .fold(call, |call, (key, value)| call.form(*key, *value))
    }

    /// Information about the user's account.
    pub async fn account_info(&self) -> Result<ApiResult> {
        self.invoke(ApiCall::get(Host::Api, vec!["account", "info"])).await
    }

    /// Metadata of `path` including its direct children.
    ///
    /// With `hash` taken from an earlier listing the call is conditional: an
    /// unchanged directory answers `304`, reported as a result without
    /// `error` for which [`ApiResult::is_not_modified`] holds.
    pub async fn list(&self, path: &str, hash: Option<&str>) -> Result<ApiResult> {
        let call = self.rooted(Host::Api, "metadata", path).query(LIST_KEY, "true");
        match hash {
            Some(hash) => self.invoke_with(call.query(HASH_KEY, hash), &NotModified).await,
            None => self.invoke(call).await,
        }
    }

    /// Metadata of `path` without its children.
    pub async fn metadata(&self, path: &str) -> Result<ApiResult> {
        let call = self.rooted(Host::Api, "metadata", path).query(LIST_KEY, "false");
        self.invoke(call).await
    }

    pub async fn copy(&self, from_path: &str, to_path: &str) -> Result<ApiResult> {
        let call = self.fileop("copy", &[(FROM_PATH_KEY, from_path), (TO_PATH_KEY, to_path)]);
        self.invoke(call).await
    }

    /// Moves or renames `from_path` to `to_path`.
    pub async fn move_to(&self, from_path: &str, to_path: &str) -> Result<ApiResult> {
        let call = self.fileop("move", &[(FROM_PATH_KEY, from_path), (TO_PATH_KEY, to_path)]);
        self.invoke(call).await
    }

    pub async fn create_folder(&self, path: &str) -> Result<ApiResult> {
        self.invoke(self.fileop("create_folder", &[(PATH_KEY, path)])).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResult> {
        self.invoke(self.fileop("delete", &[(PATH_KEY, path)])).await
    }

    /// A link to a page that shows `path` to anyone who has it.
    pub async fn share_link(&self, path: &str) -> Result<ApiResult> {
        self.invoke(self.rooted(Host::Web, "links", path)).await
    }

    /// Uploads `contents` as `file_name` into the directory `directory`.
    pub async fn upload<TContents>(
        &self,
        directory: &str,
        file_name: &str,
        contents: TContents,
    ) -> Result<ApiResult>
    where
        TContents: Into<Vec<u8>>,
    {
        let call = ApiCall::post(Host::Content, vec!["files", self.context().as_str()])
            .path(directory)
            .upload(Upload::new(file_name, contents));
        self.invoke(call).await
    }

    /// Uploads the local file `local` into `directory`, keeping its name.
    pub async fn upload_file<P>(&self, directory: &str, local: P) -> Result<ApiResult>
    where
        P: AsRef<Path>,
    {
        let local = local.as_ref();
        let file_name = local
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} does not name a file", local.display()),
                )
            })?;
        let contents = tokio::fs::read(local).await?;
        self.upload(directory, &file_name, contents).await
    }

    /// Streams the content of `path` into `sink`.
    pub async fn download<W>(&self, path: &str, sink: &mut W) -> Result<ApiResult>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let call = self.rooted(Host::Content, "files", path);
        self.download_to(call, sink, &StatusError).await
    }
}
