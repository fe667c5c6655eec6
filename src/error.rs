use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;
pub type TokenReaderResult<T> = std::result::Result<T, TokenReaderError>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("token acquisition failed : {0}")]
    TokenReader(#[from] TokenReaderError),
    #[error("server refused the token request : {} {}", .status.as_u16(), .status.canonical_reason().unwrap_or_default())]
    Status { status: StatusCode, body: String },
    #[error("request failed : {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("invalid endpoint url : {0}")]
    Url(#[from] url::ParseError),
    #[error("remote path contains a relative segment : {0:?}")]
    InvalidPath(String),
    #[error("local I/O failed : {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The HTTP status the server answered with, if the failure carried one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Status { status, .. } => Some(*status),
            Error::Reqwest(err) => err.status(),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum TokenReaderError {
    #[error("response has malformed format: not found {0} in {1}")]
    TokenKeyNotFound(&'static str, String),
}
