use std::fmt;

/// Crate-wide error currency. Every fallible boundary (HTTP, DB, parsing,
/// configuration) converts into this type so call sites can propagate with
/// `?` while still matching on `kind()` where the taxonomy requires it
/// (quota exhaustion short-circuits a feeder without being a hard failure).
#[derive(Debug)]
pub enum Error {
  Configuration(String),
  QuotaExceeded(String),
  Transport(Box<dyn std::error::Error + Send + Sync>),
  Platform(String),
  Persistence(Box<dyn std::error::Error + Send + Sync>),
  Parse(String),
}

impl Error {
  pub fn configuration(msg: impl Into<String>) -> Self {
    Error::Configuration(msg.into())
  }

  pub fn platform(msg: impl Into<String>) -> Self {
    Error::Platform(msg.into())
  }

  pub fn parse(msg: impl Into<String>) -> Self {
    Error::Parse(msg.into())
  }

  pub fn is_quota_exceeded(&self) -> bool {
    matches!(self, Error::QuotaExceeded(_))
  }
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Error::Configuration(m) => write!(f, "configuration error: {m}"),
      Error::QuotaExceeded(m) => write!(f, "quota exceeded: {m}"),
      Error::Transport(e) => write!(f, "transport error: {e}"),
      Error::Platform(m) => write!(f, "platform error: {m}"),
      Error::Persistence(e) => write!(f, "persistence error: {e}"),
      Error::Parse(m) => write!(f, "parse error: {m}"),
    }
  }
}

impl std::error::Error for Error {}

impl From<sqlx::Error> for Error {
  fn from(e: sqlx::Error) -> Self {
    Error::Persistence(Box::new(e))
  }
}

impl From<serde_json::Error> for Error {
  fn from(e: serde_json::Error) -> Self {
    Error::Parse(e.to_string())
  }
}

impl From<hyper::Error> for Error {
  fn from(e: hyper::Error) -> Self {
    Error::Transport(Box::new(e))
  }
}

impl From<std::io::Error> for Error {
  fn from(e: std::io::Error) -> Self {
    Error::Transport(Box::new(e))
  }
}

impl<C> From<hyper_util::client::legacy::Error<C>> for Error
where
  C: std::error::Error + Send + Sync + 'static,
{
  fn from(e: hyper_util::client::legacy::Error<C>) -> Self {
    Error::Transport(Box::new(e))
  }
}

pub type Result<T> = std::result::Result<T, Error>;
