use crate::strategy::CacheStrategy;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cache strategy '{strategy}' requires a non-empty cache name")]
    MissingCacheName { strategy: CacheStrategy },

    #[error("page size must be greater than zero")]
    ZeroPageSize,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to load data for cache '{cache_name}': {message}")]
    Load { cache_name: String, message: String },

    #[error("loader task for cache '{cache_name}' didn't complete: {message}")]
    LoaderTask { cache_name: String, message: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Outcome of a failed network request, as reported to [`FetchCallback::on_failure`](crate::FetchCallback).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{code}] {message}")]
pub struct NetworkFailure {
    code:    i32,
    message: String,
}

impl NetworkFailure {
    /// No response at all; the message is the transport error description.
    pub const TRANSPORT: i32 = -1;
    /// Status 200 with a body that carries no data.
    pub const EMPTY_PAYLOAD: i32 = 1001;
    /// Status 200 without a body.
    pub const MISSING_BODY: i32 = 1002;

    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(Self::TRANSPORT, message)
    }

    pub fn empty_payload() -> Self {
        Self::new(Self::EMPTY_PAYLOAD, "empty payload")
    }

    pub fn missing_body() -> Self {
        Self::new(Self::MISSING_BODY, "no response body")
    }

    pub fn status(status: u16) -> Self {
        Self::new(i32::from(status), format!("HTTP status code: {status}"))
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
