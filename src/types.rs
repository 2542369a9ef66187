use crate::error::NetworkFailure;
#[cfg(feature = "serde")]
use serde::Deserialize;
#[cfg(feature = "serde")]
use serde::Serialize;
use std::fmt::Debug;

pub const HTTP_OK: u16 = 200;

/// Anything a repository can serve.
///
/// A blank payload is treated like a missing one when read from a local source. Lists are blank when empty; a
/// single record is never blank unless its type says otherwise.
pub trait Payload: Debug + Clone + Send + Sync + 'static {
    fn is_blank(&self) -> bool {
        false
    }
}

impl<T> Payload for Vec<T>
where
    T: Debug + Clone + Send + Sync + 'static,
{
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl Payload for String {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

/// Body of a server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ApiResult<T> {
    pub message: Option<String>,
    pub data:    Option<T>,
}

impl<T> ApiResult<T> {
    pub fn with_data(data: T) -> Self {
        Self {
            message: None,
            data:    Some(data),
        }
    }

    pub fn empty() -> Self {
        Self {
            message: None,
            data:    None,
        }
    }
}

/// A server reply as seen by the repository: the status code and, maybe, a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub body:   Option<ApiResult<T>>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: HTTP_OK,
            body:   Some(ApiResult::with_data(data)),
        }
    }

    pub fn with_status(status: u16) -> Self {
        Self { status, body: None }
    }

    pub fn with_body(status: u16, body: ApiResult<T>) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    /// Only status 200 with a body carrying data is a success.
    pub fn into_payload(self) -> Result<T, NetworkFailure> {
        if self.status != HTTP_OK {
            return Err(NetworkFailure::status(self.status));
        }
        let Some(body) = self.body
        else {
            return Err(NetworkFailure::missing_body());
        };
        body.data.ok_or_else(NetworkFailure::empty_payload)
    }
}
