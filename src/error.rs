// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{io, result};

use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

pub(crate) type Result<T, E = Error> = result::Result<T, E>;

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("IO operation failed: {0}")]
    Io(#[from] io::Error),
    #[error("could not reach the server: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server responded with {status}: {}", .detail.as_deref().unwrap_or("no detail given"))]
    Protocol {
        status: StatusCode,
        detail: Option<String>,
    },
    #[error("server response could not be decoded: {0}")]
    Decode(serde_json::Error),
    #[error("JSON format error: {0}")]
    Json(serde_json::Error),
    #[error("this operation requires an authenticated session")]
    AuthRequired,
    #[error("the URL {0} cannot be used as the base of an HTTP API")]
    InvalidUrl(Url),
    #[error("storage error: {0}")]
    Storage(#[from] Storage),
    #[error("password retrieval error: {0}")]
    Password(#[from] Password),
    #[error("command execution failed")]
    Command,
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// The detail message the server attached to a rejected request, if any.
    pub(crate) fn detail(&self) -> Option<&str> {
        match self {
            Self::Protocol { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Whether the server rejected our credentials. Any request that fails
    /// this way means the session we hold is no longer valid.
    pub(crate) fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Protocol { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }

    /// Whether the server refused a change because of existing enrollment
    /// state (already signed up, not signed up).
    pub(crate) fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::Protocol { status, .. }
                if *status == StatusCode::BAD_REQUEST || *status == StatusCode::CONFLICT
        )
    }

    const fn is_answer(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }
}

impl From<pinentry::Error> for Error {
    fn from(value: pinentry::Error) -> Self {
        // LINT: Deliberate fall-through that should catch future cases added to
        // the enum.
        #[allow(
            clippy::wildcard_enum_match_arm,
            clippy::match_wildcard_for_single_variants
        )]
        match value {
            pinentry::Error::Cancelled | pinentry::Error::Timeout => Self::Cancelled,
            pinentry::Error::Io(e) => Self::Io(e),
            _ => Self::Password(Password::Pinentry(value)),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        // LINT: Deliberate fall-through that should catch future cases added to
        // the enum.
        #[allow(clippy::wildcard_enum_match_arm)]
        match value.classify() {
            serde_json::error::Category::Io => Self::Io(value.into()),
            _ => Self::Json(value),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Io(value.into())
    }
}

#[derive(Error, Debug)]
pub(crate) enum Storage {
    #[cfg(feature = "keychain")]
    #[error("no project directory is available to scope the keychain entry")]
    NoProjectDirs,
    #[cfg(feature = "secret-service")]
    #[error("secret service error: {0}")]
    SecretService(#[from] oo7::Error),
    #[cfg(any(feature = "secret-service", feature = "keychain"))]
    #[error("the saved session token is not valid UTF-8")]
    MalformedToken,
    #[cfg(feature = "keychain")]
    #[error("keychain error: {0}")]
    Keychain(#[from] security_framework::base::Error),
}

#[derive(Error, Debug)]
pub(crate) enum Password {
    #[error("no password prompt available")]
    NoPrompt,
    #[error("Pinentry implementation error: {0}")]
    Pinentry(pinentry::Error),
}

/// An error paired with the message we show for it.
///
/// Every network-facing operation reports failures this way. The message is
/// the server's own explanation when it gave one, and otherwise a fixed
/// fallback chosen by the operation.
#[derive(Error, Debug)]
#[error("{message}")]
pub(crate) struct Failure {
    message: String,
    #[source]
    cause: Error,
}

impl Failure {
    /// Describes `cause`, using `rejected` when the server refused the
    /// request without saying why and `unreachable` when we never got a usable
    /// answer at all.
    pub(crate) fn describe(cause: Error, rejected: &str, unreachable: &str) -> Self {
        let message = match (cause.detail(), &cause) {
            (Some(detail), _) => detail.to_owned(),
            (None, Error::AuthRequired) => "Authentication required".to_owned(),
            (None, e) if e.is_answer() => rejected.to_owned(),
            (None, _) => unreachable.to_owned(),
        };
        Self { message, cause }
    }

    pub(crate) fn message(&self) -> &str {
        &self.message
    }

    #[cfg(test)]
    pub(crate) const fn cause(&self) -> &Error {
        &self.cause
    }

    /// Whether the failure carries an answer from the server, as opposed to
    /// a local refusal or a request that never completed.
    pub(crate) const fn is_answer(&self) -> bool {
        self.cause.is_answer()
    }
}

impl From<Error> for Failure {
    fn from(cause: Error) -> Self {
        Self {
            message: cause.to_string(),
            cause,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_prefers_server_detail() {
        let failure = Failure::describe(
            Error::Protocol {
                status: StatusCode::BAD_REQUEST,
                detail: Some("Student is already signed up".to_owned()),
            },
            "An error occurred",
            "Failed to sign up. Please try again.",
        );

        assert_eq!(failure.message(), "Student is already signed up");
        assert!(failure.cause().is_conflict());
        assert!(failure.is_answer());
    }

    #[test]
    fn failure_falls_back_per_kind() {
        let rejected = Failure::describe(
            Error::Protocol {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                detail: None,
            },
            "Login failed",
            "Login failed. Please try again.",
        );
        assert_eq!(rejected.message(), "Login failed");

        let undecodable = Failure::describe(
            Error::Decode(serde_json::from_str::<u32>("{").unwrap_err()),
            "Login failed",
            "Login failed. Please try again.",
        );
        assert_eq!(undecodable.message(), "Login failed. Please try again.");
        assert!(!undecodable.is_answer());

        let local = Failure::describe(Error::AuthRequired, "An error occurred", "unused");
        assert_eq!(local.message(), "Authentication required");
    }

    #[test]
    fn only_unauthorized_is_an_auth_failure() {
        let unauthorized = Error::Protocol {
            status: StatusCode::UNAUTHORIZED,
            detail: Some("Authentication required".to_owned()),
        };
        let missing = Error::Protocol {
            status: StatusCode::NOT_FOUND,
            detail: Some("Activity not found".to_owned()),
        };

        assert!(unauthorized.is_auth_failure());
        assert!(!missing.is_auth_failure());
        assert!(!missing.is_conflict());
        assert!(!Error::AuthRequired.is_auth_failure());
    }
}
