//! Typed error taxonomy for internal API calls and git-operation forwarding.
//!
//! The exact `Display` strings of [`ApiError::Parse`] and [`ApiError::Status`]
//! are part of the contract: calling code surfaces them to users verbatim.

use thiserror::Error;

/// Classified outcome of a failed internal API call.
///
/// A call returns exactly one of a success value or one of these variants;
/// nothing in this layer retries or swallows an error.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend explicitly reported failure with a message.  The message
    /// is surfaced verbatim.
    #[error("{0}")]
    Domain(String),

    /// The response body was not well-formed JSON.  The underlying parse
    /// failure is intentionally not surfaced.
    #[error("Parsing failed")]
    Parse,

    /// Non-success HTTP status with no parseable body.
    #[error("Internal API error ({0})")]
    Status(u16),

    /// Connection-level failure: refused, timeout, resolution failure.
    #[error("internal API unreachable: {0}")]
    Transport(anyhow::Error),
}

impl ApiError {
    /// Wrap a connection-level failure.
    pub fn transport(err: impl Into<anyhow::Error>) -> Self {
        ApiError::Transport(err.into())
    }
}

/// Outcome of a failed git-operation forwarding call.
///
/// Cancellation is its own variant so callers can choose not to log it as an
/// anomaly.  A remote non-zero exit is not an error; it is returned as the
/// exit code.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The supplied context was canceled before the remote call completed.
    #[error("git operation forwarding canceled")]
    Canceled,

    /// The remote call failed at the transport level.
    #[error("git operation forwarding failed: {0}")]
    Transport(anyhow::Error),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
