use std::error::Error as StdError;

/// Common error type for `helios_core`.
///
/// Vendor adapters and storage backends should preserve the underlying error
/// chain where possible via `Error::backend`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// Unknown vendor-type tag or otherwise unusable vendor configuration.
    /// Raised at adapter-resolution time, before any network call.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Vendor login failed, or the login response carried no usable token.
    /// Aborts the whole sync attempt for that vendor; never retried here.
    #[error("authentication failed for vendor '{vendor}': {message}")]
    AuthenticationFailed {
        vendor: String,
        status: Option<u16>,
        message: String,
    },

    /// Non-success response (or vendor-reported error code) from a vendor
    /// endpoint. Aborts the current phase for that vendor only.
    #[error("vendor api error for '{vendor}' (status {status}): {body}")]
    VendorApi {
        vendor: String,
        status: u16,
        body: String,
    },

    /// A single vendor-native record could not be mapped into the common
    /// schema. Callers skip the record and keep the batch going.
    #[error("normalization failed: {0}")]
    Normalization(String),

    #[error("backend error: {context}")]
    Backend {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },

    #[error("backend error: {0}")]
    BackendMessage(String),
}

impl Error {
    pub fn backend(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Backend {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Convenience: wrap any error into `Backend` with "reqwest" context.
    pub fn backend_reqwest(source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Backend {
            context: "reqwest".into(),
            source: Box::new(source),
        }
    }

    /// Whether this error should abort the whole vendor run (as opposed to
    /// a single phase or record).
    pub fn aborts_vendor_run(&self) -> bool {
        matches!(
            self,
            Error::AuthenticationFailed { .. } | Error::Configuration(..)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
