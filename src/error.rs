use std::io;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::connection::ParseError;

/// Errors raised while configuring the client or emitting metrics.
///
/// Only [MetricError::InvalidArgument] is ever returned to the caller of a
/// recording operation; it indicates programmer error. Configuration and
/// transport failures are routed to the error handler installed at
/// construction and converted into an inactive client or a `false` return.
#[derive(Debug, Error)]
pub enum MetricError {
    /// Malformed connection string or missing required parameter.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Socket construction or datagram send failure.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
    /// Empty key or empty key collection passed to a recording operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

impl From<ParseError> for MetricError {
    fn from(err: ParseError) -> Self {
        MetricError::Configuration(err.to_string())
    }
}

/// Callback invoked synchronously for every contained error.
///
/// Installed once at construction via
/// [ClientBuilder::with_error_handler](crate::client::ClientBuilder::with_error_handler);
/// there is no global subscriber state.
pub type ErrorHandler = Arc<dyn Fn(&MetricError) + Send + Sync>;

pub(crate) fn default_error_handler() -> ErrorHandler {
    Arc::new(|err| debug!("Dropping unhandled metric error, was: {err}"))
}
