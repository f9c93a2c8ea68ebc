//! Dashboard-level error types shared by the API client, bridge, auth, and stores.

// self
use crate::_prelude::*;

/// Dashboard-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Message surfaced when the CSRF retry budget is exhausted.
pub const CSRF_REFRESH_MESSAGE: &str =
	"Authentication error. Please refresh the page and try again.";

/// Canonical dashboard error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Client storage failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::storage::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS); the request never completed.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Failure while talking to the embedding host platform.
	#[error(transparent)]
	Bridge(#[from] crate::bridge::BridgeError),

	/// Backend answered 401; the caller is not logged in.
	#[error("The session is not authenticated.")]
	Unauthorized,
	/// Backend kept answering 419 after the CSRF cookie was refreshed.
	#[error("{message}")]
	Csrf {
		/// User-facing message asking for a manual page refresh.
		message: String,
	},
	/// Business-rule rejection (4xx) that should be shown to the user verbatim.
	#[error("Request rejected with HTTP {status}: {message}")]
	Validation {
		/// HTTP status code.
		status: u16,
		/// Message extracted from the response body.
		message: String,
		/// Full response body, when it was JSON.
		body: Option<Value>,
	},
	/// Backend answered 2xx but reported `success: false`.
	#[error("{message}")]
	Rejected {
		/// Backend-supplied message.
		message: String,
	},
	/// An account-scoped call was made without a current account.
	#[error("No account is selected for the current session.")]
	MissingAccount,
}
impl Error {
	/// Builds the error surfaced once the single CSRF retry has been spent.
	pub fn csrf() -> Self {
		Self::Csrf { message: CSRF_REFRESH_MESSAGE.into() }
	}

	/// Returns `true` for repeated CSRF failures that need a manual page refresh.
	pub fn is_csrf_error(&self) -> bool {
		matches!(self, Self::Csrf { .. })
	}

	/// Returns `true` when the backend rejected the session (HTTP 401).
	pub fn is_auth_error(&self) -> bool {
		matches!(self, Self::Unauthorized)
	}

	/// HTTP status attached to the failure, when one was received.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Unauthorized => Some(401),
			Self::Csrf { .. } => Some(419),
			Self::Validation { status, .. } => Some(*status),
			Self::Transient(TransientError::Upstream { status, .. }) => Some(*status),
			Self::Transient(TransientError::ResponseParse { status, .. }) => *status,
			_ => None,
		}
	}
}

/// Configuration and validation failures raised while wiring the dashboard.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// An environment override is not a valid base URL.
	#[error("Override `{name}` is not a valid URL: {value}.")]
	InvalidOverride {
		/// Variable name the value came from.
		name: String,
		/// Raw value that failed to parse.
		value: String,
	},
	/// A relative endpoint could not be joined onto its service URL.
	#[error("Endpoint `{path}` cannot be joined onto {base}.")]
	InvalidEndpoint {
		/// Service base URL.
		base: String,
		/// Relative path that failed to join.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The embedding host supplied malformed context.
	#[error("Host context is malformed.")]
	InvalidHostContext(#[source] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Backend answered with a 5xx status.
	#[error("Backend returned HTTP {status}: {message}.")]
	Upstream {
		/// HTTP status code.
		status: u16,
		/// Message extracted from the body, or the status reason.
		message: String,
	},
	/// Backend responded with JSON that does not match the expected shape.
	#[error("Backend returned malformed JSON.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {url}.")]
	Network {
		/// Target URL of the failed request.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(url: &Url, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { url: url.to_string(), source: Box::new(src) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn csrf_error_is_distinguishable() {
		let err = Error::csrf();

		assert!(err.is_csrf_error());
		assert!(!err.is_auth_error());
		assert_eq!(err.status(), Some(419));
		assert_eq!(err.to_string(), CSRF_REFRESH_MESSAGE);
	}

	#[test]
	fn validation_error_keeps_status_and_message() {
		let err = Error::Validation {
			status: 422,
			message: "The domain name has already been taken.".into(),
			body: None,
		};

		assert_eq!(err.status(), Some(422));
		assert!(err.to_string().contains("already been taken"));
	}

	#[test]
	fn config_error_converts_into_dashboard_error() {
		let config_err = ConfigError::InvalidOverride {
			name: "WEBLINGUIST_API_BASE_URL".into(),
			value: "::".into(),
		};
		let err: Error = config_err.into();

		assert!(matches!(err, Error::Config(ConfigError::InvalidOverride { .. })));
		assert!(err.to_string().contains("WEBLINGUIST_API_BASE_URL"));
	}
}
