//! Sync-level error types shared across the broker, dispatcher, and engines.

// self
use crate::{
	_prelude::*,
	auth::{DeploymentId, ScopeValidationError},
	lti::ServiceType,
};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical sync error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Collaborator persistence failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Token endpoint rejected the client credentials or the requested scopes.
	#[error("Token endpoint rejected the client: {reason}.")]
	AuthenticationFailure {
		/// Platform- or broker-supplied reason string.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// The retry budget of a single dispatch was exhausted.
	#[error("LMS request could not be completed after {attempts} {axis} responses.")]
	SyncUnavailable {
		/// Retry axis whose budget ran out.
		axis: RetryAxis,
		/// Number of occurrences observed on that axis, including the final one.
		attempts: u32,
	},
	/// The LMS answered with a non-retryable, non-success status.
	#[error("LMS returned HTTP {status} for {uri}: {body}.")]
	Protocol {
		/// HTTP status code returned by the LMS.
		status: u16,
		/// Target URI of the failing request.
		uri: String,
		/// Response body kept for diagnostics.
		body: String,
	},
	/// Roster pull produced no eligible learners after filtering.
	#[error("LMS roster contains no active learners.")]
	NoMembersFound,
	/// Deployment does not advertise the service the operation needs.
	#[error("Deployment `{deployment}` does not advertise the {service} service.")]
	MissingService {
		/// External deployment identifier.
		deployment: DeploymentId,
		/// Missing service type.
		service: ServiceType,
	},
	/// LMS payload could not be decoded.
	#[error("LMS returned a malformed payload for {uri}.")]
	Decode {
		/// Target URI of the request whose body failed to decode.
		uri: String,
		/// Structured parsing failure including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}

/// Configuration and validation failures raised before or around LMS calls.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Platform descriptor contains an invalid URL.
	#[error("Platform descriptor contains an invalid URL.")]
	InvalidDescriptor {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Request scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] ScopeValidationError),
	/// Service endpoint or LMS-issued resource identifier is not a usable URL.
	#[error("Resource URL `{url}` is invalid.")]
	InvalidResourceUrl {
		/// Offending URL string.
		url: String,
		/// Underlying parsing failure, if the string did not parse at all.
		#[source]
		source: Option<url::ParseError>,
	},
	/// Score timestamp could not be rendered as RFC 3339.
	#[error("Score timestamp could not be formatted.")]
	TimestampFormat(#[from] time::error::Format),
	/// Deployment belongs to a different client than the engine.
	#[error("Deployment belongs to client `{deployment_client}`, engine is bound to `{engine_client}`.")]
	ClientMismatch {
		/// Client the engine was constructed for.
		engine_client: String,
		/// Client owning the deployment.
		deployment_client: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the LMS.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the LMS.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Retry axes tracked independently by the dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RetryAxis {
	/// HTTP 429 responses.
	RateLimited,
	/// HTTP 401 responses.
	Unauthorized,
}
impl RetryAxis {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RetryAxis::RateLimited => "rate_limited",
			RetryAxis::Unauthorized => "unauthorized",
		}
	}
}
impl Display for RetryAxis {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
