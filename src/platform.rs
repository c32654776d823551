//! Platform (LMS) registration metadata consumed by the token broker.
//!
//! A [`PlatformDescriptor`] names the client registered with the platform, the HTTPS token
//! endpoint that mints client-credentials tokens, and how the client authenticates there.

/// Builder API for assembling platform descriptors.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, auth::ClientId};

/// Client authentication modes for token endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
}

/// Validated platform registration used by [`TokenBroker`](crate::broker::TokenBroker).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformDescriptor {
	/// Client identifier issued by the platform.
	pub client_id: ClientId,
	/// OAuth 2.0 token endpoint.
	pub token_endpoint: Url,
	/// Preferred client authentication mechanism.
	pub client_auth_method: ClientAuthMethod,
}
impl PlatformDescriptor {
	/// Creates a new builder for `client_id`.
	pub fn builder(client_id: ClientId) -> PlatformDescriptorBuilder {
		PlatformDescriptorBuilder::new(client_id)
	}
}
