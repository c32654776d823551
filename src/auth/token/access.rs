//! Access tokens returned by the client-credentials grant.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, token::secret::TokenSecret},
};

/// Access token minted for a set of LTI service scopes.
///
/// Tokens are never cached across sync passes; the dispatcher asks the broker for a new one
/// whenever the LMS answers `401`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AccessToken {
	/// Authorization scheme reported by the token endpoint (e.g. `Bearer`).
	pub token_type: String,
	/// Opaque token value; callers must avoid logging it.
	pub secret: TokenSecret,
	/// Scopes the token was requested for.
	pub scope: ScopeSet,
	/// Instant the token was received.
	pub issued_at: OffsetDateTime,
	/// Expiry instant derived from `expires_in`, when the platform reported one.
	pub expires_at: Option<OffsetDateTime>,
}
impl AccessToken {
	/// Creates a token issued now with no known expiry.
	pub fn new(token_type: impl Into<String>, secret: impl Into<String>, scope: ScopeSet) -> Self {
		Self {
			token_type: token_type.into(),
			secret: TokenSecret::new(secret),
			scope,
			issued_at: OffsetDateTime::now_utc(),
			expires_at: None,
		}
	}

	/// Sets the expiry relative to the issued-at instant.
	pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
		self.expires_at = Some(self.issued_at + expires_in);

		self
	}

	/// Value for the `Authorization` header: `<token_type> <token>`.
	pub fn authorization(&self) -> String {
		format!("{} {}", self.token_type, self.secret.expose())
	}

	/// Returns `true` if the platform-declared lifetime has elapsed at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| instant >= expires_at)
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("token_type", &self.token_type)
			.field("secret", &"<redacted>")
			.field("scope", &self.scope)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::auth::LtiScope;

	#[test]
	fn authorization_header_joins_type_and_value() {
		let token = AccessToken::new("Bearer", "abc123", ScopeSet::from(LtiScope::NamesRole));

		assert_eq!(token.authorization(), "Bearer abc123");
		assert!(!format!("{token:?}").contains("abc123"), "Debug output must redact the token.");
	}

	#[test]
	fn expiry_is_relative_to_issue_time() {
		let mut token = AccessToken::new("Bearer", "abc123", ScopeSet::default());

		token.issued_at = macros::datetime!(2025-01-01 00:00 UTC);

		let token = token.with_expires_in(Duration::hours(1));

		assert!(!token.is_expired_at(macros::datetime!(2025-01-01 00:59 UTC)));
		assert!(token.is_expired_at(macros::datetime!(2025-01-01 01:00 UTC)));
	}
}
