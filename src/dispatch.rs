//! Signed request dispatch with a bounded retry discipline.
//!
//! Every LMS service call goes through [`Dispatcher::dispatch`], which attaches the token,
//! sends the request, and classifies the answer:
//!
//! - `2xx` returns the response.
//! - `429` waits a fixed backoff and resends with the same token.
//! - `401` acquires a fresh token for the same scopes and resends with it.
//! - Anything else fails with [`Error::Protocol`].
//!
//! The two retry axes are counted independently per call. The occurrence that exceeds an
//! axis budget fails the call with [`Error::SyncUnavailable`].
//!
//! A token whose declared lifetime has already elapsed is replaced before the first send; that
//! replacement is not counted against the `401` budget.

/// Retry budget and the pause hook.
pub mod retry;

pub use retry::*;

// std
use std::borrow::Cow;
// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ScopeSet},
	broker::TokenSource,
	error::RetryAxis,
	http::{ServiceHttpClient, ServiceRequest, ServiceResponse},
	obs::{self, SyncKind, sync_event},
};

/// Sends service requests and applies the [`RetryPolicy`].
pub struct Dispatcher<H>
where
	H: ?Sized + ServiceHttpClient,
{
	/// Transport used for the service calls.
	pub http_client: Arc<H>,
	/// Token source consulted after `401` responses and for elapsed tokens.
	pub tokens: Arc<dyn TokenSource>,
	/// Retry budget.
	pub policy: RetryPolicy,
	/// Wait applied between rate-limited attempts.
	pub pause: Arc<dyn Pause>,
}
impl<H> Dispatcher<H>
where
	H: ?Sized + ServiceHttpClient,
{
	/// Creates a dispatcher with the default policy and the tokio timer.
	pub fn new(http_client: impl Into<Arc<H>>, tokens: Arc<dyn TokenSource>) -> Self {
		Self {
			http_client: http_client.into(),
			tokens,
			policy: RetryPolicy::default(),
			pause: Arc::new(TokioPause),
		}
	}

	/// Replaces the retry budget.
	pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
		self.policy = policy;

		self
	}

	/// Replaces the pause hook.
	pub fn with_pause(mut self, pause: Arc<dyn Pause>) -> Self {
		self.pause = pause;

		self
	}

	/// Sends `request` with `token`, retrying rate-limited and unauthorized answers.
	///
	/// `scope` is the scope set `token` was acquired for; re-acquisitions request the same set.
	pub async fn dispatch(
		&self,
		request: &ServiceRequest,
		token: &AccessToken,
		scope: &ScopeSet,
	) -> Result<ServiceResponse> {
		obs::observe(SyncKind::Dispatch, "dispatch", async move {
			let mut token = Cow::Borrowed(token);

			if token.is_expired_at(OffsetDateTime::now_utc()) {
				sync_event!(debug, uri = %request.uri, "token lifetime elapsed, acquiring a new one");

				token = Cow::Owned(self.tokens.acquire(scope).await?);
			}

			let mut rate_limited = 0_u32;
			let mut unauthorized = 0_u32;

			loop {
				let authorization = token.authorization();
				let response = self.http_client.send(request, &authorization).await?;

				match response.status {
					_ if response.is_success() => return Ok(response),
					429 => {
						rate_limited += 1;

						if rate_limited > self.policy.max_rate_limited {
							return Err(Error::SyncUnavailable {
								axis: RetryAxis::RateLimited,
								attempts: rate_limited,
							});
						}

						obs::record_retry(RetryAxis::RateLimited);
						sync_event!(
							warn,
							uri = %request.uri,
							attempt = rate_limited,
							retry_after = ?response.retry_after,
							"LMS rate limited the request"
						);

						self.pause.pause(self.policy.rate_limit_backoff).await;
					},
					401 => {
						unauthorized += 1;

						if unauthorized > self.policy.max_unauthorized {
							return Err(Error::SyncUnavailable {
								axis: RetryAxis::Unauthorized,
								attempts: unauthorized,
							});
						}

						obs::record_retry(RetryAxis::Unauthorized);
						sync_event!(
							warn,
							uri = %request.uri,
							attempt = unauthorized,
							"LMS rejected the token, acquiring a new one"
						);

						token = Cow::Owned(self.tokens.acquire(scope).await?);
					},
					status =>
						return Err(Error::Protocol {
							status,
							uri: request.uri.to_string(),
							body: response.body_text(),
						}),
				}
			}
		})
		.await
	}
}
impl<H> Debug for Dispatcher<H>
where
	H: ?Sized + ServiceHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Dispatcher").field("policy", &self.policy).finish()
	}
}

/// Decodes a JSON service response, keeping the failing JSON path on error.
pub(crate) fn decode_json<T>(uri: &Url, response: &ServiceResponse) -> Result<T>
where
	T: DeserializeOwned,
{
	let deserializer = &mut serde_json::Deserializer::from_slice(&response.body);

	serde_path_to_error::deserialize(deserializer)
		.map_err(|source| Error::Decode { uri: uri.to_string(), source })
}
