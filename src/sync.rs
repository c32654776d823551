//! Roster, line item, and grade reconciliation against one LMS client.
//!
//! [`LtiSync`] ties a [`TokenSource`], a [`Dispatcher`], and the host's collaborators
//! together. Each operation lives in its own submodule and runs as a strictly ordered
//! sequence of awaited requests; hosts serialize passes per deployment.

mod grades;
mod line_item;
mod roster;

pub use grades::*;
pub use roster::*;

// self
use crate::{
	_prelude::*,
	auth::ClientId,
	broker::TokenSource,
	config::SyncConfig,
	dispatch::{Dispatcher, Pause},
	http::ServiceHttpClient,
	store::{MarkSource, SyncStore},
};
#[cfg(feature = "reqwest")]
use crate::{broker::ReqwestTokenBroker, http::ReqwestHttpClient};

#[cfg(feature = "reqwest")]
/// Engine specialized for the crate's default reqwest transport stack.
pub type ReqwestLtiSync = LtiSync<ReqwestHttpClient>;

/// Sync engine bound to one client registration.
pub struct LtiSync<H>
where
	H: ?Sized + ServiceHttpClient,
{
	/// Client every handled deployment must belong to.
	pub client: ClientId,
	/// Token source for the initial token of each pass.
	pub tokens: Arc<dyn TokenSource>,
	/// Signed request dispatcher.
	pub dispatcher: Dispatcher<H>,
	/// Persistence collaborator.
	pub store: Arc<dyn SyncStore>,
	/// Released marks collaborator.
	pub marks: Arc<dyn MarkSource>,
	/// Engine tunables.
	pub config: SyncConfig,
}
impl<H> LtiSync<H>
where
	H: ?Sized + ServiceHttpClient,
{
	/// Creates an engine with the default configuration.
	pub fn new(
		client: ClientId,
		tokens: Arc<dyn TokenSource>,
		http_client: impl Into<Arc<H>>,
		store: Arc<dyn SyncStore>,
		marks: Arc<dyn MarkSource>,
	) -> Self {
		let config = SyncConfig::default();
		let dispatcher =
			Dispatcher::new(http_client, tokens.clone()).with_policy(config.retry.clone());

		Self { client, tokens, dispatcher, store, marks, config }
	}

	/// Replaces the configuration, including the dispatcher's retry budget.
	pub fn with_config(mut self, config: SyncConfig) -> Self {
		self.dispatcher.policy = config.retry.clone();
		self.config = config;

		self
	}

	/// Replaces the wait applied between rate-limited attempts.
	pub fn with_pause(mut self, pause: Arc<dyn Pause>) -> Self {
		self.dispatcher.pause = pause;

		self
	}
}
#[cfg(feature = "reqwest")]
impl LtiSync<ReqwestHttpClient> {
	/// Creates an engine that shares `broker`'s client registration and reqwest transport.
	pub fn from_broker(
		broker: ReqwestTokenBroker,
		store: Arc<dyn SyncStore>,
		marks: Arc<dyn MarkSource>,
	) -> Self {
		let client = broker.descriptor.client_id.clone();
		let http_client = broker.http_client.clone();

		Self::new(client, Arc::new(broker), http_client, store, marks)
	}
}
impl<H> Debug for LtiSync<H>
where
	H: ?Sized + ServiceHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LtiSync")
			.field("client", &self.client)
			.field("config", &self.config)
			.finish()
	}
}
