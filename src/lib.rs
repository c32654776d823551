//! LTI Advantage synchronization engine: client-credentials tokens, a bounded retry
//! discipline for signed service calls, and idempotent roster (NRPS) plus gradebook (AGS)
//! reconciliation against a host application's records.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod broker;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod lti;
pub mod model;
pub mod oauth;
pub mod obs;
pub mod platform;
pub mod store;
pub mod sync;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		broker::{ReqwestTokenBroker, TokenBroker},
		dispatch::{Pause, PauseFuture},
		http::ReqwestHttpClient,
		oauth::ReqwestTransportErrorMapper,
		platform::PlatformDescriptor,
		store::{MarkSource, MemoryStore, SyncStore},
		sync::{LtiSync, ReqwestLtiSync},
	};

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Constructs a [`TokenBroker`] using the insecure test transport.
	pub fn build_reqwest_test_broker(
		descriptor: PlatformDescriptor,
		client_secret: &str,
	) -> ReqwestTokenBroker {
		TokenBroker::with_http_client(
			descriptor,
			test_reqwest_http_client(),
			Arc::new(ReqwestTransportErrorMapper),
		)
		.with_client_secret(client_secret)
	}

	/// Constructs an [`LtiSync`] engine backed by an in-memory store and a [`RecordingPause`].
	pub fn build_reqwest_test_sync(
		descriptor: PlatformDescriptor,
		client_secret: &str,
	) -> (ReqwestLtiSync, Arc<MemoryStore>, Arc<RecordingPause>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn SyncStore> = store_backend.clone();
		let marks: Arc<dyn MarkSource> = store_backend.clone();
		let pause = Arc::new(RecordingPause::default());
		let engine = LtiSync::from_broker(
			build_reqwest_test_broker(descriptor, client_secret),
			store,
			marks,
		)
		.with_pause(pause.clone());

		(engine, store_backend, pause)
	}

	/// [`Pause`] that records requested durations and resolves immediately.
	#[derive(Debug, Default)]
	pub struct RecordingPause(Mutex<Vec<Duration>>);
	impl RecordingPause {
		/// Durations requested so far.
		pub fn recorded(&self) -> Vec<Duration> {
			self.0.lock().clone()
		}
	}
	impl Pause for RecordingPause {
		fn pause(&self, duration: Duration) -> PauseFuture<'_> {
			self.0.lock().push(duration);

			Box::pin(async {})
		}
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
