//! Client-credentials token broker.
//!
//! [`TokenBroker`] mints a fresh access token for every request. Nothing is cached: the
//! dispatcher asks again whenever the LMS reports a token as unauthorized.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ScopeSet},
	http::TokenHttpClient,
	oauth::{BasicFacade, OAuth2Facade, TransportErrorMapper},
	obs::{self, SyncKind},
	platform::PlatformDescriptor,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

/// Boxed future returned by [`TokenSource::acquire`].
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<AccessToken>> + 'a + Send>>;

#[cfg(feature = "reqwest")]
/// Broker specialized for the crate's default reqwest transport stack.
pub type ReqwestTokenBroker = TokenBroker<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Anything able to mint access tokens for a scope set.
pub trait TokenSource
where
	Self: Send + Sync,
{
	/// Requests a token authorized for every scope in `scope`.
	fn acquire<'a>(&'a self, scope: &'a ScopeSet) -> TokenFuture<'a>;
}

/// Requests client-credentials tokens from a single platform.
#[derive(Clone)]
pub struct TokenBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every token request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Platform registration holding the client id and token endpoint.
	pub descriptor: PlatformDescriptor,
	/// Client secret for confidential authentication methods.
	pub client_secret: Option<String>,
}
impl<C, M> TokenBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a broker that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		descriptor: PlatformDescriptor,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			descriptor,
			client_secret: None,
		}
	}

	/// Sets or replaces the client secret.
	pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Performs the client-credentials grant for `scope`.
	///
	/// Fails with [`Error::AuthenticationFailure`] when the platform rejects the client, the
	/// scopes, or grants fewer scopes than requested.
	pub async fn acquire(&self, scope: &ScopeSet) -> Result<AccessToken> {
		obs::observe(SyncKind::Token, "acquire", async move {
			let facade: BasicFacade<C, M> = BasicFacade::from_descriptor(
				&self.descriptor,
				self.client_secret.as_deref(),
				self.http_client.clone(),
				self.transport_mapper.clone(),
			)?;

			facade.exchange_client_credentials(scope).await
		})
		.await
	}
}
#[cfg(feature = "reqwest")]
impl TokenBroker<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a broker with its own reqwest-backed transport.
	pub fn new(descriptor: PlatformDescriptor) -> Self {
		Self::with_http_client(
			descriptor,
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> TokenSource for TokenBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn acquire<'a>(&'a self, scope: &'a ScopeSet) -> TokenFuture<'a> {
		Box::pin(TokenBroker::acquire(self, scope))
	}
}
impl<C, M> Debug for TokenBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenBroker")
			.field("descriptor", &self.descriptor)
			.field("client_secret_set", &self.client_secret.is_some())
			.finish()
	}
}
