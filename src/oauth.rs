//! Internal OAuth client facade for the client-credentials grant.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, ClientId as OAuthClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, RequestTokenError, Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenType},
};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ScopeSet},
	error::{ConfigError, TransportError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	platform::{ClientAuthMethod, PlatformDescriptor},
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;
type FacadeTokenResponse = oauth2::basic::BasicTokenResponse;
type FacadeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Maps HTTP transport failures into sync [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a sync error.
	fn map_transport_error(
		&self,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		_meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) if inner.is_builder() => ConfigError::from(*inner).into(),
			HttpClientError::Reqwest(inner) => TransportError::from(*inner).into(),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => TransportError::Network {
				source: format!("HTTP client error while calling the token endpoint: {message}.")
					.into(),
			}
			.into(),
			_ => TransportError::Network {
				source: "HTTP client error while calling the token endpoint.".into(),
			}
			.into(),
		}
	}
}

pub(crate) trait OAuth2Facade {
	fn exchange_client_credentials<'a, 'scope>(
		&'a self,
		requested_scope: &'scope ScopeSet,
	) -> FacadeFuture<'a, AccessToken>
	where
		'scope: 'a;
}

pub(crate) struct BasicFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredBasicClient,
	token_endpoint: Url,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> BasicFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn from_descriptor(
		descriptor: &PlatformDescriptor,
		client_secret: Option<&str>,
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		let token_url = TokenUrl::new(descriptor.token_endpoint.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let mut oauth_client = BasicClient::new(OAuthClientId::new(descriptor.client_id.to_string()))
			.set_token_uri(token_url);

		if let Some(secret) = client_secret {
			oauth_client = oauth_client.set_client_secret(ClientSecret::new(secret.to_owned()));
		}
		if matches!(descriptor.client_auth_method, ClientAuthMethod::ClientSecretPost) {
			oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
		}

		Ok(Self {
			oauth_client,
			token_endpoint: descriptor.token_endpoint.clone(),
			http_client: http_client.into(),
			error_mapper: error_mapper.into(),
		})
	}
}
impl<C, M> OAuth2Facade for BasicFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn exchange_client_credentials<'a, 'scope>(
		&'a self,
		requested_scope: &'scope ScopeSet,
	) -> FacadeFuture<'a, AccessToken>
	where
		'scope: 'a,
	{
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let mut request = self.oauth_client.exchange_client_credentials();

			for scope in requested_scope.iter() {
				request = request.add_scope(Scope::new(scope.to_owned()));
			}

			let response = request.request_async(&instrumented).await.map_err(|err| {
				map_request_error(&self.token_endpoint, meta.take(), err, self.error_mapper.as_ref())
			})?;

			map_token_response(requested_scope, response)
		})
	}
}

fn map_token_response(
	requested_scope: &ScopeSet,
	response: FacadeTokenResponse,
) -> Result<AccessToken> {
	if let Some(scopes) = response.scopes() {
		let granted =
			ScopeSet::new(scopes.iter().map(|scope| scope.as_str())).map_err(ConfigError::from)?;

		if !granted.covers(requested_scope) {
			return Err(Error::AuthenticationFailure {
				reason: format!("granted scopes `{granted}` do not cover `{requested_scope}`"),
				status: None,
			});
		}
	}

	let token_type = match response.token_type() {
		BasicTokenType::Bearer => "Bearer".to_owned(),
		other => other.as_ref().to_owned(),
	};
	let token = AccessToken::new(
		token_type,
		response.access_token().secret().to_owned(),
		requested_scope.clone(),
	);

	match response.expires_in().and_then(|lifetime| Duration::try_from(lifetime).ok()) {
		Some(lifetime) if lifetime.is_positive() => Ok(token.with_expires_in(lifetime)),
		_ => Ok(token),
	}
}

fn map_request_error<E, M>(
	token_endpoint: &Url,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let status = meta.as_ref().and_then(|value| value.status);

	match err {
		RequestTokenError::ServerResponse(response) => map_server_response_error(response, status),
		RequestTokenError::Request(error) => mapper.map_transport_error(meta.as_ref(), error),
		RequestTokenError::Parse(source, body) => match status {
			Some(code) if is_client_error(code) => Error::AuthenticationFailure {
				reason: format!("token endpoint returned HTTP {code}"),
				status,
			},
			Some(code) if !(200..300).contains(&code) => Error::Protocol {
				status: code,
				uri: token_endpoint.to_string(),
				body: String::from_utf8_lossy(&body).into_owned(),
			},
			_ => Error::Decode { uri: token_endpoint.to_string(), source },
		},
		RequestTokenError::Other(message) => match status {
			Some(code) if is_client_error(code) =>
				Error::AuthenticationFailure { reason: message, status },
			_ => Error::Protocol {
				status: status.unwrap_or_default(),
				uri: token_endpoint.to_string(),
				body: message,
			},
		},
	}
}

fn map_server_response_error(response: BasicErrorResponse, status: Option<u16>) -> Error {
	let reason = match response.error_description() {
		Some(description) => format!("{}: {description}", response.error().as_ref()),
		None => response.error().as_ref().to_owned(),
	};

	Error::AuthenticationFailure { reason, status }
}

fn is_client_error(status: u16) -> bool {
	(400..500).contains(&status)
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// crates.io
	use oauth2::basic::BasicErrorResponseType;
	// self
	use super::*;
	use crate::{
		auth::{ClientId, LtiScope},
		http::ReqwestHttpClient,
	};

	fn descriptor(method: ClientAuthMethod) -> PlatformDescriptor {
		PlatformDescriptor::builder(
			ClientId::new("tool-client").expect("Client fixture should be valid."),
		)
		.token_endpoint(
			Url::parse("https://lms.example.com/login/oauth2/token")
				.expect("Failed to parse token endpoint URL."),
		)
		.client_auth_method(method)
		.build()
		.expect("Failed to build platform descriptor.")
	}

	#[test]
	fn builds_basic_and_post_auth_clients() {
		for method in [ClientAuthMethod::ClientSecretBasic, ClientAuthMethod::ClientSecretPost] {
			let result =
				<BasicFacade<ReqwestHttpClient, ReqwestTransportErrorMapper>>::from_descriptor(
					&descriptor(method),
					Some("secret"),
					Arc::new(ReqwestHttpClient::default()),
					Arc::new(ReqwestTransportErrorMapper),
				);

			assert!(result.is_ok());
		}
	}

	#[test]
	fn oauth_error_bodies_become_authentication_failures() {
		let response = BasicErrorResponse::new(
			BasicErrorResponseType::InvalidClient,
			Some("unknown client".into()),
			None,
		);
		let err = map_server_response_error(response, Some(401));

		assert!(matches!(
			err,
			Error::AuthenticationFailure { ref reason, status: Some(401) }
				if reason == "invalid_client: unknown client"
		));
	}

	#[test]
	fn narrower_granted_scope_is_rejected() {
		let requested = ScopeSet::lti([LtiScope::Score, LtiScope::ResultReadOnly]);
		let response: FacadeTokenResponse = serde_json::from_str(&format!(
			r#"{{"access_token":"t","token_type":"bearer","scope":"{}"}}"#,
			LtiScope::Score.as_str()
		))
		.expect("Token response fixture should deserialize.");

		assert!(matches!(
			map_token_response(&requested, response),
			Err(Error::AuthenticationFailure { .. })
		));
	}

	#[test]
	fn bearer_tokens_use_canonical_scheme_casing() {
		let requested = ScopeSet::from(LtiScope::NamesRole);
		let response: FacadeTokenResponse = serde_json::from_str(
			r#"{"access_token":"t","token_type":"bearer","expires_in":3600}"#,
		)
		.expect("Token response fixture should deserialize.");
		let token = map_token_response(&requested, response).expect("Token should map.");

		assert_eq!(token.authorization(), "Bearer t");
		assert!(token.expires_at.is_some());
	}
}
