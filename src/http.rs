//! Transport primitives for token exchanges and LTI service calls.
//!
//! Token requests run through the `oauth2` crate, so [`TokenHttpClient`] hands it
//! [`AsyncHttpClient`] handles that publish [`ResponseMetadata`] into a
//! [`ResponseMetadataSlot`] for error classification. Service requests (NRPS, AGS) go through
//! [`ServiceHttpClient`], which sends a [`ServiceRequest`] with an `Authorization` header and
//! returns the raw [`ServiceResponse`] for the dispatcher to classify.

// std
use std::ops::Deref;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
#[cfg(feature = "reqwest")]
use reqwest::{
	Method,
	header::{ACCEPT, AUTHORIZATION, HeaderMap, LINK, RETRY_AFTER},
};
#[cfg(feature = "reqwest")] use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`ServiceHttpClient::send`].
pub type ServiceFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ServiceResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing client-credentials exchanges while
/// publishing response metadata to the broker's error mapping.
///
/// Implementations must be `Send + Sync + 'static` so they can be shared across broker
/// instances, and the handles they return must own whatever state their request futures need
/// so those futures stay `Send`.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle tied to a [`ResponseMetadataSlot`].
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds an [`AsyncHttpClient`] handle that records outcomes in `slot`.
	///
	/// # Metadata Contract
	///
	/// - Call [`ResponseMetadataSlot::take`] before submitting the HTTP request so stale
	///   information never leaks across attempts.
	/// - Once an HTTP response provides status headers, save them with
	///   [`ResponseMetadataSlot::store`].
	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle;
}

/// Transport used for signed LTI service requests.
///
/// The transport sends exactly one request and reports whatever the LMS answered; status
/// classification and retries belong to the dispatcher.
pub trait ServiceHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` with `authorization` as the `Authorization` header value.
	fn send<'a>(&'a self, request: &'a ServiceRequest, authorization: &'a str)
	-> ServiceFuture<'a>;
}

/// Captures metadata from the most recent token endpoint response.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the token endpoint, if available.
	pub status: Option<u16>,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// HTTP verbs used against LTI services.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServiceMethod {
	/// Read a membership or result container.
	Get,
	/// Create a line item or publish a score.
	Post,
	/// Update an existing line item.
	Put,
}
impl ServiceMethod {
	/// Returns the method token as sent on the wire.
	pub const fn as_str(self) -> &'static str {
		match self {
			ServiceMethod::Get => "GET",
			ServiceMethod::Post => "POST",
			ServiceMethod::Put => "PUT",
		}
	}
}
impl Display for ServiceMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Fully formed service request minus its `Authorization` header.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceRequest {
	/// HTTP method.
	pub method: ServiceMethod,
	/// Target URI.
	pub uri: Url,
	/// Media type placed in the `Accept` header.
	pub accept: Option<&'static str>,
	/// Form-encoded body fields.
	pub form: Option<Vec<(String, String)>>,
}
impl ServiceRequest {
	/// Creates a bodiless `GET`.
	pub fn get(uri: Url) -> Self {
		Self { method: ServiceMethod::Get, uri, accept: None, form: None }
	}

	/// Creates a `POST` carrying `form`.
	pub fn post_form(uri: Url, form: Vec<(String, String)>) -> Self {
		Self { method: ServiceMethod::Post, uri, accept: None, form: Some(form) }
	}

	/// Creates a `PUT` carrying `form`.
	pub fn put_form(uri: Url, form: Vec<(String, String)>) -> Self {
		Self { method: ServiceMethod::Put, uri, accept: None, form: Some(form) }
	}

	/// Sets the `Accept` media type.
	pub fn with_accept(mut self, media_type: &'static str) -> Self {
		self.accept = Some(media_type);

		self
	}
}

/// Raw LMS answer to a [`ServiceRequest`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ServiceResponse {
	/// HTTP status code.
	pub status: u16,
	/// Raw `Link` header, if any.
	pub link: Option<String>,
	/// Retry-After hint, if any.
	pub retry_after: Option<Duration>,
	/// Response body.
	pub body: Vec<u8>,
}
impl ServiceResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Body decoded as UTF-8, replacing invalid sequences.
	pub fn body_text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// URL of the next page advertised through `Link: <...>; rel="next"`.
	pub fn next_page(&self) -> Option<Url> {
		self.link.as_deref().and_then(parse_next_link)
	}
}

/// Thin wrapper around [`ReqwestClient`] shared by token and service calls.
///
/// Token endpoints return results directly, so any custom [`ReqwestClient`] should disable
/// redirect following.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	pub(crate) fn instrumented(&self, slot: ResponseMetadataSlot) -> InstrumentedHandle {
		InstrumentedHandle::new(self.0.clone(), slot)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	type Handle = InstrumentedHandle;
	type TransportError = ReqwestError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		self.instrumented(slot)
	}
}
#[cfg(feature = "reqwest")]
impl ServiceHttpClient for ReqwestHttpClient {
	fn send<'a>(
		&'a self,
		request: &'a ServiceRequest,
		authorization: &'a str,
	) -> ServiceFuture<'a> {
		Box::pin(async move {
			let method = match request.method {
				ServiceMethod::Get => Method::GET,
				ServiceMethod::Post => Method::POST,
				ServiceMethod::Put => Method::PUT,
			};
			let mut builder =
				self.0.request(method, request.uri.clone()).header(AUTHORIZATION, authorization);

			if let Some(accept) = request.accept {
				builder = builder.header(ACCEPT, accept);
			}
			if let Some(form) = &request.form {
				builder = builder.form(form);
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let link = response
				.headers()
				.get(LINK)
				.and_then(|value| value.to_str().ok())
				.map(ToOwned::to_owned);
			let retry_after = parse_retry_after(response.headers());
			let body = response.bytes().await?.to_vec();

			Ok(ServiceResponse { status, link, retry_after, body })
		})
	}
}

#[cfg(feature = "reqwest")]
pub(crate) struct InstrumentedHttpClient {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}

/// Handle returned by [`ReqwestHttpClient`] that satisfies [`TokenHttpClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct InstrumentedHandle(Arc<InstrumentedHttpClient>);
#[cfg(feature = "reqwest")]
impl InstrumentedHandle {
	fn new(client: ReqwestClient, slot: ResponseMetadataSlot) -> Self {
		Self(Arc::new(InstrumentedHttpClient { client, slot }))
	}
}
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = Arc::clone(&self.0);

		Box::pin(async move {
			client.slot.take();

			let response = client
				.client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let retry_after = parse_retry_after(&headers);

			client.slot.store(ResponseMetadata { status: Some(status.as_u16()), retry_after });

			let mut converted =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*converted.status_mut() = status;
			*converted.headers_mut() = headers;

			Ok(converted)
		})
	}
}

#[cfg(feature = "reqwest")]
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<i64>() {
		return Some(Duration::seconds(secs));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

fn parse_next_link(header: &str) -> Option<Url> {
	header.split(',').find_map(|entry| {
		let (target, params) = entry.trim().strip_prefix('<')?.split_once('>')?;
		let is_next = params
			.split(';')
			.filter_map(|param| param.trim().split_once('='))
			.filter(|(key, _)| key.trim().eq_ignore_ascii_case("rel"))
			.any(|(_, value)| {
				value.trim().trim_matches('"').split_whitespace().any(|rel| rel == "next")
			});

		if is_next { Url::parse(target.trim()).ok() } else { None }
	})
}
