// crates.io
use httpmock::prelude::*;
// self
use lti_sync::{
	_preludet::*,
	auth::{AccessToken, ClientId, LtiScope, ScopeSet},
	broker::TokenSource,
	dispatch::Dispatcher,
	error::RetryAxis,
	http::{ReqwestHttpClient, ServiceRequest},
	platform::PlatformDescriptor,
};

fn build_dispatcher(server: &MockServer) -> (Dispatcher<ReqwestHttpClient>, Arc<RecordingPause>) {
	let descriptor = PlatformDescriptor::builder(
		ClientId::new("tool-client").expect("Client identifier should be valid."),
	)
	.token_endpoint(
		Url::parse(&server.url("/token")).expect("Mock token endpoint should parse successfully."),
	)
	.build()
	.expect("Platform descriptor should build successfully.");
	let tokens: Arc<dyn TokenSource> = Arc::new(build_reqwest_test_broker(descriptor, "secret"));
	let pause = Arc::new(RecordingPause::default());
	let dispatcher =
		Dispatcher::new(test_reqwest_http_client(), tokens).with_pause(pause.clone());

	(dispatcher, pause)
}

fn results_request(server: &MockServer) -> ServiceRequest {
	ServiceRequest::get(
		Url::parse(&server.url("/lineitems/1/results")).expect("Mock URL should parse."),
	)
}

#[tokio::test]
async fn persistent_rate_limiting_gives_up_after_five_pauses() {
	let server = MockServer::start_async().await;
	let (dispatcher, pause) = build_dispatcher(&server);
	let scope = ScopeSet::from(LtiScope::ResultReadOnly);
	let token = AccessToken::new("Bearer", "initial", scope.clone());
	let limited = server
		.mock_async(|when, then| {
			when.method(GET).path("/lineitems/1/results").header("authorization", "Bearer initial");
			then.status(429).header("retry-after", "10");
		})
		.await;
	let err = dispatcher
		.dispatch(&results_request(&server), &token, &scope)
		.await
		.expect_err("Six rate limited answers should exhaust the budget.");

	assert!(matches!(err, Error::SyncUnavailable { axis: RetryAxis::RateLimited, attempts: 6 }));
	assert_eq!(pause.recorded(), vec![Duration::seconds(10); 5]);

	limited.assert_calls_async(6).await;
}

#[tokio::test]
async fn persistent_unauthorized_reacquires_five_tokens() {
	let server = MockServer::start_async().await;
	let (dispatcher, pause) = build_dispatcher(&server);
	let scope = ScopeSet::from(LtiScope::ResultReadOnly);
	let token = AccessToken::new("Bearer", "stale", scope.clone());
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token").form_urlencoded_tuple("scope", scope.normalized());
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"fresh\",\"token_type\":\"bearer\"}");
		})
		.await;
	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/lineitems/1/results");
			then.status(401);
		})
		.await;
	let err = dispatcher
		.dispatch(&results_request(&server), &token, &scope)
		.await
		.expect_err("Six unauthorized answers should exhaust the budget.");

	assert!(matches!(err, Error::SyncUnavailable { axis: RetryAxis::Unauthorized, attempts: 6 }));
	assert!(pause.recorded().is_empty());

	token_mock.assert_calls_async(5).await;
	rejected.assert_calls_async(6).await;
}

#[tokio::test]
async fn client_errors_surface_with_body() {
	let server = MockServer::start_async().await;
	let (dispatcher, _pause) = build_dispatcher(&server);
	let scope = ScopeSet::from(LtiScope::ResultReadOnly);
	let token = AccessToken::new("Bearer", "initial", scope.clone());
	let missing = server
		.mock_async(|when, then| {
			when.method(GET).path("/lineitems/1/results");
			then.status(404).body("line item not found");
		})
		.await;
	let err = dispatcher
		.dispatch(&results_request(&server), &token, &scope)
		.await
		.expect_err("A 404 should be terminal.");

	assert!(matches!(
		err,
		Error::Protocol { status: 404, ref body, .. } if body == "line item not found"
	));

	missing.assert_calls_async(1).await;
}
