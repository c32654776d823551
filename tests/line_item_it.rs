// crates.io
use httpmock::prelude::*;
// self
use lti_sync::{
	_preludet::*,
	auth::{AssessmentId, ClientId, DeploymentId, LtiScope},
	lti::{LINE_ITEM_MEDIA_TYPE, ServiceType},
	model::{Assessment, AssessmentKind, Deployment},
	platform::PlatformDescriptor,
};

fn url(value: &str) -> Url {
	Url::parse(value).expect("Mock URL should parse successfully.")
}

fn client() -> ClientId {
	ClientId::new("tool-client").expect("Client identifier should be valid.")
}

fn build_descriptor(server: &MockServer) -> PlatformDescriptor {
	PlatformDescriptor::builder(client())
		.token_endpoint(url(&server.url("/token")))
		.build()
		.expect("Platform descriptor should build successfully.")
}

fn assessment() -> Assessment {
	Assessment {
		id: AssessmentId::new("a1").expect("Assessment identifier should be valid."),
		short_identifier: "A1".into(),
		description: "Assignment 1".into(),
		max_mark: 100.0,
		kind: AssessmentKind::Assignment,
	}
}

fn deployment(server: &MockServer) -> Deployment {
	Deployment::new(
		client(),
		DeploymentId::new("deployment-1").expect("Deployment identifier should be valid."),
	)
	.with_service(ServiceType::AgsLineItem, url(&server.url("/lineitems")))
}

#[tokio::test]
async fn line_item_is_created_once_then_updated() {
	let server = MockServer::start_async().await;
	let (engine, store, _pause) = build_reqwest_test_sync(build_descriptor(&server), "secret");
	let line_item_url = server.url("/lineitems/7");
	let response = format!(
		"{{\"id\":\"{line_item_url}\",\"label\":\"Assignment 1\",\"scoreMaximum\":100}}"
	);
	let token = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.form_urlencoded_tuple("scope", LtiScope::AgsLineItem.as_str());
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"ags-token\",\"token_type\":\"bearer\"}");
		})
		.await;
	let create = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/lineitems")
				.header("authorization", "Bearer ags-token")
				.header("accept", LINE_ITEM_MEDIA_TYPE)
				.form_urlencoded_tuple("label", "Assignment 1")
				.form_urlencoded_tuple("resourceId", "A1")
				.form_urlencoded_tuple("scoreMaximum", "100");
			then.status(201).header("content-type", LINE_ITEM_MEDIA_TYPE).body(response.as_str());
		})
		.await;
	let update = server
		.mock_async(|when, then| {
			when.method(PUT).path("/lineitems/7").form_urlencoded_tuple("label", "Assignment 1");
			then.status(200).header("content-type", LINE_ITEM_MEDIA_TYPE).body(response.as_str());
		})
		.await;
	let deployment = deployment(&server);

	for _ in 0..2 {
		let line_item = engine
			.ensure_line_item(&deployment, &assessment())
			.await
			.expect("Line item sync should succeed.");

		assert_eq!(line_item.external_id.as_ref().map(Url::as_str), Some(line_item_url.as_str()));
	}

	assert_eq!(store.line_items().len(), 1);

	token.assert_calls_async(2).await;
	create.assert_calls_async(1).await;
	update.assert_calls_async(1).await;
}

#[tokio::test]
async fn deployment_without_line_item_service_fails_before_any_request() {
	let server = MockServer::start_async().await;
	let (engine, store, _pause) = build_reqwest_test_sync(build_descriptor(&server), "secret");
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(500);
		})
		.await;
	let bare = Deployment::new(
		client(),
		DeploymentId::new("deployment-2").expect("Deployment identifier should be valid."),
	);
	let err = engine
		.ensure_line_item(&bare, &assessment())
		.await
		.expect_err("Missing services should be reported.");

	assert!(matches!(err, Error::MissingService { service: ServiceType::AgsLineItem, .. }));
	assert!(store.line_items().is_empty());

	token.assert_calls_async(0).await;
}
