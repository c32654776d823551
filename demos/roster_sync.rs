//! Runs a roster pass and a grade pass against an in-process mock LMS using the default
//! reqwest transport and the in-memory store.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use lti_sync::{
	auth::{AssessmentId, ClientId, CourseId, DeploymentId},
	broker::TokenBroker,
	http::ReqwestHttpClient,
	lti::{LEARNER_ROLE, ServiceType},
	model::{Assessment, AssessmentKind, Deployment, GradeEntryMark, ReleasedMarks},
	oauth::ReqwestTransportErrorMapper,
	platform::PlatformDescriptor,
	reqwest::Client,
	store::{MarkSource, MemoryStore, SyncStore},
	sync::LtiSync,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let line_item_url = server.url("/lineitems/1");

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/nrps").query_param("role", LEARNER_ROLE);
			then.status(200).body(format!(
				r#"{{"members":[{{"roles":["{LEARNER_ROLE}"],"lis_person_sourcedid":"c5lovela","given_name":"Ada","family_name":"Lovelace","user_id":"lms-ada"}}]}}"#
			));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/lineitems");
			then.status(200).body(format!("{{\"id\":\"{line_item_url}\"}}"));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/lineitems/1/results");
			then.status(200).body("[]");
		})
		.await;

	let scores = server
		.mock_async(|when, then| {
			when.method(POST).path("/lineitems/1/scores");
			then.status(200);
		})
		.await;
	let client = ClientId::new("demo-client")?;
	let descriptor = PlatformDescriptor::builder(client.clone())
		.token_endpoint(Url::parse(&server.url("/token"))?)
		.build()?;
	let http_client = ReqwestHttpClient::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let broker = <TokenBroker<ReqwestHttpClient, ReqwestTransportErrorMapper>>::with_http_client(
		descriptor,
		http_client,
		Arc::new(ReqwestTransportErrorMapper),
	)
	.with_client_secret("super-secret");
	let backend = Arc::new(MemoryStore::default());
	let store: Arc<dyn SyncStore> = backend.clone();
	let marks: Arc<dyn MarkSource> = backend.clone();
	let engine = LtiSync::from_broker(broker, store, marks);
	let course = CourseId::new("csc108")?;
	let deployment = Deployment::new(client, DeploymentId::new("demo-deployment")?)
		.with_course(course.clone())
		.with_service(ServiceType::NamesRole, Url::parse(&server.url("/nrps"))?)
		.with_service(ServiceType::AgsLineItem, Url::parse(&server.url("/lineitems"))?);
	let warnings = engine.sync_roster(&deployment, &course, true, true).await?;

	for warning in &warnings {
		println!("Roster warning: {warning}.");
	}

	let assessment = Assessment {
		id: AssessmentId::new("quiz-1")?,
		short_identifier: "Q1".into(),
		description: "Quiz 1".into(),
		max_mark: 10.0,
		kind: AssessmentKind::GradeEntryForm,
	};

	for user in backend.users() {
		backend.set_released_marks(
			assessment.id.clone(),
			ReleasedMarks::GradeEntryForm(vec![GradeEntryMark { user: user.id, total_grade: 8.5 }]),
		);
	}

	let report = engine.sync_grades(&deployment, &assessment).await?;

	println!(
		"Grades synchronized: {} pushed, {} unchanged, {} unlinked.",
		report.pushed, report.unchanged, report.unlinked
	);

	scores.assert_async().await;

	Ok(())
}
