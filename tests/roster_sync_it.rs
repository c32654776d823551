// crates.io
use httpmock::prelude::*;
// self
use lti_sync::{
	_preludet::*,
	auth::{ClientId, CourseId, DeploymentId, LtiScope, LtiUserId},
	config::SyncConfig,
	lti::{LEARNER_ROLE, MEMBERSHIP_CONTAINER_MEDIA_TYPE, ServiceType, TEST_USER_ROLE},
	model::{CourseRoleKind, Deployment},
	platform::PlatformDescriptor,
	sync::RosterWarning,
};

const CLIENT_ID: &str = "tool-client";

fn url(value: &str) -> Url {
	Url::parse(value).expect("Mock URL should parse successfully.")
}

fn build_descriptor(server: &MockServer) -> PlatformDescriptor {
	PlatformDescriptor::builder(client())
		.token_endpoint(url(&server.url("/token")))
		.build()
		.expect("Platform descriptor should build successfully.")
}

fn client() -> ClientId {
	ClientId::new(CLIENT_ID).expect("Client identifier should be valid.")
}

fn course() -> CourseId {
	CourseId::new("csc108").expect("Course identifier should be valid.")
}

fn build_deployment(server: &MockServer) -> Deployment {
	Deployment::new(
		client(),
		DeploymentId::new("deployment-1").expect("Deployment identifier should be valid."),
	)
	.with_course(course())
	.with_service(ServiceType::NamesRole, url(&server.url("/nrps")))
}

async fn mock_token(server: &MockServer) {
	server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.form_urlencoded_tuple("scope", LtiScope::NamesRole.as_str());
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"roster-token\",\"token_type\":\"bearer\"}");
		})
		.await;
}

async fn mock_members<'a>(server: &'a MockServer, members: &str) -> httpmock::Mock<'a> {
	let body = format!("{{\"id\":\"{}\",\"members\":[{members}]}}", server.url("/nrps"));

	server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/nrps")
				.query_param("role", LEARNER_ROLE)
				.header("accept", MEMBERSHIP_CONTAINER_MEDIA_TYPE)
				.header("authorization", "Bearer roster-token");
			then.status(200).header("content-type", MEMBERSHIP_CONTAINER_MEDIA_TYPE).body(body);
		})
		.await
}

const ADA: &str = r#"{"status":"Active","roles":["http://purl.imsglobal.org/vocab/lis/v2/membership#Learner"],"lis_person_sourcedid":"c5lovela","name":"Ada Lovelace","given_name":"Ada","family_name":"Lovelace","email":"ada@example.com","user_id":"lms-ada"}"#;
const GRACE_INACTIVE: &str = r#"{"status":"Inactive","roles":["http://purl.imsglobal.org/vocab/lis/v2/membership#Learner"],"lis_person_sourcedid":"c5hopper","name":"Grace Hopper","user_id":"lms-grace"}"#;

#[tokio::test]
async fn new_active_learner_is_created_enrolled_and_linked() {
	let server = MockServer::start_async().await;
	let (engine, store, _pause) = build_reqwest_test_sync(build_descriptor(&server), "secret");

	mock_token(&server).await;

	let members = mock_members(&server, &format!("{GRACE_INACTIVE},{ADA}")).await;
	let warnings = engine
		.sync_roster(&build_deployment(&server), &course(), true, true)
		.await
		.expect("Roster sync should succeed.");

	assert!(warnings.is_empty());

	let users = store.users();

	assert_eq!(users.len(), 1);
	assert_eq!(users[0].user_name, "c5lovela");
	assert_eq!(users[0].first_name.as_deref(), Some("Ada"));
	assert_eq!(users[0].display_name.as_deref(), Some("Ada Lovelace"));

	let roles = store.course_roles();

	assert_eq!(roles.len(), 1);
	assert_eq!(roles[0].kind, CourseRoleKind::Learner);

	let links = store.external_links();

	assert_eq!(links.len(), 1);
	assert_eq!(links[0].lti_user_id.as_ref(), "lms-ada");
	assert_eq!(links[0].client, client());

	members.assert_async().await;
}

#[tokio::test]
async fn existing_user_without_role_is_left_alone_when_roles_are_not_created() {
	let server = MockServer::start_async().await;
	let (engine, store, _pause) = build_reqwest_test_sync(build_descriptor(&server), "secret");

	store.insert_user("c5lovela").expect("Seeding a user should succeed.");
	mock_token(&server).await;
	mock_members(&server, ADA).await;

	let warnings = engine
		.sync_roster(&build_deployment(&server), &course(), false, false)
		.await
		.expect("Roster sync should succeed.");

	assert!(warnings.is_empty());
	assert!(store.course_roles().is_empty());
	assert!(store.external_links().is_empty());
	assert_eq!(store.users().len(), 1);
}

#[tokio::test]
async fn unknown_user_is_reported_when_users_are_not_created() {
	let server = MockServer::start_async().await;
	let (engine, store, _pause) = build_reqwest_test_sync(build_descriptor(&server), "secret");

	mock_token(&server).await;
	mock_members(&server, ADA).await;

	let warnings = engine
		.sync_roster(&build_deployment(&server), &course(), false, true)
		.await
		.expect("Roster sync should succeed.");

	assert_eq!(warnings, vec![RosterWarning::UserNotFound { user_name: "c5lovela".into() }]);
	assert!(store.users().is_empty());
}

#[tokio::test]
async fn rejected_identity_is_reported_and_skipped() {
	let server = MockServer::start_async().await;
	let (engine, store, _pause) = build_reqwest_test_sync(build_descriptor(&server), "secret");

	store.reject_user_name("c5lovela");
	mock_token(&server).await;
	mock_members(&server, ADA).await;

	let warnings = engine
		.sync_roster(&build_deployment(&server), &course(), true, true)
		.await
		.expect("Roster sync should succeed.");

	assert!(matches!(
		warnings.as_slice(),
		[RosterWarning::UserNotCreated { user_name, .. }] if user_name == "c5lovela"
	));
	assert!(store.course_roles().is_empty());
	assert!(store.external_links().is_empty());
}

#[tokio::test]
async fn roster_without_eligible_members_touches_nothing() {
	let server = MockServer::start_async().await;
	let (engine, store, _pause) = build_reqwest_test_sync(build_descriptor(&server), "secret");
	let tester = format!(
		r#"{{"roles":["{TEST_USER_ROLE}"],"lis_person_sourcedid":"preview","name":"Test Student","user_id":"lms-test"}}"#
	);

	mock_token(&server).await;
	mock_members(&server, &format!("{GRACE_INACTIVE},{tester}")).await;

	let err = engine
		.sync_roster(&build_deployment(&server), &course(), true, true)
		.await
		.expect_err("An empty eligible roster should fail.");

	assert!(matches!(err, Error::NoMembersFound));
	assert!(store.users().is_empty());
	assert!(store.course_roles().is_empty());
	assert!(store.external_links().is_empty());
}

#[tokio::test]
async fn repeated_passes_never_duplicate_records() {
	let server = MockServer::start_async().await;
	let (engine, store, _pause) = build_reqwest_test_sync(build_descriptor(&server), "secret");
	let deployment = build_deployment(&server);

	mock_token(&server).await;

	let members = mock_members(&server, ADA).await;

	for _ in 0..2 {
		engine
			.sync_roster(&deployment, &course(), true, true)
			.await
			.expect("Roster sync should succeed.");
	}

	assert_eq!(store.users().len(), 1);
	assert_eq!(store.course_roles().len(), 1);
	assert_eq!(store.external_links().len(), 1);

	members.assert_calls_async(2).await;
}

#[tokio::test]
async fn member_pages_are_followed_through_link_headers() {
	let server = MockServer::start_async().await;
	let (engine, store, _pause) = build_reqwest_test_sync(build_descriptor(&server), "secret");
	let next = format!("<{}>; rel=\"next\"", server.url("/nrps/page/2"));

	mock_token(&server).await;

	let first = server
		.mock_async(|when, then| {
			when.method(GET).path("/nrps").query_param("role", LEARNER_ROLE);
			then.status(200).header("link", next.as_str()).body(format!("{{\"members\":[{ADA}]}}"));
		})
		.await;
	let second = server
		.mock_async(|when, then| {
			when.method(GET).path("/nrps/page/2");
			then.status(200).body(format!(
				r#"{{"members":[{{"roles":["{LEARNER_ROLE}"],"name":"c5turing","user_id":"lms-alan"}}]}}"#
			));
		})
		.await;
	let warnings = engine
		.sync_roster(&build_deployment(&server), &course(), true, true)
		.await
		.expect("Roster sync should succeed.");

	assert!(warnings.is_empty());
	assert_eq!(
		store.users().into_iter().map(|user| user.user_name).collect::<Vec<_>>(),
		vec!["c5lovela", "c5turing"]
	);

	first.assert_async().await;
	second.assert_async().await;
}

#[tokio::test]
async fn deployments_of_other_clients_are_refused() {
	let server = MockServer::start_async().await;
	let (engine, _store, _pause) = build_reqwest_test_sync(build_descriptor(&server), "secret");
	let foreign = Deployment::new(
		ClientId::new("other-client").expect("Client identifier should be valid."),
		DeploymentId::new("deployment-9").expect("Deployment identifier should be valid."),
	)
	.with_service(ServiceType::NamesRole, url(&server.url("/nrps")));
	let err = engine
		.sync_roster(&foreign, &course(), true, true)
		.await
		.expect_err("Foreign deployments should be refused.");

	assert!(matches!(
		err,
		Error::Config(lti_sync::error::ConfigError::ClientMismatch { .. })
	));
}

#[tokio::test]
async fn malformed_user_ids_are_reported_per_member() {
	let server = MockServer::start_async().await;
	let (engine, store, _pause) = build_reqwest_test_sync(build_descriptor(&server), "secret");
	let legacy_inactive = format!(
		r#"{{"status":"Inactive","roles":["{LEARNER_ROLE}"],"lis_person_sourcedid":"c5legacy","user_id":"legacy id 42"}}"#
	);
	let legacy_active = format!(
		r#"{{"roles":["{LEARNER_ROLE}"],"lis_person_sourcedid":"c5spaced","user_id":"spaced id 7"}}"#
	);

	mock_token(&server).await;
	mock_members(&server, &format!("{ADA},{legacy_inactive},{legacy_active}")).await;

	let warnings = engine
		.sync_roster(&build_deployment(&server), &course(), true, true)
		.await
		.expect("Malformed member ids should not abort the pass.");

	assert!(matches!(
		warnings.as_slice(),
		[RosterWarning::InvalidLtiUserId { user_id, .. }] if user_id == "spaced id 7"
	));
	assert_eq!(
		store.users().into_iter().map(|user| user.user_name).collect::<Vec<_>>(),
		vec!["c5lovela"]
	);
	assert_eq!(store.external_links().len(), 1);
}

#[tokio::test]
async fn members_without_login_handle_are_reported() {
	let server = MockServer::start_async().await;
	let (engine, store, _pause) = build_reqwest_test_sync(build_descriptor(&server), "secret");
	let anonymous = format!(r#"{{"roles":["{LEARNER_ROLE}"],"user_id":"lms-anon"}}"#);

	mock_token(&server).await;
	mock_members(&server, &anonymous).await;

	let warnings = engine
		.sync_roster(&build_deployment(&server), &course(), true, true)
		.await
		.expect("A member without login handle still counts as eligible.");

	assert_eq!(
		warnings,
		vec![RosterWarning::MissingLoginHandle {
			lti_user_id: LtiUserId::new("lms-anon").expect("LTI user id should be valid."),
		}]
	);
	assert!(store.users().is_empty());
	assert!(store.external_links().is_empty());
}

/// Serves `/nrps`, `/nrps/page/2` and `/nrps/page/3`, each linking to the next.
async fn mock_page_chain(server: &MockServer) -> Vec<httpmock::Mock<'_>> {
	let mut mocks = Vec::new();

	for (page, name) in [(1, "c5page1"), (2, "c5page2"), (3, "c5page3")] {
		let path = if page == 1 { "/nrps".to_owned() } else { format!("/nrps/page/{page}") };
		let next = format!("<{}>; rel=\"next\"", server.url(format!("/nrps/page/{}", page + 1)));
		let body = format!(
			r#"{{"members":[{{"roles":["{LEARNER_ROLE}"],"name":"{name}","user_id":"lms-{name}"}}]}}"#
		);

		mocks.push(
			server
				.mock_async(|when, then| {
					when.method(GET).path(path.as_str());
					then.status(200).header("link", next.as_str()).body(body);
				})
				.await,
		);
	}

	mocks
}

#[tokio::test]
async fn page_limit_bounds_the_pages_followed() {
	let server = MockServer::start_async().await;
	let (engine, store, _pause) = build_reqwest_test_sync(build_descriptor(&server), "secret");
	let engine = engine.with_config(SyncConfig::default().with_roster_page_limit(2));

	mock_token(&server).await;

	let pages = mock_page_chain(&server).await;

	engine
		.sync_roster(&build_deployment(&server), &course(), true, true)
		.await
		.expect("Roster sync should succeed.");

	assert_eq!(
		store.users().into_iter().map(|user| user.user_name).collect::<Vec<_>>(),
		vec!["c5page1", "c5page2"]
	);

	pages[0].assert_calls_async(1).await;
	pages[1].assert_calls_async(1).await;
	pages[2].assert_calls_async(0).await;
}

#[tokio::test]
async fn zero_page_limit_still_fetches_the_first_page() {
	let server = MockServer::start_async().await;
	let (engine, store, _pause) = build_reqwest_test_sync(build_descriptor(&server), "secret");
	let engine = engine.with_config(SyncConfig::default().with_roster_page_limit(0));

	mock_token(&server).await;

	let pages = mock_page_chain(&server).await;

	engine
		.sync_roster(&build_deployment(&server), &course(), true, true)
		.await
		.expect("The first page should always be fetched.");

	assert_eq!(store.users().len(), 1);

	pages[0].assert_calls_async(1).await;
	pages[1].assert_calls_async(0).await;
}

#[tokio::test]
async fn next_links_to_other_origins_are_not_followed() {
	let server = MockServer::start_async().await;
	let foreign = MockServer::start_async().await;
	let (engine, store, _pause) = build_reqwest_test_sync(build_descriptor(&server), "secret");
	let next = format!("<{}>; rel=\"next\"", foreign.url("/steal"));

	mock_token(&server).await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/nrps");
			then.status(200).header("link", next.as_str()).body(format!("{{\"members\":[{ADA}]}}"));
		})
		.await;

	let stolen = foreign
		.mock_async(|when, then| {
			when.path("/steal");
			then.status(200).body("{\"members\":[]}");
		})
		.await;

	engine
		.sync_roster(&build_deployment(&server), &course(), true, true)
		.await
		.expect("Roster sync should succeed with the first page.");

	assert_eq!(store.users().len(), 1);

	stolen.assert_calls_async(0).await;
}
