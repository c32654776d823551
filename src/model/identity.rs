// self
use crate::{
	_prelude::*,
	auth::{ClientId, CourseId, LtiUserId, UserId},
};

/// Local user identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
	/// Local identifier.
	pub id: UserId,
	/// Login handle, unique across the host application.
	pub user_name: String,
	/// Given name.
	pub first_name: Option<String>,
	/// Family name.
	pub last_name: Option<String>,
	/// Display name.
	pub display_name: Option<String>,
	/// Email address.
	pub email: Option<String>,
}

/// Attributes of an identity the roster sync asks the host to create.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
	/// Login handle.
	pub user_name: String,
	/// Given name.
	pub first_name: Option<String>,
	/// Family name.
	pub last_name: Option<String>,
	/// Display name.
	pub display_name: Option<String>,
	/// Email address.
	pub email: Option<String>,
}

/// Role a user holds in a course.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseRoleKind {
	/// Student enrolled in the course.
	Learner,
	/// Teaching assistant.
	Grader,
	/// Course instructor.
	Instructor,
}

/// A user's membership in a course.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRole {
	/// Member.
	pub user: UserId,
	/// Course.
	pub course: CourseId,
	/// Role held.
	pub kind: CourseRoleKind,
}

/// Durable mapping from a local identity to the LMS identifier issued under one client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalUserLink {
	/// Local identity.
	pub user: UserId,
	/// Client whose identifier space `lti_user_id` belongs to.
	pub client: ClientId,
	/// Opaque LMS identifier.
	pub lti_user_id: LtiUserId,
}
