//! LTI Advantage vocabulary and the NRPS/AGS wire payloads.
//!
//! See <https://www.imsglobal.org/spec/lti/v1p3> for the full list of roles and claims; only
//! what the sync engines read or write is modeled here.

// crates.io
use time::format_description::well_known::Rfc3339;
// self
use crate::{
	_prelude::*,
	auth::{IdentifierError, LtiUserId},
};

/// Context role URI granted to students.
pub const LEARNER_ROLE: &str = "http://purl.imsglobal.org/vocab/lis/v2/membership#Learner";
/// System role URI the platform assigns to preview/test accounts.
pub const TEST_USER_ROLE: &str = "http://purl.imsglobal.org/vocab/lti/system/person#TestUser";

/// Media type of NRPS membership containers.
pub const MEMBERSHIP_CONTAINER_MEDIA_TYPE: &str =
	"application/vnd.ims.lti-nrps.v2.membershipcontainer+json";
/// Media type of AGS line items.
pub const LINE_ITEM_MEDIA_TYPE: &str = "application/vnd.ims.lis.v2.lineitem+json";
/// Media type of AGS result containers.
pub const RESULT_CONTAINER_MEDIA_TYPE: &str = "application/vnd.ims.lis.v2.resultcontainer+json";

/// Service capabilities a deployment can advertise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceType {
	/// Names and Role Provisioning Service membership endpoint.
	#[serde(rename = "namesrole")]
	NamesRole,
	/// Assignment and Grades Service line-item container endpoint.
	#[serde(rename = "agslineitem")]
	AgsLineItem,
}
impl ServiceType {
	/// Returns the stable label stored alongside service endpoints.
	pub const fn as_str(self) -> &'static str {
		match self {
			ServiceType::NamesRole => "namesrole",
			ServiceType::AgsLineItem => "agslineitem",
		}
	}
}
impl Display for ServiceType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Membership status reported by NRPS.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberStatus {
	/// Member currently takes part in the context.
	#[default]
	Active,
	/// Member is enrolled but suspended.
	Inactive,
	/// Member was removed (differences feeds only).
	Deleted,
	/// Status value this crate does not know about.
	#[serde(other)]
	Unknown,
}
impl MemberStatus {
	/// Returns `true` when the member should take part in roster reconciliation.
	pub fn is_active(self) -> bool {
		!matches!(self, MemberStatus::Inactive | MemberStatus::Deleted)
	}
}

/// One entry of an NRPS membership container.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Member {
	/// Membership status, `Active` when omitted.
	#[serde(default)]
	pub status: MemberStatus,
	/// Context and system role URIs.
	#[serde(default)]
	pub roles: Vec<String>,
	/// Institutional person identifier, preferred as the login handle.
	pub lis_person_sourcedid: Option<String>,
	/// Display name.
	pub name: Option<String>,
	/// Given name.
	pub given_name: Option<String>,
	/// Family name.
	pub family_name: Option<String>,
	/// Email address.
	pub email: Option<String>,
	/// Opaque LMS user identifier as sent by the platform; see [`Member::lti_user_id`].
	pub user_id: String,
}
impl Member {
	/// Returns `true` for active members that are not platform test accounts.
	pub fn is_eligible(&self) -> bool {
		self.status.is_active() && !self.roles.iter().any(|role| role == TEST_USER_ROLE)
	}

	/// Login handle used to match local identities.
	pub fn login_handle(&self) -> Option<&str> {
		self.lis_person_sourcedid.as_deref().or(self.name.as_deref())
	}

	/// Validated LMS user identifier.
	pub fn lti_user_id(&self) -> Result<LtiUserId, IdentifierError> {
		LtiUserId::new(self.user_id.as_str())
	}
}

/// NRPS membership container body.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MembershipContainer {
	/// Members on this page.
	#[serde(default)]
	pub members: Vec<Member>,
}

/// Line item fields sent when creating or updating a gradebook column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemPayload {
	/// Column label shown in the LMS gradebook.
	pub label: String,
	/// Tool-side identifier of the assessment.
	pub resource_id: String,
	/// Maximum achievable score.
	pub score_maximum: f64,
}
impl LineItemPayload {
	/// Flattens the payload into form fields.
	pub fn to_form(&self) -> Vec<(String, String)> {
		vec![
			("label".into(), self.label.clone()),
			("resourceId".into(), self.resource_id.clone()),
			("scoreMaximum".into(), self.score_maximum.to_string()),
		]
	}
}

/// Line item as returned by the LMS after a create or update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItemResponse {
	/// Line item URL, used as its identifier.
	pub id: String,
}

/// Result currently recorded by the LMS for one user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntry {
	/// Opaque LMS user identifier as sent by the platform.
	pub user_id: String,
	/// Recorded score, absent when the user has no grade yet.
	#[serde(default)]
	pub result_score: Option<f64>,
}

/// Progress marker of the learner's activity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityProgress {
	/// The learner finished the activity.
	Completed,
}
impl ActivityProgress {
	/// Wire label.
	pub const fn as_str(self) -> &'static str {
		match self {
			ActivityProgress::Completed => "Completed",
		}
	}
}

/// Progress marker of the grading process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradingProgress {
	/// The score is final.
	FullyGraded,
}
impl GradingProgress {
	/// Wire label.
	pub const fn as_str(self) -> &'static str {
		match self {
			GradingProgress::FullyGraded => "FullyGraded",
		}
	}
}

/// Score publication sent to `<line item>/scores`.
#[derive(Clone, Debug, PartialEq)]
pub struct ScorePayload {
	/// Time the score was produced.
	pub timestamp: OffsetDateTime,
	/// Score earned by the user.
	pub score_given: f64,
	/// Maximum achievable score.
	pub score_maximum: f64,
	/// Activity progress marker.
	pub activity_progress: ActivityProgress,
	/// Grading progress marker.
	pub grading_progress: GradingProgress,
	/// Opaque LMS user identifier.
	pub user_id: LtiUserId,
}
impl ScorePayload {
	/// Builds a completed, fully graded score for `user_id`.
	pub fn completed(user_id: LtiUserId, score_given: f64, score_maximum: f64) -> Self {
		Self {
			timestamp: OffsetDateTime::now_utc(),
			score_given,
			score_maximum,
			activity_progress: ActivityProgress::Completed,
			grading_progress: GradingProgress::FullyGraded,
			user_id,
		}
	}

	/// Flattens the payload into form fields with an RFC 3339 timestamp.
	pub fn to_form(&self) -> Result<Vec<(String, String)>, time::error::Format> {
		Ok(vec![
			("timestamp".into(), self.timestamp.format(&Rfc3339)?),
			("scoreGiven".into(), self.score_given.to_string()),
			("scoreMaximum".into(), self.score_maximum.to_string()),
			("activityProgress".into(), self.activity_progress.as_str().into()),
			("gradingProgress".into(), self.grading_progress.as_str().into()),
			("userId".into(), self.user_id.to_string()),
		])
	}
}
