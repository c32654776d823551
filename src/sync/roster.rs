// self
use crate::{
	_prelude::*,
	auth::{AccessToken, CourseId, LtiScope, LtiUserId, ScopeSet, UserId},
	dispatch,
	http::{ServiceHttpClient, ServiceRequest},
	lti::{LEARNER_ROLE, MEMBERSHIP_CONTAINER_MEDIA_TYPE, Member, MembershipContainer, ServiceType},
	model::{CourseRole, Deployment, ExternalUserLink, NewUser},
	obs::{self, SyncKind, sync_event},
	store::StoreError,
	sync::LtiSync,
};

/// Per-member problem collected during a roster pass; the pass itself keeps going.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RosterWarning {
	/// No local identity matches the member and user creation was not requested.
	UserNotFound {
		/// Login handle that was looked up.
		user_name: String,
	},
	/// The host refused to create an identity for the member.
	UserNotCreated {
		/// Login handle of the rejected identity.
		user_name: String,
		/// Host-supplied rejection reason.
		reason: String,
	},
	/// The member carries neither a sourced id nor a name to match on.
	MissingLoginHandle {
		/// Opaque LMS user identifier of the member.
		lti_user_id: LtiUserId,
	},
	/// The member's LMS user identifier cannot be stored as a link.
	InvalidLtiUserId {
		/// Identifier exactly as the LMS sent it.
		user_id: String,
		/// Validation failure.
		reason: String,
	},
}
impl Display for RosterWarning {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			RosterWarning::UserNotFound { user_name } => write!(f, "user `{user_name}` not found"),
			RosterWarning::UserNotCreated { user_name, reason } =>
				write!(f, "user `{user_name}` could not be created: {reason}"),
			RosterWarning::MissingLoginHandle { lti_user_id } =>
				write!(f, "LMS user `{lti_user_id}` has no login handle"),
			RosterWarning::InvalidLtiUserId { user_id, reason } =>
				write!(f, "LMS user id `{user_id}` is unusable: {reason}"),
		}
	}
}

impl<H> LtiSync<H>
where
	H: ?Sized + ServiceHttpClient,
{
	/// Pulls the learner roster of `deployment` and reconciles it into `course`.
	///
	/// Inactive, deleted, and test-user members are ignored. When no eligible member remains
	/// the pass fails with [`Error::NoMembersFound`] before any local record is touched.
	/// Otherwise every member is matched by login handle, optionally created and enrolled, and
	/// linked to its LMS identifier under the deployment's client.
	pub async fn sync_roster(
		&self,
		deployment: &Deployment,
		course: &CourseId,
		create_users: bool,
		create_roles: bool,
	) -> Result<Vec<RosterWarning>> {
		obs::observe(SyncKind::Roster, "sync_roster", async move {
			deployment.ensure_client(&self.client)?;

			let endpoint = deployment.require_service(ServiceType::NamesRole)?;
			let scope = ScopeSet::from(LtiScope::NamesRole);
			let token = self.tokens.acquire(&scope).await?;
			let eligible = self
				.fetch_members(endpoint, &token, &scope)
				.await?
				.into_iter()
				.filter(Member::is_eligible)
				.collect::<Vec<_>>();

			if eligible.is_empty() {
				return Err(Error::NoMembersFound);
			}

			let mut warnings = Vec::new();

			for member in eligible {
				if let Some(warning) =
					self.reconcile_member(deployment, course, member, create_users, create_roles).await?
				{
					sync_event!(warn, course = %course, warning = %warning, "roster member skipped");

					warnings.push(warning);
				}
			}

			Ok(warnings)
		})
		.await
	}

	async fn fetch_members(
		&self,
		endpoint: &Url,
		token: &AccessToken,
		scope: &ScopeSet,
	) -> Result<Vec<Member>> {
		let mut uri = endpoint.clone();

		uri.query_pairs_mut().append_pair("role", LEARNER_ROLE);

		let mut members = Vec::new();
		let mut pages = 0;

		loop {
			pages += 1;

			let request = ServiceRequest::get(uri).with_accept(MEMBERSHIP_CONTAINER_MEDIA_TYPE);
			let response = self.dispatcher.dispatch(&request, token, scope).await?;
			let page: MembershipContainer = dispatch::decode_json(&request.uri, &response)?;

			members.extend(page.members);

			let Some(next) = response.next_page() else {
				break;
			};

			if next.origin() != endpoint.origin() {
				sync_event!(
					warn,
					next = %next,
					"NRPS next page leaves the service origin, remaining pages ignored"
				);

				break;
			}
			if pages >= self.config.roster_page_limit {
				sync_event!(
					warn,
					limit = self.config.roster_page_limit,
					"NRPS page limit reached, remaining pages ignored"
				);

				break;
			}

			uri = next;
		}

		Ok(members)
	}

	async fn reconcile_member(
		&self,
		deployment: &Deployment,
		course: &CourseId,
		member: Member,
		create_users: bool,
		create_roles: bool,
	) -> Result<Option<RosterWarning>> {
		let lti_user_id = match member.lti_user_id() {
			Ok(lti_user_id) => lti_user_id,
			Err(e) =>
				return Ok(Some(RosterWarning::InvalidLtiUserId {
					user_id: member.user_id,
					reason: e.to_string(),
				})),
		};
		let Some(user_name) = member.login_handle().map(ToOwned::to_owned) else {
			return Ok(Some(RosterWarning::MissingLoginHandle { lti_user_id }));
		};
		let existing = self.store.find_user(&user_name).await?;
		let user = match existing {
			Some(user) => user,
			None if !create_users => return Ok(Some(RosterWarning::UserNotFound { user_name })),
			None => {
				let new_user = NewUser {
					user_name: user_name.clone(),
					first_name: member.given_name.clone(),
					last_name: member.family_name.clone(),
					display_name: member.name.clone(),
					email: member.email.clone(),
				};

				match self.store.create_user(new_user).await {
					Ok(user) => user,
					Err(StoreError::Rejected { message }) =>
						return Ok(Some(RosterWarning::UserNotCreated { user_name, reason: message })),
					Err(e) => return Err(e.into()),
				}
			},
		};
		let role = match self.store.find_course_role(&user.id, course).await? {
			Some(role) => Some(role),
			None if create_roles => self.enroll_learner(&user.id, course).await?,
			None => None,
		};

		if role.is_none() {
			sync_event!(debug, user = %user.user_name, course = %course, "member has no course role");

			return Ok(None);
		}

		self.store
			.upsert_external_link(ExternalUserLink {
				user: user.id,
				client: deployment.client.clone(),
				lti_user_id,
			})
			.await?;

		Ok(None)
	}

	async fn enroll_learner(
		&self,
		user: &UserId,
		course: &CourseId,
	) -> Result<Option<CourseRole>> {
		match self.store.create_learner_role(user, course).await {
			Ok(role) => Ok(Some(role)),
			Err(StoreError::Rejected { message }) => {
				sync_event!(debug, user = %user, course = %course, reason = %message, "learner role rejected");

				Ok(None)
			},
			Err(e) => Err(e.into()),
		}
	}
}
