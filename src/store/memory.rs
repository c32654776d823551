//! Thread-safe in-memory [`SyncStore`] + [`MarkSource`] implementation for local development
//! and tests.

// std
use std::collections::HashSet;
// self
use crate::{
	_prelude::*,
	auth::{AssessmentId, ClientId, CourseId, UserId},
	model::{
		Assessment, CourseRole, CourseRoleKind, DeploymentKey, ExternalUserLink, LineItem, NewUser,
		ReleasedMarks, User,
	},
	store::{MarkSource, StoreError, StoreFuture, SyncStore},
};

type SharedState = Arc<RwLock<MemoryState>>;

#[derive(Debug, Default)]
struct MemoryState {
	users: BTreeMap<String, User>,
	roles: HashMap<(UserId, CourseId), CourseRole>,
	links: HashMap<(UserId, ClientId), ExternalUserLink>,
	line_items: HashMap<(DeploymentKey, AssessmentId), LineItem>,
	marks: HashMap<AssessmentId, ReleasedMarks>,
	rejected_user_names: HashSet<String>,
	next_user: u64,
}

/// Storage backend that keeps every record in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(SharedState);
impl MemoryStore {
	/// Seeds an identity and returns it.
	pub fn insert_user(&self, user_name: impl Into<String>) -> Result<User, StoreError> {
		Self::create_user_now(
			self.0.clone(),
			NewUser {
				user_name: user_name.into(),
				first_name: None,
				last_name: None,
				display_name: None,
				email: None,
			},
		)
	}

	/// Seeds a course role.
	pub fn insert_course_role(&self, role: CourseRole) {
		self.0.write().roles.insert((role.user.clone(), role.course.clone()), role);
	}

	/// Seeds an external user link.
	pub fn insert_external_link(&self, link: ExternalUserLink) {
		Self::upsert_link_now(self.0.clone(), link);
	}

	/// Seeds a line item record.
	pub fn insert_line_item(&self, line_item: LineItem) {
		Self::save_line_item_now(self.0.clone(), line_item);
	}

	/// Replaces the released marks of `assessment`.
	pub fn set_released_marks(&self, assessment: AssessmentId, marks: ReleasedMarks) {
		self.0.write().marks.insert(assessment, marks);
	}

	/// Makes every later attempt to create `user_name` fail validation.
	pub fn reject_user_name(&self, user_name: impl Into<String>) {
		self.0.write().rejected_user_names.insert(user_name.into());
	}

	/// Snapshot of all identities ordered by login handle.
	pub fn users(&self) -> Vec<User> {
		self.0.read().users.values().cloned().collect()
	}

	/// Snapshot of all course roles.
	pub fn course_roles(&self) -> Vec<CourseRole> {
		self.0.read().roles.values().cloned().collect()
	}

	/// Snapshot of all external user links.
	pub fn external_links(&self) -> Vec<ExternalUserLink> {
		self.0.read().links.values().cloned().collect()
	}

	/// Snapshot of all line items.
	pub fn line_items(&self) -> Vec<LineItem> {
		self.0.read().line_items.values().cloned().collect()
	}

	fn create_user_now(state: SharedState, user: NewUser) -> Result<User, StoreError> {
		let mut guard = state.write();

		if guard.users.contains_key(&user.user_name) {
			return Err(StoreError::Rejected {
				message: format!("user name `{}` is already taken", user.user_name),
			});
		}

		guard.next_user += 1;

		let id = UserId::new(format!("user-{}", guard.next_user))
			.map_err(|e| StoreError::Backend { message: e.to_string() })?;
		let created = User {
			id,
			user_name: user.user_name,
			first_name: user.first_name,
			last_name: user.last_name,
			display_name: user.display_name,
			email: user.email,
		};

		guard.users.insert(created.user_name.clone(), created.clone());

		Ok(created)
	}

	fn upsert_link_now(state: SharedState, link: ExternalUserLink) {
		state.write().links.insert((link.user.clone(), link.client.clone()), link);
	}

	fn save_line_item_now(state: SharedState, line_item: LineItem) {
		state
			.write()
			.line_items
			.insert((line_item.deployment.clone(), line_item.assessment.clone()), line_item);
	}
}
impl SyncStore for MemoryStore {
	fn find_user<'a>(&'a self, user_name: &'a str) -> StoreFuture<'a, Option<User>> {
		let state = self.0.clone();

		Box::pin(async move { Ok(state.read().users.get(user_name).cloned()) })
	}

	fn create_user(&self, user: NewUser) -> StoreFuture<'_, User> {
		let state = self.0.clone();

		Box::pin(async move {
			if user.user_name.trim().is_empty() {
				return Err(StoreError::Rejected { message: "user name cannot be blank".into() });
			}
			if state.read().rejected_user_names.contains(&user.user_name) {
				return Err(StoreError::Rejected {
					message: format!("user name `{}` is not allowed", user.user_name),
				});
			}

			Self::create_user_now(state, user)
		})
	}

	fn find_course_role<'a>(
		&'a self,
		user: &'a UserId,
		course: &'a CourseId,
	) -> StoreFuture<'a, Option<CourseRole>> {
		let state = self.0.clone();
		let key = (user.to_owned(), course.to_owned());

		Box::pin(async move { Ok(state.read().roles.get(&key).cloned()) })
	}

	fn create_learner_role<'a>(
		&'a self,
		user: &'a UserId,
		course: &'a CourseId,
	) -> StoreFuture<'a, CourseRole> {
		let state = self.0.clone();
		let role = CourseRole {
			user: user.to_owned(),
			course: course.to_owned(),
			kind: CourseRoleKind::Learner,
		};

		Box::pin(async move {
			let mut guard = state.write();
			let key = (role.user.clone(), role.course.clone());

			if guard.roles.contains_key(&key) {
				return Err(StoreError::Rejected {
					message: format!("user `{}` already has a role in `{}`", role.user, role.course),
				});
			}

			guard.roles.insert(key, role.clone());

			Ok(role)
		})
	}

	fn find_external_link<'a>(
		&'a self,
		user: &'a UserId,
		client: &'a ClientId,
	) -> StoreFuture<'a, Option<ExternalUserLink>> {
		let state = self.0.clone();
		let key = (user.to_owned(), client.to_owned());

		Box::pin(async move { Ok(state.read().links.get(&key).cloned()) })
	}

	fn upsert_external_link(&self, link: ExternalUserLink) -> StoreFuture<'_, ()> {
		let state = self.0.clone();

		Box::pin(async move {
			Self::upsert_link_now(state, link);

			Ok(())
		})
	}

	fn find_line_item<'a>(
		&'a self,
		deployment: &'a DeploymentKey,
		assessment: &'a AssessmentId,
	) -> StoreFuture<'a, Option<LineItem>> {
		let state = self.0.clone();
		let key = (deployment.to_owned(), assessment.to_owned());

		Box::pin(async move { Ok(state.read().line_items.get(&key).cloned()) })
	}

	fn save_line_item(&self, line_item: LineItem) -> StoreFuture<'_, ()> {
		let state = self.0.clone();

		Box::pin(async move {
			Self::save_line_item_now(state, line_item);

			Ok(())
		})
	}
}
impl MarkSource for MemoryStore {
	fn released_marks<'a>(
		&'a self,
		assessment: &'a Assessment,
	) -> StoreFuture<'a, ReleasedMarks> {
		let state = self.0.clone();

		Box::pin(async move {
			Ok(state
				.read()
				.marks
				.get(&assessment.id)
				.cloned()
				.unwrap_or_else(|| ReleasedMarks::empty(assessment.kind)))
		})
	}
}
