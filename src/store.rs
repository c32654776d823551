//! Collaborator contracts for the host application's records, plus an in-memory backend.
//!
//! The engines never own persistence: identities, course roles, external user links, and line
//! items live in the host's database and are reached through [`SyncStore`]; released marks
//! come from [`MarkSource`]. Both traits hand back boxed futures so hosts can implement them
//! over any async database driver.

pub mod memory;

pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{AssessmentId, ClientId, CourseId, UserId},
	model::{
		Assessment, CourseRole, DeploymentKey, ExternalUserLink, LineItem, NewUser, ReleasedMarks,
		User,
	},
};

/// Boxed future returned by collaborator operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for the records the sync engines reconcile.
///
/// Upserts are last-write-wins; hosts serialize sync passes per deployment.
pub trait SyncStore
where
	Self: Send + Sync,
{
	/// Looks up a local identity by login handle.
	fn find_user<'a>(&'a self, user_name: &'a str) -> StoreFuture<'a, Option<User>>;

	/// Creates a local identity.
	fn create_user(&self, user: NewUser) -> StoreFuture<'_, User>;

	/// Looks up the role `user` holds in `course`.
	fn find_course_role<'a>(
		&'a self,
		user: &'a UserId,
		course: &'a CourseId,
	) -> StoreFuture<'a, Option<CourseRole>>;

	/// Enrolls `user` in `course` as a learner.
	fn create_learner_role<'a>(
		&'a self,
		user: &'a UserId,
		course: &'a CourseId,
	) -> StoreFuture<'a, CourseRole>;

	/// Looks up the external link of `user` under `client`.
	fn find_external_link<'a>(
		&'a self,
		user: &'a UserId,
		client: &'a ClientId,
	) -> StoreFuture<'a, Option<ExternalUserLink>>;

	/// Creates or overwrites the external link for the link's (user, client) pair.
	fn upsert_external_link(&self, link: ExternalUserLink) -> StoreFuture<'_, ()>;

	/// Looks up the line item mirroring `assessment` under `deployment`.
	fn find_line_item<'a>(
		&'a self,
		deployment: &'a DeploymentKey,
		assessment: &'a AssessmentId,
	) -> StoreFuture<'a, Option<LineItem>>;

	/// Creates or overwrites the line item for its (deployment, assessment) pair.
	fn save_line_item(&self, line_item: LineItem) -> StoreFuture<'_, ()>;
}

/// Accessor for marks that have been released to students.
pub trait MarkSource
where
	Self: Send + Sync,
{
	/// Returns the released marks of `assessment`, tagged by its kind.
	fn released_marks<'a>(&'a self, assessment: &'a Assessment)
	-> StoreFuture<'a, ReleasedMarks>;
}

/// Error type produced by [`SyncStore`] and [`MarkSource`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// A record failed the host's validation rules.
	#[error("Record rejected: {message}.")]
	Rejected {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;

	#[test]
	fn store_error_converts_into_sync_error_with_source() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let sync_error: Error = store_error.clone().into();

		assert!(matches!(sync_error, Error::Storage(_)));
		assert!(sync_error.to_string().contains("database unreachable"));

		let source = StdError::source(&sync_error)
			.expect("Sync error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
