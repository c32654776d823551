//! Optional observability helpers for sync passes.
//!
//! # Feature Flags
//!
//! - `tracing` (default) emits spans named `lti_sync.pass` with the `kind` (component) and
//!   `stage` (call site) fields, plus retry and per-member warning events.
//! - `metrics` increments `lti_sync_pass_total` for every attempt/success/failure, labeled by
//!   `kind` + `outcome`, and `lti_sync_dispatch_retry_total` per retry, labeled by `axis`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

pub(crate) use self::tracing::sync_event;

// self
use crate::_prelude::*;

/// Components whose passes are observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncKind {
	/// Client-credentials token acquisition.
	Token,
	/// Signed request dispatch.
	Dispatch,
	/// Line item upsert.
	LineItem,
	/// Roster reconciliation.
	Roster,
	/// Grade reconciliation.
	Grades,
}
impl SyncKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			SyncKind::Token => "token",
			SyncKind::Dispatch => "dispatch",
			SyncKind::LineItem => "line_item",
			SyncKind::Roster => "roster",
			SyncKind::Grades => "grades",
		}
	}
}
impl Display for SyncKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncOutcome {
	/// Entry to a component.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl SyncOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			SyncOutcome::Attempt => "attempt",
			SyncOutcome::Success => "success",
			SyncOutcome::Failure => "failure",
		}
	}
}
impl Display for SyncOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside a span for `kind`, recording attempt and outcome.
pub(crate) async fn observe<T, Fut>(kind: SyncKind, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = SyncSpan::new(kind, stage);

	record_sync_outcome(kind, SyncOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => record_sync_outcome(kind, SyncOutcome::Success),
		Err(_) => record_sync_outcome(kind, SyncOutcome::Failure),
	}

	result
}
