// self
use crate::{
	error::RetryAxis,
	obs::{SyncKind, SyncOutcome},
};

/// Records a pass outcome via the global metrics recorder (when enabled).
pub fn record_sync_outcome(kind: SyncKind, outcome: SyncOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"lti_sync_pass_total",
			"kind" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records one dispatcher retry on `axis` (when enabled).
pub fn record_retry(axis: RetryAxis) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("lti_sync_dispatch_retry_total", "axis" => axis.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = axis;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_noop_without_metrics() {
		record_sync_outcome(SyncKind::Roster, SyncOutcome::Failure);
		record_retry(RetryAxis::Unauthorized);
	}
}
