// self
use crate::obs::{OpKind, OpOutcome};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_op_outcome(kind: OpKind, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"weblinguist_dashboard_op_total",
			"op" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records the outcome of `result` (success or failure).
pub fn record_result<T, E>(kind: OpKind, result: &Result<T, E>) {
	record_op_outcome(kind, if result.is_ok() { OpOutcome::Success } else { OpOutcome::Failure });
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_op_outcome_noop_without_metrics() {
		record_op_outcome(OpKind::Guard, OpOutcome::Failure);
		record_result::<(), ()>(OpKind::Bridge, &Ok(()));
	}
}
