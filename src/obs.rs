//! Observability helpers for dashboard operations.
//!
//! Every guard, auth, and license operation runs inside a span named
//! `weblinguist_dashboard.op` carrying the `op` (operation) and `stage` (call site) fields.
//!
//! # Feature Flags
//!
//! - Enable `metrics` to increment the `weblinguist_dashboard_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`.

mod counter;
mod span;

pub use counter::*;
pub use span::*;

// self
use crate::_prelude::*;

/// Operation kinds observed by the dashboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Route guard evaluation.
	Guard,
	/// Session check against the backend.
	SessionCheck,
	/// Embedded login or registration.
	Login,
	/// Logout and local cleanup.
	Logout,
	/// License list fetch and active-license resolution.
	Licenses,
	/// Host bridge call.
	Bridge,
	/// CSRF cookie bootstrap or refresh.
	Csrf,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::Guard => "guard",
			OpKind::SessionCheck => "session_check",
			OpKind::Login => "login",
			OpKind::Logout => "logout",
			OpKind::Licenses => "licenses",
			OpKind::Bridge => "bridge",
			OpKind::Csrf => "csrf",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller or swallowed by policy.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
