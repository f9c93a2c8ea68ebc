//! Feature stores layered on the API client.
//!
//! Each store owns the state for one dashboard area and exposes the backend operations that
//! feed it. Stores never hold a lock across an `.await`; they fetch, then swap the new state in.

pub mod account;
pub mod checkout;
pub mod language;
pub mod license;
pub mod referral;
pub mod subscription;

pub use account::AccountStore;
pub use checkout::CheckoutStore;
pub use language::LanguageStore;
pub use license::LicenseStore;
pub use referral::ReferralStore;
pub use subscription::SubscriptionStore;

// self
use crate::{
	_prelude::*,
	auth::{AccountId, Auth},
};

/// Account the session is acting on, or [`Error::MissingAccount`].
pub(crate) fn require_account(auth: &Auth) -> Result<AccountId> {
	auth.current_account_id().ok_or(Error::MissingAccount)
}

/// Response body carrying its payload under `data`.
#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
	pub(crate) data: Option<T>,
}

/// Turns a `success: false` body into [`Error::Rejected`].
pub(crate) fn ensure_success(body: &Value, fallback: &str) -> Result<()> {
	if body.get("success").is_some_and(crate::de::is_truthy) {
		return Ok(());
	}

	Err(Error::Rejected {
		message: crate::api::extract_message(body).unwrap_or_else(|| fallback.to_owned()),
	})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn success_flag_gates_rejection() {
		assert!(ensure_success(&json!({ "success": 1 }), "Nope.").is_ok());

		match ensure_success(&json!({ "success": false }), "Nope.") {
			Err(Error::Rejected { message }) => assert_eq!(message, "Nope."),
			other => panic!("Unexpected result: {other:?}"),
		}
		match ensure_success(&json!({ "success": 0, "error": "Quota reached." }), "Nope.") {
			Err(Error::Rejected { message }) => assert_eq!(message, "Quota reached."),
			other => panic!("Unexpected result: {other:?}"),
		}
	}
}
