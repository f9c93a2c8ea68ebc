//! Picks the license an embedded host is bound to.

// self
use crate::{_prelude::*, stores::license::License};

/// How an active license was matched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchedBy {
	/// The host's stored license id.
	StoredId,
	/// The license domain equals the store domain.
	Domain,
}

/// Result of [`resolve_active_license`]: exactly one active license, or the full list for a
/// manual pick.
#[derive(Clone, Debug, PartialEq)]
pub enum LicenseSelection {
	/// A license was bound to the host.
	Active {
		/// The bound license.
		license: License,
		/// Which rule matched.
		matched_by: MatchedBy,
	},
	/// Nothing matched; the user picks from every license.
	Manual(Vec<License>),
}
impl LicenseSelection {
	/// Bound license, if any.
	pub fn active(&self) -> Option<&License> {
		match self {
			Self::Active { license, .. } => Some(license),
			Self::Manual(_) => None,
		}
	}
}

/// Resolves the active license: stored id first, then domain, else manual selection.
pub fn resolve_active_license(
	all: Vec<License>,
	stored_id: Option<&str>,
	store_domain: &str,
) -> LicenseSelection {
	let stored_id = stored_id.filter(|id| !id.is_empty());
	let by_id = stored_id
		.and_then(|stored_id| all.iter().find(|license| license.id.as_ref() == stored_id));

	if let Some(license) = by_id {
		return LicenseSelection::Active {
			license: license.clone(),
			matched_by: MatchedBy::StoredId,
		};
	}
	if stored_id.is_some() {
		tracing::debug!(?stored_id, "Stored license id not found, trying domain match.");
	}

	match all.iter().find(|license| license.domain_name.as_deref() == Some(store_domain)) {
		Some(license) =>
			LicenseSelection::Active { license: license.clone(), matched_by: MatchedBy::Domain },
		None => LicenseSelection::Manual(all),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn licenses() -> Vec<License> {
		serde_json::from_value(json!([
			{ "id": 1, "domain_name": "shop-a.com", "license_key": "key-a" },
			{ "id": 2, "domain_name": "shop-b.com", "license_key": "key-b", "subscription_id": 9 },
		]))
		.expect("License fixtures should deserialize.")
	}

	#[test]
	fn stored_id_wins_over_domain() {
		let selection = resolve_active_license(licenses(), Some("2"), "shop-a.com");

		match selection {
			LicenseSelection::Active { license, matched_by } => {
				assert_eq!(license.id.as_ref(), "2");
				assert_eq!(matched_by, MatchedBy::StoredId);
			},
			other => panic!("Unexpected selection: {other:?}"),
		}
	}

	#[test]
	fn stale_stored_id_falls_back_to_domain() {
		let selection = resolve_active_license(licenses(), Some("404"), "shop-b.com");

		match selection {
			LicenseSelection::Active { license, matched_by } => {
				assert_eq!(license.id.as_ref(), "2");
				assert_eq!(matched_by, MatchedBy::Domain);
			},
			other => panic!("Unexpected selection: {other:?}"),
		}
	}

	#[test]
	fn no_match_yields_full_list() {
		let selection = resolve_active_license(licenses(), None, "elsewhere.com");

		assert_eq!(selection.active(), None);
		assert!(matches!(selection, LicenseSelection::Manual(ref all) if all.len() == 2));
	}
}
