//! Licenses (one per translated site), their rules, settings, and DNS setup.
//!
//! Embedded pages bind to a single license: the one whose id the host stored, or the one
//! whose domain matches the store domain. A bound license is saved back to the host so the
//! storefront script can load it. Standalone pages list every license and bind none.

mod dns;
mod rules;
mod selection;

pub use dns::*;
pub use rules::*;
pub use selection::*;

// self
use crate::{
	_prelude::*,
	api::{ApiClient, ApiRequest},
	auth::{Auth, LicenseId, SubscriptionId},
	bridge::{LicensePayload, PlatformBridge},
	environment::Service,
	host::HostContext,
	obs::{OpKind, OpOutcome, OpSpan, record_op_outcome, record_result},
	stores::{DataEnvelope, require_account},
};

/// License record as returned by the app API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct License {
	/// License identifier.
	pub id: LicenseId,
	/// Domain the license is bound to.
	#[serde(default)]
	pub domain_name: Option<String>,
	/// Subscription paying for the license; free licenses have none.
	#[serde(default)]
	pub subscription_id: Option<SubscriptionId>,
	/// Key embedded in the toolbar script URL.
	#[serde(default)]
	pub license_key: Option<String>,
	/// Toolbar settings blob.
	#[serde(default)]
	pub settings: Option<Value>,
	/// Remaining fields, passed through untouched.
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}
impl License {
	/// Payload mirrored to the host when this license becomes active.
	pub fn host_payload(&self) -> LicensePayload {
		LicensePayload {
			license_id: self.id.to_string(),
			license_key: self.license_key.clone(),
			subscription_id: self.subscription_id.as_ref().map(ToString::to_string),
		}
	}
}

/// Settings update sent to `PUT licenses/{id}`; unset optionals are omitted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LicenseSettingsUpdate {
	/// Full toolbar settings blob.
	pub settings: Value,
	/// New domain.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub domain_name: Option<String>,
	/// Text-to-speech toggle.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tts_enabled: Option<bool>,
	/// Text-to-speech highlighting toggle.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tts_highlighting: Option<bool>,
	/// Polyglot toggle.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub poly_enabled: Option<bool>,
}

/// Snapshot of the license store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LicenseState {
	/// Displayed licenses; `None` until the first successful fetch.
	pub licenses: Option<Vec<License>>,
	/// License bound to the embedding host.
	pub active_license: Option<License>,
	/// Rules of the last license whose rules were fetched.
	pub rules: Vec<LicenseRule>,
	/// DNS setup progress.
	pub dns: DnsState,
}

/// License store.
pub struct LicenseStore {
	api: Arc<ApiClient>,
	auth: Arc<Auth>,
	host: Arc<HostContext>,
	bridge: Arc<dyn PlatformBridge>,
	state: RwLock<LicenseState>,
}
impl LicenseStore {
	/// Creates an empty store.
	pub fn new(
		api: Arc<ApiClient>,
		auth: Arc<Auth>,
		host: Arc<HostContext>,
		bridge: Arc<dyn PlatformBridge>,
	) -> Self {
		Self { api, auth, host, bridge, state: RwLock::new(LicenseState::default()) }
	}

	/// Snapshot of the whole store.
	pub fn state(&self) -> LicenseState {
		self.state.read().clone()
	}

	/// Whether a license fetch has completed.
	pub fn licenses_loaded(&self) -> bool {
		self.state.read().licenses.is_some()
	}

	/// Displayed licenses.
	pub fn licenses(&self) -> Option<Vec<License>> {
		self.state.read().licenses.clone()
	}

	/// License bound to the embedding host.
	pub fn active_license(&self) -> Option<License> {
		self.state.read().active_license.clone()
	}

	/// Fetches the account's licenses and, when embedded, binds the active one.
	///
	/// Returns the displayed list: the active license alone, or every license. The binding is
	/// stored before the license is saved to the host, and that save is bounded by
	/// [`HOST_REQUEST_TIMEOUT`](crate::bridge::HOST_REQUEST_TIMEOUT); its failure never fails
	/// this call.
	pub async fn get_licenses(&self) -> Result<Vec<License>> {
		let span = OpSpan::new(OpKind::Licenses, "get_licenses");

		record_op_outcome(OpKind::Licenses, OpOutcome::Attempt);

		let result = span.instrument(self.fetch_licenses()).await;

		record_result(OpKind::Licenses, &result);

		result
	}

	/// Replaces a license's settings.
	pub async fn update_license_settings(
		&self,
		license_id: &LicenseId,
		update: &LicenseSettingsUpdate,
	) -> Result<Value> {
		let request =
			ApiRequest::put(Service::App, format!("licenses/{license_id}")).json(json!(update));

		self.account_request(request).await.inspect_err(|e| {
			tracing::error!(error = %e, %license_id, "Failed to update license settings.");
		})
	}

	/// Updates one setting key.
	pub async fn update_single_license_setting(
		&self,
		license_id: &LicenseId,
		key: &str,
		value: Value,
	) -> Result<Value> {
		self.account_request(
			ApiRequest::post(Service::App, format!("licenses/{license_id}/update_setting"))
				.json(json!({ "setting_key": key, "setting_value": value })),
		)
		.await
	}

	/// Moves a license to another domain.
	pub async fn update_license_domain(
		&self,
		license_id: &LicenseId,
		domain: &str,
	) -> Result<Value> {
		self.account_request(
			ApiRequest::post(Service::App, format!("licenses/{license_id}/update_domain"))
				.json(json!({ "domain_name": domain })),
		)
		.await
	}

	/// Toolbar snippet the site owner pastes into their page head.
	pub fn installation_script(&self, license: &License) -> String {
		let cdn = self.api.environment().toolbar_cdn_url.as_str().trim_end_matches('/');
		let key = license.license_key.as_deref().unwrap_or_default();

		format!(
			concat!(
				"<!-- Web Linguist Language Translator -->\n",
				"<script async type=\"module\" ",
				"src=\"{cdn}/toolbar/{key}/weblinguist-toolbar.js\"></script>",
			),
			cdn = cdn,
			key = key,
		)
	}

	pub(crate) async fn account_request<T>(&self, request: ApiRequest) -> Result<T>
	where
		T: for<'de> Deserialize<'de>,
	{
		let account_id = require_account(&self.auth)?;

		self.api.request(request.account(account_id)).await
	}

	async fn fetch_licenses(&self) -> Result<Vec<License>> {
		let envelope: DataEnvelope<Vec<License>> =
			self.account_request(ApiRequest::get(Service::App, "licenses")).await?;
		let all = envelope.data.unwrap_or_default();

		if !self.host.is_embedded() {
			let mut state = self.state.write();

			state.licenses = Some(all.clone());
			state.active_license = None;

			return Ok(all);
		}

		let selection =
			resolve_active_license(all, self.host.stored_license_id(), self.host.store_domain());
		let (active, displayed) = match selection {
			LicenseSelection::Active { license, matched_by } => {
				tracing::debug!(license_id = %license.id, ?matched_by, "Bound active license.");

				(Some(license.clone()), vec![license])
			},
			LicenseSelection::Manual(all) => {
				tracing::debug!(count = all.len(), "No license matched the host, manual pick.");

				(None, all)
			},
		};

		{
			let mut state = self.state.write();

			state.active_license = active.clone();
			state.licenses = Some(displayed.clone());
		}

		// Readers see the binding while the host save is in flight.
		if let Some(license) = &active {
			self.save_to_host(license).await;
		}

		Ok(displayed)
	}

	async fn save_to_host(&self, license: &License) {
		record_op_outcome(OpKind::Bridge, OpOutcome::Attempt);

		match self.bridge.save_license(&license.host_payload()).await {
			Ok(_) => record_op_outcome(OpKind::Bridge, OpOutcome::Success),
			Err(e) => {
				record_op_outcome(OpKind::Bridge, OpOutcome::Failure);

				tracing::error!(
					error = %e,
					license_id = %license.id,
					"Failed to save license to host."
				);
			},
		}
	}
}
impl Debug for LicenseStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LicenseStore").field("state", &*self.state.read()).finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn license_parses_numeric_ids_and_keeps_extras() {
		let license: License = serde_json::from_value(json!({
			"id": 12,
			"domain_name": "shop.example.com",
			"subscription_id": null,
			"license_key": "abc",
			"settings": { "theme": "dark" },
			"status": "active"
		}))
		.expect("License fixture should deserialize.");

		assert_eq!(license.id, LicenseId::from(12));
		assert_eq!(license.subscription_id, None);
		assert_eq!(license.extra.get("status"), Some(&json!("active")));
		assert_eq!(
			license.host_payload(),
			LicensePayload {
				license_id: "12".into(),
				license_key: Some("abc".into()),
				subscription_id: None,
			}
		);
	}

	#[test]
	fn settings_update_omits_unset_toggles() {
		let update = LicenseSettingsUpdate {
			settings: json!({ "position": "left" }),
			tts_enabled: Some(true),
			..Default::default()
		};

		assert_eq!(
			serde_json::to_value(&update).expect("Update should serialize."),
			json!({ "settings": { "position": "left" }, "tts_enabled": true })
		);
	}
}
