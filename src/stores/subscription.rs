//! Subscriptions, invoices, and plan changes.

// crates.io
use futures_util::future;
// self
use crate::{
	_prelude::*,
	api::{ApiClient, ApiRequest},
	auth::{AccountId, Auth, LicenseId, SubscriptionId},
	environment::Service,
	host::HostContext,
	stores::{LicenseStore, require_account},
};

/// Subscription record; fields beyond the ids pass through untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
	/// Subscription identifier.
	pub id: SubscriptionId,
	/// Billing-provider identifier used for invoice lookups.
	#[serde(default)]
	pub stripe_id: Option<String>,
	/// License attached by the last details fetch.
	#[serde(default)]
	pub license: Option<Value>,
	/// Remaining fields.
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}

/// Snapshot of the subscription store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubscriptionState {
	/// Visible subscriptions; `None` when the account has none.
	pub subscriptions: Option<Vec<Subscription>>,
	/// Non-draft invoices of every fetched subscription.
	pub invoices: Vec<Value>,
	/// One upcoming invoice per subscription.
	pub upcoming_invoices: Vec<Value>,
	/// Last proration preview.
	pub proration_amount: Option<Value>,
}
impl SubscriptionState {
	fn set_invoices(&mut self, invoices: Vec<Value>) {
		let Some(first) = invoices.first() else {
			return;
		};
		let subscription_id = first.get("subscription_id").cloned();

		self.invoices.retain(|invoice| invoice.get("subscription_id") != subscription_id.as_ref());
		self.invoices.extend(
			invoices
				.into_iter()
				.filter(|invoice| invoice.get("status").and_then(Value::as_str) != Some("draft")),
		);
	}

	fn set_upcoming_invoice(&mut self, upcoming: Value) {
		let subscription_id = upcoming.get("subscription_id").cloned();

		self.upcoming_invoices
			.retain(|invoice| invoice.get("subscription_id") != subscription_id.as_ref());
		self.upcoming_invoices.push(upcoming);
	}

	fn attach_license(&mut self, license: Value) {
		let Some(subscriptions) = self.subscriptions.as_mut() else {
			return;
		};
		let owner = license.get("subscription_id").and_then(crate::de::id_string);
		let target = subscriptions
			.iter_mut()
			.find(|subscription| owner.as_deref() == Some(subscription.id.as_ref()));

		if let Some(subscription) = target {
			subscription.license = Some(license);
		}
	}
}

/// Plan change submitted to `upgrade_free_license`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FreeLicenseUpgrade {
	/// Free license being upgraded.
	pub license_id: Option<LicenseId>,
	/// Paid subscription created for it.
	pub subscription_id: Option<SubscriptionId>,
	/// Domain to keep.
	pub domain: Option<String>,
	/// Target languages.
	pub translations: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionsEnvelope {
	#[serde(default, deserialize_with = "crate::de::null_default")]
	subscriptions: Vec<Subscription>,
}

#[derive(Debug, Default, Deserialize)]
struct InvoicesEnvelope {
	#[serde(default)]
	invoices: Option<Vec<Value>>,
	#[serde(default)]
	upcoming_invoice: Option<Value>,
}

/// Subscription store.
pub struct SubscriptionStore {
	api: Arc<ApiClient>,
	auth: Arc<Auth>,
	host: Arc<HostContext>,
	licenses: Arc<LicenseStore>,
	state: RwLock<SubscriptionState>,
}
impl SubscriptionStore {
	/// Creates an empty store; embedded pages only see the active license's subscription.
	pub fn new(
		api: Arc<ApiClient>,
		auth: Arc<Auth>,
		host: Arc<HostContext>,
		licenses: Arc<LicenseStore>,
	) -> Self {
		Self { api, auth, host, licenses, state: RwLock::new(SubscriptionState::default()) }
	}

	/// Snapshot of the store.
	pub fn state(&self) -> SubscriptionState {
		self.state.read().clone()
	}

	/// Fetches the account's subscriptions, then their details and invoices.
	///
	/// Embedded pages keep only the subscription of the active license, and none when there is
	/// no active license or it is free.
	pub async fn get_subscriptions(&self, account_id: &AccountId) -> Result<Vec<Subscription>> {
		let envelope: SubscriptionsEnvelope = self
			.api
			.request(
				ApiRequest::post(Service::Billing, "get_subscriptions")
					.json(json!({ "account_id": account_id })),
			)
			.await
			.inspect_err(|e| tracing::error!(error = %e, "Failed to get subscriptions."))?;

		if envelope.subscriptions.is_empty() {
			self.state.write().subscriptions = None;

			return Ok(Vec::new());
		}

		let visible = self.visible(envelope.subscriptions);

		self.state.write().subscriptions = Some(visible.clone());

		future::join_all(visible.iter().map(|subscription| self.hydrate(subscription))).await;

		Ok(self.state.read().subscriptions.clone().unwrap_or_default())
	}

	/// Fetches invoices of a billing-provider subscription id.
	pub async fn get_subscription_invoices(&self, stripe_id: &str) -> Result<Value> {
		let body: Value = self
			.api
			.request(
				ApiRequest::post(Service::Billing, "get_subscription_invoices")
					.json(json!({ "subscription_id": stripe_id })),
			)
			.await?;
		let envelope: InvoicesEnvelope =
			serde_json::from_value(body.clone()).unwrap_or_default();

		if let Some(invoices) = envelope.invoices {
			let mut state = self.state.write();

			state.set_invoices(invoices);

			if let Some(upcoming) = envelope.upcoming_invoice.filter(|v| !v.is_null()) {
				state.set_upcoming_invoice(upcoming);
			}
		}

		Ok(body)
	}

	/// Cancels a subscription; it leaves the list only when it ended immediately.
	pub async fn cancel_subscription(
		&self,
		subscription_id: &SubscriptionId,
		immediately: bool,
	) -> Result<Value> {
		let body: Value = self
			.api
			.request(ApiRequest::post(Service::Billing, "cancel_subscription").json(json!({
				"subscription_id": subscription_id,
				"immediately": immediately,
			})))
			.await?;
		let ended = body.pointer("/subscription/ends_at") == Some(&Value::Null);

		if let Some(subscriptions) = self.state.write().subscriptions.as_mut().filter(|_| ended) {
			subscriptions.retain(|subscription| &subscription.id != subscription_id);
		}

		Ok(body)
	}

	/// Saves domain and language choices of a new subscription.
	pub async fn save_subscription_details(
		&self,
		account_id: &AccountId,
		subscription_id: &SubscriptionId,
		domain: &str,
		translations: Value,
	) -> Result<Value> {
		self.api
			.request(ApiRequest::post(Service::App, "subscription/save_subscription_details").json(
				json!({
					"account_id": account_id,
					"subscription_id": subscription_id,
					"domain": domain,
					"translations": translations,
				}),
			))
			.await
	}

	/// Fetches the license attached to a subscription.
	pub async fn get_subscription_details(
		&self,
		subscription_id: &SubscriptionId,
	) -> Result<Value> {
		let body: Value = self
			.api
			.request(
				ApiRequest::post(Service::App, "subscription/get_subscription_details")
					.json(json!({ "subscription_id": subscription_id })),
			)
			.await?;
		let has_translations = body.get("subscription_translations").is_some();
		let license =
			body.get("license").filter(|license| !license.is_null() && has_translations);

		if let Some(license) = license {
			self.state.write().attach_license(license.clone());
		}

		Ok(body)
	}

	/// Switches the card charged for a subscription.
	pub async fn update_subscription_payment_method(
		&self,
		subscription_id: &SubscriptionId,
		payment_method_id: &str,
		payment_method_stripe_id: &str,
	) -> Result<Value> {
		self.api
			.request(ApiRequest::post(Service::Billing, "update_subscription_payment_method").json(
				json!({
					"subscription_id": subscription_id,
					"payment_method_id": payment_method_id,
					"payment_method_stripe_id": payment_method_stripe_id,
				}),
			))
			.await
	}

	/// Moves a subscription's license to another domain.
	pub async fn update_subscription_license(
		&self,
		subscription_id: &SubscriptionId,
		domain: &str,
	) -> Result<Value> {
		let body: Value = self
			.api
			.request(
				ApiRequest::post(Service::App, "subscription/update_subscription_domain")
					.json(json!({ "subscription_id": subscription_id, "domain": domain })),
			)
			.await?;

		if let Some(license) = body.get("license").filter(|license| !license.is_null()) {
			self.state.write().attach_license(license.clone());
		}

		Ok(body)
	}

	/// Retries payment of a failed invoice.
	pub async fn retry_failed_invoice(
		&self,
		account_id: &AccountId,
		invoice_id: &str,
		payment_method: &str,
	) -> Result<Value> {
		self.api
			.request(ApiRequest::post(Service::Billing, "retry_failed_invoice").json(json!({
				"invoice_id": invoice_id,
				"payment_method": payment_method,
				"account_id": account_id,
			})))
			.await
	}

	/// Previews the prorated charge of a price change.
	pub async fn preview_update_proration(
		&self,
		account_id: &AccountId,
		subscription_id: &SubscriptionId,
		new_price: &str,
	) -> Result<Option<Value>> {
		self.state.write().proration_amount = None;

		let body: Value = self
			.api
			.request(ApiRequest::post(Service::Billing, "preview_update_proration").json(json!({
				"subscription_id": subscription_id,
				"new_price": new_price,
				"account_id": account_id,
			})))
			.await?;
		let amount = body.get("proration_amount").filter(|amount| crate::de::is_present(amount));

		self.state.write().proration_amount = amount.cloned();

		Ok(amount.cloned())
	}

	/// Upgrades a free license once its paid subscription exists.
	pub async fn upgrade_free_license(&self, upgrade: &FreeLicenseUpgrade) -> Result<Value> {
		self.account_request(
			ApiRequest::post(Service::App, "subscription/upgrade_free_license")
				.json(json!(upgrade)),
		)
		.await
	}

	/// Schedules a downgrade to the free tier at the end of the billing period.
	pub async fn downgrade_to_free(&self, license_id: &LicenseId) -> Result<Value> {
		self.account_request(
			ApiRequest::post(Service::App, "subscription/downgrade_to_free")
				.json(json!({ "license_id": license_id })),
		)
		.await
	}

	/// Undoes a pending cancellation or downgrade.
	pub async fn cancel_scheduled_change(&self, license_id: &LicenseId) -> Result<Value> {
		self.account_request(
			ApiRequest::post(Service::App, "subscription/cancel_scheduled_change")
				.json(json!({ "license_id": license_id })),
		)
		.await
	}

	fn visible(&self, all: Vec<Subscription>) -> Vec<Subscription> {
		if !self.host.is_embedded() {
			return all;
		}

		match self.licenses.active_license().and_then(|license| license.subscription_id) {
			Some(subscription_id) =>
				all.into_iter().filter(|subscription| subscription.id == subscription_id).collect(),
			None => Vec::new(),
		}
	}

	async fn hydrate(&self, subscription: &Subscription) {
		if let Err(e) = self.get_subscription_details(&subscription.id).await {
			tracing::warn!(
				error = %e,
				subscription_id = %subscription.id,
				"Failed to get subscription details."
			);
		}

		let Some(stripe_id) = &subscription.stripe_id else {
			return;
		};

		if let Err(e) = self.get_subscription_invoices(stripe_id).await {
			tracing::warn!(
				error = %e,
				subscription_id = %subscription.id,
				"Failed to get invoices."
			);
		}
	}

	async fn account_request(&self, request: ApiRequest) -> Result<Value> {
		let account_id = require_account(&self.auth)?;

		self.api.request(request.account(account_id)).await
	}
}
impl Debug for SubscriptionStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SubscriptionStore")
			.field("state", &*self.state.read())
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn invoices_replace_per_subscription_and_skip_drafts() {
		let mut state = SubscriptionState::default();

		state.set_invoices(vec![
			json!({ "id": "a1", "subscription_id": "sub_a", "status": "paid" }),
			json!({ "id": "a0", "subscription_id": "sub_a", "status": "draft" }),
		]);
		let open = json!({ "id": "b1", "subscription_id": "sub_b", "status": "open" });
		let paid = json!({ "id": "a2", "subscription_id": "sub_a", "status": "paid" });

		state.set_invoices(vec![open]);
		state.set_invoices(vec![paid]);
		state.set_invoices(Vec::new());

		let ids = state.invoices.iter().map(|invoice| invoice["id"].clone()).collect::<Vec<_>>();

		assert_eq!(ids, vec![json!("b1"), json!("a2")]);
	}

	#[test]
	fn upcoming_invoice_is_kept_once_per_subscription() {
		let mut state = SubscriptionState::default();

		state.set_upcoming_invoice(json!({ "subscription_id": "sub_a", "amount_due": 100 }));
		state.set_upcoming_invoice(json!({ "subscription_id": "sub_a", "amount_due": 200 }));

		assert_eq!(
			state.upcoming_invoices,
			vec![json!({ "subscription_id": "sub_a", "amount_due": 200 })]
		);
	}

	#[test]
	fn license_attaches_to_matching_subscription() {
		let mut state = SubscriptionState {
			subscriptions: Some(
				serde_json::from_value(json!([{ "id": 4, "stripe_id": "sub_x" }]))
					.expect("Subscription fixture should deserialize."),
			),
			..Default::default()
		};

		state.attach_license(json!({ "subscription_id": 4, "domain_name": "shop.example.com" }));

		let subscriptions = state.subscriptions.expect("Subscriptions should remain set.");

		assert_eq!(
			subscriptions[0].license.as_ref().and_then(|license| license.get("domain_name")),
			Some(&json!("shop.example.com"))
		);
	}
}
