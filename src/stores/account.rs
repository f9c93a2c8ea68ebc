//! Notifications and payment methods of the current account.

// self
use crate::{
	_prelude::*,
	api::{ApiClient, ApiRequest},
	auth::AccountId,
	environment::Service,
};

const ONBOARD_STEP: &str = "initial_onboard_step";
const AGENCY_STEP: &str = "agency_progress_tracker_step";

/// Notification record; onboarding and agency steps travel in the same feed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Notification {
	/// Notification identifier.
	#[serde(default, deserialize_with = "crate::de::string_or_number_opt")]
	pub id: Option<String>,
	/// Feed category.
	#[serde(rename = "type", default)]
	pub kind: Option<String>,
	/// `false`, `0`, or `null` while unread.
	#[serde(default)]
	pub viewed: Value,
	/// Remaining fields.
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}
impl Notification {
	/// Whether the user has not opened the notification yet.
	pub fn is_unviewed(&self) -> bool {
		matches!(&self.viewed, Value::Null | Value::Bool(false))
			|| self.viewed.as_i64() == Some(0)
	}
}

/// Snapshot of the account store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AccountState {
	/// Regular notifications.
	pub notifications: Vec<Notification>,
	/// First-run onboarding checklist.
	pub initial_onboard_steps: Vec<Notification>,
	/// Agency progress tracker checklist.
	pub agency_progress_tracker_steps: Vec<Notification>,
	/// Count of unread regular notifications.
	pub unviewed_notifications: usize,
	/// Saved payment methods.
	pub payment_methods: Vec<Value>,
	/// Default payment method.
	pub default_payment_method: Option<Value>,
}
impl AccountState {
	fn set_notifications(&mut self, all: Vec<Notification>) {
		self.notifications.clear();
		self.initial_onboard_steps.clear();
		self.agency_progress_tracker_steps.clear();

		for notification in all {
			match notification.kind.as_deref() {
				Some(ONBOARD_STEP) => self.initial_onboard_steps.push(notification),
				Some(AGENCY_STEP) => self.agency_progress_tracker_steps.push(notification),
				_ => self.notifications.push(notification),
			}
		}

		self.unviewed_notifications =
			self.notifications.iter().filter(|notification| notification.is_unviewed()).count();
	}
}

#[derive(Debug, Deserialize)]
struct NotificationsEnvelope {
	#[serde(default, deserialize_with = "crate::de::null_default")]
	notifications: Vec<Notification>,
}

#[derive(Debug, Deserialize)]
struct PaymentMethodsEnvelope {
	#[serde(default, deserialize_with = "crate::de::null_default")]
	payment_methods: Vec<Value>,
	#[serde(default)]
	default_payment_method: Option<Value>,
}

/// Account store.
#[derive(Debug)]
pub struct AccountStore {
	api: Arc<ApiClient>,
	state: RwLock<AccountState>,
}
impl AccountStore {
	/// Creates an empty store.
	pub fn new(api: Arc<ApiClient>) -> Self {
		Self { api, state: RwLock::new(AccountState::default()) }
	}

	/// Snapshot of the store.
	pub fn state(&self) -> AccountState {
		self.state.read().clone()
	}

	/// Fetches saved payment methods; failures leave the state untouched.
	pub async fn get_payment_methods(&self, account_id: &AccountId) {
		let result: Result<PaymentMethodsEnvelope> = self
			.api
			.request(ApiRequest::get(Service::Billing, format!("get_payment_methods/{account_id}")))
			.await;

		match result {
			Ok(envelope) => {
				let mut state = self.state.write();

				state.payment_methods = envelope.payment_methods;
				state.default_payment_method = envelope.default_payment_method;
			},
			Err(e) => tracing::error!(error = %e, "Failed to get payment methods."),
		}
	}

	/// Makes `payment_method` the default; a new method is also appended to the list.
	pub async fn update_default_payment_method(
		&self,
		account_id: &AccountId,
		payment_method: Value,
		new_method: bool,
	) -> Result<Value> {
		let body: Value = self
			.api
			.request(ApiRequest::post(Service::Billing, "update_default_payment_method").json(
				json!({
					"account_id": account_id,
					"payment_method": payment_method,
					"new_method": new_method,
				}),
			))
			.await?;
		let method = body.get("payment_method").cloned();
		let mut state = self.state.write();

		if let Some(method) = method.as_ref().filter(|_| new_method) {
			state.payment_methods.push(method.clone());
		}

		state.default_payment_method = method;

		Ok(body)
	}

	/// Fetches the notification feed and splits it by category.
	pub async fn get_notifications(&self, account_id: &AccountId) -> Result<usize> {
		let envelope: NotificationsEnvelope = self
			.api
			.request(
				ApiRequest::post(Service::Notifications, "get_notifications")
					.json(json!({ "account_id": account_id })),
			)
			.await?;
		let mut state = self.state.write();

		state.set_notifications(envelope.notifications);

		Ok(state.unviewed_notifications)
	}

	/// Marks a notification as read.
	pub async fn mark_notification_as_viewed(&self, notification_id: &str) -> Result<Value> {
		self.api
			.request(
				ApiRequest::post(Service::Notifications, "notification_viewed")
					.json(json!({ "notification_id": notification_id })),
			)
			.await
	}

	/// Seeds the agency checklist once, then refreshes the feed.
	pub async fn create_agency_notifications(&self, account_id: &AccountId) -> Result<()> {
		if !self.state.read().agency_progress_tracker_steps.is_empty() {
			return Ok(());
		}

		self.api
			.send(ApiRequest::get(
				Service::App,
				format!("notifications/create_agency_notifications/{account_id}"),
			))
			.await?;

		if let Err(e) = self.get_notifications(account_id).await {
			tracing::error!(error = %e, "Failed to refresh notifications.");
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn notifications_split_by_kind_and_count_unviewed() {
		let all: Vec<Notification> = serde_json::from_value(json!([
			{ "id": 1, "type": "initial_onboard_step", "viewed": 0 },
			{ "id": 2, "type": "agency_progress_tracker_step", "viewed": null },
			{ "id": 3, "type": "billing", "viewed": 0 },
			{ "id": 4, "type": "billing", "viewed": null },
			{ "id": 5, "viewed": true },
			{ "id": 6, "viewed": false },
		]))
		.expect("Notification fixtures should deserialize.");
		let mut state = AccountState::default();

		state.set_notifications(all);

		assert_eq!(state.initial_onboard_steps.len(), 1);
		assert_eq!(state.agency_progress_tracker_steps.len(), 1);
		assert_eq!(state.notifications.len(), 4);
		assert_eq!(state.unviewed_notifications, 3);
	}
}
