//! Referral program: referrals, payouts, and the PayPal payout address.

// self
use crate::{
	_prelude::*,
	api::{ApiClient, ApiRequest},
	environment::Service,
	stores::ensure_success,
};

/// Snapshot of the referral store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReferralState {
	/// Users referred by the current user.
	pub referrals: Vec<Value>,
	/// Past payouts.
	pub payouts: Vec<Value>,
	/// Commission not yet paid out.
	pub available_commission: f64,
}

#[derive(Debug, Deserialize)]
struct ReferralsEnvelope {
	#[serde(default, deserialize_with = "crate::de::truthy")]
	success: bool,
	#[serde(default)]
	referrals: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct PayoutsEnvelope {
	#[serde(default, deserialize_with = "crate::de::truthy")]
	success: bool,
	#[serde(default)]
	payouts: Option<Vec<Value>>,
	#[serde(default)]
	available_commission: Option<Value>,
}

/// Referral store.
#[derive(Debug)]
pub struct ReferralStore {
	api: Arc<ApiClient>,
	state: RwLock<ReferralState>,
}
impl ReferralStore {
	/// Creates an empty store.
	pub fn new(api: Arc<ApiClient>) -> Self {
		Self { api, state: RwLock::new(ReferralState::default()) }
	}

	/// Snapshot of the store.
	pub fn state(&self) -> ReferralState {
		self.state.read().clone()
	}

	/// Fetches the user's referrals.
	pub async fn get_referrals(&self) -> Result<Vec<Value>> {
		let envelope: ReferralsEnvelope = self
			.api
			.request(ApiRequest::get(Service::App, "user/get_referrals"))
			.await
			.inspect_err(|e| tracing::error!(error = %e, "Failed to get referrals."))?;

		if let Some(referrals) = envelope.referrals.filter(|_| envelope.success) {
			self.state.write().referrals = referrals;
		}

		Ok(self.state.read().referrals.clone())
	}

	/// Records that the current user arrived through `referrer_id`.
	pub async fn log_referral(&self, referrer_id: &str) -> Result<Value> {
		let body: Value = self
			.api
			.request(
				ApiRequest::post(Service::App, "user/log_referral")
					.json(json!({ "referrer_id": referrer_id })),
			)
			.await
			.inspect_err(|e| tracing::error!(error = %e, "Failed to log referral."))?;

		ensure_success(&body, "Failed to log referral")?;

		Ok(body)
	}

	/// Fetches payouts and the available commission.
	pub async fn get_payouts(&self) -> Result<Vec<Value>> {
		let envelope: PayoutsEnvelope = self
			.api
			.request(ApiRequest::get(Service::App, "user/get_payouts"))
			.await
			.inspect_err(|e| tracing::error!(error = %e, "Failed to get payouts."))?;

		if let Some(payouts) = envelope.payouts.filter(|_| envelope.success) {
			let mut state = self.state.write();

			state.payouts = payouts;

			if let Some(commission) = envelope.available_commission.as_ref().and_then(as_amount) {
				state.available_commission = commission;
			}
		}

		Ok(self.state.read().payouts.clone())
	}

	/// Requests a payout of the available commission, which then drops to zero.
	pub async fn create_payout(&self) -> Result<Value> {
		let body: Value = self
			.api
			.request(ApiRequest::post(Service::App, "user/create_payout"))
			.await
			.inspect_err(|e| tracing::error!(error = %e, "Failed to create payout."))?;

		ensure_success(&body, "Failed to create payout")?;

		self.state.write().available_commission = 0.;

		Ok(body)
	}

	/// Sets the PayPal address payouts are sent to.
	pub async fn update_paypal_email(&self, email: &str) -> Result<Value> {
		self.api
			.request(
				ApiRequest::post(Service::App, "user/update_paypal_email")
					.json(json!({ "paypal_email": email })),
			)
			.await
			.inspect_err(|e| tracing::error!(error = %e, "Failed to update paypal email."))
	}
}

fn as_amount(value: &Value) -> Option<f64> {
	match value {
		Value::Number(n) => n.as_f64(),
		Value::String(s) => s.trim().parse().ok(),
		_ => None,
	}
}
