//! Plan catalog, coupons, and purchases.

// self
use crate::{
	_prelude::*,
	api::{ApiClient, ApiRequest},
	auth::{AccountId, Auth},
	environment::Service,
	error::TransientError,
};

/// Plan names in display order; `Starter` is shown as Standard.
const PLAN_RANK: [&str; 4] = ["Free", "Starter", "Growth", "Pro"];

/// Catalog product.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
	/// Product identifier.
	#[serde(default, deserialize_with = "crate::de::string_or_number_opt")]
	pub id: Option<String>,
	/// Product name.
	#[serde(default)]
	pub name: Option<String>,
	/// Positive for plans, zero or absent for add-ons.
	#[serde(default)]
	pub display_order: Value,
	/// Set on the virtual free plan.
	#[serde(default, deserialize_with = "crate::de::truthy")]
	pub is_free_tier: bool,
	/// Prices and remaining fields.
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}
impl Product {
	/// Virtual free plan offered to free-signup users.
	pub fn free_tier() -> Self {
		let price = |interval: &str| {
			json!({
				"id": "free-tier-price",
				"unit_amount": 0,
				"currency": "usd",
				"recurring": { "interval": interval },
			})
		};

		Self {
			id: Some("free-tier".into()),
			name: Some("Free".into()),
			display_order: json!(0),
			is_free_tier: true,
			extra: BTreeMap::from_iter([
				(
					"description".into(),
					json!("Get started with basic translation features"),
				),
				("prices".into(), json!([price("month"), price("year")])),
			]),
		}
	}

	/// Whether the product is a plan rather than an add-on.
	pub fn is_plan(&self) -> bool {
		let order = match &self.display_order {
			Value::Number(n) => n.as_f64(),
			Value::String(s) => s.trim().parse().ok(),
			_ => None,
		};

		self.is_free_tier || order.is_some_and(|order| order > 0.)
	}

	fn rank(&self) -> Option<usize> {
		let name = self.name.as_deref()?;

		PLAN_RANK.iter().position(|plan| *plan == name)
	}
}

/// Result of a coupon check.
#[derive(Clone, Debug, PartialEq)]
pub enum CouponValidation {
	/// The coupon applies to the price.
	Valid {
		/// Discount off the price.
		discount_amount: Option<Value>,
		/// Coupon details.
		coupon: Option<Value>,
	},
	/// The coupon was refused; messages are ready to show.
	Invalid(Vec<String>),
}

/// New subscription purchase.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionPurchase {
	/// Subscription name.
	pub name: Option<String>,
	/// Plan product id.
	pub plan: Option<String>,
	/// Price id.
	pub price: Option<String>,
	/// Payment method id.
	pub payment_method: Option<String>,
	/// Whether `payment_method` was just created.
	pub new_method: Option<bool>,
	/// Label of a new payment method.
	pub new_method_name: Option<String>,
	/// Paying account.
	pub account_id: Option<AccountId>,
	/// Charge the default payment method.
	pub create_with_default: Option<bool>,
	/// Coupon code.
	pub coupon_code: Option<String>,
	/// Start with a trial.
	pub free_trial: Option<bool>,
	/// Add-on price ids.
	#[serde(default)]
	pub addon_prices: Vec<String>,
}

/// Plan change of an existing subscription.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionChange {
	/// Subscription being changed.
	pub subscription_id: Option<String>,
	/// New price id.
	pub new_price: Option<String>,
	/// Paying account.
	pub account_id: Option<AccountId>,
	/// Subscription name.
	pub name: Option<String>,
	/// Coupon code.
	pub coupon_code: Option<String>,
	/// Prorate the change.
	pub prorate: Option<bool>,
	/// Payment method charged for the change.
	pub payment_method_stripe_id: Option<String>,
	/// Add-on price ids.
	#[serde(default)]
	pub addon_prices: Vec<String>,
}

/// Snapshot of the checkout store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CheckoutState {
	/// Plans, in display order.
	pub checkout_products: Vec<Product>,
	/// Add-ons.
	pub addon_products: Vec<Product>,
	/// Applied coupon.
	pub coupon: Option<Value>,
	/// Discount of the applied coupon.
	pub coupon_discount: Option<Value>,
	/// Messages of the last failed coupon check.
	pub coupon_validation_errors: Vec<String>,
	/// Client secret of the last setup intent.
	pub setup_intent_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProductsEnvelope {
	#[serde(default)]
	products: Option<Vec<Product>>,
}

/// Checkout store.
pub struct CheckoutStore {
	api: Arc<ApiClient>,
	auth: Arc<Auth>,
	state: RwLock<CheckoutState>,
}
impl CheckoutStore {
	/// Creates an empty store.
	pub fn new(api: Arc<ApiClient>, auth: Arc<Auth>) -> Self {
		Self { api, auth, state: RwLock::new(CheckoutState::default()) }
	}

	/// Snapshot of the store.
	pub fn state(&self) -> CheckoutState {
		self.state.read().clone()
	}

	/// Fetches the catalog and splits it into plans and add-ons.
	///
	/// Free-signup users also get the virtual free plan. Failures are logged and leave the
	/// catalog as it was.
	pub async fn get_checkout_products(&self, is_free_user: bool) {
		let result: Result<ProductsEnvelope> =
			self.api.request(ApiRequest::get(Service::Billing, "get_checkout_products")).await;

		match result {
			Ok(ProductsEnvelope { products: Some(products) }) => {
				let (plans, addons) = split_catalog(products, is_free_user);
				let mut state = self.state.write();

				state.checkout_products = plans;
				state.addon_products = addons;
			},
			Ok(_) => tracing::warn!("Checkout products response carried no products."),
			Err(e) => tracing::error!(error = %e, "Failed to get checkout products."),
		}
	}

	/// Creates a setup intent for collecting a card.
	pub async fn create_setup_intent(&self, account_id: &AccountId) -> Result<Option<String>> {
		let body: Value = self
			.api
			.request(
				ApiRequest::post(Service::Billing, "create_setup_intent")
					.json(json!({ "account_id": account_id })),
			)
			.await?;
		let secret =
			body.pointer("/setupIntent/client_secret").and_then(Value::as_str).map(str::to_owned);

		if secret.is_none() {
			tracing::error!("No setup intent secret found in response.");
		}

		self.state.write().setup_intent_secret = secret.clone();

		Ok(secret)
	}

	/// Checks `coupon_code` against `price_id`; refusals become user-facing messages.
	pub async fn validate_coupon_code(
		&self,
		coupon_code: &str,
		price_id: &str,
	) -> CouponValidation {
		self.state.write().coupon_validation_errors.clear();

		let result: Result<Value> = self
			.api
			.request(
				ApiRequest::post(Service::Billing, "validate_coupon")
					.json(json!({ "coupon_code": coupon_code, "price_id": price_id })),
			)
			.await;
		let validation = match result {
			Ok(body) if body.get("success").is_some_and(crate::de::is_truthy) =>
				CouponValidation::Valid {
					discount_amount: body.get("discount_amount").cloned(),
					coupon: body.get("coupon_data").cloned(),
				},
			Ok(body) => CouponValidation::Invalid(
				body.get("message")
					.and_then(Value::as_str)
					.map(str::to_owned)
					.into_iter()
					.collect(),
			),
			Err(e) => {
				tracing::error!(error = %e, "Coupon validation failed.");

				CouponValidation::Invalid(coupon_error_messages(&e))
			},
		};
		let mut state = self.state.write();

		match &validation {
			CouponValidation::Valid { discount_amount, coupon } => {
				state.coupon_discount = discount_amount.clone();
				state.coupon = coupon.clone();
			},
			CouponValidation::Invalid(messages) => {
				state.coupon_validation_errors = messages.clone();
				state.coupon = None;
				state.coupon_discount = None;
			},
		}

		validation
	}

	/// Purchases a subscription; success completes first onboarding.
	pub async fn handle_checkout(&self, purchase: &SubscriptionPurchase) -> Result<Value> {
		self.purchase(
			ApiRequest::post(Service::Billing, "subscription_purchase").json(json!(purchase)),
		)
		.await
	}

	/// Changes a subscription's plan; success completes first onboarding.
	pub async fn handle_update_subscription(&self, change: &SubscriptionChange) -> Result<Value> {
		self.purchase(ApiRequest::post(Service::Billing, "update_subscription").json(json!(change)))
			.await
	}

	/// Creates a free license; no payment involved.
	pub async fn handle_create_free_license(
		&self,
		account_id: &AccountId,
		domain: &str,
		language: &str,
	) -> Result<Value> {
		self.api
			.request(
				ApiRequest::post(Service::App, "licenses/free")
					.account(account_id)
					.json(json!({ "domain_name": domain, "language": language })),
			)
			.await
	}

	async fn purchase(&self, request: ApiRequest) -> Result<Value> {
		let body: Value = self.api.request(request).await?;

		if body.get("success").is_some_and(crate::de::is_present) {
			self.auth.mark_onboarding_complete();
		}

		Ok(body)
	}
}
impl Debug for CheckoutStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CheckoutStore").field("state", &*self.state.read()).finish_non_exhaustive()
	}
}

/// Orders known plans by rank (unknown products keep their slots), then splits plans from
/// add-ons.
fn split_catalog(mut products: Vec<Product>, with_free_tier: bool) -> (Vec<Product>, Vec<Product>) {
	if with_free_tier {
		products.insert(0, Product::free_tier());
	}

	let slots = products
		.iter()
		.enumerate()
		.filter_map(|(i, product)| product.rank().map(|_| i))
		.collect::<Vec<_>>();
	let mut ranked = slots.iter().map(|i| products[*i].clone()).collect::<Vec<_>>();

	ranked.sort_by_key(Product::rank);

	for (slot, product) in slots.into_iter().zip(ranked) {
		products[slot] = product;
	}

	products.into_iter().partition(Product::is_plan)
}

fn coupon_error_messages(error: &Error) -> Vec<String> {
	let message = match error {
		Error::Validation { status: 400, .. } => "Coupon code is invalid",
		Error::Unauthorized => "Unauthorized",
		Error::Validation { status: 404, .. } => "Coupon code not found",
		Error::Validation { status: 422, body, .. } => return field_errors(body.as_ref()),
		Error::Transient(TransientError::Upstream { status, .. }) if *status >= 500 =>
			"Server error. Please try again later.",
		Error::Validation { .. } | Error::Csrf { .. } | Error::Transient(_) =>
			"An unexpected error occurred",
		Error::Transport(_) => "Network error. Please check your connection.",
		_ => "An error occurred. Please try again.",
	};

	vec![message.to_owned()]
}

fn field_errors(body: Option<&Value>) -> Vec<String> {
	body.and_then(|body| body.get("errors"))
		.and_then(Value::as_object)
		.map(|errors| {
			errors
				.values()
				.filter_map(Value::as_array)
				.flatten()
				.filter_map(Value::as_str)
				.map(str::to_owned)
				.collect()
		})
		.unwrap_or_default()
}
