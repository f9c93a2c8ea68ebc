//! Dashboard assembly: one place that wires the transport, bridge, session, stores, and guard.

// self
use crate::{
	_prelude::*,
	api::ApiClient,
	auth::{Auth, TokenKeeper},
	bridge::{self, PlatformBridge},
	environment::EnvironmentConfig,
	host::{HostContext, Navigator, NoopNavigator, SessionTokenIssuer},
	http::{HttpTransport, ReqwestTransport},
	router::{NavigationDecision, Route, RouteGuard},
	storage::{ClientStorage, MemoryStorage},
	stores::{
		AccountStore, CheckoutStore, LanguageStore, LicenseStore, ReferralStore, SubscriptionStore,
	},
};

/// Builder for [`Dashboard`].
pub struct DashboardBuilder {
	environment: EnvironmentConfig,
	host: HostContext,
	navigator: Option<Arc<dyn Navigator>>,
	storage: Option<Arc<dyn ClientStorage>>,
	transport: Option<Arc<dyn HttpTransport>>,
	token_issuer: Option<Arc<dyn SessionTokenIssuer>>,
}
impl DashboardBuilder {
	/// Sets the page navigator; defaults to [`NoopNavigator`].
	pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
		self.navigator = Some(navigator);

		self
	}

	/// Sets client storage; defaults to [`MemoryStorage`].
	pub fn storage(mut self, storage: Arc<dyn ClientStorage>) -> Self {
		self.storage = Some(storage);

		self
	}

	/// Sets the HTTP transport; defaults to a cookie-keeping [`ReqwestTransport`].
	pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
		self.transport = Some(transport);

		self
	}

	/// Sets the Shopify session token issuer.
	pub fn token_issuer(mut self, issuer: Arc<dyn SessionTokenIssuer>) -> Self {
		self.token_issuer = Some(issuer);

		self
	}

	/// Wires every component.
	pub fn build(self) -> Result<Dashboard> {
		let transport: Arc<dyn HttpTransport> = match self.transport {
			Some(transport) => transport,
			None => Arc::new(ReqwestTransport::new()?),
		};
		let navigator: Arc<dyn Navigator> =
			self.navigator.unwrap_or_else(|| Arc::new(NoopNavigator));
		let storage: Arc<dyn ClientStorage> =
			self.storage.unwrap_or_else(|| Arc::new(MemoryStorage::default()));
		let environment = Arc::new(self.environment);
		let host = Arc::new(self.host);
		let bridge = bridge::select(&host, transport.clone(), self.token_issuer);
		let api = Arc::new(ApiClient::new(
			transport,
			environment.clone(),
			navigator.clone(),
			host.is_embedded(),
		));
		let tokens = TokenKeeper::new(storage.clone(), bridge.clone());
		let auth = Arc::new(Auth::new(
			api.clone(),
			host.clone(),
			bridge.clone(),
			tokens,
			navigator.clone(),
		));
		let licenses =
			Arc::new(LicenseStore::new(api.clone(), auth.clone(), host.clone(), bridge.clone()));
		let subscriptions = Arc::new(SubscriptionStore::new(
			api.clone(),
			auth.clone(),
			host.clone(),
			licenses.clone(),
		));
		let guard = Arc::new(RouteGuard::new(
			auth.clone(),
			licenses.clone(),
			host.clone(),
			environment.clone(),
		));

		tracing::debug!(
			environment = environment.environment.as_str(),
			platform = ?host.platform(),
			"Dashboard assembled."
		);

		Ok(Dashboard {
			accounts: Arc::new(AccountStore::new(api.clone())),
			checkout: Arc::new(CheckoutStore::new(api.clone(), auth.clone())),
			languages: Arc::new(LanguageStore::new(api.clone(), storage)),
			referrals: Arc::new(ReferralStore::new(api.clone())),
			environment,
			host,
			navigator,
			bridge,
			api,
			auth,
			licenses,
			subscriptions,
			guard,
		})
	}
}
impl Debug for DashboardBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DashboardBuilder")
			.field("environment", &self.environment)
			.field("host", &self.host)
			.finish_non_exhaustive()
	}
}

/// Fully wired dashboard client.
#[derive(Clone)]
pub struct Dashboard {
	environment: Arc<EnvironmentConfig>,
	host: Arc<HostContext>,
	navigator: Arc<dyn Navigator>,
	bridge: Arc<dyn PlatformBridge>,
	api: Arc<ApiClient>,
	auth: Arc<Auth>,
	licenses: Arc<LicenseStore>,
	subscriptions: Arc<SubscriptionStore>,
	accounts: Arc<AccountStore>,
	checkout: Arc<CheckoutStore>,
	languages: Arc<LanguageStore>,
	referrals: Arc<ReferralStore>,
	guard: Arc<RouteGuard>,
}
impl Dashboard {
	/// Starts a builder for the given environment and host context.
	pub fn builder(environment: EnvironmentConfig, host: HostContext) -> DashboardBuilder {
		DashboardBuilder {
			environment,
			host,
			navigator: None,
			storage: None,
			transport: None,
			token_issuer: None,
		}
	}

	/// Runs the guard for `to`; external decisions are handed to the navigator before being
	/// returned.
	pub async fn navigate(&self, to: &Route) -> NavigationDecision {
		let decision = self.guard.before_each(to).await;

		if let NavigationDecision::External(url) = &decision {
			self.navigator.hard_redirect(url);
		}

		decision
	}

	/// Resolved environment.
	pub fn environment(&self) -> &Arc<EnvironmentConfig> {
		&self.environment
	}

	/// Host context captured at startup.
	pub fn host(&self) -> &Arc<HostContext> {
		&self.host
	}

	/// Host bridge for the current platform.
	pub fn bridge(&self) -> &Arc<dyn PlatformBridge> {
		&self.bridge
	}

	/// Backend client.
	pub fn api(&self) -> &Arc<ApiClient> {
		&self.api
	}

	/// Session owner.
	pub fn auth(&self) -> &Arc<Auth> {
		&self.auth
	}

	/// License store.
	pub fn licenses(&self) -> &Arc<LicenseStore> {
		&self.licenses
	}

	/// Subscription store.
	pub fn subscriptions(&self) -> &Arc<SubscriptionStore> {
		&self.subscriptions
	}

	/// Account store.
	pub fn accounts(&self) -> &Arc<AccountStore> {
		&self.accounts
	}

	/// Checkout store.
	pub fn checkout(&self) -> &Arc<CheckoutStore> {
		&self.checkout
	}

	/// Language store.
	pub fn languages(&self) -> &Arc<LanguageStore> {
		&self.languages
	}

	/// Referral store.
	pub fn referrals(&self) -> &Arc<ReferralStore> {
		&self.referrals
	}

	/// Route guard.
	pub fn guard(&self) -> &Arc<RouteGuard> {
		&self.guard
	}
}
impl Debug for Dashboard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Dashboard")
			.field("environment", &self.environment)
			.field("host", &self.host)
			.field("guard", &self.guard)
			.finish_non_exhaustive()
	}
}
