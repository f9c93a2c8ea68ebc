//! Navigation guard deciding whether a route may be entered.

// self
use crate::{
	_prelude::*,
	auth::{AccountRole, Auth, LicenseId},
	environment::EnvironmentConfig,
	host::{HostContext, Platform},
	obs::{OpKind, OpOutcome, OpSpan, record_op_outcome},
	router::{NavigationDecision, Route, RouteName},
	stores::LicenseStore,
};

/// Authentication state as seen by the guard.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum GuardState {
	/// No session.
	#[default]
	Unauthenticated,
	/// A session check is in flight.
	CheckingSession,
	/// Session accepted with the given account role.
	Authenticated(Option<AccountRole>),
	/// Last navigation was refused for the current role.
	InsufficientAccess,
}

/// Runs before every navigation.
///
/// Session resolution fails closed: any failure ends at the login page. License fetches fail
/// open: the guard logs and carries on with whatever it has.
pub struct RouteGuard {
	auth: Arc<Auth>,
	licenses: Arc<LicenseStore>,
	host: Arc<HostContext>,
	environment: Arc<EnvironmentConfig>,
	state: RwLock<GuardState>,
}
impl RouteGuard {
	/// Creates a guard.
	pub fn new(
		auth: Arc<Auth>,
		licenses: Arc<LicenseStore>,
		host: Arc<HostContext>,
		environment: Arc<EnvironmentConfig>,
	) -> Self {
		Self { auth, licenses, host, environment, state: RwLock::new(GuardState::default()) }
	}

	/// State after the last navigation.
	pub fn state(&self) -> GuardState {
		self.state.read().clone()
	}

	/// Decides what happens when navigating to `to`.
	pub async fn before_each(&self, to: &Route) -> NavigationDecision {
		let span = OpSpan::new(OpKind::Guard, "before_each");

		record_op_outcome(OpKind::Guard, OpOutcome::Attempt);

		let decision = span.instrument(self.decide(to)).await;

		record_op_outcome(
			OpKind::Guard,
			match decision {
				NavigationDecision::Proceed => OpOutcome::Success,
				_ => OpOutcome::Failure,
			},
		);
		tracing::debug!(route = %to.name, ?decision, "Guard decided.");

		decision
	}

	async fn decide(&self, to: &Route) -> NavigationDecision {
		let embedded = self.host.is_embedded();

		if embedded && to.name == RouteName::Overview {
			return NavigationDecision::Redirect(
				self.active_license_route().unwrap_or_else(|| RouteName::EmbeddedOverview.into()),
			);
		}
		if to.name == RouteName::EmbeddedLogin && self.auth.is_authenticated() {
			if embedded && !self.licenses.licenses_loaded() {
				tracing::debug!("Fetching licenses for embedded user.");

				if let Err(e) = self.licenses.get_licenses().await {
					tracing::error!(error = %e, "Failed to fetch licenses.");

					return NavigationDecision::Redirect(RouteName::Websites.into());
				}
			}

			let target = if embedded { self.active_license_route() } else { None };

			return NavigationDecision::Redirect(
				target.unwrap_or_else(|| RouteName::Websites.into()),
			);
		}
		if to.name != RouteName::EmbeddedLogin && !self.auth.is_authenticated() {
			self.resolve_session().await;
		}
		if to.name != RouteName::EmbeddedLogin && !self.auth.is_authenticated() {
			*self.state.write() = GuardState::Unauthenticated;

			return if embedded {
				NavigationDecision::Redirect(
					Route::new(RouteName::EmbeddedLogin).query("redirect", to.full_path()),
				)
			} else {
				NavigationDecision::External(self.environment.login_redirect_url())
			};
		}
		if self.auth.is_authenticated() {
			let role = self.auth.session().current_account_role;

			if to.name.requires_admin() && role.as_ref().is_some_and(AccountRole::is_read_only) {
				*self.state.write() = GuardState::InsufficientAccess;

				return NavigationDecision::Redirect(RouteName::InsufficientAccess.into());
			}

			*self.state.write() = GuardState::Authenticated(role);
		}

		NavigationDecision::Proceed
	}

	async fn resolve_session(&self) {
		tracing::debug!("User not authenticated, checking session.");

		*self.state.write() = GuardState::CheckingSession;

		if !self.auth.check_session().await {
			return;
		}
		if self.host.is_embedded() && !self.licenses.licenses_loaded() {
			tracing::debug!("Session check succeeded, fetching licenses for embedded user.");

			if let Err(e) = self.licenses.get_licenses().await {
				tracing::error!(error = %e, "Failed to fetch licenses after session check.");
			}
		}
	}

	/// Default view of the active license: Shopify opens the customize tab.
	fn active_license_route(&self) -> Option<Route> {
		let license = self.licenses.active_license()?;

		Some(license_route(self.host.platform(), &license.id))
	}
}
impl Debug for RouteGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RouteGuard").field("state", &*self.state.read()).finish_non_exhaustive()
	}
}

fn license_route(platform: Option<Platform>, license_id: &LicenseId) -> Route {
	let name = match platform {
		Some(Platform::Shopify) => RouteName::ManageLicenseCustomize,
		_ => RouteName::ManageLicense,
	};

	Route::new(name).param("id", license_id)
}
