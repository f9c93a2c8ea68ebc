//! Dashboard routes and the navigation decisions the guard produces.

// self
use crate::_prelude::*;

macro_rules! def_routes {
	($($variant:ident => $name:literal, $path:literal;)+) => {
		/// Named dashboard route.
		#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
		pub enum RouteName {
			$(
				#[doc = concat!("`", $name, "` (`", $path, "`).")]
				$variant,
			)+
		}
		impl RouteName {
			/// Every route, in declaration order.
			pub const ALL: &'static [RouteName] = &[$(RouteName::$variant,)+];

			/// Route name used in links and redirects.
			pub const fn as_str(self) -> &'static str {
				match self {
					$(RouteName::$variant => $name,)+
				}
			}

			/// Path template; `:param` segments are filled from route params, `:param?` ones
			/// may be absent.
			pub const fn path_template(self) -> &'static str {
				match self {
					$(RouteName::$variant => $path,)+
				}
			}
		}
	};
}

def_routes! {
	Overview => "overview", "/";
	Websites => "websites", "/websites";
	Subscriptions => "subscriptions", "/subscriptions";
	SubscriptionDetail => "subscription-detail", "/subscriptions/:id";
	ManageLicense => "manage-license", "/websites/:id";
	ManageLicenseCustomize => "manage-license-customize", "/websites/:id/customize";
	ManageLicenseGlobalExclusions =>
		"manage-license-global-exclusions", "/websites/:id/global-exclusions";
	ManageLicenseTranslations => "manage-license-translations", "/websites/:id/translations";
	ManageLicenseTranslationsPerPage =>
		"manage-license-translations-perpage", "/websites/:id/translations/per-page";
	ManageLicenseSitemap => "manage-license-sitemap", "/websites/:id/sitemap";
	ManageLicenseLocalization => "manage-license-localization", "/websites/:id/localization";
	ManageLicenseAnalytics => "manage-license-analytics", "/websites/:id/analytics";
	Checkout => "checkout", "/checkout/:type?/:id?";
	Profile => "profile", "/profile";
	ManageUsers => "manage-users", "/manage-users";
	EditAccount => "edit-account", "/edit-account";
	AccountSetup => "account-setup", "/account-setup";
	InsufficientAccess => "insufficient-access", "/insufficient-access";
	SuccessConfirmation => "success-confirmation", "/success-confirmation/:type?";
	Referrals => "referrals", "/referrals";
	ReferralsPayouts => "referrals-payouts", "/referrals/payouts";
	ReferralsAds => "referrals-ads", "/referrals/ads";
	ReferralsHowItWorks => "referrals-how-it-works", "/referrals/how-it-works";
	Agency => "agency", "/agency";
	AgencyProfitCalculator => "agency-profit-calculator", "/agency/profit-calculator";
	AgencyRevenueKit => "agency-revenue-kit", "/agency/revenue-kit";
	AgencyProgressTracker => "agency-progress-tracker", "/agency/progress-tracker";
	EmbeddedLogin => "embedded-login", "/login";
	EmbeddedOverview => "embedded-overview", "/welcome";
}

impl RouteName {
	/// Routes closed to `Read Only` members.
	pub const fn requires_admin(self) -> bool {
		matches!(self, Self::Checkout | Self::ManageUsers | Self::EditAccount)
	}
}
impl Display for RouteName {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for RouteName {
	type Err = UnknownRoute;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.iter()
			.copied()
			.find(|route| route.as_str() == s)
			.ok_or_else(|| UnknownRoute(s.to_owned()))
	}
}

/// Error returned when parsing an unknown route name.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown route `{0}`.")]
pub struct UnknownRoute(pub String);

/// Route being navigated to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
	/// Route name.
	pub name: RouteName,
	/// Path params.
	pub params: BTreeMap<String, String>,
	/// Query string params.
	pub query: BTreeMap<String, String>,
}
impl Route {
	/// Route without params.
	pub fn new(name: RouteName) -> Self {
		Self { name, params: BTreeMap::new(), query: BTreeMap::new() }
	}

	/// Sets a path param.
	pub fn param(mut self, name: impl Into<String>, value: impl Display) -> Self {
		self.params.insert(name.into(), value.to_string());

		self
	}

	/// Sets a query param.
	pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.insert(name.into(), value.into());

		self
	}

	/// Path with params filled in, plus the query string.
	pub fn full_path(&self) -> String {
		let mut path = String::new();

		for segment in self.name.path_template().split('/').filter(|s| !s.is_empty()) {
			let value = match segment.strip_prefix(':') {
				Some(param) => {
					let optional = param.ends_with('?');

					match self.params.get(param.trim_end_matches('?')) {
						Some(value) => value.as_str(),
						None if optional => continue,
						None => "",
					}
				},
				None => segment,
			};

			path.push('/');
			path.push_str(value);
		}
		if path.is_empty() {
			path.push('/');
		}
		if !self.query.is_empty() {
			let query = url::form_urlencoded::Serializer::new(String::new())
				.extend_pairs(self.query.iter())
				.finish();

			path.push('?');
			path.push_str(&query);
		}

		path
	}
}
impl From<RouteName> for Route {
	fn from(name: RouteName) -> Self {
		Self::new(name)
	}
}

/// Internal redirect target produced by the guard.
pub type RouteTarget = Route;

/// What the host router should do with a navigation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavigationDecision {
	/// Continue to the requested route.
	Proceed,
	/// Navigate to another dashboard route instead.
	Redirect(RouteTarget),
	/// Leave the dashboard for an external URL; guard processing stops.
	External(Url),
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn full_path_fills_params_and_query() {
		assert_eq!(Route::new(RouteName::Overview).full_path(), "/");
		assert_eq!(
			Route::new(RouteName::ManageLicenseCustomize).param("id", 42).full_path(),
			"/websites/42/customize"
		);
		assert_eq!(Route::new(RouteName::Checkout).full_path(), "/checkout");
		assert_eq!(
			Route::new(RouteName::Checkout).param("type", "upgrade").param("id", 3).full_path(),
			"/checkout/upgrade/3"
		);
		assert_eq!(
			Route::new(RouteName::EmbeddedLogin)
				.query("redirect", "/websites/1?tab=a b")
				.full_path(),
			"/login?redirect=%2Fwebsites%2F1%3Ftab%3Da+b"
		);
	}

	#[test]
	fn names_round_trip_and_admin_routes_are_fixed() {
		for route in RouteName::ALL {
			assert_eq!(route.as_str().parse::<RouteName>(), Ok(*route));
		}

		let admin =
			RouteName::ALL.iter().filter(|route| route.requires_admin()).collect::<Vec<_>>();

		assert_eq!(
			admin,
			vec![&RouteName::Checkout, &RouteName::ManageUsers, &RouteName::EditAccount]
		);
		assert!("nope".parse::<RouteName>().is_err());
	}
}
