//! Environment resolution: maps the page hostname onto backend and login endpoints.
//!
//! Resolution is a pure function of the hostname plus [`EnvironmentOverrides`]. Loopback hosts
//! resolve to `local`, hosts under the internal development domain resolve to `development`
//! (optionally with a per-developer prefix), and everything else resolves to `production`.
//! Overrides replace individual defaults and are validated when they are loaded, which keeps
//! [`EnvironmentConfig::resolve`] infallible.

// self
use crate::{_prelude::*, error::ConfigError};

const DEVELOPMENT_DOMAIN: &str = ".devp.weblinguist.ai";
const DEVELOPER_PREFIXES: &[&str] = &["-alex", "-ross"];
const DEFAULT_TOOLBAR_CDN_URL: &str = "https://tb-cdn.weblinguist.ai";
const DEFAULT_MARKETING_HOMEPAGE_URL: &str = "https://weblinguist.ai/";

/// Deployment tier selected for the current host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
	/// Loopback development (`localhost`, `127.0.0.1`).
	Local,
	/// Shared development cluster.
	Development,
	/// Public production deployment.
	Production,
}
impl Environment {
	/// Classifies a hostname.
	pub fn detect(hostname: &str) -> Self {
		if hostname == "localhost" || hostname == "127.0.0.1" {
			Self::Local
		} else if hostname.contains(DEVELOPMENT_DOMAIN) {
			Self::Development
		} else {
			Self::Production
		}
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Local => "local",
			Self::Development => "development",
			Self::Production => "production",
		}
	}
}
impl Display for Environment {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Backend service families reachable under the API base URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Service {
	/// Core application API (`api/`).
	App,
	/// Identity and session API (`vff-sso/`).
	Sso,
	/// Billing API (`vff-billing/`).
	Billing,
	/// Notifications API (`vff-notifications/`).
	Notifications,
}

/// Optional replacements for the per-environment defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvironmentOverrides {
	/// External login page.
	pub login_url: Option<Url>,
	/// Backend API base.
	pub api_base_url: Option<Url>,
	/// Public dashboard URL.
	pub dashboard_url: Option<Url>,
	/// Registration page.
	pub registration_url: Option<Url>,
	/// Marketing homepage.
	pub marketing_homepage_url: Option<Url>,
	/// Identifier sent to social-login redirects.
	pub app_id: Option<String>,
	/// CDN serving the translation toolbar bundle.
	pub toolbar_cdn_url: Option<Url>,
}
impl EnvironmentOverrides {
	/// Variable holding the login URL override.
	pub const LOGIN_URL: &'static str = "WEBLINGUIST_LOGIN_URL";
	/// Variable holding the API base URL override.
	pub const API_BASE_URL: &'static str = "WEBLINGUIST_API_BASE_URL";
	/// Variable holding the dashboard URL override.
	pub const DASHBOARD_URL: &'static str = "WEBLINGUIST_DASHBOARD_URL";
	/// Variable holding the registration URL override.
	pub const REGISTRATION_URL: &'static str = "WEBLINGUIST_REGISTRATION_URL";
	/// Variable holding the marketing homepage override.
	pub const MARKETING_HOMEPAGE_URL: &'static str = "WEBLINGUIST_MARKETING_HOMEPAGE_URL";
	/// Variable holding the social-login app identifier.
	pub const APP_ID: &'static str = "WEBLINGUIST_APP_ID";
	/// Variable holding the toolbar CDN override.
	pub const TOOLBAR_CDN_URL: &'static str = "WEBLINGUIST_TOOLBAR_CDN_URL";

	/// Loads overrides from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Loads overrides through an arbitrary lookup; blank values count as unset.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
		let read_url = |name: &str| read(name).map(|value| parse_base(name, &value)).transpose();

		Ok(Self {
			login_url: read_url(Self::LOGIN_URL)?,
			api_base_url: read_url(Self::API_BASE_URL)?,
			dashboard_url: read_url(Self::DASHBOARD_URL)?,
			registration_url: read_url(Self::REGISTRATION_URL)?,
			marketing_homepage_url: read_url(Self::MARKETING_HOMEPAGE_URL)?,
			app_id: read(Self::APP_ID),
			toolbar_cdn_url: read_url(Self::TOOLBAR_CDN_URL)?,
		})
	}

	/// Overrides the login URL.
	pub fn with_login_url(mut self, url: Url) -> Self {
		self.login_url = Some(url);

		self
	}

	/// Overrides the API base URL.
	pub fn with_api_base_url(mut self, url: Url) -> Self {
		self.api_base_url = Some(with_trailing_slash(url));

		self
	}

	/// Sets the social-login app identifier.
	pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
		self.app_id = Some(app_id.into());

		self
	}
}

/// Fully resolved endpoint configuration for one page lifetime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
	/// Selected deployment tier.
	pub environment: Environment,
	/// Developer prefix (e.g. `-alex`) for development hosts; empty otherwise.
	pub developer_prefix: String,
	/// External login page.
	pub login_url: Url,
	/// Backend API base; always ends with `/`.
	pub api_base_url: Url,
	/// Public dashboard URL.
	pub dashboard_url: Url,
	/// Registration page.
	pub registration_url: Url,
	/// Marketing homepage.
	pub marketing_homepage_url: Url,
	/// Core application API.
	pub app_api_url: Url,
	/// Identity and session API.
	pub sso_api_url: Url,
	/// Billing API.
	pub billing_api_url: Url,
	/// Notifications API.
	pub notification_api_url: Url,
	/// Endpoint that issues the `XSRF-TOKEN` cookie.
	pub csrf_url: Url,
	/// Identifier sent to social-login redirects.
	pub app_id: Option<String>,
	/// CDN serving the translation toolbar bundle.
	pub toolbar_cdn_url: Url,
}
impl EnvironmentConfig {
	/// Resolves the configuration for `hostname`.
	pub fn resolve(hostname: &str, overrides: &EnvironmentOverrides) -> Self {
		let environment = Environment::detect(hostname);
		let developer_prefix = match environment {
			Environment::Development => DEVELOPER_PREFIXES
				.iter()
				.find(|prefix| hostname.contains(&format!("{prefix}.")))
				.map(|prefix| (*prefix).to_owned())
				.unwrap_or_default(),
			_ => String::new(),
		};
		let defaults = Defaults::for_environment(environment, &developer_prefix);
		let api_base_url =
			with_trailing_slash(overrides.api_base_url.clone().unwrap_or(defaults.api_base_url));
		let config = Self {
			environment,
			developer_prefix,
			login_url: overrides.login_url.clone().unwrap_or(defaults.login_url),
			dashboard_url: overrides.dashboard_url.clone().unwrap_or(defaults.dashboard_url),
			registration_url: overrides
				.registration_url
				.clone()
				.unwrap_or(defaults.registration_url),
			marketing_homepage_url: overrides
				.marketing_homepage_url
				.clone()
				.unwrap_or_else(|| builtin(DEFAULT_MARKETING_HOMEPAGE_URL)),
			app_api_url: child(&api_base_url, "api/"),
			sso_api_url: child(&api_base_url, "vff-sso/"),
			billing_api_url: child(&api_base_url, "vff-billing/"),
			notification_api_url: child(&api_base_url, "vff-notifications/"),
			csrf_url: child(&api_base_url, "sanctum/csrf-cookie"),
			api_base_url,
			app_id: overrides.app_id.clone(),
			toolbar_cdn_url: overrides
				.toolbar_cdn_url
				.clone()
				.unwrap_or_else(|| builtin(DEFAULT_TOOLBAR_CDN_URL)),
		};

		tracing::debug!(
			hostname,
			environment = config.environment.as_str(),
			developer_prefix = config.developer_prefix,
			api_base_url = %config.api_base_url,
			"Resolved dashboard environment."
		);

		config
	}

	/// Service base URL for `service`.
	pub fn service_url(&self, service: Service) -> &Url {
		match service {
			Service::App => &self.app_api_url,
			Service::Sso => &self.sso_api_url,
			Service::Billing => &self.billing_api_url,
			Service::Notifications => &self.notification_api_url,
		}
	}

	/// Joins a relative `path` onto the base URL of `service`.
	pub fn endpoint(&self, service: Service, path: &str) -> Result<Url, ConfigError> {
		let base = self.service_url(service);

		base.join(path.trim_start_matches('/')).map_err(|source| ConfigError::InvalidEndpoint {
			base: base.to_string(),
			path: path.to_owned(),
			source,
		})
	}

	/// External login URL tagged with `from=dashboard`.
	pub fn login_redirect_url(&self) -> Url {
		let mut url = self.login_url.clone();

		url.query_pairs_mut().append_pair("from", "dashboard");

		url
	}
}

struct Defaults {
	login_url: Url,
	api_base_url: Url,
	dashboard_url: Url,
	registration_url: Url,
}
impl Defaults {
	fn for_environment(environment: Environment, prefix: &str) -> Self {
		match environment {
			Environment::Local => Self {
				login_url: builtin("http://localhost:5174/"),
				api_base_url: builtin("http://localhost:8090/"),
				dashboard_url: builtin("http://localhost:8090/"),
				registration_url: builtin("http://localhost:8090/"),
			},
			Environment::Development => Self {
				login_url: builtin(&format!("https://login{prefix}{DEVELOPMENT_DOMAIN}/")),
				api_base_url: builtin(&format!("https://api{prefix}{DEVELOPMENT_DOMAIN}/")),
				dashboard_url: builtin(&format!("https://dashboard{prefix}{DEVELOPMENT_DOMAIN}/")),
				registration_url: builtin(&format!(
					"https://register{prefix}{DEVELOPMENT_DOMAIN}/"
				)),
			},
			Environment::Production => Self {
				login_url: builtin("https://weblinguist.ai/login/"),
				api_base_url: builtin("https://api.weblinguist.ai/"),
				dashboard_url: builtin("https://dashboard.weblinguist.ai/"),
				registration_url: builtin("https://register.weblinguist.ai/"),
			},
		}
	}
}

// Built-in defaults are literals (or a literal plus a fixed prefix) and always parse.
fn builtin(raw: &str) -> Url {
	Url::parse(raw).unwrap_or_else(|e| unreachable!("built-in endpoint `{raw}` is invalid: {e}"))
}

fn parse_base(name: &str, value: &str) -> Result<Url, ConfigError> {
	match Url::parse(value.trim()) {
		Ok(url) if !url.cannot_be_a_base() => Ok(url),
		_ => Err(ConfigError::InvalidOverride { name: name.to_owned(), value: value.to_owned() }),
	}
}

fn with_trailing_slash(mut url: Url) -> Url {
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	url
}

fn child(base: &Url, segment: &str) -> Url {
	let mut url = base.clone();
	let path = format!("{}{segment}", base.path());

	url.set_path(&path);
	url.set_query(None);

	url
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn resolve(hostname: &str) -> EnvironmentConfig {
		EnvironmentConfig::resolve(hostname, &EnvironmentOverrides::default())
	}

	#[test]
	fn localhost_resolves_to_local_defaults() {
		let config = resolve("localhost");

		assert_eq!(config.environment, Environment::Local);
		assert_eq!(config.api_base_url.as_str(), "http://localhost:8090/");
		assert_eq!(config.login_url.as_str(), "http://localhost:5174/");
		assert_eq!(resolve("127.0.0.1").environment, Environment::Local);
	}

	#[test]
	fn public_hosts_resolve_to_production() {
		let hosts =
			["dashboard.weblinguist.ai", "example.com", "shop.myshopify.com", "devp.example"];

		for host in hosts {
			let config = resolve(host);

			assert_eq!(config.environment, Environment::Production, "{host}");
			assert_eq!(config.api_base_url.as_str(), "https://api.weblinguist.ai/");
			assert_eq!(config.login_url.as_str(), "https://weblinguist.ai/login/");
		}
	}

	#[test]
	fn development_hosts_pick_up_developer_prefix() {
		let shared = resolve("dashboard.devp.weblinguist.ai");

		assert_eq!(shared.environment, Environment::Development);
		assert_eq!(shared.developer_prefix, "");
		assert_eq!(shared.api_base_url.as_str(), "https://api.devp.weblinguist.ai/");

		let personal = resolve("dashboard-ross.devp.weblinguist.ai");

		assert_eq!(personal.developer_prefix, "-ross");
		assert_eq!(personal.api_base_url.as_str(), "https://api-ross.devp.weblinguist.ai/");
		assert_eq!(personal.login_url.as_str(), "https://login-ross.devp.weblinguist.ai/");
	}

	#[test]
	fn derived_service_urls_hang_off_api_base() {
		let config = resolve("dashboard.weblinguist.ai");

		assert_eq!(config.app_api_url.as_str(), "https://api.weblinguist.ai/api/");
		assert_eq!(config.sso_api_url.as_str(), "https://api.weblinguist.ai/vff-sso/");
		assert_eq!(config.billing_api_url.as_str(), "https://api.weblinguist.ai/vff-billing/");
		assert_eq!(
			config.notification_api_url.as_str(),
			"https://api.weblinguist.ai/vff-notifications/"
		);
		assert_eq!(config.csrf_url.as_str(), "https://api.weblinguist.ai/sanctum/csrf-cookie");
		assert_eq!(
			config
				.endpoint(Service::App, "/license/42/rules")
				.expect("Relative endpoint should join.")
				.as_str(),
			"https://api.weblinguist.ai/api/license/42/rules"
		);
	}

	#[test]
	fn overrides_replace_defaults_and_normalize_slashes() {
		let vars = HashMap::from([
			(EnvironmentOverrides::API_BASE_URL, "https://staging-api.example.com/root"),
			(EnvironmentOverrides::APP_ID, "dashboard-app"),
			(EnvironmentOverrides::LOGIN_URL, "  "),
		]);
		let overrides = EnvironmentOverrides::from_lookup(|name| {
			vars.get(name).map(|value| (*value).to_owned())
		})
		.expect("Overrides fixture should load.");
		let config = EnvironmentConfig::resolve("localhost", &overrides);

		assert_eq!(config.api_base_url.as_str(), "https://staging-api.example.com/root/");
		assert_eq!(config.sso_api_url.as_str(), "https://staging-api.example.com/root/vff-sso/");
		assert_eq!(config.login_url.as_str(), "http://localhost:5174/");
		assert_eq!(config.app_id.as_deref(), Some("dashboard-app"));
	}

	#[test]
	fn malformed_override_is_rejected_while_loading() {
		let err = EnvironmentOverrides::from_lookup(|name| {
			(name == EnvironmentOverrides::DASHBOARD_URL).then(|| "not a url".to_owned())
		})
		.expect_err("Malformed override should be rejected.");

		assert!(matches!(
			err,
			ConfigError::InvalidOverride { ref name, .. }
				if name == EnvironmentOverrides::DASHBOARD_URL
		));
	}

	#[test]
	fn login_redirect_is_tagged_with_origin() {
		let config = resolve("dashboard.weblinguist.ai");

		assert_eq!(
			config.login_redirect_url().as_str(),
			"https://weblinguist.ai/login/?from=dashboard"
		);
	}
}
