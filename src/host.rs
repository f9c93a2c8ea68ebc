//! Host page context and the seams the dashboard uses to act on its host.
//!
//! [`HostContext`] is captured once at startup from whatever the embedding surface exposes
//! (the WordPress/Shopify configuration object plus the page location) and never changes
//! afterwards. Navigation and Shopify session tokens are side effects owned by the host,
//! so they sit behind the [`Navigator`] and [`SessionTokenIssuer`] traits.

// self
use crate::{_prelude::*, error::ConfigError};

/// Boxed future returned by [`SessionTokenIssuer`].
pub type IssuerFuture<'a> =
	Pin<Box<dyn Future<Output = Result<String, BoxedIssuerError>> + 'a + Send>>;
/// Error type produced by [`SessionTokenIssuer`] implementations.
pub type BoxedIssuerError = Box<dyn StdError + Send + Sync>;

/// Host platform that embeds the dashboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
	/// WordPress admin plugin (admin-ajax endpoints guarded by nonces).
	WordPress,
	/// Shopify embedded app (bridge endpoints guarded by session-token JWTs).
	Shopify,
}
impl Platform {
	/// Maps the host's platform discriminator; anything but `shopify` is WordPress.
	pub fn from_discriminator(raw: Option<&str>) -> Self {
		match raw {
			Some("shopify") => Self::Shopify,
			_ => Self::WordPress,
		}
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::WordPress => "wordpress",
			Self::Shopify => "shopify",
		}
	}
}
impl Display for Platform {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Configuration object injected by an embedding host.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedContext {
	/// Whether the dashboard runs inside a host platform.
	#[serde(default, deserialize_with = "crate::de::truthy")]
	pub is_embedded: bool,
	/// Raw platform discriminator (`shopify`, `wordpress`, or absent).
	#[serde(default)]
	pub platform: Option<String>,
	/// Single sign-on token handed over by the host.
	#[serde(default)]
	pub sso_token: Option<String>,
	/// WordPress `admin-ajax.php` endpoint.
	#[serde(default)]
	pub ajax_url: Option<Url>,
	/// WordPress nonce for saving the auth token.
	#[serde(default)]
	pub save_token_nonce: Option<String>,
	/// WordPress nonce for clearing the auth token.
	#[serde(default)]
	pub clear_token_nonce: Option<String>,
	/// WordPress nonce for saving the license key.
	#[serde(default)]
	pub save_license_key_nonce: Option<String>,
	/// License id previously saved on the host.
	#[serde(default, deserialize_with = "crate::de::string_or_number_opt")]
	pub license_id: Option<String>,
	/// Shopify store domain (e.g. `mystore.myshopify.com`).
	#[serde(default)]
	pub shop_domain: Option<String>,
	/// Base URL of the Shopify bridge endpoints.
	#[serde(default)]
	pub bridge_url: Option<Url>,
}
impl EmbedContext {
	/// Context for a WordPress host with the given `admin-ajax.php` URL.
	pub fn wordpress(ajax_url: Url) -> Self {
		Self {
			is_embedded: true,
			platform: Some("wordpress".into()),
			ajax_url: Some(ajax_url),
			..Default::default()
		}
	}

	/// Context for a Shopify host.
	pub fn shopify(bridge_url: Url, shop_domain: impl Into<String>) -> Self {
		Self {
			is_embedded: true,
			platform: Some("shopify".into()),
			bridge_url: Some(bridge_url),
			shop_domain: Some(shop_domain.into()),
			..Default::default()
		}
	}

	/// Sets the SSO token.
	pub fn with_sso_token(mut self, token: impl Into<String>) -> Self {
		self.sso_token = Some(token.into());

		self
	}

	/// Sets the license id previously saved on the host.
	pub fn with_license_id(mut self, id: impl Into<String>) -> Self {
		self.license_id = Some(id.into());

		self
	}

	/// Sets all three WordPress nonces.
	pub fn with_nonces(
		mut self,
		save_token: impl Into<String>,
		clear_token: impl Into<String>,
		save_license_key: impl Into<String>,
	) -> Self {
		self.save_token_nonce = Some(save_token.into());
		self.clear_token_nonce = Some(clear_token.into());
		self.save_license_key_nonce = Some(save_license_key.into());

		self
	}
}
impl Debug for EmbedContext {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("EmbedContext")
			.field("is_embedded", &self.is_embedded)
			.field("platform", &self.platform)
			.field("sso_token", &self.sso_token.as_ref().map(|_| "<redacted>"))
			.field("ajax_url", &self.ajax_url)
			.field("license_id", &self.license_id)
			.field("shop_domain", &self.shop_domain)
			.field("bridge_url", &self.bridge_url)
			.finish_non_exhaustive()
	}
}

/// Location of the page the dashboard is rendered in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLocation {
	/// Hostname of the current page.
	pub hostname: String,
	/// One-time login token carried in the page URL (`?token=`), if any.
	pub one_time_token: Option<String>,
}
impl PageLocation {
	/// Location for `hostname` without a one-time token.
	pub fn new(hostname: impl Into<String>) -> Self {
		Self { hostname: hostname.into(), one_time_token: None }
	}

	/// Attaches the one-time login token from the page URL.
	pub fn with_one_time_token(mut self, token: impl Into<String>) -> Self {
		self.one_time_token = Some(token.into());

		self
	}
}

/// Immutable host context captured at startup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostContext {
	/// Embedding configuration; `None` means standalone.
	pub embed: Option<EmbedContext>,
	/// Page location.
	pub location: PageLocation,
}
impl HostContext {
	/// Standalone dashboard served directly from `location`.
	pub fn standalone(location: PageLocation) -> Self {
		Self { embed: None, location }
	}

	/// Dashboard embedded in a host platform.
	pub fn embedded(embed: EmbedContext, location: PageLocation) -> Self {
		Self { embed: Some(embed), location }
	}

	/// Parses the host's configuration object; `null` yields a standalone context.
	pub fn from_json(raw: &str, location: PageLocation) -> Result<Self, ConfigError> {
		let embed: Option<EmbedContext> =
			serde_json::from_str(raw).map_err(ConfigError::InvalidHostContext)?;

		Ok(Self { embed, location })
	}

	/// Embedding configuration, only when the host flagged the page as embedded.
	pub fn embed(&self) -> Option<&EmbedContext> {
		self.embed.as_ref().filter(|embed| embed.is_embedded)
	}

	/// Whether the dashboard runs inside a host platform.
	pub fn is_embedded(&self) -> bool {
		self.embed().is_some()
	}

	/// Host platform, `None` when standalone.
	pub fn platform(&self) -> Option<Platform> {
		self.embed().map(|embed| Platform::from_discriminator(embed.platform.as_deref()))
	}

	/// Store hostname: the shop domain on Shopify, otherwise the page hostname.
	pub fn store_domain(&self) -> &str {
		match self.embed.as_ref() {
			Some(embed) if embed.platform.as_deref() == Some("shopify") =>
				embed.shop_domain.as_deref().unwrap_or(&self.location.hostname),
			_ => &self.location.hostname,
		}
	}

	/// SSO token supplied by the host.
	pub fn sso_token(&self) -> Option<&str> {
		self.embed().and_then(|embed| embed.sso_token.as_deref()).filter(|t| !t.is_empty())
	}

	/// License id previously saved on the host.
	pub fn stored_license_id(&self) -> Option<&str> {
		self.embed().and_then(|embed| embed.license_id.as_deref())
	}
}

/// Page-level navigation performed by the host shell.
pub trait Navigator
where
	Self: Send + Sync,
{
	/// Leaves the dashboard for `url` (full page navigation).
	fn hard_redirect(&self, url: &Url);

	/// Reloads the current page.
	fn reload(&self);
}

/// Navigator that ignores every request; used when the host does not navigate.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNavigator;
impl Navigator for NoopNavigator {
	fn hard_redirect(&self, url: &Url) {
		tracing::debug!(%url, "Ignoring hard redirect without a host navigator.");
	}

	fn reload(&self) {
		tracing::debug!("Ignoring reload without a host navigator.");
	}
}

/// Navigator that records requests for later inspection.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
	redirects: Mutex<Vec<Url>>,
	reloads: Mutex<usize>,
}
impl RecordingNavigator {
	/// Every URL passed to [`Navigator::hard_redirect`], in order.
	pub fn redirects(&self) -> Vec<Url> {
		self.redirects.lock().clone()
	}

	/// Number of reload requests.
	pub fn reloads(&self) -> usize {
		*self.reloads.lock()
	}
}
impl Navigator for RecordingNavigator {
	fn hard_redirect(&self, url: &Url) {
		self.redirects.lock().push(url.clone());
	}

	fn reload(&self) {
		*self.reloads.lock() += 1;
	}
}

/// Mints short-lived Shopify session tokens (App Bridge `idToken`).
pub trait SessionTokenIssuer
where
	Self: Send + Sync,
{
	/// Returns a fresh session token.
	fn issue(&self) -> IssuerFuture<'_>;
}

/// Issuer that always hands out the same token.
#[derive(Clone, Debug)]
pub struct StaticTokenIssuer(String);
impl StaticTokenIssuer {
	/// Wraps a fixed token.
	pub fn new(token: impl Into<String>) -> Self {
		Self(token.into())
	}
}
impl SessionTokenIssuer for StaticTokenIssuer {
	fn issue(&self) -> IssuerFuture<'_> {
		let token = self.0.clone();

		Box::pin(async move { Ok(token) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn absent_or_disabled_embed_is_standalone() {
		let location = PageLocation::new("dashboard.weblinguist.ai");
		let host =
			HostContext::from_json("null", location.clone()).expect("Null context should parse.");

		assert!(!host.is_embedded());
		assert_eq!(host.platform(), None);

		let host = HostContext::from_json(r#"{"isEmbedded":false,"platform":"shopify"}"#, location)
			.expect("Disabled embed context should parse.");

		assert!(!host.is_embedded());
		assert_eq!(host.platform(), None);
	}

	#[test]
	fn platform_discriminator_defaults_to_wordpress() {
		let location = PageLocation::new("blog.example.com");
		let wordpress = HostContext::from_json(
			concat!(
				r#"{"isEmbedded":"1","#,
				r#""ajaxUrl":"https://blog.example.com/wp-admin/admin-ajax.php","licenseId":42}"#,
			),
			location.clone(),
		)
		.expect("WordPress context should parse.");

		assert_eq!(wordpress.platform(), Some(Platform::WordPress));
		assert_eq!(wordpress.stored_license_id(), Some("42"));
		assert_eq!(wordpress.store_domain(), "blog.example.com");

		let other = HostContext::from_json(r#"{"isEmbedded":true,"platform":"wix"}"#, location)
			.expect("Unknown platform context should parse.");

		assert_eq!(other.platform(), Some(Platform::WordPress));
	}

	#[test]
	fn shopify_store_domain_comes_from_shop_domain() {
		let bridge = Url::parse("https://api.weblinguist.ai/shopify/bridge")
			.expect("Bridge URL fixture should parse.");
		let host = HostContext::embedded(
			EmbedContext::shopify(bridge, "mystore.myshopify.com"),
			PageLocation::new("api.weblinguist.ai"),
		);

		assert_eq!(host.platform(), Some(Platform::Shopify));
		assert_eq!(host.store_domain(), "mystore.myshopify.com");
	}

	#[test]
	fn malformed_context_is_a_config_error() {
		let err = HostContext::from_json("{\"ajaxUrl\": 5}", PageLocation::new("localhost"))
			.expect_err("Malformed context should be rejected.");

		assert!(matches!(err, ConfigError::InvalidHostContext(_)));
	}

	#[test]
	fn sso_token_is_redacted_in_debug() {
		let embed = EmbedContext::default().with_sso_token("sso-secret");

		assert!(!format!("{embed:?}").contains("sso-secret"));
	}

	#[test]
	fn recording_navigator_keeps_history() {
		let navigator = RecordingNavigator::default();
		let url = Url::parse("https://weblinguist.ai/login/").expect("Login URL should parse.");

		navigator.hard_redirect(&url);
		navigator.reload();

		assert_eq!(navigator.redirects(), vec![url]);
		assert_eq!(navigator.reloads(), 1);
	}
}
