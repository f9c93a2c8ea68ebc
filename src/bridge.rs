//! Credential bridge between the dashboard and its embedding host.
//!
//! When the dashboard runs inside WordPress or Shopify, the bearer token and the selected
//! license must be saved back to the host so the host's storefront integration can use them.
//! Each platform gets one [`PlatformBridge`] implementation, chosen once at startup by
//! [`select`].

pub mod shopify;
pub mod standalone;
pub mod wordpress;

pub use shopify::ShopifyBridge;
pub use standalone::StandaloneBridge;
pub use wordpress::WordPressBridge;

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{TransientError, TransportError},
	host::{BoxedIssuerError, HostContext, Platform, SessionTokenIssuer},
	http::HttpTransport,
	obs::{OpKind, OpOutcome, record_op_outcome},
};

/// Upper bound for a single host call; a slow host must not hold up navigation.
pub const HOST_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(2);

/// Boxed future returned by [`PlatformBridge`] operations.
pub type BridgeFuture<'a> =
	Pin<Box<dyn Future<Output = Result<Option<Value>, BridgeError>> + 'a + Send>>;

/// Host persistence contract; `Ok(None)` means nothing was sent.
pub trait PlatformBridge
where
	Self: Send + Sync,
{
	/// Host platform served by this bridge, `None` for standalone.
	fn platform(&self) -> Option<Platform>;

	/// Saves the bearer token on the host.
	fn save_token<'a>(&'a self, token: &'a TokenSecret) -> BridgeFuture<'a>;

	/// Clears the bearer token from the host.
	fn clear_token(&self) -> BridgeFuture<'_>;

	/// Saves the selected license on the host.
	fn save_license<'a>(&'a self, payload: &'a LicensePayload) -> BridgeFuture<'a>;
}

/// License fields mirrored to the host.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicensePayload {
	/// License identifier.
	pub license_id: String,
	/// License key used by the storefront script.
	pub license_key: Option<String>,
	/// Subscription backing the license, if any.
	pub subscription_id: Option<String>,
}

/// Failures raised while talking to the host.
#[derive(Debug, ThisError)]
pub enum BridgeError {
	/// Host configuration lacks a required field.
	#[error("Missing host configuration: `{field}`.")]
	MissingConfig {
		/// Host configuration key.
		field: &'static str,
	},
	/// Host endpoint answered with a non-2xx status.
	#[error("Host endpoint returned HTTP {status}.")]
	Http {
		/// HTTP status code.
		status: u16,
	},
	/// Host endpoint answered `success: false`.
	#[error("{message}")]
	Rejected {
		/// Host-supplied message, or a platform default.
		message: String,
	},
	/// Request never completed.
	#[error(transparent)]
	Network(#[from] TransportError),
	/// No Shopify session-token issuer was supplied.
	#[error("Shopify App Bridge not available.")]
	TokenUnavailable,
	/// The Shopify session-token issuer failed.
	#[error("Failed to obtain a Shopify session token.")]
	TokenIssuer(#[source] BoxedIssuerError),
	/// Host endpoint answered with malformed JSON.
	#[error(transparent)]
	Decode(#[from] TransientError),
}

/// Picks the bridge for `host`; Shopify calls mint tokens through `issuer`.
pub fn select(
	host: &HostContext,
	transport: Arc<dyn HttpTransport>,
	issuer: Option<Arc<dyn SessionTokenIssuer>>,
) -> Arc<dyn PlatformBridge> {
	let bridge: Arc<dyn PlatformBridge> = match (host.platform(), host.embed()) {
		(Some(Platform::Shopify), Some(embed)) =>
			Arc::new(ShopifyBridge::new(transport, embed, issuer)),
		(Some(Platform::WordPress), Some(embed)) =>
			Arc::new(WordPressBridge::new(transport, embed)),
		_ => Arc::new(StandaloneBridge),
	};

	tracing::debug!(
		platform = bridge.platform().map(Platform::as_str).unwrap_or("standalone"),
		"Selected platform bridge."
	);

	bridge
}

/// Saves `token` on the host, logging instead of propagating failures.
pub async fn save_token_best_effort(bridge: &dyn PlatformBridge, token: &TokenSecret) {
	record_op_outcome(OpKind::Bridge, OpOutcome::Attempt);

	match bridge.save_token(token).await {
		Ok(response) => {
			record_op_outcome(OpKind::Bridge, OpOutcome::Success);

			tracing::debug!(?response, "Token storage response from host.");
		},
		Err(e) => {
			record_op_outcome(OpKind::Bridge, OpOutcome::Failure);

			tracing::error!(error = %e, "Failed to save auth token to host.");
		},
	}
}

/// Clears the host token, logging instead of propagating failures.
pub async fn clear_token_best_effort(bridge: &dyn PlatformBridge) {
	record_op_outcome(OpKind::Bridge, OpOutcome::Attempt);

	match bridge.clear_token().await {
		Ok(_) => record_op_outcome(OpKind::Bridge, OpOutcome::Success),
		Err(e) => {
			record_op_outcome(OpKind::Bridge, OpOutcome::Failure);

			tracing::error!(error = %e, "Failed to clear auth token from host.");
		},
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		host::{EmbedContext, PageLocation},
		http::ReqwestTransport,
	};

	fn transport() -> Arc<dyn HttpTransport> {
		Arc::new(ReqwestTransport::new().expect("Transport should build."))
	}

	#[test]
	fn select_matches_host_platform() {
		let location = PageLocation::new("blog.example.com");
		let ajax = Url::parse("https://blog.example.com/wp-admin/admin-ajax.php")
			.expect("Ajax URL fixture should parse.");
		let bridge_url =
			Url::parse("https://api.weblinguist.ai/shopify").expect("Bridge URL should parse.");

		assert_eq!(
			select(&HostContext::standalone(location.clone()), transport(), None).platform(),
			None
		);
		assert_eq!(
			select(
				&HostContext::embedded(EmbedContext::wordpress(ajax), location.clone()),
				transport(),
				None
			)
			.platform(),
			Some(Platform::WordPress)
		);
		assert_eq!(
			select(
				&HostContext::embedded(
					EmbedContext::shopify(bridge_url, "s.myshopify.com"),
					location,
				),
				transport(),
				None
			)
			.platform(),
			Some(Platform::Shopify)
		);
	}

	#[tokio::test]
	async fn best_effort_helpers_swallow_failures() {
		let bridge = ShopifyBridge::new(
			transport(),
			&EmbedContext::shopify(
				Url::parse("https://api.weblinguist.ai/shopify").expect("Bridge URL should parse."),
				"s.myshopify.com",
			),
			None,
		);

		save_token_best_effort(&bridge, &TokenSecret::new("token")).await;
		clear_token_best_effort(&bridge).await;
	}
}
