//! Shopify bridge: JSON posts to the backend's Shopify bridge endpoints.
//!
//! Every call carries a freshly minted App Bridge session token, so nothing long-lived is
//! cached here.

// crates.io
use reqwest::Method;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	bridge::{BridgeError, BridgeFuture, HOST_REQUEST_TIMEOUT, LicensePayload, PlatformBridge},
	host::{EmbedContext, Platform, SessionTokenIssuer},
	http::{HttpTransport, TransportRequest, TransportResponse},
};

/// Talks to `{bridge_url}/save-token`, `/clear-token`, and `/save-license`.
pub struct ShopifyBridge {
	transport: Arc<dyn HttpTransport>,
	issuer: Option<Arc<dyn SessionTokenIssuer>>,
	bridge_url: Option<Url>,
	shop_domain: String,
}
impl ShopifyBridge {
	/// Captures the bridge endpoint and shop domain from the host context.
	pub fn new(
		transport: Arc<dyn HttpTransport>,
		embed: &EmbedContext,
		issuer: Option<Arc<dyn SessionTokenIssuer>>,
	) -> Self {
		Self {
			transport,
			issuer,
			bridge_url: embed.bridge_url.clone(),
			shop_domain: embed.shop_domain.clone().unwrap_or_default(),
		}
	}

	fn endpoint(&self, action: &str) -> Result<Url, BridgeError> {
		let base =
			self.bridge_url.as_ref().ok_or(BridgeError::MissingConfig { field: "bridgeUrl" })?;

		Url::parse(&format!("{}/{action}", base.as_str().trim_end_matches('/')))
			.map_err(|_| BridgeError::MissingConfig { field: "bridgeUrl" })
	}

	async fn post(
		&self,
		action: &str,
		body: Option<Value>,
	) -> Result<TransportResponse, BridgeError> {
		let url = self.endpoint(action)?;
		let issuer = self.issuer.as_ref().ok_or(BridgeError::TokenUnavailable)?;
		let session_token = issuer.issue().await.map_err(BridgeError::TokenIssuer)?;
		let mut request = TransportRequest::new(Method::POST, url)
			.header("Content-Type", "application/json")
			.header("Authorization", format!("Bearer {session_token}"))
			.header("X-Shop-Domain", self.shop_domain.clone())
			.timeout(HOST_REQUEST_TIMEOUT);

		if let Some(body) = body {
			request = request.json(body);
		}

		Ok(self.transport.send(request).await?)
	}
}
impl Debug for ShopifyBridge {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ShopifyBridge")
			.field("bridge_url", &self.bridge_url)
			.field("shop_domain", &self.shop_domain)
			.finish_non_exhaustive()
	}
}
impl PlatformBridge for ShopifyBridge {
	fn platform(&self) -> Option<Platform> {
		Some(Platform::Shopify)
	}

	fn save_token<'a>(&'a self, token: &'a TokenSecret) -> BridgeFuture<'a> {
		Box::pin(async move {
			let response = self.post("save-token", Some(json!({ "token": token.expose() }))).await?;

			if !response.is_success() {
				return Err(BridgeError::Http { status: response.status });
			}

			Ok(response.json_value())
		})
	}

	fn clear_token(&self) -> BridgeFuture<'_> {
		Box::pin(async move {
			let response = self.post("clear-token", None).await?;

			if !response.is_success() {
				return Err(BridgeError::Http { status: response.status });
			}

			Ok(None)
		})
	}

	fn save_license<'a>(&'a self, payload: &'a LicensePayload) -> BridgeFuture<'a> {
		Box::pin(async move {
			let response = self
				.post(
					"save-license",
					Some(json!({
						"license_id": payload.license_id,
						"license_key": payload.license_key,
						"subscription_id": payload.subscription_id,
					})),
				)
				.await?;

			if !response.is_success() {
				return Err(BridgeError::Http { status: response.status });
			}

			let body: Value = response.json()?;

			if !body.get("success").is_some_and(crate::de::is_truthy) {
				let message = body
					.get("message")
					.and_then(Value::as_str)
					.filter(|m| !m.is_empty())
					.unwrap_or("Failed to save license to Shopify.")
					.to_owned();

				return Err(BridgeError::Rejected { message });
			}

			tracing::info!(
				host_message = ?body.get("message"),
				"Saved license to Shopify."
			);

			Ok(Some(body))
		})
	}
}
