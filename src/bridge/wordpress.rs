//! WordPress bridge: form posts to `admin-ajax.php` guarded by plugin nonces.

// crates.io
use reqwest::Method;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	bridge::{BridgeError, BridgeFuture, HOST_REQUEST_TIMEOUT, LicensePayload, PlatformBridge},
	host::{EmbedContext, Platform},
	http::{HttpTransport, TransportRequest, TransportResponse},
};

const SAVE_TOKEN_ACTION: &str = "webliaiw_save_auth_token";
const CLEAR_TOKEN_ACTION: &str = "webliaiw_clear_auth_token";
const SAVE_LICENSE_ACTION: &str = "webliaiw_save_license_key";

/// Talks to the WordPress plugin's AJAX handlers.
pub struct WordPressBridge {
	transport: Arc<dyn HttpTransport>,
	ajax_url: Option<Url>,
	save_token_nonce: Option<String>,
	clear_token_nonce: Option<String>,
	save_license_nonce: Option<String>,
}
impl WordPressBridge {
	/// Captures the AJAX endpoint and nonces from the host context.
	pub fn new(transport: Arc<dyn HttpTransport>, embed: &EmbedContext) -> Self {
		let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());

		Self {
			transport,
			ajax_url: embed.ajax_url.clone(),
			save_token_nonce: non_empty(&embed.save_token_nonce),
			clear_token_nonce: non_empty(&embed.clear_token_nonce),
			save_license_nonce: non_empty(&embed.save_license_key_nonce),
		}
	}

	async fn post(
		&self,
		ajax_url: &Url,
		fields: Vec<(&'static str, String)>,
	) -> Result<TransportResponse, BridgeError> {
		let request = TransportRequest::new(Method::POST, ajax_url.clone())
			.form(fields)
			.timeout(HOST_REQUEST_TIMEOUT);

		Ok(self.transport.send(request).await?)
	}
}
impl Debug for WordPressBridge {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("WordPressBridge").field("ajax_url", &self.ajax_url).finish_non_exhaustive()
	}
}
impl PlatformBridge for WordPressBridge {
	fn platform(&self) -> Option<Platform> {
		Some(Platform::WordPress)
	}

	fn save_token<'a>(&'a self, token: &'a TokenSecret) -> BridgeFuture<'a> {
		Box::pin(async move {
			let ajax_url =
				self.ajax_url.as_ref().ok_or(BridgeError::MissingConfig { field: "ajaxUrl" })?;
			let response = self
				.post(ajax_url, vec![
					("action", SAVE_TOKEN_ACTION.to_owned()),
					("token", token.expose().to_owned()),
					("nonce", self.save_token_nonce.clone().unwrap_or_default()),
				])
				.await?;

			if !response.is_success() {
				return Err(BridgeError::Http { status: response.status });
			}

			Ok(response.json_value())
		})
	}

	fn clear_token(&self) -> BridgeFuture<'_> {
		Box::pin(async move {
			let (Some(ajax_url), Some(nonce)) = (&self.ajax_url, &self.clear_token_nonce) else {
				tracing::debug!("Skipping host token clear without AJAX configuration.");

				return Ok(None);
			};
			let response = self
				.post(ajax_url, vec![
					("action", CLEAR_TOKEN_ACTION.to_owned()),
					("nonce", nonce.clone()),
				])
				.await?;

			if !response.is_success() {
				return Err(BridgeError::Http { status: response.status });
			}

			Ok(response.json_value())
		})
	}

	fn save_license<'a>(&'a self, payload: &'a LicensePayload) -> BridgeFuture<'a> {
		Box::pin(async move {
			let (Some(ajax_url), Some(nonce)) = (&self.ajax_url, &self.save_license_nonce) else {
				return Err(BridgeError::MissingConfig { field: "saveLicenseKeyNonce" });
			};
			let response = self
				.post(ajax_url, vec![
					("action", SAVE_LICENSE_ACTION.to_owned()),
					("nonce", nonce.clone()),
					("license_id", payload.license_id.clone()),
					("license_key", payload.license_key.clone().unwrap_or_default()),
					("subscription_id", payload.subscription_id.clone().unwrap_or_default()),
				])
				.await?;

			if !response.is_success() {
				return Err(BridgeError::Http { status: response.status });
			}

			let body: Value = response.json()?;

			if !body.get("success").is_some_and(crate::de::is_truthy) {
				let message = body
					.pointer("/data/message")
					.and_then(Value::as_str)
					.filter(|m| !m.is_empty())
					.unwrap_or("Failed to save license to WordPress.")
					.to_owned();

				return Err(BridgeError::Rejected { message });
			}

			tracing::info!(
				host_message = ?body.pointer("/data/message"),
				"Saved license to WordPress."
			);

			Ok(Some(body))
		})
	}
}
