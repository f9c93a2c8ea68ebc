//! Authenticated backend client with CSRF, bearer, and session-expiry handling.
//!
//! Requests run in one of two mutually exclusive modes:
//!
//! - **Stateless**: a bearer token is attached (per request or the client-wide default set after
//!   an embedded login). No CSRF work happens.
//! - **Stateful**: no bearer, so the client relies on the session cookie. The CSRF cookie is
//!   bootstrapped once per client lifetime and its value is echoed in `X-XSRF-TOKEN` on every
//!   request, reads included.
//!
//! A 401 surfaces as [`Error::Unauthorized`] (and sends a standalone page to the login URL).
//! The first 419 forces a CSRF refresh and replays the request once; a second 419 surfaces as
//! [`Error::Csrf`].

mod metrics;
mod request;

pub use metrics::ApiMetrics;
pub use request::ApiRequest;

// crates.io
use reqwest::Method;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	environment::EnvironmentConfig,
	error::TransientError,
	host::Navigator,
	http::{HttpTransport, TransportRequest, TransportResponse},
	obs::{OpKind, OpOutcome, OpSpan, record_op_outcome, record_result},
};

const XSRF_COOKIE: &str = "XSRF-TOKEN";

/// Shared backend client; cheap to share behind an [`Arc`].
pub struct ApiClient {
	transport: Arc<dyn HttpTransport>,
	environment: Arc<EnvironmentConfig>,
	navigator: Arc<dyn Navigator>,
	embedded: bool,
	bearer: RwLock<Option<TokenSecret>>,
	csrf_ready: AsyncMutex<bool>,
	metrics: ApiMetrics,
}
impl ApiClient {
	/// Creates a client; `embedded` disables the login redirect on 401.
	pub fn new(
		transport: Arc<dyn HttpTransport>,
		environment: Arc<EnvironmentConfig>,
		navigator: Arc<dyn Navigator>,
		embedded: bool,
	) -> Self {
		Self {
			transport,
			environment,
			navigator,
			embedded,
			bearer: RwLock::new(None),
			csrf_ready: AsyncMutex::new(false),
			metrics: ApiMetrics::default(),
		}
	}

	/// Resolved environment the client talks to.
	pub fn environment(&self) -> &EnvironmentConfig {
		&self.environment
	}

	/// Transport used for every call.
	pub fn transport(&self) -> &Arc<dyn HttpTransport> {
		&self.transport
	}

	/// Recovery-path counters.
	pub fn metrics(&self) -> &ApiMetrics {
		&self.metrics
	}

	/// Installs (or clears) the default bearer token.
	pub fn set_bearer(&self, token: Option<TokenSecret>) {
		*self.bearer.write() = token;
	}

	/// Current default bearer token.
	pub fn bearer(&self) -> Option<TokenSecret> {
		self.bearer.read().clone()
	}

	/// Sends `request` and decodes the JSON body of a successful response.
	pub async fn request<T>(&self, request: ApiRequest) -> Result<T>
	where
		T: for<'de> Deserialize<'de>,
	{
		Ok(self.send(request).await?.json()?)
	}

	/// Sends `request` and returns the raw successful (2xx) response.
	pub async fn send(&self, request: ApiRequest) -> Result<TransportResponse> {
		let url = request.url(&self.environment)?;
		let mut csrf_retried = false;

		loop {
			let prepared = self.prepare(&request, url.clone()).await;
			let response = self.transport.send(prepared).await?;

			match response.status {
				200..=299 => return Ok(response),
				401 => {
					self.metrics.record_unauthorized();

					tracing::warn!(%url, "Backend rejected the session.");

					if !self.embedded {
						self.navigator.hard_redirect(&self.environment.login_url);
					}

					return Err(Error::Unauthorized);
				},
				419 if !csrf_retried => {
					csrf_retried = true;

					self.metrics.record_csrf_retry();

					if let Err(e) = self.refresh_csrf().await {
						tracing::error!(error = %e, "Failed to refresh the CSRF cookie.");

						return Err(Error::csrf());
					}
				},
				419 => {
					tracing::error!(%url, "CSRF retry failed, giving up.");

					return Err(Error::csrf());
				},
				status => return Err(classify_failure(status, &response)),
			}
		}
	}

	/// Fetches the CSRF cookie unless an earlier fetch already succeeded.
	///
	/// Concurrent callers wait on the same lock, so the bootstrap endpoint is hit once. A failed
	/// fetch is logged and left unmarked so the next stateful request tries again.
	pub async fn ensure_csrf(&self) {
		let mut ready = self.csrf_ready.lock().await;

		if *ready {
			return;
		}

		match self.fetch_csrf().await {
			Ok(()) => *ready = true,
			Err(e) => tracing::warn!(error = %e, "Failed to initialize the CSRF cookie."),
		}
	}

	/// Forces a fresh CSRF cookie fetch.
	pub async fn refresh_csrf(&self) -> Result<()> {
		let mut ready = self.csrf_ready.lock().await;

		*ready = false;

		self.fetch_csrf().await?;

		*ready = true;

		Ok(())
	}

	/// Decoded `XSRF-TOKEN` cookie value, if the backend has set one.
	pub fn xsrf_token(&self) -> Option<String> {
		let raw = self.transport.cookie(&self.environment.api_base_url, XSRF_COOKIE)?;

		Some(urlencoding::decode(&raw).map(|decoded| decoded.into_owned()).unwrap_or(raw))
	}

	/// Drops the `XSRF-TOKEN` cookie (standalone logout).
	pub fn expire_xsrf_cookie(&self) {
		self.transport.expire_cookie(&self.environment.api_base_url, XSRF_COOKIE);
	}

	async fn fetch_csrf(&self) -> Result<()> {
		let span = OpSpan::new(OpKind::Csrf, "fetch_csrf");

		self.metrics.record_csrf_fetch();
		record_op_outcome(OpKind::Csrf, OpOutcome::Attempt);

		let result = span.instrument(self.fetch_csrf_cookie()).await;

		record_result(OpKind::Csrf, &result);

		result
	}

	async fn fetch_csrf_cookie(&self) -> Result<()> {
		let request = TransportRequest::new(Method::GET, self.environment.csrf_url.clone())
			.header("Accept", "application/json")
			.header("X-Requested-With", "XMLHttpRequest");
		let response = self.transport.send(request).await?;

		if !response.is_success() {
			return Err(classify_failure(response.status, &response));
		}

		Ok(())
	}

	async fn prepare(&self, request: &ApiRequest, url: Url) -> TransportRequest {
		let mut prepared = TransportRequest::new(request.method.clone(), url)
			.header("Accept", "application/json");

		if let Some(body) = &request.body {
			prepared = prepared.header("Content-Type", "application/json").json(body.clone());
		}

		let bearer = request.bearer.clone().or_else(|| self.bearer());

		match bearer {
			Some(token) => {
				tracing::trace!("Bearer token present, sending stateless request.");

				prepared = prepared.header("Authorization", format!("Bearer {}", token.expose()));
			},
			None => {
				self.ensure_csrf().await;

				match self.xsrf_token() {
					Some(token) => prepared = prepared.header("X-XSRF-TOKEN", token),
					None => tracing::warn!("No CSRF token found for stateful request."),
				}
			},
		}

		prepared = prepared.header("X-Requested-With", "XMLHttpRequest");

		for (name, value) in &request.headers {
			prepared = prepared.header(name.clone(), value.clone());
		}

		prepared
	}
}
impl Debug for ApiClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("api_base_url", &self.environment.api_base_url.as_str())
			.field("embedded", &self.embedded)
			.field("bearer", &self.bearer.read().as_ref().map(|_| "<redacted>"))
			.finish_non_exhaustive()
	}
}

/// Maps a non-2xx, non-401/419 response onto the error taxonomy.
pub(crate) fn classify_failure(status: u16, response: &TransportResponse) -> Error {
	let body = response.json_value();
	let message = body
		.as_ref()
		.and_then(extract_message)
		.unwrap_or_else(|| format!("Request failed with status code {status}"));

	if status >= 500 {
		TransientError::Upstream { status, message }.into()
	} else {
		Error::Validation { status, message, body }
	}
}

/// Pulls a user-facing message out of `message`, `error`, or `error.message`.
pub fn extract_message(body: &Value) -> Option<String> {
	let pick = |value: Option<&Value>| value.and_then(Value::as_str).map(str::to_owned);

	pick(body.get("message"))
		.or_else(|| pick(body.get("error")))
		.or_else(|| pick(body.pointer("/error/message")))
		.filter(|message| !message.is_empty())
}
