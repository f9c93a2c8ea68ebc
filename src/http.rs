//! Transport primitives for dashboard API calls and host bridge requests.
//!
//! The module exposes [`HttpTransport`] so hosts can plug in their own HTTP stack (a
//! browser fetch shim, a recording fake) while the API client keeps ownership of the
//! CSRF, bearer, and status-code handling. The transport also owns the cookie jar,
//! because the stateful session mode reads the `XSRF-TOKEN` cookie that the backend
//! sets on its bootstrap endpoint.

// std
use std::time::Duration as StdDuration;
// crates.io
use reqwest::{Method, cookie::{CookieStore, Jar}};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransientError, TransportError},
};

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks able to execute dashboard requests.
///
/// Implementations must keep cookies between calls so the session cookie and the
/// `XSRF-TOKEN` cookie issued by the backend are replayed automatically.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes `request` and returns the raw response, whatever its status.
	fn send(&self, request: TransportRequest) -> TransportFuture<'_>;

	/// Reads the raw value of cookie `name` as it would be sent to `url`.
	fn cookie(&self, url: &Url, name: &str) -> Option<String>;

	/// Expires cookie `name` for `url`.
	fn expire_cookie(&self, url: &Url, name: &str);
}

/// Request body variants used by the dashboard.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
	/// JSON payload (`Content-Type: application/json`).
	Json(Value),
	/// URL-encoded form payload (WordPress admin-ajax).
	Form(Vec<(String, String)>),
}

/// Transport-agnostic request description.
///
/// `Debug` drops the query, header values, and body, which carry tokens and passwords.
#[derive(Clone)]
pub struct TransportRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute target URL, query included.
	pub url: Url,
	/// Header name/value pairs.
	pub headers: Vec<(String, String)>,
	/// Optional body.
	pub body: Option<RequestBody>,
	/// Upper bound for the whole exchange; transports should fail the request once it elapses.
	pub timeout: Option<StdDuration>,
}
impl TransportRequest {
	/// Creates a request without headers or body.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: Vec::new(), body: None, timeout: None }
	}

	/// Appends a header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Sets a JSON body.
	pub fn json(mut self, body: Value) -> Self {
		self.body = Some(RequestBody::Json(body));

		self
	}

	/// Sets a form body.
	pub fn form<I, K, V>(mut self, fields: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let fields = fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect();

		self.body = Some(RequestBody::Form(fields));

		self
	}

	/// Bounds the request duration.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Looks up a header value by case-insensitive name.
	pub fn header_value(&self, name: &str) -> Option<&str> {
		self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
	}
}
impl Debug for TransportRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let mut url = self.url.clone();

		url.set_query(None);

		f.debug_struct("TransportRequest")
			.field("method", &self.method)
			.field("url", &url.as_str())
			.field("headers", &self.headers.iter().map(|(name, _)| name).collect::<Vec<_>>())
			.field("body", &self.body.as_ref().map(|_| "<redacted>"))
			.field("timeout", &self.timeout)
			.finish()
	}
}

/// Raw response returned by a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
	/// HTTP status code.
	pub status: u16,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl TransportResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Decodes the body as JSON; an empty body decodes as `null`.
	pub fn json<T>(&self) -> Result<T, TransientError>
	where
		T: for<'de> Deserialize<'de>,
	{
		let bytes: &[u8] = if self.body.iter().all(u8::is_ascii_whitespace) {
			b"null"
		} else {
			&self.body
		};
		let mut deserializer = serde_json::Deserializer::from_slice(bytes);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| TransientError::ResponseParse { source, status: Some(self.status) })
	}

	/// Decodes the body as loose JSON, yielding `None` when it is not JSON at all.
	pub fn json_value(&self) -> Option<Value> {
		serde_json::from_slice(&self.body).ok()
	}
}

/// Default transport backed by reqwest with a shared cookie jar.
#[derive(Clone)]
pub struct ReqwestTransport {
	client: ReqwestClient,
	jar: Arc<Jar>,
}
impl ReqwestTransport {
	/// Builds a client that stores and replays cookies.
	pub fn new() -> Result<Self, ConfigError> {
		let jar = Arc::new(Jar::default());
		let client = ReqwestClient::builder().cookie_provider(jar.clone()).build()?;

		Ok(Self { client, jar })
	}

	/// Wraps an existing client; `jar` must be the cookie provider the client was built with.
	pub fn with_client(client: ReqwestClient, jar: Arc<Jar>) -> Self {
		Self { client, jar }
	}

	/// Cookie jar shared with the underlying client.
	pub fn jar(&self) -> &Arc<Jar> {
		&self.jar
	}
}
impl Debug for ReqwestTransport {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ReqwestTransport(..)")
	}
}
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let TransportRequest { method, url, headers, body, timeout } = request;
			let mut builder = self.client.request(method, url.clone());

			if let Some(timeout) = timeout {
				builder = builder.timeout(timeout);
			}

			for (name, value) in &headers {
				builder = builder.header(name.as_str(), value.as_str());
			}

			builder = match body {
				Some(RequestBody::Json(value)) => builder.json(&value),
				Some(RequestBody::Form(fields)) => builder.form(&fields),
				None => builder,
			};

			let response =
				builder.send().await.map_err(|e| TransportError::network(&url, e))?;
			let status = response.status().as_u16();
			let body =
				response.bytes().await.map_err(|e| TransportError::network(&url, e))?.to_vec();

			Ok(TransportResponse { status, body })
		})
	}

	fn cookie(&self, url: &Url, name: &str) -> Option<String> {
		let header = self.jar.cookies(url)?;

		find_cookie(header.to_str().ok()?, name)
	}

	fn expire_cookie(&self, url: &Url, name: &str) {
		self.jar.add_cookie_str(&format!("{name}=; Max-Age=0; Path=/"), url);
	}
}

/// Extracts cookie `name` from a `Cookie` header value.
pub fn find_cookie(header: &str, name: &str) -> Option<String> {
	header.split(';').find_map(|pair| {
		let (key, value) = pair.trim().split_once('=')?;

		(key == name).then(|| value.to_owned())
	})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn find_cookie_picks_exact_name() {
		let header = "laravel_session=abc; XSRF-TOKEN=tok%3D%3D; XSRF-TOKEN-OLD=zzz";

		assert_eq!(find_cookie(header, "XSRF-TOKEN").as_deref(), Some("tok%3D%3D"));
		assert_eq!(find_cookie(header, "missing"), None);
	}

	#[test]
	fn empty_body_decodes_as_null() {
		let response = TransportResponse { status: 204, body: Vec::new() };
		let value: Value = response.json().expect("Empty body should decode as null.");

		assert!(value.is_null());
		assert!(response.is_success());
	}

	#[test]
	fn malformed_body_reports_path_and_status() {
		#[derive(Debug, Deserialize)]
		struct Shape {
			#[allow(dead_code)]
			items: Vec<u32>,
		}

		let response = TransportResponse { status: 200, body: br#"{"items":[1,"x"]}"#.to_vec() };
		let err = response.json::<Shape>().expect_err("Mismatched body should fail.");

		match err {
			TransientError::ResponseParse { source, status } => {
				assert_eq!(status, Some(200));
				assert_eq!(source.path().to_string(), "items[1]");
			},
			other => panic!("Unexpected error: {other:?}"),
		}
	}

	#[test]
	fn request_header_lookup_is_case_insensitive() {
		let url = Url::parse("https://api.weblinguist.ai/api/licenses")
			.expect("Request URL fixture should parse.");
		let request = TransportRequest::new(Method::GET, url).header("X-Account-ID", "7");

		assert_eq!(request.header_value("x-account-id"), Some("7"));
	}

	#[test]
	fn request_debug_redacts_secrets() {
		let url = Url::parse("https://shop.example.com/wp-admin/admin-ajax.php?token=secret-query")
			.expect("Request URL fixture should parse.");
		let request = TransportRequest::new(Method::POST, url)
			.header("Authorization", "Bearer secret-bearer")
			.form([("token", "secret-form")]);
		let rendered = format!("{request:?}");

		assert!(rendered.contains("admin-ajax.php"));
		assert!(rendered.contains("Authorization"));

		for secret in ["secret-query", "secret-bearer", "secret-form"] {
			assert!(!rendered.contains(secret), "{secret} leaked into {rendered}");
		}
	}

	#[test]
	fn reqwest_transport_reads_and_expires_cookies() {
		let transport = ReqwestTransport::new().expect("Transport should build.");
		let url = Url::parse("https://api.weblinguist.ai/").expect("Cookie URL should parse.");

		transport.jar().add_cookie_str("XSRF-TOKEN=abc%3D; Path=/", &url);

		assert_eq!(transport.cookie(&url, "XSRF-TOKEN").as_deref(), Some("abc%3D"));

		transport.expire_cookie(&url, "XSRF-TOKEN");

		assert_eq!(transport.cookie(&url, "XSRF-TOKEN"), None);
	}
}
