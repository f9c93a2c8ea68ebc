//! Request descriptions consumed by [`ApiClient`](crate::api::ApiClient).

// crates.io
use reqwest::Method;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	environment::{EnvironmentConfig, Service},
	error::ConfigError,
};

/// A single backend call, relative to one of the service base URLs.
///
/// `Debug` output lists query and header names only and never prints the body or bearer, since
/// login calls carry plaintext passwords.
#[derive(Clone)]
pub struct ApiRequest {
	pub(crate) method: Method,
	pub(crate) service: Service,
	pub(crate) path: String,
	pub(crate) query: Vec<(String, String)>,
	pub(crate) headers: Vec<(String, String)>,
	pub(crate) body: Option<Value>,
	pub(crate) bearer: Option<TokenSecret>,
}
impl ApiRequest {
	/// Creates a request for `path` under `service`.
	pub fn new(method: Method, service: Service, path: impl Into<String>) -> Self {
		Self {
			method,
			service,
			path: path.into(),
			query: Vec::new(),
			headers: Vec::new(),
			body: None,
			bearer: None,
		}
	}

	/// `GET` request.
	pub fn get(service: Service, path: impl Into<String>) -> Self {
		Self::new(Method::GET, service, path)
	}

	/// `POST` request.
	pub fn post(service: Service, path: impl Into<String>) -> Self {
		Self::new(Method::POST, service, path)
	}

	/// `PUT` request.
	pub fn put(service: Service, path: impl Into<String>) -> Self {
		Self::new(Method::PUT, service, path)
	}

	/// `DELETE` request.
	pub fn delete(service: Service, path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, service, path)
	}

	/// Sets a JSON body.
	pub fn json(mut self, body: Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Appends a query parameter.
	pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((name.into(), value.into()));

		self
	}

	/// Appends a header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Scopes the call to an account (`X-Account-ID`).
	pub fn account(self, account_id: impl Display) -> Self {
		self.header("X-Account-ID", account_id.to_string())
	}

	/// Sends this request with `token` as bearer instead of the client default.
	pub fn bearer(mut self, token: TokenSecret) -> Self {
		self.bearer = Some(token);

		self
	}

	/// HTTP method.
	pub fn method(&self) -> &Method {
		&self.method
	}

	/// Resolves the absolute URL against `environment`.
	pub fn url(&self, environment: &EnvironmentConfig) -> Result<Url, ConfigError> {
		let mut url = environment.endpoint(self.service, &self.path)?;

		if !self.query.is_empty() {
			url.query_pairs_mut().extend_pairs(self.query.iter());
		}

		Ok(url)
	}
}
impl Debug for ApiRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiRequest")
			.field("method", &self.method)
			.field("service", &self.service)
			.field("path", &self.path)
			.field("query", &pair_names(&self.query))
			.field("headers", &pair_names(&self.headers))
			.field("body", &self.body.as_ref().map(|_| "<redacted>"))
			.field("bearer", &self.bearer.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

fn pair_names(pairs: &[(String, String)]) -> Vec<&str> {
	pairs.iter().map(|(name, _)| name.as_str()).collect()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::environment::EnvironmentOverrides;

	#[test]
	fn url_joins_service_path_and_query() {
		let overrides = EnvironmentOverrides::default();
		let environment = EnvironmentConfig::resolve("dashboard.weblinguist.ai", &overrides);
		let request = ApiRequest::get(Service::Sso, "user/check").query("token", "one time");

		assert_eq!(
			request.url(&environment).expect("Request URL should resolve.").as_str(),
			"https://api.weblinguist.ai/vff-sso/user/check?token=one+time"
		);
	}

	#[test]
	fn account_scope_sets_header() {
		let request = ApiRequest::get(Service::App, "licenses").account(17);

		assert_eq!(request.headers, vec![("X-Account-ID".to_owned(), "17".to_owned())]);
	}

	#[test]
	fn debug_output_hides_credentials() {
		let request = ApiRequest::post(Service::Sso, "user/embedded-login")
			.json(json!({ "email": "ada@example.com", "password": "hunter2" }))
			.query("token", "one-time-code")
			.bearer(TokenSecret::new("tok-1"));
		let rendered = format!("{request:?}");

		assert!(rendered.contains("user/embedded-login"));
		assert!(rendered.contains("\"token\""));

		for secret in ["hunter2", "ada@example.com", "one-time-code", "tok-1"] {
			assert!(!rendered.contains(secret), "{secret} leaked into {rendered}");
		}
	}
}
