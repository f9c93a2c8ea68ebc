// crates.io
use httpmock::prelude::*;
// self
use weblinguist_dashboard::{
	_preludet::*,
	api::ApiRequest,
	auth::TokenSecret,
	dashboard::Dashboard,
	environment::Service,
	error::{CSRF_REFRESH_MESSAGE, Error},
	http::{HttpTransport, TransportFuture, TransportRequest, TransportResponse},
};

/// Mints a new `XSRF-TOKEN` per bootstrap call and rejects the first API call with 419.
#[derive(Default)]
struct RotatingCsrfTransport {
	minted: Mutex<u32>,
	cookie: Mutex<Option<String>>,
	sent_tokens: Mutex<Vec<Option<String>>>,
}
impl HttpTransport for RotatingCsrfTransport {
	fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			if request.url.path() == "/sanctum/csrf-cookie" {
				let mut minted = self.minted.lock();

				*minted += 1;
				*self.cookie.lock() = Some(format!("t{}", *minted));

				return Ok(TransportResponse { status: 204, body: Vec::new() });
			}

			let mut sent = self.sent_tokens.lock();

			sent.push(request.header_value("X-XSRF-TOKEN").map(ToOwned::to_owned));

			let response = if sent.len() == 1 {
				TransportResponse {
					status: 419,
					body: br#"{"message":"CSRF token mismatch."}"#.to_vec(),
				}
			} else {
				TransportResponse { status: 200, body: br#"{"ok":true}"#.to_vec() }
			};

			Ok(response)
		})
	}

	fn cookie(&self, _url: &Url, name: &str) -> Option<String> {
		self.cookie.lock().clone().filter(|_| name == "XSRF-TOKEN")
	}

	fn expire_cookie(&self, _url: &Url, _name: &str) {
		*self.cookie.lock() = None;
	}
}

#[tokio::test]
async fn csrf_cookie_bootstraps_once_for_concurrent_requests() {
	let server = MockServer::start_async().await;
	let (dashboard, _navigator, _storage) =
		build_test_dashboard(&server.base_url(), standalone_host("dashboard.weblinguist.ai"));
	let csrf = server
		.mock_async(|when, then| {
			when.method(GET).path("/sanctum/csrf-cookie");
			then.status(204).header("set-cookie", "XSRF-TOKEN=csrf%3Dvalue; Path=/");
		})
		.await;
	let accounts = server
		.mock_async(|when, then| {
			when.method(GET).path("/vff-sso/user/accounts");
			then.status(200).json_body(json!({ "accounts": [] }));
		})
		.await;
	let api = dashboard.api();
	let (first, second, third) = tokio::join!(
		api.send(ApiRequest::get(Service::Sso, "user/accounts")),
		api.send(ApiRequest::get(Service::Sso, "user/accounts")),
		api.send(ApiRequest::get(Service::Sso, "user/accounts")),
	);

	first.expect("First concurrent request should succeed.");
	second.expect("Second concurrent request should succeed.");
	third.expect("Third concurrent request should succeed.");
	csrf.assert_calls_async(1).await;
	accounts.assert_calls_async(3).await;

	assert_eq!(api.metrics().csrf_fetches(), 1);
}

#[tokio::test]
async fn bearer_requests_skip_csrf_bootstrap() {
	let server = MockServer::start_async().await;
	let (dashboard, _navigator, _storage) =
		build_test_dashboard(&server.base_url(), standalone_host("dashboard.weblinguist.ai"));
	let csrf = server
		.mock_async(|when, then| {
			when.method(GET).path("/sanctum/csrf-cookie");
			then.status(204);
		})
		.await;
	let check = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/vff-sso/user/embedded-check")
				.header("authorization", "Bearer host-token");
			then.status(200).json_body(json!({ "success": true }));
		})
		.await;

	dashboard
		.api()
		.send(
			ApiRequest::get(Service::Sso, "user/embedded-check")
				.bearer(TokenSecret::new("host-token")),
		)
		.await
		.expect("Bearer request should succeed.");
	check.assert_calls_async(1).await;
	csrf.assert_calls_async(0).await;
}

#[tokio::test]
async fn repeated_csrf_mismatch_surfaces_refresh_error() {
	let server = MockServer::start_async().await;
	let (dashboard, _navigator, _storage) =
		build_test_dashboard(&server.base_url(), standalone_host("dashboard.weblinguist.ai"));
	let csrf = server
		.mock_async(|when, then| {
			when.method(GET).path("/sanctum/csrf-cookie");
			then.status(204);
		})
		.await;
	let licenses = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/licenses/free");
			then.status(419).json_body(json!({ "message": "CSRF token mismatch." }));
		})
		.await;
	let err = dashboard
		.api()
		.send(ApiRequest::post(Service::App, "licenses/free").json(json!({})))
		.await
		.expect_err("Second 419 should surface as an error.");

	assert!(err.is_csrf_error());
	assert_eq!(err.to_string(), CSRF_REFRESH_MESSAGE);
	assert_eq!(err.status(), Some(419));

	licenses.assert_calls_async(2).await;
	csrf.assert_calls_async(2).await;

	assert_eq!(dashboard.api().metrics().csrf_retries(), 1);
}

#[tokio::test]
async fn csrf_mismatch_is_replayed_once_with_a_fresh_token() {
	let transport = Arc::new(RotatingCsrfTransport::default());
	let dashboard = Dashboard::builder(
		environment_for("http://127.0.0.1:8080"),
		standalone_host("dashboard.weblinguist.ai"),
	)
	.transport(transport.clone())
	.build()
	.expect("Dashboard with a fake transport should build successfully.");
	let value: Value = dashboard
		.api()
		.request(ApiRequest::post(Service::App, "licenses/free").json(json!({})))
		.await
		.expect("Replayed request should succeed.");

	assert_eq!(value, json!({ "ok": true }));
	assert_eq!(*transport.minted.lock(), 2);
	assert_eq!(*transport.sent_tokens.lock(), vec![Some("t1".into()), Some("t2".into())]);
	assert_eq!(dashboard.api().metrics().csrf_fetches(), 2);
	assert_eq!(dashboard.api().metrics().csrf_retries(), 1);
}

#[tokio::test]
async fn unauthorized_standalone_request_redirects_to_login() {
	let server = MockServer::start_async().await;
	let (dashboard, navigator, _storage) =
		build_test_dashboard(&server.base_url(), standalone_host("dashboard.weblinguist.ai"));
	let _csrf = server
		.mock_async(|when, then| {
			when.method(GET).path("/sanctum/csrf-cookie");
			then.status(204);
		})
		.await;
	let _accounts = server
		.mock_async(|when, then| {
			when.method(GET).path("/vff-sso/user/accounts");
			then.status(401).json_body(json!({ "message": "Unauthenticated." }));
		})
		.await;
	let err = dashboard
		.auth()
		.user_accounts()
		.await
		.expect_err("401 should surface as an error.");

	assert!(matches!(err, Error::Unauthorized));
	assert_eq!(navigator.redirects(), vec![dashboard.environment().login_url.clone()]);
	assert_eq!(dashboard.api().metrics().unauthorized(), 1);
}

#[tokio::test]
async fn validation_failures_keep_backend_message() {
	let server = MockServer::start_async().await;
	let (dashboard, navigator, _storage) =
		build_test_dashboard(&server.base_url(), standalone_host("dashboard.weblinguist.ai"));
	let _csrf = server
		.mock_async(|when, then| {
			when.method(GET).path("/sanctum/csrf-cookie");
			then.status(204);
		})
		.await;
	let _rejected = server
		.mock_async(|when, then| {
			when.method(POST).path("/vff-sso/user/switch-account");
			then.status(422).json_body(json!({ "error": { "message": "Account is locked." } }));
		})
		.await;
	let err = dashboard
		.auth()
		.switch_account(&"9".parse().expect("Account identifier should parse."))
		.await
		.expect_err("422 should surface as an error.");

	match err {
		Error::Validation { status, message, .. } => {
			assert_eq!(status, 422);
			assert_eq!(message, "Account is locked.");
		},
		other => panic!("Unexpected error: {other:?}."),
	}

	assert!(navigator.redirects().is_empty());
}
