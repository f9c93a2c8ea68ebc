// crates.io
use httpmock::prelude::*;
// self
use weblinguist_dashboard::{
	_preludet::*,
	auth::{AUTH_TOKEN_KEY, EmbeddedCredentials, Session, SessionObserver, TokenSecret},
	host::{EmbedContext, HostContext, PageLocation},
};

#[derive(Default)]
struct CountingObserver {
	seen: Mutex<Vec<bool>>,
}
impl SessionObserver for CountingObserver {
	fn session_changed(&self, session: &Session) {
		self.seen.lock().push(session.is_authenticated);
	}
}

fn wordpress_host(server: &MockServer) -> HostContext {
	let ajax_url = Url::parse(&server.url("/wp-admin/admin-ajax.php"))
		.expect("Mock AJAX endpoint should parse successfully.");

	HostContext::embedded(
		EmbedContext::wordpress(ajax_url).with_nonces("save-nonce", "clear-nonce", "license-nonce"),
		PageLocation::new("shop.example.com"),
	)
}

async fn mock_csrf(server: &MockServer) {
	server
		.mock_async(|when, then| {
			when.method(GET).path("/sanctum/csrf-cookie");
			then.status(204);
		})
		.await;
}

#[tokio::test]
async fn embedded_login_persists_and_mirrors_token() {
	let server = MockServer::start_async().await;

	mock_csrf(&server).await;

	let _login = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/vff-sso/user/embedded-login")
				.json_body(json!({ "email": "ada@example.com", "password": "hunter2" }));
			then.status(200).json_body(json!({
				"success": true,
				"token": "tok-1",
				"user": { "id": 1, "name": "Ada Lovelace" },
				"current_account_id": 9,
				"current_account_role": "Admin"
			}));
		})
		.await;
	let mirror = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/wp-admin/admin-ajax.php")
				.form_urlencoded_tuple("action", "webliaiw_save_auth_token")
				.form_urlencoded_tuple("token", "tok-1")
				.form_urlencoded_tuple("nonce", "save-nonce");
			then.status(200).json_body(json!({ "success": true }));
		})
		.await;
	let (dashboard, _navigator, storage) =
		build_test_dashboard(&server.base_url(), wordpress_host(&server));
	let observer = Arc::new(CountingObserver::default());

	dashboard.auth().subscribe(observer.clone());
	dashboard
		.auth()
		.embedded_login(&EmbeddedCredentials::new("ada@example.com", "hunter2"))
		.await
		.expect("Embedded login should succeed.");

	assert!(dashboard.auth().is_authenticated());
	assert_eq!(dashboard.auth().session().user_initials(), "AL");
	assert_eq!(storage.snapshot(AUTH_TOKEN_KEY).as_deref(), Some("tok-1"));
	assert_eq!(
		dashboard.api().bearer().as_ref().map(|t| t.expose().to_owned()),
		Some("tok-1".into())
	);
	assert_eq!(*observer.seen.lock(), vec![true]);

	mirror.assert_calls_async(1).await;
}

#[tokio::test]
async fn rejected_embedded_login_clears_local_state() {
	let server = MockServer::start_async().await;

	mock_csrf(&server).await;

	let _login = server
		.mock_async(|when, then| {
			when.method(POST).path("/vff-sso/user/embedded-login");
			then.status(200)
				.json_body(json!({ "success": false, "message": "Invalid credentials." }));
		})
		.await;
	let (dashboard, _navigator, storage) =
		build_test_dashboard(&server.base_url(), wordpress_host(&server));

	storage.seed(AUTH_TOKEN_KEY, "stale-token");

	let err = dashboard
		.auth()
		.embedded_login(&EmbeddedCredentials::new("ada@example.com", "wrong"))
		.await
		.expect_err("Rejected login should fail.");

	assert!(matches!(err, Error::Rejected { ref message } if message == "Invalid credentials."));
	assert!(!dashboard.auth().is_authenticated());
	assert!(storage.snapshot(AUTH_TOKEN_KEY).is_none());
	assert!(dashboard.api().bearer().is_none());
}

#[tokio::test]
async fn embedded_logout_cleans_up_even_when_the_server_fails() {
	let server = MockServer::start_async().await;
	let _logout = server
		.mock_async(|when, then| {
			when.method(GET).path("/vff-sso/user/embedded-logout");
			then.status(500).json_body(json!({ "message": "Boom." }));
		})
		.await;
	let clear = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/wp-admin/admin-ajax.php")
				.form_urlencoded_tuple("action", "webliaiw_clear_auth_token")
				.form_urlencoded_tuple("nonce", "clear-nonce");
			then.status(200).json_body(json!({ "success": true }));
		})
		.await;
	let (dashboard, navigator, storage) =
		build_test_dashboard(&server.base_url(), wordpress_host(&server));

	storage.seed(AUTH_TOKEN_KEY, "tok-1");
	dashboard.api().set_bearer(Some(TokenSecret::new("tok-1")));
	dashboard.auth().logout().await;

	assert!(storage.snapshot(AUTH_TOKEN_KEY).is_none());
	assert!(dashboard.api().bearer().is_none());
	assert!(!dashboard.auth().is_authenticated());
	assert_eq!(navigator.reloads(), 1);
	assert!(navigator.redirects().is_empty());

	clear.assert_calls_async(1).await;
}

#[tokio::test]
async fn standalone_logout_returns_to_login() {
	let server = MockServer::start_async().await;

	mock_csrf(&server).await;

	let logout = server
		.mock_async(|when, then| {
			when.method(GET).path("/vff-sso/user/logout");
			then.status(200).json_body(json!({ "success": true }));
		})
		.await;
	let (dashboard, navigator, _storage) =
		build_test_dashboard(&server.base_url(), standalone_host("dashboard.weblinguist.ai"));

	dashboard.auth().logout().await;

	assert_eq!(navigator.redirects(), vec![dashboard.environment().login_url.clone()]);
	assert!(!dashboard.auth().is_authenticated());

	logout.assert_calls_async(1).await;
}

#[tokio::test]
async fn embedded_session_falls_back_to_persisted_token() {
	let server = MockServer::start_async().await;
	let check = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/vff-sso/user/embedded-check")
				.header("authorization", "Bearer persisted");
			then.status(200).json_body(json!({
				"success": 1,
				"current_account_id": "9",
				"account": { "initial_onboard_complete": 0 }
			}));
		})
		.await;
	let (dashboard, _navigator, storage) =
		build_test_dashboard(&server.base_url(), wordpress_host(&server));

	storage.seed(AUTH_TOKEN_KEY, "persisted");

	assert!(dashboard.auth().check_session().await);

	let session = dashboard.auth().session();

	assert_eq!(session.current_account_id.map(|id| id.to_string()), Some("9".into()));
	assert!(!session.initial_onboard_complete);

	check.assert_calls_async(1).await;
}
