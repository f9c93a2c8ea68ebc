// crates.io
use httpmock::prelude::*;
// self
use weblinguist_dashboard::{
	_preludet::*,
	stores::language::{LANGUAGES_CACHE_KEY, LANGUAGES_TIMESTAMP_KEY},
};

fn now_millis() -> String {
	(OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000).to_string()
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
async fn api_languages_are_filtered_cached_and_memoized() {
	let server = MockServer::start_async().await;

	mock_csrf(&server).await;

	let languages = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/languages");
			then.status(200).json_body(json!({
				"success": true,
				"languages": [
					{ "code": "auto", "name": "Detect language" },
					{ "code": "en-US", "name": "English (United States)", "phone_code": 1 },
					{ "code": "fr-FR", "name": "French (France)" }
				]
			}));
		})
		.await;
	let (dashboard, _navigator, storage) =
		build_test_dashboard(&server.base_url(), standalone_host("dashboard.weblinguist.ai"));
	let store = dashboard.languages();
	let first = store.fetch_supported_languages(false).await;
	let second = store.fetch_supported_languages(false).await;

	assert_eq!(first.iter().map(|l| l.code.as_str()).collect::<Vec<_>>(), vec!["en-US", "fr-FR"]);
	assert_eq!(first, second);
	assert_eq!(first[0].phone_code.as_deref(), Some("1"));
	assert!(store.state().initialized);
	assert!(storage.snapshot(LANGUAGES_CACHE_KEY).is_some());
	assert!(storage.snapshot(LANGUAGES_TIMESTAMP_KEY).is_some());
	assert_eq!(store.language_by_code("FR-fr").map(|l| l.name), Some("French (France)".into()));

	languages.assert_calls_async(1).await;
}

#[tokio::test]
async fn fresh_cache_skips_the_network() {
	let server = MockServer::start_async().await;
	let languages = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/languages");
			then.status(200).json_body(json!({ "success": true, "languages": [] }));
		})
		.await;
	let (dashboard, _navigator, storage) =
		build_test_dashboard(&server.base_url(), standalone_host("dashboard.weblinguist.ai"));

	storage.seed(LANGUAGES_CACHE_KEY, r#"[{"code":"de-DE","name":"German (Germany)"}]"#);
	storage.seed(LANGUAGES_TIMESTAMP_KEY, now_millis());

	let loaded = dashboard.languages().fetch_supported_languages(false).await;

	assert_eq!(loaded.len(), 1);
	assert_eq!(loaded[0].code, "de-DE");

	languages.assert_calls_async(0).await;
}

#[tokio::test]
async fn failed_fetch_falls_back_to_stale_cache() {
	let server = MockServer::start_async().await;

	mock_csrf(&server).await;

	let languages = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/languages");
			then.status(503).json_body(json!({ "message": "Maintenance." }));
		})
		.await;
	let (dashboard, _navigator, storage) =
		build_test_dashboard(&server.base_url(), standalone_host("dashboard.weblinguist.ai"));

	storage.seed(LANGUAGES_CACHE_KEY, r#"[{"code":"ja","name":"Japanese"}]"#);
	storage.seed(LANGUAGES_TIMESTAMP_KEY, "0");

	let store = dashboard.languages();
	let loaded = store.fetch_supported_languages(false).await;

	assert_eq!(loaded.iter().map(|l| l.code.as_str()).collect::<Vec<_>>(), vec!["ja"]);
	assert!(store.state().initialized);
	assert!(store.state().error.is_some());

	languages.assert_calls_async(1).await;
}

#[tokio::test]
async fn failed_fetch_without_cache_uses_builtin_list() {
	let server = MockServer::start_async().await;

	mock_csrf(&server).await;

	let _languages = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/languages");
			then.status(200).json_body(json!({ "success": false }));
		})
		.await;
	let (dashboard, _navigator, _storage) =
		build_test_dashboard(&server.base_url(), standalone_host("dashboard.weblinguist.ai"));
	let store = dashboard.languages();
	let loaded = store.fetch_supported_languages(false).await;

	assert_eq!(loaded.len(), 8);
	assert_eq!(loaded[0].code, "en-US");
	assert!(!store.state().initialized);
	assert_eq!(
		store.state().error.as_deref(),
		Some("Invalid response format from API.")
	);
}

#[tokio::test]
async fn clearing_cache_forces_a_refetch() {
	let server = MockServer::start_async().await;

	mock_csrf(&server).await;

	let languages = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/languages");
			then.status(200).json_body(json!({
				"success": true,
				"languages": [{ "code": "it-IT", "name": "Italian (Italy)" }]
			}));
		})
		.await;
	let (dashboard, _navigator, storage) =
		build_test_dashboard(&server.base_url(), standalone_host("dashboard.weblinguist.ai"));
	let store = dashboard.languages();

	store.fetch_supported_languages(false).await;
	store.clear_cache().await;

	assert!(storage.snapshot(LANGUAGES_CACHE_KEY).is_none());
	assert!(store.languages().is_empty());

	store.fetch_supported_languages(false).await;
	languages.assert_calls_async(2).await;
}
