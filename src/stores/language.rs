//! Supported language and country catalogs with a week-long client cache.
//!
//! Catalogs are cached in [`ClientStorage`] next to a millisecond timestamp. A fresh cache
//! skips the network; a failed fetch falls back to the cache even when stale, and languages
//! finally fall back to a built-in list.

// self
use crate::{
	_prelude::*,
	api::{ApiClient, ApiRequest},
	environment::Service,
	storage::ClientStorage,
};

/// Storage key of the cached language catalog.
pub const LANGUAGES_CACHE_KEY: &str = "weblinguist_supported_languages";
/// Storage key of the language catalog timestamp.
pub const LANGUAGES_TIMESTAMP_KEY: &str = "weblinguist_supported_languages_timestamp";
/// Storage key of the cached country catalog.
pub const COUNTRIES_CACHE_KEY: &str = "weblinguist_supported_countries";
/// Storage key of the country catalog timestamp.
pub const COUNTRIES_TIMESTAMP_KEY: &str = "weblinguist_supported_countries_timestamp";
/// How long a cached catalog stays fresh.
pub const CACHE_TTL: Duration = Duration::days(7);

const AUTO_DETECT_CODE: &str = "auto";
const FALLBACK_LANGUAGES: [(&str, &str); 8] = [
	("en-US", "English (United States)"),
	("es-ES", "Spanish (Spain)"),
	("fr-FR", "French (France)"),
	("de-DE", "German (Germany)"),
	("pt-PT", "Portuguese (Portugal)"),
	("it-IT", "Italian (Italy)"),
	("ja", "Japanese"),
	("zh-Hans", "Simplified Chinese"),
];
const UNNORMALIZED_CODES: [&str; 6] = ["pt-br", "zh-hans", "zh-hant", "zh-cn", "zh-tw", "sr-latn"];

/// Supported language.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
	/// BCP 47 code.
	pub code: String,
	/// English name.
	pub name: String,
	/// SVG flag markup.
	#[serde(default)]
	pub flag: Option<String>,
	/// Dialing code of the primary country.
	#[serde(default, deserialize_with = "crate::de::string_or_number_opt")]
	pub phone_code: Option<String>,
}

/// Snapshot of the language store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LanguageState {
	/// Supported languages.
	pub languages: Vec<Language>,
	/// Supported countries.
	pub countries: Vec<Value>,
	/// Whether `languages` came from the API or a usable cache.
	pub initialized: bool,
	/// Last fetch failure.
	pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LanguagesEnvelope {
	#[serde(default, deserialize_with = "crate::de::truthy")]
	success: bool,
	#[serde(default)]
	languages: Option<Vec<Language>>,
}

#[derive(Debug, Deserialize)]
struct CountriesEnvelope {
	#[serde(default, deserialize_with = "crate::de::truthy")]
	success: bool,
	#[serde(default)]
	countries: Option<Vec<Value>>,
}

/// Language store.
pub struct LanguageStore {
	api: Arc<ApiClient>,
	storage: Arc<dyn ClientStorage>,
	state: RwLock<LanguageState>,
}
impl LanguageStore {
	/// Creates an empty store caching into `storage`.
	pub fn new(api: Arc<ApiClient>, storage: Arc<dyn ClientStorage>) -> Self {
		Self { api, storage, state: RwLock::new(LanguageState::default()) }
	}

	/// Snapshot of the store.
	pub fn state(&self) -> LanguageState {
		self.state.read().clone()
	}

	/// Loaded languages.
	pub fn languages(&self) -> Vec<Language> {
		self.state.read().languages.clone()
	}

	/// Loads supported languages from memory, a fresh cache, the API, a stale cache, or the
	/// built-in list, in that order; `force_refresh` skips memory and the fresh cache.
	pub async fn fetch_supported_languages(&self, force_refresh: bool) -> Vec<Language> {
		if !force_refresh {
			if self.state.read().initialized {
				return self.languages();
			}

			let cached = if self.is_fresh(LANGUAGES_TIMESTAMP_KEY).await {
				self.load_cached::<Language>(LANGUAGES_CACHE_KEY).await
			} else {
				None
			};

			if let Some(cached) = cached {
				tracing::debug!(count = cached.len(), "Loaded languages from cache.");

				return self.set_languages(cached, true);
			}
		}

		match self.request_languages().await {
			Ok(languages) => {
				self.save_cached(LANGUAGES_CACHE_KEY, LANGUAGES_TIMESTAMP_KEY, &languages).await;

				tracing::debug!(count = languages.len(), "Loaded languages from the API.");

				self.state.write().error = None;

				self.set_languages(languages, true)
			},
			Err(e) => {
				tracing::error!(error = %e, "Failed to fetch supported languages.");

				self.state.write().error = Some(e.to_string());

				match self.load_cached::<Language>(LANGUAGES_CACHE_KEY).await {
					Some(stale) => {
						tracing::debug!("Loaded stale language cache as fallback.");

						self.set_languages(stale, true)
					},
					None => {
						tracing::warn!("Using fallback languages.");

						self.set_languages(fallback_languages(), false)
					},
				}
			},
		}
	}

	/// Loads supported countries; same cache rules as languages, without a built-in list.
	pub async fn fetch_supported_countries(&self, force_refresh: bool) -> Vec<Value> {
		if !force_refresh {
			let loaded = self.state.read().countries.clone();

			if !loaded.is_empty() {
				return loaded;
			}

			let cached = if self.is_fresh(COUNTRIES_TIMESTAMP_KEY).await {
				self.load_cached::<Value>(COUNTRIES_CACHE_KEY).await
			} else {
				None
			};

			if let Some(cached) = cached {
				return self.set_countries(cached);
			}
		}

		match self.request_countries().await {
			Ok(countries) => {
				self.save_cached(COUNTRIES_CACHE_KEY, COUNTRIES_TIMESTAMP_KEY, &countries).await;

				self.set_countries(countries)
			},
			Err(e) => {
				tracing::error!(error = %e, "Failed to fetch supported countries.");

				self.state.write().error = Some(e.to_string());

				match self.load_cached::<Value>(COUNTRIES_CACHE_KEY).await {
					Some(stale) => self.set_countries(stale),
					None => self.state.read().countries.clone(),
				}
			},
		}
	}

	/// Drops the cached language catalog.
	pub async fn clear_cache(&self) {
		self.remove_cached(LANGUAGES_CACHE_KEY, LANGUAGES_TIMESTAMP_KEY).await;

		let mut state = self.state.write();

		state.languages.clear();
		state.initialized = false;
	}

	/// Drops the cached country catalog.
	pub async fn clear_country_cache(&self) {
		self.remove_cached(COUNTRIES_CACHE_KEY, COUNTRIES_TIMESTAMP_KEY).await;
		self.state.write().countries.clear();
	}

	/// Case-insensitive lookup among the loaded languages.
	pub fn language_by_code(&self, code: &str) -> Option<Language> {
		self.state
			.read()
			.languages
			.iter()
			.find(|language| language.code.eq_ignore_ascii_case(code))
			.cloned()
	}

	async fn request_languages(&self) -> Result<Vec<Language>> {
		let envelope: LanguagesEnvelope =
			self.api.request(ApiRequest::get(Service::App, "languages")).await?;

		match envelope.languages.filter(|_| envelope.success) {
			Some(languages) => Ok(languages
				.into_iter()
				.filter(|language| language.code != AUTO_DETECT_CODE)
				.collect()),
			None => Err(Error::Rejected { message: "Invalid response format from API.".into() }),
		}
	}

	async fn request_countries(&self) -> Result<Vec<Value>> {
		let envelope: CountriesEnvelope =
			self.api.request(ApiRequest::get(Service::App, "languages/countries")).await?;

		envelope.countries.filter(|_| envelope.success).ok_or_else(|| Error::Rejected {
			message: "Invalid response format for countries from API.".into(),
		})
	}

	fn set_languages(&self, languages: Vec<Language>, initialized: bool) -> Vec<Language> {
		let mut state = self.state.write();

		state.languages = languages.clone();
		state.initialized = initialized;

		languages
	}

	fn set_countries(&self, countries: Vec<Value>) -> Vec<Value> {
		self.state.write().countries = countries.clone();

		countries
	}

	async fn is_fresh(&self, timestamp_key: &str) -> bool {
		let stamp = match self.storage.get(timestamp_key).await {
			Ok(stamp) => stamp,
			Err(e) => {
				tracing::warn!(error = %e, key = timestamp_key, "Failed to read cache timestamp.");

				None
			},
		};

		stamp
			.and_then(|stamp| stamp.trim().parse::<i128>().ok())
			.is_some_and(|stamp| now_millis() - stamp < CACHE_TTL.whole_milliseconds())
	}

	async fn load_cached<T>(&self, key: &str) -> Option<Vec<T>>
	where
		T: for<'de> Deserialize<'de>,
	{
		let raw = match self.storage.get(key).await {
			Ok(raw) => raw?,
			Err(e) => {
				tracing::warn!(error = %e, key, "Failed to read cache.");

				return None;
			},
		};

		match serde_json::from_str::<Vec<T>>(&raw) {
			Ok(items) if !items.is_empty() => Some(items),
			Ok(_) => None,
			Err(e) => {
				tracing::warn!(error = %e, key, "Discarding malformed cache.");

				None
			},
		}
	}

	async fn save_cached<T>(&self, key: &str, timestamp_key: &str, items: &[T])
	where
		T: Serialize,
	{
		let raw = match serde_json::to_string(items) {
			Ok(raw) => raw,
			Err(e) => {
				tracing::warn!(error = %e, key, "Failed to encode cache.");

				return;
			},
		};

		if let Err(e) = self.storage.set(key, raw).await {
			tracing::warn!(error = %e, key, "Failed to save cache.");

			return;
		}
		if let Err(e) = self.storage.set(timestamp_key, now_millis().to_string()).await {
			tracing::warn!(error = %e, key = timestamp_key, "Failed to save cache timestamp.");
		}
	}

	async fn remove_cached(&self, key: &str, timestamp_key: &str) {
		for key in [key, timestamp_key] {
			if let Err(e) = self.storage.remove(key).await {
				tracing::warn!(error = %e, key, "Failed to clear cache.");
			}
		}
	}
}
impl Debug for LanguageStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LanguageStore").field("state", &*self.state.read()).finish_non_exhaustive()
	}
}

/// Base language of `code` (`en-US` becomes `en`); script and regional variants that change
/// the language (`pt-BR`, `zh-Hans`, ...) are kept whole. The result is lower case.
pub fn normalize_language_code(code: &str) -> String {
	let lower = code.to_ascii_lowercase();

	if UNNORMALIZED_CODES.contains(&lower.as_str()) {
		return lower;
	}

	lower.split('-').next().unwrap_or_default().to_owned()
}

fn fallback_languages() -> Vec<Language> {
	FALLBACK_LANGUAGES
		.iter()
		.map(|(code, name)| Language {
			code: (*code).into(),
			name: (*name).into(),
			flag: None,
			phone_code: None,
		})
		.collect()
}

fn now_millis() -> i128 {
	OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn codes_normalize_to_base_language() {
		assert_eq!(normalize_language_code("en-US"), "en");
		assert_eq!(normalize_language_code("es-mx"), "es");
		assert_eq!(normalize_language_code("zh-Hans"), "zh-hans");
		assert_eq!(normalize_language_code("pt-BR"), "pt-br");
		assert_eq!(normalize_language_code(""), "");
	}

	#[test]
	fn fallback_list_covers_common_languages() {
		let codes = fallback_languages().into_iter().map(|l| l.code).collect::<Vec<_>>();

		assert_eq!(
			codes,
			vec!["en-US", "es-ES", "fr-FR", "de-DE", "pt-PT", "it-IT", "ja", "zh-Hans"]
		);
	}
}
