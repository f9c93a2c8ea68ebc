//! Bearer token handling: the redacted secret wrapper and its persistence.

// self
use crate::{
	_prelude::*,
	bridge::{self, PlatformBridge},
	storage::ClientStorage,
};

/// Storage key holding the bearer token.
pub const AUTH_TOKEN_KEY: &str = "authToken";

/// Redacted token secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Keeps the bearer token in client storage and mirrors it to the host.
#[derive(Clone)]
pub struct TokenKeeper {
	storage: Arc<dyn ClientStorage>,
	bridge: Arc<dyn PlatformBridge>,
}
impl TokenKeeper {
	/// Creates a keeper over `storage`, mirroring writes through `bridge`.
	pub fn new(storage: Arc<dyn ClientStorage>, bridge: Arc<dyn PlatformBridge>) -> Self {
		Self { storage, bridge }
	}

	/// Persisted token, if any.
	pub async fn load(&self) -> Result<Option<TokenSecret>> {
		Ok(self.storage.get(AUTH_TOKEN_KEY).await?.filter(|t| !t.is_empty()).map(TokenSecret::new))
	}

	/// Replaces the stored token locally, then on the host (best-effort).
	pub async fn persist(&self, token: &TokenSecret) -> Result<()> {
		self.storage.set(AUTH_TOKEN_KEY, token.expose().to_owned()).await?;

		bridge::save_token_best_effort(self.bridge.as_ref(), token).await;

		Ok(())
	}

	/// Removes the locally stored token; the host copy is left alone.
	pub async fn clear(&self) -> Result<()> {
		Ok(self.storage.remove(AUTH_TOKEN_KEY).await?)
	}
}
impl Debug for TokenKeeper {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenKeeper").field("platform", &self.bridge.platform()).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{bridge::StandaloneBridge, storage::MemoryStorage};

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
	}

	#[tokio::test]
	async fn newer_token_supersedes_prior_value() {
		let storage = Arc::new(MemoryStorage::default());
		let keeper = TokenKeeper::new(storage.clone(), Arc::new(StandaloneBridge));

		keeper.persist(&TokenSecret::new("first")).await.expect("First persist should succeed.");
		keeper.persist(&TokenSecret::new("second")).await.expect("Second persist should succeed.");

		assert_eq!(
			keeper.load().await.expect("Load should succeed.").as_ref().map(TokenSecret::expose),
			Some("second")
		);

		keeper.clear().await.expect("Clear should succeed.");

		assert_eq!(storage.snapshot(AUTH_TOKEN_KEY), None);
	}
}
