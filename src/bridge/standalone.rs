//! Bridge used when no host embeds the dashboard.

// self
use crate::{
	auth::TokenSecret,
	bridge::{BridgeFuture, LicensePayload, PlatformBridge},
	host::Platform,
};

/// Every operation resolves immediately with `None`.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandaloneBridge;
impl PlatformBridge for StandaloneBridge {
	fn platform(&self) -> Option<Platform> {
		None
	}

	fn save_token<'a>(&'a self, _: &'a TokenSecret) -> BridgeFuture<'a> {
		Box::pin(async { Ok(None) })
	}

	fn clear_token(&self) -> BridgeFuture<'_> {
		Box::pin(async { Ok(None) })
	}

	fn save_license<'a>(&'a self, _: &'a LicensePayload) -> BridgeFuture<'a> {
		Box::pin(async { Ok(None) })
	}
}
