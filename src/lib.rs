//! Client core for the WebLinguist dashboard: environment resolution, a CSRF-aware API client,
//! the WordPress/Shopify credential bridge, the session routing guard, and the feature stores
//! layered on top of them.

#![deny(clippy::all)]
#![warn(missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod bridge;
pub mod dashboard;
pub mod environment;
pub mod error;
pub mod host;
pub mod http;
pub mod obs;
pub mod router;
pub mod storage;
pub mod stores;

mod de;

#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and builders shared by the integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::{
		dashboard::Dashboard,
		environment::{EnvironmentConfig, EnvironmentOverrides},
		host::{HostContext, PageLocation, RecordingNavigator},
		storage::MemoryStorage,
	};

	/// Resolves an environment whose every backend service lives under `base`.
	pub fn environment_for(base: &str) -> EnvironmentConfig {
		let base = Url::parse(base).expect("Mock server base URL should parse successfully.");
		let overrides = EnvironmentOverrides::default()
			.with_api_base_url(base.clone())
			.with_login_url(
				base.join("login/").expect("Login URL should join onto the mock server base."),
			);

		EnvironmentConfig::resolve("dashboard.weblinguist.ai", &overrides)
	}

	/// Builds a dashboard wired to in-memory storage and a recording navigator.
	pub fn build_test_dashboard(
		base: &str,
		host: HostContext,
	) -> (Dashboard, Arc<RecordingNavigator>, Arc<MemoryStorage>) {
		let navigator = Arc::new(RecordingNavigator::default());
		let storage = Arc::new(MemoryStorage::default());
		let dashboard = Dashboard::builder(environment_for(base), host)
			.navigator(navigator.clone())
			.storage(storage.clone())
			.build()
			.expect("Test dashboard should build successfully.");

		(dashboard, navigator, storage)
	}

	/// Standalone host context served from `hostname`.
	pub fn standalone_host(hostname: &str) -> HostContext {
		HostContext::standalone(PageLocation::new(hostname))
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::{Value, json};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
