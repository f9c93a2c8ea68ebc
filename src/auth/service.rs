//! Session lifecycle: checking, logging in and out, and switching accounts.

// self
use crate::{
	_prelude::*,
	api::{ApiClient, ApiRequest},
	auth::{AccountId, AuthResponse, Session, SessionObserver, TokenKeeper, TokenSecret},
	bridge::{self, PlatformBridge},
	environment::Service,
	host::{HostContext, Navigator},
	obs::{OpKind, OpOutcome, OpSpan, record_op_outcome, record_result},
};

/// Credentials posted to the embedded login endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct EmbeddedCredentials {
	/// Login email.
	pub email: String,
	/// Password.
	pub password: String,
}
impl EmbeddedCredentials {
	/// Creates credentials.
	pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
		Self { email: email.into(), password: password.into() }
	}
}
impl Debug for EmbeddedCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("EmbeddedCredentials")
			.field("email", &self.email)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// Registration form submitted from an embedded host.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Registration {
	/// Form fields (name, email, password, confirmation, site details).
	#[serde(flatten)]
	pub fields: BTreeMap<String, Value>,
}
impl Registration {
	/// Adds a form field.
	pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.fields.insert(name.into(), value.into());

		self
	}
}

/// Social identity providers that can be linked to an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SocialProvider {
	/// Google.
	Google,
	/// Microsoft.
	Microsoft,
}
impl SocialProvider {
	/// Path segment used by the identity API.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Google => "google",
			Self::Microsoft => "microsoft",
		}
	}
}

/// Owns the session and every operation that changes it.
pub struct Auth {
	api: Arc<ApiClient>,
	host: Arc<HostContext>,
	bridge: Arc<dyn PlatformBridge>,
	tokens: TokenKeeper,
	navigator: Arc<dyn Navigator>,
	session: RwLock<Session>,
	observers: RwLock<Vec<Arc<dyn SessionObserver>>>,
}
impl Auth {
	/// Creates the session owner; the session starts unauthenticated.
	pub fn new(
		api: Arc<ApiClient>,
		host: Arc<HostContext>,
		bridge: Arc<dyn PlatformBridge>,
		tokens: TokenKeeper,
		navigator: Arc<dyn Navigator>,
	) -> Self {
		Self {
			api,
			host,
			bridge,
			tokens,
			navigator,
			session: RwLock::new(Session::default()),
			observers: RwLock::new(Vec::new()),
		}
	}

	/// Snapshot of the current session.
	pub fn session(&self) -> Session {
		self.session.read().clone()
	}

	/// Whether the backend accepted the session.
	pub fn is_authenticated(&self) -> bool {
		self.session.read().is_authenticated
	}

	/// Account the user is acting on.
	pub fn current_account_id(&self) -> Option<AccountId> {
		self.session.read().current_account_id.clone()
	}

	/// Registers an observer notified after every session change.
	pub fn subscribe(&self, observer: Arc<dyn SessionObserver>) {
		self.observers.write().push(observer);
	}

	/// Validates the session with the backend; every failure leaves the session cleared.
	///
	/// Embedded pages authenticate with the host's SSO token (or the persisted token when the
	/// host sent none); standalone pages rely on the session cookie plus any one-time URL token.
	pub async fn check_session(&self) -> bool {
		let span = OpSpan::new(OpKind::SessionCheck, "check_session");

		record_op_outcome(OpKind::SessionCheck, OpOutcome::Attempt);

		let result = span.instrument(self.fetch_session()).await;

		record_result(OpKind::SessionCheck, &result);

		match result {
			Ok(response) if response.success => {
				self.replace_session(Session::from_response(&response));

				tracing::debug!(
					email = ?response.user.as_ref().and_then(|u| u.email.as_deref()),
					"Session check succeeded."
				);

				true
			},
			Ok(_) => {
				tracing::debug!("Session check reported no active session.");

				self.replace_session(Session::default());

				false
			},
			Err(e) => {
				tracing::error!(error = %e, status = ?e.status(), "Session check failed.");

				self.replace_session(Session::default());

				false
			},
		}
	}

	/// Logs in from an embedded host and persists the issued token.
	///
	/// Any failure clears the stored token, the default bearer, and the session.
	pub async fn embedded_login(&self, credentials: &EmbeddedCredentials) -> Result<AuthResponse> {
		let span = OpSpan::new(OpKind::Login, "embedded_login");

		record_op_outcome(OpKind::Login, OpOutcome::Attempt);

		let result = span
			.instrument(self.authenticate(
				ApiRequest::post(Service::Sso, "user/embedded-login").json(json!(credentials)),
				"Embedded login failed.",
				None,
			))
			.await;

		record_result(OpKind::Login, &result);

		if result.is_err() {
			if let Err(e) = self.tokens.clear().await {
				tracing::error!(error = %e, "Failed to clear the stored auth token.");
			}

			self.api.set_bearer(None);
			self.replace_session(Session::default());
		}

		result
	}

	/// Registers a new user from an embedded host; onboarding starts incomplete.
	pub async fn embedded_register(&self, registration: &Registration) -> Result<AuthResponse> {
		let span = OpSpan::new(OpKind::Login, "embedded_register");
		let mut payload = registration.fields.clone();

		payload.insert("from".into(), json!("embedded"));
		record_op_outcome(OpKind::Login, OpOutcome::Attempt);

		let result = span
			.instrument(self.authenticate(
				ApiRequest::post(Service::Sso, "users/register").json(json!(payload)),
				"Embedded registration failed.",
				Some(false),
			))
			.await;

		record_result(OpKind::Login, &result);

		result
	}

	/// Ends the session; cleanup runs even when the backend call fails.
	pub async fn logout(&self) {
		let span = OpSpan::new(OpKind::Logout, "logout");

		record_op_outcome(OpKind::Logout, OpOutcome::Attempt);
		span.instrument(async {
			if self.host.is_embedded() {
				self.logout_embedded().await;
			} else {
				self.logout_standalone().await;
			}
		})
		.await;
		record_op_outcome(OpKind::Logout, OpOutcome::Success);
	}

	/// Accounts the user belongs to.
	pub async fn user_accounts(&self) -> Result<Value> {
		self.api.request(ApiRequest::get(Service::Sso, "user/accounts")).await.inspect_err(|e| {
			tracing::error!(error = %e, "Failed to get accounts.");
		})
	}

	/// Switches the current account; the session follows on success.
	pub async fn switch_account(&self, account_id: &AccountId) -> Result<AuthResponse> {
		let response: AuthResponse = self
			.api
			.request(
				ApiRequest::post(Service::Sso, "user/switch-account")
					.json(json!({ "account_id": account_id })),
			)
			.await
			.inspect_err(|e| tracing::error!(error = %e, "Failed to switch account."))?;

		if response.success {
			self.update_session(|session| {
				session.user = response.user.clone();
				session.current_account_id = response.current_account_id.clone();
				session.current_account_role = response.current_account_role.clone();
			});
		}

		Ok(response)
	}

	/// Redirect URL that links `provider` to the signed-in user.
	pub fn social_link_url(&self, provider: SocialProvider) -> Result<Url> {
		let user_id = self
			.session
			.read()
			.user
			.as_ref()
			.and_then(|user| user.id.clone())
			.ok_or(Error::Unauthorized)?;
		let environment = self.api.environment();
		let mut url = environment
			.endpoint(Service::Sso, &format!("user/{}/redirect", provider.as_str()))?;

		url.query_pairs_mut()
			.append_pair("app_id", environment.app_id.as_deref().unwrap_or_default())
			.append_pair("user_id", &user_id);

		Ok(url)
	}

	/// Marks first onboarding as done (after a purchase or plan change).
	pub fn mark_onboarding_complete(&self) {
		self.update_session(|session| session.initial_onboard_complete = true);
	}

	async fn fetch_session(&self) -> Result<AuthResponse> {
		if self.host.is_embedded() {
			let token = match self.host.sso_token() {
				Some(token) => Some(TokenSecret::new(token)),
				None => self.tokens.load().await?,
			};

			// The validated token stays the default bearer for later calls.
			self.api.set_bearer(token.clone());

			let mut request = ApiRequest::get(Service::Sso, "user/embedded-check");

			if let Some(token) = token {
				request = request.bearer(token);
			}

			self.api.request(request).await
		} else {
			let mut request = ApiRequest::get(Service::Sso, "user/check");

			if let Some(token) = &self.host.location.one_time_token {
				request = request.query("token", token.as_str());
			}

			self.api.request(request).await
		}
	}

	async fn authenticate(
		&self,
		request: ApiRequest,
		fallback_message: &str,
		onboarded: Option<bool>,
	) -> Result<AuthResponse> {
		let response: AuthResponse = self.api.request(request).await?;

		if !response.success {
			return Err(Error::Rejected {
				message: response.message.clone().unwrap_or_else(|| fallback_message.to_owned()),
			});
		}

		let token = response.token.clone().filter(|t| !t.is_empty()).map(TokenSecret::new);
		let mut session = Session::from_response(&response);

		if let Some(onboarded) = onboarded {
			session.initial_onboard_complete = onboarded;
		}
		if let Some(token) = &token {
			self.api.set_bearer(Some(token.clone()));
		}

		self.replace_session(session);

		if let Some(token) = &token {
			self.tokens.persist(token).await?;
		}

		Ok(response)
	}

	async fn logout_embedded(&self) {
		if let Err(e) = self.api.send(ApiRequest::get(Service::Sso, "user/embedded-logout")).await {
			tracing::error!(error = %e, "Embedded logout error.");
		}

		bridge::clear_token_best_effort(self.bridge.as_ref()).await;

		if let Err(e) = self.tokens.clear().await {
			tracing::error!(error = %e, "Failed to clear the stored auth token.");
		}

		self.api.set_bearer(None);
		self.replace_session(Session::default());
		self.navigator.reload();
	}

	async fn logout_standalone(&self) {
		if let Err(e) = self.api.send(ApiRequest::get(Service::Sso, "user/logout")).await {
			tracing::error!(error = %e, "Logout error.");
		}

		self.replace_session(Session::default());
		self.api.expire_xsrf_cookie();
		self.navigator.hard_redirect(&self.api.environment().login_url);
	}

	fn replace_session(&self, session: Session) {
		self.update_session(|current| *current = session);
	}

	fn update_session<F>(&self, f: F)
	where
		F: FnOnce(&mut Session),
	{
		let snapshot = {
			let mut guard = self.session.write();

			f(&mut guard);

			guard.clone()
		};
		let observers = self.observers.read().clone();

		for observer in observers {
			observer.session_changed(&snapshot);
		}
	}
}
impl Debug for Auth {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Auth")
			.field("embedded", &self.host.is_embedded())
			.field("session", &*self.session.read())
			.finish_non_exhaustive()
	}
}
