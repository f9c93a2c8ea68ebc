//! Session state and the backend payloads that create it.

// crates.io
use serde::{Deserializer, Serializer};
// self
use crate::{
	_prelude::*,
	auth::{AccountId, UserId},
};

/// Role the user holds within the current account.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AccountRole {
	/// Full access.
	Admin,
	/// May view but not change billing or membership (`Read Only`).
	ReadOnly,
	/// Any other role label the backend sends.
	Other(String),
}
impl AccountRole {
	/// Backend label for the role.
	pub fn as_str(&self) -> &str {
		match self {
			Self::Admin => "Admin",
			Self::ReadOnly => "Read Only",
			Self::Other(label) => label,
		}
	}

	/// Whether the role is barred from admin-only routes.
	pub fn is_read_only(&self) -> bool {
		matches!(self, Self::ReadOnly)
	}
}
impl From<&str> for AccountRole {
	fn from(label: &str) -> Self {
		match label {
			"Admin" => Self::Admin,
			"Read Only" => Self::ReadOnly,
			other => Self::Other(other.to_owned()),
		}
	}
}
impl Display for AccountRole {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl Serialize for AccountRole {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(self.as_str())
	}
}
impl<'de> Deserialize<'de> for AccountRole {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		Ok(Self::from(String::deserialize(deserializer)?.as_str()))
	}
}

/// Authenticated user profile.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
	/// User identifier.
	#[serde(default)]
	pub id: Option<UserId>,
	/// Display name.
	#[serde(default)]
	pub name: Option<String>,
	/// Login email.
	#[serde(default)]
	pub email: Option<String>,
	/// Feature flags (e.g. `free_signup`).
	#[serde(default, deserialize_with = "crate::de::null_default")]
	pub flags: Vec<String>,
	/// Remaining profile fields, passed through untouched.
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}
impl User {
	/// First and last initials in upper case; `?` when the name is missing or blank.
	pub fn initials(&self) -> String {
		let names = self
			.name
			.as_deref()
			.map(|name| name.split(' ').filter(|part| !part.is_empty()).collect::<Vec<_>>())
			.unwrap_or_default();
		let initial =
			|part: &str| part.chars().next().map(|c| c.to_uppercase().collect::<String>());

		match names.as_slice() {
			[] => "?".into(),
			[only] => initial(*only).unwrap_or_else(|| "?".into()),
			[first, .., last] => format!(
				"{}{}",
				initial(*first).unwrap_or_default(),
				initial(*last).unwrap_or_default()
			),
		}
	}

	/// Whether the user signed up through the free registration flow.
	pub fn is_free_user(&self) -> bool {
		self.flags.iter().any(|flag| flag == "free_signup")
	}
}

/// Client-side session; the default value is the unauthenticated session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Session {
	/// Authenticated user.
	pub user: Option<User>,
	/// Whether the backend accepted the session.
	pub is_authenticated: bool,
	/// Account the user is acting on.
	pub current_account_id: Option<AccountId>,
	/// Role within the current account.
	pub current_account_role: Option<AccountRole>,
	/// Whether the account finished its first onboarding.
	pub initial_onboard_complete: bool,
}
impl Session {
	/// Session built from a successful backend response.
	pub fn from_response(response: &AuthResponse) -> Self {
		Self {
			user: response.user.clone(),
			is_authenticated: true,
			current_account_id: response.current_account_id.clone(),
			current_account_role: response.current_account_role.clone(),
			initial_onboard_complete: response.onboard_complete(),
		}
	}

	/// Initials of the current user, `?` when signed out.
	pub fn user_initials(&self) -> String {
		self.user.as_ref().map(User::initials).unwrap_or_else(|| "?".into())
	}

	/// Whether the current user signed up through the free flow.
	pub fn is_free_user(&self) -> bool {
		self.user.as_ref().is_some_and(User::is_free_user)
	}
}

/// Account summary attached to session responses.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
	/// `0`/`false` while onboarding is pending; anything else (or absent) means complete.
	#[serde(default)]
	pub initial_onboard_complete: Option<Value>,
	/// Remaining account fields.
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}

/// Response shared by session check, login, registration, and account switching.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
	/// `1`/`true` on success.
	#[serde(default, deserialize_with = "crate::de::truthy")]
	pub success: bool,
	/// Bearer token (login and registration only).
	#[serde(default)]
	pub token: Option<String>,
	/// Authenticated user.
	#[serde(default)]
	pub user: Option<User>,
	/// Account the user is acting on.
	#[serde(default)]
	pub current_account_id: Option<AccountId>,
	/// Role within that account.
	#[serde(default)]
	pub current_account_role: Option<AccountRole>,
	/// Account summary.
	#[serde(default)]
	pub account: Option<AccountSummary>,
	/// Backend message, usually on failure.
	#[serde(default)]
	pub message: Option<String>,
}
impl AuthResponse {
	/// Onboarding flag; only an explicit `0`/`"0"`/`false` marks it incomplete.
	pub fn onboard_complete(&self) -> bool {
		match self.account.as_ref().and_then(|account| account.initial_onboard_complete.as_ref()) {
			Some(Value::Number(n)) => n.as_f64() != Some(0.),
			Some(Value::String(s)) => s.trim() != "0" && !s.trim().is_empty(),
			Some(Value::Bool(b)) => *b,
			_ => true,
		}
	}
}

/// Receives session changes; replaces the reactive store of a UI framework.
pub trait SessionObserver
where
	Self: Send + Sync,
{
	/// Called after every session mutation with the new state.
	fn session_changed(&self, session: &Session);
}
