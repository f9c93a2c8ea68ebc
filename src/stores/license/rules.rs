//! Phrase rules (glossary and do-not-translate entries) of a license.

// self
use crate::{
	_prelude::*,
	api::ApiRequest,
	auth::LicenseId,
	environment::Service,
	stores::{DataEnvelope, license::LicenseStore},
};

/// Rule as stored by the backend; the API speaks camelCase, the rest of the crate snake_case.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "snake_case", deserialize = "camelCase"))]
pub struct LicenseRule {
	/// Rule identifier.
	#[serde(deserialize_with = "crate::de::string_or_number")]
	pub id: String,
	/// Rule kind (for example `glossary` or `exclude`).
	#[serde(rename = "type", default)]
	pub kind: String,
	/// Phrase matched in the source page.
	#[serde(default)]
	pub source_phrase: String,
	/// Replacement phrase.
	#[serde(default)]
	pub target_phrase: Option<String>,
	/// Source language code.
	#[serde(default)]
	pub source_language: Option<String>,
	/// Target language code; `None` applies to every language.
	#[serde(default)]
	pub target_language: Option<String>,
	/// Whether the rule applies to all of the account's licenses.
	#[serde(default, deserialize_with = "crate::de::truthy")]
	pub global_rule: bool,
	/// Rule scope.
	#[serde(default)]
	pub scope: Option<String>,
	/// Whether the rule is enabled.
	#[serde(default, deserialize_with = "crate::de::truthy")]
	pub is_active: bool,
	/// Creation timestamp as sent by the backend.
	#[serde(default)]
	pub created_at: Option<String>,
	/// Last update timestamp as sent by the backend.
	#[serde(default)]
	pub updated_at: Option<String>,
}

/// Rule fields submitted on create and update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleDraft {
	/// Phrase matched in the source page.
	pub source_phrase: String,
	/// Replacement phrase.
	pub target_phrase: Option<String>,
	/// Target language code.
	pub target_language: Option<String>,
	/// Rule kind.
	#[serde(rename = "type")]
	pub kind: String,
	/// Applies to all licenses of the account.
	pub global_rule: bool,
	/// Rule scope.
	pub scope: String,
	/// Whether the rule is enabled.
	pub is_active: bool,
}
impl RuleDraft {
	/// Active, license-scoped rule.
	pub fn new(kind: impl Into<String>, source_phrase: impl Into<String>) -> Self {
		Self {
			source_phrase: source_phrase.into(),
			target_phrase: None,
			target_language: None,
			kind: kind.into(),
			global_rule: false,
			scope: "license".into(),
			is_active: true,
		}
	}

	/// Sets the replacement phrase and its language.
	pub fn target(mut self, phrase: impl Into<String>, language: impl Into<String>) -> Self {
		self.target_phrase = Some(phrase.into());
		self.target_language = Some(language.into());

		self
	}
}

#[derive(Debug, Deserialize)]
struct RulesEnvelope {
	#[serde(default, deserialize_with = "crate::de::null_default")]
	rules: Vec<LicenseRule>,
}

impl LicenseStore {
	/// Rules currently held by the store.
	pub fn license_rules(&self) -> Vec<LicenseRule> {
		self.state.read().rules.clone()
	}

	/// Fetches the rules of `license_id`.
	pub async fn get_license_rules(&self, license_id: &LicenseId) -> Result<Vec<LicenseRule>> {
		let envelope: RulesEnvelope = self
			.account_request(ApiRequest::get(Service::App, rules_path(license_id)))
			.await?;

		Ok(self.replace_rules(envelope.rules))
	}

	/// Creates a rule; the new rule goes to the front of the list.
	pub async fn add_license_rule(
		&self,
		license_id: &LicenseId,
		draft: &RuleDraft,
	) -> Result<Option<LicenseRule>> {
		let envelope: DataEnvelope<LicenseRule> = self
			.account_request(
				ApiRequest::post(Service::App, rules_path(license_id)).json(json!(draft)),
			)
			.await?;

		if let Some(rule) = &envelope.data {
			self.state.write().rules.insert(0, rule.clone());
		}

		Ok(envelope.data)
	}

	/// Updates a rule; the backend answers with the refreshed list.
	pub async fn update_license_rule(
		&self,
		license_id: &LicenseId,
		rule_id: &str,
		draft: &RuleDraft,
	) -> Result<Vec<LicenseRule>> {
		let envelope: RulesEnvelope = self
			.account_request(
				ApiRequest::put(Service::App, format!("{}/{rule_id}", rules_path(license_id)))
					.json(json!(draft)),
			)
			.await?;

		Ok(self.replace_rules(envelope.rules))
	}

	/// Deletes a rule; the backend answers with the remaining list.
	pub async fn delete_license_rule(
		&self,
		license_id: &LicenseId,
		rule_id: &str,
	) -> Result<Vec<LicenseRule>> {
		let envelope: RulesEnvelope = self
			.account_request(ApiRequest::delete(
				Service::App,
				format!("{}/{rule_id}", rules_path(license_id)),
			))
			.await?;

		Ok(self.replace_rules(envelope.rules))
	}

	fn replace_rules(&self, rules: Vec<LicenseRule>) -> Vec<LicenseRule> {
		self.state.write().rules = rules.clone();

		rules
	}
}

fn rules_path(license_id: &LicenseId) -> String {
	format!("license/{license_id}/rules")
}
