//! DNS verification and origin discovery for proxied (fully qualified URL) licenses.

// crates.io
use futures_util::future;
// self
use crate::{
	_prelude::*,
	api::ApiRequest,
	auth::LicenseId,
	environment::Service,
	stores::license::LicenseStore,
};

const DETECT_ORIGIN_FALLBACK: &str = "Failed to detect origin IP.";
const ORIGIN_HEALTH_FALLBACK: &str = "Failed to check origin health.";

/// Outcome of the last DNS verification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VerificationStatus {
	/// No check has run yet.
	#[default]
	Unverified,
	/// A check is in flight.
	Verifying,
	/// Records point at the proxy.
	Verified,
	/// Records are missing or wrong, or the check failed.
	Failed,
}

/// DNS setup progress of the license being configured.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DnsState {
	/// Last `data` payload of the DNS check; configuration status lands in its `status` key.
	pub check_data: Value,
	/// Verification outcome.
	pub verification: VerificationStatus,
	/// Origin IP found behind the domain.
	pub detected_origin_ip: Option<String>,
	/// Why origin detection failed.
	pub origin_detection_error: Option<String>,
	/// Last origin health payload.
	pub origin_health: Option<Value>,
	/// Why the health check failed.
	pub origin_health_error: Option<String>,
}

/// Independent results of [`LicenseStore::perform_dns_checks`].
#[derive(Debug)]
pub struct DnsCheckReport {
	/// DNS record verification.
	pub dns: Result<Value>,
	/// Origin IP detection.
	pub origin: Result<Value>,
	/// Origin health check.
	pub health: Result<Value>,
}

impl LicenseStore {
	/// Verifies the DNS records of `license_id`.
	pub async fn check_license_dns(&self, license_id: &LicenseId) -> Result<Value> {
		self.state.write().dns.verification = VerificationStatus::Verifying;

		let result: Result<Value> = self.dns_request(license_id, "dns-check").await;
		let mut state = self.state.write();

		match &result {
			Ok(body) =>
				if let Some(data) = body.get("data").filter(|data| !data.is_null()) {
					state.dns.check_data = data.clone();
					state.dns.verification =
						if body.get("status").and_then(Value::as_str) == Some("verified") {
							VerificationStatus::Verified
						} else {
							VerificationStatus::Failed
						};
				},
			Err(e) => {
				tracing::error!(error = %e, %license_id, "DNS check failed.");

				state.dns.verification = VerificationStatus::Failed;
			},
		}

		result
	}

	/// Detects the origin IP behind the license domain.
	pub async fn detect_license_origin(&self, license_id: &LicenseId) -> Result<Value> {
		self.state.write().dns.origin_detection_error = None;

		let result: Result<Value> = self.dns_request(license_id, "dns-check/detect-origin").await;
		let mut state = self.state.write();

		match &result {
			Ok(body) if succeeded(body) =>
				state.dns.detected_origin_ip =
					body.pointer("/data/detected_ip").and_then(Value::as_str).map(str::to_owned),
			Ok(body) => state.dns.origin_detection_error = nested_error(Some(body)),
			Err(e) =>
				state.dns.origin_detection_error =
					Some(failure_message(e).unwrap_or_else(|| DETECT_ORIGIN_FALLBACK.into())),
		}

		result
	}

	/// Probes the origin server's health.
	pub async fn check_license_origin_health(&self, license_id: &LicenseId) -> Result<Value> {
		self.state.write().dns.origin_health_error = None;

		let result: Result<Value> = self.dns_request(license_id, "dns-check/origin-health").await;
		let mut state = self.state.write();

		match &result {
			Ok(body) if succeeded(body) => state.dns.origin_health = body.get("data").cloned(),
			Ok(body) => state.dns.origin_health_error = nested_error(Some(body)),
			Err(e) =>
				state.dns.origin_health_error =
					Some(failure_message(e).unwrap_or_else(|| ORIGIN_HEALTH_FALLBACK.into())),
		}

		result
	}

	/// Starts proxy configuration for the license domain.
	pub async fn start_dns_configuration(&self, license_id: &LicenseId) -> Result<Value> {
		self.configure_dns(license_id, "dns-check/start-configuration").await
	}

	/// Stops proxy configuration for the license domain.
	pub async fn stop_dns_configuration(&self, license_id: &LicenseId) -> Result<Value> {
		self.configure_dns(license_id, "dns-check/stop-configuration").await
	}

	/// Runs the DNS check, origin detection, and health check concurrently.
	///
	/// One failing check does not cancel or mask the others.
	pub async fn perform_dns_checks(&self, license_id: &LicenseId) -> DnsCheckReport {
		let (dns, origin, health) = future::join3(
			self.check_license_dns(license_id),
			self.detect_license_origin(license_id),
			self.check_license_origin_health(license_id),
		)
		.await;

		DnsCheckReport { dns, origin, health }
	}

	async fn configure_dns(&self, license_id: &LicenseId, action: &str) -> Result<Value> {
		let body: Value = self.dns_request(license_id, action).await?;

		if let Some(status) = body.pointer("/data/status") {
			let mut state = self.state.write();

			if !state.dns.check_data.is_object() {
				state.dns.check_data = json!({});
			}

			state.dns.check_data["status"] = status.clone();
		}

		Ok(body)
	}

	async fn dns_request(&self, license_id: &LicenseId, action: &str) -> Result<Value> {
		self.account_request(
			ApiRequest::post(Service::App, format!("licenses/{license_id}/{action}"))
				.json(json!({})),
		)
		.await
	}
}

fn succeeded(body: &Value) -> bool {
	body.get("success").is_some_and(crate::de::is_truthy)
}

fn nested_error(body: Option<&Value>) -> Option<String> {
	body?.pointer("/error/message").and_then(Value::as_str).map(str::to_owned)
}

fn failure_message(error: &Error) -> Option<String> {
	match error {
		Error::Validation { body, .. } => nested_error(body.as_ref()),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn failure_message_reads_nested_error() {
		let error = Error::Validation {
			status: 422,
			message: "Unprocessable".into(),
			body: Some(json!({ "error": { "message": "Domain has no A record." } })),
		};

		assert_eq!(failure_message(&error).as_deref(), Some("Domain has no A record."));
		assert_eq!(failure_message(&Error::Unauthorized), None);
	}

	#[test]
	fn dns_state_starts_unverified() {
		let state = DnsState::default();

		assert_eq!(state.verification, VerificationStatus::Unverified);
		assert!(state.check_data.is_null());
	}
}
