use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which kind of measurement a run performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
	Dns,
	Download,
}

/// Lifecycle of a single run, observable through its handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
	Pending,
	Running,
	Completed,
	Cancelled,
	Failed,
}

/// One DNS server's benchmark outcome.
///
/// The timing fields are independently optional: older measurement paths
/// fill `resolution_time_ms` or `avg_time`, newer ones `latency_avg_ms`.
/// Display code resolves them through `metrics::canonical_latency`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DnsResultRecord {
	pub server_address: String,
	pub resolution_time_ms: Option<u64>,
	pub query_successful: bool,
	pub latency_avg_ms: Option<f64>,
	pub jitter_avg_ms: Option<f64>,
	pub success_percent: f64,
	/// None when the run did not say either way
	pub dnssec_enabled: Option<bool>,
	pub dnssec_validated: bool,
	pub ipv4_ips: Vec<String>,
	pub ipv6_ips: Vec<String>,
	pub error_msg: Option<String>,
	pub avg_time: Option<f64>,
}

/// One DNS server's download-bandwidth outcome
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadResultRecord {
	pub server_address: String,
	pub resolved_ip: Option<String>,
	pub duration_ms: u64,
	pub bytes_read: u64,
	pub bandwidth_mbps: f64,
	pub query_successful: bool,
	pub http_status: Option<u16>,
	pub error_msg: Option<String>,
}

/// Request parameters rejected before a run is started
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamError {
	#[error("target must not be empty")]
	EmptyTarget,
}

/// Immutable configuration for one DNS benchmark run
#[derive(Debug, Clone)]
pub struct BenchmarkParams {
	pub domain_or_ip: String,
	pub samples: u32,
	pub timeout_secs: u64,
	pub validate_dnssec: bool,
	pub warm_up: bool,
	/// Overrides the stored server list when present
	pub custom_servers: Option<Vec<String>>,
}

impl BenchmarkParams {
	/// Trim the target and clamp numeric fields to their minimums.
	///
	/// An empty (or whitespace-only) target is the one condition that
	/// rejects the request outright instead of being repaired.
	pub fn normalized(mut self) -> Result<Self, ParamError> {
		self.domain_or_ip = self.domain_or_ip.trim().to_string();
		if self.domain_or_ip.is_empty() {
			return Err(ParamError::EmptyTarget);
		}
		self.samples = self.samples.max(1);
		self.timeout_secs = self.timeout_secs.max(1);
		Ok(self)
	}
}

/// Immutable configuration for one download speed test run
#[derive(Debug, Clone)]
pub struct SpeedParams {
	pub url: String,
	pub duration_secs: u64,
	pub timeout_secs: u64,
	pub custom_servers: Option<Vec<String>>,
}

impl SpeedParams {
	pub fn normalized(mut self) -> Result<Self, ParamError> {
		self.url = self.url.trim().to_string();
		if self.url.is_empty() {
			return Err(ParamError::EmptyTarget);
		}
		self.duration_secs = self.duration_secs.max(1);
		self.timeout_secs = self.timeout_secs.max(1);
		Ok(self)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_benchmark_params_clamped() {
		let params = BenchmarkParams {
			domain_or_ip: "  example.com ".to_string(),
			samples: 0,
			timeout_secs: 0,
			validate_dnssec: false,
			warm_up: false,
			custom_servers: None,
		};
		let normalized = params.normalized().unwrap();
		assert_eq!(normalized.domain_or_ip, "example.com");
		assert_eq!(normalized.samples, 1);
		assert_eq!(normalized.timeout_secs, 1);
	}

	#[test]
	fn test_benchmark_params_empty_target() {
		let params = BenchmarkParams {
			domain_or_ip: "   ".to_string(),
			samples: 3,
			timeout_secs: 11,
			validate_dnssec: false,
			warm_up: false,
			custom_servers: None,
		};
		assert_eq!(params.normalized().unwrap_err(), ParamError::EmptyTarget);
	}

	#[test]
	fn test_speed_params_clamped() {
		let params = SpeedParams {
			url: " https://example.com/1mb.bin ".to_string(),
			duration_secs: 0,
			timeout_secs: 0,
			custom_servers: None,
		};
		let normalized = params.normalized().unwrap();
		assert_eq!(normalized.url, "https://example.com/1mb.bin");
		assert_eq!(normalized.duration_secs, 1);
		assert_eq!(normalized.timeout_secs, 1);
	}
}
