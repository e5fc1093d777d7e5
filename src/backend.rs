use async_trait::async_trait;
use thiserror::Error;

use crate::types::{BenchmarkParams, DnsResultRecord, DownloadResultRecord, SpeedParams};

/// Failure of a whole measurement run.
///
/// Per-server problems become unusable result records instead; only
/// conditions that prevent the run from producing any records at all
/// surface here.
#[derive(Debug, Error)]
pub enum BackendError {
	#[error("invalid target: {0}")]
	InvalidTarget(String),
	#[error("no DNS servers configured")]
	NoServers,
	#[error("{0}")]
	Measurement(String),
}

/// The measurement engine as seen by the run coordinator: two
/// asynchronous operations that resolve to a record set or a failure.
#[async_trait]
pub trait MeasurementBackend: Send + Sync {
	async fn run_dns_benchmark(
		&self,
		params: &BenchmarkParams,
	) -> Result<Vec<DnsResultRecord>, BackendError>;

	async fn perform_download_speed_test(
		&self,
		params: &SpeedParams,
	) -> Result<Vec<DownloadResultRecord>, BackendError>;
}

/// Production backend: real lookups through hickory-resolver and real
/// downloads through reqwest, against a configured default server list.
pub struct LiveBackend {
	default_servers: Vec<String>,
}

impl LiveBackend {
	pub fn new(default_servers: Vec<String>) -> Self {
		Self { default_servers }
	}
}

#[async_trait]
impl MeasurementBackend for LiveBackend {
	async fn run_dns_benchmark(
		&self,
		params: &BenchmarkParams,
	) -> Result<Vec<DnsResultRecord>, BackendError> {
		crate::dns::run(params, &self.default_servers).await
	}

	async fn perform_download_speed_test(
		&self,
		params: &SpeedParams,
	) -> Result<Vec<DownloadResultRecord>, BackendError> {
		crate::speed::run(params, &self.default_servers).await
	}
}
