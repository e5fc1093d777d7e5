use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::backend::MeasurementBackend;
use crate::types::{
	BenchmarkParams, DnsResultRecord, DownloadResultRecord, ParamError,
	RunKind, RunStatus, SpeedParams,
};

/// Everything the presentation layer reads: at most one run's outcome is
/// visible at a time, and it is always published as a whole.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
	pub active_id: Option<u64>,
	pub loading: bool,
	pub dns_results: Option<Vec<DnsResultRecord>>,
	pub download_results: Option<Vec<DownloadResultRecord>>,
	pub error: Option<String>,
}

/// Handle to a started run. Dropping it does not cancel anything; the
/// coordinator keeps publishing (or discarding) on its own.
#[derive(Debug)]
pub struct RunHandle {
	pub id: u64,
	pub kind: RunKind,
	status: watch::Receiver<RunStatus>,
	task: JoinHandle<()>,
}

impl RunHandle {
	pub fn status(&self) -> RunStatus {
		*self.status.borrow()
	}

	/// Wait for the backend call to resolve and return the terminal status.
	///
	/// Resolves even when the run was superseded or cancelled; the status
	/// is `Cancelled` in that case.
	pub async fn wait(self) -> RunStatus {
		let _ = self.task.await;
		*self.status.borrow()
	}
}

/// Owns run identity, cancellation, and supersession.
///
/// Run ids are allocated from a single counter, so they strictly
/// increase across both run kinds. Only the run whose id matches
/// `active_id` at resolution time may touch the view state; everything
/// else resolves into the void. That comparison is the whole
/// cancellation mechanism: nothing aborts the backend future.
pub struct RunCoordinator {
	backend: Arc<dyn MeasurementBackend>,
	next_id: AtomicU64,
	state: Arc<Mutex<ViewState>>,
}

impl RunCoordinator {
	pub fn new(backend: Arc<dyn MeasurementBackend>) -> Self {
		Self {
			backend,
			next_id: AtomicU64::new(0),
			state: Arc::new(Mutex::new(ViewState::default())),
		}
	}

	/// Start a DNS benchmark run. Returns immediately; any prior run is
	/// superseded on the spot. Rejects invalid params before a run id is
	/// allocated.
	pub fn start_dns(&self, params: BenchmarkParams) -> Result<RunHandle, ParamError> {
		let params = params.normalized()?;
		let id = self.begin_run();
		let (tx, rx) = watch::channel(RunStatus::Pending);
		let backend = self.backend.clone();
		let state = self.state.clone();
		let task = tokio::spawn(async move {
			let _ = tx.send(RunStatus::Running);
			let outcome = backend.run_dns_benchmark(&params).await;
			let mut view = state.lock().expect("view state lock poisoned");
			if view.active_id != Some(id) {
				info!("discarding stale dns result for run {}", id);
				let _ = tx.send(RunStatus::Cancelled);
				return;
			}
			match outcome {
				Ok(records) => {
					view.dns_results = Some(records);
					view.loading = false;
					let _ = tx.send(RunStatus::Completed);
				}
				Err(e) => {
					view.error = Some(e.to_string());
					view.loading = false;
					let _ = tx.send(RunStatus::Failed);
				}
			}
		});
		Ok(RunHandle { id, kind: RunKind::Dns, status: rx, task })
	}

	/// Start a download speed test run. Same contract as `start_dns`.
	pub fn start_download(&self, params: SpeedParams) -> Result<RunHandle, ParamError> {
		let params = params.normalized()?;
		let id = self.begin_run();
		let (tx, rx) = watch::channel(RunStatus::Pending);
		let backend = self.backend.clone();
		let state = self.state.clone();
		let task = tokio::spawn(async move {
			let _ = tx.send(RunStatus::Running);
			let outcome = backend.perform_download_speed_test(&params).await;
			let mut view = state.lock().expect("view state lock poisoned");
			if view.active_id != Some(id) {
				info!("discarding stale download result for run {}", id);
				let _ = tx.send(RunStatus::Cancelled);
				return;
			}
			match outcome {
				Ok(records) => {
					view.download_results = Some(records);
					view.loading = false;
					let _ = tx.send(RunStatus::Completed);
				}
				Err(e) => {
					view.error = Some(e.to_string());
					view.loading = false;
					let _ = tx.send(RunStatus::Failed);
				}
			}
		});
		Ok(RunHandle { id, kind: RunKind::Download, status: rx, task })
	}

	/// Stop surfacing the active run immediately.
	///
	/// Best-effort: the in-flight backend call keeps running, but its
	/// resolution no longer matches `active_id` and is discarded.
	pub fn cancel(&self) {
		let mut view = self.state.lock().expect("view state lock poisoned");
		view.active_id = None;
		view.loading = false;
	}

	/// Atomic copy of the current view state.
	pub fn snapshot(&self) -> ViewState {
		self.state.lock().expect("view state lock poisoned").clone()
	}

	// Allocate the next id and make it the sole active run, clearing
	// whatever the previous run left behind. Allocation happens under
	// the state lock so a newer start can never be overwritten by an
	// older one racing it.
	fn begin_run(&self) -> u64 {
		let mut view = self.state.lock().expect("view state lock poisoned");
		let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
		view.active_id = Some(id);
		view.loading = true;
		view.error = None;
		view.dns_results = None;
		view.download_results = None;
		id
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;
	use std::sync::Mutex as StdMutex;

	use async_trait::async_trait;
	use tokio::sync::oneshot;

	use super::*;
	use crate::backend::BackendError;

	type Plan<T> = (oneshot::Receiver<()>, Result<Vec<T>, BackendError>);

	/// Test backend whose responses are planned per target and released
	/// through oneshot gates, so completion order is fully controlled.
	#[derive(Default)]
	struct MockBackend {
		dns_plans: StdMutex<HashMap<String, Plan<DnsResultRecord>>>,
		download_plans: StdMutex<HashMap<String, Plan<DownloadResultRecord>>>,
	}

	impl MockBackend {
		fn plan_dns(
			&self,
			target: &str,
			outcome: Result<Vec<DnsResultRecord>, BackendError>,
		) -> oneshot::Sender<()> {
			let (tx, rx) = oneshot::channel();
			self.dns_plans
				.lock()
				.unwrap()
				.insert(target.to_string(), (rx, outcome));
			tx
		}

		fn plan_download(
			&self,
			url: &str,
			outcome: Result<Vec<DownloadResultRecord>, BackendError>,
		) -> oneshot::Sender<()> {
			let (tx, rx) = oneshot::channel();
			self.download_plans
				.lock()
				.unwrap()
				.insert(url.to_string(), (rx, outcome));
			tx
		}
	}

	#[async_trait]
	impl MeasurementBackend for MockBackend {
		async fn run_dns_benchmark(
			&self,
			params: &BenchmarkParams,
		) -> Result<Vec<DnsResultRecord>, BackendError> {
			let (gate, outcome) = self
				.dns_plans
				.lock()
				.unwrap()
				.remove(&params.domain_or_ip)
				.expect("unplanned dns call");
			// A dropped gate sender means "release immediately"
			let _ = gate.await;
			outcome
		}

		async fn perform_download_speed_test(
			&self,
			params: &SpeedParams,
		) -> Result<Vec<DownloadResultRecord>, BackendError> {
			let (gate, outcome) = self
				.download_plans
				.lock()
				.unwrap()
				.remove(&params.url)
				.expect("unplanned download call");
			let _ = gate.await;
			outcome
		}
	}

	fn dns_params(target: &str) -> BenchmarkParams {
		BenchmarkParams {
			domain_or_ip: target.to_string(),
			samples: 3,
			timeout_secs: 11,
			validate_dnssec: false,
			warm_up: false,
			custom_servers: None,
		}
	}

	fn speed_params(url: &str) -> SpeedParams {
		SpeedParams {
			url: url.to_string(),
			duration_secs: 7,
			timeout_secs: 10,
			custom_servers: None,
		}
	}

	fn dns_record(server: &str) -> DnsResultRecord {
		DnsResultRecord {
			server_address: server.to_string(),
			query_successful: true,
			success_percent: 100.0,
			latency_avg_ms: Some(10.0),
			..DnsResultRecord::default()
		}
	}

	#[tokio::test]
	async fn test_supersession_discards_stale_run() {
		let backend = Arc::new(MockBackend::default());
		let gate_a = backend.plan_dns("a.example", Ok(vec![dns_record("from-a")]));
		let gate_b = backend.plan_dns("b.example", Ok(vec![dns_record("from-b")]));
		let coordinator = RunCoordinator::new(backend);

		let run_a = coordinator.start_dns(dns_params("a.example")).unwrap();
		let run_b = coordinator.start_dns(dns_params("b.example")).unwrap();
		assert!(run_b.id > run_a.id);

		// A resolves after being superseded: nothing it says may stick
		gate_a.send(()).unwrap();
		assert_eq!(run_a.wait().await, RunStatus::Cancelled);
		let view = coordinator.snapshot();
		assert!(view.loading);
		assert!(view.dns_results.is_none());
		assert!(view.error.is_none());

		gate_b.send(()).unwrap();
		assert_eq!(run_b.wait().await, RunStatus::Completed);
		let view = coordinator.snapshot();
		assert!(!view.loading);
		let records = view.dns_results.unwrap();
		assert_eq!(records.len(), 1);
		assert_eq!(records[0].server_address, "from-b");
	}

	#[tokio::test]
	async fn test_stale_failure_is_suppressed() {
		let backend = Arc::new(MockBackend::default());
		let gate_a = backend.plan_dns(
			"a.example",
			Err(BackendError::Measurement("boom".to_string())),
		);
		let gate_b = backend.plan_dns("b.example", Ok(vec![dns_record("from-b")]));
		let coordinator = RunCoordinator::new(backend);

		let run_a = coordinator.start_dns(dns_params("a.example")).unwrap();
		let run_b = coordinator.start_dns(dns_params("b.example")).unwrap();

		gate_a.send(()).unwrap();
		assert_eq!(run_a.wait().await, RunStatus::Cancelled);
		assert!(coordinator.snapshot().error.is_none());

		gate_b.send(()).unwrap();
		assert_eq!(run_b.wait().await, RunStatus::Completed);
	}

	#[tokio::test]
	async fn test_cancel_clears_loading_and_discards_resolution() {
		let backend = Arc::new(MockBackend::default());
		let gate = backend.plan_dns("a.example", Ok(vec![dns_record("late")]));
		let coordinator = RunCoordinator::new(backend);

		let run = coordinator.start_dns(dns_params("a.example")).unwrap();
		// The spawned run has not been polled yet on this runtime
		assert_eq!(run.status(), RunStatus::Pending);
		coordinator.cancel();

		let view = coordinator.snapshot();
		assert_eq!(view.active_id, None);
		assert!(!view.loading);

		gate.send(()).unwrap();
		assert_eq!(run.wait().await, RunStatus::Cancelled);
		let view = coordinator.snapshot();
		assert!(view.dns_results.is_none());
		assert!(view.error.is_none());
	}

	#[tokio::test]
	async fn test_failure_publishes_single_message() {
		let backend = Arc::new(MockBackend::default());
		let gate = backend.plan_dns(
			"a.example",
			Err(BackendError::Measurement("resolver unreachable".to_string())),
		);
		let coordinator = RunCoordinator::new(backend);

		let run = coordinator.start_dns(dns_params("a.example")).unwrap();
		gate.send(()).unwrap();
		assert_eq!(run.wait().await, RunStatus::Failed);

		let view = coordinator.snapshot();
		assert!(!view.loading);
		assert_eq!(view.error.as_deref(), Some("resolver unreachable"));
		assert!(view.dns_results.is_none());
	}

	#[tokio::test]
	async fn test_new_start_clears_previous_error_and_results() {
		let backend = Arc::new(MockBackend::default());
		let gate_a = backend.plan_dns(
			"a.example",
			Err(BackendError::Measurement("boom".to_string())),
		);
		let gate_b = backend.plan_dns("b.example", Ok(vec![dns_record("fresh")]));
		let coordinator = RunCoordinator::new(backend);

		let run_a = coordinator.start_dns(dns_params("a.example")).unwrap();
		gate_a.send(()).unwrap();
		assert_eq!(run_a.wait().await, RunStatus::Failed);
		assert!(coordinator.snapshot().error.is_some());

		let run_b = coordinator.start_dns(dns_params("b.example")).unwrap();
		let view = coordinator.snapshot();
		assert!(view.loading);
		assert!(view.error.is_none());
		assert!(view.dns_results.is_none());

		gate_b.send(()).unwrap();
		assert_eq!(run_b.wait().await, RunStatus::Completed);
	}

	#[tokio::test]
	async fn test_empty_target_rejected_before_run_starts() {
		let backend = Arc::new(MockBackend::default());
		let coordinator = RunCoordinator::new(backend);

		let err = coordinator.start_dns(dns_params("   ")).unwrap_err();
		assert_eq!(err, ParamError::EmptyTarget);

		let view = coordinator.snapshot();
		assert_eq!(view.active_id, None);
		assert!(!view.loading);
	}

	#[tokio::test]
	async fn test_run_ids_increase_across_kinds() {
		let backend = Arc::new(MockBackend::default());
		// Dropping the gate senders releases both calls immediately
		drop(backend.plan_dns("a.example", Ok(vec![])));
		drop(backend.plan_download("https://example.com/f", Ok(vec![])));
		let coordinator = RunCoordinator::new(backend);

		let dns_run = coordinator.start_dns(dns_params("a.example")).unwrap();
		let speed_run = coordinator
			.start_download(speed_params("https://example.com/f"))
			.unwrap();
		assert_eq!(dns_run.kind, RunKind::Dns);
		assert_eq!(speed_run.kind, RunKind::Download);
		assert!(speed_run.id > dns_run.id);

		// The download run superseded the dns run
		assert_eq!(dns_run.wait().await, RunStatus::Cancelled);
		assert_eq!(speed_run.wait().await, RunStatus::Completed);
		let view = coordinator.snapshot();
		assert!(view.download_results.is_some());
		assert!(view.dns_results.is_none());
	}
}
