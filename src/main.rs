mod backend;
mod cli;
mod coordinator;
mod dns;
mod export;
mod metrics;
mod output;
mod rank;
mod saver;
mod servers;
mod speed;
mod types;

use std::sync::Arc;

use anyhow::bail;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::backend::LiveBackend;
use crate::cli::{Cli, Command, ExportArgs, ServerArgs, ServersAction};
use crate::coordinator::RunCoordinator;
use crate::saver::{DirectSaver, SaveSurface};
use crate::types::{BenchmarkParams, DnsResultRecord, DownloadResultRecord, SpeedParams};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
		)
		.init();

	let cli = Cli::parse();
	match cli.command {
		Command::Dns { target, samples, timeout_secs, dnssec, warm_up, servers, export } => {
			let params = BenchmarkParams {
				domain_or_ip: target,
				samples,
				timeout_secs,
				validate_dnssec: dnssec,
				warm_up,
				custom_servers: collect_servers(&servers)?,
			};
			run_dns(params, export).await
		}
		Command::Speed { url, duration_secs, timeout_secs, servers, export } => {
			let params = SpeedParams {
				url,
				duration_secs,
				timeout_secs,
				custom_servers: collect_servers(&servers)?,
			};
			run_speed(params, export).await
		}
		Command::Servers { action } => run_servers(action).await,
	}
}

/// Merge --server flags with an optional --server-file into one override list.
fn collect_servers(args: &ServerArgs) -> anyhow::Result<Option<Vec<String>>> {
	let mut list: Vec<String> = args
		.servers
		.iter()
		.map(|s| s.trim().to_string())
		.filter(|s| !s.is_empty())
		.collect();
	if let Some(path) = &args.server_file {
		list.extend(servers::load_server_file(path)?);
	}
	Ok(if list.is_empty() { None } else { Some(list) })
}

fn effective_server_count(custom: &Option<Vec<String>>) -> usize {
	custom
		.as_ref()
		.map(|list| list.len())
		.unwrap_or_else(|| servers::default_servers().len())
}

async fn run_dns(params: BenchmarkParams, export_args: ExportArgs) -> anyhow::Result<()> {
	output::print_dns_summary(&params, effective_server_count(&params.custom_servers));

	let coordinator = RunCoordinator::new(Arc::new(LiveBackend::new(servers::default_servers())));
	let handle = coordinator.start_dns(params.clone())?;

	println!("Running benchmark...");
	tokio::select! {
		_ = handle.wait() => {}
		_ = tokio::signal::ctrl_c() => {
			coordinator.cancel();
			println!("\nBenchmark cancelled");
			return Ok(());
		}
	}

	let view = coordinator.snapshot();
	if let Some(error) = view.error {
		bail!(error);
	}
	let records = view.dns_results.unwrap_or_default();

	let usable = rank::sort_dns(&rank::usable_dns(&records));
	output::print_dns_table(&usable);
	let skipped = records.len() - usable.len();
	if skipped > 0 {
		println!("{} server(s) returned no usable result", skipped);
	}

	export_dns(&export_args, &records, &params.domain_or_ip)
}

async fn run_speed(params: SpeedParams, export_args: ExportArgs) -> anyhow::Result<()> {
	output::print_speed_summary(&params, effective_server_count(&params.custom_servers));

	let coordinator = RunCoordinator::new(Arc::new(LiveBackend::new(servers::default_servers())));
	let handle = coordinator.start_download(params.clone())?;

	println!("Running download test...");
	tokio::select! {
		_ = handle.wait() => {}
		_ = tokio::signal::ctrl_c() => {
			coordinator.cancel();
			println!("\nDownload test cancelled");
			return Ok(());
		}
	}

	let view = coordinator.snapshot();
	if let Some(error) = view.error {
		bail!(error);
	}
	let records = view.download_results.unwrap_or_default();

	output::print_download_table(&rank::sort_download(&records));

	export_download(&export_args, &records, &params.url)
}

async fn run_servers(action: ServersAction) -> anyhow::Result<()> {
	match action {
		ServersAction::Show { server_file } => {
			let list = match server_file {
				Some(path) => servers::load_server_file(&path)?,
				None => servers::default_servers(),
			};
			for server in &list {
				println!("{}", server);
			}
			println!("\n{} server(s)", list.len());
		}
		ServersAction::Update { url, server_file } => {
			let url = url.unwrap_or_else(|| servers::DEFAULT_LIST_URL.to_string());
			let list = servers::fetch_server_list(&url).await?;
			servers::store_server_file(&server_file, &list)?;
			println!("Stored {} server(s) to {}", list.len(), server_file);
		}
	}
	Ok(())
}

/// Export the raw DNS record set as requested. Export failures are
/// reported but never fail the finished benchmark.
fn export_dns(args: &ExportArgs, records: &[DnsResultRecord], query: &str) -> anyhow::Result<()> {
	if let Some(path) = &args.output {
		output::write_csv_file(path, &export::dns_csv(records)?)?;
	}
	if args.export {
		let csv_text = export::dns_csv(records)?;
		save_with_surface(args, csv_text.into_bytes(), &export::dns_export_name(query, "csv"));
	}
	if args.export_json {
		let json = export::records_json(records)?;
		save_with_surface(args, json.into_bytes(), &export::dns_export_name(query, "json"));
	}
	Ok(())
}

fn export_download(
	args: &ExportArgs,
	records: &[DownloadResultRecord],
	url: &str,
) -> anyhow::Result<()> {
	if let Some(path) = &args.output {
		output::write_csv_file(path, &export::download_csv(records)?)?;
	}
	if args.export {
		let csv_text = export::download_csv(records)?;
		save_with_surface(args, csv_text.into_bytes(), &export::download_export_name(url, "csv"));
	}
	if args.export_json {
		let json = export::records_json(records)?;
		save_with_surface(args, json.into_bytes(), &export::download_export_name(url, "json"));
	}
	Ok(())
}

fn save_with_surface(args: &ExportArgs, contents: Vec<u8>, name: &str) {
	let surface: Box<dyn SaveSurface> = match &args.export_dir {
		Some(dir) => Box::new(DirectSaver::new(dir.as_str())),
		None => saver::detect(),
	};
	if !surface.save(&contents, name) {
		eprintln!("Export failed: {}", name);
	}
}
