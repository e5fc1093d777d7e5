use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use anyhow::Result;

use crate::metrics::{canonical_jitter, canonical_latency, dnssec_label, format_latency};
use crate::types::{BenchmarkParams, DnsResultRecord, DownloadResultRecord, SpeedParams};

/// Print a summary of the DNS benchmark configuration before running.
pub fn print_dns_summary(params: &BenchmarkParams, server_count: usize) {
	println!("DNS Benchmark Configuration");
	println!("===========================");
	println!("Target:         {}", params.domain_or_ip);
	println!("Servers:        {}", server_count);
	println!("Samples:        {}", params.samples);
	println!("Timeout:        {} s", params.timeout_secs);
	let dnssec = if params.validate_dnssec { "yes" } else { "no" };
	println!("DNSSEC:         {}", dnssec);
	let warm_up = if params.warm_up { "yes" } else { "no" };
	println!("Warm-up:        {}", warm_up);
	println!();
}

/// Print a summary of the download test configuration before running.
pub fn print_speed_summary(params: &SpeedParams, server_count: usize) {
	println!("Download Speed Test Configuration");
	println!("=================================");
	println!("URL:            {}", params.url);
	println!("Servers:        {}", server_count);
	println!("Duration:       {} s", params.duration_secs);
	println!("Timeout:        {} s", params.timeout_secs);
	println!();
}

/// Print the usable, sorted DNS results as a formatted table.
pub fn print_dns_table(records: &[DnsResultRecord]) {
	let mut table = Table::new();
	table.load_preset(UTF8_FULL);
	table.set_content_arrangement(ContentArrangement::Dynamic);
	table.set_header(vec![
		"Server", "Latency", "Jitter", "Success %", "DNSSEC", "IPv4", "IPv6",
	]);

	for r in records {
		table.add_row(vec![
			r.server_address.clone(),
			format_latency(canonical_latency(r)),
			format_latency(canonical_jitter(r)),
			format!("{:.1}%", r.success_percent),
			dnssec_label(r).to_string(),
			r.ipv4_ips.join(" "),
			r.ipv6_ips.join(" "),
		]);
	}

	println!("\nDNS Benchmark Results");
	println!("=====================\n");
	println!("{table}");
}

/// Print the sorted download results as a formatted table.
pub fn print_download_table(records: &[DownloadResultRecord]) {
	let mut table = Table::new();
	table.load_preset(UTF8_FULL);
	table.set_content_arrangement(ContentArrangement::Dynamic);
	table.set_header(vec![
		"Server", "Resolved IP", "Bandwidth", "Read", "Duration", "HTTP", "Error",
	]);

	for r in records {
		let status = r.http_status.map(|s| s.to_string()).unwrap_or_else(|| "–".to_string());
		table.add_row(vec![
			r.server_address.clone(),
			r.resolved_ip.clone().unwrap_or_default(),
			format!("{:.2} Mbps", r.bandwidth_mbps),
			format!("{:.1} MB", r.bytes_read as f64 / 1_000_000.0),
			format!("{} ms", r.duration_ms),
			status,
			r.error_msg.clone().unwrap_or_default(),
		]);
	}

	println!("\nDownload Speed Results");
	println!("======================\n");
	println!("{table}");
}

/// Write already-serialized CSV text to an explicit path.
pub fn write_csv_file(path: &str, csv_text: &str) -> Result<()> {
	std::fs::write(path, csv_text)?;
	println!("\nResults written to: {}", path);
	Ok(())
}
