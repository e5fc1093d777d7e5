use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use url::Url;

use crate::types::{DnsResultRecord, DownloadResultRecord};

const DNS_HEADER: [&str; 11] = [
	"server_address", "query_successful", "success_percent",
	"latency_avg_ms", "jitter_avg_ms", "resolution_time_ms", "avg_time",
	"dnssec_validated", "ipv4_ips", "ipv6_ips", "error_msg",
];

const DOWNLOAD_HEADER: [&str; 8] = [
	"server_address", "resolved_ip", "query_successful", "http_status",
	"duration_ms", "bytes_read", "bandwidth_mbps", "error_msg",
];

/// Render an optional field as its plain string form, empty when absent.
fn opt<T: ToString>(value: &Option<T>) -> String {
	value.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

/// Serialize DNS records to CSV, one row per record in input order.
///
/// Quoting follows RFC 4180: fields containing a quote, comma, or line
/// break are wrapped in double quotes with inner quotes doubled; all
/// other fields are emitted bare. Address lists join with ';'.
pub fn dns_csv(records: &[DnsResultRecord]) -> Result<String> {
	let mut buf = Vec::new();
	{
		let mut writer = csv::Writer::from_writer(&mut buf);
		writer.write_record(DNS_HEADER)?;
		for r in records {
			writer.write_record([
				r.server_address.clone(),
				r.query_successful.to_string(),
				r.success_percent.to_string(),
				opt(&r.latency_avg_ms),
				opt(&r.jitter_avg_ms),
				opt(&r.resolution_time_ms),
				opt(&r.avg_time),
				r.dnssec_validated.to_string(),
				r.ipv4_ips.join(";"),
				r.ipv6_ips.join(";"),
				opt(&r.error_msg),
			])?;
		}
		writer.flush()?;
	}
	Ok(String::from_utf8(buf)?)
}

/// Serialize download records to CSV, one row per record in input order.
pub fn download_csv(records: &[DownloadResultRecord]) -> Result<String> {
	let mut buf = Vec::new();
	{
		let mut writer = csv::Writer::from_writer(&mut buf);
		writer.write_record(DOWNLOAD_HEADER)?;
		for r in records {
			writer.write_record([
				r.server_address.clone(),
				opt(&r.resolved_ip),
				r.query_successful.to_string(),
				opt(&r.http_status),
				r.duration_ms.to_string(),
				r.bytes_read.to_string(),
				r.bandwidth_mbps.to_string(),
				opt(&r.error_msg),
			])?;
		}
		writer.flush()?;
	}
	Ok(String::from_utf8(buf)?)
}

/// Pretty-printed JSON of the raw record set.
pub fn records_json<T: Serialize>(records: &[T]) -> Result<String> {
	Ok(serde_json::to_string_pretty(records)?)
}

/// Replace every character outside `[A-Za-z0-9._-]` with '_'.
pub fn safe_name(input: &str, fallback: &str) -> String {
	let base = input.trim();
	let base = if base.is_empty() { fallback } else { base };
	base.chars()
		.map(|c| {
			if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
				c
			} else {
				'_'
			}
		})
		.collect()
}

/// UTC timestamp suitable for filenames: RFC 3339 with ':' and '.'
/// replaced so the name is portable.
fn timestamp() -> String {
	Utc::now()
		.to_rfc3339_opts(SecondsFormat::Millis, true)
		.replace(':', "-")
		.replace('.', "-")
}

/// Suggested filename for a DNS benchmark export.
pub fn dns_export_name(query: &str, ext: &str) -> String {
	format!("dns-benchmark-{}-{}.{}", safe_name(query, "query"), timestamp(), ext)
}

/// Suggested filename for a download speed export, keyed by URL host.
pub fn download_export_name(url: &str, ext: &str) -> String {
	let host = Url::parse(url)
		.ok()
		.and_then(|u| u.host_str().map(str::to_string))
		.unwrap_or_else(|| "download".to_string());
	format!("download-speed-{}-{}.{}", safe_name(&host, "download"), timestamp(), ext)
}
