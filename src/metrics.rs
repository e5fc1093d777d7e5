use crate::types::DnsResultRecord;

/// Resolve the canonical latency for a record from its optional timing fields.
///
/// Fixed priority order: `latency_avg_ms`, then `avg_time`, then
/// `resolution_time_ms`. Returns None only when all three are absent.
/// Zero and sub-millisecond values are real measurements, not "absent".
pub fn canonical_latency(record: &DnsResultRecord) -> Option<f64> {
	record.latency_avg_ms
		.or(record.avg_time)
		.or_else(|| record.resolution_time_ms.map(|ms| ms as f64))
}

/// Jitter has no fallback chain: it is either measured or absent.
pub fn canonical_jitter(record: &DnsResultRecord) -> Option<f64> {
	record.jitter_avg_ms
}

/// Format a latency value for display.
///
/// Absent values render as a dash. Sub-millisecond values keep two
/// decimals so they stay distinguishable from zero.
pub fn format_latency(latency_ms: Option<f64>) -> String {
	match latency_ms {
		None => "–".to_string(),
		Some(ms) if ms < 1.0 => format!("{:.2} ms", ms),
		Some(ms) => format!("{} ms", ms.round() as u64),
	}
}

/// Tri-state DNSSEC label: explicitly disabled wins over any validation flag.
pub fn dnssec_label(record: &DnsResultRecord) -> &'static str {
	match (record.dnssec_enabled, record.dnssec_validated) {
		(Some(false), _) => "disabled",
		(_, true) => "validated",
		(_, false) => "not validated",
	}
}

/// Calculate the arithmetic mean of a slice of values.
pub fn mean(values: &[f64]) -> Option<f64> {
	if values.is_empty() {
		return None;
	}
	let sum: f64 = values.iter().sum();
	Some(sum / values.len() as f64)
}

/// Calculate the mean absolute deviation from the mean.
///
/// Used as the jitter measure for a server's latency samples.
pub fn mean_abs_deviation(values: &[f64]) -> Option<f64> {
	let avg = mean(values)?;
	let mad = values.iter()
		.map(|v| (v - avg).abs())
		.sum::<f64>() / values.len() as f64;
	Some(mad)
}
