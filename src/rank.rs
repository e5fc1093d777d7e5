use std::cmp::Ordering;

use crate::metrics::canonical_latency;
use crate::types::{DnsResultRecord, DownloadResultRecord};

/// Select the records eligible for the sorted display list.
///
/// A record is usable iff its query succeeded and its success rate is
/// strictly positive. Relative order is preserved; unusable records stay
/// in the raw set for export.
pub fn usable_dns(records: &[DnsResultRecord]) -> Vec<DnsResultRecord> {
	records.iter()
		.filter(|r| r.query_successful && r.success_percent > 0.0)
		.cloned()
		.collect()
}

/// Sort DNS records ascending by canonical latency.
///
/// Records without any latency data sort last. The sort is stable, so
/// ties (and the no-data tail) keep their original relative order.
pub fn sort_dns(records: &[DnsResultRecord]) -> Vec<DnsResultRecord> {
	let mut sorted = records.to_vec();
	sorted.sort_by(|a, b| {
		let la = canonical_latency(a).unwrap_or(f64::INFINITY);
		let lb = canonical_latency(b).unwrap_or(f64::INFINITY);
		la.partial_cmp(&lb).unwrap_or(Ordering::Equal)
	});
	sorted
}

/// Sort download records descending by bandwidth, stable on ties.
pub fn sort_download(records: &[DownloadResultRecord]) -> Vec<DownloadResultRecord> {
	let mut sorted = records.to_vec();
	sorted.sort_by(|a, b| {
		b.bandwidth_mbps.partial_cmp(&a.bandwidth_mbps).unwrap_or(Ordering::Equal)
	});
	sorted
}

#[cfg(test)]
mod tests {
	use super::*;

	fn dns(server: &str, latency: Option<f64>, successful: bool, percent: f64) -> DnsResultRecord {
		DnsResultRecord {
			server_address: server.to_string(),
			latency_avg_ms: latency,
			query_successful: successful,
			success_percent: percent,
			..DnsResultRecord::default()
		}
	}

	fn download(server: &str, mbps: f64) -> DownloadResultRecord {
		DownloadResultRecord {
			server_address: server.to_string(),
			bandwidth_mbps: mbps,
			query_successful: true,
			..DownloadResultRecord::default()
		}
	}

	#[test]
	fn test_usable_requires_success_and_positive_rate() {
		let records = vec![
			dns("a", Some(10.0), true, 100.0),
			dns("b", Some(5.0), false, 0.0),
			dns("c", Some(7.0), true, 0.0),
			dns("d", None, true, 33.3),
		];
		let usable = usable_dns(&records);
		let names: Vec<&str> = usable.iter().map(|r| r.server_address.as_str()).collect();
		assert_eq!(names, vec!["a", "d"]);
	}

	#[test]
	fn test_sort_dns_ascending_missing_last() {
		let records = vec![
			dns("slow", Some(80.0), true, 100.0),
			dns("none-1", None, true, 100.0),
			dns("fast", Some(3.5), true, 100.0),
			dns("none-2", None, true, 100.0),
			dns("medium", Some(20.0), true, 100.0),
		];
		let sorted = sort_dns(&records);
		let names: Vec<&str> = sorted.iter().map(|r| r.server_address.as_str()).collect();
		// Missing-latency records sort last and keep their original order
		assert_eq!(names, vec!["fast", "medium", "slow", "none-1", "none-2"]);
	}

	#[test]
	fn test_sort_dns_ties_keep_input_order() {
		let records = vec![
			dns("first", Some(10.0), true, 100.0),
			dns("second", Some(10.0), true, 100.0),
			dns("third", Some(10.0), true, 100.0),
		];
		let sorted = sort_dns(&records);
		let names: Vec<&str> = sorted.iter().map(|r| r.server_address.as_str()).collect();
		assert_eq!(names, vec!["first", "second", "third"]);
	}

	#[test]
	fn test_sort_dns_uses_fallback_latency() {
		let mut by_resolution = dns("fallback", None, true, 100.0);
		by_resolution.resolution_time_ms = Some(5);
		let records = vec![
			dns("direct", Some(10.0), true, 100.0),
			by_resolution,
		];
		let sorted = sort_dns(&records);
		assert_eq!(sorted[0].server_address, "fallback");
	}

	#[test]
	fn test_sort_download_descending() {
		let records = vec![
			download("a", 50.1),
			download("b", 12.3),
			download("c", 80.0),
		];
		let sorted = sort_download(&records);
		let speeds: Vec<f64> = sorted.iter().map(|r| r.bandwidth_mbps).collect();
		assert_eq!(speeds, vec![80.0, 50.1, 12.3]);
	}

	#[test]
	fn test_sort_download_stable_on_ties() {
		let records = vec![
			download("x", 10.0),
			download("y", 10.0),
			download("z", 25.0),
		];
		let sorted = sort_download(&records);
		let names: Vec<&str> = sorted.iter().map(|r| r.server_address.as_str()).collect();
		assert_eq!(names, vec!["z", "x", "y"]);
	}
}
