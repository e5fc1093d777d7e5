use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Result};
use futures::future::join_all;
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::{Resolver, TokioResolver};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{info, warn};
use url::Url;

use crate::backend::BackendError;
use crate::metrics::{mean, mean_abs_deviation};
use crate::types::{BenchmarkParams, DnsResultRecord};

/// Soft cap so a huge stored list cannot stretch a run indefinitely
const MAX_SERVERS: usize = 120;
const MAX_INFLIGHT: usize = 10;

/// Benchmark the target against every configured server concurrently.
///
/// Per-server failures come back as unusable records; the run itself
/// only fails when there is nothing to measure against.
pub async fn run(
	params: &BenchmarkParams,
	default_servers: &[String],
) -> Result<Vec<DnsResultRecord>, BackendError> {
	let mut servers = match &params.custom_servers {
		Some(list) if !list.is_empty() => list.clone(),
		_ => default_servers.to_vec(),
	};
	if servers.is_empty() {
		return Err(BackendError::NoServers);
	}
	if servers.len() > MAX_SERVERS {
		warn!("server list truncated from {} to {} entries", servers.len(), MAX_SERVERS);
		servers.truncate(MAX_SERVERS);
	}

	let semaphore = Arc::new(Semaphore::new(MAX_INFLIGHT));
	let mut handles = Vec::with_capacity(servers.len());
	for server in servers {
		let sem = semaphore.clone();
		let params = params.clone();
		handles.push(tokio::spawn(async move {
			let _permit = sem.acquire().await.unwrap();
			benchmark_single_server(&params, server).await
		}));
	}

	let records = join_all(handles)
		.await
		.into_iter()
		.map(|joined| {
			joined.unwrap_or_else(|e| {
				failed_record("unknown".to_string(), format!("task error: {}", e))
			})
		})
		.collect();
	Ok(records)
}

fn failed_record(server_address: String, error: String) -> DnsResultRecord {
	DnsResultRecord {
		server_address,
		error_msg: Some(error),
		..DnsResultRecord::default()
	}
}

/// What a single lookup attempt observed
struct LookupOutcome {
	found: bool,
	v4: Vec<String>,
	v6: Vec<String>,
}

async fn lookup_once(resolver: &TokioResolver, query: &str, is_ip: bool) -> Result<LookupOutcome, String> {
	if is_ip {
		// IP targets get a proper reverse (PTR) lookup
		let ip: IpAddr = query.parse().map_err(|e| format!("invalid ip: {}", e))?;
		match resolver.reverse_lookup(ip).await {
			Ok(lookup) => Ok(LookupOutcome {
				found: lookup.iter().next().is_some(),
				v4: Vec::new(),
				v6: Vec::new(),
			}),
			Err(e) => Err(e.to_string()),
		}
	} else {
		// One lookup_ip gathers both A and AAAA answers
		match resolver.lookup_ip(query).await {
			Ok(lookup) => {
				let mut v4 = Vec::new();
				let mut v6 = Vec::new();
				for ip in lookup.iter() {
					if ip.is_ipv4() {
						v4.push(ip.to_string());
					} else {
						v6.push(ip.to_string());
					}
				}
				Ok(LookupOutcome { found: !v4.is_empty() || !v6.is_empty(), v4, v6 })
			}
			Err(e) => Err(e.to_string()),
		}
	}
}

/// Run the sampling loop for one server and aggregate its metrics.
async fn benchmark_single_server(params: &BenchmarkParams, server_address: String) -> DnsResultRecord {
	info!("benchmarking {}", server_address);
	let resolver = match build_resolver(&server_address, params.timeout_secs, params.validate_dnssec).await {
		Ok(r) => r,
		Err(e) => return failed_record(server_address, e.to_string()),
	};

	let query = params.domain_or_ip.as_str();
	let is_ip = query.parse::<IpAddr>().is_ok();
	let budget = Duration::from_secs(params.timeout_secs);

	// Optional unmeasured warm-up so the first timed sample does not pay
	// for connection setup and cache priming
	if params.warm_up {
		let _ = timeout(budget, lookup_once(&resolver, query, is_ip)).await;
	}

	let samples = params.samples as usize;
	let mut latencies_ms: Vec<f64> = Vec::with_capacity(samples);
	let mut successes = 0usize;
	let mut first_error: Option<String> = None;
	let mut ipv4_all: Vec<String> = Vec::new();
	let mut ipv6_all: Vec<String> = Vec::new();

	for _ in 0..samples {
		let start = Instant::now();
		let mut sample_success = false;

		match timeout(budget, lookup_once(&resolver, query, is_ip)).await {
			Ok(Ok(mut outcome)) => {
				sample_success = outcome.found;
				ipv4_all.append(&mut outcome.v4);
				ipv6_all.append(&mut outcome.v6);
			}
			Ok(Err(e)) => {
				if first_error.is_none() {
					first_error = Some(e);
				}
			}
			Err(_) => {
				if first_error.is_none() {
					first_error = Some("Timeout".to_string());
				}
			}
		}

		latencies_ms.push(start.elapsed().as_secs_f64() * 1000.0);
		if sample_success {
			successes += 1;
		}
	}

	let latency_avg_ms = mean(&latencies_ms);
	let jitter_avg_ms = match latencies_ms.len() {
		0 => None,
		// A single sample has no spread; report 0 rather than nothing
		1 => Some(0.0),
		_ => mean_abs_deviation(&latencies_ms),
	};

	ipv4_all.sort();
	ipv4_all.dedup();
	ipv6_all.sort();
	ipv6_all.dedup();

	let success_percent = successes as f64 * 100.0 / samples as f64;

	DnsResultRecord {
		server_address,
		resolution_time_ms: latency_avg_ms.map(|v| v as u64),
		query_successful: successes > 0,
		latency_avg_ms,
		jitter_avg_ms,
		success_percent,
		dnssec_enabled: Some(params.validate_dnssec),
		dnssec_validated: params.validate_dnssec && successes > 0,
		ipv4_ips: ipv4_all,
		ipv6_ips: ipv6_all,
		error_msg: first_error,
		avg_time: latency_avg_ms,
	}
}

/// Build a resolver that talks only to the given server.
///
/// The address form picks the transport:
///   "9.9.9.9" or "dns.quad9.net"   -- UDP port 53
///   "tls://host[:port]"            -- DNS over TLS, default 853
///   "quic://host[:port]"           -- DNS over QUIC, default 853
///   "https://host[:port]/path"     -- DNS over HTTPS, default /dns-query
///   "h3://host[:port]/path"        -- DNS over HTTP/3
pub async fn build_resolver(
	server_address: &str,
	timeout_secs: u64,
	validate_dnssec: bool,
) -> Result<TokioResolver> {
	let mut opts = ResolverOpts::default();
	opts.timeout = Duration::from_secs(timeout_secs);
	opts.validate = validate_dnssec;
	// One attempt per sample; retries would hide the latency being measured
	opts.attempts = 1;
	opts.cache_size = 512;

	let config = if server_address.starts_with("https://") || server_address.starts_with("h3://") {
		let is_h3 = server_address.starts_with("h3://");
		let parsed = Url::parse(server_address)?;
		let host = parsed
			.host_str()
			.ok_or_else(|| anyhow!("no host in '{}'", server_address))?
			.to_string();
		let port = parsed.port().unwrap_or(443);

		let mut endpoint = parsed.path().to_string();
		if let Some(q) = parsed.query() {
			endpoint.push('?');
			endpoint.push_str(q);
		}
		if endpoint.is_empty() || endpoint == "/" {
			endpoint = "/dns-query".to_string();
		}

		let (server_name, ips) = tls_target(&host).await?;
		let mut group = if is_h3 {
			NameServerConfigGroup::from_ips_h3(&ips, port, server_name, true)
		} else {
			NameServerConfigGroup::from_ips_https(&ips, port, server_name, true)
		};
		for ns in group.iter_mut() {
			ns.http_endpoint = Some(endpoint.clone());
		}
		ResolverConfig::from_parts(None, vec![], group)
	} else if let Some(rest) = server_address.strip_prefix("tls://") {
		let (ips, port, server_name) = host_port_target(rest, 853).await?;
		ResolverConfig::from_parts(
			None,
			vec![],
			NameServerConfigGroup::from_ips_tls(&ips, port, server_name, true),
		)
	} else if let Some(rest) = server_address.strip_prefix("quic://") {
		let (ips, port, server_name) = host_port_target(rest, 853).await?;
		ResolverConfig::from_parts(
			None,
			vec![],
			NameServerConfigGroup::from_ips_quic(&ips, port, server_name, true),
		)
	} else if let Ok(ip) = server_address.parse::<IpAddr>() {
		ResolverConfig::from_parts(
			None,
			vec![],
			NameServerConfigGroup::from_ips_clear(&[ip], 53, true),
		)
	} else {
		// Plain hostname: resolve it with the system resolver first
		let ips = system_resolve(server_address).await?;
		ResolverConfig::from_parts(
			None,
			vec![],
			NameServerConfigGroup::from_ips_clear(&ips, 53, true),
		)
	};

	Ok(Resolver::builder_with_config(config, TokioConnectionProvider::default())
		.with_options(opts)
		.build())
}

/// Split "host" or "host:port" for the TLS-style schemes.
async fn host_port_target(rest: &str, default_port: u16) -> Result<(Vec<IpAddr>, u16, String)> {
	let (host, port) = match rest.split_once(':') {
		Some((h, p)) => (h, p.parse::<u16>()?),
		None => (rest, default_port),
	};
	let (server_name, ips) = tls_target(host).await?;
	Ok((ips, port, server_name))
}

/// Determine the TLS server name and target addresses for a host.
async fn tls_target(host: &str) -> Result<(String, Vec<IpAddr>)> {
	if let Ok(ip) = host.parse::<IpAddr>() {
		// The server's certificate may not cover its bare IP; nothing
		// better is available without a host mapping
		warn!("using IP {} as TLS server name", ip);
		Ok((host.to_string(), vec![ip]))
	} else {
		let ips = system_resolve(host).await?;
		Ok((host.to_string(), ips))
	}
}

async fn system_resolve(host: &str) -> Result<Vec<IpAddr>> {
	let resolver = Resolver::builder_with_config(
		ResolverConfig::default(),
		TokioConnectionProvider::default(),
	)
	.build();
	let response = resolver.lookup_ip(host).await?;
	let ips: Vec<IpAddr> = response.iter().collect();
	if ips.is_empty() {
		bail!("no addresses for '{}'", host);
	}
	Ok(ips)
}
