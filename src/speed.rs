use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use futures::{stream, StreamExt};
use tokio::time::timeout;
use tracing::{info, warn};
use url::Url;

use crate::backend::BackendError;
use crate::dns::build_resolver;
use crate::types::{DownloadResultRecord, SpeedParams};

/// Waiting on every server at once gets expensive fast; keep the list
/// and the parallelism conservative
const MAX_SERVERS: usize = 40;
const CONCURRENCY: usize = 6;

/// Download the target once per DNS server, resolving the URL host
/// through that server and pinning the connection to the answer.
pub async fn run(
	params: &SpeedParams,
	default_servers: &[String],
) -> Result<Vec<DownloadResultRecord>, BackendError> {
	let parsed = Url::parse(&params.url)
		.map_err(|e| BackendError::InvalidTarget(format!("invalid url: {}", e)))?;
	let scheme = parsed.scheme();
	if scheme != "http" && scheme != "https" {
		return Err(BackendError::InvalidTarget(
			"only http and https urls are supported".to_string(),
		));
	}
	let host = parsed
		.host_str()
		.ok_or_else(|| BackendError::InvalidTarget("url is missing a host".to_string()))?
		.to_string();
	let port = parsed.port().unwrap_or(if scheme == "https" { 443 } else { 80 });

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

	let duration_secs = params.duration_secs;
	// Leave the request timeout room to outlive the measurement window
	let timeout_secs = params.timeout_secs.max(duration_secs + 5);

	let results = stream::iter(servers.into_iter().map(|server| {
		let url = params.url.clone();
		let host = host.clone();
		async move {
			download_via_server(&server, &host, port, &url, duration_secs, timeout_secs).await
		}
	}))
	.buffer_unordered(CONCURRENCY)
	.collect::<Vec<_>>()
	.await;

	Ok(results)
}

fn failed(server_address: &str, ip: Option<IpAddr>, error: String) -> DownloadResultRecord {
	DownloadResultRecord {
		server_address: server_address.to_string(),
		resolved_ip: ip.map(|i| i.to_string()),
		error_msg: Some(error),
		..DownloadResultRecord::default()
	}
}

async fn download_via_server(
	server_address: &str,
	host: &str,
	port: u16,
	url: &str,
	duration_secs: u64,
	timeout_secs: u64,
) -> DownloadResultRecord {
	info!("download test via {} for {}", server_address, host);

	let resolver = match build_resolver(server_address, timeout_secs, false).await {
		Ok(r) => r,
		Err(e) => return failed(server_address, None, format!("resolver error: {}", e)),
	};

	// Resolve the URL host through this server and take the first answer
	let budget = Duration::from_secs(timeout_secs);
	let ip: IpAddr = match timeout(budget, resolver.lookup_ip(host)).await {
		Ok(Ok(lookup)) => match lookup.iter().next() {
			Some(ip) => ip,
			None => return failed(server_address, None, "no A/AAAA records found".to_string()),
		},
		Ok(Err(e)) => return failed(server_address, None, format!("dns resolve error: {}", e)),
		Err(_) => return failed(server_address, None, "dns resolve timeout".to_string()),
	};

	// Connect to the resolved address while keeping the URL host for SNI
	let client = match reqwest::Client::builder()
		.resolve(host, SocketAddr::new(ip, port))
		.connect_timeout(budget)
		.timeout(budget)
		.build()
	{
		Ok(c) => c,
		Err(e) => return failed(server_address, Some(ip), format!("http client error: {}", e)),
	};

	let start = Instant::now();
	let mut bytes_read: u64 = 0;
	let mut http_status: Option<u16> = None;
	let mut error_msg: Option<String> = None;

	// Single streaming GET; count bytes until the measurement window
	// closes or the body ends
	match client.get(url).send().await {
		Ok(response) => {
			http_status = Some(response.status().as_u16());
			let mut body = response.bytes_stream();
			while let Some(chunk) = body.next().await {
				match chunk {
					Ok(bytes) => bytes_read += bytes.len() as u64,
					Err(e) => {
						error_msg = Some(format!("read error: {}", e));
						break;
					}
				}
				if start.elapsed().as_secs() >= duration_secs {
					break;
				}
			}
		}
		Err(e) => {
			error_msg = Some(format!("request error: {}", e));
		}
	}

	let duration_ms = start.elapsed().as_millis() as u64;
	let secs = duration_ms as f64 / 1000.0;
	let bandwidth_mbps = if secs > 0.0 {
		bytes_read as f64 * 8.0 / 1_000_000.0 / secs
	} else {
		0.0
	};

	DownloadResultRecord {
		server_address: server_address.to_string(),
		resolved_ip: Some(ip.to_string()),
		duration_ms,
		bytes_read,
		bandwidth_mbps,
		query_successful: bytes_read > 0 && error_msg.is_none(),
		http_status,
		error_msg,
	}
}
