use anyhow::{anyhow, Result};
use tracing::info;

/// Public list the `servers update` subcommand pulls from by default
pub const DEFAULT_LIST_URL: &str =
	"https://raw.githubusercontent.com/bluebeard9998/DNS_SERVERS/main/servers.txt";

const DEFAULT_SERVERS: &[&str] = &[
	// Standard DNS (UDP/53)
	"8.8.8.8",          // Google Public DNS
	"8.8.4.4",          // Google Public DNS
	"1.1.1.1",          // Cloudflare DNS
	"1.0.0.1",          // Cloudflare DNS
	"9.9.9.9",          // Quad9 (Malware Blocking, DNSSEC Validation)
	"149.112.112.112",  // Quad9
	"208.67.222.222",   // OpenDNS Home
	"208.67.220.220",   // OpenDNS Home
	"94.140.14.14",     // AdGuard DNS
	"94.140.15.15",     // AdGuard DNS
	"76.76.2.0",        // Control D
	"76.76.10.0",       // Control D
	"185.222.222.222",  // DNS.SB
	"45.11.45.11",      // DNS.SB
	"194.242.2.2",      // Mullvad
	"45.90.28.0",       // NextDNS
	"193.110.81.9",     // DNS0.EU
	"77.88.8.8",        // Yandex DNS Basic
	"223.5.5.5",        // AliDNS
	"119.29.29.29",     // DNSPod
	"74.82.42.42",      // Hurricane Electric
	"8.26.56.26",       // Comodo Secure DNS
	"91.239.100.100",   // UncensoredDNS

	// DNS-over-TLS (DoT)
	"tls://cloudflare-dns.com:853",
	"tls://dns.google:853",
	"tls://dns.quad9.net:853",
	"tls://dns.adguard.com:853",

	// DNS-over-HTTPS (DoH)
	"https://cloudflare-dns.com/dns-query",
	"https://dns.google/dns-query",
	"https://dns.quad9.net/dns-query",
	"https://doh.dns.sb/dns-query",
	"https://dns.adguard-dns.com/dns-query",
	"https://doh.opendns.com/dns-query",

	// DNS-over-QUIC (DoQ)
	"quic://dns.adguard.com",
	"quic://unfiltered.adguard-dns.com",
];

/// Built-in server list used when no custom list is supplied.
pub fn default_servers() -> Vec<String> {
	DEFAULT_SERVERS.iter().map(|s| s.to_string()).collect()
}

/// Parse a server-list text: one address per line, surrounding
/// whitespace trimmed, blank lines and '#' comments dropped.
pub fn parse_server_list(content: &str) -> Vec<String> {
	content
		.lines()
		.map(str::trim)
		.filter(|line| !line.is_empty() && !line.starts_with('#'))
		.map(String::from)
		.collect()
}

/// Read a stored server list from a file.
pub fn load_server_file(path: &str) -> Result<Vec<String>> {
	let content = std::fs::read_to_string(path)
		.map_err(|e| anyhow!("failed to read server file '{}': {}", path, e))?;
	Ok(parse_server_list(&content))
}

/// Write a server list to a file, one address per line.
///
/// The same trim-and-drop-blanks normalization applies on the way out,
/// so an edited list round-trips clean.
pub fn store_server_file(path: &str, servers: &[String]) -> Result<()> {
	let normalized: Vec<&str> = servers
		.iter()
		.map(|s| s.trim())
		.filter(|s| !s.is_empty())
		.collect();
	let mut text = normalized.join("\n");
	text.push('\n');
	std::fs::write(path, text)
		.map_err(|e| anyhow!("failed to write server file '{}': {}", path, e))
}

/// Fetch a fresh server list from a URL.
pub async fn fetch_server_list(url: &str) -> Result<Vec<String>> {
	info!("updating server list from {}", url);
	let text = reqwest::get(url).await?.text().await?;
	let servers = parse_server_list(&text);
	if servers.is_empty() {
		return Err(anyhow!("no servers found at {}", url));
	}
	Ok(servers)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_drops_blanks_and_comments() {
		let content = "  8.8.8.8  \n\n# upstream set\n1.1.1.1\n\t\ntls://dns.google:853\n";
		let servers = parse_server_list(content);
		assert_eq!(servers, vec!["8.8.8.8", "1.1.1.1", "tls://dns.google:853"]);
	}

	#[test]
	fn test_store_and_load_round_trip() {
		let dir = std::env::temp_dir()
			.join(format!("dns-speed-bench-servers-{}", std::process::id()));
		std::fs::create_dir_all(&dir).unwrap();
		let path = dir.join("servers.txt");
		let path = path.to_str().unwrap();

		let servers = vec![
			" 8.8.8.8 ".to_string(),
			"".to_string(),
			"quic://dns.adguard.com".to_string(),
		];
		store_server_file(path, &servers).unwrap();
		let loaded = load_server_file(path).unwrap();
		assert_eq!(loaded, vec!["8.8.8.8", "quic://dns.adguard.com"]);

		std::fs::remove_dir_all(&dir).ok();
	}

	#[test]
	fn test_defaults_cover_every_transport() {
		let defaults = default_servers();
		assert!(!defaults.is_empty());
		assert!(defaults.iter().any(|s| s.starts_with("tls://")));
		assert!(defaults.iter().any(|s| s.starts_with("https://")));
		assert!(defaults.iter().any(|s| s.starts_with("quic://")));
	}
}
