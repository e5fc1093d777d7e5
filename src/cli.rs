use clap::{Args, Parser, Subcommand};

/// DNS resolution and download-bandwidth benchmark tool
#[derive(Parser, Debug)]
#[command(name = "dns-speed-bench")]
#[command(about = "Benchmark DNS resolvers and per-resolver download bandwidth")]
pub struct Cli {
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Benchmark DNS resolution of a domain or IP across many servers
	Dns {
		/// Domain or IP to resolve (e.g. example.com or 65.49.2.178)
		target: String,

		/// Measured lookups per server
		#[arg(short = 'n', long = "samples", default_value = "3")]
		samples: u32,

		/// Per-lookup timeout in seconds
		#[arg(short = 't', long = "timeout-secs", default_value = "11")]
		timeout_secs: u64,

		/// Validate DNSSEC (slower benchmark but accurate)
		#[arg(long = "dnssec")]
		dnssec: bool,

		/// Run one unmeasured warm-up lookup per server first
		#[arg(long = "warm-up")]
		warm_up: bool,

		#[command(flatten)]
		servers: ServerArgs,

		#[command(flatten)]
		export: ExportArgs,
	},

	/// Test download bandwidth through each DNS server
	Speed {
		/// HTTP or HTTPS file url to download
		url: String,

		/// Measured download duration per server, in seconds
		#[arg(short = 'd', long = "duration-secs", default_value = "7")]
		duration_secs: u64,

		/// Request timeout in seconds
		#[arg(short = 't', long = "timeout-secs", default_value = "10")]
		timeout_secs: u64,

		#[command(flatten)]
		servers: ServerArgs,

		#[command(flatten)]
		export: ExportArgs,
	},

	/// Inspect or update the DNS server list
	Servers {
		#[command(subcommand)]
		action: ServersAction,
	},
}

#[derive(Args, Debug)]
pub struct ServerArgs {
	/// DNS server address (repeatable; IP, tls://, https://, quic:// or h3:// form)
	#[arg(short = 's', long = "server")]
	pub servers: Vec<String>,

	/// File containing server addresses (one per line)
	#[arg(long = "server-file")]
	pub server_file: Option<String>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
	/// Write the results CSV directly to this path
	#[arg(short = 'o', long = "output")]
	pub output: Option<String>,

	/// Export the results CSV with a generated filename
	#[arg(long = "export")]
	pub export: bool,

	/// Export the raw results as JSON with a generated filename
	#[arg(long = "export-json")]
	pub export_json: bool,

	/// Directory for exported files (skips the interactive prompt)
	#[arg(long = "export-dir")]
	pub export_dir: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ServersAction {
	/// Print the effective server list
	Show {
		/// Stored list to read instead of the built-in defaults
		#[arg(long = "server-file")]
		server_file: Option<String>,
	},

	/// Fetch a server list and store it to a file
	Update {
		/// Source url for the list (one address per line)
		#[arg(long = "url")]
		url: Option<String>,

		/// Destination file
		#[arg(long = "server-file")]
		server_file: String,
	},
}
