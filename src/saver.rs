use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use tracing::error;

/// A place exported files can be written to.
///
/// Implementations never panic past this boundary: any failure is
/// reported as `false` so a broken export cannot take down a finished
/// benchmark.
pub trait SaveSurface {
	fn save(&self, contents: &[u8], suggested_name: &str) -> bool;
}

/// Interactive surface: asks the user where to save, with the suggested
/// name as the default. Only offered when running on a terminal.
pub struct PromptSaver;

impl SaveSurface for PromptSaver {
	fn save(&self, contents: &[u8], suggested_name: &str) -> bool {
		eprint!("Save as [{}]: ", suggested_name);
		if io::stderr().flush().is_err() {
			return false;
		}
		let mut line = String::new();
		if io::stdin().read_line(&mut line).is_err() {
			error!("could not read save path from stdin");
			return false;
		}
		let chosen = line.trim();
		let path = if chosen.is_empty() {
			PathBuf::from(suggested_name)
		} else {
			PathBuf::from(chosen)
		};
		write_file(&path, contents)
	}
}

/// Fallback surface: writes straight into a directory under the
/// suggested name, no questions asked.
pub struct DirectSaver {
	dir: PathBuf,
}

impl DirectSaver {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}
}

impl SaveSurface for DirectSaver {
	fn save(&self, contents: &[u8], suggested_name: &str) -> bool {
		write_file(&self.dir.join(suggested_name), contents)
	}
}

/// Pick the save surface once at startup by probing for a terminal.
pub fn detect() -> Box<dyn SaveSurface> {
	if io::stdin().is_terminal() && io::stderr().is_terminal() {
		Box::new(PromptSaver)
	} else {
		Box::new(DirectSaver::new("."))
	}
}

// The File handle is scoped to this function, so the descriptor is
// released on every exit path, including mid-write failures.
fn write_file(path: &Path, contents: &[u8]) -> bool {
	let result = File::create(path).and_then(|mut file| {
		file.write_all(contents)?;
		file.flush()
	});
	match result {
		Ok(()) => {
			println!("Saved: {}", path.display());
			true
		}
		Err(e) => {
			error!("failed to save {}: {}", path.display(), e);
			false
		}
	}
}
