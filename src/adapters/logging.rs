//! Log file setup.
//!
//! Every record goes to one append-only file as
//! `YYYY-MM-DD HH:MM:SS - LEVEL - message` (UTC).  `RUST_LOG` overrides
//! the configured level.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use chrono::Utc;
use env_logger::{Builder, Env, Target};

/// Install the global logger writing to `path`.
pub fn init_file(path: &Path, level: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    builder(level).target(Target::Pipe(Box::new(file))).init();
    Ok(())
}

/// Install the global logger on stderr, for when the log file cannot be
/// opened.
pub fn init_stderr(level: &str) {
    builder(level).target(Target::Stderr).init();
}

fn builder(level: &str) -> Builder {
    let mut builder = Builder::from_env(Env::default().default_filter_or(level));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} - {} - {}",
            Utc::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.args()
        )
    });
    builder
}
