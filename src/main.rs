//! Observatory control: command line entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  IndiClient     SesameResolver   Phd2Client    SystemClock   │
//! │  (DevicePort)   (EphemerisPort)  (GuiderPort)  (Clock)       │
//! │  LogEventSink   TerminalPrompt   ProgramViewer JsonConfigFile│
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ───────────────────    │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │            Observatory (pure logic)                    │  │
//! │  │  commands · altitude gate · sequence FSM · retries     │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ```text
//! observatory roof state=OPEN
//! observatory sequence target=M42 base_directory=/data filter_name=R exposure_count=20 exposure_time=120
//! observatory --script tonight.txt
//! ```
//!
//! A command that fails is logged and reported on stderr; the process
//! still exits 0.  Unknown command names in a script are skipped and the
//! remaining commands run.  Configuration and connection failures exit non-zero.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};

use observatory::adapters::config_file::JsonConfigFile;
use observatory::adapters::indi::IndiClient;
use observatory::adapters::log_sink::LogEventSink;
use observatory::adapters::logging;
use observatory::adapters::phd2::Phd2Client;
use observatory::adapters::prompt::TerminalPrompt;
use observatory::adapters::sesame::SesameResolver;
use observatory::adapters::time::SystemClock;
use observatory::adapters::viewer::ProgramViewer;
use observatory::app::commands::{COMMAND_NAMES, Params, parse_line, parse_params, retain_known};
use observatory::app::ports::ConfigPort;
use observatory::app::service::Observatory;
use observatory::config::LowAltitudeMode;

/// Observatory control: roof, mount, guider and camera sequencing over INDI.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// JSON configuration file
    #[arg(
        long,
        env = "OBSERVATORY_CONFIG",
        default_value = "/etc/observatory/observatory.json"
    )]
    config: PathBuf,

    /// Run commands from a file, one per line (`#` starts a comment)
    #[arg(long, conflicts_with = "command")]
    script: Option<PathBuf>,

    /// Keep running a script after a command fails
    #[arg(long, requires = "script")]
    keep_going: bool,

    /// Command name (set_light, telescope_cover, target, sequence, focus, showimage, roof)
    command: Option<String>,

    /// Command parameters as key=value
    #[arg(trailing_var_arg = true)]
    params: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = JsonConfigFile::new(&cli.config)
        .load()
        .with_context(|| format!("loading {}", cli.config.display()))?;

    if let Err(e) = logging::init_file(Path::new(&config.log_path), &config.log_level) {
        logging::init_stderr(&config.log_level);
        warn!("Cannot open log file {}: {e}; logging to stderr", config.log_path);
    }
    info!("observatory {} starting", env!("CARGO_PKG_VERSION"));

    let mut commands = collect_commands(&cli)?;
    for name in retain_known(&mut commands) {
        error!("Unknown command: {name}");
        eprintln!("unknown command: {name} (expected one of {})", COMMAND_NAMES.join(", "));
    }
    if commands.is_empty() {
        warn!("Nothing to do");
        return Ok(());
    }

    let devices = IndiClient::connect(&config.indi_host, config.indi_port, config.indi_timeout())
        .with_context(|| format!("connecting to INDI at {}:{}", config.indi_host, config.indi_port))?;
    let ephemeris = SesameResolver::new(&config.resolver_url, config.indi_timeout());
    let guider = Phd2Client::new(&config.guider_url, config.indi_timeout());

    let mut observatory = Observatory::new(
        config.clone(),
        devices,
        ephemeris,
        guider,
        SystemClock::new(),
        LogEventSink::new(),
    )
    .with_viewer(ProgramViewer::new(&config.viewer));
    if config.low_altitude_policy == LowAltitudeMode::Prompt {
        observatory =
            observatory.with_low_altitude_policy(TerminalPrompt::stdio(config.min_altitude_deg));
    }

    for (name, params) in &commands {
        if let Err(e) = observatory.dispatch(name, params) {
            eprintln!("{name}: {e}");
            if !cli.keep_going {
                break;
            }
        }
    }
    info!("observatory finished");
    Ok(())
}

/// The single command from the arguments, or every command in the script.
/// Unparseable script lines are logged and skipped.
fn collect_commands(cli: &Cli) -> Result<Vec<(String, Params)>> {
    if let Some(path) = &cli.script {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        let mut commands = Vec::new();
        for (n, line) in text.lines().enumerate() {
            match parse_line(line) {
                Ok(Some(command)) => commands.push(command),
                Ok(None) => {}
                Err(e) => error!("{}:{}: {e}", path.display(), n + 1),
            }
        }
        return Ok(commands);
    }

    let Some(name) = &cli.command else {
        return Ok(Vec::new());
    };
    match parse_params(&cli.params) {
        Ok(params) => Ok(vec![(name.clone(), params)]),
        Err(e) => {
            error!("{name}: {e}");
            eprintln!("{name}: {e}");
            Ok(Vec::new())
        }
    }
}
