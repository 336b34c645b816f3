//! Inbound commands to the application service.
//!
//! A command arrives as a name plus named parameters, from the command
//! line (`observatory sequence target=M42 filter_name=R ...`) or from a
//! night script, one command per line.  [`Command::parse`] maps that onto
//! a typed request that the [`Observatory`](super::service::Observatory)
//! executes.
//!
//! | Name              | Parameters                                                        |
//! |-------------------|-------------------------------------------------------------------|
//! | `set_light`       | `state`                                                           |
//! | `telescope_cover` | `state`                                                           |
//! | `target`          | `target_name`                                                     |
//! | `sequence`        | `target`, `base_directory`, `filter_name`, `exposure_count`, `exposure_time` |
//! | `focus`           | `direction` (in/out, optional), `duration` (seconds, optional)    |
//! | `showimage`       | `directory`, `image_name`                                         |
//! | `roof`            | `state`                                                           |

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::CommandError;

use super::plan::ExposurePlan;

/// Named parameters, as parsed from `key=value` tokens.
pub type Params = BTreeMap<String, String>;

/// Every command name the dispatcher knows.
pub const COMMAND_NAMES: [&str; 7] = [
    "set_light",
    "telescope_cover",
    "target",
    "sequence",
    "focus",
    "showimage",
    "roof",
];

/// Focuser travel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusDirection {
    Inward,
    Outward,
}

impl FocusDirection {
    /// INDI `FOCUS_MOTION` element for this direction.
    pub fn element(self) -> &'static str {
        match self {
            Self::Inward => "FOCUS_INWARD",
            Self::Outward => "FOCUS_OUTWARD",
        }
    }
}

impl FromStr for FocusDirection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "in" | "inward" => Ok(Self::Inward),
            "out" | "outward" => Ok(Self::Outward),
            _ => Err(()),
        }
    }
}

/// Commands that external callers can send into the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Switch the red observing light.
    SetLight { state: String },

    /// Open or close the telescope dust cover.
    TelescopeCover { state: String },

    /// Resolve, altitude-gate and slew to a named object.
    Target { target_name: String },

    /// Run a full guided imaging sequence.
    Sequence { target: String, plan: ExposurePlan },

    /// Open-loop focuser nudge.
    Focus {
        direction: FocusDirection,
        duration: Option<Duration>,
    },

    /// Open a saved frame in the FITS viewer.
    ShowImage { directory: PathBuf, image_name: String },

    /// Open or close the roof.
    Roof { state: String },
}

impl Command {
    /// The dispatch name of this command.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetLight { .. } => "set_light",
            Self::TelescopeCover { .. } => "telescope_cover",
            Self::Target { .. } => "target",
            Self::Sequence { .. } => "sequence",
            Self::Focus { .. } => "focus",
            Self::ShowImage { .. } => "showimage",
            Self::Roof { .. } => "roof",
        }
    }

    /// Map a command name and its parameters onto a typed command.
    pub fn parse(name: &str, params: &Params) -> Result<Self, CommandError> {
        let cmd = match name {
            "set_light" => Self::SetLight {
                state: required(params, "set_light", "state")?.to_owned(),
            },
            "telescope_cover" => Self::TelescopeCover {
                state: required(params, "telescope_cover", "state")?.to_owned(),
            },
            "roof" => Self::Roof {
                state: required(params, "roof", "state")?.to_owned(),
            },
            "target" => Self::Target {
                target_name: required(params, "target", "target_name")?.to_owned(),
            },
            "sequence" => {
                let target = required(params, "sequence", "target")?.to_owned();
                let plan = ExposurePlan::new(
                    required(params, "sequence", "filter_name")?,
                    parse_value(params, "sequence", "exposure_time")?,
                    parse_value(params, "sequence", "exposure_count")?,
                    required(params, "sequence", "base_directory")?,
                );
                Self::Sequence { target, plan }
            }
            "focus" => {
                let direction = match params.get("direction") {
                    Some(raw) => raw.parse().map_err(|()| invalid("direction", raw))?,
                    None => FocusDirection::Inward,
                };
                let duration = match params.get("duration") {
                    Some(raw) => {
                        let secs: f64 = raw.parse().map_err(|_| invalid("duration", raw))?;
                        if !secs.is_finite() || secs <= 0.0 || secs > 60.0 {
                            return Err(invalid("duration", raw));
                        }
                        Some(Duration::from_secs_f64(secs))
                    }
                    None => None,
                };
                Self::Focus {
                    direction,
                    duration,
                }
            }
            "showimage" => Self::ShowImage {
                directory: PathBuf::from(required(params, "showimage", "directory")?),
                image_name: required(params, "showimage", "image_name")?.to_owned(),
            },
            other => return Err(CommandError::Unknown(other.to_owned())),
        };
        Ok(cmd)
    }
}

// ── Argument parsing ──────────────────────────────────────────

/// Collect `key=value` tokens into [`Params`].  A later duplicate key
/// overrides an earlier one.
pub fn parse_params<I, S>(tokens: I) -> Result<Params, CommandError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut params = Params::new();
    for token in tokens {
        let token = token.as_ref();
        let (key, value) = token
            .split_once('=')
            .filter(|(k, _)| !k.is_empty())
            .ok_or_else(|| CommandError::MalformedArgument(token.to_owned()))?;
        params.insert(key.to_owned(), value.to_owned());
    }
    Ok(params)
}

/// Parse one script line: `name key=value key="quoted value"`.
///
/// Blank lines and lines starting with `#` yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<(String, Params)>, CommandError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut tokens = tokenize(line)?.into_iter();
    let Some(name) = tokens.next() else {
        return Ok(None);
    };
    Ok(Some((name, parse_params(tokens)?)))
}

/// Drop every command whose name is not in [`COMMAND_NAMES`], keeping the
/// rest in order.  Returns the dropped names.
pub fn retain_known(commands: &mut Vec<(String, Params)>) -> Vec<String> {
    let mut unknown = Vec::new();
    commands.retain(|(name, _)| {
        let known = COMMAND_NAMES.contains(&name.as_str());
        if !known {
            unknown.push(name.clone());
        }
        known
    });
    unknown
}

/// Split on whitespace, keeping double-quoted runs together.
fn tokenize(line: &str) -> Result<Vec<String>, CommandError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if in_quotes {
        return Err(CommandError::MalformedArgument(line.to_owned()));
    }
    if has_token {
        tokens.push(current);
    }
    Ok(tokens)
}

fn required<'a>(
    params: &'a Params,
    command: &'static str,
    name: &'static str,
) -> Result<&'a str, CommandError> {
    params
        .get(name)
        .map(String::as_str)
        .ok_or(CommandError::MissingParameter { command, name })
}

fn parse_value<T: FromStr>(
    params: &Params,
    command: &'static str,
    name: &'static str,
) -> Result<T, CommandError> {
    let raw = required(params, command, name)?;
    raw.parse().map_err(|_| invalid(name, raw))
}

fn invalid(name: &str, value: &str) -> CommandError {
    CommandError::InvalidParameter {
        name: name.to_owned(),
        value: value.to_owned(),
    }
}
