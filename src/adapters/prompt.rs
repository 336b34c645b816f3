//! Terminal prompt for the low-altitude gate.
//!
//! Writes the question to the operator and reads one line.  Only `y` or
//! `yes` (any case) proceeds; anything else, including end of input,
//! declines.

use std::io::{self, BufRead, Write};

use log::{info, warn};

use crate::app::ports::LowAltitudePolicy;

pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
    threshold_deg: f64,
}

impl TerminalPrompt<io::StdinLock<'static>, io::Stderr> {
    /// Prompt on stderr, answer on stdin.
    pub fn stdio(threshold_deg: f64) -> Self {
        Self::new(io::stdin().lock(), io::stderr(), threshold_deg)
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W, threshold_deg: f64) -> Self {
        Self {
            input,
            output,
            threshold_deg,
        }
    }
}

impl<R: BufRead, W: Write> LowAltitudePolicy for TerminalPrompt<R, W> {
    fn allow_low_altitude(&mut self, altitude_deg: f64) -> bool {
        let asked = write!(
            self.output,
            "Target is at {altitude_deg:.2} deg, below the {:.1} deg limit. Proceed anyway? [y/N] ",
            self.threshold_deg
        )
        .and_then(|()| self.output.flush());
        if let Err(e) = asked {
            warn!("Cannot prompt for low-altitude confirmation: {e}");
            return false;
        }

        let mut answer = String::new();
        if self.input.read_line(&mut answer).is_err() {
            return false;
        }
        let yes = matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes");
        info!(
            "Operator {} low-altitude target",
            if yes { "accepted" } else { "declined" }
        );
        yes
    }
}
