//! Guider adapter: HTTP bridge in front of PHD2.
//!
//! Each operation is a `GET` on the bridge; the body is JSON
//! `{"status": "..."}` and only an exact `"OK"` counts as success.
//!
//! | Operation         | Endpoint                                  |
//! |-------------------|-------------------------------------------|
//! | enable_multi_star | `/set_dec_guide_mode?mode=multistar`      |
//! | start_guiding     | `/guide`                                  |
//! | stop_guiding      | `/stop_capture`                           |

use std::time::Duration;

use log::debug;
use serde::Deserialize;
use ureq::Agent;

use crate::app::ports::GuiderPort;
use crate::error::{GuideError, GuideStage};

#[derive(Debug, Deserialize)]
struct StatusReply {
    status: String,
}

/// Client for the guider bridge.
pub struct Phd2Client {
    base_url: String,
    agent: Agent,
}

impl Phd2Client {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    fn call(&self, stage: GuideStage, path: &str) -> Result<(), GuideError> {
        let url = format!("{}{path}", self.base_url);
        debug!("Guider GET {url}");
        let transport = |message: String| GuideError::Transport { stage, message };

        let reply: StatusReply = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| transport(e.to_string()))?
            .into_body()
            .read_json()
            .map_err(|e| transport(format!("unreadable reply: {e}")))?;

        check_status(stage, reply.status)
    }
}

fn check_status(stage: GuideStage, status: String) -> Result<(), GuideError> {
    if status == "OK" {
        Ok(())
    } else {
        Err(GuideError::Rejected { stage, status })
    }
}

impl GuiderPort for Phd2Client {
    fn enable_multi_star(&mut self) -> Result<(), GuideError> {
        self.call(GuideStage::EnableMultiStar, "/set_dec_guide_mode?mode=multistar")
    }

    fn start_guiding(&mut self) -> Result<(), GuideError> {
        self.call(GuideStage::Start, "/guide")
    }

    fn stop_guiding(&mut self) -> Result<(), GuideError> {
        self.call(GuideStage::Stop, "/stop_capture")
    }
}
