//! Guided imaging sequence engine.
//!
//! ```text
//!  Idle ─▶ Resolving ─▶ AltitudeCheck ─▶ DirectoryReady ─▶ Slewing ─▶ GuideStarting
//!             │               │                                          │
//!             ▼               ▼                                          ▼
//!          Aborted         Aborted                                  GuideFailed
//!
//!  Imaging ⇄ {Dithering ─▶ Capturing} ─▶ GuideStopping ─▶ Complete | Aborted | Failed
//! ```
//!
//! Every phase change goes through the [`Fsm`] table and is emitted as
//! [`AppEvent::StateChanged`].  Once guiding may be running, every exit
//! path passes through `GuideStopping` so the guide loop is never left
//! running behind a failed sequence.

use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::config::GuideFailurePolicy;
use crate::error::{Error, GuideError, Result};
use crate::fsm::context::{SequenceReport, SequenceRun};
use crate::fsm::{Fsm, StateId};
use crate::session;

use super::events::AppEvent;
use super::plan::ExposurePlan;
use super::ports::{Clock, DevicePort, EphemerisPort, EventSink, GuiderPort};
use super::properties as prop;
use super::service::Observatory;
use super::settle::{self, SettleTiming, retry};

impl<D, E, G, C, S> Observatory<D, E, G, C, S>
where
    D: DevicePort,
    E: EphemerisPort,
    G: GuiderPort,
    C: Clock,
    S: EventSink,
{
    /// Run a complete guided imaging sequence for `target`.
    ///
    /// The plan is validated before anything else happens: an unknown
    /// filter or a zero count fails without touching a device.
    pub fn run_sequence(&mut self, target: &str, plan: &ExposurePlan) -> Result<SequenceReport> {
        let slot = plan.validate(&self.config.filters).inspect_err(|e| {
            error!("Sequence for {target} rejected: {e}");
        })?;

        let mut fsm = Fsm::default();
        fsm.start();
        let mut run = SequenceRun::new(target);
        info!(
            "Sequence {target}: {} x {}s through {} (slot {slot})",
            plan.count, plan.exposure_secs, plan.filter
        );

        // ── Resolve ───────────────────────────────────────────
        if let Err(e) = self.advance(&mut fsm, StateId::Resolving) {
            return self.finish_failed(&mut fsm, StateId::Failed, e);
        }
        let coords = match self.resolve(target) {
            Ok(coords) => coords,
            Err(e) => return self.finish_failed(&mut fsm, StateId::Aborted, e),
        };
        run.coords = Some(coords);

        // ── Altitude gate ─────────────────────────────────────
        if let Err(e) = self.advance(&mut fsm, StateId::AltitudeCheck) {
            return self.finish_failed(&mut fsm, StateId::Failed, e);
        }
        let altitude = self.measure_altitude(&coords);
        run.altitude_deg = Some(altitude);
        if let Err(e) = self.gate.check(altitude, self.policy.as_mut()) {
            warn!("Sequence aborted due to low altitude.");
            return self.finish_failed(&mut fsm, StateId::Aborted, e);
        }

        let directory = match session::create_session_dir(&plan.base_directory, target, self.clock.now()) {
            Ok(dir) => dir,
            Err(e) => return self.finish_failed(&mut fsm, StateId::Failed, e),
        };
        if let Err(e) = self.advance(&mut fsm, StateId::DirectoryReady) {
            return self.finish_failed(&mut fsm, StateId::Failed, e);
        }
        self.sink.emit(&AppEvent::DirectoryCreated(directory.clone()));
        run.directory = Some(directory.clone());

        // ── Slew ──────────────────────────────────────────────
        if self.config.slew_before_sequence {
            if self.cancel.is_cancelled() {
                return self.finish_failed(&mut fsm, StateId::Aborted, Error::Cancelled);
            }
            if let Err(e) = self.advance(&mut fsm, StateId::Slewing) {
                return self.finish_failed(&mut fsm, StateId::Failed, e);
            }
            if let Err(e) = self.slew(&coords) {
                return self.finish_failed(&mut fsm, StateId::Failed, e);
            }
        }

        // ── Guiding ───────────────────────────────────────────
        if let Err(e) = self.advance(&mut fsm, StateId::GuideStarting) {
            return self.finish_failed(&mut fsm, StateId::Failed, e);
        }
        match self.start_guiding() {
            Ok(()) => {
                info!("Guiding started");
                run.guiding_active = true;
                run.guided = true;
                self.sink.emit(&AppEvent::GuidingStarted);
            }
            Err(e) => {
                let proceeding = self.config.guide_failure_policy == GuideFailurePolicy::ProceedUnguided;
                self.sink.emit(&AppEvent::GuidingFailed {
                    reason: e.to_string(),
                    proceeding,
                });
                if !proceeding {
                    error!("Guiding failed: {e}");
                    return self.finish_failed(&mut fsm, StateId::GuideFailed, e.into());
                }
                warn!("Guiding failed: {e}; continuing unguided");
            }
        }

        // ── Imaging loop ──────────────────────────────────────
        let outcome = self
            .advance(&mut fsm, StateId::Imaging)
            .and_then(|()| self.imaging_loop(&mut fsm, &mut run, plan, slot, &directory));

        // The guide loop is stopped even if the phase table refuses the move.
        let stopping = self.advance(&mut fsm, StateId::GuideStopping);
        self.stop_guiding(&mut run);

        match outcome.and(stopping) {
            Ok(()) => {
                if let Err(e) = self.advance(&mut fsm, StateId::Complete) {
                    return self.finish_failed(&mut fsm, StateId::Failed, e);
                }
                info!(
                    "Sequence complete. {} frames stored in {}.",
                    run.frames.len(),
                    directory.display()
                );
                self.sink.emit(&AppEvent::SequenceComplete {
                    directory,
                    frames: run.frames.len(),
                });
                Ok(run.into_report())
            }
            Err(Error::Cancelled) => self.finish_failed(&mut fsm, StateId::Aborted, Error::Cancelled),
            Err(e) => self.finish_failed(&mut fsm, StateId::Failed, e),
        }
    }

    // ── Phases ────────────────────────────────────────────────

    fn imaging_loop(
        &mut self,
        fsm: &mut Fsm,
        run: &mut SequenceRun,
        plan: &ExposurePlan,
        slot: u8,
        directory: &Path,
    ) -> Result<()> {
        for index in 1..=plan.count {
            if self.cancel.is_cancelled() {
                warn!("Sequence cancelled before exposure {index}");
                return Err(Error::Cancelled);
            }
            run.exposure_index = index;

            if index > 1 {
                self.advance(fsm, StateId::Dithering)?;
                self.dither(run.dithers + 1)?;
                run.dithers += 1;
                self.sink.emit(&AppEvent::Dithered {
                    before_exposure: index,
                });
            }

            self.advance(fsm, StateId::Capturing)?;
            let path = self.capture(plan, slot, directory, index)?;
            self.sink.emit(&AppEvent::FrameCaptured {
                index,
                path: path.clone(),
            });
            run.frames.push(path);
            self.advance(fsm, StateId::Imaging)?;
        }
        Ok(())
    }

    /// Enable multi-star mode then start the loop, each with retries.
    fn start_guiding(&mut self) -> core::result::Result<(), GuideError> {
        let attempts = self.config.retry_attempts;
        let delay = self.config.retry_delay();
        retry("enable multi-star", attempts, delay, &mut self.clock, || {
            self.guider.enable_multi_star()
        })?;
        retry("start guiding", attempts, delay, &mut self.clock, || {
            self.guider.start_guiding()
        })
    }

    /// Best-effort stop; a failure is flagged on the run, not raised.
    fn stop_guiding(&mut self, run: &mut SequenceRun) {
        if !run.guiding_active {
            return;
        }
        let attempts = self.config.retry_attempts;
        let delay = self.config.retry_delay();
        match retry("stop guiding", attempts, delay, &mut self.clock, || {
            self.guider.stop_guiding()
        }) {
            Ok(()) => {
                info!("Guiding stopped");
                run.guiding_active = false;
                self.sink.emit(&AppEvent::GuidingStopped);
            }
            Err(e) => {
                error!("Could not stop guiding: {e}");
                run.guide_stop_failed = true;
            }
        }
    }

    /// Move the mount a small step between exposures.  Odd dithers go
    /// north and west, even dithers south and east, so the pointing walks
    /// back and forth instead of drifting.
    fn dither(&mut self, n: u32) -> Result<()> {
        let (ns, we) = if n % 2 == 1 {
            (prop::MOTION_NORTH, prop::MOTION_WEST)
        } else {
            (prop::MOTION_SOUTH, prop::MOTION_EAST)
        };
        let pulse = self.config.dither_pulse();
        let settle_time = self.config.dither_settle();
        let mount = &self.config.devices.mount;

        self.devices.set_switch(mount, prop::TELESCOPE_MOTION_NS, ns, true)?;
        self.clock.sleep(pulse);
        self.devices.set_switch(mount, prop::TELESCOPE_MOTION_NS, ns, false)?;

        self.devices.set_switch(mount, prop::TELESCOPE_MOTION_WE, we, true)?;
        self.clock.sleep(pulse);
        self.devices.set_switch(mount, prop::TELESCOPE_MOTION_WE, we, false)?;

        self.clock.sleep(settle_time);
        info!("Dither {n}: {ns} + {we}");
        Ok(())
    }

    /// Select the filter, expose, wait for readout, save.
    fn capture(&mut self, plan: &ExposurePlan, slot: u8, directory: &Path, index: u32) -> Result<PathBuf> {
        let poll = self.config.poll_interval();
        let wheel_wait = SettleTiming {
            min_wait: self.config.filter_settle(),
            timeout: self.config.filter_timeout(),
            poll,
        };
        let exposure_done = plan.exposure().saturating_add(self.config.readout_margin());
        let camera_wait = SettleTiming {
            min_wait: exposure_done,
            timeout: exposure_done.saturating_add(self.config.exposure_timeout()),
            poll,
        };
        let attempts = self.config.retry_attempts;
        let delay = self.config.retry_delay();
        let wheel = &self.config.devices.filter_wheel;
        let camera = &self.config.devices.camera;

        self.devices.set_number(
            wheel,
            prop::FILTER_SLOT,
            &[(prop::FILTER_SLOT_VALUE, f64::from(slot))],
        )?;
        settle::wait_while_busy(&mut self.devices, &mut self.clock, wheel, prop::FILTER_SLOT, wheel_wait)?;

        self.devices.set_number(
            camera,
            prop::CCD_EXPOSURE,
            &[(prop::CCD_EXPOSURE_VALUE, plan.exposure_secs)],
        )?;
        info!("Exposure {index}/{} started ({}s)", plan.count, plan.exposure_secs);
        settle::wait_while_busy(&mut self.devices, &mut self.clock, camera, prop::CCD_EXPOSURE, camera_wait)?;

        let path = directory.join(session::frame_filename(&plan.filter, self.clock.now(), index));
        let target = path.to_string_lossy();
        retry("save frame", attempts, delay, &mut self.clock, || {
            self.devices.set_text(camera, prop::CCD_SAVE, prop::CCD_SAVE_PATH, &target)
        })?;
        info!("Saved {}", path.display());
        Ok(path)
    }

    // ── FSM plumbing ──────────────────────────────────────────

    /// Move to `next` and emit the change.  A move the table refuses is an
    /// error; the caller ends the run instead of doing the step's I/O.
    fn advance(&mut self, fsm: &mut Fsm, next: StateId) -> Result<()> {
        let from = fsm.current_state();
        fsm.transition(next)?;
        self.sink.emit(&AppEvent::StateChanged { from, to: next });
        Ok(())
    }

    /// Enter terminal `state`, log and emit why, and hand back `err`.
    fn finish_failed<T>(&mut self, fsm: &mut Fsm, state: StateId, err: Error) -> Result<T> {
        if let Err(e) = self.advance(fsm, state) {
            error!("Cannot record end of sequence: {e}");
        }
        error!("Sequence ended in {}: {err}", fsm.current_name());
        self.sink.emit(&AppEvent::SequenceAborted {
            state,
            reason: err.to_string(),
        });
        Err(err)
    }
}
