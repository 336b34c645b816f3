//! Application service: the hexagonal core.
//!
//! [`Observatory`] owns the configuration, the altitude gate and every
//! driven port.  It exposes one method per operator command plus
//! [`dispatch`](Observatory::dispatch) for name + parameter input.  The
//! guided imaging sequence lives in [`sequence`](super::sequence) as a
//! second `impl` block on the same type.
//!
//! ```text
//!   DevicePort ◀──┐ ┌──────────────────────────┐ ┌──▶ EventSink
//!  EphemerisPort ◀┼─│       Observatory         │─┤
//!   GuiderPort ◀──┘ │  gate · FSM · settle/retry│ └──▶ ImageViewer
//!        Clock ◀────└──────────────────────────┘
//! ```

use std::path::Path;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::config::{LowAltitudeMode, ObservatoryConfig};
use crate::error::{CommandError, Error, Result};
use crate::safety::{AltitudeGate, AlwaysProceed, NeverBelowThreshold};
use crate::sky::{EquatorialCoords, Site};

use super::cancel::CancelToken;
use super::commands::{Command, FocusDirection, Params};
use super::events::AppEvent;
use super::ports::{
    Clock, DevicePort, EphemerisPort, EventSink, GuiderPort, ImageViewer, LowAltitudePolicy,
};
use super::properties as prop;
use super::settle::{self, SettleTiming};

/// Which observatory switch a state command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Switchable {
    Light,
    Cover,
    Roof,
}

/// Viewer used until one is installed: always fails.
struct NoViewer;

impl ImageViewer for NoViewer {
    fn open(&mut self, _path: &Path) -> std::io::Result<()> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "no image viewer configured",
        ))
    }
}

/// Default policy for a configured mode.  `Prompt` needs a terminal, so the
/// library falls back to declining; the binary installs the prompt adapter.
fn policy_for(mode: LowAltitudeMode) -> Box<dyn LowAltitudePolicy> {
    match mode {
        LowAltitudeMode::Always => Box::new(AlwaysProceed),
        LowAltitudeMode::Never | LowAltitudeMode::Prompt => Box::new(NeverBelowThreshold),
    }
}

// ───────────────────────────────────────────────────────────────
// Observatory
// ───────────────────────────────────────────────────────────────

/// The observatory sequencer.
pub struct Observatory<D, E, G, C, S> {
    pub(super) config: ObservatoryConfig,
    pub(super) gate: AltitudeGate,
    pub(super) devices: D,
    pub(super) ephemeris: E,
    pub(super) guider: G,
    pub(super) clock: C,
    pub(super) sink: S,
    pub(super) policy: Box<dyn LowAltitudePolicy>,
    viewer: Box<dyn ImageViewer>,
    pub(super) cancel: CancelToken,
}

impl<D, E, G, C, S> Observatory<D, E, G, C, S>
where
    D: DevicePort,
    E: EphemerisPort,
    G: GuiderPort,
    C: Clock,
    S: EventSink,
{
    /// Wire the service to its ports.
    ///
    /// The low-altitude policy follows `config.low_altitude_policy`
    /// (`prompt` declines until a prompt is installed with
    /// [`with_low_altitude_policy`](Self::with_low_altitude_policy)).
    pub fn new(
        config: ObservatoryConfig,
        devices: D,
        ephemeris: E,
        guider: G,
        clock: C,
        sink: S,
    ) -> Self {
        let gate = AltitudeGate::new(&config);
        let policy = policy_for(config.low_altitude_policy);
        Self {
            config,
            gate,
            devices,
            ephemeris,
            guider,
            clock,
            sink,
            policy,
            viewer: Box::new(NoViewer),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_low_altitude_policy(mut self, policy: impl LowAltitudePolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn with_viewer(mut self, viewer: impl ImageViewer + 'static) -> Self {
        self.viewer = Box::new(viewer);
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn config(&self) -> &ObservatoryConfig {
        &self.config
    }

    pub fn devices(&self) -> &D {
        &self.devices
    }

    pub fn guider(&self) -> &G {
        &self.guider
    }

    pub fn ephemeris(&self) -> &E {
        &self.ephemeris
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Clone of the token checked by running sequences.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    // ── Command dispatch ──────────────────────────────────────

    /// Parse and execute a named command.
    ///
    /// Unknown names are logged and returned as
    /// [`CommandError::Unknown`]; no device is touched.
    pub fn dispatch(&mut self, name: &str, params: &Params) -> Result<()> {
        let cmd = Command::parse(name, params).map_err(|e| {
            match &e {
                CommandError::Unknown(n) => error!("Unknown command: {n}"),
                other => error!("Bad {name} command: {other}"),
            }
            Error::from(e)
        })?;
        self.execute(cmd)
    }

    /// Execute a typed command.
    pub fn execute(&mut self, cmd: Command) -> Result<()> {
        let name = cmd.name();
        debug!("Executing {name}");
        let result = match cmd {
            Command::SetLight { state } => self.set_light(&state),
            Command::TelescopeCover { state } => self.telescope_cover(&state),
            Command::Roof { state } => self.roof(&state),
            Command::Target { target_name } => self.slew_to(&target_name).map(|_| ()),
            Command::Sequence { target, plan } => self.run_sequence(&target, &plan).map(|_| ()),
            Command::Focus {
                direction,
                duration,
            } => self.focus(direction, duration),
            Command::ShowImage {
                directory,
                image_name,
            } => self.show_image(&directory, &image_name),
        };
        if let Err(e) = &result {
            error!("{name} failed: {e}");
        }
        result
    }

    // ── Observatory switches ──────────────────────────────────

    /// Switch the observing light.  `state` is the `LIGHT_STATE` element
    /// to turn on (e.g. `LIGHT_ON`).
    pub fn set_light(&mut self, state: &str) -> Result<()> {
        self.set_state(Switchable::Light, state)
    }

    /// Open or close the telescope cover (`COVER_STATE` element).
    pub fn telescope_cover(&mut self, state: &str) -> Result<()> {
        self.set_state(Switchable::Cover, state)
    }

    /// Open or close the roof (`ROOF_STATE` element).
    pub fn roof(&mut self, state: &str) -> Result<()> {
        self.set_state(Switchable::Roof, state)
    }

    fn set_state(&mut self, what: Switchable, state: &str) -> Result<()> {
        let (device, property) = match what {
            Switchable::Light => (&self.config.devices.light, prop::LIGHT_STATE),
            Switchable::Cover => (&self.config.devices.cover, prop::COVER_STATE),
            Switchable::Roof => (&self.config.devices.roof, prop::ROOF_STATE),
        };
        self.devices.set_switch(device, property, state, true)?;
        info!("Set {device} {property} to {state}");
        self.sink.emit(&AppEvent::DeviceSet {
            device: device.clone(),
            property,
            value: state.to_owned(),
        });
        Ok(())
    }

    // ── Targeting ─────────────────────────────────────────────

    /// Resolve `target`, run the altitude gate, then slew and wait for the
    /// mount to settle.  Nothing is sent to the mount if the gate declines.
    pub fn slew_to(&mut self, target: &str) -> Result<EquatorialCoords> {
        let coords = self.resolve(target)?;
        let altitude = self.measure_altitude(&coords);
        if let Err(e) = self.gate.check(altitude, self.policy.as_mut()) {
            warn!("Slew to {target} cancelled due to low altitude.");
            return Err(e);
        }
        self.slew(&coords)?;
        Ok(coords)
    }

    pub(super) fn resolve(&mut self, target: &str) -> Result<EquatorialCoords> {
        match self.ephemeris.resolve(target)? {
            Some(coords) => {
                info!(
                    "Resolved {target}: RA {:.5} deg, Dec {:.5} deg",
                    coords.ra_deg, coords.dec_deg
                );
                self.sink.emit(&AppEvent::TargetResolved {
                    name: target.to_owned(),
                    coords,
                });
                Ok(coords)
            }
            None => {
                error!("Object {target} not found.");
                self.sink.emit(&AppEvent::TargetNotFound(target.to_owned()));
                Err(Error::TargetNotFound(target.to_owned()))
            }
        }
    }

    /// Observing site as reported by the mount, or the configured site
    /// when the mount has no `GEOGRAPHIC_COORD`.
    pub(super) fn site(&mut self) -> Site {
        let mount = &self.config.devices.mount;
        let mut read = |element: &str| self.devices.number(mount, prop::GEOGRAPHIC_COORD, element);
        match (read(prop::LAT), read(prop::LONG), read(prop::ELEV)) {
            (Ok(latitude_deg), Ok(longitude_deg), Ok(elevation_m)) => Site {
                latitude_deg,
                longitude_deg,
                elevation_m,
            },
            (Err(e), ..) | (_, Err(e), _) | (.., Err(e)) => {
                debug!("Mount site unavailable ({e}); using configured site");
                self.config.site
            }
        }
    }

    /// Current altitude of `coords`; logged and emitted for the gate.
    pub(super) fn measure_altitude(&mut self, coords: &EquatorialCoords) -> f64 {
        let site = self.site();
        let altitude_deg = self.ephemeris.altitude_deg(coords, &site, self.clock.now());
        info!("Current altitude: {altitude_deg:.2} deg");
        self.sink.emit(&AppEvent::AltitudeChecked {
            altitude_deg,
            threshold_deg: self.gate.threshold_deg(),
        });
        altitude_deg
    }

    /// Command the slew (RA in hours) and wait while the mount is busy.
    pub(super) fn slew(&mut self, coords: &EquatorialCoords) -> Result<()> {
        let timing = SettleTiming {
            min_wait: self.config.poll_interval(),
            timeout: self.config.slew_timeout(),
            poll: self.config.poll_interval(),
        };
        let mount = &self.config.devices.mount;
        self.devices.set_number(
            mount,
            prop::EQUATORIAL_EOD_COORD,
            &[(prop::RA, coords.ra_hours()), (prop::DEC, coords.dec_deg)],
        )?;
        info!(
            "Slewing to RA {:.4} h, Dec {:.4} deg",
            coords.ra_hours(),
            coords.dec_deg
        );
        settle::wait_while_busy(
            &mut self.devices,
            &mut self.clock,
            mount,
            prop::EQUATORIAL_EOD_COORD,
            timing,
        )?;
        info!("Slew complete");
        self.sink.emit(&AppEvent::Slewed(*coords));
        Ok(())
    }

    // ── Focus ─────────────────────────────────────────────────

    /// Open-loop focuser nudge: motion on, hold, motion off.  There is no
    /// focus metric; the operator judges the result.
    pub fn focus(&mut self, direction: FocusDirection, duration: Option<Duration>) -> Result<()> {
        let hold = duration.unwrap_or_else(|| self.config.focus_pulse());
        let focuser = &self.config.devices.focuser;
        let element = direction.element();

        self.devices.set_switch(focuser, prop::FOCUS_MOTION, element, true)?;
        self.clock.sleep(hold);
        self.devices.set_switch(focuser, prop::FOCUS_MOTION, element, false)?;

        let millis = u64::try_from(hold.as_millis()).unwrap_or(u64::MAX);
        info!("Focus nudge {element} for {millis} ms complete");
        self.sink.emit(&AppEvent::FocusNudged {
            direction: element,
            millis,
        });
        Ok(())
    }

    // ── Image viewer ──────────────────────────────────────────

    /// Open `{directory}/{image_name}.fits` in the viewer without waiting.
    pub fn show_image(&mut self, directory: &Path, image_name: &str) -> Result<()> {
        let path = if image_name.ends_with(".fits") {
            directory.join(image_name)
        } else {
            directory.join(format!("{image_name}.fits"))
        };
        if !path.is_file() {
            error!("Image {} does not exist", path.display());
            return Err(Error::Filesystem(format!("{} does not exist", path.display())));
        }
        self.viewer
            .open(&path)
            .map_err(|e| Error::Filesystem(format!("cannot open {}: {e}", path.display())))?;
        info!("Opened {}", path.display());
        Ok(())
    }
}
