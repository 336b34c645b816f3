//! Integration tests for the sequence engine: Observatory → FSM → mock rig.

use std::cell::Cell;
use std::rc::Rc;

use observatory::app::events::AppEvent;
use observatory::app::plan::ExposurePlan;
use observatory::config::{GuideFailurePolicy, ObservatoryConfig};
use observatory::error::{DeviceError, Error, GuideError, GuideStage};
use observatory::fsm::StateId;
use observatory::sky::Site;

use super::mock_hw::{M42, MockEphemeris, MockGuider, MockRig, TestObservatory, build, observatory, observatory_with};

fn plan(base: &std::path::Path, count: u32) -> ExposurePlan {
    ExposurePlan::new("R", 30.0, count, base)
}

fn run(obs: &mut TestObservatory, target: &str, count: u32) -> (tempfile::TempDir, Result<observatory::fsm::context::SequenceReport, Error>) {
    let tmp = tempfile::tempdir().unwrap();
    let result = obs.run_sequence(target, &plan(tmp.path(), count));
    (tmp, result)
}

fn low(altitude: f64) -> MockEphemeris {
    MockEphemeris {
        altitude,
        ..MockEphemeris::default()
    }
}

// ── Happy path ────────────────────────────────────────────────

#[test]
fn m42_three_frames_guided_with_two_dithers() {
    let mut obs = observatory();
    let (tmp, result) = run(&mut obs, "M42", 3);
    let report = result.unwrap();

    assert_eq!(report.frames.len(), 3);
    assert_eq!(report.dithers, 2);
    assert!(report.guided);
    assert!(!report.guide_stop_failed);
    assert!(report.directory.starts_with(tmp.path()));
    assert!(report.directory.is_dir());
    let dir_name = report.directory.file_name().unwrap().to_string_lossy().into_owned();
    assert!(dir_name.starts_with("M42_20240807_"), "{dir_name}");
    assert!(dir_name.ends_with("UT"), "{dir_name}");

    let guider = obs.guider();
    assert_eq!(guider.calls, [GuideStage::EnableMultiStar, GuideStage::Start, GuideStage::Stop]);

    let rig = obs.devices();
    assert_eq!(rig.count("CCD_EXPOSURE"), 3);
    let saved = rig.saved_paths();
    assert_eq!(saved.len(), 3);
    for (i, path) in saved.iter().enumerate() {
        let name = std::path::Path::new(path).file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("R_2024080"), "{name}");
        assert!(name.ends_with(&format!("UT_{:04}.fits", i + 1)), "{name}");
        assert!(std::path::Path::new(path).starts_with(&report.directory));
    }

    assert_eq!(obs.sink().last_state(), Some(StateId::Complete));

    // Guider and camera on one timeline: guiding brackets every frame.
    let events = &obs.sink().events;
    let at = |wanted: fn(&AppEvent) -> bool| events.iter().position(wanted);
    let rat = |wanted: fn(&AppEvent) -> bool| events.iter().rposition(wanted);
    let started = at(|e| matches!(e, AppEvent::GuidingStarted)).unwrap();
    let first_frame = at(|e| matches!(e, AppEvent::FrameCaptured { .. })).unwrap();
    let last_frame = rat(|e| matches!(e, AppEvent::FrameCaptured { .. })).unwrap();
    let stopped = at(|e| matches!(e, AppEvent::GuidingStopped)).unwrap();
    let complete = at(|e| matches!(e, AppEvent::SequenceComplete { .. })).unwrap();
    assert!(started < first_frame);
    assert!(last_frame < stopped);
    assert!(stopped < complete);
    assert_eq!(complete, events.len() - 1);
    assert!(matches!(
        &events[complete],
        AppEvent::SequenceComplete { directory, frames: 3 } if *directory == report.directory
    ));
}

#[test]
fn slew_sends_ra_in_hours_before_guiding() {
    let mut obs = observatory();
    let (_tmp, result) = run(&mut obs, "M42", 1);
    result.unwrap();

    let slews = obs.devices().number_values("EQUATORIAL_EOD_COORD");
    assert_eq!(slews.len(), 1);
    let ra = slews[0].iter().find(|(k, _)| k == "RA").unwrap().1;
    let dec = slews[0].iter().find(|(k, _)| k == "DEC").unwrap().1;
    assert!((ra - M42.ra_deg / 15.0).abs() < 1e-9);
    assert!((dec - M42.dec_deg).abs() < 1e-9);

    let states = obs.sink().states();
    let slew_at = states.iter().position(|s| *s == StateId::Slewing).unwrap();
    let guide_at = states.iter().position(|s| *s == StateId::GuideStarting).unwrap();
    assert!(slew_at < guide_at);
}

#[test]
fn filter_and_exposure_values_follow_plan() {
    let mut obs = observatory();
    let (_tmp, result) = run(&mut obs, "M42", 2);
    result.unwrap();

    let rig = obs.devices();
    for values in rig.number_values("FILTER_SLOT") {
        assert_eq!(values, [("FILTER_SLOT_VALUE".to_owned(), 2.0)]);
    }
    for values in rig.number_values("CCD_EXPOSURE") {
        assert_eq!(values, [("CCD_EXPOSURE_VALUE".to_owned(), 30.0)]);
    }
}

#[test]
fn dithers_alternate_direction() {
    let mut obs = observatory();
    let (_tmp, result) = run(&mut obs, "M42", 4);
    assert_eq!(result.unwrap().dithers, 3);

    let rig = obs.devices();
    assert_eq!(rig.switched_on("TELESCOPE_MOTION_NS"), ["MOTION_NORTH", "MOTION_SOUTH", "MOTION_NORTH"]);
    assert_eq!(rig.switched_on("TELESCOPE_MOTION_WE"), ["MOTION_WEST", "MOTION_EAST", "MOTION_WEST"]);
}

#[test]
fn single_frame_has_no_dither() {
    let mut obs = observatory();
    let (_tmp, result) = run(&mut obs, "M42", 1);
    assert_eq!(result.unwrap().dithers, 0);
    assert_eq!(obs.devices().count("TELESCOPE_MOTION_NS"), 0);
}

#[test]
fn slew_can_be_skipped_by_config() {
    let mut config = ObservatoryConfig::default();
    config.slew_before_sequence = false;
    let mut obs = observatory_with(config, MockRig::new(), MockGuider::default());
    let (_tmp, result) = run(&mut obs, "M42", 1);
    result.unwrap();
    assert_eq!(obs.devices().count("EQUATORIAL_EOD_COORD"), 0);
    assert!(!obs.sink().states().contains(&StateId::Slewing));
}

#[test]
fn mount_site_preferred_over_config() {
    let southern = Site {
        latitude_deg: -31.27,
        longitude_deg: 149.06,
        elevation_m: 1165.0,
    };
    let rig = MockRig {
        site: Some(southern),
        ..MockRig::new()
    };
    let mut obs = observatory_with(ObservatoryConfig::default(), rig, MockGuider::default());
    let (_tmp, result) = run(&mut obs, "M42", 1);
    result.unwrap();
    assert_eq!(obs.ephemeris().last_site.get(), Some(southern));

    let mut obs = observatory();
    let (_tmp, result) = run(&mut obs, "M42", 1);
    result.unwrap();
    assert_eq!(obs.ephemeris().last_site.get(), Some(ObservatoryConfig::default().site));
}

// ── Target resolution ─────────────────────────────────────────

#[test]
fn unknown_target_touches_nothing() {
    let mut obs = observatory();
    let (tmp, result) = run(&mut obs, "Ghost", 3);

    assert_eq!(result.unwrap_err(), Error::TargetNotFound("Ghost".into()));
    assert!(obs.devices().calls.is_empty());
    assert!(obs.guider().calls.is_empty());
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    assert!(obs.sink().contains(|e| matches!(e, AppEvent::TargetNotFound(n) if n == "Ghost")));
    assert_eq!(obs.sink().last_state(), Some(StateId::Aborted));
}

#[test]
fn resolver_outage_aborts() {
    let ephemeris = MockEphemeris {
        transport_error: true,
        ..MockEphemeris::default()
    };
    let mut obs = build(ObservatoryConfig::default(), MockRig::new(), ephemeris, MockGuider::default());
    let (_tmp, result) = run(&mut obs, "M42", 1);
    assert!(matches!(result, Err(Error::Resolver(_))));
    assert!(obs.devices().calls.is_empty());
}

#[test]
fn invalid_plan_rejected_before_resolving() {
    let mut obs = observatory();
    let tmp = tempfile::tempdir().unwrap();
    let bad_filter = ExposurePlan::new("X", 30.0, 3, tmp.path());
    assert_eq!(obs.run_sequence("M42", &bad_filter).unwrap_err(), Error::UnknownFilter("X".into()));

    let zero = ExposurePlan::new("R", 30.0, 0, tmp.path());
    assert!(matches!(obs.run_sequence("M42", &zero), Err(Error::InvalidPlan(_))));

    assert!(obs.ephemeris().resolve_calls.is_empty());
    assert!(obs.devices().calls.is_empty());
}

// ── Altitude gate ─────────────────────────────────────────────

#[test]
fn low_target_declined_by_default() {
    let mut obs = build(ObservatoryConfig::default(), MockRig::new(), low(10.0), MockGuider::default());
    let (tmp, result) = run(&mut obs, "M42", 3);

    assert_eq!(result.unwrap_err(), Error::LowAltitude { altitude_deg: 10.0 });
    assert!(obs.devices().calls.is_empty());
    assert!(obs.guider().calls.is_empty());
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    assert_eq!(obs.sink().last_state(), Some(StateId::Aborted));
}

#[test]
fn low_target_confirmed_by_policy() {
    let asked = Rc::new(Cell::new(0));
    let counter = Rc::clone(&asked);
    let mut obs = build(ObservatoryConfig::default(), MockRig::new(), low(15.0), MockGuider::default())
        .with_low_altitude_policy(move |_alt: f64| {
            counter.set(counter.get() + 1);
            true
        });
    let (_tmp, result) = run(&mut obs, "M42", 2);
    assert_eq!(result.unwrap().frames.len(), 2);
    assert_eq!(asked.get(), 1);
}

#[test]
fn policy_not_consulted_at_threshold() {
    let asked = Rc::new(Cell::new(false));
    let flag = Rc::clone(&asked);
    let mut obs = build(ObservatoryConfig::default(), MockRig::new(), low(20.0), MockGuider::default())
        .with_low_altitude_policy(move |_alt: f64| {
            flag.set(true);
            false
        });
    let (_tmp, result) = run(&mut obs, "M42", 1);
    result.unwrap();
    assert!(!asked.get());
}

// ── Guiding ───────────────────────────────────────────────────

#[test]
fn guide_start_failure_aborts_without_exposures() {
    let guider = MockGuider {
        fail_start: u32::MAX,
        ..MockGuider::default()
    };
    let mut obs = observatory_with(ObservatoryConfig::default(), MockRig::new(), guider);
    let (_tmp, result) = run(&mut obs, "M42", 3);

    assert!(matches!(
        result,
        Err(Error::Guiding(GuideError::Rejected {
            stage: GuideStage::Start,
            ..
        }))
    ));
    assert_eq!(obs.devices().count("CCD_EXPOSURE"), 0);
    assert_eq!(obs.guider().count(GuideStage::Start), 2, "retried once");
    assert_eq!(obs.guider().count(GuideStage::Stop), 0);
    assert!(obs.sink().contains(|e| matches!(e, AppEvent::GuidingFailed { proceeding: false, .. })));
    assert_eq!(obs.sink().last_state(), Some(StateId::GuideFailed));
}

#[test]
fn guide_start_failure_can_proceed_unguided() {
    let mut config = ObservatoryConfig::default();
    config.guide_failure_policy = GuideFailurePolicy::ProceedUnguided;
    let guider = MockGuider {
        fail_enable: u32::MAX,
        ..MockGuider::default()
    };
    let mut obs = observatory_with(config, MockRig::new(), guider);
    let (_tmp, result) = run(&mut obs, "M42", 3);

    let report = result.unwrap();
    assert!(!report.guided);
    assert_eq!(report.frames.len(), 3);
    assert_eq!(obs.guider().count(GuideStage::Start), 0);
    assert_eq!(obs.guider().count(GuideStage::Stop), 0, "nothing to stop");
    assert!(obs.sink().contains(|e| matches!(e, AppEvent::GuidingFailed { proceeding: true, .. })));
}

#[test]
fn transient_guide_failure_is_retried() {
    let guider = MockGuider {
        fail_start: 1,
        ..MockGuider::default()
    };
    let mut obs = observatory_with(ObservatoryConfig::default(), MockRig::new(), guider);
    let (_tmp, result) = run(&mut obs, "M42", 1);
    assert!(result.unwrap().guided);
    assert_eq!(obs.guider().count(GuideStage::Start), 2);
}

#[test]
fn guide_stop_failure_is_flagged_not_fatal() {
    let guider = MockGuider {
        fail_stop: u32::MAX,
        ..MockGuider::default()
    };
    let mut obs = observatory_with(ObservatoryConfig::default(), MockRig::new(), guider);
    let (_tmp, result) = run(&mut obs, "M42", 2);

    let report = result.unwrap();
    assert!(report.guide_stop_failed);
    assert_eq!(report.frames.len(), 2);
    assert_eq!(obs.sink().last_state(), Some(StateId::Complete));
}

// ── Device failures ───────────────────────────────────────────

#[test]
fn stuck_slew_times_out() {
    let mut rig = MockRig::new();
    rig.stuck_busy.insert("EQUATORIAL_EOD_COORD".into());
    let mut obs = observatory_with(ObservatoryConfig::default(), rig, MockGuider::default());
    let (_tmp, result) = run(&mut obs, "M42", 3);

    let mount = ObservatoryConfig::default().devices.mount;
    assert_eq!(
        result.unwrap_err(),
        Error::Timeout {
            device: mount,
            property: "EQUATORIAL_EOD_COORD"
        }
    );
    assert!(obs.guider().calls.is_empty());
    assert_eq!(obs.devices().count("CCD_EXPOSURE"), 0);
    assert_eq!(obs.sink().last_state(), Some(StateId::Failed));
    assert!(obs.clock().slept >= ObservatoryConfig::default().slew_timeout());
}

#[test]
fn slow_slew_waits_for_mount() {
    let mut rig = MockRig::new();
    rig.busy_polls.insert("EQUATORIAL_EOD_COORD".into(), 10);
    let mut obs = observatory_with(ObservatoryConfig::default(), rig, MockGuider::default());
    let (_tmp, result) = run(&mut obs, "M42", 1);
    result.unwrap();
    assert!(obs.devices().polls >= 11);
}

#[test]
fn camera_alert_mid_sequence_stops_guiding_and_fails() {
    let mut rig = MockRig::new();
    rig.alert.insert("CCD_EXPOSURE".into());
    let mut obs = observatory_with(ObservatoryConfig::default(), rig, MockGuider::default());
    let (_tmp, result) = run(&mut obs, "M42", 3);

    assert!(matches!(result, Err(Error::Device(DeviceError::Alert { .. }))));
    assert_eq!(obs.guider().count(GuideStage::Stop), 1);
    let states = obs.sink().states();
    assert_eq!(&states[states.len() - 2..], [StateId::GuideStopping, StateId::Failed]);
}

#[test]
fn save_failure_is_retried() {
    let rig = MockRig {
        save_failures: 1,
        ..MockRig::new()
    };
    let mut obs = observatory_with(ObservatoryConfig::default(), rig, MockGuider::default());
    let (_tmp, result) = run(&mut obs, "M42", 3);
    assert_eq!(result.unwrap().frames.len(), 3);
    assert_eq!(obs.devices().saved_paths().len(), 3);
}

// ── Cancellation ──────────────────────────────────────────────

#[test]
fn cancel_between_exposures_stops_guiding_and_aborts() {
    let token = observatory::app::cancel::CancelToken::new();
    let rig = MockRig {
        cancel_after_saves: Some((1, token.clone())),
        ..MockRig::new()
    };
    let mut obs =
        observatory_with(ObservatoryConfig::default(), rig, MockGuider::default()).with_cancel_token(token);
    let (_tmp, result) = run(&mut obs, "M42", 5);

    assert_eq!(result.unwrap_err(), Error::Cancelled);
    assert_eq!(obs.devices().saved_paths().len(), 1);
    assert_eq!(obs.devices().count("TELESCOPE_MOTION_NS"), 0, "no dither after cancel");
    assert_eq!(obs.guider().count(GuideStage::Stop), 1);
    assert_eq!(obs.sink().last_state(), Some(StateId::Aborted));
}
