//! Integration tests for command dispatch: name + params → Observatory → mock rig.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use observatory::app::commands::{Params, parse_params};
use observatory::app::events::AppEvent;
use observatory::config::ObservatoryConfig;
use observatory::error::{CommandError, Error};

use super::mock_hw::{DeviceCall, MockEphemeris, MockGuider, MockRig, build, observatory};

fn params(tokens: &[&str]) -> Params {
    parse_params(tokens.iter().copied()).unwrap()
}

// ── Switches ──────────────────────────────────────────────────

#[test]
fn switch_commands_turn_the_named_element_on() {
    let devices = ObservatoryConfig::default().devices;
    let cases = [
        ("set_light", "LIGHT_ON", devices.light.clone(), "LIGHT_STATE"),
        ("telescope_cover", "COVER_OPEN", devices.cover.clone(), "COVER_STATE"),
        ("roof", "ROOF_OPEN", devices.roof.clone(), "ROOF_STATE"),
    ];
    for (name, state, device, property) in cases {
        let mut obs = observatory();
        obs.dispatch(name, &params(&[format!("state={state}").as_str()])).unwrap();
        assert_eq!(
            obs.devices().calls,
            [DeviceCall::Switch {
                device: device.clone(),
                property: property.into(),
                element: state.into(),
                on: true,
            }]
        );
        assert!(obs.sink().contains(|e| matches!(
            e,
            AppEvent::DeviceSet { property: p, value, .. } if *p == property && value == state
        )));
    }
}

// ── Rejected input ────────────────────────────────────────────

#[test]
fn unknown_command_is_reported_and_harmless() {
    let mut obs = observatory();
    let err = obs.dispatch("park", &Params::new()).unwrap_err();
    assert_eq!(err, Error::Command(CommandError::Unknown("park".into())));
    assert!(obs.devices().calls.is_empty());
    assert!(obs.sink().events.is_empty());
}

#[test]
fn missing_parameter_touches_nothing() {
    let mut obs = observatory();
    let err = obs.dispatch("sequence", &params(&["target=M42"])).unwrap_err();
    assert!(matches!(err, Error::Command(CommandError::MissingParameter { command: "sequence", .. })));
    assert!(obs.devices().calls.is_empty());
}

// ── Target ────────────────────────────────────────────────────

#[test]
fn target_slews_after_gate() {
    let mut obs = observatory();
    obs.dispatch("target", &params(&["target_name=M42"])).unwrap();
    assert_eq!(obs.devices().count("EQUATORIAL_EOD_COORD"), 1);
    assert!(obs.sink().contains(|e| matches!(e, AppEvent::Slewed(_))));
    assert!(obs.guider().calls.is_empty());
}

#[test]
fn target_below_limit_is_not_slewed() {
    let ephemeris = MockEphemeris {
        altitude: 5.0,
        ..MockEphemeris::default()
    };
    let mut obs = build(ObservatoryConfig::default(), MockRig::new(), ephemeris, MockGuider::default());
    let err = obs.dispatch("target", &params(&["target_name=M42"])).unwrap_err();
    assert_eq!(err, Error::LowAltitude { altitude_deg: 5.0 });
    assert!(obs.devices().calls.is_empty());
}

#[test]
fn target_not_found_is_distinct_from_timeout() {
    let mut obs = observatory();
    let err = obs.dispatch("target", &params(&["target_name=Ghost"])).unwrap_err();
    assert_eq!(err, Error::TargetNotFound("Ghost".into()));
    assert!(obs.devices().calls.is_empty());

    let mut rig = MockRig::new();
    rig.stuck_busy.insert("EQUATORIAL_EOD_COORD".into());
    let mut obs = build(ObservatoryConfig::default(), rig, MockEphemeris::default(), MockGuider::default());
    let err = obs.slew_to("M42").unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }));
}

// ── Focus ─────────────────────────────────────────────────────

#[test]
fn focus_defaults_to_inward_pulse() {
    let mut obs = observatory();
    obs.dispatch("focus", &Params::new()).unwrap();

    let focuser = ObservatoryConfig::default().devices.focuser;
    let calls = &obs.devices().calls;
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[0],
        DeviceCall::Switch {
            device: focuser.clone(),
            property: "FOCUS_MOTION".into(),
            element: "FOCUS_INWARD".into(),
            on: true
        }
    );
    assert!(matches!(&calls[1], DeviceCall::Switch { on: false, .. }));
    assert_eq!(obs.clock().slept, Duration::from_secs(2));
}

#[test]
fn focus_direction_and_duration() {
    let mut obs = observatory();
    obs.dispatch("focus", &params(&["direction=out", "duration=0.5"])).unwrap();
    assert_eq!(obs.devices().switched_on("FOCUS_MOTION"), ["FOCUS_OUTWARD"]);
    assert_eq!(obs.clock().slept, Duration::from_millis(500));
    assert!(obs.sink().contains(|e| matches!(e, AppEvent::FocusNudged { millis: 500, .. })));
}

// ── Show image ────────────────────────────────────────────────

#[test]
fn showimage_opens_existing_frame() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("R_20240807_2230UT_0001.fits"), b"SIMPLE  =").unwrap();

    let opened: Rc<RefCell<Vec<PathBuf>>> = Rc::default();
    let log = Rc::clone(&opened);
    let mut obs = observatory().with_viewer(move |path: &std::path::Path| -> std::io::Result<()> {
        log.borrow_mut().push(path.to_path_buf());
        Ok(())
    });

    let dir = tmp.path().display().to_string();
    obs.dispatch(
        "showimage",
        &params(&[format!("directory={dir}").as_str(), "image_name=R_20240807_2230UT_0001"]),
    )
    .unwrap();
    assert_eq!(*opened.borrow(), [tmp.path().join("R_20240807_2230UT_0001.fits")]);
}

#[test]
fn showimage_missing_file_is_filesystem_error() {
    let tmp = tempfile::tempdir().unwrap();
    let mut obs = observatory().with_viewer(|_: &std::path::Path| -> std::io::Result<()> { Ok(()) });
    let err = obs.show_image(tmp.path(), "nothing").unwrap_err();
    assert!(matches!(err, Error::Filesystem(_)));
}

#[test]
fn showimage_without_viewer_fails_cleanly() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("a.fits"), b"").unwrap();
    let mut obs = observatory();
    assert!(matches!(obs.show_image(tmp.path(), "a.fits"), Err(Error::Filesystem(_))));
}

// ── Sequence through dispatch ─────────────────────────────────

#[test]
fn sequence_via_dispatch() {
    let tmp = tempfile::tempdir().unwrap();
    let mut obs = observatory();
    obs.dispatch(
        "sequence",
        &params(&[
            "target=M42",
            format!("base_directory={}", tmp.path().display()).as_str(),
            "filter_name=H",
            "exposure_count=2",
            "exposure_time=300",
        ]),
    )
    .unwrap();
    assert_eq!(obs.devices().count("CCD_EXPOSURE"), 2);
    for values in obs.devices().number_values("FILTER_SLOT") {
        assert_eq!(values[0].1, 5.0);
    }
}

#[test]
fn sequence_with_unrepresentable_exposure_is_rejected_up_front() {
    let tmp = tempfile::tempdir().unwrap();
    let mut obs = observatory();
    let err = obs
        .dispatch(
            "sequence",
            &params(&[
                "target=M42",
                format!("base_directory={}", tmp.path().display()).as_str(),
                "filter_name=R",
                "exposure_count=1",
                "exposure_time=1e20",
            ]),
        )
        .unwrap_err();
    assert!(matches!(err, Error::InvalidPlan(_)), "{err:?}");
    assert!(obs.devices().calls.is_empty());
    assert!(obs.guider().calls.is_empty());
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}
