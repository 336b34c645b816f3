//! Standard INDI property and element names used by the sequencer.

// ── Observatory switches ──────────────────────────────────────
pub const LIGHT_STATE: &str = "LIGHT_STATE";
pub const COVER_STATE: &str = "COVER_STATE";
pub const ROOF_STATE: &str = "ROOF_STATE";

// ── Mount ─────────────────────────────────────────────────────
pub const EQUATORIAL_EOD_COORD: &str = "EQUATORIAL_EOD_COORD";
pub const RA: &str = "RA";
pub const DEC: &str = "DEC";
pub const GEOGRAPHIC_COORD: &str = "GEOGRAPHIC_COORD";
pub const LAT: &str = "LAT";
pub const LONG: &str = "LONG";
pub const ELEV: &str = "ELEV";
pub const TELESCOPE_MOTION_NS: &str = "TELESCOPE_MOTION_NS";
pub const MOTION_NORTH: &str = "MOTION_NORTH";
pub const MOTION_SOUTH: &str = "MOTION_SOUTH";
pub const TELESCOPE_MOTION_WE: &str = "TELESCOPE_MOTION_WE";
pub const MOTION_WEST: &str = "MOTION_WEST";
pub const MOTION_EAST: &str = "MOTION_EAST";

// ── Filter wheel ──────────────────────────────────────────────
pub const FILTER_SLOT: &str = "FILTER_SLOT";
pub const FILTER_SLOT_VALUE: &str = "FILTER_SLOT_VALUE";

// ── Camera ────────────────────────────────────────────────────
pub const CCD_EXPOSURE: &str = "CCD_EXPOSURE";
pub const CCD_EXPOSURE_VALUE: &str = "CCD_EXPOSURE_VALUE";
pub const CCD_SAVE: &str = "CCD_SAVE";
pub const CCD_SAVE_PATH: &str = "CCD_SAVE_PATH";

// ── Focuser ───────────────────────────────────────────────────
pub const FOCUS_MOTION: &str = "FOCUS_MOTION";
