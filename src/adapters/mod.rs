//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements        | Connects to                  |
//! |---------------|-------------------|------------------------------|
//! | `indi`        | DevicePort        | INDI server over TCP         |
//! | `phd2`        | GuiderPort        | PHD2 HTTP bridge             |
//! | `sesame`      | EphemerisPort     | CDS Sesame name resolver     |
//! | `time`        | Clock             | System wall clock            |
//! | `log_sink`    | EventSink         | Log file                     |
//! | `config_file` | ConfigPort        | JSON config on disk          |
//! | `prompt`      | LowAltitudePolicy | Operator terminal            |
//! | `viewer`      | ImageViewer       | External FITS viewer         |
//! | `logging`     | (none)            | env_logger file target       |

pub mod config_file;
pub mod indi;
pub mod log_sink;
pub mod logging;
pub mod phd2;
pub mod prompt;
pub mod sesame;
pub mod time;
pub mod viewer;
