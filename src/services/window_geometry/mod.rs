//! WindowGeometry service: responsibility and boundaries
//!
//! This module answers geometry questions (screens, focused window, surfaces,
//! hit-test owner, virtual desktops) and performs the few window actions the
//! relocator needs. It MUST NOT decide anything: verdicts belong to the focus
//! engine, intents to the recognizers.

mod dry_run;
mod wmctrl;
mod x11;
mod xdotool;
mod xrandr;
mod r#trait;

pub use self::dry_run::{
    DryRunGeometry, DryRunLayout, DRY_BACKGROUND_APP_PID, DRY_FILE_MANAGER_PID,
    DRY_FOCUSED_WINDOW, DRY_FOREGROUND_PID, DRY_LAUNCHER_PID,
};
pub use self::r#trait::{
    create_geometry_provider, GeometryBackend, GeometryProvider, Surfaces, WindowMover,
};
