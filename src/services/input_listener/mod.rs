//! InputListener service: global pointer and keyboard monitoring.
//!
//! Devices are opened WITHOUT grabbing: the desktop keeps receiving every
//! event. The listener only translates evdev traffic into `RawInput` and posts
//! it to the owner queue; it never touches recognizer or indicator state.

mod dry_input_listener;
mod input_listener;
mod modifier_state;
mod r#trait;

pub use self::r#trait::{create_input_listener, InputListenerTrait};
