pub mod controller;
pub mod executor;
pub mod focus_engine;
pub mod indicator;
pub mod input_listener;
pub mod relocator;
pub mod space_watcher;
pub mod swipe;
pub mod tap;
pub mod touch_listener;
pub mod virtual_device;
pub mod window_geometry;

pub use controller::Controller;
pub use executor::{OwnerEvent, OwnerQueue};
pub use indicator::TracingSurface;
pub use input_listener::create_input_listener;
pub use space_watcher::SpaceWatcher;
pub use touch_listener::{TouchCapability, TouchListener};
pub use virtual_device::VirtualDevice;
pub use window_geometry::create_geometry_provider;
