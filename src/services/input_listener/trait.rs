use crate::config::Config;
use crate::error::Result;
use crate::services::executor::OwnerQueue;
use crate::services::window_geometry::GeometryBackend;
use std::sync::Arc;

/// Trait for input listeners that can run in different modes
#[async_trait::async_trait]
pub trait InputListenerTrait {
    /// Run the listener until the owner queue closes
    async fn run(self: Box<Self>) -> Result<()>;
}

/// Factory function to create an appropriate input listener based on the dry_run flag
pub fn create_input_listener(
    config: Arc<Config>,
    geometry: Arc<dyn GeometryBackend>,
    queue: OwnerQueue,
    dry_run: bool,
) -> Result<Box<dyn InputListenerTrait + Send>> {
    if dry_run {
        Ok(Box::new(super::dry_input_listener::DryRunInputListener::new(
            config, geometry, queue,
        )))
    } else {
        Ok(Box::new(super::input_listener::RealInputListener::new(
            config, geometry, queue,
        )?))
    }
}
