use crate::debug_if_enabled;
use crate::error::Result;
use crate::events::RawInput;
use crate::services::executor::OwnerQueue;
use crate::services::window_geometry::GeometryBackend;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::info;

/// Опрос текущего рабочего стола; при смене публикует `SpaceChanged`
pub struct SpaceWatcher {
    geometry: Arc<dyn GeometryBackend>,
    queue: OwnerQueue,
    period: Duration,
}

impl SpaceWatcher {
    pub fn new(geometry: Arc<dyn GeometryBackend>, queue: OwnerQueue, period: Duration) -> Self {
        Self {
            geometry,
            queue,
            period,
        }
    }

    pub async fn run(self) -> Result<()> {
        info!("SpaceWatcher запущен (период {:?})", self.period);

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut current = self.geometry.active_space();

        loop {
            ticker.tick().await;
            if self.queue.is_closed() {
                break;
            }

            let active = self.geometry.active_space();
            // Потеря ответа (None) сменой не считается
            if active.is_some() && active != current {
                debug_if_enabled!("Рабочий стол: {:?} -> {:?}", current, active);
                current = active;
                self.queue.input(RawInput::SpaceChanged);
            }
        }

        info!("Очередь владельца закрыта - SpaceWatcher остановлен");
        Ok(())
    }
}
