use crate::config::Config;
use crate::error::Result;
use crate::events::{CursorSample, Modifiers, MouseButton, Point, RawInput, ScrollEvent};
use crate::services::executor::OwnerQueue;
use crate::services::window_geometry::GeometryBackend;
use crate::utils::coords::CoordinateNormalizer;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, info};

use super::r#trait::InputListenerTrait;

/// Шаг сценария эмуляции
#[derive(Debug, Clone, Copy)]
enum DryStep {
    /// Курсор в bottom-left координатах
    Move(f64, f64),
    Click,
    AcceleratedScroll(f64),
}

/// Терминал в фокусе, затем браузер на втором мониторе, клик, свайп
const SCRIPT: &[DryStep] = &[
    DryStep::Move(500.0, 500.0),
    DryStep::Move(2500.0, 580.0),
    DryStep::Move(2510.0, 585.0),
    DryStep::Click,
    DryStep::Move(500.0, 500.0),
    DryStep::AcceleratedScroll(1.0),
];

pub struct DryRunInputListener {
    config: Arc<Config>,
    geometry: Arc<dyn GeometryBackend>,
    queue: OwnerQueue,
}

impl DryRunInputListener {
    pub fn new(config: Arc<Config>, geometry: Arc<dyn GeometryBackend>, queue: OwnerQueue) -> Self {
        info!("Инициализация DryRunInputListener");
        Self {
            config,
            geometry,
            queue,
        }
    }

    fn accelerator(&self) -> Modifiers {
        let name = self.config.swipe.accelerator.as_str();
        Modifiers::new()
            .with_ctrl(name == "ctrl")
            .with_alt(name == "alt")
            .with_shift(name == "shift")
            .with_super(name == "super")
    }

    fn input_for(&self, step: DryStep) -> RawInput {
        match step {
            DryStep::Move(x, y) => {
                let position = Point::new(x, y);
                // Держим эмулированную геометрию в согласии со сценарием
                if let Some(normalizer) = CoordinateNormalizer::from_screens(&self.geometry.screens()) {
                    let _ = self.geometry.warp_pointer(normalizer.point_to_top_left(position));
                }
                RawInput::PointerMoved(CursorSample::new(position))
            }
            DryStep::Click => RawInput::Click(MouseButton::Left),
            DryStep::AcceleratedScroll(delta) => {
                RawInput::Scroll(ScrollEvent::vertical(delta, self.accelerator()))
            }
        }
    }

    async fn run_impl(self) -> Result<()> {
        info!("Dry-run режим - InputListener работает в режиме эмуляции");

        let mut ticker = interval(Duration::from_secs(2));
        for step in SCRIPT.iter().cycle() {
            ticker.tick().await;
            let input = self.input_for(*step);
            debug!("Dry-run: эмулируем {:?}", step);
            if !self.queue.input(input) {
                break;
            }
        }

        info!("Очередь владельца закрыта - DryRunInputListener остановлен");
        Ok(())
    }
}

#[async_trait::async_trait]
impl InputListenerTrait for DryRunInputListener {
    async fn run(self: Box<Self>) -> Result<()> {
        (*self).run_impl().await
    }
}
