//! Перенос окна с фокусом на соседний рабочий стол или монитор.
//!
//! Сначала привилегированный вызов оконного менеджера. Если он отклонён,
//! синтезируется жест: курсор к верхнему краю окна, нажатие, аккорд
//! переключения стола, пауза на анимацию, отпускание. Откат выполняется
//! в отдельной задаче и не повторяется при ошибке.

use crate::config::{Config, RelocatorConfig};
use crate::error::Result;
use crate::events::{MouseButton, Point, Rect, SpaceId, SwipeDirection, WindowId};
use crate::services::window_geometry::GeometryBackend;
use crate::services::VirtualDevice;
use crate::utils::coords::CoordinateNormalizer;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

/// Целевой слот: `(index + direction) mod count`, отрицательные заворачиваются вперёд
pub fn target_slot(index: usize, direction: i64, count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    (index as i64 + direction).rem_euclid(count as i64) as usize
}

/// Чем закончился перенос
#[derive(Debug)]
pub enum Relocation {
    /// Оконный менеджер принял перенос
    Direct { window: WindowId, space: SpaceId },
    /// Перенос отклонён, жест запущен в фоне
    Fallback(JoinHandle<()>),
    /// Окно перенесено на другой монитор
    Display { window: WindowId, frame: Rect },
    /// Нечего переносить
    Skipped(&'static str),
}

#[derive(Debug, Clone)]
struct GestureTimings {
    press_hold: Duration,
    settle: Duration,
    modifier: String,
    grab_offset: f64,
}

impl From<&RelocatorConfig> for GestureTimings {
    fn from(config: &RelocatorConfig) -> Self {
        Self {
            press_hold: Duration::from_millis(config.press_hold_ms),
            settle: Duration::from_millis(config.settle_ms),
            modifier: config.switch_modifier.clone(),
            grab_offset: config.grab_offset,
        }
    }
}

pub struct WindowRelocator {
    config: Arc<Config>,
    geometry: Arc<dyn GeometryBackend>,
    device: Arc<VirtualDevice>,
}

impl WindowRelocator {
    pub fn new(
        config: Arc<Config>,
        geometry: Arc<dyn GeometryBackend>,
        device: Arc<VirtualDevice>,
    ) -> Self {
        Self {
            config,
            geometry,
            device,
        }
    }

    /// Обработать намерение свайпа. Вверх/вниз игнорируются.
    pub fn relocate(&self, direction: SwipeDirection) -> Relocation {
        let Some(step) = direction.step() else {
            return Relocation::Skipped("вертикальный свайп");
        };

        let result = if self.config.swipe.target == "display" {
            self.move_to_adjacent_display(step)
        } else {
            self.move_to_adjacent_space(direction, step)
        };

        result.unwrap_or_else(|e| {
            error!("Не удалось перенести окно: {}", e);
            Relocation::Skipped("ошибка переноса")
        })
    }

    fn move_to_adjacent_space(&self, direction: SwipeDirection, step: i64) -> Result<Relocation> {
        let Some(window) = self.geometry.focused_window() else {
            return Ok(Relocation::Skipped("нет окна с фокусом"));
        };

        let spaces = self.geometry.spaces();
        let Some(index) = self
            .geometry
            .active_space()
            .and_then(|active| spaces.iter().position(|s| *s == active))
        else {
            return Ok(Relocation::Skipped("текущий рабочий стол неизвестен"));
        };

        let slot = target_slot(index, step, spaces.len());
        let target = spaces[slot];
        info!("Перенос {} со стола {} на {} ({})", window.id, spaces[index], target, direction);

        Ok(self.move_window(window.id, target, window.frame, direction))
    }

    /// Привилегированный перенос, при отказе - синтезированный жест
    pub fn move_window(
        &self,
        window: WindowId,
        space: SpaceId,
        frame: Rect,
        direction: SwipeDirection,
    ) -> Relocation {
        match self.geometry.move_to_space(window, space) {
            Ok(()) => Relocation::Direct { window, space },
            Err(e) => {
                warn!("Прямой перенос {} отклонён: {} - синтезируем жест", window, e);
                let geometry = Arc::clone(&self.geometry);
                let device = Arc::clone(&self.device);
                let timings = GestureTimings::from(&self.config.relocator);
                let handle = tokio::spawn(async move {
                    if let Err(e) = synthesize_drag_switch(geometry, device, frame, direction, timings).await {
                        error!("Синтезированный жест не удался: {}", e);
                    }
                });
                Relocation::Fallback(handle)
            }
        }
    }

    /// Перенос окна на соседний монитор с ужатием под его рабочую область
    fn move_to_adjacent_display(&self, step: i64) -> Result<Relocation> {
        let screens = self.geometry.screens();
        if screens.len() < 2 {
            return Ok(Relocation::Skipped("нужно минимум два монитора"));
        }
        let Some(normalizer) = CoordinateNormalizer::from_screens(&screens) else {
            return Ok(Relocation::Skipped("нет экранов"));
        };
        let Some(window) = self.geometry.focused_window() else {
            return Ok(Relocation::Skipped("нет окна с фокусом"));
        };

        let centre = window.frame.center();
        let Some(index) = screens
            .iter()
            .position(|s| normalizer.rect_to_top_left(s.frame).contains(centre))
        else {
            return Ok(Relocation::Skipped("окно вне мониторов"));
        };

        let target = &screens[target_slot(index, step, screens.len())];
        let visible = normalizer.rect_to_top_left(target.visible);
        let frame = centred_within(window.frame, visible);

        info!("Перенос {} на монитор {}: {}", window.id, target.id, frame);
        self.geometry.set_frame(window.id, frame)?;
        self.geometry.warp_pointer(frame.center())?;

        Ok(Relocation::Display {
            window: window.id,
            frame,
        })
    }
}

/// Размер не больше области, кадр по центру области
fn centred_within(frame: Rect, area: Rect) -> Rect {
    let width = frame.width.min(area.width);
    let height = frame.height.min(area.height);
    Rect::new(
        area.mid_x() - width / 2.0,
        area.mid_y() - height / 2.0,
        width,
        height,
    )
}

async fn synthesize_drag_switch(
    geometry: Arc<dyn GeometryBackend>,
    device: Arc<VirtualDevice>,
    frame: Rect,
    direction: SwipeDirection,
    timings: GestureTimings,
) -> Result<()> {
    let grab = Point::new(frame.mid_x(), frame.min_y() + timings.grab_offset);
    geometry.warp_pointer(grab)?;
    device.press_button(MouseButton::Left, true)?;

    sleep(timings.press_hold).await;
    let switched = device.chord(&timings.modifier, direction);
    sleep(timings.settle).await;

    // Кнопку отпускаем даже после неудачного аккорда
    device.press_button(MouseButton::Left, false)?;
    switched
}
