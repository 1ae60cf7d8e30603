use crate::config::IndicatorConfig;
use crate::debug_if_enabled;
use crate::events::Point;
use crate::services::executor::{OwnerQueue, ScheduledTask, TimerEvent};
use std::fmt;
use std::time::Duration;
use tracing::info;

/// Вид значка индикатора
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorIcon {
    /// Красный закрытый замок, 80 % непрозрачности
    Locked,
    /// Зелёный открытый замок, 80 % непрозрачности
    Unlocked,
}

impl fmt::Display for IndicatorIcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorIcon::Locked => write!(f, "lock.red@0.8"),
            IndicatorIcon::Unlocked => write!(f, "lock.open.green@0.8"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorState {
    Hidden,
    Locked,
    Unlocked,
}

/// Поверхность отрисовки индикатора. Координаты bottom-left.
pub trait IndicatorSurface: Send {
    fn set_visible(&mut self, visible: bool);
    fn set_opacity(&mut self, opacity: f64);
    fn animate_opacity(&mut self, target: f64, duration: Duration);
    fn set_origin(&mut self, origin: Point);
    fn set_icon(&mut self, icon: IndicatorIcon);
}

/// Поверхность, которая только пишет переходы в лог
#[derive(Debug, Default)]
pub struct TracingSurface;

impl IndicatorSurface for TracingSurface {
    fn set_visible(&mut self, visible: bool) {
        info!("Индикатор {}", if visible { "показан" } else { "скрыт" });
    }

    fn set_opacity(&mut self, opacity: f64) {
        debug_if_enabled!("Индикатор: непрозрачность {:.2}", opacity);
    }

    fn animate_opacity(&mut self, target: f64, duration: Duration) {
        debug_if_enabled!("Индикатор: анимация непрозрачности -> {:.2} за {:?}", target, duration);
    }

    fn set_origin(&mut self, origin: Point) {
        crate::trace_if_enabled!("Индикатор: позиция {}", origin);
    }

    fn set_icon(&mut self, icon: IndicatorIcon) {
        debug_if_enabled!("Индикатор: значок {}", icon);
    }
}

/// Индикатор "небезопасно" рядом с курсором.
///
/// Скрыт -> Заблокирован ⇄ Разблокирован (временно) -> Скрыт.
/// Одновременно идёт не больше одного затухания; `show()` его отменяет.
pub struct SafetyIndicator {
    surface: Box<dyn IndicatorSurface>,
    queue: OwnerQueue,
    size: f64,
    locked_offset: Point,
    unlocked_offset: Point,
    fade_duration: Duration,
    visible: bool,
    locked: bool,
    opacity: f64,
    last_cursor: Option<Point>,
    fade: Option<(u64, ScheduledTask)>,
}

impl SafetyIndicator {
    pub fn new(config: &IndicatorConfig, surface: Box<dyn IndicatorSurface>, queue: OwnerQueue) -> Self {
        let mut indicator = Self {
            surface,
            queue,
            size: config.size,
            locked_offset: Point::new(config.locked_offset[0], config.locked_offset[1]),
            unlocked_offset: Point::new(config.unlocked_offset[0], config.unlocked_offset[1]),
            fade_duration: Duration::from_millis(config.fade_ms),
            visible: false,
            locked: true,
            opacity: 1.0,
            last_cursor: None,
            fade: None,
        };
        indicator.surface.set_icon(IndicatorIcon::Locked);
        indicator
    }

    pub fn state(&self) -> IndicatorState {
        match (self.visible, self.locked) {
            (false, _) => IndicatorState::Hidden,
            (true, true) => IndicatorState::Locked,
            (true, false) => IndicatorState::Unlocked,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn show(&mut self) {
        self.cancel_fade();
        self.opacity = 1.0;
        self.surface.set_opacity(1.0);
        if !self.visible {
            self.visible = true;
            self.surface.set_visible(true);
        }
        self.apply_position();
    }

    pub fn hide(&mut self, animated: bool) {
        if !self.visible {
            return;
        }
        if !animated {
            self.cancel_fade();
            self.retract();
            return;
        }
        if self.fade.is_some() {
            return;
        }

        self.opacity = 0.0;
        self.surface.animate_opacity(0.0, self.fade_duration);
        let id = self.queue.next_id();
        let task = self
            .queue
            .schedule(self.fade_duration, TimerEvent::FadeFinished(id));
        self.fade = Some((id, task));
    }

    /// Завершение затухания; чужие поколения игнорируются
    pub fn on_fade_finished(&mut self, id: u64) {
        match &self.fade {
            Some((current, _)) if *current == id => {
                self.fade = None;
                self.retract();
            }
            _ => debug_if_enabled!("Устаревшее завершение затухания #{}", id),
        }
    }

    pub fn set_locked(&mut self, locked: bool) {
        if self.locked != locked {
            self.locked = locked;
            self.surface.set_icon(if locked {
                IndicatorIcon::Locked
            } else {
                IndicatorIcon::Unlocked
            });
        }
        self.apply_position();
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn update_position(&mut self, cursor: Point) {
        self.last_cursor = Some(cursor);
        self.apply_position();
    }

    /// Верхний край значка у кончика курсора
    pub fn origin_for(&self, cursor: Point) -> Point {
        let offset = if self.locked {
            self.locked_offset
        } else {
            self.unlocked_offset
        };
        Point::new(cursor.x + offset.x, cursor.y + offset.y - self.size)
    }

    fn apply_position(&mut self) {
        if let Some(cursor) = self.last_cursor {
            let origin = self.origin_for(cursor);
            self.surface.set_origin(origin);
        }
    }

    fn retract(&mut self) {
        self.visible = false;
        self.surface.set_visible(false);
        self.opacity = 1.0;
        self.surface.set_opacity(1.0);
    }

    fn cancel_fade(&mut self) {
        if let Some((id, task)) = self.fade.take() {
            debug_if_enabled!("Затухание #{} отменено", id);
            task.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Visible(bool),
        Opacity(f64),
        Animate(f64),
        Origin(Point),
        Icon(IndicatorIcon),
    }

    #[derive(Clone, Default)]
    struct RecordingSurface {
        calls: Arc<Mutex<Vec<Call>>>,
    }

    impl RecordingSurface {
        fn take(&self) -> Vec<Call> {
            std::mem::take(&mut *self.calls.lock())
        }
    }

    impl IndicatorSurface for RecordingSurface {
        fn set_visible(&mut self, visible: bool) {
            self.calls.lock().push(Call::Visible(visible));
        }
        fn set_opacity(&mut self, opacity: f64) {
            self.calls.lock().push(Call::Opacity(opacity));
        }
        fn animate_opacity(&mut self, target: f64, _duration: Duration) {
            self.calls.lock().push(Call::Animate(target));
        }
        fn set_origin(&mut self, origin: Point) {
            self.calls.lock().push(Call::Origin(origin));
        }
        fn set_icon(&mut self, icon: IndicatorIcon) {
            self.calls.lock().push(Call::Icon(icon));
        }
    }

    fn indicator() -> (SafetyIndicator, RecordingSurface, tokio::sync::mpsc::UnboundedReceiver<crate::services::executor::OwnerEvent>) {
        let surface = RecordingSurface::default();
        let (queue, rx) = OwnerQueue::channel();
        let indicator = SafetyIndicator::new(
            &IndicatorConfig::default(),
            Box::new(surface.clone()),
            queue,
        );
        surface.take();
        (indicator, surface, rx)
    }

    #[tokio::test]
    async fn test_show_twice_is_idempotent() {
        let (mut indicator, surface, _rx) = indicator();

        indicator.show();
        indicator.show();

        assert_eq!(indicator.state(), IndicatorState::Locked);
        assert_eq!(indicator.opacity(), 1.0);
        let shown = surface
            .take()
            .into_iter()
            .filter(|c| *c == Call::Visible(true))
            .count();
        assert_eq!(shown, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_show_cancels_fade() {
        let (mut indicator, _surface, mut rx) = indicator();

        indicator.show();
        indicator.hide(true);
        assert!(indicator.is_fading());
        assert_eq!(indicator.opacity(), 0.0);

        indicator.show();
        assert!(!indicator.is_fading());
        assert_eq!(indicator.opacity(), 1.0);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(indicator.state(), IndicatorState::Locked);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fade_completes_through_owner_queue() {
        use crate::services::executor::OwnerEvent;

        let (mut indicator, surface, mut rx) = indicator();
        indicator.show();
        indicator.hide(true);
        // Повторное скрытие не запускает второе затухание
        indicator.hide(true);

        let event = rx.recv().await;
        let Some(OwnerEvent::Timer(TimerEvent::FadeFinished(id))) = event else {
            panic!("ожидалось завершение затухания, получено {:?}", event);
        };
        indicator.on_fade_finished(id);

        assert_eq!(indicator.state(), IndicatorState::Hidden);
        assert_eq!(indicator.opacity(), 1.0);
        let calls = surface.take();
        assert_eq!(calls.iter().filter(|c| **c == Call::Animate(0.0)).count(), 1);
        assert_eq!(calls.last(), Some(&Call::Opacity(1.0)));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stale_fade_is_ignored() {
        let (mut indicator, _surface, _rx) = indicator();
        indicator.show();
        indicator.on_fade_finished(999);
        assert_eq!(indicator.state(), IndicatorState::Locked);
    }

    #[tokio::test]
    async fn test_position_depends_on_lock_state() {
        let (mut indicator, surface, _rx) = indicator();
        indicator.update_position(Point::new(100.0, 200.0));
        assert_eq!(surface.take(), vec![Call::Origin(Point::new(103.0, 174.0))]);

        indicator.set_locked(false);
        assert_eq!(
            surface.take(),
            vec![
                Call::Icon(IndicatorIcon::Unlocked),
                Call::Origin(Point::new(105.0, 174.0)),
            ]
        );
        indicator.show();
        assert_eq!(indicator.state(), IndicatorState::Unlocked);
    }
}
