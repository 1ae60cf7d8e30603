use crate::config::SwipeConfig;
use crate::debug_if_enabled;
use crate::events::{ScrollEvent, SwipeDirection, SwipeEvent};
use std::time::{Duration, Instant};

/// Распознаватель свайпов из двух потоков: прокрутка с модификатором-ускорителем
/// и дискретные системные свайпы. Общий дебаунс гасит инерцию трекпада.
pub struct SwipeRecognizer {
    accelerator: String,
    threshold: f64,
    debounce: Duration,
    last_trigger: Option<Instant>,
}

impl SwipeRecognizer {
    pub fn new(config: &SwipeConfig) -> Self {
        Self {
            accelerator: config.accelerator.clone(),
            threshold: config.threshold,
            debounce: config.debounce(),
            last_trigger: None,
        }
    }

    /// Прокрутка считается только при зажатом ускорителе.
    /// Вертикаль: плюс -> вправо, минус -> влево. Горизонталь смотрится,
    /// только если вертикаль не сработала.
    pub fn on_scroll(&mut self, event: &ScrollEvent, now: Instant) -> Option<SwipeDirection> {
        if !event.modifiers.contains(&self.accelerator) {
            return None;
        }

        let direction = if event.delta_y.abs() > self.threshold {
            if event.delta_y > 0.0 {
                SwipeDirection::Right
            } else {
                SwipeDirection::Left
            }
        } else if event.delta_x > self.threshold {
            SwipeDirection::Left
        } else if event.delta_x < -self.threshold {
            SwipeDirection::Right
        } else {
            return None;
        };

        self.accept(direction, now)
    }

    pub fn on_swipe(&mut self, event: &SwipeEvent, now: Instant) -> Option<SwipeDirection> {
        let direction = if event.delta_x > 0.0 {
            SwipeDirection::Left
        } else if event.delta_x < 0.0 {
            SwipeDirection::Right
        } else if event.delta_y > 0.0 {
            SwipeDirection::Up
        } else if event.delta_y < 0.0 {
            SwipeDirection::Down
        } else {
            return None;
        };

        self.accept(direction, now)
    }

    fn accept(&mut self, direction: SwipeDirection, now: Instant) -> Option<SwipeDirection> {
        if let Some(last) = self.last_trigger {
            if now.saturating_duration_since(last) <= self.debounce {
                debug_if_enabled!("Свайп {} подавлен дебаунсом", direction);
                return None;
            }
        }
        self.last_trigger = Some(now);
        Some(direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Modifiers;

    fn recognizer() -> SwipeRecognizer {
        SwipeRecognizer::new(&SwipeConfig::default())
    }

    fn accelerated() -> Modifiers {
        Modifiers::new().with_super(true)
    }

    #[test]
    fn test_debounce_sequence() {
        let mut r = recognizer();
        let t0 = Instant::now();

        let up = ScrollEvent::vertical(1.0, accelerated());
        let down = ScrollEvent::vertical(-1.0, accelerated());

        assert_eq!(r.on_scroll(&up, t0), Some(SwipeDirection::Right));
        assert_eq!(r.on_scroll(&down, t0 + Duration::from_millis(400)), None);
        assert_eq!(
            r.on_scroll(&down, t0 + Duration::from_millis(1100)),
            Some(SwipeDirection::Left)
        );
    }

    #[test]
    fn test_scroll_requires_accelerator_and_threshold() {
        let mut r = recognizer();
        let t0 = Instant::now();

        assert_eq!(r.on_scroll(&ScrollEvent::vertical(5.0, Modifiers::new()), t0), None);
        assert_eq!(
            r.on_scroll(&ScrollEvent::vertical(5.0, Modifiers::new().with_ctrl(true)), t0),
            None
        );
        assert_eq!(r.on_scroll(&ScrollEvent::vertical(0.5, accelerated()), t0), None);
        assert_eq!(r.on_scroll(&ScrollEvent::vertical(-0.4, accelerated()), t0), None);
        // Отклонённые события не трогают дебаунс
        assert_eq!(
            r.on_scroll(&ScrollEvent::vertical(0.6, accelerated()), t0),
            Some(SwipeDirection::Right)
        );
    }

    #[test]
    fn test_horizontal_only_when_vertical_idle() {
        let t0 = Instant::now();

        let mut r = recognizer();
        assert_eq!(
            r.on_scroll(&ScrollEvent::horizontal(2.0, accelerated()), t0),
            Some(SwipeDirection::Left)
        );

        let mut r = recognizer();
        assert_eq!(
            r.on_scroll(&ScrollEvent::horizontal(-2.0, accelerated()), t0),
            Some(SwipeDirection::Right)
        );

        let mut r = recognizer();
        let mixed = ScrollEvent {
            delta_x: 3.0,
            ..ScrollEvent::vertical(-1.0, accelerated())
        };
        assert_eq!(r.on_scroll(&mixed, t0), Some(SwipeDirection::Left));

        let mut r = recognizer();
        let mixed = ScrollEvent {
            delta_x: 3.0,
            ..ScrollEvent::vertical(1.0, accelerated())
        };
        assert_eq!(r.on_scroll(&mixed, t0), Some(SwipeDirection::Right));
    }

    #[test]
    fn test_swipe_stream_mapping_shares_debounce() {
        let t0 = Instant::now();
        let mut r = recognizer();

        let swipe = |dx, dy| SwipeEvent { delta_x: dx, delta_y: dy };

        assert_eq!(r.on_swipe(&swipe(1.0, 0.0), t0), Some(SwipeDirection::Left));
        // Поток прокрутки в окне дебаунса свайпа тоже подавлен
        assert_eq!(
            r.on_scroll(&ScrollEvent::vertical(1.0, accelerated()), t0 + Duration::from_millis(900)),
            None
        );
        let t1 = t0 + Duration::from_millis(2000);
        assert_eq!(r.on_swipe(&swipe(-1.0, 0.0), t1), Some(SwipeDirection::Right));
        let t2 = t1 + Duration::from_millis(1001);
        assert_eq!(r.on_swipe(&swipe(0.0, 1.0), t2), Some(SwipeDirection::Up));
        let t3 = t2 + Duration::from_millis(1001);
        assert_eq!(r.on_swipe(&swipe(0.0, -1.0), t3), Some(SwipeDirection::Down));
        assert_eq!(r.on_swipe(&swipe(0.0, 0.0), t3 + Duration::from_secs(5)), None);
    }
}
