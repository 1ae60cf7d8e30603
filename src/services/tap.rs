use crate::config::TapConfig;
use crate::debug_if_enabled;
use crate::events::ContactFrame;
use std::time::Duration;

/// Что владелец должен сделать после кадра касания
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapAction {
    FireSingle,
    /// Отменить отложенное одиночное и выполнить двойное
    FireDouble,
    ScheduleSingle(Duration),
}

/// Состояние одного непрерывного касания
#[derive(Debug, Clone, Copy, PartialEq)]
struct TouchSequence {
    started_at: f64,
    max_fingers: usize,
    first_target_at: Option<f64>,
    /// Пальцы двигались: это свайп, а не касание
    abandoned: bool,
}

/// Распознаватель касаний N пальцами (по умолчанию трёх).
///
/// Чистая машина состояний: планирование и отмену выполняет владелец.
pub struct TapRecognizer {
    finger_count: usize,
    max_tap: f64,
    double_window: Duration,
    has_double_handler: bool,
    sequence: Option<TouchSequence>,
    last_fingers: usize,
    last_tap_at: Option<f64>,
}

impl TapRecognizer {
    pub fn new(config: &TapConfig, has_double_handler: bool) -> Self {
        Self {
            finger_count: config.finger_count,
            max_tap: Duration::from_millis(config.max_tap_ms).as_secs_f64(),
            double_window: Duration::from_millis(config.double_tap_ms),
            has_double_handler,
            sequence: None,
            last_fingers: 0,
            last_tap_at: None,
        }
    }

    /// Текущее касание оказалось свайпом и касанием уже не считается
    pub fn abandon_sequence(&mut self) {
        if let Some(sequence) = self.sequence.as_mut() {
            sequence.abandoned = true;
        }
    }

    /// Обработать кадр. `wall_clock` (секунды) используется, если у кадра
    /// нет собственной метки времени.
    pub fn on_frame(&mut self, frame: &ContactFrame, wall_clock: f64) -> Option<TapAction> {
        let now = if frame.timestamp > 0.0 {
            frame.timestamp
        } else {
            wall_clock
        };
        let count = frame.finger_count;
        let previous = std::mem::replace(&mut self.last_fingers, count);

        if count > 0 {
            if previous == 0 || self.sequence.is_none() {
                self.sequence = Some(TouchSequence {
                    started_at: now,
                    max_fingers: count,
                    first_target_at: None,
                    abandoned: false,
                });
            }
            let target = self.finger_count;
            if let Some(sequence) = self.sequence.as_mut() {
                sequence.max_fingers = sequence.max_fingers.max(count);
                if count == target && sequence.first_target_at.is_none() {
                    sequence.first_target_at = Some(now);
                }
            }
            return None;
        }

        if previous == 0 {
            return None;
        }

        let sequence = self.sequence.take()?;
        if !self.qualifies(&sequence, now) {
            debug_if_enabled!(
                "Касание отброшено: max={} длительность {:.3}s",
                sequence.max_fingers,
                now - sequence.started_at
            );
            return None;
        }

        Some(self.disambiguate(now))
    }

    fn qualifies(&self, sequence: &TouchSequence, ended_at: f64) -> bool {
        if sequence.abandoned || sequence.max_fingers != self.finger_count {
            return false;
        }
        match sequence.first_target_at {
            Some(first) => ended_at - first <= self.max_tap,
            None => false,
        }
    }

    fn disambiguate(&mut self, now: f64) -> TapAction {
        if !self.has_double_handler {
            return TapAction::FireSingle;
        }

        match self.last_tap_at {
            Some(last) if now - last < self.double_window.as_secs_f64() => {
                // Третье касание не должно спариться со вторым
                self.last_tap_at = None;
                TapAction::FireDouble
            }
            _ => {
                self.last_tap_at = Some(now);
                TapAction::ScheduleSingle(self.double_window)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(recognizer: &mut TapRecognizer, frames: &[(f64, usize)]) -> Vec<TapAction> {
        frames
            .iter()
            .enumerate()
            .filter_map(|(i, (t, f))| {
                recognizer.on_frame(&ContactFrame::new(*f, *t, i as u64), *t)
            })
            .collect()
    }

    fn tap_at(start: f64) -> [(f64, usize); 3] {
        [(start, 1), (start + 0.05, 3), (start + 0.15, 0)]
    }

    #[test]
    fn test_three_finger_tap_qualifies() {
        let mut r = TapRecognizer::new(&TapConfig::default(), false);
        assert_eq!(
            feed(&mut r, &[(0.0, 1), (0.05, 3), (0.15, 0)]),
            vec![TapAction::FireSingle]
        );
    }

    #[test]
    fn test_four_fingers_never_qualify() {
        let mut r = TapRecognizer::new(&TapConfig::default(), false);
        assert!(feed(&mut r, &[(1.0, 3), (1.02, 4), (1.04, 3), (1.10, 0)]).is_empty());
        assert!(feed(&mut r, &[(2.0, 4), (2.01, 0)]).is_empty());
    }

    #[test]
    fn test_slow_or_short_sequences_are_discarded() {
        let mut r = TapRecognizer::new(&TapConfig::default(), false);
        // Три пальца держались дольше 0.35 s
        assert!(feed(&mut r, &[(1.0, 3), (1.2, 3), (1.36, 0)]).is_empty());
        // Только два пальца
        assert!(feed(&mut r, &[(2.0, 2), (2.1, 0)]).is_empty());
        // Начало с двух пальцев не мешает
        assert_eq!(
            feed(&mut r, &[(3.0, 2), (3.25, 3), (3.5, 1), (3.5, 0)]),
            vec![TapAction::FireSingle]
        );
    }

    #[test]
    fn test_double_tap_pairing() {
        let mut r = TapRecognizer::new(&TapConfig::default(), true);

        let mut actions = feed(&mut r, &tap_at(1.0));
        actions.extend(feed(&mut r, &tap_at(1.2)));
        assert_eq!(
            actions,
            vec![
                TapAction::ScheduleSingle(Duration::from_millis(300)),
                TapAction::FireDouble,
            ]
        );

        // Третье касание через 0.2 s начинает новое окно
        assert_eq!(
            feed(&mut r, &tap_at(1.4)),
            vec![TapAction::ScheduleSingle(Duration::from_millis(300))]
        );
    }

    #[test]
    fn test_taps_far_apart_are_two_singles() {
        let mut r = TapRecognizer::new(&TapConfig::default(), true);
        let mut actions = feed(&mut r, &tap_at(1.0));
        actions.extend(feed(&mut r, &tap_at(2.0)));
        assert_eq!(
            actions,
            vec![
                TapAction::ScheduleSingle(Duration::from_millis(300)),
                TapAction::ScheduleSingle(Duration::from_millis(300)),
            ]
        );
    }

    #[test]
    fn test_abandoned_sequence_is_not_a_tap() {
        let mut r = TapRecognizer::new(&TapConfig::default(), false);
        assert!(feed(&mut r, &[(1.0, 3)]).is_empty());
        r.abandon_sequence();
        assert!(feed(&mut r, &[(1.05, 3), (1.1, 0)]).is_empty());

        // Следующее касание снова распознаётся
        assert_eq!(feed(&mut r, &tap_at(2.0)), vec![TapAction::FireSingle]);
    }

    #[test]
    fn test_missing_timestamp_uses_wall_clock() {
        let mut r = TapRecognizer::new(&TapConfig::default(), false);
        assert_eq!(r.on_frame(&ContactFrame::new(3, 0.0, 1), 10.0), None);
        assert_eq!(r.on_frame(&ContactFrame::new(0, -1.0, 2), 10.1), Some(TapAction::FireSingle));

        assert_eq!(r.on_frame(&ContactFrame::new(3, 0.0, 3), 20.0), None);
        assert_eq!(r.on_frame(&ContactFrame::new(0, 0.0, 4), 21.0), None);
    }
}
