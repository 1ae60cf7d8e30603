use std::fmt;

/// Один кадр сенсорной поверхности: сколько пальцев касается и когда
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactFrame {
    pub finger_count: usize,
    /// Секунды от произвольной точки отсчёта устройства; <= 0 означает "нет метки"
    pub timestamp: f64,
    pub frame_id: u64,
}

impl ContactFrame {
    pub fn new(finger_count: usize, timestamp: f64, frame_id: u64) -> Self {
        Self {
            finger_count,
            timestamp,
            frame_id,
        }
    }
}

impl fmt::Display for ContactFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} fingers={} t={:.3}",
            self.frame_id, self.finger_count, self.timestamp
        )
    }
}
