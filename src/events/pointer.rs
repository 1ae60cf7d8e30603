use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use super::window::Point;

/// Положение курсора (bottom-left) в момент события перемещения
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorSample {
    pub position: Point,
    pub timestamp: Instant,
}

impl CursorSample {
    pub fn new(position: Point) -> Self {
        Self {
            position,
            timestamp: Instant::now(),
        }
    }

    pub fn at(position: Point, timestamp: Instant) -> Self {
        Self { position, timestamp }
    }
}

/// Кнопка мыши
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// Клик основной или вторичной кнопкой снимает индикатор
    pub fn is_primary_or_secondary(&self) -> bool {
        matches!(self, MouseButton::Left | MouseButton::Right)
    }
}

/// Модификаторы клавиш
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub super_key: bool,
}

impl Modifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ctrl(mut self, ctrl: bool) -> Self {
        self.ctrl = ctrl;
        self
    }

    pub fn with_alt(mut self, alt: bool) -> Self {
        self.alt = alt;
        self
    }

    pub fn with_shift(mut self, shift: bool) -> Self {
        self.shift = shift;
        self
    }

    pub fn with_super(mut self, super_key: bool) -> Self {
        self.super_key = super_key;
        self
    }

    pub fn is_empty(&self) -> bool {
        !self.ctrl && !self.alt && !self.shift && !self.super_key
    }

    /// Зажат ли модификатор с именем из конфигурации
    pub fn contains(&self, name: &str) -> bool {
        match name {
            "ctrl" => self.ctrl,
            "alt" => self.alt,
            "shift" => self.shift,
            "super" => self.super_key,
            _ => false,
        }
    }

    pub fn to_vec(&self) -> Vec<String> {
        let mut result = Vec::new();
        if self.ctrl { result.push("ctrl".to_string()); }
        if self.alt { result.push("alt".to_string()); }
        if self.shift { result.push("shift".to_string()); }
        if self.super_key { result.push("super".to_string()); }
        result
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let modifiers = self.to_vec();
        if modifiers.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", modifiers.join("+"))
        }
    }
}

/// Фаза прокрутки, как её сообщает источник (у колёсика мыши всегда None)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrollPhase {
    #[default]
    None,
    Began,
    Changed,
    Ended,
}

/// Непрерывная прокрутка с состоянием модификаторов
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollEvent {
    pub delta_x: f64,
    pub delta_y: f64,
    pub modifiers: Modifiers,
    pub phase: ScrollPhase,
}

impl ScrollEvent {
    pub fn vertical(delta_y: f64, modifiers: Modifiers) -> Self {
        Self {
            delta_x: 0.0,
            delta_y,
            modifiers,
            phase: ScrollPhase::None,
        }
    }

    pub fn horizontal(delta_x: f64, modifiers: Modifiers) -> Self {
        Self {
            delta_x,
            delta_y: 0.0,
            modifiers,
            phase: ScrollPhase::None,
        }
    }
}

/// Дискретный системный свайп
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwipeEvent {
    pub delta_x: f64,
    pub delta_y: f64,
}

/// Направление распознанного свайпа
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwipeDirection {
    Up,
    Down,
    Left,
    Right,
}

impl SwipeDirection {
    /// Шаг по слотам: только горизонтальные направления двигают окно
    pub fn step(&self) -> Option<i64> {
        match self {
            SwipeDirection::Left => Some(-1),
            SwipeDirection::Right => Some(1),
            SwipeDirection::Up | SwipeDirection::Down => None,
        }
    }
}

impl fmt::Display for SwipeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SwipeDirection::Up => "up",
            SwipeDirection::Down => "down",
            SwipeDirection::Left => "left",
            SwipeDirection::Right => "right",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers_contains_by_name() {
        let modifiers = Modifiers::new().with_super(true).with_shift(true);

        assert!(modifiers.contains("super"));
        assert!(modifiers.contains("shift"));
        assert!(!modifiers.contains("ctrl"));
        assert!(!modifiers.contains("hyper"));
        assert_eq!(modifiers.to_string(), "shift+super");
    }

    #[test]
    fn test_click_buttons() {
        assert!(MouseButton::Left.is_primary_or_secondary());
        assert!(MouseButton::Right.is_primary_or_secondary());
        assert!(!MouseButton::Middle.is_primary_or_secondary());
    }

    #[test]
    fn test_swipe_direction_step() {
        assert_eq!(SwipeDirection::Left.step(), Some(-1));
        assert_eq!(SwipeDirection::Right.step(), Some(1));
        assert_eq!(SwipeDirection::Up.step(), None);
        assert_eq!(SwipeDirection::Down.step(), None);
    }
}
