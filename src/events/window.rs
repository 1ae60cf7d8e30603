use serde::{Deserialize, Serialize};
use std::fmt;

/// Идентификатор процесса-владельца окна
pub type Pid = u32;

/// Идентификатор окна в оконном менеджере
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Идентификатор виртуального рабочего стола
pub type SpaceId = i64;

/// Точка в глобальных координатах
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// Прямоугольник: origin + размер. Соглашение об осях задаёт источник данных.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn min_x(&self) -> f64 {
        self.x
    }

    pub fn min_y(&self) -> f64 {
        self.y
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn mid_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn mid_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn center(&self) -> Point {
        Point::new(self.mid_x(), self.mid_y())
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Min-края включительно, max-края исключительно.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x() && p.x < self.max_x() && p.y >= self.min_y() && p.y < self.max_y()
    }

    /// Расширить на `by` единиц с каждой стороны
    pub fn outset(&self, by: f64) -> Rect {
        Rect::new(
            self.x - by,
            self.y - by,
            self.width + by * 2.0,
            self.height + by * 2.0,
        )
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.min_x().max(other.min_x());
        let y0 = self.min_y().max(other.min_y());
        let x1 = self.max_x().min(other.max_x());
        let y1 = self.max_y().min(other.max_y());
        if x1 > x0 && y1 > y0 {
            Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
        } else {
            None
        }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.intersection(other).is_some()
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.0},{:.0} {:.0}x{:.0}]",
            self.x, self.y, self.width, self.height
        )
    }
}

/// Снимок экрана. Оба прямоугольника в соглашении bottom-left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenDescriptor {
    pub id: String,
    pub frame: Rect,
    pub visible: Rect,
}

/// Видимая поверхность (окно, поповер, панель). Прямоугольник в соглашении top-left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceDescriptor {
    pub owner: Pid,
    pub bounds: Rect,
    pub layer: i32,
}

/// Окно с фокусом клавиатуры. Прямоугольник в соглашении top-left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusedWindow {
    pub id: WindowId,
    pub pid: Option<Pid>,
    pub frame: Rect,
}

impl fmt::Display for FocusedWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pid {
            Some(pid) => write!(f, "{} pid={} {}", self.id, pid, self.frame),
            None => write!(f, "{} {}", self.id, self.frame),
        }
    }
}

/// Почему принято решение показать или скрыть индикатор
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerdictReason {
    MenuBar,
    AllowListedOwner,
    ForegroundOwner,
    FocusedWindow,
    ForegroundSurface,
    LauncherSurface,
    NoPermission,
    Inconclusive,
    Unsafe,
}

/// Решение движка безопасности фокуса
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FocusVerdict {
    pub show: bool,
    pub reason: VerdictReason,
}

impl FocusVerdict {
    pub fn safe(reason: VerdictReason) -> Self {
        Self { show: false, reason }
    }

    pub fn unsafe_here() -> Self {
        Self {
            show: true,
            reason: VerdictReason::Unsafe,
        }
    }
}

impl fmt::Display for FocusVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.show { "показать" } else { "скрыть" };
        write!(f, "{} ({:?})", state, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_contains_is_half_open() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains(Point::new(0.0, 0.0)));
        assert!(r.contains(Point::new(9.9, 9.9)));
        assert!(!r.contains(Point::new(10.0, 5.0)));
        assert!(!r.contains(Point::new(5.0, 10.0)));
    }

    #[test]
    fn test_zero_size_rect_flows_through_containment() {
        let r = Rect::new(100.0, 100.0, 0.0, 0.0);
        assert!(r.is_empty());
        assert!(!r.contains(Point::new(100.0, 100.0)));

        let grown = r.outset(5.0);
        assert_eq!(grown, Rect::new(95.0, 95.0, 10.0, 10.0));
        assert!(grown.contains(Point::new(100.0, 100.0)));
    }

    #[test]
    fn test_rect_intersection() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(50.0, 60.0, 100.0, 100.0);
        assert_eq!(a.intersection(&b), Some(Rect::new(50.0, 60.0, 50.0, 40.0)));

        let c = Rect::new(100.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_verdict_constructors() {
        let v = FocusVerdict::safe(VerdictReason::MenuBar);
        assert!(!v.show);
        assert_eq!(v.reason, VerdictReason::MenuBar);

        let u = FocusVerdict::unsafe_here();
        assert!(u.show);
        assert_eq!(u.reason, VerdictReason::Unsafe);
    }
}
