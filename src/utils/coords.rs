//! Перевод между глобальными соглашениями top-left-down и bottom-left-up.
//!
//! Константа переворота: высота основного экрана. Преобразование является инволюцией:
//! применённое дважды, оно возвращает исходный прямоугольник.

use crate::events::{Point, Rect, ScreenDescriptor};

pub fn flip_point(point: Point, primary_height: f64) -> Point {
    Point::new(point.x, primary_height - point.y)
}

pub fn flip_rect(rect: Rect, primary_height: f64) -> Rect {
    Rect::new(
        rect.x,
        primary_height - (rect.y + rect.height),
        rect.width,
        rect.height,
    )
}

/// Нормализатор, привязанный к снимку экранов одного вычисления
#[derive(Debug, Clone, Copy)]
pub struct CoordinateNormalizer {
    primary_height: f64,
}

impl CoordinateNormalizer {
    pub fn new(primary_height: f64) -> Self {
        Self { primary_height }
    }

    /// `None`, если список экранов пуст
    pub fn from_screens(screens: &[ScreenDescriptor]) -> Option<Self> {
        screens.first().map(|primary| Self::new(primary.frame.height))
    }

    pub fn primary_height(&self) -> f64 {
        self.primary_height
    }

    pub fn rect_to_bottom_left(&self, rect: Rect) -> Rect {
        flip_rect(rect, self.primary_height)
    }

    pub fn rect_to_top_left(&self, rect: Rect) -> Rect {
        flip_rect(rect, self.primary_height)
    }

    pub fn point_to_top_left(&self, point: Point) -> Point {
        flip_point(point, self.primary_height)
    }

    pub fn point_to_bottom_left(&self, point: Point) -> Point {
        flip_point(point, self.primary_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip_rect_uses_primary_height() {
        let r = Rect::new(10.0, 20.0, 300.0, 200.0);
        let flipped = flip_rect(r, 1080.0);
        assert_eq!(flipped, Rect::new(10.0, 860.0, 300.0, 200.0));
    }

    #[test]
    fn test_flip_rect_round_trip_is_exact() {
        for h in [0_i32, 1, 768, 1080, 1440, 2160] {
            let h = h as f64;
            for (x, y, w, hgt) in [
                (0, 0, 0, 0),
                (-1920, -300, 1920, 1080),
                (15, 27, 800, 600),
                (3840, 1200, 1, 1),
            ] {
                let r = Rect::new(x as f64, y as f64, w as f64, hgt as f64);
                assert_eq!(flip_rect(flip_rect(r, h), h), r);
            }
        }
    }

    #[test]
    fn test_flip_point() {
        let p = Point::new(5.0, 100.0);
        assert_eq!(flip_point(p, 1080.0), Point::new(5.0, 980.0));
        assert_eq!(flip_point(flip_point(p, 1080.0), 1080.0), p);
    }

    #[test]
    fn test_normalizer_from_screens() {
        assert!(CoordinateNormalizer::from_screens(&[]).is_none());

        let screens = vec![ScreenDescriptor {
            id: "primary".to_string(),
            frame: Rect::new(0.0, 0.0, 1920.0, 1080.0),
            visible: Rect::new(0.0, 0.0, 1920.0, 1053.0),
        }];
        let n = CoordinateNormalizer::from_screens(&screens).unwrap();
        assert_eq!(n.primary_height(), 1080.0);
        assert_eq!(
            n.point_to_top_left(Point::new(0.0, 1080.0)),
            Point::new(0.0, 0.0)
        );
    }
}
