//! Движок безопасности фокуса: решает, находится ли курсор над окном,
//! с которым пользователь действительно работает.
//!
//! Фазы проверяются по порядку, первая сработавшая побеждает:
//! 1. полоса панели над рабочей областью экрана;
//! 2. владелец точки из allow-list;
//! 3. владелец точки = процесс на переднем плане;
//! 4. кадр окна с фокусом, расширенный на `frame_outset`;
//! 5. любая поверхность процесса переднего плана;
//! 6. поверхность лаунчера со слоем > 0;
//! 7. иначе небезопасно.
//!
//! Фаза 1 считается в bottom-left по снимку экранов, верхняя граница кадра
//! включена: пиксельная строка y=0 переворачивается ровно в `frame.max_y()`.
//! Кадры окон и поверхностей приходят в top-left, поэтому фазы 4-6
//! сравнивают их с точкой в top-left без переворота прямоугольников.

use crate::config::Config;
use crate::debug_if_enabled;
use crate::events::{CursorSample, FocusVerdict, Point, ScreenDescriptor, VerdictReason};
use crate::services::window_geometry::GeometryBackend;
use crate::utils::coords::CoordinateNormalizer;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

pub struct FocusSafetyEngine {
    config: Arc<Config>,
    geometry: Arc<dyn GeometryBackend>,
    trusted: bool,
    permission_warned: bool,
    next_evaluation: Option<Instant>,
    /// Отсрочка после клика, отдельно от обычного троттлинга
    deferred_until: Option<Instant>,
}

impl FocusSafetyEngine {
    pub fn new(config: Arc<Config>, geometry: Arc<dyn GeometryBackend>, trusted: bool) -> Self {
        Self {
            config,
            geometry,
            trusted,
            permission_warned: false,
            next_evaluation: None,
            deferred_until: None,
        }
    }

    /// Значение проверки прав обновляется только при старте и resume
    pub fn set_trusted(&mut self, trusted: bool) {
        if trusted {
            self.permission_warned = false;
        }
        self.trusted = trusted;
    }

    pub fn is_trusted(&self) -> bool {
        self.trusted
    }

    /// Отодвинуть следующую оценку минимум до `now + by`
    pub fn defer(&mut self, now: Instant, by: Duration) {
        let deadline = now + by;
        self.next_evaluation = Some(match self.next_evaluation {
            Some(existing) if existing > deadline => existing,
            _ => deadline,
        });
        self.deferred_until = Some(match self.deferred_until {
            Some(existing) if existing > deadline => existing,
            _ => deadline,
        });
    }

    /// Идёт ли отсрочка после клика. Обычный троттлинг сюда не входит.
    pub fn is_deferred(&self, now: Instant) -> bool {
        self.deferred_until.is_some_and(|until| now < until)
    }

    /// Оценка с троттлингом. `None` - окно троттлинга ещё не истекло,
    /// вызывающий обновляет только позицию индикатора.
    pub fn evaluate(&mut self, sample: &CursorSample, now: Instant) -> Option<FocusVerdict> {
        if let Some(next) = self.next_evaluation {
            if now < next {
                return None;
            }
        }
        self.next_evaluation = Some(now + self.config.throttle());
        Some(self.classify(sample.position))
    }

    /// Классификация без троттлинга. `point` в bottom-left координатах.
    pub fn classify(&mut self, point: Point) -> FocusVerdict {
        let verdict = self.run_phases(point);
        debug_if_enabled!("Вердикт для {}: {}", point, verdict);
        verdict
    }

    fn run_phases(&mut self, point: Point) -> FocusVerdict {
        if !self.trusted {
            if !self.permission_warned {
                warn!("Нет доступа к геометрии окон - индикатор отключён до resume");
                self.permission_warned = true;
            }
            return FocusVerdict::safe(VerdictReason::NoPermission);
        }

        let screens = self.geometry.screens();
        let Some(normalizer) = CoordinateNormalizer::from_screens(&screens) else {
            return FocusVerdict::safe(VerdictReason::Inconclusive);
        };

        // 1. Полоса над видимой областью экрана
        if screens.iter().any(|s| in_menu_bar(s, point)) {
            return FocusVerdict::safe(VerdictReason::MenuBar);
        }

        // Hit-test и кадры окон в top-left
        let top_left = normalizer.point_to_top_left(point);
        let owner = self.geometry.owner_at(top_left);

        // 2. Владелец из allow-list
        if let Some(owner) = owner {
            let allow_listed = self
                .geometry
                .process_name(owner)
                .map(|name| self.config.is_allow_listed(&name))
                .unwrap_or(false);
            if allow_listed {
                return FocusVerdict::safe(VerdictReason::AllowListedOwner);
            }
        }

        let Some(frontmost) = self.geometry.frontmost_pid() else {
            return FocusVerdict::safe(VerdictReason::Inconclusive);
        };

        // 3. Владелец точки на переднем плане
        if owner == Some(frontmost) {
            return FocusVerdict::safe(VerdictReason::ForegroundOwner);
        }

        let focused = self.geometry.focused_window();
        let surfaces = self.geometry.surfaces();
        let has_foreground_surface = surfaces.iter().any(|s| s.owner == frontmost);
        if focused.is_none() && !has_foreground_surface {
            return FocusVerdict::safe(VerdictReason::Inconclusive);
        }

        // 4. Кадр окна с фокусом с допуском
        if let Some(focused) = focused {
            let frame = focused.frame.outset(self.config.focus.frame_outset);
            if frame.contains(top_left) {
                return FocusVerdict::safe(VerdictReason::FocusedWindow);
            }
        }

        // 5. Вторичные окна и поповеры переднего плана
        let over_foreground = surfaces
            .iter()
            .filter(|s| s.owner == frontmost)
            .any(|s| s.bounds.contains(top_left));
        if over_foreground {
            return FocusVerdict::safe(VerdictReason::ForegroundSurface);
        }

        // 6. Панели лаунчера, фон рабочего стола (слой <= 0) не считается
        if let Some(launcher) = self.geometry.launcher_pid() {
            let over_launcher = surfaces
                .iter()
                .filter(|s| s.owner == launcher && s.layer > 0)
                .any(|s| s.bounds.contains(top_left));
            if over_launcher {
                return FocusVerdict::safe(VerdictReason::LauncherSurface);
            }
        }

        FocusVerdict::unsafe_here()
    }
}

/// Полоса между видимой областью и верхним краем кадра, край включён.
/// Экран без полосы (visible доходит до верха) её не имеет.
fn in_menu_bar(screen: &ScreenDescriptor, point: Point) -> bool {
    let frame = screen.frame;
    screen.visible.max_y() < frame.max_y()
        && point.x >= frame.min_x()
        && point.x < frame.max_x()
        && point.y >= screen.visible.max_y()
        && point.y <= frame.max_y()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Rect, SurfaceDescriptor};
    use crate::services::window_geometry::{
        DryRunGeometry, DRY_FILE_MANAGER_PID, DRY_FOREGROUND_PID,
    };

    fn engine_with(geometry: Arc<DryRunGeometry>) -> FocusSafetyEngine {
        FocusSafetyEngine::new(Arc::new(Config::default()), geometry, true)
    }

    fn reason_at(engine: &mut FocusSafetyEngine, x: f64, y: f64) -> VerdictReason {
        engine.classify(Point::new(x, y)).reason
    }

    /// Точки в bottom-left; основной экран 1080 в высоту, так что
    /// top-left y = 1080 - y.
    #[test]
    fn test_phases_on_two_monitor_layout() {
        let geometry = Arc::new(DryRunGeometry::two_monitors());
        let mut engine = engine_with(geometry);

        assert_eq!(reason_at(&mut engine, 500.0, 1060.0), VerdictReason::MenuBar);
        assert_eq!(reason_at(&mut engine, 500.0, 500.0), VerdictReason::ForegroundOwner);
        assert_eq!(reason_at(&mut engine, 1200.0, 380.0), VerdictReason::AllowListedOwner);
        // 3 px правее терминала: под курсором фон, спасает допуск кадра
        assert_eq!(reason_at(&mut engine, 903.0, 780.0), VerdictReason::FocusedWindow);
        // Док лаунчера внизу основного экрана
        assert_eq!(reason_at(&mut engine, 800.0, 30.0), VerdictReason::LauncherSurface);
        // Браузер на втором мониторе
        assert_eq!(reason_at(&mut engine, 2500.0, 580.0), VerdictReason::Unsafe);
        // Фон рабочего стола (слой 0) не спасает
        assert_eq!(reason_at(&mut engine, 1700.0, 980.0), VerdictReason::Unsafe);
    }

    #[test]
    fn test_top_pixel_row_is_menu_bar() {
        let geometry = Arc::new(DryRunGeometry::two_monitors());
        let normalizer = CoordinateNormalizer::new(1080.0);
        let mut engine = engine_with(geometry);

        // Курсор упёрт в верх экрана: top-left y=0 -> bottom-left y=1080
        for y in [0.0, 1.0, 26.0] {
            let point = normalizer.point_to_bottom_left(Point::new(500.0, y));
            assert_eq!(engine.classify(point).reason, VerdictReason::MenuBar, "y={}", y);
        }
        // Правый край кадра не принадлежит экрану
        let point = normalizer.point_to_bottom_left(Point::new(1920.0, 0.0));
        assert_ne!(engine.classify(point).reason, VerdictReason::MenuBar);
    }

    #[test]
    fn test_top_edge_panel_without_work_area_strip() {
        let geometry = Arc::new(DryRunGeometry::two_monitors());
        geometry.update(|l| l.screens[0].visible = l.screens[0].frame);
        let normalizer = CoordinateNormalizer::new(1080.0);
        let mut engine = engine_with(geometry);

        // Полосы нет, верхнюю строку спасает панель лаунчера (top-left 0,0 1920x27)
        let point = normalizer.point_to_bottom_left(Point::new(500.0, 0.0));
        assert_eq!(engine.classify(point).reason, VerdictReason::LauncherSurface);
        // Верхняя строка кадра с допуском (100 - 5) принадлежит окну с фокусом
        let point = normalizer.point_to_bottom_left(Point::new(500.0, 95.0));
        assert_eq!(engine.classify(point).reason, VerdictReason::FocusedWindow);
    }

    #[test]
    fn test_foreground_surface_under_foreign_overlay() {
        let geometry = Arc::new(DryRunGeometry::two_monitors());
        geometry.update(|l| {
            l.surfaces.insert(
                0,
                SurfaceDescriptor {
                    owner: 3000,
                    bounds: Rect::new(940.0, 190.0, 300.0, 200.0),
                    layer: 0,
                },
            );
        });
        let mut engine = engine_with(geometry);

        // Поповер терминала (950,200 240x160 top-left) под чужим окном
        assert_eq!(reason_at(&mut engine, 1000.0, 830.0), VerdictReason::ForegroundSurface);
    }

    #[test]
    fn test_allow_listed_owner_wins_over_later_phases() {
        let geometry = Arc::new(DryRunGeometry::two_monitors());
        geometry.update(|l| {
            // Фокус на окне, которое тоже покрывает точку, и другой передний план
            l.focused.as_mut().unwrap().frame = Rect::new(0.0, 0.0, 1920.0, 1080.0);
            l.frontmost = Some(4242);
        });
        let mut engine = engine_with(geometry.clone());

        assert_eq!(reason_at(&mut engine, 1200.0, 380.0), VerdictReason::AllowListedOwner);

        geometry.update(|l| {
            l.process_names.insert(DRY_FILE_MANAGER_PID, "Some-Editor".to_string());
        });
        assert_eq!(reason_at(&mut engine, 1200.0, 380.0), VerdictReason::FocusedWindow);
    }

    #[test]
    fn test_degrades_to_safe() {
        let geometry = Arc::new(DryRunGeometry::two_monitors());
        let mut engine = engine_with(geometry.clone());

        engine.set_trusted(false);
        let v = engine.classify(Point::new(2500.0, 580.0));
        assert!(!v.show);
        assert_eq!(v.reason, VerdictReason::NoPermission);
        // Повторный вызов не паникует и даёт тот же ответ
        assert_eq!(reason_at(&mut engine, 2500.0, 580.0), VerdictReason::NoPermission);
        engine.set_trusted(true);

        geometry.update(|l| l.frontmost = None);
        assert_eq!(reason_at(&mut engine, 2500.0, 580.0), VerdictReason::Inconclusive);

        geometry.update(|l| {
            l.frontmost = Some(DRY_FOREGROUND_PID);
            l.focused = None;
            l.surfaces.retain(|s| s.owner != DRY_FOREGROUND_PID);
        });
        assert_eq!(reason_at(&mut engine, 2500.0, 580.0), VerdictReason::Inconclusive);

        geometry.update(|l| l.screens.clear());
        assert_eq!(reason_at(&mut engine, 2500.0, 580.0), VerdictReason::Inconclusive);
    }

    #[test]
    fn test_zero_size_focused_frame_is_not_a_fault() {
        let geometry = Arc::new(DryRunGeometry::two_monitors());
        geometry.update(|l| {
            l.focused.as_mut().unwrap().frame = Rect::new(2500.0, 500.0, 0.0, 0.0);
        });
        let mut engine = engine_with(geometry);

        // Пустой кадр, расширенный на 5, накрывает точку вплотную к нему
        assert_eq!(reason_at(&mut engine, 2502.0, 578.0), VerdictReason::FocusedWindow);
        assert_eq!(reason_at(&mut engine, 2600.0, 580.0), VerdictReason::Unsafe);
    }

    #[test]
    fn test_throttle_window() {
        let geometry = Arc::new(DryRunGeometry::two_monitors());
        let mut engine = engine_with(geometry);
        let t0 = Instant::now();
        let sample = CursorSample::at(Point::new(2500.0, 580.0), t0);

        assert!(engine.evaluate(&sample, t0).is_some());
        for ms in [1, 10, 30, 49] {
            assert!(engine.evaluate(&sample, t0 + Duration::from_millis(ms)).is_none());
        }
        assert!(engine.evaluate(&sample, t0 + Duration::from_millis(50)).is_some());
        assert!(engine.evaluate(&sample, t0 + Duration::from_millis(60)).is_none());
    }

    #[test]
    fn test_defer_pushes_deadline() {
        let geometry = Arc::new(DryRunGeometry::two_monitors());
        let mut engine = engine_with(geometry);
        let t0 = Instant::now();
        let sample = CursorSample::at(Point::new(2500.0, 580.0), t0);

        assert!(engine.evaluate(&sample, t0).is_some());
        engine.defer(t0, Duration::from_millis(500));
        assert!(engine.evaluate(&sample, t0 + Duration::from_millis(100)).is_none());
        assert!(engine.evaluate(&sample, t0 + Duration::from_millis(499)).is_none());

        // Более короткая отсрочка не сокращает уже назначенную
        engine.defer(t0, Duration::from_millis(10));
        assert!(engine.evaluate(&sample, t0 + Duration::from_millis(499)).is_none());
        assert!(engine.evaluate(&sample, t0 + Duration::from_millis(500)).is_some());
    }

    #[test]
    fn test_is_deferred_ignores_plain_throttle() {
        let geometry = Arc::new(DryRunGeometry::two_monitors());
        let mut engine = engine_with(geometry);
        let t0 = Instant::now();
        let sample = CursorSample::at(Point::new(2500.0, 580.0), t0);

        assert!(engine.evaluate(&sample, t0).is_some());
        assert!(!engine.is_deferred(t0 + Duration::from_millis(10)));

        engine.defer(t0, Duration::from_millis(500));
        assert!(engine.is_deferred(t0 + Duration::from_millis(499)));
        assert!(!engine.is_deferred(t0 + Duration::from_millis(500)));
    }
}
