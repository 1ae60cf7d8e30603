use crate::error::{GuardError, Result};
use crate::events::{
    FocusedWindow, Pid, Point, Rect, ScreenDescriptor, SpaceId, SurfaceDescriptor, WindowId,
};
use crate::utils::coords::CoordinateNormalizer;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::info;

use super::r#trait::{GeometryProvider, Surfaces, WindowMover};

/// Состояние эмулируемого рабочего стола. Поля открыты, чтобы тесты
/// могли собрать любую раскладку.
#[derive(Debug, Clone, Default)]
pub struct DryRunLayout {
    pub trusted: bool,
    /// bottom-left, основной первым
    pub screens: Vec<ScreenDescriptor>,
    /// bottom-left
    pub cursor: Option<Point>,
    pub focused: Option<FocusedWindow>,
    pub frontmost: Option<Pid>,
    /// Спереди назад; первая содержащая точку поверхность владеет ею
    pub surfaces: Vec<SurfaceDescriptor>,
    pub process_names: HashMap<Pid, String>,
    pub launcher: Option<Pid>,
    pub spaces: Vec<SpaceId>,
    pub active_space: Option<SpaceId>,
    /// Код, с которым отклоняется перенос окна
    pub reject_moves: Option<i32>,
    pub moves: Vec<(WindowId, SpaceId)>,
    pub frames: Vec<(WindowId, Rect)>,
    pub warps: Vec<Point>,
}

/// Эмулированная геометрия для `--dry-run` и тестов
pub struct DryRunGeometry {
    layout: RwLock<DryRunLayout>,
}

pub const DRY_FOREGROUND_PID: Pid = 1000;
pub const DRY_LAUNCHER_PID: Pid = 1200;
pub const DRY_FILE_MANAGER_PID: Pid = 1500;
pub const DRY_BACKGROUND_APP_PID: Pid = 2000;
pub const DRY_FOCUSED_WINDOW: WindowId = WindowId(0x0100_0001);

impl DryRunGeometry {
    pub fn new(layout: DryRunLayout) -> Self {
        Self {
            layout: RwLock::new(layout),
        }
    }

    /// Два монитора: основной 1920x1080 с полосой панели сверху и
    /// 2560x1440 справа. Терминал в фокусе, браузер на втором мониторе.
    pub fn two_monitors() -> Self {
        let mut process_names = HashMap::new();
        process_names.insert(DRY_FOREGROUND_PID, "konsole".to_string());
        process_names.insert(DRY_LAUNCHER_PID, "plasmashell".to_string());
        process_names.insert(DRY_FILE_MANAGER_PID, "dolphin".to_string());
        process_names.insert(DRY_BACKGROUND_APP_PID, "firefox".to_string());

        let terminal = Rect::new(100.0, 100.0, 800.0, 600.0);

        Self::new(DryRunLayout {
            trusted: true,
            screens: vec![
                ScreenDescriptor {
                    id: "DRY-1".to_string(),
                    frame: Rect::new(0.0, 0.0, 1920.0, 1080.0),
                    visible: Rect::new(0.0, 0.0, 1920.0, 1053.0),
                },
                ScreenDescriptor {
                    id: "DRY-2".to_string(),
                    frame: Rect::new(1920.0, -360.0, 2560.0, 1440.0),
                    visible: Rect::new(1920.0, -360.0, 2560.0, 1440.0),
                },
            ],
            cursor: Some(Point::new(500.0, 500.0)),
            focused: Some(FocusedWindow {
                id: DRY_FOCUSED_WINDOW,
                pid: Some(DRY_FOREGROUND_PID),
                frame: terminal,
            }),
            frontmost: Some(DRY_FOREGROUND_PID),
            surfaces: vec![
                SurfaceDescriptor {
                    owner: DRY_LAUNCHER_PID,
                    bounds: Rect::new(0.0, 0.0, 1920.0, 27.0),
                    layer: 1,
                },
                SurfaceDescriptor {
                    owner: DRY_LAUNCHER_PID,
                    bounds: Rect::new(760.0, 1030.0, 400.0, 50.0),
                    layer: 1,
                },
                SurfaceDescriptor {
                    owner: DRY_FOREGROUND_PID,
                    bounds: terminal,
                    layer: 0,
                },
                SurfaceDescriptor {
                    owner: DRY_FOREGROUND_PID,
                    bounds: Rect::new(950.0, 200.0, 240.0, 160.0),
                    layer: 0,
                },
                SurfaceDescriptor {
                    owner: DRY_FILE_MANAGER_PID,
                    bounds: Rect::new(1000.0, 500.0, 600.0, 400.0),
                    layer: 0,
                },
                SurfaceDescriptor {
                    owner: DRY_BACKGROUND_APP_PID,
                    bounds: Rect::new(2100.0, 100.0, 1200.0, 800.0),
                    layer: 0,
                },
                SurfaceDescriptor {
                    owner: DRY_LAUNCHER_PID,
                    bounds: Rect::new(0.0, 0.0, 1920.0, 1080.0),
                    layer: 0,
                },
            ],
            process_names,
            launcher: Some(DRY_LAUNCHER_PID),
            spaces: vec![0, 1, 2],
            active_space: Some(0),
            ..DryRunLayout::default()
        })
    }

    /// Изменить раскладку на лету
    pub fn update<F: FnOnce(&mut DryRunLayout)>(&self, f: F) {
        f(&mut self.layout.write());
    }

    /// Копия текущей раскладки, включая записанные действия
    pub fn snapshot(&self) -> DryRunLayout {
        self.layout.read().clone()
    }
}

impl GeometryProvider for DryRunGeometry {
    fn probe(&self) -> bool {
        self.layout.read().trusted
    }

    fn cursor_location(&self) -> Option<Point> {
        self.layout.read().cursor
    }

    fn screens(&self) -> Vec<ScreenDescriptor> {
        self.layout.read().screens.clone()
    }

    fn focused_window(&self) -> Option<FocusedWindow> {
        self.layout.read().focused.clone()
    }

    fn frontmost_pid(&self) -> Option<Pid> {
        self.layout.read().frontmost
    }

    fn owner_at(&self, point: Point) -> Option<Pid> {
        self.layout
            .read()
            .surfaces
            .iter()
            .find(|s| s.bounds.contains(point))
            .map(|s| s.owner)
    }

    fn process_name(&self, pid: Pid) -> Option<String> {
        self.layout.read().process_names.get(&pid).cloned()
    }

    fn surfaces(&self) -> Surfaces {
        self.layout.read().surfaces.iter().cloned().collect()
    }

    fn launcher_pid(&self) -> Option<Pid> {
        self.layout.read().launcher
    }

    fn spaces(&self) -> Vec<SpaceId> {
        self.layout.read().spaces.clone()
    }

    fn active_space(&self) -> Option<SpaceId> {
        self.layout.read().active_space
    }
}

impl WindowMover for DryRunGeometry {
    fn move_to_space(&self, window: WindowId, space: SpaceId) -> Result<()> {
        let mut layout = self.layout.write();
        if let Some(code) = layout.reject_moves {
            info!("Dry-run: перенос {} на стол {} отклонён ({})", window, space, code);
            return Err(GuardError::MoveRejected { code });
        }
        info!("Dry-run: перенос {} на стол {}", window, space);
        layout.moves.push((window, space));
        Ok(())
    }

    fn set_frame(&self, window: WindowId, frame: Rect) -> Result<()> {
        info!("Dry-run: новый кадр {} -> {}", window, frame);
        let mut layout = self.layout.write();
        layout.frames.push((window, frame));
        if let Some(focused) = layout.focused.as_mut().filter(|f| f.id == window) {
            focused.frame = frame;
        }
        Ok(())
    }

    fn warp_pointer(&self, point: Point) -> Result<()> {
        info!("Dry-run: курсор -> {}", point);
        let mut layout = self.layout.write();
        layout.warps.push(point);
        if let Some(normalizer) = CoordinateNormalizer::from_screens(&layout.screens) {
            layout.cursor = Some(normalizer.point_to_bottom_left(point));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_at_uses_front_most_surface() {
        let geometry = DryRunGeometry::two_monitors();
        assert_eq!(
            geometry.owner_at(Point::new(200.0, 200.0)),
            Some(DRY_FOREGROUND_PID)
        );
        assert_eq!(
            geometry.owner_at(Point::new(10.0, 10.0)),
            Some(DRY_LAUNCHER_PID)
        );
        assert_eq!(geometry.owner_at(Point::new(5000.0, 10.0)), None);
    }

    #[test]
    fn test_rejected_move_reports_code() {
        let geometry = DryRunGeometry::two_monitors();
        geometry.update(|l| l.reject_moves = Some(2));

        let err = geometry
            .move_to_space(DRY_FOCUSED_WINDOW, 1)
            .unwrap_err();
        assert!(matches!(err, GuardError::MoveRejected { code: 2 }));
        assert!(geometry.snapshot().moves.is_empty());
    }

    #[test]
    fn test_warp_updates_cursor_in_bottom_left() {
        let geometry = DryRunGeometry::two_monitors();
        geometry.warp_pointer(Point::new(500.0, 110.0)).unwrap();
        assert_eq!(geometry.cursor_location(), Some(Point::new(500.0, 970.0)));
    }
}
