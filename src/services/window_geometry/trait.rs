use crate::config::Config;
use crate::error::Result;
use crate::events::{
    FocusedWindow, Pid, Point, Rect, ScreenDescriptor, SpaceId, SurfaceDescriptor, WindowId,
};
use smallvec::SmallVec;
use std::sync::Arc;

/// Список видимых поверхностей; обычно их немного, поэтому без аллокации
pub type Surfaces = SmallVec<[SurfaceDescriptor; 16]>;

/// Запросы геометрии окон и экранов.
///
/// Соглашения об осях:
/// - `screens()` и `cursor_location()` отдают bottom-left-up координаты;
/// - кадры окон, поверхности и точка `owner_at()` используют top-left-down.
///
/// Ни один метод не паникует и не возвращает ошибку: отсутствие прав или
/// данных выражается через `None` / пустой список.
pub trait GeometryProvider: Send + Sync {
    /// Проверка прав и инструментов. Вызывается только при старте и resume.
    fn probe(&self) -> bool;

    fn cursor_location(&self) -> Option<Point>;

    /// Основной экран идёт первым
    fn screens(&self) -> Vec<ScreenDescriptor>;

    fn focused_window(&self) -> Option<FocusedWindow>;

    fn frontmost_pid(&self) -> Option<Pid>;

    fn owner_at(&self, point: Point) -> Option<Pid>;

    fn process_name(&self, pid: Pid) -> Option<String>;

    fn surfaces(&self) -> Surfaces;

    fn launcher_pid(&self) -> Option<Pid>;

    /// Рабочие столы в визуальном порядке
    fn spaces(&self) -> Vec<SpaceId>;

    fn active_space(&self) -> Option<SpaceId>;
}

/// Действия над окнами и курсором, нужные перемещателю окон
pub trait WindowMover: Send + Sync {
    /// Привилегированный перенос окна на рабочий стол.
    /// Ненулевой код возврата -> `GuardError::MoveRejected`.
    fn move_to_space(&self, window: WindowId, space: SpaceId) -> Result<()>;

    /// Установить кадр окна (top-left)
    fn set_frame(&self, window: WindowId, frame: Rect) -> Result<()>;

    /// Переместить курсор в точку (top-left)
    fn warp_pointer(&self, point: Point) -> Result<()>;
}

/// Фабрика провайдера геометрии по режиму бэкенда
pub fn create_geometry_provider(
    config: Arc<Config>,
    dry_run: bool,
) -> Result<Arc<dyn GeometryBackend>> {
    if dry_run || config.backend.mode == "dry" {
        Ok(Arc::new(super::dry_run::DryRunGeometry::two_monitors()))
    } else {
        Ok(Arc::new(super::x11::X11Geometry::new(config)))
    }
}

/// Провайдер геометрии, который умеет ещё и двигать окна
pub trait GeometryBackend: GeometryProvider + WindowMover {}

impl<T: GeometryProvider + WindowMover> GeometryBackend for T {}
