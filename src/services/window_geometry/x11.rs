use crate::config::Config;
use crate::debug_if_enabled;
use crate::error::Result;
use crate::events::{
    FocusedWindow, Pid, Point, Rect, ScreenDescriptor, SpaceId, SurfaceDescriptor, WindowId,
};
use crate::utils::coords::CoordinateNormalizer;
use parking_lot::Mutex;
use std::process::Command;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::r#trait::{GeometryProvider, Surfaces, WindowMover};
use super::wmctrl::{WmctrlDesktop, WmctrlTool, WmctrlWindow};
use super::xdotool::XdotoolTool;
use super::xrandr::{Monitor, XrandrTool};

/// Допуск при сверке точки hit-test с реальным положением мыши
const HIT_TEST_TOLERANCE: f64 = 1.0;

/// Один опрос X11 на вычисление вердикта: все фазы видят одни и те же
/// мониторы, рабочие столы и окна.
#[derive(Debug, Default)]
struct X11Snapshot {
    monitors: Vec<Monitor>,
    desktops: Vec<WmctrlDesktop>,
    windows: Vec<WmctrlWindow>,
    active: Option<FocusedWindow>,
    launcher: Option<Pid>,
}

impl X11Snapshot {
    fn current_desktop(&self) -> Option<&WmctrlDesktop> {
        self.desktops.iter().find(|d| d.current)
    }

    fn window(&self, id: WindowId) -> Option<&WmctrlWindow> {
        self.windows.iter().find(|w| w.id == id)
    }

    fn normalizer(&self) -> Option<CoordinateNormalizer> {
        self.monitors
            .first()
            .map(|primary| CoordinateNormalizer::new(primary.frame.height))
    }

    fn screens(&self) -> Vec<ScreenDescriptor> {
        let Some(normalizer) = self.normalizer() else {
            return Vec::new();
        };
        let work_area = self.current_desktop().and_then(|d| d.work_area);

        self.monitors
            .iter()
            .map(|m| {
                let visible = work_area
                    .and_then(|wa| m.frame.intersection(&wa))
                    .unwrap_or(m.frame);
                ScreenDescriptor {
                    id: m.name.clone(),
                    frame: normalizer.rect_to_bottom_left(m.frame),
                    visible: normalizer.rect_to_bottom_left(visible),
                }
            })
            .collect()
    }

    fn surfaces(&self) -> Surfaces {
        let current = self.current_desktop().map(|d| d.index);
        self.windows
            .iter()
            .filter(|w| w.is_sticky() || Some(w.desktop) == current)
            .map(|w| SurfaceDescriptor {
                owner: w.pid,
                bounds: w.frame,
                layer: layer_for(w, &self.monitors),
            })
            .collect()
    }
}

/// Слой поверхности: фон рабочего стола (липкое окно на весь монитор) -> 0,
/// прочие липкие (панели, доки) -> 1, обычные окна -> 0.
fn layer_for(window: &WmctrlWindow, monitors: &[Monitor]) -> i32 {
    if !window.is_sticky() {
        return 0;
    }
    let covers_monitor = monitors.iter().any(|m| m.frame == window.frame);
    if covers_monitor {
        0
    } else {
        1
    }
}

/// Снимок ещё годен в пределах окна троттлинга
fn is_fresh(taken: Instant, now: Instant, ttl: Duration) -> bool {
    now.saturating_duration_since(taken) < ttl
}

/// Геометрия X11 через xdotool / wmctrl / xrandr
pub struct X11Geometry {
    config: Arc<Config>,
    xdotool: XdotoolTool,
    wmctrl: WmctrlTool,
    xrandr: XrandrTool,
    snapshot: Mutex<Option<(Instant, Arc<X11Snapshot>)>>,
}

impl X11Geometry {
    pub fn new(config: Arc<Config>) -> Self {
        info!("Инициализация X11Geometry");
        Self {
            config,
            xdotool: XdotoolTool::new(),
            wmctrl: WmctrlTool::new(),
            xrandr: XrandrTool::new(),
            snapshot: Mutex::new(None),
        }
    }

    /// Снимок текущего вычисления; новый опрос не чаще раза за окно троттлинга
    fn snapshot(&self) -> Arc<X11Snapshot> {
        let now = Instant::now();
        let mut cached = self.snapshot.lock();
        if let Some((taken, snapshot)) = cached.as_ref() {
            if is_fresh(*taken, now, self.config.throttle()) {
                return Arc::clone(snapshot);
            }
        }

        let snapshot = Arc::new(self.take_snapshot());
        *cached = Some((now, Arc::clone(&snapshot)));
        snapshot
    }

    /// Последний снимок любой давности: мониторы меняются редко
    fn any_snapshot(&self) -> Arc<X11Snapshot> {
        let cached = self.snapshot.lock().as_ref().map(|(_, s)| Arc::clone(s));
        cached.unwrap_or_else(|| self.snapshot())
    }

    fn take_snapshot(&self) -> X11Snapshot {
        let monitors = self.xrandr.monitors();
        let desktops = self.wmctrl.desktops();
        let windows = self.wmctrl.list_windows();

        let active = self.xdotool.active_window().and_then(|id| {
            // Кадр и pid из списка wmctrl, xdotool только для окон вне списка
            match windows.iter().find(|w| w.id == id) {
                Some(w) => Some(FocusedWindow {
                    id,
                    pid: Some(w.pid),
                    frame: w.frame,
                }),
                None => Some(FocusedWindow {
                    id,
                    pid: self.xdotool.window_pid(id),
                    frame: self.xdotool.window_geometry(id)?,
                }),
            }
        });

        debug_if_enabled!(
            "Снимок X11: {} мониторов, {} столов, {} окон",
            monitors.len(),
            desktops.len(),
            windows.len()
        );

        X11Snapshot {
            monitors,
            desktops,
            windows,
            active,
            launcher: self.find_launcher(),
        }
    }

    fn find_launcher(&self) -> Option<Pid> {
        let name = &self.config.focus.launcher_process;
        let output = Command::new("pgrep").args(["-x", name]).output().ok()?;
        if !output.status.success() {
            return None;
        }
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .and_then(|line| line.trim().parse::<Pid>().ok())
    }

    /// Рабочие столы: из свежего снимка или одним `wmctrl -d`
    fn desktops(&self) -> Vec<WmctrlDesktop> {
        let cached = self.snapshot.lock().as_ref().and_then(|(taken, s)| {
            is_fresh(*taken, Instant::now(), self.config.throttle()).then(|| Arc::clone(s))
        });
        match cached {
            Some(snapshot) => snapshot.desktops.clone(),
            None => self.wmctrl.desktops(),
        }
    }
}

impl GeometryProvider for X11Geometry {
    fn probe(&self) -> bool {
        let mut available = true;
        if let Err(e) = self.xdotool.test() {
            warn!("xdotool недоступен: {}", e);
            available = false;
        }
        if let Err(e) = self.wmctrl.test() {
            warn!("wmctrl недоступен: {}", e);
            available = false;
        }
        if let Err(e) = self.xrandr.test() {
            warn!("xrandr недоступен: {}", e);
            available = false;
        }
        if available {
            info!("Запросы геометрии X11 доступны");
        }
        // После resume раскладка могла измениться
        *self.snapshot.lock() = None;
        available
    }

    fn cursor_location(&self) -> Option<Point> {
        let location = self.xdotool.mouse_location()?;
        let normalizer = self.any_snapshot().normalizer()?;
        Some(normalizer.point_to_bottom_left(location.position))
    }

    fn screens(&self) -> Vec<ScreenDescriptor> {
        self.snapshot().screens()
    }

    fn focused_window(&self) -> Option<FocusedWindow> {
        self.snapshot().active.clone()
    }

    fn frontmost_pid(&self) -> Option<Pid> {
        self.snapshot().active.as_ref().and_then(|w| w.pid)
    }

    fn owner_at(&self, point: Point) -> Option<Pid> {
        // X11 отвечает только за окно под живым курсором
        let location = self.xdotool.mouse_location()?;
        let dx = (location.position.x - point.x).abs();
        let dy = (location.position.y - point.y).abs();
        if dx > HIT_TEST_TOLERANCE || dy > HIT_TEST_TOLERANCE {
            debug!("Hit-test {} не совпал с курсором {}", point, location.position);
            return None;
        }
        let window = location.window?;
        match self.snapshot().window(window) {
            Some(w) => Some(w.pid),
            None => self.xdotool.window_pid(window),
        }
    }

    fn process_name(&self, pid: Pid) -> Option<String> {
        std::fs::read_to_string(format!("/proc/{}/comm", pid))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn surfaces(&self) -> Surfaces {
        self.snapshot().surfaces()
    }

    fn launcher_pid(&self) -> Option<Pid> {
        self.snapshot().launcher
    }

    fn spaces(&self) -> Vec<SpaceId> {
        self.desktops().into_iter().map(|d| d.index).collect()
    }

    fn active_space(&self) -> Option<SpaceId> {
        self.desktops().into_iter().find(|d| d.current).map(|d| d.index)
    }
}

impl WindowMover for X11Geometry {
    fn move_to_space(&self, window: WindowId, space: SpaceId) -> Result<()> {
        self.wmctrl.move_to_desktop(window, space)
    }

    fn set_frame(&self, window: WindowId, frame: Rect) -> Result<()> {
        self.xdotool.window_move(window, frame.x, frame.y)?;
        self.xdotool.window_size(window, frame.width, frame.height)?;
        // Повторно ставим позицию: после изменения размера WM может сдвинуть окно
        self.xdotool.window_move(window, frame.x, frame.y)
    }

    fn warp_pointer(&self, point: Point) -> Result<()> {
        self.xdotool.mouse_move(point)
    }
}
