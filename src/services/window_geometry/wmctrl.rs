use crate::error::{GuardError, Result};
use crate::events::{Pid, Rect, SpaceId, WindowId};
use crate::guard_error;
use std::process::Command;
use tracing::debug;

/// Строка `wmctrl -lpG`
#[derive(Debug, Clone, PartialEq)]
pub struct WmctrlWindow {
    pub id: WindowId,
    /// -1 означает "на всех рабочих столах" (панели, доки, фон)
    pub desktop: SpaceId,
    pub pid: Pid,
    pub frame: Rect,
}

impl WmctrlWindow {
    pub fn is_sticky(&self) -> bool {
        self.desktop < 0
    }
}

/// Строка `wmctrl -d`
#[derive(Debug, Clone, PartialEq)]
pub struct WmctrlDesktop {
    pub index: SpaceId,
    pub current: bool,
    pub work_area: Option<Rect>,
}

pub struct WmctrlTool;

impl WmctrlTool {
    pub fn new() -> Self {
        Self
    }

    pub fn test(&self) -> Result<()> {
        let output = Command::new("wmctrl").args(["-m"]).output()?;
        if output.status.success() {
            Ok(())
        } else {
            Err(guard_error!(service_unavailable, "wmctrl failed"))
        }
    }

    fn run(&self, args: &[&str]) -> Option<String> {
        let output = Command::new("wmctrl").args(args).output().ok()?;
        if !output.status.success() {
            debug!(
                "wmctrl {:?} вернул ошибку: {}",
                args,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    pub fn list_windows(&self) -> Vec<WmctrlWindow> {
        self.run(&["-lpG"])
            .map(|stdout| stdout.lines().filter_map(parse_window_line).collect())
            .unwrap_or_default()
    }

    pub fn desktops(&self) -> Vec<WmctrlDesktop> {
        self.run(&["-d"])
            .map(|stdout| stdout.lines().filter_map(parse_desktop_line).collect())
            .unwrap_or_default()
    }

    /// Перенос окна на рабочий стол. Код возврата wmctrl попадает в ошибку.
    pub fn move_to_desktop(&self, window: WindowId, desktop: SpaceId) -> Result<()> {
        let id = format!("0x{:08x}", window.0);
        let slot = desktop.to_string();
        let status = Command::new("wmctrl")
            .args(["-i", "-r", &id, "-t", &slot])
            .status()?;

        if status.success() {
            Ok(())
        } else {
            Err(GuardError::MoveRejected {
                code: status.code().unwrap_or(-1),
            })
        }
    }
}

fn parse_window_line(line: &str) -> Option<WmctrlWindow> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 7 {
        return None;
    }

    let id = u64::from_str_radix(parts[0].trim_start_matches("0x"), 16).ok()?;
    let desktop = parts[1].parse::<SpaceId>().ok()?;
    let pid = parts[2].parse::<Pid>().ok()?;
    let x = parts[3].parse::<f64>().ok()?;
    let y = parts[4].parse::<f64>().ok()?;
    let w = parts[5].parse::<f64>().ok()?;
    let h = parts[6].parse::<f64>().ok()?;

    Some(WmctrlWindow {
        id: WindowId(id),
        desktop,
        pid,
        frame: Rect::new(x, y, w, h),
    })
}

fn parse_desktop_line(line: &str) -> Option<WmctrlDesktop> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 2 {
        return None;
    }

    let index = parts[0].parse::<SpaceId>().ok()?;
    let current = parts[1] == "*";

    // "WA: 0,27 3840x1053"
    let work_area = parts
        .iter()
        .position(|p| *p == "WA:")
        .and_then(|i| Some((parts.get(i + 1)?, parts.get(i + 2)?)))
        .and_then(|(origin, size)| {
            let (x, y) = origin.split_once(',')?;
            let (w, h) = size.split_once('x')?;
            Some(Rect::new(
                x.parse().ok()?,
                y.parse().ok()?,
                w.parse().ok()?,
                h.parse().ok()?,
            ))
        });

    Some(WmctrlDesktop {
        index,
        current,
        work_area,
    })
}
