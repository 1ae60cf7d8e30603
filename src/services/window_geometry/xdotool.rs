use crate::error::{GuardError, Result};
use crate::events::{Pid, Point, Rect, WindowId};
use crate::guard_error;
use std::collections::HashMap;
use std::process::Command;
use tracing::debug;

/// Положение мыши и окно под ней, как их сообщает `getmouselocation`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseLocation {
    pub position: Point,
    pub window: Option<WindowId>,
}

pub struct XdotoolTool;

impl XdotoolTool {
    pub fn new() -> Self {
        Self
    }

    pub fn test(&self) -> Result<()> {
        let output = Command::new("xdotool").args(["getmouselocation"]).output()?;
        if output.status.success() {
            Ok(())
        } else {
            Err(guard_error!(service_unavailable, "xdotool failed"))
        }
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("xdotool").args(args).output().map_err(|e| {
            debug!("xdotool не найден или не работает: {}", e);
            GuardError::Internal(format!("xdotool не найден: {}", e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("xdotool {:?} вернул ошибку: {}", args, stderr.trim());
            return Err(GuardError::Internal(format!(
                "xdotool вернул ошибку: {}",
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    pub fn mouse_location(&self) -> Option<MouseLocation> {
        let stdout = self.run(&["getmouselocation", "--shell"]).ok()?;
        parse_mouse_location(&stdout)
    }

    pub fn active_window(&self) -> Option<WindowId> {
        let stdout = self.run(&["getactivewindow"]).ok()?;
        stdout.parse::<u64>().ok().map(WindowId)
    }

    pub fn window_geometry(&self, window: WindowId) -> Option<Rect> {
        let id = window.0.to_string();
        let stdout = self.run(&["getwindowgeometry", "--shell", &id]).ok()?;
        parse_window_geometry(&stdout)
    }

    pub fn window_pid(&self, window: WindowId) -> Option<Pid> {
        let id = window.0.to_string();
        let stdout = self.run(&["getwindowpid", &id]).ok()?;
        stdout.parse::<Pid>().ok()
    }

    pub fn mouse_move(&self, point: Point) -> Result<()> {
        let x = (point.x.round() as i64).to_string();
        let y = (point.y.round() as i64).to_string();
        self.run(&["mousemove", &x, &y]).map(|_| ())
    }

    pub fn window_move(&self, window: WindowId, x: f64, y: f64) -> Result<()> {
        let id = window.0.to_string();
        let x = (x.round() as i64).to_string();
        let y = (y.round() as i64).to_string();
        self.run(&["windowmove", &id, &x, &y]).map(|_| ())
    }

    pub fn window_size(&self, window: WindowId, width: f64, height: f64) -> Result<()> {
        let id = window.0.to_string();
        let w = (width.round() as i64).to_string();
        let h = (height.round() as i64).to_string();
        self.run(&["windowsize", &id, &w, &h]).map(|_| ())
    }
}

/// Разбор вывода `--shell`: строки вида `KEY=VALUE`
fn parse_shell_vars(stdout: &str) -> HashMap<&str, &str> {
    stdout
        .lines()
        .filter_map(|line| line.trim().split_once('='))
        .collect()
}

fn parse_mouse_location(stdout: &str) -> Option<MouseLocation> {
    let vars = parse_shell_vars(stdout);
    let x = vars.get("X")?.parse::<f64>().ok()?;
    let y = vars.get("Y")?.parse::<f64>().ok()?;
    let window = vars
        .get("WINDOW")
        .and_then(|w| w.parse::<u64>().ok())
        .map(WindowId);
    Some(MouseLocation {
        position: Point::new(x, y),
        window,
    })
}

fn parse_window_geometry(stdout: &str) -> Option<Rect> {
    let vars = parse_shell_vars(stdout);
    let x = vars.get("X")?.parse::<f64>().ok()?;
    let y = vars.get("Y")?.parse::<f64>().ok()?;
    let width = vars.get("WIDTH")?.parse::<f64>().ok()?;
    let height = vars.get("HEIGHT")?.parse::<f64>().ok()?;
    Some(Rect::new(x, y, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mouse_location() {
        let out = "X=812\nY=344\nSCREEN=0\nWINDOW=58720263\n";
        let loc = parse_mouse_location(out).unwrap();
        assert_eq!(loc.position, Point::new(812.0, 344.0));
        assert_eq!(loc.window, Some(WindowId(58720263)));
    }

    #[test]
    fn test_parse_mouse_location_without_window() {
        let loc = parse_mouse_location("X=1\nY=2\nSCREEN=0").unwrap();
        assert_eq!(loc.window, None);
        assert!(parse_mouse_location("garbage").is_none());
    }

    #[test]
    fn test_parse_window_geometry() {
        let out = "WINDOW=58720263\nX=100\nY=64\nWIDTH=800\nHEIGHT=600\nSCREEN=0";
        assert_eq!(
            parse_window_geometry(out),
            Some(Rect::new(100.0, 64.0, 800.0, 600.0))
        );
        assert_eq!(parse_window_geometry("X=1\nY=2"), None);
    }
}
