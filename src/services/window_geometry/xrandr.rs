use crate::error::Result;
use crate::events::Rect;
use crate::guard_error;
use std::process::Command;
use tracing::debug;

/// Активный монитор в координатах X11 (top-left)
#[derive(Debug, Clone, PartialEq)]
pub struct Monitor {
    pub name: String,
    pub primary: bool,
    pub frame: Rect,
}

pub struct XrandrTool;

impl XrandrTool {
    pub fn new() -> Self {
        Self
    }

    pub fn test(&self) -> Result<()> {
        let output = Command::new("xrandr").args(["--listactivemonitors"]).output()?;
        if output.status.success() {
            Ok(())
        } else {
            Err(guard_error!(service_unavailable, "xrandr failed"))
        }
    }

    /// Мониторы, основной первым
    pub fn monitors(&self) -> Vec<Monitor> {
        let output = match Command::new("xrandr").args(["--listactivemonitors"]).output() {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                debug!(
                    "xrandr вернул ошибку: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                return Vec::new();
            }
            Err(e) => {
                debug!("xrandr не найден: {}", e);
                return Vec::new();
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut monitors: Vec<Monitor> = stdout.lines().filter_map(parse_monitor_line).collect();
        // Стабильная сортировка: основной вперёд, остальные в порядке xrandr
        monitors.sort_by_key(|m| !m.primary);
        monitors
    }
}

/// ` 0: +*eDP-1 1920/344x1080/193+0+0  eDP-1`
fn parse_monitor_line(line: &str) -> Option<Monitor> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 3 || !parts[0].ends_with(':') {
        return None;
    }

    let flags_and_name = parts[1];
    let primary = flags_and_name.contains('*');
    let name = flags_and_name.trim_start_matches(['+', '*']).to_string();

    let (w_part, rest) = parts[2].split_once('x')?;
    let width = w_part.split('/').next()?.parse::<f64>().ok()?;

    let mut fields = rest.split('+');
    let height = fields.next()?.split('/').next()?.parse::<f64>().ok()?;
    let x = fields.next()?.parse::<f64>().ok()?;
    let y = fields.next()?.parse::<f64>().ok()?;

    Some(Monitor {
        name,
        primary,
        frame: Rect::new(x, y, width, height),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_monitor_line() {
        let m = parse_monitor_line(" 0: +*eDP-1 1920/344x1080/193+0+0  eDP-1").unwrap();
        assert_eq!(m.name, "eDP-1");
        assert!(m.primary);
        assert_eq!(m.frame, Rect::new(0.0, 0.0, 1920.0, 1080.0));

        let s = parse_monitor_line(" 1: +HDMI-1 2560/597x1440/336+1920+0  HDMI-1").unwrap();
        assert_eq!(s.name, "HDMI-1");
        assert!(!s.primary);
        assert_eq!(s.frame, Rect::new(1920.0, 0.0, 2560.0, 1440.0));
    }

    #[test]
    fn test_header_line_is_skipped() {
        assert!(parse_monitor_line("Monitors: 2").is_none());
    }
}
