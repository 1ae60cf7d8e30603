use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub features: FeatureFlags,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub focus: FocusConfig,
    #[serde(default)]
    pub indicator: IndicatorConfig,
    #[serde(default)]
    pub swipe: SwipeConfig,
    #[serde(default)]
    pub tap: TapConfig,
    #[serde(default)]
    pub relocator: RelocatorConfig,
    // Нормализованный allow-list - не сериализуется, строится после загрузки
    #[serde(skip)]
    allow_list_lower: HashSet<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Директивы EnvFilter; непустой фильтр важнее `level`
    pub filter: String,
}

/// Флаги функций. Единственное сохраняемое состояние, которое читает ядро;
/// пишет их слой настроек.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub overlay: bool,
    pub swipe: bool,
    pub middle_click: bool,
    pub app_launch: bool,
    pub launch_command: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    pub mode: String,
    pub pointer_poll_ms: u64,
    pub space_poll_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InputConfig {
    pub pointer_device: String,
    pub keyboard_device: String,
    pub touch_device: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FocusConfig {
    pub throttle_ms: u64,
    pub frame_outset: f64,
    pub click_defer_ms: u64,
    pub allow_list: Vec<String>,
    pub launcher_process: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub size: f64,
    pub locked_offset: [f64; 2],
    pub unlocked_offset: [f64; 2],
    pub fade_ms: u64,
    pub unlock_hold_ms: u64,
    pub relock_after_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SwipeConfig {
    pub accelerator: String,
    pub threshold: f64,
    pub debounce_ms: u64,
    pub target: String,
    /// Сколько пальцев на мультитач-поверхности дают свайп
    pub touch_fingers: usize,
    /// Сдвиг центра пальцев в долях размера поверхности
    pub touch_distance: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TapConfig {
    pub finger_count: usize,
    pub max_tap_ms: u64,
    pub double_tap_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelocatorConfig {
    pub press_hold_ms: u64,
    pub settle_ms: u64,
    pub switch_modifier: String,
    pub grab_offset: f64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            filter: String::new(),
        }
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            overlay: true,
            swipe: true,
            middle_click: false,
            app_launch: false,
            launch_command: Vec::new(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            mode: "x11".to_string(),
            pointer_poll_ms: 16,
            space_poll_ms: 250,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            pointer_device: "auto".to_string(),
            keyboard_device: "auto".to_string(),
            touch_device: "auto".to_string(),
        }
    }
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            throttle_ms: 50,
            frame_outset: 5.0,
            click_defer_ms: 500,
            // Файловый менеджер, тайлинг, центр уведомлений, панель управления, док
            allow_list: [
                "nautilus",
                "dolphin",
                "thunar",
                "nemo",
                "kwin_x11",
                "kwin_wayland",
                "mutter",
                "swaync",
                "dunst",
                "xfce4-notifyd",
                "gnome-control-center",
                "systemsettings",
                "plank",
                "latte-dock",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            launcher_process: "plasmashell".to_string(),
        }
    }
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            size: 20.0,
            locked_offset: [3.0, -6.0],
            unlocked_offset: [5.0, -6.0],
            fade_ms: 200,
            unlock_hold_ms: 150,
            relock_after_ms: 150,
        }
    }
}

impl Default for SwipeConfig {
    fn default() -> Self {
        Self {
            accelerator: "super".to_string(),
            threshold: 0.5,
            debounce_ms: 1000,
            target: "space".to_string(),
            touch_fingers: 3,
            touch_distance: 0.15,
        }
    }
}

impl SwipeConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            finger_count: 3,
            max_tap_ms: 350,
            double_tap_ms: 300,
        }
    }
}

impl Default for RelocatorConfig {
    fn default() -> Self {
        Self {
            press_hold_ms: 50,
            settle_ms: 600,
            switch_modifier: "ctrl".to_string(),
            grab_offset: 10.0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut config = Self {
            logging: LoggingConfig::default(),
            features: FeatureFlags::default(),
            backend: BackendConfig::default(),
            input: InputConfig::default(),
            focus: FocusConfig::default(),
            indicator: IndicatorConfig::default(),
            swipe: SwipeConfig::default(),
            tap: TapConfig::default(),
            relocator: RelocatorConfig::default(),
            allow_list_lower: HashSet::new(),
        };
        config.build_optimization_indexes();
        config
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::new()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("FOCUSGUARD_").split("__"));

        let mut config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;
        config.build_optimization_indexes();

        Ok(config)
    }

    /// Строит индексы для быстрого поиска на горячем пути
    pub fn build_optimization_indexes(&mut self) {
        self.allow_list_lower = self
            .focus
            .allow_list
            .iter()
            .map(|name| name.to_lowercase())
            .collect();
    }

    pub fn validate(&self) -> Result<()> {
        // Валидация настроек логирования
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.backend.mode.as_str() {
            "x11" | "dry" => {}
            _ => anyhow::bail!("Неверный режим бэкенда: {}", self.backend.mode),
        }

        if self.backend.space_poll_ms < 50 {
            anyhow::bail!("space_poll_ms должно быть минимум 50");
        }

        if self.focus.throttle_ms == 0 {
            anyhow::bail!("throttle_ms должно быть больше 0");
        }

        if self.focus.frame_outset < 0.0 {
            anyhow::bail!("frame_outset не может быть отрицательным");
        }

        if self.indicator.size <= 0.0 {
            anyhow::bail!("Размер индикатора должен быть больше 0");
        }

        for (name, modifier) in [
            ("swipe.accelerator", &self.swipe.accelerator),
            ("relocator.switch_modifier", &self.relocator.switch_modifier),
        ] {
            match modifier.as_str() {
                "ctrl" | "alt" | "shift" | "super" => {}
                _ => anyhow::bail!("Неверный модификатор '{}' в {}", modifier, name),
            }
        }

        if self.swipe.threshold < 0.0 {
            anyhow::bail!("Порог свайпа не может быть отрицательным");
        }

        match self.swipe.target.as_str() {
            "space" | "display" => {}
            _ => anyhow::bail!("Неверная цель свайпа: {}", self.swipe.target),
        }

        if self.swipe.touch_fingers < 2 {
            anyhow::bail!("touch_fingers должно быть минимум 2");
        }

        if !(self.swipe.touch_distance > 0.0 && self.swipe.touch_distance < 1.0) {
            anyhow::bail!("touch_distance задаётся в долях поверхности (0, 1)");
        }

        if self.tap.finger_count < 2 {
            anyhow::bail!("finger_count должно быть минимум 2");
        }

        if self.tap.max_tap_ms == 0 || self.tap.double_tap_ms == 0 {
            anyhow::bail!("Интервалы касаний должны быть больше 0");
        }

        if self.features.app_launch && self.features.launch_command.is_empty() {
            anyhow::bail!("app_launch включён, но launch_command пуст");
        }

        Ok(())
    }

    /// Процесс из allow-list (сравнение без учёта регистра)
    pub fn is_allow_listed(&self, process_name: &str) -> bool {
        self.allow_list_lower.contains(&process_name.to_lowercase())
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.focus.throttle_ms)
    }

    pub fn click_defer(&self) -> Duration {
        Duration::from_millis(self.focus.click_defer_ms)
    }

    /// Директивы для EnvFilter, если уровень не задан в командной строке
    pub fn log_directives(&self) -> &str {
        if self.logging.filter.is_empty() {
            &self.logging.level
        } else {
            &self.logging.filter
        }
    }

    /// Двойное касание имеет обработчик только при заданной команде запуска
    pub fn has_double_tap_handler(&self) -> bool {
        self.features.app_launch && !self.features.launch_command.is_empty()
    }

    /// Нужен ли распознаватель касаний вообще
    pub fn tap_features_enabled(&self) -> bool {
        self.features.middle_click || self.has_double_tap_handler()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_timings() {
        let config = Config::default();
        assert_eq!(config.throttle(), Duration::from_millis(50));
        assert_eq!(config.click_defer(), Duration::from_millis(500));
        assert_eq!(config.swipe.debounce(), Duration::from_secs(1));
        assert_eq!(config.tap.max_tap_ms, 350);
        assert_eq!(config.tap.double_tap_ms, 300);
        assert_eq!(config.focus.frame_outset, 5.0);
    }

    #[test]
    fn test_log_directives_prefer_filter() {
        let mut config = Config::default();
        assert_eq!(config.log_directives(), "info");

        config.logging.level = "debug".to_string();
        assert_eq!(config.log_directives(), "debug");

        config.logging.filter = "focusguard=trace,warn".to_string();
        assert_eq!(config.log_directives(), "focusguard=trace,warn");

        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_touch_swipe_bounds() {
        let mut config = Config::default();
        config.swipe.touch_distance = 1.5;
        assert!(config.validate().is_err());

        config.swipe.touch_distance = 0.2;
        config.swipe.touch_fingers = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_allow_list_is_case_insensitive() {
        let mut config = Config::default();
        config.focus.allow_list = vec!["Nautilus".to_string()];
        config.build_optimization_indexes();

        assert!(config.is_allow_listed("nautilus"));
        assert!(config.is_allow_listed("NAUTILUS"));
        assert!(!config.is_allow_listed("firefox"));
    }

    #[test]
    fn test_invalid_modifier_rejected() {
        let mut config = Config::default();
        config.swipe.accelerator = "hyper".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_app_launch_requires_command() {
        let mut config = Config::default();
        config.features.app_launch = true;
        assert!(config.validate().is_err());
        assert!(!config.has_double_tap_handler());

        config.features.launch_command = vec!["firefox".to_string()];
        assert!(config.validate().is_ok());
        assert!(config.has_double_tap_handler());
        assert!(config.tap_features_enabled());
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let path = std::env::temp_dir().join(format!(
            "focusguard-config-test-{}.toml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            "[features]\noverlay = false\n\n[swipe]\ntarget = \"display\"\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert!(!config.features.overlay);
        assert!(config.features.swipe);
        assert_eq!(config.swipe.target, "display");
        assert_eq!(config.swipe.threshold, 0.5);
        assert!(config.is_allow_listed("dolphin"));
    }
}
