use crate::error::{GuardError, Result};
use evdev::{AbsoluteAxisCode, Device, EventType, KeyCode, RelativeAxisCode};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Роль устройства ввода по его возможностям
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Keyboard,
    Pointer,
    Touch,
}

/// Сжатое описание возможностей evdev-устройства
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub name: String,
    pub basic_keys: bool,
    pub key_count: usize,
    pub relative_xy: bool,
    pub left_button: bool,
    pub multitouch: bool,
}

impl Capabilities {
    pub fn from_device(device: &Device) -> Self {
        let keys = device.supported_keys();
        let basic_keys = keys.map_or(false, |k| {
            k.contains(KeyCode::KEY_A) && k.contains(KeyCode::KEY_SPACE) && k.contains(KeyCode::KEY_ENTER)
        });
        let key_count = keys.map_or(0, |k| k.iter().count());
        let left_button = keys.map_or(false, |k| k.contains(KeyCode::BTN_LEFT));

        let relative_xy = device.supported_relative_axes().map_or(false, |a| {
            a.contains(RelativeAxisCode::REL_X) && a.contains(RelativeAxisCode::REL_Y)
        });

        let has_abs = device.supported_events().contains(EventType::ABSOLUTE);
        let multitouch = has_abs
            && device.supported_absolute_axes().map_or(false, |a| {
                a.contains(AbsoluteAxisCode::ABS_MT_SLOT)
                    && a.contains(AbsoluteAxisCode::ABS_MT_POSITION_X)
                    && a.contains(AbsoluteAxisCode::ABS_MT_POSITION_Y)
            });

        Self {
            name: device.name().unwrap_or("Unknown").to_string(),
            basic_keys,
            key_count,
            relative_xy,
            left_button,
            multitouch,
        }
    }

    /// Все роли, которые устройство может исполнять
    pub fn kinds(&self) -> Vec<DeviceKind> {
        let mut kinds = Vec::new();
        let lowered = self.name.to_lowercase();
        let mouse_like = lowered.contains("mouse") || lowered.contains("touchpad") || lowered.contains("trackpoint");

        // У настоящей клавиатуры много клавиш
        if self.basic_keys && self.key_count > 20 && !mouse_like {
            kinds.push(DeviceKind::Keyboard);
        }
        if self.left_button && (self.relative_xy || self.multitouch) {
            kinds.push(DeviceKind::Pointer);
        }
        if self.multitouch {
            kinds.push(DeviceKind::Touch);
        }
        kinds
    }

    pub fn is(&self, kind: DeviceKind) -> bool {
        self.kinds().contains(&kind)
    }
}

pub struct DeviceFinder;

impl DeviceFinder {
    /// Клавиатура: явный путь или первое подходящее устройство
    pub fn find_keyboard_device(device_path: &str) -> Result<PathBuf> {
        Self::find_devices(device_path, DeviceKind::Keyboard)?
            .into_iter()
            .next()
            .map_or_else(
                || GuardError::device_not_found("Клавиатурное устройство не найдено"),
                Ok,
            )
    }

    /// Все мыши и тачпады (или один явно указанный путь)
    pub fn find_pointer_devices(device_path: &str) -> Result<Vec<PathBuf>> {
        let found = Self::find_devices(device_path, DeviceKind::Pointer)?;
        if found.is_empty() {
            return GuardError::device_not_found(
                "Не найдено ни одной мыши или тачпада. \
                 Убедитесь, что пользователь добавлен в группу 'input'",
            );
        }
        Ok(found)
    }

    /// Мультитач-поверхности; пустой список - возможность недоступна
    pub fn find_touch_devices(device_path: &str) -> Result<Vec<PathBuf>> {
        Self::find_devices(device_path, DeviceKind::Touch)
    }

    fn find_devices(device_path: &str, kind: DeviceKind) -> Result<Vec<PathBuf>> {
        if device_path != "auto" {
            let path = PathBuf::from(device_path);
            return if path.exists() {
                info!("Используется указанное устройство {:?}: {:?}", kind, path);
                Ok(vec![path])
            } else {
                GuardError::device_not_found(format!("Указанное устройство не найдено: {:?}", path))
            };
        }

        let mut found = Vec::new();
        for path in Self::event_devices()? {
            match Device::open(&path) {
                Ok(device) => {
                    let caps = Capabilities::from_device(&device);
                    if caps.is(kind) {
                        info!("Найдено устройство {:?}: {} ({:?})", kind, caps.name, path);
                        found.push(path);
                    } else {
                        debug!("Устройство {:?} не подходит как {:?}", path, kind);
                    }
                }
                Err(e) => debug!("Не удалось открыть устройство {:?}: {}", path, e),
            }
        }
        Ok(found)
    }

    fn event_devices() -> Result<Vec<PathBuf>> {
        let input_dir = Path::new("/dev/input");
        let entries = fs::read_dir(input_dir).map_err(|e| {
            GuardError::Permission(format!("Нет доступа к {}: {}", input_dir.display(), e))
        })?;

        let mut devices: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| n.starts_with("event"))
            })
            .collect();
        devices.sort();
        Ok(devices)
    }
}
