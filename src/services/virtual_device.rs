use crate::error::{GuardError, Result};
use crate::guard_error;
use crate::events::{MouseButton, SwipeDirection};
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uinput::event::controller::Mouse;
use uinput::event::keyboard::Key;

/// Синтезированное действие; в dry-run режиме только записывается
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticInput {
    Button { button: MouseButton, pressed: bool },
    Chord { modifier: &'static str, direction: SwipeDirection },
}

/// Виртуальная мышь + клавиатура на uinput.
///
/// Устройство разделяется между владельцем и задачами отката жеста,
/// поэтому запись идёт под мьютексом.
pub struct VirtualDevice {
    device: Option<Mutex<uinput::device::Device>>,
    device_name: String,
    dry_run: bool,
    history: Mutex<Vec<SyntheticInput>>,
}

impl VirtualDevice {
    pub fn new(device_name: &str, dry_run: bool) -> Result<Self> {
        info!("Инициализация VirtualDevice '{}' (dry_run: {})", device_name, dry_run);

        let device = if dry_run {
            None
        } else {
            Some(Mutex::new(Self::create_virtual_device(device_name)?))
        };

        Ok(Self {
            device,
            device_name: device_name.to_string(),
            dry_run,
            history: Mutex::new(Vec::new()),
        })
    }

    /// Устройство без uinput: нажатия и аккорды возвращают ошибку
    pub fn unavailable(device_name: &str) -> Self {
        warn!("uinput недоступен - '{}' не создан, клики и аккорды отключены", device_name);
        Self {
            device: None,
            device_name: device_name.to_string(),
            dry_run: false,
            history: Mutex::new(Vec::new()),
        }
    }

    fn create_virtual_device(device_name: &str) -> Result<uinput::device::Device> {
        info!("Создание виртуального устройства uinput '{}'", device_name);

        let device = uinput::default()?
            .name(device_name)?
            .event(Mouse::Left)?
            .event(Mouse::Right)?
            .event(Mouse::Middle)?
            .event(Key::LeftControl)?
            .event(Key::LeftAlt)?
            .event(Key::LeftShift)?
            .event(Key::LeftMeta)?
            .event(Key::Left)?
            .event(Key::Right)?
            .event(Key::Up)?
            .event(Key::Down)?
            .create()
            .map_err(|e| {
                GuardError::Internal(format!(
                    "Не удалось создать виртуальное устройство '{}': {}",
                    device_name, e
                ))
            })?;

        info!("Виртуальное устройство '{}' создано успешно", device_name);
        Ok(device)
    }

    /// Нажать или отпустить кнопку мыши
    pub fn press_button(&self, button: MouseButton, pressed: bool) -> Result<()> {
        if self.dry_run {
            info!("[DRY RUN] Кнопка {:?} {}", button, if pressed { "нажата" } else { "отпущена" });
            self.history.lock().push(SyntheticInput::Button { button, pressed });
            return Ok(());
        }

        let mouse = match button {
            MouseButton::Left => Mouse::Left,
            MouseButton::Right => Mouse::Right,
            MouseButton::Middle => Mouse::Middle,
        };

        let mut device = self.device()?.lock();
        device.send(mouse, i32::from(pressed))?;
        device.synchronize()?;
        debug!("Кнопка {:?} -> {}", button, pressed);
        Ok(())
    }

    /// Полный клик: нажатие и отпускание
    pub fn click(&self, button: MouseButton) -> Result<()> {
        self.press_button(button, true)?;
        self.press_button(button, false)
    }

    /// Аккорд модификатор + стрелка (переключение рабочего стола)
    pub fn chord(&self, modifier: &str, direction: SwipeDirection) -> Result<()> {
        let (modifier_name, modifier_key) = modifier_key(modifier)?;

        if self.dry_run {
            info!("[DRY RUN] Аккорд {}+{}", modifier_name, direction);
            self.history.lock().push(SyntheticInput::Chord {
                modifier: modifier_name,
                direction,
            });
            return Ok(());
        }

        let arrow = match direction {
            SwipeDirection::Left => Key::Left,
            SwipeDirection::Right => Key::Right,
            SwipeDirection::Up => Key::Up,
            SwipeDirection::Down => Key::Down,
        };

        let mut device = self.device()?.lock();
        device.send(modifier_key, 1)?;
        device.synchronize()?;
        device.send(arrow, 1)?;
        device.synchronize()?;
        device.send(arrow, 0)?;
        device.synchronize()?;
        device.send(modifier_key, 0)?;
        device.synchronize()?;
        debug!("Аккорд {}+{} отправлен", modifier_name, direction);
        Ok(())
    }

    /// Записанные действия (только dry-run)
    pub fn history(&self) -> Vec<SyntheticInput> {
        self.history.lock().clone()
    }

    fn device(&self) -> Result<&Mutex<uinput::device::Device>> {
        self.device
            .as_ref()
            .ok_or_else(|| guard_error!(internal, "Виртуальное устройство '{}' недоступно", self.device_name))
    }
}

fn modifier_key(name: &str) -> Result<(&'static str, Key)> {
    match name {
        "ctrl" => Ok(("ctrl", Key::LeftControl)),
        "alt" => Ok(("alt", Key::LeftAlt)),
        "shift" => Ok(("shift", Key::LeftShift)),
        "super" => Ok(("super", Key::LeftMeta)),
        other => Err(guard_error!(internal, "Неизвестный модификатор: {}", other)),
    }
}

impl Drop for VirtualDevice {
    fn drop(&mut self) {
        if self.device.is_some() {
            info!("Закрытие виртуального устройства '{}'", self.device_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_records_actions() {
        let device = VirtualDevice::new("test", true).unwrap();
        device.click(MouseButton::Middle).unwrap();
        device.chord("ctrl", SwipeDirection::Right).unwrap();

        assert_eq!(
            device.history(),
            vec![
                SyntheticInput::Button { button: MouseButton::Middle, pressed: true },
                SyntheticInput::Button { button: MouseButton::Middle, pressed: false },
                SyntheticInput::Chord { modifier: "ctrl", direction: SwipeDirection::Right },
            ]
        );
    }

    #[test]
    fn test_unavailable_device_rejects_input() {
        let device = VirtualDevice::unavailable("test");
        let err = device.click(MouseButton::Middle).unwrap_err();
        assert!(matches!(err, GuardError::Internal(msg) if msg.contains("test")));
        assert!(device.chord("ctrl", SwipeDirection::Left).is_err());
        assert!(device.history().is_empty());
    }

    #[test]
    fn test_unknown_modifier_is_error() {
        let device = VirtualDevice::new("test", true).unwrap();
        assert!(device.chord("hyper", SwipeDirection::Left).is_err());
        assert!(device.history().is_empty());
    }
}
