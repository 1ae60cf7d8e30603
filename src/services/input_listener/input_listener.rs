use crate::config::Config;
use crate::error::{GuardError, Result};
use crate::events::{CursorSample, MouseButton, RawInput, ScrollEvent};
use crate::services::executor::OwnerQueue;
use crate::services::window_geometry::GeometryBackend;
use crate::trace_if_enabled;
use crate::utils::DeviceFinder;
use evdev::{AbsoluteAxisCode, Device, EventType, KeyCode, RelativeAxisCode};
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tokio::time::{sleep, Duration, Instant};
use tracing::{error, info, warn};

use super::modifier_state::ModifierState;
use super::r#trait::InputListenerTrait;

/// Перевод событий evdev в `RawInput`. Движение только взводит флаг:
/// позицию курсора спрашиваем у геометрии не чаще раза в `pointer_poll_ms`.
#[derive(Debug, Default)]
pub(super) struct EventTranslator {
    modifiers: ModifierState,
    moved: bool,
}

impl EventTranslator {
    pub(super) fn translate(&mut self, event_type: EventType, code: u16, value: i32) -> Option<RawInput> {
        match event_type {
            EventType::KEY => {
                let button = match code {
                    c if c == KeyCode::BTN_LEFT.0 => Some(MouseButton::Left),
                    c if c == KeyCode::BTN_RIGHT.0 => Some(MouseButton::Right),
                    c if c == KeyCode::BTN_MIDDLE.0 => Some(MouseButton::Middle),
                    _ => None,
                };
                match button {
                    Some(button) if value == 1 => Some(RawInput::Click(button)),
                    Some(_) => None,
                    None => {
                        self.modifiers.update_key(KeyCode::new(code), value);
                        None
                    }
                }
            }
            EventType::RELATIVE => {
                let modifiers = self.modifiers.to_modifiers();
                match code {
                    c if c == RelativeAxisCode::REL_WHEEL.0 => {
                        Some(RawInput::Scroll(ScrollEvent::vertical(value as f64, modifiers)))
                    }
                    c if c == RelativeAxisCode::REL_HWHEEL.0 => {
                        Some(RawInput::Scroll(ScrollEvent::horizontal(value as f64, modifiers)))
                    }
                    c if c == RelativeAxisCode::REL_X.0 || c == RelativeAxisCode::REL_Y.0 => {
                        self.moved = true;
                        None
                    }
                    _ => None,
                }
            }
            EventType::ABSOLUTE => {
                let position_axes = [
                    AbsoluteAxisCode::ABS_X.0,
                    AbsoluteAxisCode::ABS_Y.0,
                    AbsoluteAxisCode::ABS_MT_POSITION_X.0,
                    AbsoluteAxisCode::ABS_MT_POSITION_Y.0,
                ];
                if position_axes.contains(&code) {
                    self.moved = true;
                }
                None
            }
            _ => None,
        }
    }

    pub(super) fn take_moved(&mut self) -> bool {
        std::mem::take(&mut self.moved)
    }

    pub(super) fn moved(&self) -> bool {
        self.moved
    }
}

pub struct RealInputListener {
    geometry: Arc<dyn GeometryBackend>,
    queue: OwnerQueue,
    pointers: Vec<Device>,
    keyboard: Option<Device>,
    translator: EventTranslator,
    pointer_poll: Duration,
}

impl RealInputListener {
    pub fn new(config: Arc<Config>, geometry: Arc<dyn GeometryBackend>, queue: OwnerQueue) -> Result<Self> {
        info!("Инициализация RealInputListener");

        let mut pointers = Vec::new();
        for path in DeviceFinder::find_pointer_devices(&config.input.pointer_device)? {
            match Self::open_device(&path) {
                Ok(device) => pointers.push(device),
                Err(e) => warn!("{}", e),
            }
        }
        if pointers.is_empty() {
            return GuardError::device_not_found("Не удалось открыть ни одно указательное устройство");
        }

        // Без клавиатуры работает всё, кроме свайпов с модификатором
        let keyboard = match DeviceFinder::find_keyboard_device(&config.input.keyboard_device)
            .and_then(|path| Self::open_device(&path))
        {
            Ok(device) => Some(device),
            Err(e) => {
                warn!("Клавиатура недоступна, модификаторы не отслеживаются: {}", e);
                None
            }
        };

        Ok(Self {
            geometry,
            queue,
            pointers,
            keyboard,
            translator: EventTranslator::default(),
            pointer_poll: Duration::from_millis(config.backend.pointer_poll_ms),
        })
    }

    fn open_device(path: &Path) -> Result<Device> {
        let mut device = Device::open(path).map_err(|e| {
            GuardError::DeviceNotFound(format!("Не удалось открыть устройство {:?}: {}", path, e))
        })?;
        device.set_nonblocking(true)?;
        info!("Слушаем устройство {} ({:?}) без захвата", device.name().unwrap_or("Unknown"), path);
        Ok(device)
    }

    async fn run_impl(mut self) -> Result<()> {
        info!(
            "RealInputListener запущен: {} указательных устройств, клавиатура: {}",
            self.pointers.len(),
            self.keyboard.is_some()
        );

        let mut batch: Vec<(EventType, u16, i32)> = Vec::with_capacity(64);
        let mut last_query: Option<Instant> = None;

        while !self.queue.is_closed() {
            batch.clear();
            for device in self.keyboard.iter_mut().chain(self.pointers.iter_mut()) {
                match device.fetch_events() {
                    Ok(events) => {
                        batch.extend(events.map(|e| (e.event_type(), e.code(), e.value())));
                    }
                    Err(e) if e.kind() == ErrorKind::WouldBlock => {}
                    Err(e) => {
                        error!("Ошибка чтения событий: {}", e);
                        sleep(Duration::from_millis(100)).await;
                    }
                }
            }

            for (event_type, code, value) in batch.drain(..) {
                if let Some(input) = self.translator.translate(event_type, code, value) {
                    self.queue.input(input);
                }
            }

            let due = last_query.map_or(true, |t| t.elapsed() >= self.pointer_poll);
            if self.translator.moved() && due {
                self.translator.take_moved();
                last_query = Some(Instant::now());
                // Запрос к X11 блокирующий: выносим с рабочих потоков tokio
                let geometry = Arc::clone(&self.geometry);
                let position = tokio::task::spawn_blocking(move || geometry.cursor_location())
                    .await
                    .ok()
                    .flatten();
                if let Some(position) = position {
                    trace_if_enabled!("Курсор: {}", position);
                    self.queue.input(RawInput::PointerMoved(CursorSample::new(position)));
                }
            }

            // Небольшая задержка для предотвращения 100% загрузки CPU
            sleep(Duration::from_millis(2)).await;
        }

        info!("Очередь владельца закрыта - RealInputListener остановлен");
        Ok(())
    }
}

#[async_trait::async_trait]
impl InputListenerTrait for RealInputListener {
    async fn run(self: Box<Self>) -> Result<()> {
        (*self).run_impl().await
    }
}
