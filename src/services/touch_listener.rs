//! Мультитач-поверхность: опциональная возможность, проверяется один раз при старте.
//!
//! Слоты протокола B превращаются в число активных пальцев; на каждый
//! `SYN_REPORT` получается один `ContactFrame`. Сдвиг центра нескольких
//! пальцев даёт не больше одного дискретного свайпа на касание.

use crate::config::{Config, SwipeConfig};
use crate::error::{GuardError, Result};
use crate::events::{ContactFrame, RawInput, SwipeEvent};
use crate::services::executor::OwnerQueue;
use crate::{debug_if_enabled, trace_if_enabled};
use crate::utils::DeviceFinder;
use evdev::{AbsoluteAxisCode, Device, EventType, SynchronizationCode};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

const MAX_SLOTS: usize = 16;
/// Диапазон осей, если устройство его не сообщило
const DEFAULT_AXIS_RANGE: (i32, i32) = (0, 4096);

/// Результат однократной проверки возможности
#[derive(Debug, Clone, Default)]
pub struct TouchCapability {
    devices: Vec<PathBuf>,
}

impl TouchCapability {
    pub fn probe(config: &Config) -> Self {
        match DeviceFinder::find_touch_devices(&config.input.touch_device) {
            Ok(devices) if !devices.is_empty() => {
                info!("Мультитач доступен: {} устройств", devices.len());
                Self { devices }
            }
            Ok(_) => {
                warn!("Мультитач-устройства не найдены - распознавание касаний отключено");
                Self::default()
            }
            Err(e) => {
                warn!("Мультитач недоступен ({}) - распознавание касаний отключено", e);
                Self::default()
            }
        }
    }

    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn is_available(&self) -> bool {
        !self.devices.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SlotState {
    active: bool,
    x: i32,
    y: i32,
}

/// Начало возможного свайпа: центр пальцев при данном их числе
#[derive(Debug, Clone, Copy)]
struct SwipeOrigin {
    fingers: usize,
    centroid: (f64, f64),
}

/// Отслеживание активных tracking id и позиций по слотам
#[derive(Debug)]
pub struct ContactTracker {
    slots: [SlotState; MAX_SLOTS],
    current_slot: usize,
    frame_id: u64,
    x_range: (i32, i32),
    y_range: (i32, i32),
    swipe_fingers: usize,
    swipe_distance: f64,
    origin: Option<SwipeOrigin>,
    /// Свайп уже отдан в этом касании
    swiped: bool,
}

impl ContactTracker {
    pub fn new(config: &SwipeConfig) -> Self {
        Self {
            slots: [SlotState::default(); MAX_SLOTS],
            current_slot: 0,
            frame_id: 0,
            x_range: DEFAULT_AXIS_RANGE,
            y_range: DEFAULT_AXIS_RANGE,
            swipe_fingers: config.touch_fingers,
            swipe_distance: config.touch_distance,
            origin: None,
            swiped: false,
        }
    }

    /// Диапазоны осей устройства для нормализации позиций
    pub fn set_ranges(&mut self, x: (i32, i32), y: (i32, i32)) {
        self.x_range = (x.0, x.1.max(x.0 + 1));
        self.y_range = (y.0, y.1.max(y.0 + 1));
    }

    pub fn on_slot(&mut self, slot: i32) {
        self.current_slot = usize::try_from(slot).unwrap_or(0).min(MAX_SLOTS - 1);
    }

    /// -1 освобождает слот, любое другое значение занимает его
    pub fn on_tracking_id(&mut self, id: i32) {
        self.slots[self.current_slot].active = id >= 0;
    }

    pub fn on_position_x(&mut self, x: i32) {
        self.slots[self.current_slot].x = x;
    }

    pub fn on_position_y(&mut self, y: i32) {
        self.slots[self.current_slot].y = y;
    }

    pub fn finger_count(&self) -> usize {
        self.slots.iter().filter(|s| s.active).count()
    }

    pub fn on_syn_report(&mut self, timestamp: f64) -> ContactFrame {
        self.frame_id += 1;
        ContactFrame::new(self.finger_count(), timestamp, self.frame_id)
    }

    /// Проверить свайп после `on_syn_report`. Знаки как у системных
    /// свайпов: пальцы влево -> `delta_x = 1`, пальцы вверх -> `delta_y = 1`.
    pub fn take_swipe(&mut self) -> Option<SwipeEvent> {
        let fingers = self.finger_count();
        if fingers == 0 {
            self.origin = None;
            self.swiped = false;
            return None;
        }
        if fingers < self.swipe_fingers || self.swiped {
            self.origin = None;
            return None;
        }

        let centroid = self.centroid()?;
        // Смена числа пальцев сдвигает центр: начинаем отсчёт заново
        let origin = match self.origin {
            Some(origin) if origin.fingers == fingers => origin,
            _ => {
                self.origin = Some(SwipeOrigin { fingers, centroid });
                return None;
            }
        };

        let dx = centroid.0 - origin.centroid.0;
        let dy = centroid.1 - origin.centroid.1;
        let (ax, ay) = (dx.abs(), dy.abs());
        let event = if ax >= ay && ax >= self.swipe_distance {
            SwipeEvent {
                delta_x: if dx > 0.0 { -1.0 } else { 1.0 },
                delta_y: 0.0,
            }
        } else if ay > ax && ay >= self.swipe_distance {
            SwipeEvent {
                delta_x: 0.0,
                delta_y: if dy > 0.0 { -1.0 } else { 1.0 },
            }
        } else {
            return None;
        };

        self.swiped = true;
        self.origin = None;
        debug_if_enabled!("Свайп {} пальцами: dx={:.3} dy={:.3}", fingers, dx, dy);
        Some(event)
    }

    /// Центр активных пальцев в долях поверхности
    fn centroid(&self) -> Option<(f64, f64)> {
        let (mut sum_x, mut sum_y, mut n) = (0.0, 0.0, 0usize);
        for slot in self.slots.iter().filter(|s| s.active) {
            sum_x += normalize(slot.x, self.x_range);
            sum_y += normalize(slot.y, self.y_range);
            n += 1;
        }
        (n > 0).then(|| (sum_x / n as f64, sum_y / n as f64))
    }
}

fn normalize(value: i32, (min, max): (i32, i32)) -> f64 {
    f64::from(value - min) / f64::from(max - min)
}

pub struct TouchListener {
    queue: OwnerQueue,
    devices: Vec<(Device, ContactTracker)>,
}

impl TouchListener {
    pub fn new(capability: &TouchCapability, config: &Config, queue: OwnerQueue) -> Result<Self> {
        let mut devices = Vec::new();
        for path in &capability.devices {
            match Device::open(path) {
                Ok(mut device) => {
                    device.set_nonblocking(true)?;
                    info!("Слушаем касания: {} ({:?})", device.name().unwrap_or("Unknown"), path);
                    let mut tracker = ContactTracker::new(&config.swipe);
                    if let Some((x, y)) = position_ranges(&device) {
                        tracker.set_ranges(x, y);
                    }
                    devices.push((device, tracker));
                }
                Err(e) => warn!("Не удалось открыть {:?}: {}", path, e),
            }
        }
        if devices.is_empty() {
            return Err(GuardError::ServiceUnavailable(
                "ни одно мультитач-устройство не открылось".to_string(),
            ));
        }
        Ok(Self { queue, devices })
    }

    pub async fn run(mut self) -> Result<()> {
        info!("TouchListener запущен");
        // Кадры без изменения числа пальцев владельцу не нужны
        let mut last_posted: Vec<Option<usize>> = vec![None; self.devices.len()];

        while !self.queue.is_closed() {
            for ((device, tracker), last) in self.devices.iter_mut().zip(last_posted.iter_mut()) {
                let events = match device.fetch_events() {
                    Ok(events) => events.collect::<Vec<_>>(),
                    Err(e) if e.kind() == ErrorKind::WouldBlock => continue,
                    Err(e) => {
                        error!("Ошибка чтения касаний: {}", e);
                        sleep(Duration::from_millis(100)).await;
                        continue;
                    }
                };

                for event in events {
                    match event.event_type() {
                        EventType::ABSOLUTE if event.code() == AbsoluteAxisCode::ABS_MT_SLOT.0 => {
                            tracker.on_slot(event.value())
                        }
                        EventType::ABSOLUTE if event.code() == AbsoluteAxisCode::ABS_MT_TRACKING_ID.0 => {
                            tracker.on_tracking_id(event.value())
                        }
                        EventType::ABSOLUTE if event.code() == AbsoluteAxisCode::ABS_MT_POSITION_X.0 => {
                            tracker.on_position_x(event.value())
                        }
                        EventType::ABSOLUTE if event.code() == AbsoluteAxisCode::ABS_MT_POSITION_Y.0 => {
                            tracker.on_position_y(event.value())
                        }
                        EventType::SYNCHRONIZATION if event.code() == SynchronizationCode::SYN_REPORT.0 => {
                            let frame = tracker.on_syn_report(seconds_since_epoch(event.timestamp()));
                            if *last != Some(frame.finger_count) {
                                *last = Some(frame.finger_count);
                                trace_if_enabled!("Кадр касания {}", frame);
                                self.queue.input(RawInput::Contact(frame));
                            }
                            if let Some(swipe) = tracker.take_swipe() {
                                self.queue.input(RawInput::Swipe(swipe));
                            }
                        }
                        _ => {}
                    }
                }
            }

            sleep(Duration::from_millis(2)).await;
        }

        info!("Очередь владельца закрыта - TouchListener остановлен");
        Ok(())
    }
}

/// Диапазоны ABS_MT_POSITION_X/Y, если устройство их сообщает
fn position_ranges(device: &Device) -> Option<((i32, i32), (i32, i32))> {
    let mut x = None;
    let mut y = None;
    for (axis, info) in device.get_absinfo().ok()? {
        if axis == AbsoluteAxisCode::ABS_MT_POSITION_X {
            x = Some((info.minimum(), info.maximum()));
        } else if axis == AbsoluteAxisCode::ABS_MT_POSITION_Y {
            y = Some((info.minimum(), info.maximum()));
        }
    }
    Some((x?, y?))
}

/// 0.0 при невалидной метке: распознаватель возьмёт своё время
pub(crate) fn seconds_since_epoch(timestamp: SystemTime) -> f64 {
    timestamp
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
