//! Controller: единственный владелец состояния распознавателей, индикатора
//! и дебаунса.
//!
//! Все события приходят через очередь владельца: ввод от слушателей, таймеры,
//! suspend/resume и остановка. Здесь же связываются намерения с действиями:
//! вердикт -> индикатор, свайп -> перенос окна, касание -> средний клик или
//! запуск приложения.

use crate::config::Config;
use crate::debug_if_enabled;
use crate::error::Result;
use crate::events::{
    ContactFrame, CursorSample, FocusVerdict, MouseButton, Point, RawInput, SwipeDirection,
};
use crate::services::executor::{OwnerEvent, OwnerQueue, ScheduledTask, TimerEvent};
use crate::services::focus_engine::FocusSafetyEngine;
use crate::services::indicator::{IndicatorSurface, SafetyIndicator};
use crate::services::relocator::{Relocation, WindowRelocator};
use crate::services::swipe::SwipeRecognizer;
use crate::services::tap::{TapAction, TapRecognizer};
use crate::services::touch_listener::seconds_since_epoch;
use crate::services::window_geometry::GeometryBackend;
use crate::services::VirtualDevice;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tokio::process::Command;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Duration;
use tracing::{error, info, warn};

/// Задержки повторной проверки после смены рабочего стола
const RESYNC_DELAYS_MS: [u64; 3] = [100, 500, 800];

pub struct Controller {
    config: Arc<Config>,
    geometry: Arc<dyn GeometryBackend>,
    device: Arc<VirtualDevice>,
    queue: OwnerQueue,
    engine: FocusSafetyEngine,
    indicator: SafetyIndicator,
    swipe: SwipeRecognizer,
    relocator: WindowRelocator,
    /// `None`, если мультитач не обнаружен при старте
    tap: Option<TapRecognizer>,
    click_sequence: Option<u64>,
    pending_single: Option<(u64, ScheduledTask)>,
    last_cursor: Option<Point>,
    suspended: bool,
    dry_run: bool,
    launches: usize,
}

impl Controller {
    pub fn new(
        config: Arc<Config>,
        geometry: Arc<dyn GeometryBackend>,
        device: Arc<VirtualDevice>,
        queue: OwnerQueue,
        surface: Box<dyn IndicatorSurface>,
        touch_available: bool,
        dry_run: bool,
    ) -> Self {
        let trusted = geometry.probe();
        if !trusted {
            warn!("Геометрия окон недоступна - индикатор не будет показываться");
        }

        let tap = touch_available
            .then(|| TapRecognizer::new(&config.tap, config.has_double_tap_handler()));

        Self {
            engine: FocusSafetyEngine::new(Arc::clone(&config), Arc::clone(&geometry), trusted),
            indicator: SafetyIndicator::new(&config.indicator, surface, queue.clone()),
            swipe: SwipeRecognizer::new(&config.swipe),
            relocator: WindowRelocator::new(
                Arc::clone(&config),
                Arc::clone(&geometry),
                Arc::clone(&device),
            ),
            tap,
            config,
            geometry,
            device,
            queue,
            click_sequence: None,
            pending_single: None,
            last_cursor: None,
            suspended: false,
            dry_run,
            launches: 0,
        }
    }

    pub fn indicator(&self) -> &SafetyIndicator {
        &self.indicator
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Сколько раз сработал запуск приложения
    pub fn launches(&self) -> usize {
        self.launches
    }

    pub async fn run(mut self, mut rx: UnboundedReceiver<OwnerEvent>) -> Result<()> {
        info!(
            "Controller запущен (overlay: {}, swipe: {}, касания: {})",
            self.config.features.overlay,
            self.config.features.swipe,
            self.tap.is_some()
        );

        while let Some(event) = rx.recv().await {
            if !self.handle(event) {
                break;
            }
        }

        self.indicator.hide(false);
        self.cancel_pending_single();
        info!("Controller остановлен");
        Ok(())
    }

    /// Обработать одно событие очереди. `false` - пора остановиться.
    pub fn handle(&mut self, event: OwnerEvent) -> bool {
        match event {
            OwnerEvent::Input(input) => self.on_input(input),
            OwnerEvent::Timer(timer) => self.on_timer(timer),
            OwnerEvent::Suspend => self.suspend(),
            OwnerEvent::Resume => self.resume(),
            OwnerEvent::Shutdown => {
                info!("Получена команда остановки");
                return false;
            }
        }
        true
    }

    fn on_input(&mut self, input: RawInput) {
        if self.suspended {
            return;
        }

        match input {
            RawInput::PointerMoved(sample) => self.on_pointer_moved(sample),
            RawInput::Click(button) => self.on_click(button),
            RawInput::Scroll(event) => {
                if self.config.features.swipe {
                    if let Some(direction) = self.swipe.on_scroll(&event, now()) {
                        self.on_swipe_intent(direction);
                    }
                }
            }
            RawInput::Swipe(event) => {
                // Свайп по мультитачу не должен закончиться ещё и касанием
                if let Some(tap) = self.tap.as_mut() {
                    tap.abandon_sequence();
                }
                if self.config.features.swipe {
                    if let Some(direction) = self.swipe.on_swipe(&event, now()) {
                        self.on_swipe_intent(direction);
                    }
                }
            }
            RawInput::Contact(frame) => self.on_contact(&frame),
            RawInput::SpaceChanged => self.on_space_changed(),
        }
    }

    fn on_timer(&mut self, timer: TimerEvent) {
        match timer {
            TimerEvent::FadeFinished(id) => self.indicator.on_fade_finished(id),
            TimerEvent::ClickFade(id) if self.click_sequence == Some(id) => {
                self.indicator.hide(true);
            }
            TimerEvent::ClickRelock(id) if self.click_sequence == Some(id) => {
                self.click_sequence = None;
                self.indicator.set_locked(true);
            }
            TimerEvent::ClickFade(id) | TimerEvent::ClickRelock(id) => {
                debug_if_enabled!("Устаревший таймер клика #{}", id);
            }
            TimerEvent::Resync(delay) => self.resync(delay),
            TimerEvent::SingleTap(id) => match self.pending_single.take() {
                Some((pending, _)) if pending == id => self.fire_single_tap(),
                other => {
                    self.pending_single = other;
                    debug_if_enabled!("Устаревшее одиночное касание #{}", id);
                }
            },
        }
    }

    fn on_pointer_moved(&mut self, sample: CursorSample) {
        self.last_cursor = Some(sample.position);
        if !self.config.features.overlay {
            return;
        }

        self.indicator.update_position(sample.position);
        if let Some(verdict) = self.engine.evaluate(&sample, now()) {
            self.apply_verdict(verdict);
        }
    }

    fn apply_verdict(&mut self, verdict: FocusVerdict) {
        if verdict.show {
            if !self.indicator.is_visible() || self.indicator.is_fading() {
                // Новый показ всегда под замком; старая последовательность клика закончена
                self.click_sequence = None;
                self.indicator.set_locked(true);
                self.indicator.show();
            }
        } else {
            self.indicator.hide(true);
        }
    }

    /// Клик при видимом индикаторе: открыть замок, погасить, вернуть замок
    fn on_click(&mut self, button: MouseButton) {
        if !button.is_primary_or_secondary() || !self.indicator.is_visible() {
            return;
        }

        let indicator = &self.config.indicator;
        let hold = Duration::from_millis(indicator.unlock_hold_ms);
        let relock = hold + Duration::from_millis(indicator.relock_after_ms);

        self.indicator.set_locked(false);
        self.engine.defer(now(), self.config.click_defer());

        let id = self.queue.next_id();
        self.click_sequence = Some(id);
        // Таймеры не отменяются: устаревшие отсекаются по номеру
        let _ = self.queue.schedule(hold, TimerEvent::ClickFade(id));
        let _ = self.queue.schedule(relock, TimerEvent::ClickRelock(id));
        debug_if_enabled!("Клик {:?}: индикатор разблокирован (#{})", button, id);
    }

    fn on_swipe_intent(&mut self, direction: SwipeDirection) {
        info!("Свайп {}", direction);
        match self.relocator.relocate(direction) {
            Relocation::Direct { window, space } => {
                debug_if_enabled!("{} перенесено на стол {}", window, space)
            }
            Relocation::Fallback(_) => debug_if_enabled!("Перенос продолжается жестом"),
            Relocation::Display { window, frame } => {
                debug_if_enabled!("{} перенесено на монитор: {}", window, frame)
            }
            Relocation::Skipped(reason) => debug_if_enabled!("Перенос пропущен: {}", reason),
        }
    }

    fn on_contact(&mut self, frame: &ContactFrame) {
        if !self.config.tap_features_enabled() {
            return;
        }
        let Some(tap) = self.tap.as_mut() else {
            return;
        };

        match tap.on_frame(frame, seconds_since_epoch(SystemTime::now())) {
            Some(TapAction::FireSingle) => self.fire_single_tap(),
            Some(TapAction::FireDouble) => {
                self.cancel_pending_single();
                self.launch_application();
            }
            Some(TapAction::ScheduleSingle(delay)) => {
                // Предыдущее отложенное касание уже не станет двойным
                if let Some((_, task)) = self.pending_single.take() {
                    task.cancel();
                    self.fire_single_tap();
                }
                let id = self.queue.next_id();
                let task = self.queue.schedule(delay, TimerEvent::SingleTap(id));
                self.pending_single = Some((id, task));
            }
            None => {}
        }
    }

    fn fire_single_tap(&mut self) {
        if !self.config.features.middle_click {
            return;
        }
        info!("Касание тремя пальцами -> средний клик");
        if let Err(e) = self.device.click(MouseButton::Middle) {
            error!("Не удалось отправить средний клик: {}", e);
        }
    }

    fn cancel_pending_single(&mut self) {
        if let Some((id, task)) = self.pending_single.take() {
            debug_if_enabled!("Отложенное касание #{} отменено", id);
            task.cancel();
        }
    }

    fn launch_application(&mut self) {
        if !self.config.features.app_launch {
            return;
        }
        let Some((program, args)) = self.config.features.launch_command.split_first() else {
            return;
        };

        self.launches += 1;
        if self.dry_run {
            info!("[DRY RUN] Двойное касание -> запуск {} {:?}", program, args);
            return;
        }

        match Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => info!("Двойное касание -> запущен {} (pid {:?})", program, child.id()),
            Err(e) => error!("Не удалось запустить {}: {}", program, e),
        }
    }

    fn on_space_changed(&mut self) {
        debug_if_enabled!("Смена рабочего стола - повторные проверки через {:?} ms", RESYNC_DELAYS_MS);
        for delay in RESYNC_DELAYS_MS.map(Duration::from_millis) {
            // Повторные проверки не отменяются
            let _ = self.queue.schedule(delay, TimerEvent::Resync(delay));
        }
    }

    fn resync(&mut self, delay: Duration) {
        if self.suspended || !self.config.features.overlay {
            return;
        }
        let Some(point) = self.geometry.cursor_location().or(self.last_cursor) else {
            return;
        };

        self.last_cursor = Some(point);
        self.indicator.update_position(point);
        if self.engine.is_deferred(now()) {
            debug_if_enabled!("Повторная проверка через {:?} пропущена: идёт отсрочка клика", delay);
            return;
        }
        let verdict = self.engine.classify(point);
        debug_if_enabled!("Повторная проверка через {:?}: {}", delay, verdict);
        self.apply_verdict(verdict);
    }

    fn suspend(&mut self) {
        if self.suspended {
            return;
        }
        info!("Приостановка: индикатор скрыт, касания сброшены");
        self.suspended = true;
        self.indicator.hide(false);
        self.indicator.set_locked(true);
        self.click_sequence = None;
        self.cancel_pending_single();
    }

    /// Возобновление: единственное место, кроме старта, где перепроверяются права
    fn resume(&mut self) {
        let trusted = self.geometry.probe();
        self.engine.set_trusted(trusted);
        self.suspended = false;
        info!("Возобновление работы (доступ к геометрии: {})", trusted);
    }
}

/// Монотонное время через tokio, чтобы таймеры и троттлинг шли по одним часам
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}
