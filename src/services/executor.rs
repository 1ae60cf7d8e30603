//! Очередь владельца: единственная точка, через которую меняется состояние
//! распознавателей, индикатора и дебаунса.
//!
//! Слушатели только публикуют события. Отложенные действия тоже приходят
//! сюда, поэтому их порядок относительно других событий очереди детерминирован.

use crate::events::RawInput;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

use crate::trace_if_enabled;

/// Таймеры владельца. Отменяемые несут номер поколения: таймер мог уже
/// лежать в очереди в момент отмены, и владелец сверяет номер.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Затухание индикатора завершено
    FadeFinished(u64),
    /// Клик: пора гасить разблокированный индикатор
    ClickFade(u64),
    /// Клик: вернуть заблокированный вид
    ClickRelock(u64),
    /// Повторная проверка после смены рабочего стола (не отменяется)
    Resync(Duration),
    /// Отложенное одиночное касание
    SingleTap(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum OwnerEvent {
    Input(RawInput),
    Timer(TimerEvent),
    Suspend,
    Resume,
    Shutdown,
}

/// Дескриптор запланированного действия с явной отменой
#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    pub fn cancel(self) {
        self.handle.abort();
    }
}

/// Клонируемый дескриптор очереди владельца
#[derive(Debug, Clone)]
pub struct OwnerQueue {
    tx: mpsc::UnboundedSender<OwnerEvent>,
    next_id: Arc<AtomicU64>,
}

impl OwnerQueue {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OwnerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                next_id: Arc::new(AtomicU64::new(1)),
            },
            rx,
        )
    }

    /// `false`, если владелец уже завершился
    pub fn post(&self, event: OwnerEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn input(&self, input: RawInput) -> bool {
        trace_if_enabled!("Событие ввода -> владелец: {}", input.kind());
        self.post(OwnerEvent::Input(input))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Новый номер поколения для отменяемого таймера
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Опубликовать таймер в очередь через `delay`
    pub fn schedule(&self, delay: Duration, timer: TimerEvent) -> ScheduledTask {
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            let _ = tx.send(OwnerEvent::Timer(timer));
        });
        ScheduledTask { handle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_timer_arrives_after_delay() {
        let (queue, mut rx) = OwnerQueue::channel();
        let _task = queue.schedule(Duration::from_millis(100), TimerEvent::SingleTap(7));

        tokio::time::sleep(Duration::from_millis(99)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(
            rx.recv().await,
            Some(OwnerEvent::Timer(TimerEvent::SingleTap(7)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_arrives() {
        let (queue, mut rx) = OwnerQueue::channel();
        let task = queue.schedule(Duration::from_millis(50), TimerEvent::FadeFinished(1));
        task.cancel();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_generation_ids_are_unique() {
        let (queue, _rx) = OwnerQueue::channel();
        let clone = queue.clone();
        let a = queue.next_id();
        let b = clone.next_id();
        assert_ne!(a, b);
    }
}
