use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio::signal::unix::{signal as unix_signal, SignalKind};
use tokio::time::Duration;
use tracing::{error, info, warn};

mod config;
mod error;
mod events;
mod services;
mod utils;

use config::Config;
use services::input_listener::InputListenerTrait;
use services::{
    create_geometry_provider, create_input_listener, Controller, OwnerEvent, OwnerQueue,
    SpaceWatcher, TouchCapability, TouchListener, TracingSurface, VirtualDevice,
};

#[derive(Parser, Debug)]
#[command(name = "focusguard")]
#[command(about = "Индикатор курсора над неактивным окном и жесты для переноса окон")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "focusguard.toml")]
    config: String,

    /// Режим сухого запуска (без реальных действий)
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования (по умолчанию из секции [logging] конфигурации)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Arc::new(Config::load(&args.config)?);

    init_tracing(args.log_level.as_deref().unwrap_or(config.log_directives()))?;

    info!("Запуск focusguard v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);

    if args.dry_run {
        warn!("Режим сухого запуска - реальные действия отключены");
    }

    // Права проверяются один раз; повторно только при resume
    let access = if args.dry_run {
        utils::permissions::AccessReport { input: true, uinput: true }
    } else {
        utils::permissions::check_permissions()
    };

    let geometry = create_geometry_provider(config.clone(), args.dry_run)?;
    // Без uinput индикатор работает, а клики и аккорды возвращают ошибку
    let virtual_device = if access.uinput {
        VirtualDevice::new("focusguard virtual pointer", args.dry_run).unwrap_or_else(|e| {
            warn!("Виртуальное устройство не создано: {}", e);
            VirtualDevice::unavailable("focusguard virtual pointer")
        })
    } else {
        VirtualDevice::unavailable("focusguard virtual pointer")
    };
    let virtual_device = Arc::new(virtual_device);
    let touch = if args.dry_run || !access.input {
        TouchCapability::unavailable()
    } else {
        TouchCapability::probe(&config)
    };

    let (queue, rx) = OwnerQueue::channel();
    let controller = Controller::new(
        config.clone(),
        geometry.clone(),
        virtual_device.clone(),
        queue.clone(),
        Box::new(TracingSurface),
        touch.is_available(),
        args.dry_run,
    );
    let input_listener = create_input_listener(config.clone(), geometry.clone(), queue.clone(), args.dry_run)?;
    let touch_listener = if touch.is_available() {
        TouchListener::new(&touch, &config, queue.clone())
            .map_err(|e| warn!("Слушатель касаний не запущен: {}", e))
            .ok()
    } else {
        None
    };
    let space_watcher = SpaceWatcher::new(
        geometry.clone(),
        queue.clone(),
        Duration::from_millis(config.backend.space_poll_ms),
    );

    info!("Все компоненты инициализированы");

    let controller_handle = tokio::spawn(async move {
        if let Err(e) = controller.run(rx).await {
            error!("Ошибка в Controller: {}", e);
        }
    });
    let input_handle = tokio::spawn(async move {
        if let Err(e) = input_listener.run().await {
            error!("Ошибка в InputListener: {}", e);
        }
    });
    let touch_handle = touch_listener.map(|listener| {
        tokio::spawn(async move {
            if let Err(e) = listener.run().await {
                error!("Ошибка в TouchListener: {}", e);
            }
        })
    });
    let watcher_handle = tokio::spawn(async move {
        if let Err(e) = space_watcher.run().await {
            error!("Ошибка в SpaceWatcher: {}", e);
        }
    });

    info!("Все сервисы запущены (SIGUSR1 - пауза, SIGUSR2 - продолжить)");

    let mut suspend_signal = unix_signal(SignalKind::user_defined1())?;
    let mut resume_signal = unix_signal(SignalKind::user_defined2())?;

    loop {
        tokio::select! {
            result = signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
                    Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
                }
                break;
            }
            _ = suspend_signal.recv() => {
                info!("SIGUSR1: приостановка");
                queue.post(OwnerEvent::Suspend);
            }
            _ = resume_signal.recv() => {
                info!("SIGUSR2: возобновление");
                queue.post(OwnerEvent::Resume);
            }
        }
    }

    info!("Завершение работы...");
    queue.post(OwnerEvent::Shutdown);

    // Слушатели останавливаются сами, когда владелец закрывает очередь
    let shutdown_timeout = Duration::from_secs(5);
    let shutdown_result = tokio::time::timeout(shutdown_timeout, async {
        let _ = controller_handle.await;
        let _ = input_handle.await;
        let _ = watcher_handle.await;
        if let Some(handle) = touch_handle {
            let _ = handle.await;
        }
    })
    .await;

    match shutdown_result {
        Ok(_) => info!("Все сервисы завершили работу корректно"),
        Err(_) => warn!("Таймаут при завершении сервисов"),
    }

    info!("focusguard завершил работу");
    Ok(())
}

fn init_tracing(directives: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directives))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact())
        .init();

    Ok(())
}
