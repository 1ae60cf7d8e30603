use thiserror::Error;

#[derive(Error, Debug)]
pub enum GuardError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ошибка uinput: {0}")]
    Uinput(#[from] uinput::Error),

    #[error("Устройство не найдено: {0}")]
    DeviceNotFound(String),

    #[error("Недостаточно прав доступа: {0}")]
    Permission(String),

    #[error("Сервис недоступен: {0}")]
    ServiceUnavailable(String),

    #[error("Перемещение окна отклонено (код {code})")]
    MoveRejected { code: i32 },

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl GuardError {
    pub fn device_not_found<T>(msg: impl Into<String>) -> Result<T> {
        Err(GuardError::DeviceNotFound(msg.into()))
    }
}

pub type Result<T> = std::result::Result<T, GuardError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! guard_error {
    (permission, $($arg:tt)*) => {
        $crate::error::GuardError::Permission(format!($($arg)*))
    };
    (service_unavailable, $($arg:tt)*) => {
        $crate::error::GuardError::ServiceUnavailable(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::GuardError::Internal(format!($($arg)*))
    };
}
