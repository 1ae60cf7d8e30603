use crate::error::{GuardError, Result};
use crate::guard_error;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tracing::{info, warn};

/// Результат однократной проверки прав. Перепроверяется только при resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessReport {
    /// Чтение /dev/input (мониторинг мыши, клавиатуры, касаний)
    pub input: bool,
    /// Запись в /dev/uinput (синтезированные клики и аккорды)
    pub uinput: bool,
}

impl AccessReport {
    pub fn is_complete(&self) -> bool {
        self.input && self.uinput
    }
}

/// Проверить права доступа к необходимым ресурсам
pub fn check_permissions() -> AccessReport {
    info!("Проверка прав доступа...");

    let input = match check_input_devices_access() {
        Ok(()) => true,
        Err(e) => {
            warn!("{}", e);
            false
        }
    };
    let uinput = match check_uinput_access() {
        Ok(()) => true,
        Err(e) => {
            warn!("{}", e);
            false
        }
    };

    check_not_root();

    let report = AccessReport { input, uinput };
    if report.is_complete() {
        info!("Проверка прав доступа завершена успешно");
    } else {
        for line in get_setup_commands() {
            warn!("   {}", line);
        }
    }
    report
}

fn check_input_devices_access() -> Result<()> {
    let input_dir = Path::new("/dev/input");

    if !input_dir.exists() {
        return Err(guard_error!(permission, "Директория {} не существует", input_dir.display()));
    }

    fs::read_dir(input_dir).map_err(|e| {
        GuardError::Permission(format!(
            "Нет доступа к {}: {}. Добавьте пользователя в группу 'input'",
            input_dir.display(),
            e
        ))
    })?;

    info!("Доступ к {} подтвержден", input_dir.display());
    Ok(())
}

fn check_uinput_access() -> Result<()> {
    let uinput_device = Path::new("/dev/uinput");

    if !uinput_device.exists() {
        return Err(GuardError::ServiceUnavailable(format!(
            "{} не существует, возможно модуль uinput не загружен",
            uinput_device.display()
        )));
    }

    let metadata = fs::metadata(uinput_device).map_err(|e| {
        GuardError::Permission(format!(
            "Не удалось проверить права доступа к {}: {}",
            uinput_device.display(),
            e
        ))
    })?;

    if !mode_grants_access(metadata.permissions().mode()) {
        return Err(guard_error!(
            permission,
            "Нет прав доступа к {}. Добавьте пользователя в группу 'uinput' или 'input'",
            uinput_device.display()
        ));
    }

    info!("Доступ к {} подтвержден", uinput_device.display());
    Ok(())
}

/// Чтение и запись для группы или для всех (обычно 660 или 666)
fn mode_grants_access(mode: u32) -> bool {
    mode & 0o006 == 0o006 || mode & 0o060 == 0o060
}

fn check_not_root() {
    match std::env::var("USER") {
        Ok(user) if user == "root" => {
            warn!("Приложение запущено от имени root!");
            warn!("   Рекомендуется добавить пользователя в группы 'input' и 'uinput'");
            warn!("   и запускать приложение от имени обычного пользователя");
        }
        Ok(user) => {
            info!("Приложение запущено от имени пользователя: {}", user);
        }
        Err(_) => {
            warn!("Не удалось определить пользователя");
        }
    }
}

/// Рекомендуемые команды для настройки прав доступа
pub fn get_setup_commands() -> Vec<String> {
    vec![
        "# Добавить пользователя в необходимые группы:".to_string(),
        "sudo usermod -a -G input,uinput $USER".to_string(),
        "# Загрузить модуль uinput:".to_string(),
        "sudo modprobe uinput".to_string(),
        "# Автоматическая загрузка модуля при загрузке системы:".to_string(),
        "echo 'uinput' | sudo tee /etc/modules-load.d/uinput.conf".to_string(),
        "# После выполнения команд перезайдите в систему".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_commands() {
        let commands = get_setup_commands();
        assert!(!commands.is_empty());
        assert!(commands.iter().any(|cmd| cmd.contains("usermod")));
        assert!(commands.iter().any(|cmd| cmd.contains("modprobe")));
    }

    #[test]
    fn test_uinput_mode_check() {
        assert!(mode_grants_access(0o660));
        assert!(mode_grants_access(0o666));
        assert!(!mode_grants_access(0o600));
        // Только чтение для группы не позволяет создать устройство
        assert!(!mode_grants_access(0o640));
    }

    #[test]
    fn test_report_completeness() {
        assert!(AccessReport { input: true, uinput: true }.is_complete());
        assert!(!AccessReport { input: true, uinput: false }.is_complete());
    }
}
