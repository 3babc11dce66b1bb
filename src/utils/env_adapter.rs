use std::sync::Mutex;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Serialised access to process environment variables.
pub struct EnvAdapter;

impl EnvAdapter {
    pub fn get(key: &str) -> Option<String> {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        std::env::var(key).ok().filter(|value| !value.trim().is_empty())
    }

    /// Reads a boolean flag. Accepts `1/0`, `true/false`, `yes/no`, `on/off`.
    pub fn get_flag(key: &str) -> Option<bool> {
        let raw = Self::get(key)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            other => {
                log::warn!("Ignoring unrecognised boolean value {other:?} for {key}");
                None
            }
        }
    }

    pub fn set_var(key: &str, value: &str) {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        unsafe {
            std::env::set_var(key, value);
        }
    }

    pub fn remove_var(key: &str) {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        unsafe {
            std::env::remove_var(key);
        }
    }
}
