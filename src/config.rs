use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub live_regions: LiveRegionConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

/// Параметры дебаунса и опроса готовности
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimingConfig {
    /// Время "успокоения" после последнего события фокуса
    pub wait_time_ms: u64,
    /// Жёсткий потолок задержки от первого необработанного события
    pub max_wait_time_ms: u64,
    /// Длительность одного тика опроса для колбэков готовности
    pub idle_poll_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct LiveRegionConfig {
    pub max_per_flush: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionConfig {
    pub start_active: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            wait_time_ms: 10,
            max_wait_time_ms: 50,
            idle_poll_ms: 5,
        }
    }
}

impl TimingConfig {
    pub fn wait_time(&self) -> Duration {
        Duration::from_millis(self.wait_time_ms)
    }

    pub fn max_wait_time(&self) -> Duration {
        Duration::from_millis(self.max_wait_time_ms)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }
}

impl Default for LiveRegionConfig {
    fn default() -> Self {
        Self { max_per_flush: 5 }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { start_active: true }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::from(figment::providers::Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("A11Y_").split("__"));

        let config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Валидация настроек логирования
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        // Валидация таймингов
        if self.timing.wait_time_ms == 0 {
            anyhow::bail!("wait_time_ms должно быть больше 0");
        }

        if self.timing.max_wait_time_ms < self.timing.wait_time_ms {
            anyhow::bail!(
                "max_wait_time_ms ({}) не может быть меньше wait_time_ms ({})",
                self.timing.max_wait_time_ms,
                self.timing.wait_time_ms
            );
        }

        if self.timing.idle_poll_ms == 0 {
            anyhow::bail!("idle_poll_ms должно быть больше 0");
        }

        if self.live_regions.max_per_flush == 0 {
            anyhow::bail!("live_regions.max_per_flush должно быть больше 0");
        }

        Ok(())
    }
}
