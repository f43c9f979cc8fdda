use anyhow::{anyhow, Result};
use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::SimulatorConfig;

/// 环境变量前缀，例如 `VEHICLE_SIM_MQTT__BROKER=10.0.0.5`
pub const DEFAULT_ENV_PREFIX: &str = "VEHICLE_SIM";

/// 配置加载器
///
/// 优先级从低到高：内置默认值、TOML 文件、环境变量。
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    env_prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// 仅使用默认值和环境变量
    pub fn new() -> Self {
        Self {
            config_path: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    /// 从指定 TOML 文件加载
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Self {
        Self {
            config_path: Some(config_path.as_ref().to_path_buf()),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// 加载并验证配置
    pub fn load(&self) -> Result<SimulatorConfig> {
        let mut builder = Config::builder().add_source(Config::try_from(&SimulatorConfig::default())?);

        if let Some(path) = &self.config_path {
            // 文件不存在时使用默认配置，由调用方在日志初始化后提示
            if path.exists() {
                debug!("Loading simulator config from {:?}", path);
                builder = builder.add_source(File::new(
                    path.to_str().ok_or_else(|| anyhow!("Invalid config path"))?,
                    FileFormat::Toml,
                ));
            }
        }

        let config = builder
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: SimulatorConfig = config.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }
}
