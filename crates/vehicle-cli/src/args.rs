use clap::Parser;
use std::path::PathBuf;
use vehicle_config::{ConfigLoader, SimulatorConfig};

/// IoT Vehicle Platform - MQTT test client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Config file path (TOML); defaults are used when absent
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Broker host
    #[arg(long)]
    pub broker: Option<String>,

    /// Broker port
    #[arg(long)]
    pub port: Option<u16>,

    /// Device ID, also used as the MQTT client id
    #[arg(long)]
    pub device_id: Option<String>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Args {
    /// 加载配置并应用命令行覆盖
    pub fn load_config(&self) -> anyhow::Result<SimulatorConfig> {
        let loader = match &self.config {
            Some(path) => ConfigLoader::from_file(path),
            None => ConfigLoader::new(),
        };
        let mut config = loader.load()?;
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&self, config: &mut SimulatorConfig) {
        if let Some(broker) = &self.broker {
            config.mqtt.broker = broker.clone();
        }
        if let Some(port) = self.port {
            config.mqtt.port = port;
        }
        if let Some(device_id) = &self.device_id {
            config.device.device_id = device_id.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_flags() {
        let args = Args::try_parse_from(["vehicle-sim"]).unwrap();
        assert!(args.config.is_none());
        assert!(!args.print_config);

        let mut config = SimulatorConfig::default();
        args.apply(&mut config);
        assert_eq!(config, SimulatorConfig::default());
    }

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "vehicle-sim",
            "--broker",
            "10.0.0.5",
            "--port",
            "1884",
            "--device-id",
            "DEV_TEST_002",
            "--print-config",
        ])
        .unwrap();

        let mut config = SimulatorConfig::default();
        args.apply(&mut config);
        assert_eq!(config.mqtt.broker, "10.0.0.5");
        assert_eq!(config.mqtt.port, 1884);
        assert_eq!(config.device.device_id, "DEV_TEST_002");
        assert!(args.print_config);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let args = Args::try_parse_from(["vehicle-sim", "--device-id", "a/b"]).unwrap();
        assert!(args.load_config().is_err());
    }

    #[test]
    fn test_rejects_bad_port() {
        assert!(Args::try_parse_from(["vehicle-sim", "--port", "70000"]).is_err());
    }
}
