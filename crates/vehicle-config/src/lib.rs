pub mod loader;
pub mod simulator;

pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
pub use simulator::{
    CycleConfig, DeviceConfig, LogFormat, LoggingConfig, MqttConfig, ReadingsConfig,
    SimulatorConfig, ValueRange,
};
