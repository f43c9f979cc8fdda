use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::time::Duration;

/// 模拟器配置
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SimulatorConfig {
    #[serde(default)]
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub cycle: CycleConfig,
    #[serde(default)]
    pub readings: ReadingsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Broker 连接配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MqttConfig {
    #[serde(default = "default_broker")]
    pub broker: String,

    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    /// 心跳保活（秒）
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,

    /// 发布 QoS（0 / 1 / 2）
    #[serde(default)]
    pub qos: u8,

    /// 客户端请求队列容量
    #[serde(default = "default_request_capacity")]
    pub request_capacity: usize,

    /// 网络错误后再次轮询前的停顿（毫秒）
    #[serde(default = "default_error_pause_ms")]
    pub error_pause_ms: u64,
}

/// 设备身份
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// 设备 ID，同时作为 MQTT client id
    #[serde(default = "default_device_id")]
    pub device_id: String,

    /// 设备密钥。认证流程未启用，不会发送给 broker
    #[serde(default = "default_secret_key")]
    pub secret_key: String,

    /// 上线消息中上报的 IP
    #[serde(default = "default_device_ip")]
    pub ip: String,
}

/// 发送周期配置（毫秒）
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CycleConfig {
    #[serde(default = "default_after_telemetry_ms")]
    pub after_telemetry_ms: u64,

    #[serde(default = "default_after_location_ms")]
    pub after_location_ms: u64,

    #[serde(default = "default_after_heartbeat_ms")]
    pub after_heartbeat_ms: u64,

    /// 离线消息发出后、断开连接前的等待时间
    #[serde(default = "default_shutdown_linger_ms")]
    pub shutdown_linger_ms: u64,

    /// 等待连接任务退出的上限
    #[serde(default = "default_disconnect_timeout_ms")]
    pub disconnect_timeout_ms: u64,
}

/// 闭区间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ValueRange<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Copy + Display> ValueRange<T> {
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.min > self.max {
            return Err(anyhow!(
                "readings.{}: min ({}) cannot be greater than max ({})",
                name,
                self.min,
                self.max
            ));
        }
        Ok(())
    }
}

/// 模拟数据取值范围
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReadingsConfig {
    /// 基准纬度
    #[serde(default = "default_base_lat")]
    pub base_lat: f64,

    /// 基准经度
    #[serde(default = "default_base_lng")]
    pub base_lng: f64,

    /// GPS 漂移范围（度），偏移量取 [-drift, drift]
    #[serde(default = "default_gps_drift")]
    pub gps_drift: f64,

    #[serde(default = "default_speed")]
    pub speed: ValueRange<u32>,

    #[serde(default = "default_rpm")]
    pub rpm: ValueRange<u32>,

    #[serde(default = "default_fuel")]
    pub fuel: ValueRange<u32>,

    #[serde(default = "default_temperature")]
    pub temperature: ValueRange<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

// 默认值函数
fn default_broker() -> String {
    "localhost".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_keep_alive_secs() -> u64 {
    60
}

fn default_request_capacity() -> usize {
    10
}

fn default_error_pause_ms() -> u64 {
    1000
}

fn default_device_id() -> String {
    "DEV_TEST_001".to_string()
}

fn default_secret_key() -> String {
    "test_secret_001".to_string()
}

fn default_device_ip() -> String {
    "192.168.1.100".to_string()
}

fn default_after_telemetry_ms() -> u64 {
    2000
}

fn default_after_location_ms() -> u64 {
    2000
}

fn default_after_heartbeat_ms() -> u64 {
    5000
}

fn default_shutdown_linger_ms() -> u64 {
    1000
}

fn default_disconnect_timeout_ms() -> u64 {
    3000
}

fn default_speed() -> ValueRange<u32> {
    ValueRange::new(0, 120)
}

fn default_rpm() -> ValueRange<u32> {
    ValueRange::new(800, 5000)
}

fn default_fuel() -> ValueRange<u32> {
    ValueRange::new(0, 100)
}

fn default_temperature() -> ValueRange<i32> {
    ValueRange::new(20, 90)
}

fn default_base_lat() -> f64 {
    31.23
}

fn default_base_lng() -> f64 {
    121.47
}

fn default_gps_drift() -> f64 {
    0.01
}

fn default_log_level() -> String {
    "info".to_string()
}

// Default trait 实现
impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: default_broker(),
            port: default_mqtt_port(),
            keep_alive_secs: default_keep_alive_secs(),
            qos: 0,
            request_capacity: default_request_capacity(),
            error_pause_ms: default_error_pause_ms(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_id: default_device_id(),
            secret_key: default_secret_key(),
            ip: default_device_ip(),
        }
    }
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            after_telemetry_ms: default_after_telemetry_ms(),
            after_location_ms: default_after_location_ms(),
            after_heartbeat_ms: default_after_heartbeat_ms(),
            shutdown_linger_ms: default_shutdown_linger_ms(),
            disconnect_timeout_ms: default_disconnect_timeout_ms(),
        }
    }
}

impl Default for ReadingsConfig {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            rpm: default_rpm(),
            fuel: default_fuel(),
            temperature: default_temperature(),
            base_lat: default_base_lat(),
            base_lng: default_base_lng(),
            gps_drift: default_gps_drift(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl MqttConfig {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn error_pause(&self) -> Duration {
        Duration::from_millis(self.error_pause_ms)
    }
}

impl CycleConfig {
    pub fn after_telemetry(&self) -> Duration {
        Duration::from_millis(self.after_telemetry_ms)
    }

    pub fn after_location(&self) -> Duration {
        Duration::from_millis(self.after_location_ms)
    }

    pub fn after_heartbeat(&self) -> Duration {
        Duration::from_millis(self.after_heartbeat_ms)
    }

    pub fn shutdown_linger(&self) -> Duration {
        Duration::from_millis(self.shutdown_linger_ms)
    }

    pub fn disconnect_timeout(&self) -> Duration {
        Duration::from_millis(self.disconnect_timeout_ms)
    }
}

impl SimulatorConfig {
    /// 验证配置
    pub fn validate(&self) -> Result<()> {
        if self.mqtt.broker.trim().is_empty() {
            return Err(anyhow!("mqtt.broker must not be empty"));
        }

        if self.mqtt.port == 0 {
            return Err(anyhow!("mqtt.port must be greater than 0"));
        }

        if self.mqtt.qos > 2 {
            return Err(anyhow!("mqtt.qos must be 0, 1 or 2, got {}", self.mqtt.qos));
        }

        if self.mqtt.request_capacity == 0 {
            return Err(anyhow!("mqtt.request_capacity must be greater than 0"));
        }

        let device_id = &self.device.device_id;
        if device_id.is_empty() {
            return Err(anyhow!("device.device_id must not be empty"));
        }
        // 设备 ID 会拼进主题，不能包含层级分隔符或通配符
        if device_id.contains(['/', '+', '#']) {
            return Err(anyhow!(
                "device.device_id contains a reserved topic character: {}",
                device_id
            ));
        }

        let readings = &self.readings;
        readings.speed.validate("speed")?;
        readings.rpm.validate("rpm")?;
        readings.fuel.validate("fuel")?;
        readings.temperature.validate("temperature")?;

        if !readings.gps_drift.is_finite() || readings.gps_drift < 0.0 {
            return Err(anyhow!(
                "readings.gps_drift must be a non-negative number, got {}",
                readings.gps_drift
            ));
        }

        if !readings.base_lat.is_finite() || !(-90.0..=90.0).contains(&readings.base_lat) {
            return Err(anyhow!("readings.base_lat out of range: {}", readings.base_lat));
        }

        if !readings.base_lng.is_finite() || !(-180.0..=180.0).contains(&readings.base_lng) {
            return Err(anyhow!("readings.base_lng out of range: {}", readings.base_lng));
        }

        Ok(())
    }

    /// 输出为 TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
