//! 单台车载 IoT 设备模拟器
//!
//! 连接 MQTT broker 后发送上线消息，之后循环上报传感器数据、位置和心跳，
//! 收到中断信号时发送离线消息并断开连接。

pub mod clock;
pub mod connection;
pub mod error;
pub mod generator;
pub mod publisher;
pub mod runner;
pub mod simulator;
pub mod sink;

pub use clock::MonotonicClock;
pub use connection::{wait_for_outcome, ConnectionState, ConnectionTask};
pub use error::{Result, SimulatorError};
pub use generator::ReadingGenerator;
pub use publisher::DevicePublisher;
pub use runner::{mqtt_options, run};
pub use simulator::DeviceSimulator;
pub use sink::{qos_from_level, MessageSink, MqttSink};
