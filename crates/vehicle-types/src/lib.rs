pub mod message;
pub mod topic;

pub use message::{
    DevicePayload, DeviceStatus, HeartbeatMessage, LocationMessage, StatusMessage,
    TelemetryMessage,
};
pub use topic::{Channel, DeviceTopic};
