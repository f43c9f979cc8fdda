use serde::{Deserialize, Serialize};

use crate::topic::Channel;

/// 所有设备上报消息的公共接口
pub trait DevicePayload: Serialize {
    /// 消息发往的通道
    const CHANNEL: Channel;

    /// 毫秒时间戳
    fn timestamp(&self) -> i64;

    /// 序列化为 UTF-8 JSON
    fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// 设备在线状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Online,
    Offline,
}

/// 上线 / 离线消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub status: DeviceStatus,

    /// 仅上线消息携带
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    pub timestamp: i64,
}

impl StatusMessage {
    pub fn online(ip: impl Into<String>, timestamp: i64) -> Self {
        Self {
            status: DeviceStatus::Online,
            ip: Some(ip.into()),
            timestamp,
        }
    }

    pub fn offline(timestamp: i64) -> Self {
        Self {
            status: DeviceStatus::Offline,
            ip: None,
            timestamp,
        }
    }
}

impl DevicePayload for StatusMessage {
    const CHANNEL: Channel = Channel::Status;

    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// 车辆传感器数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryMessage {
    /// 车速 km/h
    pub speed: u32,
    /// 发动机转速
    pub rpm: u32,
    /// 油量百分比
    pub fuel: u32,
    /// 温度 °C
    pub temperature: i32,
    pub timestamp: i64,
}

impl DevicePayload for TelemetryMessage {
    const CHANNEL: Channel = Channel::Data;

    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// 位置数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationMessage {
    pub lat: f64,
    pub lng: f64,
    pub speed: u32,
    /// 航向角，[0, 360)
    pub direction: u32,
    pub timestamp: i64,
}

impl DevicePayload for LocationMessage {
    const CHANNEL: Channel = Channel::Location;

    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// 心跳
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatMessage {
    pub timestamp: i64,
}

impl DevicePayload for HeartbeatMessage {
    const CHANNEL: Channel = Channel::Heartbeat;

    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}
