use std::fmt;

/// 设备主题的根前缀
pub const TOPIC_ROOT: &str = "device";

/// 设备上报通道，对应 `device/{device_id}/{channel}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// 上线 / 离线状态
    Status,
    /// 传感器数据
    Data,
    /// 位置数据
    Location,
    /// 心跳
    Heartbeat,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::Status,
        Channel::Data,
        Channel::Location,
        Channel::Heartbeat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Status => "status",
            Channel::Data => "data",
            Channel::Location => "location",
            Channel::Heartbeat => "heartbeat",
        }
    }

    pub fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == segment)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 已解析的设备主题
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTopic {
    pub device_id: String,
    pub channel: Channel,
}

impl DeviceTopic {
    pub fn new(device_id: impl Into<String>, channel: Channel) -> Self {
        Self {
            device_id: device_id.into(),
            channel,
        }
    }

    /// 解析 `device/{device_id}/{channel}` 形式的主题
    pub fn parse(topic: &str) -> Option<Self> {
        let mut parts = topic.split('/');
        let root = parts.next()?;
        let device_id = parts.next()?;
        let channel = Channel::from_segment(parts.next()?)?;

        if root != TOPIC_ROOT || device_id.is_empty() || parts.next().is_some() {
            return None;
        }

        Some(Self::new(device_id, channel))
    }
}

impl fmt::Display for DeviceTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", TOPIC_ROOT, self.device_id, self.channel)
    }
}
