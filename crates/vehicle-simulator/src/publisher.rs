use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use vehicle_config::DeviceConfig;
use vehicle_types::{DevicePayload, DeviceTopic, HeartbeatMessage, StatusMessage};

use crate::clock::MonotonicClock;
use crate::error::Result;
use crate::sink::MessageSink;

/// 负责主题拼接、时间戳和序列化的设备发布器
///
/// 可以廉价克隆，连接任务和主循环各持有一份，共享同一个时钟。
/// 上线与离线消息经同一把锁发送，离线消息发出后不再发送上线消息。
#[derive(Clone)]
pub struct DevicePublisher<S> {
    sink: S,
    device_id: Arc<str>,
    ip: Arc<str>,
    clock: Arc<MonotonicClock>,
    // true 表示离线消息已经发出
    offline: Arc<Mutex<bool>>,
}

impl<S: MessageSink + Clone> DevicePublisher<S> {
    pub fn new(sink: S, device: &DeviceConfig) -> Self {
        Self {
            sink,
            device_id: Arc::from(device.device_id.as_str()),
            ip: Arc::from(device.ip.as_str()),
            clock: Arc::new(MonotonicClock::new()),
            offline: Arc::new(Mutex::new(false)),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// 当前时间戳（毫秒），保证不减
    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// 序列化并发布到 `device/{device_id}/{channel}`
    pub async fn publish<P>(&self, payload: &P) -> Result<String>
    where
        P: DevicePayload + Sync,
    {
        let topic = DeviceTopic::new(&*self.device_id, P::CHANNEL).to_string();
        let bytes = payload.to_json_bytes()?;

        debug!(topic = %topic, bytes = bytes.len(), "Publishing");
        self.sink.publish(topic.clone(), bytes).await?;
        Ok(topic)
    }

    /// 发送上线消息；离线消息已发出时跳过并返回 `None`
    pub async fn publish_online(&self) -> Result<Option<StatusMessage>> {
        let offline = self.offline.lock().await;
        if *offline {
            debug!(device_id = %self.device_id, "Already offline, skipping online status");
            return Ok(None);
        }

        let msg = StatusMessage::online(&*self.ip, self.now_millis());
        let topic = self.publish(&msg).await?;
        info!(device_id = %self.device_id, topic = %topic, "Sent online status");
        Ok(Some(msg))
    }

    /// 发送离线消息，此后的上线请求都会被忽略
    pub async fn publish_offline(&self) -> Result<StatusMessage> {
        let mut offline = self.offline.lock().await;
        *offline = true;

        let msg = StatusMessage::offline(self.now_millis());
        let topic = self.publish(&msg).await?;
        info!(device_id = %self.device_id, topic = %topic, "Sent offline status");
        Ok(msg)
    }

    pub async fn publish_heartbeat(&self) -> Result<HeartbeatMessage> {
        let msg = HeartbeatMessage {
            timestamp: self.now_millis(),
        };
        self.publish(&msg).await?;
        info!(device_id = %self.device_id, "Sent heartbeat");
        Ok(msg)
    }
}
