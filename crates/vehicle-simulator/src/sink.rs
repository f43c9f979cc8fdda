use async_trait::async_trait;
use rumqttc::{AsyncClient, QoS};

use crate::error::Result;

/// 消息出口
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// 发布一条消息，`payload` 为 UTF-8 JSON
    async fn publish(&self, topic: String, payload: Vec<u8>) -> Result<()>;

    /// 断开连接
    async fn disconnect(&self) -> Result<()>;
}

/// 基于 rumqttc 的消息出口
#[derive(Clone)]
pub struct MqttSink {
    client: AsyncClient,
    qos: QoS,
}

impl MqttSink {
    pub fn new(client: AsyncClient, qos: QoS) -> Self {
        Self { client, qos }
    }
}

#[async_trait]
impl MessageSink for MqttSink {
    async fn publish(&self, topic: String, payload: Vec<u8>) -> Result<()> {
        self.client.publish(topic, self.qos, false, payload).await?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.client.disconnect().await?;
        Ok(())
    }
}

/// 配置中的 QoS 等级转换，超出范围时按 0 处理
pub fn qos_from_level(level: u8) -> QoS {
    match level {
        1 => QoS::AtLeastOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtMostOnce,
    }
}
