use thiserror::Error;

/// 模拟器错误类型
#[derive(Error, Debug)]
pub enum SimulatorError {
    /// MQTT 客户端请求失败（发布 / 断开）
    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 配置错误
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// 消息出口已关闭
    #[error("Sink closed: {0}")]
    SinkClosed(String),

    /// 连接任务异常退出
    #[error("Connection task failed: {0}")]
    ConnectionTask(#[from] tokio::task::JoinError),
}

/// 模拟器结果类型
pub type Result<T> = std::result::Result<T, SimulatorError>;

impl SimulatorError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        SimulatorError::InvalidConfig(msg.into())
    }

    pub fn sink_closed(msg: impl Into<String>) -> Self {
        SimulatorError::SinkClosed(msg.into())
    }
}
