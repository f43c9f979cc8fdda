use rumqttc::{ConnectReturnCode, ConnectionError, Event, EventLoop, Outgoing, Packet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::publisher::DevicePublisher;
use crate::sink::MessageSink;

/// 连接状态，由连接任务更新
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// 尚未得到 broker 的应答
    Connecting,
    /// 已连接，上线消息已进入发送队列
    Connected,
    /// broker 拒绝连接，附带 CONNACK 返回码
    Refused(u8),
    /// 网络层错误
    Failed(String),
}

impl ConnectionState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, ConnectionState::Connecting)
    }
}

/// 后台连接任务
///
/// 驱动 rumqttc 事件循环。每次连接成功都会发送一次上线消息，
/// 收到的 PUBLISH 只记录日志，发出 DISCONNECT 后退出。
pub struct ConnectionTask<S> {
    eventloop: EventLoop,
    publisher: DevicePublisher<S>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    error_pause: Duration,
}

impl<S> ConnectionTask<S>
where
    S: MessageSink + Clone + 'static,
{
    pub fn new(
        eventloop: EventLoop,
        publisher: DevicePublisher<S>,
        error_pause: Duration,
    ) -> (Self, watch::Receiver<ConnectionState>) {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let task = Self {
            eventloop,
            publisher,
            state_tx: Arc::new(state_tx),
            error_pause,
        };
        (task, state_rx)
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        self.on_connected();
                    } else {
                        self.on_refused(ack.code);
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    info!(
                        topic = %publish.topic,
                        payload = %String::from_utf8_lossy(&publish.payload),
                        "Received message"
                    );
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    info!(device_id = %self.publisher.device_id(), "Disconnect sent");
                    break;
                }
                Ok(event) => {
                    trace!(?event, "MQTT event");
                }
                Err(ConnectionError::ConnectionRefused(code)) => {
                    self.on_refused(code);
                    tokio::time::sleep(self.error_pause).await;
                }
                Err(ConnectionError::RequestsDone) => {
                    debug!("All client handles dropped, stopping connection task");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "MQTT connection error");
                    self.state_tx
                        .send_replace(ConnectionState::Failed(e.to_string()));
                    tokio::time::sleep(self.error_pause).await;
                }
            }
        }
    }

    fn on_connected(&self) {
        info!(device_id = %self.publisher.device_id(), "Connected to broker");

        // 在独立任务中入队上线消息：请求队列满时在这里等待会卡住事件循环
        let publisher = self.publisher.clone();
        let state_tx = self.state_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = publisher.publish_online().await {
                error!(error = %e, "Failed to send online status");
            }
            state_tx.send_replace(ConnectionState::Connected);
        });
    }

    fn on_refused(&self, code: ConnectReturnCode) {
        let code = return_code(code);
        error!(code, "Connection refused by broker");
        self.state_tx.send_replace(ConnectionState::Refused(code));
    }
}

/// MQTT 3.1.1 CONNACK 返回码
pub fn return_code(code: ConnectReturnCode) -> u8 {
    match code {
        ConnectReturnCode::Success => 0,
        ConnectReturnCode::RefusedProtocolVersion => 1,
        ConnectReturnCode::BadClientId => 2,
        ConnectReturnCode::ServiceUnavailable => 3,
        ConnectReturnCode::BadUserNamePassword => 4,
        ConnectReturnCode::NotAuthorized => 5,
    }
}

/// 等待第一次连接结果
pub async fn wait_for_outcome(state_rx: &mut watch::Receiver<ConnectionState>) -> ConnectionState {
    match state_rx.wait_for(ConnectionState::is_settled).await {
        Ok(state) => state.clone(),
        Err(_) => ConnectionState::Failed("connection task exited".to_string()),
    }
}
