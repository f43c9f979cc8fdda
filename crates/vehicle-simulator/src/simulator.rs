use rand::rngs::StdRng;
use rand::Rng;
use std::future::Future;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};
use vehicle_config::{CycleConfig, DeviceConfig, ReadingsConfig};
use vehicle_shutdown::ShutdownSignal;
use vehicle_types::{HeartbeatMessage, LocationMessage, StatusMessage, TelemetryMessage};

use crate::connection::ConnectionState;
use crate::error::Result;
use crate::generator::ReadingGenerator;
use crate::publisher::DevicePublisher;
use crate::sink::MessageSink;

/// 设备模拟器
///
/// 每一轮依次发送传感器数据、位置、心跳，中间按 [`CycleConfig`] 休眠。
/// 绑定连接状态后，未连接期间的周期消息直接丢弃，不进入发送队列。
pub struct DeviceSimulator<S, R = StdRng> {
    publisher: DevicePublisher<S>,
    generator: ReadingGenerator<R>,
    cycle: CycleConfig,
    link: Option<watch::Receiver<ConnectionState>>,
    rounds: u64,
}

impl<S: MessageSink + Clone> DeviceSimulator<S, StdRng> {
    pub fn new(sink: S, device: &DeviceConfig, readings: ReadingsConfig, cycle: CycleConfig) -> Self {
        Self::with_parts(
            DevicePublisher::new(sink, device),
            ReadingGenerator::from_entropy(readings),
            cycle,
        )
    }
}

impl<S, R> DeviceSimulator<S, R>
where
    S: MessageSink + Clone,
    R: Rng,
{
    pub fn with_parts(
        publisher: DevicePublisher<S>,
        generator: ReadingGenerator<R>,
        cycle: CycleConfig,
    ) -> Self {
        Self {
            publisher,
            generator,
            cycle,
            link: None,
            rounds: 0,
        }
    }

    /// 绑定连接状态，只在 [`ConnectionState::Connected`] 时发送周期消息
    pub fn with_link(mut self, link: watch::Receiver<ConnectionState>) -> Self {
        self.link = Some(link);
        self
    }

    /// 未绑定连接状态时视为已连接
    pub fn is_linked(&self) -> bool {
        self.link
            .as_ref()
            .map_or(true, |link| *link.borrow() == ConnectionState::Connected)
    }

    /// 供连接任务使用的发布器副本
    pub fn publisher(&self) -> DevicePublisher<S> {
        self.publisher.clone()
    }

    /// 已开始的轮数
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    pub async fn publish_online(&self) -> Result<Option<StatusMessage>> {
        self.publisher.publish_online().await
    }

    pub async fn publish_offline(&self) -> Result<StatusMessage> {
        self.publisher.publish_offline().await
    }

    pub async fn publish_telemetry(&mut self) -> Result<TelemetryMessage> {
        let msg = self.generator.telemetry(self.publisher.now_millis());
        self.publisher.publish(&msg).await?;
        info!(
            speed = msg.speed,
            rpm = msg.rpm,
            fuel = msg.fuel,
            temperature = msg.temperature,
            "Sent device data"
        );
        Ok(msg)
    }

    pub async fn publish_location(&mut self) -> Result<LocationMessage> {
        let msg = self.generator.location(self.publisher.now_millis());
        self.publisher.publish(&msg).await?;
        info!(
            "Sent location: lat={:.4}, lng={:.4}, direction={}",
            msg.lat, msg.lng, msg.direction
        );
        Ok(msg)
    }

    pub async fn publish_heartbeat(&self) -> Result<HeartbeatMessage> {
        self.publisher.publish_heartbeat().await
    }

    /// 执行一轮：数据、位置、心跳
    pub async fn run_round(&mut self) -> Result<()> {
        self.rounds += 1;
        info!(round = self.rounds, "Sending round");

        if self.is_linked() {
            self.publish_telemetry().await?;
        } else {
            debug!("Not connected, dropping device data");
        }
        sleep(self.cycle.after_telemetry()).await;

        if self.is_linked() {
            self.publish_location().await?;
        } else {
            debug!("Not connected, dropping location");
        }
        sleep(self.cycle.after_location()).await;

        if self.is_linked() {
            self.publish_heartbeat().await?;
        } else {
            debug!("Not connected, dropping heartbeat");
        }
        sleep(self.cycle.after_heartbeat()).await;

        Ok(())
    }

    /// 无限循环发送，只在发布失败时返回
    pub async fn run_cycle(&mut self) -> Result<()> {
        loop {
            self.run_round().await?;
        }
    }

    /// 循环发送直到 `shutdown` 完成，然后执行离线流程
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ShutdownSignal>,
    {
        let signal = tokio::select! {
            result = self.run_cycle() => return result,
            signal = shutdown => signal,
        };

        info!(?signal, "Stopping");
        self.shutdown().await
    }

    /// 发送离线消息，等待片刻后断开
    ///
    /// 离线消息和断开请求各自最多等待 `disconnect_timeout`，
    /// 发送队列堵塞（broker 不可达）时照样返回。
    pub async fn shutdown(&self) -> Result<()> {
        let limit = self.cycle.disconnect_timeout();

        match timeout(limit, self.publish_offline()).await {
            Ok(sent) => {
                sent?;
                sleep(self.cycle.shutdown_linger()).await;
            }
            Err(_) => warn!(timeout = ?limit, "Offline status not queued in time, giving up"),
        }

        match timeout(limit, self.publisher.sink().disconnect()).await {
            Ok(disconnected) => disconnected,
            Err(_) => {
                warn!(timeout = ?limit, "Disconnect not queued in time, giving up");
                Ok(())
            }
        }
    }
}
