use rumqttc::{AsyncClient, MqttOptions};
use tokio::time::timeout;
use tracing::{error, info, warn};
use vehicle_config::SimulatorConfig;
use vehicle_shutdown::{ShutdownSignal, SignalHandler};

use crate::connection::{wait_for_outcome, ConnectionState, ConnectionTask};
use crate::error::{Result, SimulatorError};
use crate::simulator::DeviceSimulator;
use crate::sink::{qos_from_level, MqttSink};

/// 根据配置构建 MQTT 连接参数，设备 ID 作为 client id
pub fn mqtt_options(config: &SimulatorConfig) -> MqttOptions {
    let mut options = MqttOptions::new(
        config.device.device_id.clone(),
        config.mqtt.broker.clone(),
        config.mqtt.port,
    );
    options.set_keep_alive(config.mqtt.keep_alive());
    // 认证未启用，secret_key 不会作为凭据发送
    options
}

/// 运行模拟器直到收到关闭信号
///
/// 先等待第一次连接结果（或关闭信号），再进入发送循环。
/// 连接失败只记录返回码，发送循环照常运行，但在连上之前不发送周期消息。
pub async fn run(config: SimulatorConfig, signals: SignalHandler) -> Result<()> {
    config
        .validate()
        .map_err(|e| SimulatorError::invalid_config(e.to_string()))?;

    // 先订阅，避免错过启动阶段的信号
    let mut shutdown_rx = signals.subscribe();
    let shutdown = async move { shutdown_rx.recv().await.unwrap_or(ShutdownSignal::Manual) };
    tokio::pin!(shutdown);

    let (client, eventloop) = AsyncClient::new(mqtt_options(&config), config.mqtt.request_capacity);
    let sink = MqttSink::new(client, qos_from_level(config.mqtt.qos));
    let simulator = DeviceSimulator::new(
        sink,
        &config.device,
        config.readings.clone(),
        config.cycle.clone(),
    );

    info!(
        broker = %config.mqtt.broker,
        port = config.mqtt.port,
        device_id = %config.device.device_id,
        "Connecting to broker"
    );

    let (task, mut state_rx) =
        ConnectionTask::new(eventloop, simulator.publisher(), config.mqtt.error_pause());
    let mut connection = task.spawn();
    // 未连接时丢弃周期消息，重连后上线消息不会排在积压的数据之后
    let mut simulator = simulator.with_link(state_rx.clone());

    let early_signal = tokio::select! {
        state = wait_for_outcome(&mut state_rx) => {
            report_outcome(&state);
            None
        }
        signal = &mut shutdown => Some(signal),
    };

    let result = match early_signal {
        Some(signal) => {
            info!(?signal, "Shutdown requested before the connection settled");
            simulator.shutdown().await
        }
        None => simulator.run_until(&mut shutdown).await,
    };

    if let Err(e) = result {
        connection.abort();
        return Err(e);
    }

    match timeout(config.cycle.disconnect_timeout(), &mut connection).await {
        Ok(joined) => joined?,
        Err(_) => {
            warn!(
                timeout = ?config.cycle.disconnect_timeout(),
                "Connection task did not finish in time"
            );
            connection.abort();
        }
    }

    info!(device_id = %config.device.device_id, "Disconnected");
    Ok(())
}

fn report_outcome(state: &ConnectionState) {
    match state {
        ConnectionState::Connected => info!("Connection established"),
        ConnectionState::Refused(code) => {
            error!(code = *code, "Connection failed, continuing without retry of our own")
        }
        ConnectionState::Failed(reason) => {
            error!(reason = %reason, "Connection failed, continuing without retry of our own")
        }
        ConnectionState::Connecting => {}
    }
}
