use clap::Parser;
use tracing::{info, warn};
use vehicle_shutdown::SignalHandler;

mod args;
mod logging;

use args::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = args.load_config()?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    logging::init(&config.logging)?;

    info!("IoT Vehicle Platform - MQTT test client");
    info!(
        device_id = %config.device.device_id,
        broker = %format!("{}:{}", config.mqtt.broker, config.mqtt.port),
        "Starting simulator"
    );
    // 加载配置时日志尚未初始化，缺失的配置文件在这里提示
    if let Some(path) = args.config.as_ref().filter(|p| !p.exists()) {
        warn!("Config file {:?} not found, using defaults", path);
    }

    let (signals, _rx) = SignalHandler::new();
    let _listener = signals.listen();

    vehicle_simulator::run(config, signals).await?;
    info!("Simulator stopped");
    Ok(())
}
