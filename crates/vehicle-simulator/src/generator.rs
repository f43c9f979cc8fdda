use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vehicle_config::ReadingsConfig;
use vehicle_types::{LocationMessage, TelemetryMessage};

/// 航向角取值上限（不含）
pub const DIRECTION_LIMIT: u32 = 360;

/// 模拟数据生成器
///
/// 取值范围来自 [`ReadingsConfig`]，调用方需保证配置已通过验证。
pub struct ReadingGenerator<R = StdRng> {
    readings: ReadingsConfig,
    rng: R,
}

impl ReadingGenerator<StdRng> {
    pub fn from_entropy(readings: ReadingsConfig) -> Self {
        Self::new(readings, StdRng::from_entropy())
    }
}

impl<R: Rng> ReadingGenerator<R> {
    pub fn new(readings: ReadingsConfig, rng: R) -> Self {
        Self { readings, rng }
    }

    /// 生成一条传感器数据
    pub fn telemetry(&mut self, timestamp: i64) -> TelemetryMessage {
        let r = &self.readings;
        TelemetryMessage {
            speed: self.rng.gen_range(r.speed.min..=r.speed.max),
            rpm: self.rng.gen_range(r.rpm.min..=r.rpm.max),
            fuel: self.rng.gen_range(r.fuel.min..=r.fuel.max),
            temperature: self.rng.gen_range(r.temperature.min..=r.temperature.max),
            timestamp,
        }
    }

    /// 生成一条位置数据：基准坐标加上 [-drift, drift] 的均匀偏移
    pub fn location(&mut self, timestamp: i64) -> LocationMessage {
        let drift = self.readings.gps_drift;
        let lat = self.readings.base_lat + self.rng.gen_range(-drift..=drift);
        let lng = self.readings.base_lng + self.rng.gen_range(-drift..=drift);

        LocationMessage {
            lat,
            lng,
            speed: self
                .rng
                .gen_range(self.readings.speed.min..=self.readings.speed.max),
            direction: self.rng.gen_range(0..DIRECTION_LIMIT),
            timestamp,
        }
    }
}
