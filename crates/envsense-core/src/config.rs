use embassy_time::Duration;
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

/// 7-bit bus address of the SHT3x with its ADDR pin tied low.
pub const SHT3X_ADDRESS: u8 = 0x44;

/// Conversion wait after the measurement command.
///
/// The datasheet worst case is far longer; the short wait is kept because
/// the deployed firmware has always used it.
pub const DEFAULT_CONVERSION_DELAY_MS: u32 = 10;

pub const DEFAULT_PROCESS_VARIANCE: f32 = 0.001;
pub const DEFAULT_MEASUREMENT_VARIANCE: f32 = 0.01;
pub const DEFAULT_INITIAL_ESTIMATE: f32 = 0.1;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ConfigError {
    #[error("Process variance must be positive and finite (got {0})")]
    ProcessVariance(f32),
    #[error("Measurement variance must be positive and finite (got {0})")]
    MeasurementVariance(f32),
    #[error("Initial estimate must be finite (got {0})")]
    InitialEstimate(f32),
    #[error("Malformed config bytes")]
    Malformed,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct StationConfig {
    pub climate: ClimateConfig,
    pub light: LightConfig,
}

impl StationConfig {
    /// Decode a config previously written with `postcard` and check it.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Malformed)?;
        config.validate()?;
        Ok(config)
    }

    /// Encode into `buf`, returning the used prefix.
    pub fn to_slice<'b>(&self, buf: &'b mut [u8]) -> Result<&'b mut [u8], postcard::Error> {
        postcard::to_slice(self, buf)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.light.validate()
    }
}

/// SHT3x wiring and timing. The bus address is fixed at [`SHT3X_ADDRESS`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClimateConfig {
    pub data_pin: u8,
    pub clock_pin: u8,
    pub conversion_delay_ms: u32,
}

impl ClimateConfig {
    pub const fn new(data_pin: u8, clock_pin: u8) -> Self {
        Self {
            data_pin,
            clock_pin,
            conversion_delay_ms: DEFAULT_CONVERSION_DELAY_MS,
        }
    }

    pub const fn conversion_delay(&self) -> Duration {
        Duration::from_millis(self.conversion_delay_ms as u64)
    }
}

impl Default for ClimateConfig {
    fn default() -> Self {
        // ESP8266 D2/D1, the usual I2C pair on the node boards.
        Self::new(4, 5)
    }
}

/// TEMT6000 input and Kalman tuning.
///
/// Samples are always normalized by [`crate::analog::ADC_FULL_SCALE`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct LightConfig {
    pub pin: u8,
    /// Process variance `q`, must be > 0.
    pub process_variance: f32,
    /// Measurement variance `r`, must be > 0.
    pub measurement_variance: f32,
    /// Seed for the estimate `x`.
    pub initial_estimate: f32,
}

impl LightConfig {
    pub const fn new(pin: u8) -> Self {
        Self {
            pin,
            process_variance: DEFAULT_PROCESS_VARIANCE,
            measurement_variance: DEFAULT_MEASUREMENT_VARIANCE,
            initial_estimate: DEFAULT_INITIAL_ESTIMATE,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let q = self.process_variance;
        let r = self.measurement_variance;

        if !(q.is_finite() && q > 0.0) {
            return Err(ConfigError::ProcessVariance(q));
        }
        if !(r.is_finite() && r > 0.0) {
            return Err(ConfigError::MeasurementVariance(r));
        }
        if !self.initial_estimate.is_finite() {
            return Err(ConfigError::InitialEstimate(self.initial_estimate));
        }
        Ok(())
    }
}

impl Default for LightConfig {
    fn default() -> Self {
        // A0 on the ESP8266 board package.
        Self::new(17)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(config: &StationConfig, buf: &mut [u8]) -> usize {
        config.to_slice(buf).unwrap().len()
    }

    #[test]
    fn test_defaults_match_deployed_firmware() {
        let config = StationConfig::default();

        assert_eq!(config.climate.conversion_delay_ms, 10);
        assert_eq!(config.climate.conversion_delay(), Duration::from_millis(10));
        assert_eq!(config.light.process_variance, 0.001);
        assert_eq!(config.light.measurement_variance, 0.01);
        assert_eq!(config.light.initial_estimate, 0.1);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_config_postcard_roundtrip() {
        let mut config = StationConfig::default();
        config.climate.conversion_delay_ms = 500;
        config.light.pin = 34;

        let mut buf = [0u8; 64];
        let used = encode(&config, &mut buf);
        let decoded = StationConfig::from_bytes(&buf[..used]).unwrap();

        assert_eq!(decoded, config);
    }

    #[test]
    fn test_truncated_config_is_rejected() {
        let mut buf = [0u8; 64];
        let used = encode(&StationConfig::default(), &mut buf);

        assert_eq!(
            StationConfig::from_bytes(&buf[..used - 1]),
            Err(ConfigError::Malformed)
        );
    }

    #[test]
    fn test_zero_variances_are_rejected_on_decode() {
        let mut buf = [0u8; 64];

        let mut config = StationConfig::default();
        config.light.process_variance = 0.0;
        let used = encode(&config, &mut buf);
        assert_eq!(
            StationConfig::from_bytes(&buf[..used]),
            Err(ConfigError::ProcessVariance(0.0))
        );

        let mut config = StationConfig::default();
        config.light.measurement_variance = 0.0;
        let used = encode(&config, &mut buf);
        assert_eq!(
            StationConfig::from_bytes(&buf[..used]),
            Err(ConfigError::MeasurementVariance(0.0))
        );
    }

    #[test]
    fn test_negative_and_nan_tuning_is_rejected() {
        let mut light = LightConfig::default();
        light.process_variance = -0.001;
        assert_eq!(light.validate(), Err(ConfigError::ProcessVariance(-0.001)));

        let mut light = LightConfig::default();
        light.measurement_variance = f32::NAN;
        assert!(matches!(
            light.validate(),
            Err(ConfigError::MeasurementVariance(r)) if r.is_nan()
        ));

        let mut light = LightConfig::default();
        light.initial_estimate = f32::INFINITY;
        assert_eq!(
            light.validate(),
            Err(ConfigError::InitialEstimate(f32::INFINITY))
        );
    }
}
