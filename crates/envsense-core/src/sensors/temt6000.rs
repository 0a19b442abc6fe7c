use crate::analog::{ADC_FULL_SCALE, AnalogInput};
use crate::config::{ConfigError, LightConfig};
use crate::filter::ScalarKalman;
use crate::sensors::{SensorError, SensorReadings};

use super::Sensor;
use log::{debug, info};

pub struct LightReadings {
    /// Filtered light level in millionths of full scale.
    pub micro_level: i32,
}

impl SensorReadings<1> for LightReadings {
    fn to_array(self) -> [i32; 1] {
        [self.micro_level]
    }
}

/// TEMT6000 ambient light sensor on an analog input, smoothed by a scalar
/// Kalman filter.
pub struct Temt6000Sensor<A> {
    adc: A,
    pin: u8,
    filter: ScalarKalman,
}

impl<A: AnalogInput> Temt6000Sensor<A> {
    /// Create the sensor with the deployed filter tuning and switch `pin` to
    /// analog input right away.
    pub fn new(adc: A, pin: u8) -> Self {
        Self::with_filter(adc, pin, ScalarKalman::default())
    }

    /// Create the sensor with the tuning from `config`.
    pub fn with_config(adc: A, config: &LightConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let filter = ScalarKalman::new(
            config.process_variance,
            config.measurement_variance,
            config.initial_estimate,
        )?;

        Ok(Self::with_filter(adc, config.pin, filter))
    }

    fn with_filter(mut adc: A, pin: u8, filter: ScalarKalman) -> Self {
        adc.configure_input(pin);
        info!(
            "TEMT6000: analog input on pin {} (q={}, r={})",
            pin,
            filter.process_variance(),
            filter.measurement_variance()
        );

        Self { adc, pin, filter }
    }

    /// Sample the input once and return the updated estimate.
    pub fn read(&mut self) -> f32 {
        let raw = self.adc.read_raw(self.pin);
        let measurement = raw as f64 / ADC_FULL_SCALE as f64;
        let estimate = self.filter.step(measurement);

        debug!(
            "TEMT6000: raw {} -> {:.4}, estimate {:.4} (k={:.4})",
            raw,
            measurement,
            estimate,
            self.filter.gain()
        );

        estimate
    }

    /// Last estimate, without sampling.
    pub fn estimate(&self) -> f32 {
        self.filter.estimate()
    }

    pub fn filter(&self) -> &ScalarKalman {
        &self.filter
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn release(self) -> A {
        self.adc
    }
}

impl<A: AnalogInput> Sensor<1> for Temt6000Sensor<A> {
    type Readings = LightReadings;

    async fn read(&mut self) -> Result<LightReadings, SensorError> {
        let estimate = Temt6000Sensor::read(self);

        Ok(LightReadings {
            micro_level: (estimate * 1_000_000.0) as i32,
        })
    }
}
