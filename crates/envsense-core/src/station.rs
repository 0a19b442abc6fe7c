//! One acquisition pass over both sensors.
//!
//! The application owns the loop and the clock; [`Station::sample`] is the
//! body of that loop. Each sensor writes into its own slots of a persistent
//! value array, so a sensor that fails a read simply leaves its last values
//! in the next sample.

use embedded_hal_async::delay::DelayNs;
use log::warn;

use crate::analog::AnalogInput;
use crate::bus::TwoWire;
use crate::config::{ConfigError, StationConfig};
use crate::sample::RawSample;
use crate::sensors::{
    MAX_SENSORS, Sht3xIndexed, Sht3xSensor, Temt6000Indexed, Temt6000Sensor,
};

pub struct Station<B, D, A>
where
    B: TwoWire,
    D: DelayNs,
    A: AnalogInput,
{
    climate: Sht3xIndexed<B, D>,
    light: Temt6000Indexed<A>,
    values: [i32; MAX_SENSORS],
    climate_failures: u32,
}

impl<B, D, A> Station<B, D, A>
where
    B: TwoWire,
    D: DelayNs,
    A: AnalogInput,
{
    /// Build both sensors from `config`. Fails on filter tuning that would
    /// make the light estimate NaN.
    pub fn new(bus: B, delay: D, adc: A, config: &StationConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            climate: Sht3xSensor::with_config(bus, delay, &config.climate).into(),
            light: Temt6000Sensor::with_config(adc, &config.light)?.into(),
            values: [0; MAX_SENSORS],
            climate_failures: 0,
        })
    }

    /// Bind the climate sensor's bus. Call once before sampling.
    pub fn init(&mut self) {
        self.climate.sensor_mut().init();
    }

    /// Read both sensors and return the resulting sample.
    pub async fn sample(&mut self, timestamp: u32) -> RawSample {
        if let Err(e) = self.climate.read_into(&mut self.values).await {
            self.climate_failures = self.climate_failures.saturating_add(1);
            warn!(
                "{}; reporting previous climate values ({} failures so far)",
                e, self.climate_failures
            );
        }

        if let Err(e) = self.light.read_into(&mut self.values).await {
            warn!("{}; reporting previous light value", e);
        }

        RawSample::new(timestamp, self.values)
    }

    /// Number of climate reads that did not return a full frame.
    pub fn climate_failures(&self) -> u32 {
        self.climate_failures
    }

    pub fn climate(&self) -> &Sht3xSensor<B, D> {
        self.climate.sensor()
    }

    pub fn light(&self) -> &Temt6000Sensor<A> {
        self.light.sensor()
    }
}
