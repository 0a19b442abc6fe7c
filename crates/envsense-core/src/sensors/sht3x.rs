use crate::bus::TwoWire;
use crate::config::{ClimateConfig, SHT3X_ADDRESS};
use crate::sensors::{SensorError, SensorReadings};

use super::Sensor;
use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use log::{debug, info, warn};

/// Single-shot, high repeatability, clock stretching enabled.
/// The bus only takes one byte per write, so it goes out as two writes.
pub const MEASURE_COMMAND: [u8; 2] = [0x2C, 0x06];

/// `[t_hi, t_lo, t_crc, h_hi, h_lo, h_crc]`
pub const FRAME_LEN: usize = 6;

const SENSOR: &str = "SHT3x";

/// Convert a raw 16-bit temperature word to °C.
pub fn temperature_from_raw(raw: u16) -> f32 {
    ((raw as f64 * 175.0) / 65535.0 - 45.0) as f32
}

/// Convert a raw 16-bit humidity word to %RH.
pub fn humidity_from_raw(raw: u16) -> f32 {
    ((raw as f64 * 100.0) / 65535.0) as f32
}

/// One measurement response as it came off the bus.
///
/// The CRC bytes are kept but not checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sht3xFrame([u8; FRAME_LEN]);

impl Sht3xFrame {
    pub const fn new(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    pub const fn raw_temperature(&self) -> u16 {
        u16::from_be_bytes([self.0[0], self.0[1]])
    }

    pub const fn temperature_crc(&self) -> u8 {
        self.0[2]
    }

    pub const fn raw_humidity(&self) -> u16 {
        u16::from_be_bytes([self.0[3], self.0[4]])
    }

    pub const fn humidity_crc(&self) -> u8 {
        self.0[5]
    }

    pub fn temperature(&self) -> f32 {
        temperature_from_raw(self.raw_temperature())
    }

    pub fn humidity(&self) -> f32 {
        humidity_from_raw(self.raw_humidity())
    }
}

/// Typed readings from the SHT3x sensor.
pub struct Sht3xReadings {
    pub temperature_milli_celsius: i32,
    pub humidity_milli_percent: i32,
}

impl SensorReadings<2> for Sht3xReadings {
    fn to_array(self) -> [i32; 2] {
        [self.temperature_milli_celsius, self.humidity_milli_percent]
    }
}

/// SHT3x temperature/humidity sensor on a [`TwoWire`] bus.
///
/// Holds the last converted temperature and humidity; both start at 0.0 and
/// are only overwritten by a measurement cycle that received a full frame.
pub struct Sht3xSensor<B, D> {
    bus: B,
    delay: D,
    data_pin: u8,
    clock_pin: u8,
    conversion_delay_ms: u32,
    temperature: f32,
    humidity: f32,
}

impl<B: TwoWire, D: DelayNs> Sht3xSensor<B, D> {
    pub fn new(bus: B, delay: D, data_pin: u8, clock_pin: u8) -> Self {
        Self::with_config(bus, delay, &ClimateConfig::new(data_pin, clock_pin))
    }

    pub fn with_config(bus: B, delay: D, config: &ClimateConfig) -> Self {
        Self {
            bus,
            delay,
            data_pin: config.data_pin,
            clock_pin: config.clock_pin,
            conversion_delay_ms: config.conversion_delay_ms,
            temperature: 0.0,
            humidity: 0.0,
        }
    }

    /// Bind the bus to the configured pins. Call once before any update.
    pub fn init(&mut self) {
        self.bus.begin(self.data_pin, self.clock_pin);
        info!(
            "{}: bus ready at {:#04x} (SDA={}, SCL={})",
            SENSOR, SHT3X_ADDRESS, self.data_pin, self.clock_pin
        );
    }

    /// Run one measurement cycle.
    ///
    /// A short read is logged and otherwise ignored: the previous temperature
    /// and humidity stay in place.
    pub async fn update(&mut self) {
        if let Err(e) = self.try_update().await {
            warn!("{}; keeping previous readings", e);
        }
    }

    /// Run one measurement cycle, reporting a short read as an error.
    ///
    /// State is handled exactly as in [`update`](Self::update): nothing is
    /// overwritten unless a full frame arrived.
    pub async fn try_update(&mut self) -> Result<(), SensorError> {
        let frame = self.measure().await?;

        self.temperature = frame.temperature();
        self.humidity = frame.humidity();

        debug!(
            "{}: {} C, {} %RH (raw {:#06x}/{:#06x})",
            SENSOR,
            self.temperature,
            self.humidity,
            frame.raw_temperature(),
            frame.raw_humidity()
        );

        Ok(())
    }

    async fn measure(&mut self) -> Result<Sht3xFrame, SensorError> {
        self.bus.begin_transmission(SHT3X_ADDRESS);
        for byte in MEASURE_COMMAND {
            self.bus.write(byte);
        }
        if let Err(e) = self.bus.end_transmission().await {
            // A sensor that missed the command will not answer; the request
            // below turns that into a short read.
            warn!("{}: measurement command failed: {}", SENSOR, e);
        }

        self.delay.delay_ms(self.conversion_delay_ms).await;

        self.bus.request_from(SHT3X_ADDRESS, FRAME_LEN).await;

        let received = self.bus.available();
        let short_read = SensorError::ShortRead {
            sensor: SENSOR,
            expected: FRAME_LEN,
            received,
        };
        if received != FRAME_LEN {
            return Err(short_read);
        }

        let mut bytes = [0u8; FRAME_LEN];
        for byte in bytes.iter_mut() {
            *byte = self.bus.read().ok_or(short_read)?;
        }

        Ok(Sht3xFrame(bytes))
    }

    /// Last temperature in °C.
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Last relative humidity in %.
    pub fn humidity(&self) -> f32 {
        self.humidity
    }

    pub const fn address(&self) -> u8 {
        SHT3X_ADDRESS
    }

    /// `(data, clock)` pin pair.
    pub fn pins(&self) -> (u8, u8) {
        (self.data_pin, self.clock_pin)
    }

    pub fn conversion_delay(&self) -> Duration {
        Duration::from_millis(self.conversion_delay_ms as u64)
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn release(self) -> (B, D) {
        (self.bus, self.delay)
    }
}

impl<B: TwoWire, D: DelayNs> Sensor<2> for Sht3xSensor<B, D> {
    type Readings = Sht3xReadings;

    async fn read(&mut self) -> Result<Sht3xReadings, SensorError> {
        self.try_update().await?;

        Ok(Sht3xReadings {
            temperature_milli_celsius: (self.temperature * 1000.0) as i32,
            humidity_milli_percent: (self.humidity * 1000.0) as i32,
        })
    }
}
