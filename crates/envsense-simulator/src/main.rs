//! Desktop simulator for the envsense acquisition pipeline.
//!
//! Runs the real `envsense-core` station against a simulated SHT3x on an I2C
//! bus and a simulated TEMT6000 on a noisy 12-bit ADC, and logs each encoded
//! sample. The simulated SHT3x drops every few reads so the stale-value path
//! can be watched in the log.
//!
//! # Usage
//!
//! ```text
//! RUST_LOG=debug envsense-simulator [samples] [interval_ms]
//! ```

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use embassy_futures::block_on;
use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{ErrorType, I2c, Operation};
use log::{debug, error, info};

use envsense_core::config::SHT3X_ADDRESS;
use envsense_core::sample::MAX_ENCODED_LEN;
use envsense_core::sensors::MEASURE_COMMAND;
use envsense_core::{AnalogInput, I2cWire, Station, StationConfig};

// ---------------------------------------------------------------------------
// Simulation constants
// ---------------------------------------------------------------------------

const DEFAULT_SAMPLES: u32 = 20;
const DEFAULT_INTERVAL_MS: u64 = 250;

/// Every n-th SHT3x read is not acknowledged.
const SHT3X_DROPOUT_EVERY: u32 = 7;

/// Peak-to-peak ADC noise, as a fraction of full scale.
const LIGHT_NOISE: f64 = 0.2;

// ---------------------------------------------------------------------------
// Simulated environment
// ---------------------------------------------------------------------------

/// Simulated seconds, shared by every device so they see the same world.
#[derive(Clone, Default)]
struct SimClock(Rc<Cell<f64>>);

impl SimClock {
    fn now(&self) -> f64 {
        self.0.get()
    }

    fn advance(&self, dt_secs: f64) {
        self.0.set(self.0.get() + dt_secs);
    }
}

fn true_temperature(t: f64) -> f64 {
    23.0 + 3.0 * (t / 120.0).sin() + 0.5 * (t / 37.0).cos()
}

fn true_humidity(t: f64) -> f64 {
    50.0 + 10.0 * (t / 180.0).sin() + 2.0 * (t / 23.0).cos()
}

fn true_light(t: f64) -> f64 {
    0.5 + 0.3 * (t / 60.0).sin()
}

// ---------------------------------------------------------------------------
// Simulated SHT3x
// ---------------------------------------------------------------------------

/// CRC-8 used by Sensirion parts (poly 0x31, init 0xFF).
fn sensirion_crc(bytes: [u8; 2]) -> u8 {
    let mut crc = 0xFFu8;
    for byte in bytes {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}

fn to_ticks(value: f64, offset: f64, span: f64) -> u16 {
    (((value + offset) / span) * 65535.0).round().clamp(0.0, 65535.0) as u16
}

/// An SHT3x answering single-shot measurements on a simulated I2C bus.
struct SimulatedSht3x {
    address: u8,
    clock: SimClock,
    pending: Option<[u8; 6]>,
    reads: u32,
}

impl SimulatedSht3x {
    fn new(address: u8, clock: SimClock) -> Self {
        Self {
            address,
            clock,
            pending: None,
            reads: 0,
        }
    }

    fn latch_measurement(&mut self) {
        let t = self.clock.now();
        let temp = to_ticks(true_temperature(t), 45.0, 175.0).to_be_bytes();
        let hum = to_ticks(true_humidity(t), 0.0, 100.0).to_be_bytes();

        self.pending = Some([
            temp[0],
            temp[1],
            sensirion_crc(temp),
            hum[0],
            hum[1],
            sensirion_crc(hum),
        ]);
    }
}

impl ErrorType for SimulatedSht3x {
    type Error = ErrorKind;
}

impl I2c for SimulatedSht3x {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != self.address {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }

        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    if *bytes == MEASURE_COMMAND.as_slice() {
                        self.latch_measurement();
                    } else {
                        return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data));
                    }
                }
                Operation::Read(buffer) => {
                    self.reads += 1;
                    if self.reads % SHT3X_DROPOUT_EVERY == 0 {
                        debug!("Simulated SHT3x: dropping read #{}", self.reads);
                        return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
                    }

                    let frame = self
                        .pending
                        .take()
                        .ok_or(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))?;
                    let len = buffer.len().min(frame.len());
                    buffer[..len].copy_from_slice(&frame[..len]);
                }
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Simulated TEMT6000 ADC
// ---------------------------------------------------------------------------

/// 12-bit ADC sampling the simulated light level with uniform noise.
struct SimulatedLightAdc {
    clock: SimClock,
    configured: Option<u8>,
    rng: u32,
}

impl SimulatedLightAdc {
    fn new(clock: SimClock) -> Self {
        Self {
            clock,
            configured: None,
            rng: 0x2545_F491,
        }
    }

    /// xorshift32, mapped to [-0.5, 0.5).
    fn noise(&mut self) -> f64 {
        self.rng ^= self.rng << 13;
        self.rng ^= self.rng >> 17;
        self.rng ^= self.rng << 5;
        self.rng as f64 / u32::MAX as f64 - 0.5
    }
}

impl AnalogInput for SimulatedLightAdc {
    fn configure_input(&mut self, pin: u8) {
        info!("Simulated ADC: pin {} in analog mode", pin);
        self.configured = Some(pin);
    }

    fn read_raw(&mut self, pin: u8) -> u16 {
        if self.configured != Some(pin) {
            log::warn!("Simulated ADC: pin {} read before configuration", pin);
        }

        let level = true_light(self.clock.now()) + LIGHT_NOISE * self.noise();
        (level * 4095.0).round().clamp(0.0, 4095.0) as u16
    }
}

// ---------------------------------------------------------------------------
// Host delay
// ---------------------------------------------------------------------------

struct StdDelay;

impl DelayNs for StdDelay {
    async fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(ns as u64));
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn parse_arg<T: std::str::FromStr>(index: usize, default: T) -> T {
    std::env::args()
        .nth(index)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(default)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let samples: u32 = parse_arg(1, DEFAULT_SAMPLES);
    let interval_ms: u64 = parse_arg(2, DEFAULT_INTERVAL_MS);

    let config = StationConfig::default();
    let clock = SimClock::default();

    let wire = I2cWire::new(SimulatedSht3x::new(SHT3X_ADDRESS, clock.clone()));
    let adc = SimulatedLightAdc::new(clock.clone());
    let mut station = match Station::new(wire, StdDelay, adc, &config) {
        Ok(station) => station,
        Err(e) => {
            error!("Invalid station config: {}", e);
            return;
        }
    };
    station.init();

    info!(
        "Sampling {} times every {} ms (SHT3x dropout every {} reads)",
        samples, interval_ms, SHT3X_DROPOUT_EVERY
    );

    let mut buf = [0u8; MAX_ENCODED_LEN];
    for _ in 0..samples {
        clock.advance(interval_ms as f64 / 1000.0);

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as u32;

        let sample = block_on(station.sample(timestamp));
        let t = clock.now();

        match sample.encode(&mut buf) {
            Ok(frame) => info!(
                "{:>6.2}s  T={:>6.2}C (true {:>6.2})  RH={:>6.2}% (true {:>6.2})  light={:.3} (true {:.3})  [{} bytes]",
                t,
                sample.temperature_c(),
                true_temperature(t),
                sample.humidity_pct(),
                true_humidity(t),
                sample.light(),
                true_light(t),
                frame.len()
            ),
            Err(e) => error!("Failed to encode sample: {}", e),
        }

        std::thread::sleep(Duration::from_millis(interval_ms));
    }

    info!(
        "Done: {} of {} climate reads fell back to previous values",
        station.climate_failures(),
        samples
    );
}
