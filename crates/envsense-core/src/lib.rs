//! Hardware-independent core library for envsense
//!
//! This crate contains the acquisition and estimation pipeline for the
//! envsense sensor node: the two-wire bus and analog input shims, the SHT3x
//! temperature/humidity driver, the TEMT6000 light estimator with its scalar
//! Kalman filter, and the sample/config types the surrounding application
//! uses to report readings.
//!
//! It is `#![no_std]` so it compiles on embedded targets; tests run on the host.

#![cfg_attr(not(test), no_std)]

pub mod analog;
pub mod bus;
pub mod config;
pub mod filter;
pub mod sample;
pub mod sensors;
pub mod station;

pub use analog::AnalogInput;
pub use bus::{BusError, I2cWire, TwoWire};
pub use config::{ClimateConfig, ConfigError, LightConfig, StationConfig};
pub use filter::ScalarKalman;
pub use sample::{RawSample, SampleError};
pub use sensors::{Sht3xSensor, Temt6000Sensor};
pub use station::Station;
