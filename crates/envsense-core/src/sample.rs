//! Sample record handed to the reporting side of the application.
//!
//! Values are fixed-point `i32`s laid out by [`crate::sensors::indices`] so a
//! sample has a fixed size and can go straight onto a wire or into flash.

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::sensors::{HUMIDITY, LIGHT, MAX_SENSORS, TEMPERATURE};

/// Upper bound on an encoded [`RawSample`].
pub const MAX_ENCODED_LEN: usize = 5 + MAX_SENSORS * 5;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SampleError {
    #[error("Buffer too small for encoded sample")]
    BufferTooSmall,
    #[error("Malformed sample bytes")]
    Malformed,
}

impl From<postcard::Error> for SampleError {
    fn from(e: postcard::Error) -> Self {
        match e {
            postcard::Error::SerializeBufferFull => SampleError::BufferTooSmall,
            _ => SampleError::Malformed,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawSample {
    /// Seconds, in whatever epoch the caller uses.
    pub timestamp: u32,
    pub values: [i32; MAX_SENSORS],
}

impl RawSample {
    pub const fn new(timestamp: u32, values: [i32; MAX_SENSORS]) -> Self {
        Self { timestamp, values }
    }

    pub fn temperature_c(&self) -> f32 {
        self.values[TEMPERATURE] as f32 / 1000.0
    }

    pub fn humidity_pct(&self) -> f32 {
        self.values[HUMIDITY] as f32 / 1000.0
    }

    /// Filtered light level as a fraction of full scale.
    pub fn light(&self) -> f32 {
        self.values[LIGHT] as f32 / 1_000_000.0
    }

    /// Encode into `buf` and return the used prefix.
    pub fn encode<'b>(&self, buf: &'b mut [u8]) -> Result<&'b mut [u8], SampleError> {
        Ok(postcard::to_slice(self, buf)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SampleError> {
        Ok(postcard::from_bytes(bytes)?)
    }
}
