mod sht3x;
mod temt6000;

use core::marker::PhantomData;
use thiserror_no_std::Error;

pub use sht3x::{
    FRAME_LEN, MEASURE_COMMAND, Sht3xFrame, Sht3xReadings, Sht3xSensor, humidity_from_raw,
    temperature_from_raw,
};
pub use temt6000::{LightReadings, Temt6000Sensor};

/// Number of values stored per sample.
pub const MAX_SENSORS: usize = 3;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The sensor did not answer with exactly one full frame.
    #[error("{sensor}: short read ({received} bytes, expected {expected})")]
    ShortRead {
        sensor: &'static str,
        expected: usize,
        received: usize,
    },
}

/// Trait for sensor reading data structures.
/// Provides compile-time guarantees about the number of values and their conversion to arrays.
pub trait SensorReadings<const COUNT: usize> {
    /// Convert the readings into a fixed-size array of fixed-point values.
    fn to_array(self) -> [i32; COUNT];
}

/// Trait for sensors that produce typed readings.
pub trait Sensor<const COUNT: usize> {
    /// The type of readings this sensor produces.
    type Readings: SensorReadings<COUNT>;

    /// Read the sensor and return typed readings.
    fn read(&mut self) -> impl Future<Output = Result<Self::Readings, SensorError>>;
}

// Type-level index markers
pub struct Idx<const N: usize>;

pub struct IndexedSensor<S, const START: usize, const COUNT: usize>
where
    S: Sensor<COUNT>,
{
    sensor: S,
    _marker: PhantomData<Idx<START>>,
}

impl<S, const START: usize, const COUNT: usize> From<S> for IndexedSensor<S, START, COUNT>
where
    S: Sensor<COUNT>,
{
    fn from(value: S) -> Self {
        Self::new(value)
    }
}

impl<S, const START: usize, const COUNT: usize> IndexedSensor<S, START, COUNT>
where
    S: Sensor<COUNT>,
{
    pub const fn new(sensor: S) -> Self {
        Self {
            sensor,
            _marker: PhantomData,
        }
    }

    /// Read and write to the values array at the correct indices.
    /// On error the slots keep whatever they held before.
    pub async fn read_into(&mut self, values: &mut [i32; MAX_SENSORS]) -> Result<(), SensorError> {
        let readings = self.sensor.read().await?;
        values[START..START + COUNT].copy_from_slice(&readings.to_array());
        Ok(())
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn into_inner(self) -> S {
        self.sensor
    }

    /// Get the starting index where this sensor's data is stored.
    pub const fn start_index() -> usize {
        START
    }

    /// Get the number of values this sensor produces.
    pub const fn value_count() -> usize {
        COUNT
    }

    /// Get the absolute index for a specific reading within this sensor.
    pub const fn reading_index(offset: usize) -> usize {
        START + offset
    }
}

pub mod indices {
    use crate::sensors::{IndexedSensor, Sht3xSensor, Temt6000Sensor};

    // Slot layout of `RawSample::values`. The aliases below are the only thing
    // tying a sensor to its slots, so keep them in step with these constants.
    pub type Sht3xIndexed<B, D> = IndexedSensor<Sht3xSensor<B, D>, 0, 2>;
    pub type Temt6000Indexed<A> = IndexedSensor<Temt6000Sensor<A>, 2, 1>;

    pub const TEMPERATURE: usize = 0;
    pub const HUMIDITY: usize = 1;
    pub const LIGHT: usize = 2;
}

pub use indices::*;

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    struct Fixed<const N: usize>([i32; N]);

    impl<const N: usize> SensorReadings<N> for Fixed<N> {
        fn to_array(self) -> [i32; N] {
            self.0
        }
    }

    struct FakeSensor {
        values: [i32; 2],
        fail: bool,
    }

    impl Sensor<2> for FakeSensor {
        type Readings = Fixed<2>;

        async fn read(&mut self) -> Result<Fixed<2>, SensorError> {
            if self.fail {
                return Err(SensorError::ShortRead {
                    sensor: "fake",
                    expected: 2,
                    received: 0,
                });
            }
            Ok(Fixed(self.values))
        }
    }

    #[test]
    fn test_read_into_writes_declared_slots() {
        let mut indexed = IndexedSensor::<_, 1, 2>::new(FakeSensor {
            values: [7, 8],
            fail: false,
        });
        let mut values = [0; MAX_SENSORS];

        block_on(indexed.read_into(&mut values)).unwrap();

        assert_eq!(values, [0, 7, 8]);
    }

    #[test]
    fn test_failed_read_keeps_previous_slots() {
        let mut indexed = IndexedSensor::<_, 0, 2>::new(FakeSensor {
            values: [1, 2],
            fail: true,
        });
        let mut values = [10, 20, 30];

        let result = block_on(indexed.read_into(&mut values));

        assert!(result.is_err());
        assert_eq!(values, [10, 20, 30]);
    }

    #[test]
    fn test_layout_indices() {
        type Climate = IndexedSensor<FakeSensor, { TEMPERATURE }, 2>;

        assert_eq!(Climate::start_index(), TEMPERATURE);
        assert_eq!(Climate::value_count(), 2);
        assert_eq!(Climate::reading_index(1), HUMIDITY);
        assert_eq!(LIGHT, MAX_SENSORS - 1);
    }
}
