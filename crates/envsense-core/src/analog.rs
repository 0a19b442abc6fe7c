//! Analog input shim
//!
//! The light estimator only needs two things from the platform's ADC: a way to
//! put a pin into analog mode and a way to take one raw sample from it.
//! `embedded-hal` 1.0 has no ADC trait, so platforms implement this one.

/// Largest raw sample a 12-bit converter can report.
pub const ADC_FULL_SCALE: u16 = 4095;

/// One-shot analog input driver.
pub trait AnalogInput {
    /// Configure `pin` as an analog input.
    fn configure_input(&mut self, pin: u8);

    /// Take one raw sample from `pin`.
    ///
    /// Samples are expected in `[0, ADC_FULL_SCALE]`; callers do not bounds
    /// check them.
    fn read_raw(&mut self, pin: u8) -> u16;
}

impl<T: AnalogInput + ?Sized> AnalogInput for &mut T {
    #[inline]
    fn configure_input(&mut self, pin: u8) {
        T::configure_input(self, pin)
    }

    #[inline]
    fn read_raw(&mut self, pin: u8) -> u16 {
        T::read_raw(self, pin)
    }
}
