//! Bus opening capability.

use embedded_hal::i2c::ErrorType;

/// Opens an I2C bus by its platform name, e.g. `/dev/i2c-1` on Linux.
///
/// The opened bus is handed to the driver, which owns it until
/// [`PCF8523::close`](crate::PCF8523::close) gives it back. Failures are
/// reported in the bus's own error type so they can travel inside
/// [`PCF8523Error::BusOpen`](crate::PCF8523Error::BusOpen).
pub trait OpenBus {
    /// The bus type produced. Either a blocking or an async I2C bus.
    type Bus: ErrorType;

    /// Opens the bus named `path`.
    fn open(&mut self, path: &str) -> Result<Self::Bus, <Self::Bus as ErrorType>::Error>;
}
