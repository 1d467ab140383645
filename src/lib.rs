//! A platform-agnostic driver for the NXP PCF8523 real-time clock.
//!
//! The driver talks to the chip through `embedded-hal` I2C traits and covers
//! reading and setting the time, oscillator stop recovery, power management
//! (battery switchover and battery low detection) and the frequency offset
//! register used for drift correction.
//!
//! # Example
//!
//! ```rust,ignore
//! use pcf8523::{PCF8523, DEFAULT_ADDRESS};
//!
//! // Clears the oscillator stop flag if it is set
//! let mut rtc = PCF8523::new(i2c, DEFAULT_ADDRESS)?;
//!
//! // Enable battery switchover and battery low detection
//! rtc.configure_power_management(true, false, true)?;
//! if rtc.is_battery_low()? {
//!     // replace the coin cell
//! }
//!
//! // Clock runs 2.5 seconds per day slow
//! rtc.reset_time_correction()?;
//! rtc.add_time_correction(2.5)?;
//!
//! let now = rtc.datetime()?;
//! ```
//!
//! # Features
//!
//! - `async`: async driver in [`asynch`] using `embedded-hal-async`
//! - `log`: log through the `log` crate
//! - `defmt`: log through `defmt`
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

#[cfg(feature = "async")]
pub mod asynch;
mod bus;
mod correction;
mod datetime;
mod registers;

use chrono::{DateTime, TimeZone, Utc};
use embedded_hal::i2c::I2c;
use paste::paste;

pub use bus::OpenBus;
pub use correction::{MAX_CORRECTION, MIN_CORRECTION};
pub(crate) use datetime::PCF8523DateTime;
pub use datetime::PCF8523DateTimeError;
pub use registers::*;

/// Fixed I2C address of the PCF8523.
pub const DEFAULT_ADDRESS: u8 = 0x68;

/// Errors reported by the PCF8523 driver.
#[derive(Debug)]
pub enum PCF8523Error<I2CE> {
    /// A bus transaction failed
    I2c(I2CE),
    /// The bus could not be opened
    BusOpen(I2CE),
    /// The oscillator stop flag stayed set after trying to clear it
    OscillatorStopped,
    /// The requested power management combination is reserved by the chip
    InvalidConfiguration,
    /// The driver was closed and no longer owns a bus
    HandleClosed,
    /// Date/time conversion error
    DateTime(PCF8523DateTimeError),
}

impl<I2CE> From<I2CE> for PCF8523Error<I2CE> {
    fn from(e: I2CE) -> Self {
        PCF8523Error::I2c(e)
    }
}

/// PCF8523 Real-Time Clock driver.
///
/// Owns its bus exclusively and keeps no cached device state. It does no
/// internal locking, so callers sharing one driver must serialize access.
pub struct PCF8523<I2C: I2c> {
    i2c: Option<I2C>,
    address: u8,
}

impl<I2C: I2c> PCF8523<I2C> {
    /// Opens the bus named `path` and initializes the device on it.
    ///
    /// # Errors
    /// * `BusOpen` if the bus cannot be opened
    /// * any error from [`PCF8523::new`]; the bus is released in that case
    pub fn open<O>(
        opener: &mut O,
        path: &str,
        address: u8,
    ) -> Result<Self, PCF8523Error<I2C::Error>>
    where
        O: OpenBus<Bus = I2C>,
    {
        let i2c = opener.open(path).map_err(|e| {
            error!("PCF8523: failed to open bus");
            PCF8523Error::BusOpen(e)
        })?;
        Self::new(i2c, address)
    }

    /// Creates a driver on an already opened bus.
    ///
    /// Checks the oscillator stop flag and clears it if set. If the flag
    /// cannot be cleared the time the chip holds is unreliable and
    /// `OscillatorStopped` is returned. On any error the bus is dropped.
    ///
    /// # Arguments
    /// * `i2c` - The I2C bus implementation
    /// * `address` - The I2C address of the device (normally [`DEFAULT_ADDRESS`])
    pub fn new(i2c: I2C, address: u8) -> Result<Self, PCF8523Error<I2C::Error>> {
        let mut dev = Self {
            i2c: Some(i2c),
            address,
        };
        dev.recover_oscillator()?;
        Ok(dev)
    }

    /// Releases the bus and hands it back. Every later call fails with
    /// `HandleClosed`. Returns `None` if already closed.
    pub fn close(&mut self) -> Option<I2C> {
        debug!("PCF8523: closing");
        self.i2c.take()
    }

    fn bus(&mut self) -> Result<&mut I2C, PCF8523Error<I2C::Error>> {
        self.i2c.as_mut().ok_or(PCF8523Error::HandleClosed)
    }

    fn recover_oscillator(&mut self) -> Result<(), PCF8523Error<I2C::Error>> {
        let seconds = self.seconds()?;
        if !seconds.oscillator_stopped() {
            return Ok(());
        }
        warn!("PCF8523: oscillator stop flag set, clearing");
        let mut cleared = seconds;
        cleared.set_oscillator_stopped(false);
        self.set_seconds(cleared)?;

        if self.seconds()?.oscillator_stopped() {
            error!("PCF8523: oscillator stopped");
            return Err(PCF8523Error::OscillatorStopped);
        }
        debug!("PCF8523: oscillator running");
        Ok(())
    }

    /// Reads a single register.
    pub fn read_register(&mut self, reg: RegAddr) -> Result<u8, PCF8523Error<I2C::Error>> {
        let address = self.address;
        let mut data = [0];
        self.bus()?.write_read(address, &[reg as u8], &mut data)?;
        Ok(data[0])
    }

    /// Writes a single register.
    pub fn write_register(
        &mut self,
        reg: RegAddr,
        value: u8,
    ) -> Result<(), PCF8523Error<I2C::Error>> {
        debug!("PCF8523: write register {} = {}", reg as u8, value);
        let address = self.address;
        self.bus()?.write(address, &[reg as u8, value])?;
        Ok(())
    }

    /// Reads the oscillator stop flag.
    pub fn is_oscillator_stopped(&mut self) -> Result<bool, PCF8523Error<I2C::Error>> {
        Ok(self.seconds()?.oscillator_stopped())
    }

    /// Configures power management, clearing every other flag in control 3.
    ///
    /// # Arguments
    /// * `switchover_enabled` - Switch to the battery when main power fails
    /// * `direct_switching_mode` - Switch as soon as Vdd < Vbat instead of at
    ///   the fixed threshold
    /// * `battery_low_detection_enabled` - Enable the battery low flag read
    ///   by [`PCF8523::is_battery_low`]
    ///
    /// # Errors
    /// `InvalidConfiguration` for the combination the chip reserves; nothing
    /// is written in that case.
    pub fn configure_power_management(
        &mut self,
        switchover_enabled: bool,
        direct_switching_mode: bool,
        battery_low_detection_enabled: bool,
    ) -> Result<(), PCF8523Error<I2C::Error>> {
        let control = Control3::with_power_management(
            switchover_enabled,
            direct_switching_mode,
            battery_low_detection_enabled,
        );
        if control.is_reserved_power_management() {
            error!("PCF8523: reserved power management combination");
            return Err(PCF8523Error::InvalidConfiguration);
        }
        self.set_control3(control)
    }

    /// Returns true if the battery low flag is set.
    pub fn is_battery_low(&mut self) -> Result<bool, PCF8523Error<I2C::Error>> {
        Ok(self.control3()?.battery_low())
    }

    /// Current frequency correction in LSBs, in `MIN_CORRECTION..=MAX_CORRECTION`.
    pub fn time_correction(&mut self) -> Result<i8, PCF8523Error<I2C::Error>> {
        let offset = self.offset()?;
        Ok(correction::sign_extend(offset))
    }

    /// Adds `seconds_per_day` to the correction stored on the chip.
    ///
    /// The value is rounded to the nearest LSB (about 0.375 s/day) and the
    /// sum is clamped to the register range, roughly -24 to +23.6 s/day.
    /// Always selects the two hour correction mode. Call
    /// [`PCF8523::reset_time_correction`] first to set an absolute value.
    pub fn add_time_correction(
        &mut self,
        seconds_per_day: f64,
    ) -> Result<(), PCF8523Error<I2C::Error>> {
        let delta = correction::seconds_per_day_to_lsb(seconds_per_day);
        let current = self.time_correction()?;
        let corrected = correction::saturating_apply(current, delta);
        debug!(
            "PCF8523: correction {} + {} -> {}",
            current, delta, corrected
        );
        self.set_offset(correction::to_register(corrected))
    }

    /// Sets the correction to zero.
    pub fn reset_time_correction(&mut self) -> Result<(), PCF8523Error<I2C::Error>> {
        self.set_offset(Offset::default())
    }

    fn read_raw_datetime(&mut self) -> Result<PCF8523DateTime, PCF8523Error<I2C::Error>> {
        let address = self.address;
        let mut data = [0; 7];
        self.bus()?
            .write_read(address, &[RegAddr::Seconds as u8], &mut data)?;
        Ok(data.into())
    }

    fn write_raw_datetime(
        &mut self,
        datetime: &PCF8523DateTime,
    ) -> Result<(), PCF8523Error<I2C::Error>> {
        let address = self.address;
        let data: [u8; 7] = datetime.into();
        self.bus()?.write(
            address,
            &[
                RegAddr::Seconds as u8,
                data[0],
                data[1],
                data[2],
                data[3],
                data[4],
                data[5],
                data[6],
            ],
        )?;
        Ok(())
    }

    /// Reads the time in a single transaction so the fields are coherent.
    ///
    /// The oscillator stop flag is not checked here.
    pub fn datetime(&mut self) -> Result<DateTime<Utc>, PCF8523Error<I2C::Error>> {
        let raw = self.read_raw_datetime()?;
        if raw.oscillator_stopped() {
            warn!("PCF8523: reading time with oscillator stop flag set");
        }
        let naive = raw.into_datetime().map_err(PCF8523Error::DateTime)?;
        Ok(Utc.from_utc_datetime(&naive))
    }

    /// Sets the time in a single transaction.
    ///
    /// The time is converted to UTC and must fall in 2000-2099. Sub-second
    /// precision is dropped.
    pub fn set_datetime<Tz: TimeZone>(
        &mut self,
        datetime: &DateTime<Tz>,
    ) -> Result<(), PCF8523Error<I2C::Error>> {
        let raw = PCF8523DateTime::from_datetime(&datetime.naive_utc())
            .map_err(PCF8523Error::DateTime)?;
        self.write_raw_datetime(&raw)
    }
}

// Typed single register accessors
macro_rules! impl_register_access {
    ($(($name:ident, $regaddr:expr, $typ:ty)),+) => {
        impl<I2C: I2c> PCF8523<I2C> {
            $(
                paste! {
                    #[doc = concat!("Reads the ", stringify!($name), " register.")]
                    pub fn $name(&mut self) -> Result<$typ, PCF8523Error<I2C::Error>> {
                        Ok(<$typ>::from(self.read_register($regaddr)?))
                    }

                    #[doc = concat!("Writes the ", stringify!($name), " register.")]
                    pub fn [<set_ $name>](&mut self, value: $typ) -> Result<(), PCF8523Error<I2C::Error>> {
                        self.write_register($regaddr, value.into())
                    }
                }
            )+
        }
    }
}

impl_register_access!(
    (seconds, RegAddr::Seconds, Seconds),
    (control3, RegAddr::Control3, Control3),
    (offset, RegAddr::Offset, Offset)
);
