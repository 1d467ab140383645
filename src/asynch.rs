//! Async implementation of the PCF8523 driver.
//!
//! This module provides an async interface to the PCF8523 RTC device using
//! `embedded-hal-async` traits. It is only available when the `async` feature
//! is enabled. Encoding, decoding and correction arithmetic are shared with
//! the blocking driver.
//!
//! # Example
//!
//! ```rust,ignore
//! use pcf8523::asynch::PCF8523;
//!
//! // Initialize device, clearing the oscillator stop flag
//! let mut rtc = PCF8523::new(i2c, 0x68).await?;
//!
//! // Get current date/time asynchronously
//! let datetime = rtc.datetime().await?;
//! ```

use chrono::{DateTime, TimeZone, Utc};
use embedded_hal_async::i2c::I2c;
use paste::paste;

use crate::{
    correction, Control3, OpenBus, Offset, PCF8523DateTime, PCF8523Error, RegAddr, Seconds,
};

/// PCF8523 Real-Time Clock async driver.
///
/// Same contract as the blocking [`crate::PCF8523`].
pub struct PCF8523<I2C: I2c> {
    i2c: Option<I2C>,
    address: u8,
}

impl<I2C: I2c> PCF8523<I2C> {
    /// Opens the bus named `path` and initializes the device on it.
    pub async fn open<O>(
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
        Self::new(i2c, address).await
    }

    /// Creates a driver on an already opened bus and clears the oscillator
    /// stop flag if it is set.
    ///
    /// # Arguments
    /// * `i2c` - The async I2C bus implementation
    /// * `address` - The I2C address of the device (typically 0x68)
    pub async fn new(i2c: I2C, address: u8) -> Result<Self, PCF8523Error<I2C::Error>> {
        let mut dev = Self {
            i2c: Some(i2c),
            address,
        };
        dev.recover_oscillator().await?;
        Ok(dev)
    }

    /// Releases the bus and hands it back.
    pub fn close(&mut self) -> Option<I2C> {
        self.i2c.take()
    }

    fn bus(&mut self) -> Result<&mut I2C, PCF8523Error<I2C::Error>> {
        self.i2c.as_mut().ok_or(PCF8523Error::HandleClosed)
    }

    async fn recover_oscillator(&mut self) -> Result<(), PCF8523Error<I2C::Error>> {
        let seconds = self.seconds().await?;
        if !seconds.oscillator_stopped() {
            return Ok(());
        }
        warn!("PCF8523: oscillator stop flag set, clearing");
        let mut cleared = seconds;
        cleared.set_oscillator_stopped(false);
        self.set_seconds(cleared).await?;

        if self.seconds().await?.oscillator_stopped() {
            error!("PCF8523: oscillator stopped");
            return Err(PCF8523Error::OscillatorStopped);
        }
        Ok(())
    }

    /// Reads a single register.
    pub async fn read_register(&mut self, reg: RegAddr) -> Result<u8, PCF8523Error<I2C::Error>> {
        let address = self.address;
        let mut data = [0];
        self.bus()?
            .write_read(address, &[reg as u8], &mut data)
            .await?;
        Ok(data[0])
    }

    /// Writes a single register.
    pub async fn write_register(
        &mut self,
        reg: RegAddr,
        value: u8,
    ) -> Result<(), PCF8523Error<I2C::Error>> {
        let address = self.address;
        self.bus()?.write(address, &[reg as u8, value]).await?;
        Ok(())
    }

    /// Reads the oscillator stop flag.
    pub async fn is_oscillator_stopped(&mut self) -> Result<bool, PCF8523Error<I2C::Error>> {
        Ok(self.seconds().await?.oscillator_stopped())
    }

    /// Configures power management. See
    /// [`crate::PCF8523::configure_power_management`].
    pub async fn configure_power_management(
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
            return Err(PCF8523Error::InvalidConfiguration);
        }
        self.set_control3(control).await
    }

    /// Returns true if the battery low flag is set.
    pub async fn is_battery_low(&mut self) -> Result<bool, PCF8523Error<I2C::Error>> {
        Ok(self.control3().await?.battery_low())
    }

    /// Current frequency correction in LSBs.
    pub async fn time_correction(&mut self) -> Result<i8, PCF8523Error<I2C::Error>> {
        let offset = self.offset().await?;
        Ok(correction::sign_extend(offset))
    }

    /// Adds `seconds_per_day` to the stored correction, clamped to the
    /// register range.
    pub async fn add_time_correction(
        &mut self,
        seconds_per_day: f64,
    ) -> Result<(), PCF8523Error<I2C::Error>> {
        let delta = correction::seconds_per_day_to_lsb(seconds_per_day);
        let current = self.time_correction().await?;
        let corrected = correction::saturating_apply(current, delta);
        debug!(
            "PCF8523: correction {} + {} -> {}",
            current, delta, corrected
        );
        self.set_offset(correction::to_register(corrected)).await
    }

    /// Sets the correction to zero.
    pub async fn reset_time_correction(&mut self) -> Result<(), PCF8523Error<I2C::Error>> {
        self.set_offset(Offset::default()).await
    }

    async fn read_raw_datetime(&mut self) -> Result<PCF8523DateTime, PCF8523Error<I2C::Error>> {
        let address = self.address;
        let mut data = [0; 7];
        self.bus()?
            .write_read(address, &[RegAddr::Seconds as u8], &mut data)
            .await?;
        Ok(data.into())
    }

    async fn write_raw_datetime(
        &mut self,
        datetime: &PCF8523DateTime,
    ) -> Result<(), PCF8523Error<I2C::Error>> {
        let address = self.address;
        let data: [u8; 7] = datetime.into();
        self.bus()?
            .write(
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
            )
            .await?;
        Ok(())
    }

    /// Gets the current date and time from the device.
    pub async fn datetime(&mut self) -> Result<DateTime<Utc>, PCF8523Error<I2C::Error>> {
        let raw = self.read_raw_datetime().await?;
        if raw.oscillator_stopped() {
            warn!("PCF8523: reading time with oscillator stop flag set");
        }
        let naive = raw.into_datetime().map_err(PCF8523Error::DateTime)?;
        Ok(Utc.from_utc_datetime(&naive))
    }

    /// Sets the current date and time on the device, converted to UTC.
    pub async fn set_datetime<Tz: TimeZone>(
        &mut self,
        datetime: &DateTime<Tz>,
    ) -> Result<(), PCF8523Error<I2C::Error>> {
        let raw = PCF8523DateTime::from_datetime(&datetime.naive_utc())
            .map_err(PCF8523Error::DateTime)?;
        self.write_raw_datetime(&raw).await
    }
}

// Register access implementations
macro_rules! impl_register_access {
    ($(($name:ident, $regaddr:expr, $typ:ty)),+) => {
        impl<I2C: I2c> PCF8523<I2C> {
            $(
                paste! {
                    #[doc = concat!("Gets the value of the ", stringify!($name), " register.")]
                    pub async fn $name(&mut self) -> Result<$typ, PCF8523Error<I2C::Error>> {
                        Ok(<$typ>::from(self.read_register($regaddr).await?))
                    }

                    #[doc = concat!("Sets the value of the ", stringify!($name), " register.")]
                    pub async fn [<set_ $name>](&mut self, value: $typ) -> Result<(), PCF8523Error<I2C::Error>> {
                        self.write_register($regaddr, value.into()).await
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Timelike};
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTrans};

    const DEVICE_ADDRESS: u8 = 0x68;

    async fn setup_mock(expectations: &[I2cTrans]) -> (PCF8523<I2cMock>, I2cMock) {
        let mut all = vec![I2cTrans::write_read(
            DEVICE_ADDRESS,
            vec![RegAddr::Seconds as u8],
            vec![0x00],
        )];
        all.extend_from_slice(expectations);
        let i2c = I2cMock::new(&all);
        let dev = PCF8523::new(i2c.clone(), DEVICE_ADDRESS).await.unwrap();
        (dev, i2c)
    }

    #[tokio::test]
    async fn test_async_recovers_oscillator() {
        let mut i2c = I2cMock::new(&[
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::Seconds as u8], vec![0x80]),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Seconds as u8, 0x00]),
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::Seconds as u8], vec![0x01]),
        ]);
        assert!(PCF8523::new(i2c.clone(), DEVICE_ADDRESS).await.is_ok());
        i2c.done();
    }

    #[tokio::test]
    async fn test_async_oscillator_stopped() {
        let mut i2c = I2cMock::new(&[
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::Seconds as u8], vec![0x80]),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Seconds as u8, 0x00]),
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::Seconds as u8], vec![0x80]),
        ]);
        let result = PCF8523::new(i2c.clone(), DEVICE_ADDRESS).await;
        assert!(matches!(result, Err(PCF8523Error::OscillatorStopped)));
        i2c.done();
    }

    #[tokio::test]
    async fn test_async_power_management() {
        let (mut dev, mut i2c) = setup_mock(&[
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Control3 as u8, 0b001]),
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::Control3 as u8], vec![0x04]),
        ])
        .await;
        dev.configure_power_management(true, true, true).await.unwrap();
        assert!(matches!(
            dev.configure_power_management(false, false, false).await,
            Err(PCF8523Error::InvalidConfiguration)
        ));
        assert!(dev.is_battery_low().await.unwrap());
        i2c.done();
    }

    #[tokio::test]
    async fn test_async_time_correction() {
        let (mut dev, mut i2c) = setup_mock(&[
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::Offset as u8], vec![0x3C]),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Offset as u8, 0x3F]),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Offset as u8, 0x00]),
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::Offset as u8], vec![0x00]),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Offset as u8, 0x7D]),
        ])
        .await;
        dev.add_time_correction(10.0).await.unwrap();
        dev.reset_time_correction().await.unwrap();
        // -1 s/day rounds to -3 LSB
        dev.add_time_correction(-1.0).await.unwrap();
        i2c.done();
    }

    #[tokio::test]
    async fn test_async_read_datetime() {
        let (mut dev, mut i2c) = setup_mock(&[I2cTrans::write_read(
            DEVICE_ADDRESS,
            vec![RegAddr::Seconds as u8],
            vec![0x59, 0x59, 0x23, 0x31, 0x05, 0x12, 0x99],
        )])
        .await;
        let dt = dev.datetime().await.unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2099, 12, 31, 23, 59, 59).unwrap());
        assert_eq!(dt.nanosecond(), 0);
        i2c.done();
    }

    #[tokio::test]
    async fn test_async_set_datetime() {
        let (mut dev, mut i2c) = setup_mock(&[I2cTrans::write(
            DEVICE_ADDRESS,
            vec![RegAddr::Seconds as u8, 0x00, 0x00, 0x00, 0x01, 0x06, 0x01, 0x00],
        )])
        .await;
        // 2000-01-01 00:00:00 UTC, a Saturday
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let dt = tz.with_ymd_and_hms(1999, 12, 31, 19, 0, 0).unwrap();
        dev.set_datetime(&dt).await.unwrap();
        i2c.done();
    }

    #[tokio::test]
    async fn test_async_closed_handle() {
        let (mut dev, mut i2c) = setup_mock(&[]).await;
        assert!(dev.close().is_some());
        assert!(matches!(
            dev.datetime().await,
            Err(PCF8523Error::HandleClosed)
        ));
        assert!(matches!(
            dev.read_register(RegAddr::Control3).await,
            Err(PCF8523Error::HandleClosed)
        ));
        i2c.done();
    }

    #[tokio::test]
    async fn test_async_bus_error() {
        let (mut dev, mut i2c) = setup_mock(&[I2cTrans::write_read(
            DEVICE_ADDRESS,
            vec![RegAddr::Seconds as u8],
            vec![0; 7],
        )
        .with_error(ErrorKind::Other)])
        .await;
        assert!(matches!(
            dev.datetime().await,
            Err(PCF8523Error::I2c(ErrorKind::Other))
        ));
        i2c.done();
    }
}
