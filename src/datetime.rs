//! `DateTime` conversion and register utilities for the PCF8523 RTC.
//!
//! The PCF8523 keeps the calendar in seven consecutive BCD registers starting
//! at 0x03: seconds, minutes, hours, days, weekdays, months and years. The
//! year register holds an offset from 2000, so the chip covers 2000-2099.
//!
//! Conversion errors are reported via [`PCF8523DateTimeError`].

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::registers::Seconds;

/// Decodes a packed BCD byte (two decimal digits) into its value.
pub(crate) fn bcd_decode(value: u8) -> u8 {
    (value >> 4) * 10 + (value & 0x0F)
}

/// Encodes a value in 0-99 as packed BCD.
pub(crate) fn bcd_encode(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

/// Raw contents of the seven byte time block.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct PCF8523DateTime {
    seconds: Seconds,
    minutes: u8,
    hours: u8,
    days: u8,
    weekdays: u8,
    months: u8,
    years: u8,
}

impl PCF8523DateTime {
    /// Converts a field to BCD after checking it against its range.
    fn make_bcd(value: u32, min_value: u32, max_value: u32) -> Result<u8, PCF8523DateTimeError> {
        if value < min_value || value > max_value {
            return Err(PCF8523DateTimeError::InvalidDateTime);
        }
        let value = u8::try_from(value).map_err(|_| PCF8523DateTimeError::InvalidDateTime)?;
        Ok(bcd_encode(value))
    }

    fn convert_year(year: i32) -> Result<u8, PCF8523DateTimeError> {
        if year > 2099 {
            error!("Year {} is too late! must be before 2100", year);
            return Err(PCF8523DateTimeError::YearNotBefore2100);
        }
        if year < 2000 {
            error!("Year {} is too early! must be greater than 1999", year);
            return Err(PCF8523DateTimeError::YearNotAfter1999);
        }
        let offset = u8::try_from(year - 2000).map_err(|_| PCF8523DateTimeError::InvalidDateTime)?;
        Ok(bcd_encode(offset))
    }

    /// Builds the register block for a UTC calendar time. Sub-second
    /// precision is dropped.
    pub(crate) fn from_datetime(datetime: &NaiveDateTime) -> Result<Self, PCF8523DateTimeError> {
        let mut seconds = Seconds::default();
        seconds.set_bcd_seconds(Self::make_bcd(datetime.second(), 0, 59)?);

        let raw = PCF8523DateTime {
            seconds,
            minutes: Self::make_bcd(datetime.minute(), 0, 59)?,
            hours: Self::make_bcd(datetime.hour(), 0, 23)?,
            days: Self::make_bcd(datetime.day(), 1, 31)?,
            weekdays: Self::make_bcd(datetime.weekday().num_days_from_sunday(), 0, 6)?,
            months: Self::make_bcd(datetime.month(), 1, 12)?,
            years: Self::convert_year(datetime.year())?,
        };

        debug!(
            "encoded time block: {} {} {} {} {} {} {}",
            raw.seconds.0, raw.minutes, raw.hours, raw.days, raw.weekdays, raw.months, raw.years
        );

        Ok(raw)
    }

    /// Decodes the register block. The oscillator stop flag is masked off
    /// and not reported here.
    pub(crate) fn into_datetime(self) -> Result<NaiveDateTime, PCF8523DateTimeError> {
        let seconds = u32::from(bcd_decode(self.seconds.bcd_seconds()));
        let minutes = u32::from(bcd_decode(self.minutes & 0x7F));
        let hours = u32::from(bcd_decode(self.hours & 0x3F));
        let days = u32::from(bcd_decode(self.days & 0x3F));
        let months = u32::from(bcd_decode(self.months & 0x1F));
        let year = 2000 + i32::from(bcd_decode(self.years));

        debug!(
            "decoded time block: {}-{}-{} {}:{}:{} weekday={}",
            year,
            months,
            days,
            hours,
            minutes,
            seconds,
            self.weekday()
        );

        NaiveDate::from_ymd_opt(year, months, days)
            .and_then(|d| d.and_hms_opt(hours, minutes, seconds))
            .ok_or(PCF8523DateTimeError::InvalidDateTime)
    }

    /// Weekday as stored by the chip (0-6). Not part of the decoded time.
    pub(crate) fn weekday(&self) -> u8 {
        bcd_decode(self.weekdays & 0x07)
    }

    pub(crate) fn oscillator_stopped(&self) -> bool {
        self.seconds.oscillator_stopped()
    }
}

impl From<[u8; 7]> for PCF8523DateTime {
    fn from(data: [u8; 7]) -> Self {
        PCF8523DateTime {
            seconds: Seconds(data[0]),
            minutes: data[1],
            hours: data[2],
            days: data[3],
            weekdays: data[4],
            months: data[5],
            years: data[6],
        }
    }
}

impl From<&PCF8523DateTime> for [u8; 7] {
    fn from(dt: &PCF8523DateTime) -> [u8; 7] {
        [
            dt.seconds.0,
            dt.minutes,
            dt.hours,
            dt.days,
            dt.weekdays,
            dt.months,
            dt.years,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors that can occur during PCF8523 date/time conversion or validation.
pub enum PCF8523DateTimeError {
    /// The provided or decoded date/time is invalid (out of range or not a calendar date)
    InvalidDateTime,
    /// The year is not before 2100 (the PCF8523 only stores years < 2100)
    YearNotBefore2100,
    /// The year is not after 1999 (the PCF8523 only stores years >= 2000)
    YearNotAfter1999,
}
