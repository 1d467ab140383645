//! Register definitions and bitfield structures for the PCF8523 RTC.
//!
//! Only the registers the driver touches are modelled: the power management
//! and flag register, the seven byte time block and the offset register.

use bitfield::bitfield;

/// Register addresses for the PCF8523 RTC.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegAddr {
    /// Control 3: power management and battery flags
    Control3 = 0x02,
    /// Seconds register (0-59) plus the oscillator stop flag
    Seconds = 0x03,
    /// Minutes register (0-59)
    Minutes = 0x04,
    /// Hours register (0-23)
    Hours = 0x05,
    /// Day of month register (1-31)
    Days = 0x06,
    /// Weekday register (0-6)
    Weekdays = 0x07,
    /// Month register (1-12)
    Months = 0x08,
    /// Year register (0-99, offset from 2000)
    Years = 0x09,
    /// Frequency offset register
    Offset = 0x0E,
}

/// Offset correction pulse mode, bit 7 of the offset register.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CorrectionMode {
    /// Correction applied once every two hours, 4.34 ppm per LSB
    EveryTwoHours = 0,
    /// Correction applied once every minute, 4.069 ppm per LSB
    EveryMinute = 1,
}
impl From<u8> for CorrectionMode {
    fn from(v: u8) -> Self {
        match v & 0x01 {
            0 => CorrectionMode::EveryTwoHours,
            _ => CorrectionMode::EveryMinute,
        }
    }
}
impl From<CorrectionMode> for u8 {
    fn from(v: CorrectionMode) -> Self {
        v as u8
    }
}

// This macro generates the From<u8> and Into<u8> implementations for the
// register type
macro_rules! from_register_u8 {
    ($typ:ty) => {
        impl From<u8> for $typ {
            fn from(v: u8) -> Self {
                paste::paste!([< $typ >](v))
            }
        }
        impl From<$typ> for u8 {
            fn from(v: $typ) -> Self {
                v.0
            }
        }
    };
}

bitfield! {
    /// Seconds register. Bit 7 doubles as the oscillator stop (OS) flag.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Seconds(u8);
    impl Debug;
    /// Set by hardware when the oscillator stopped; time may be invalid
    pub oscillator_stopped, set_oscillator_stopped: 7;
    /// BCD seconds (0x00-0x59)
    pub bcd_seconds, set_bcd_seconds: 6, 0;
}
from_register_u8!(Seconds);

bitfield! {
    /// Control 3 register as written by the power management call.
    ///
    /// Both enable bits have inverted polarity: a clear bit means enabled.
    /// Bit 2 reads back as the battery low flag.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Control3(u8);
    impl Debug;
    /// Switch to battery whenever Vdd < Vbat
    pub direct_switching_mode, set_direct_switching_mode: 0;
    /// Battery switchover disabled
    pub switchover_disabled, set_switchover_disabled: 1;
    /// Battery low detection disabled (write path)
    pub battery_low_detection_disabled, set_battery_low_detection_disabled: 2;
    /// Battery low flag (read path)
    pub battery_low, _: 2;
    /// The packed three bit power management value
    pub power_management, set_power_management: 2, 0;
}
from_register_u8!(Control3);

/// Packed power management value the chip documents as not allowed.
pub(crate) const RESERVED_POWER_MANAGEMENT: u8 = 0b110;

impl Control3 {
    /// Packs the three power management options into a fresh register
    /// value with every unrelated bit cleared.
    pub fn with_power_management(
        switchover_enabled: bool,
        direct_switching_mode: bool,
        battery_low_detection_enabled: bool,
    ) -> Self {
        let mut value = Control3::default();
        value.set_direct_switching_mode(direct_switching_mode);
        value.set_switchover_disabled(!switchover_enabled);
        value.set_battery_low_detection_disabled(!battery_low_detection_enabled);
        value
    }

    /// Returns true if the packed power management bits are the reserved
    /// combination.
    pub fn is_reserved_power_management(&self) -> bool {
        self.power_management() == RESERVED_POWER_MANAGEMENT
    }
}

bitfield! {
    /// Frequency offset register.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Offset(u8);
    impl Debug;
    /// Correction pulse mode
    pub from into CorrectionMode, mode, set_mode: 7, 7;
    /// Seven bit two's complement offset, bit 6 is the sign
    pub raw_offset, set_raw_offset: 6, 0;
}
from_register_u8!(Offset);
