//! Frequency offset arithmetic.
//!
//! The offset register stores a seven bit two's complement value. In the
//! two hour correction mode each LSB is 4.34 ppm, and one second per day is
//! 11.57407 ppm.

use crate::registers::Offset;

/// Smallest correction the offset register can hold, in LSBs.
pub const MIN_CORRECTION: i8 = -64;
/// Largest correction the offset register can hold, in LSBs.
pub const MAX_CORRECTION: i8 = 63;

const PPM_PER_SECOND_PER_DAY: f64 = 11.57407;
const PPM_PER_LSB_TWO_HOUR_MODE: f64 = 4.34;

/// Sign extends the seven bit offset field into an `i8`.
pub(crate) fn sign_extend(offset: Offset) -> i8 {
    let raw = offset.raw_offset();
    let extended = if raw & 0x40 != 0 { raw | 0x80 } else { raw & 0x7F };
    i8::from_ne_bytes([extended])
}

/// Converts seconds per day into offset LSBs, rounding half away from zero.
///
/// Out of range inputs saturate at the `i32` bounds and NaN maps to zero.
pub(crate) fn seconds_per_day_to_lsb(seconds_per_day: f64) -> i32 {
    let scaled = seconds_per_day * PPM_PER_SECOND_PER_DAY / PPM_PER_LSB_TWO_HOUR_MODE;
    if scaled >= 0.0 {
        (scaled + 0.5) as i32
    } else {
        (scaled - 0.5) as i32
    }
}

/// Adds `delta` LSBs to `current` and clamps into the register range.
pub(crate) fn saturating_apply(current: i8, delta: i32) -> i8 {
    let sum = i32::from(current).saturating_add(delta);
    let clamped = sum.clamp(i32::from(MIN_CORRECTION), i32::from(MAX_CORRECTION));
    // lossless, clamped is within [-64, 63]
    clamped as i8
}

/// Packs a correction into an offset register value in two hour mode.
pub(crate) fn to_register(correction: i8) -> Offset {
    let mut offset = Offset::default();
    offset.set_raw_offset(correction.to_ne_bytes()[0] & 0x7F);
    offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::CorrectionMode;

    #[test]
    fn test_sign_extend_positive() {
        for raw in 0x00..=0x3Fu8 {
            let value = sign_extend(Offset(raw));
            assert!((0..=63).contains(&value), "raw={:#04x} value={}", raw, value);
            assert_eq!(value, raw as i8);
        }
    }

    #[test]
    fn test_sign_extend_negative() {
        for raw in 0x40..=0x7Fu8 {
            let value = sign_extend(Offset(raw));
            assert!((-64..=-1).contains(&value), "raw={:#04x} value={}", raw, value);
        }
        assert_eq!(sign_extend(Offset(0x40)), -64);
        assert_eq!(sign_extend(Offset(0x7F)), -1);
    }

    #[test]
    fn test_sign_extend_ignores_mode_bit() {
        for raw in 0..=0xFFu8 {
            assert_eq!(sign_extend(Offset(raw)), sign_extend(Offset(raw & 0x7F)));
        }
    }

    #[test]
    fn test_seconds_per_day_conversion() {
        assert_eq!(seconds_per_day_to_lsb(0.0), 0);
        // 1 s/day = 2.667 LSB
        assert_eq!(seconds_per_day_to_lsb(1.0), 3);
        assert_eq!(seconds_per_day_to_lsb(-1.0), -3);
        // 10 s/day = 26.67 LSB
        assert_eq!(seconds_per_day_to_lsb(10.0), 27);
        assert_eq!(seconds_per_day_to_lsb(-10.0), -27);
        // 0.1 s/day = 0.267 LSB
        assert_eq!(seconds_per_day_to_lsb(0.1), 0);
    }

    #[test]
    fn test_seconds_per_day_conversion_extremes() {
        assert_eq!(seconds_per_day_to_lsb(f64::MAX), i32::MAX);
        assert_eq!(seconds_per_day_to_lsb(f64::MIN), i32::MIN);
        assert_eq!(seconds_per_day_to_lsb(f64::INFINITY), i32::MAX);
        assert_eq!(seconds_per_day_to_lsb(f64::NEG_INFINITY), i32::MIN);
        assert_eq!(seconds_per_day_to_lsb(f64::NAN), 0);
    }

    #[test]
    fn test_saturating_apply_bounds() {
        let deltas = [i32::MIN, -1000, -128, -65, -64, -1, 0, 1, 63, 64, 127, 1000, i32::MAX];
        for current in MIN_CORRECTION..=MAX_CORRECTION {
            for &delta in deltas.iter() {
                let value = saturating_apply(current, delta);
                assert!(
                    (MIN_CORRECTION..=MAX_CORRECTION).contains(&value),
                    "current={} delta={} value={}",
                    current,
                    delta,
                    value
                );
                let exact = i64::from(current) + i64::from(delta);
                if (-64..=63).contains(&exact) {
                    assert_eq!(i64::from(value), exact);
                }
            }
        }
    }

    #[test]
    fn test_saturating_apply_clamps() {
        assert_eq!(saturating_apply(60, 10), 63);
        assert_eq!(saturating_apply(-60, -10), -64);
        assert_eq!(saturating_apply(63, 0), 63);
        assert_eq!(saturating_apply(-64, 0), -64);
        assert_eq!(saturating_apply(20, 27), 47);
    }

    #[test]
    fn test_to_register_round_trip() {
        for correction in MIN_CORRECTION..=MAX_CORRECTION {
            let offset = to_register(correction);
            assert_eq!(offset.mode(), CorrectionMode::EveryTwoHours);
            assert_eq!(u8::from(offset) & 0x80, 0);
            assert_eq!(sign_extend(offset), correction);
        }
        assert_eq!(u8::from(to_register(-1)), 0x7F);
        assert_eq!(u8::from(to_register(-64)), 0x40);
        assert_eq!(u8::from(to_register(63)), 0x3F);
    }
}
