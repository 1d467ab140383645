//! Internal logging macros.
//!
//! Forwards to `defmt` or `log` depending on which feature is enabled and
//! expands to nothing otherwise. Format strings must stay within the subset
//! both backends accept (plain `{}` placeholders).

#![allow(unused_macros)]

cfg_if::cfg_if! {
    if #[cfg(feature = "defmt")] {
        macro_rules! debug {
            ($($arg:tt)*) => { ::defmt::debug!($($arg)*) };
        }
        macro_rules! warn {
            ($($arg:tt)*) => { ::defmt::warn!($($arg)*) };
        }
        macro_rules! error {
            ($($arg:tt)*) => { ::defmt::error!($($arg)*) };
        }
    } else if #[cfg(feature = "log")] {
        macro_rules! debug {
            ($($arg:tt)*) => { ::log::debug!($($arg)*) };
        }
        macro_rules! warn {
            ($($arg:tt)*) => { ::log::warn!($($arg)*) };
        }
        macro_rules! error {
            ($($arg:tt)*) => { ::log::error!($($arg)*) };
        }
    } else {
        macro_rules! debug {
            ($s:literal $(, $x:expr)* $(,)?) => {{ $( let _ = &$x; )* }};
        }
        macro_rules! warn {
            ($s:literal $(, $x:expr)* $(,)?) => {{ $( let _ = &$x; )* }};
        }
        macro_rules! error {
            ($s:literal $(, $x:expr)* $(,)?) => {{ $( let _ = &$x; )* }};
        }
    }
}
