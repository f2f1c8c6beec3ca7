/*
 * Logging shim for the library.
 *
 * On the board we log through defmt, in host tests through `log` if it is
 * enabled, and otherwise not at all. The arguments are still borrowed when
 * logging is off so that values used only for logging do not trigger unused
 * variable warnings.
 */
#![allow(unused_macros)]

macro_rules! log_with {
    ($level:ident, $s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::$level!($s $(, $x)*);
            #[cfg(all(feature = "log", not(feature = "defmt")))]
            ::log::$level!($s $(, $x)*);
            #[cfg(not(any(feature = "log", feature = "defmt")))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! trace {
    ($($t:tt)*) => { log_with!(trace, $($t)*) };
}

macro_rules! debug {
    ($($t:tt)*) => { log_with!(debug, $($t)*) };
}

macro_rules! info {
    ($($t:tt)*) => { log_with!(info, $($t)*) };
}

macro_rules! warn {
    ($($t:tt)*) => { log_with!(warn, $($t)*) };
}

macro_rules! error {
    ($($t:tt)*) => { log_with!(error, $($t)*) };
}
