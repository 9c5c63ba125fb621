// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Logging abstraction
//!
//! Host builds (`std` feature) forward to `tracing`. Firmware builds have no
//! allocator, so the macros expand to nothing there and the serial diagnostics
//! are the only output.

macro_rules! log_debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "std")]
        tracing::debug!($($arg)*);
    }};
}

macro_rules! log_info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "std")]
        tracing::info!($($arg)*);
    }};
}

macro_rules! log_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "std")]
        tracing::warn!($($arg)*);
    }};
}
