#![forbid(unsafe_code)]

//! Core: capability context, cooperative cancellation, and the lab clock used
//! by the barline timer facility.

pub mod cx;
pub mod logging;

pub use cx::{Cx, CxController, LabClock};
pub use web_time::{Duration, Instant};
