//! Output drivers for the clockforge module.
//!
//! The engine produces one [`Frame`](cf_engine::Frame) per tick; a driver
//! pushes it to whatever stands in for the gate pins and DAC channels.

mod capture;
mod console;
mod traits;

pub use capture::CaptureDriver;
pub use console::ConsoleDriver;
pub use traits::{DriverError, OutputDriver};
