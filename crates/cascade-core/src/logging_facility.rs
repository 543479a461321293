//! Structured logging facility
//!
//! - one initialization point, `init(profile)`
//! - `log_op_start!`, `log_op_end!`, `log_op_error!` for operation boundaries
//! - test capture mode for asserting on emitted events
//!
//! ```rust
//! use cascade_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
