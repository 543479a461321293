//! Types shared by the cascade error and logging facilities
//!
//! - **Correlation**: `RequestId`, `TraceId`, `RequestContext`
//! - **Sensitive data**: `Sensitive<T>`, used for plaintext secrets on their way to the hasher
//! - **Schema constants**: structured log field keys and event names

pub mod correlation;
pub mod schema;
pub mod sensitive;

pub use correlation::{RequestContext, RequestId, TraceId};
pub use sensitive::Sensitive;
