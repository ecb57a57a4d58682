//! Backend-facing descriptors (data) and wire helpers.
//!
//! `descriptor` exposes the validated [`BackendDescriptor`] (base URL + identity provider slug),
//! `endpoint` declares every route the broker calls together with its timeout class,
//! `decode` turns bodies into typed payloads with path-aware errors, and `detail` normalizes
//! the backend's `{detail}` failure payloads into one [`ErrorDetail`] shape.

pub mod decode;
pub mod descriptor;
pub mod detail;
pub mod endpoint;

pub use decode::*;
pub use descriptor::*;
pub use detail::*;
pub use endpoint::*;
