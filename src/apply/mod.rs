//! Applying planned entries
//!
//! The [`ExecutionDriver`] walks planned batches for a path and hands each one
//! to an [`AclSetter`]. Failures stay local to the batch.

pub mod driver;
pub mod setter;

pub use driver::{ExecutionDriver, Outcome};
pub use setter::{AclSetter, ApplyRequest, SETFACL, SetfaclCommand};
