//! Host-executed backends for kiln.
//!
//! Both backends run every queue on its own worker thread and move real bytes
//! between host allocations, so synchronization and state tracking done above
//! the hardware abstraction layer is observable without a GPU.
//!
//! * [`explicit`] models the explicit-barrier API family.
//! * [`timeline`] models the resource-state API family.
//!
//! Misuse is reported through an emulated validation layer.
//! Every validation error is logged and counted in [`kiln_core::Statistics`].

#![warn(
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications
)]

mod host;

#[cfg(feature = "explicit")]
pub mod explicit;

#[cfg(feature = "timeline")]
pub mod timeline;

pub use crate::host::{
    heap::{DescriptorHeap, DescriptorRecord},
    Pipeline,
};
