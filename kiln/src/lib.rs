//! Kiln's top level crate.
//! Reexports all others and provides [`Context`] that ties them to one device.

#![warn(
    missing_debug_implementations,
    missing_copy_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications
)]

#[doc(inline)]
pub use kiln_command as command;

#[doc(inline)]
pub use kiln_core as core;

#[doc(inline)]
pub use kiln_descriptor as descriptor;

#[doc(inline)]
pub use kiln_resource as resource;

pub use kiln_core::hal;

#[cfg(feature = "explicit")]
pub use kiln_backend::explicit;

#[cfg(feature = "timeline")]
pub use kiln_backend::timeline;

mod config;
mod context;

pub use crate::{config::Config, context::Context};
