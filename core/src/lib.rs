//! Crate that contains the hardware abstraction traits and the utility types
//! shared by all other kiln crates.
//!
//! Backends implement the traits in [`hal`]. Everything above this crate is
//! generic over [`hal::Backend`] and never names a concrete backend.

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

pub use crate::{error::*, slow::*, types::*, wrap::*};

mod error;
pub mod hal;
mod slow;
pub mod types;
mod wrap;
