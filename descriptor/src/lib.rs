//! Descriptor heap and set manager.
//!
//! [`DescriptorManager`] owns descriptor heaps sized for a list of layout
//! groups, allocates [`DescriptorSet`] ranges from them and keeps a
//! shader-visible copy of everything written.

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

mod error;
mod layout;
mod manager;
mod ranges;

pub use crate::{
    error::DescriptorError,
    layout::{DescriptorSetLayout, LayoutBinding, LayoutSignature},
    manager::{DescriptorManager, DescriptorSet},
    ranges::{DescriptorRanges, DescriptorRangesIter},
};
