//! This crate provide methods to create/destroy and otherwise manage device resources.
//! Primarily focus on buffers and images and the state they are in.

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

pub mod escape;

mod buffer;
mod error;
mod image;
mod pipeline;
mod resources;

pub use crate::{
    buffer::Buffer, error::CreationError, escape::KeepAlive, image::Image, pipeline::Pipeline,
    resources::Resources,
};
