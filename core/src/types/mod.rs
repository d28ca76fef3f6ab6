//! Value types shared between the hardware abstraction traits and the
//! crates built on top of them.

mod descriptor;
mod device;
mod queue;
mod resource;
mod state;

pub use self::{descriptor::*, device::*, queue::*, resource::*, state::*};
