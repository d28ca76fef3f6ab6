//! Execution engine shared by the host backends.
//!
//! Every queue is a worker thread. Synchronization primitives are counters
//! guarded by a mutex and a condition variable. Buffers and images are plain
//! byte vectors.

pub mod command;
pub mod counters;
pub mod heap;
pub mod memory;
pub mod queue;
pub mod signal;

use kiln_core::{hal::PipelineDesc, BindPoint};

/// Pipeline of a host backend.
/// Holds nothing but the data needed to reproduce the pipeline cache.
#[derive(Clone, Debug)]
pub struct Pipeline {
    /// Unique id.
    pub id: u64,
    /// Label.
    pub label: String,
    /// Bind point.
    pub bind_point: BindPoint,
    cache: std::sync::Arc<Vec<u8>>,
}

impl Pipeline {
    pub(crate) fn new(backend: &str, desc: &PipelineDesc) -> Self {
        let cache = match &desc.cache {
            Some(cache) => cache.clone(),
            None => format!("{}:{:?}:{}", backend, desc.bind_point, desc.label).into_bytes(),
        };
        Pipeline {
            id: memory::next_id(),
            label: desc.label.clone(),
            bind_point: desc.bind_point,
            cache: std::sync::Arc::new(cache),
        }
    }

    /// Pipeline state cache blob.
    pub fn cache(&self) -> &[u8] {
        &self.cache
    }
}
