//! Command recording and submission.
//!
//! [`CommandRecorder`] records into a ring of command buffers and tracks
//! resource states. [`CommandSubmitter`] submits batches of recorders to
//! multiple queues preserving batch order. Completion is observed through
//! [`Fence`]s and [`Timeline`]s.

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
mod fence;
mod queue;
mod recorder;
mod semaphore;
mod submission;
mod submitter;
mod swapchain;

pub use crate::{
    error::{RecorderError, SubmitError},
    fence::{Fence, FenceEpoch},
    queue::{Queue, Queues},
    recorder::{CommandRecorder, RecorderConfig, RecorderUsage, RecordingState, WaitStatus},
    semaphore::{Semaphore, Timeline},
    submission::Submission,
    submitter::CommandSubmitter,
    swapchain::{HeadlessSwapchain, Swapchain},
};
