use bitflags::bitflags;

/// Type of hardware queue.
/// Every device exposes exactly one queue of each type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QueueType {
    /// Graphics, compute and transfer operations.
    Graphics,
    /// Compute and transfer operations.
    Compute,
    /// Transfer operations only.
    Transfer,
}

impl QueueType {
    /// All queue types in the order backends create them.
    pub const ALL: [QueueType; 3] = [QueueType::Graphics, QueueType::Compute, QueueType::Transfer];

    /// Index of the queue in `ALL`.
    pub fn index(self) -> usize {
        match self {
            QueueType::Graphics => 0,
            QueueType::Compute => 1,
            QueueType::Transfer => 2,
        }
    }
}

/// Command buffer level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandLevel {
    /// Can be submitted to a queue.
    Primary,
    /// Can only be executed from a primary command buffer.
    Secondary,
}

/// Pipeline bind point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindPoint {
    /// Rasterization pipelines.
    Graphics,
    /// Compute pipelines.
    Compute,
    /// Ray-tracing pipelines.
    RayTracing,
}

/// Type of index buffer elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndexType {
    /// 16 bit indices.
    U16,
    /// 32 bit indices.
    U32,
}

impl IndexType {
    /// Size of one index in bytes.
    pub fn size(self) -> u64 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

bitflags! {
    /// Flags that specify how command buffer is going to be used.
    #[repr(transparent)]
    pub struct CommandBufferFlags: u32 {
        /// Command buffer is submitted once and then re-recorded.
        const ONE_TIME_SUBMIT = 0x1;

        /// Secondary command buffer executes entirely inside the
        /// render target binding of its primary.
        const RENDER_TARGET_CONTINUE = 0x2;

        /// Command buffer can be pending more than once at a time.
        const SIMULTANEOUS_USE = 0x4;
    }
}
