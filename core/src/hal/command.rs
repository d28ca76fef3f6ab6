//! Command buffer trait.

use {
    super::Backend,
    crate::{
        BindPoint, BufferCopy, BufferImageCopy, ClearColor, CommandBufferFlags, CommandLevel,
        DescriptorOffsets, DeviceError, ImageCopy, IndexType, QueueType, ResourceState,
    },
    std::{fmt::Debug, ops::Range},
};

/// Resource state transition.
#[derive(derivative::Derivative)]
#[derivative(Clone(bound = ""), Debug(bound = ""))]
pub enum Barrier<'a, B: Backend> {
    /// Buffer transition.
    Buffer {
        /// Transitioned buffer.
        #[derivative(Clone(clone_with = "std::clone::Clone::clone"))]
        target: &'a B::Buffer,
        /// States before and after.
        states: Range<ResourceState>,
    },

    /// Image transition.
    Image {
        /// Transitioned image.
        #[derivative(Clone(clone_with = "std::clone::Clone::clone"))]
        target: &'a B::Image,
        /// States before and after.
        states: Range<ResourceState>,
    },
}

impl<'a, B> Barrier<'a, B>
where
    B: Backend,
{
    /// States before and after.
    pub fn states(&self) -> Range<ResourceState> {
        match self {
            Barrier::Buffer { states, .. } | Barrier::Image { states, .. } => states.clone(),
        }
    }
}

/// State a secondary command buffer inherits from its primary.
#[derive(derivative::Derivative)]
#[derivative(Clone(bound = ""), Copy(bound = ""), Debug(bound = ""))]
pub struct Inheritance<'a, B: Backend> {
    /// Render targets bound by the primary.
    pub targets: &'a [B::Image],
}

/// Command buffer.
///
/// Recording functions are `unsafe`: command buffer must be in recording state
/// and every referenced object must outlive execution of the commands.
pub trait CommandBuffer<B: Backend>: Debug + Send + Sync {
    /// Level of the command buffer.
    fn level(&self) -> CommandLevel;

    /// Queue type the command buffer was created for.
    fn queue_type(&self) -> QueueType;

    /// Start recording.
    ///
    /// # Safety
    ///
    /// Command buffer must be initial or executable and not pending.
    unsafe fn begin(
        &mut self,
        flags: CommandBufferFlags,
        inheritance: Option<Inheritance<'_, B>>,
    ) -> Result<(), DeviceError>;

    /// Reset command buffer to initial state.
    /// Backends reject reset of a pending command buffer.
    ///
    /// # Safety
    ///
    /// Command buffer must not be recording.
    unsafe fn reset(&mut self) -> Result<(), DeviceError>;

    /// Finish recording.
    ///
    /// # Safety
    ///
    /// Command buffer must be recording.
    unsafe fn finish(&mut self) -> Result<(), DeviceError>;

    /// Transition resources between states.
    unsafe fn transition(&mut self, barriers: &[Barrier<'_, B>]);

    /// Copy bytes between buffers.
    unsafe fn copy_buffer(&mut self, src: &B::Buffer, dst: &B::Buffer, regions: &[BufferCopy]);

    /// Copy texels between images.
    unsafe fn copy_image(&mut self, src: &B::Image, dst: &B::Image, regions: &[ImageCopy]);

    /// Copy texels from buffer to image.
    unsafe fn copy_buffer_to_image(
        &mut self,
        src: &B::Buffer,
        dst: &B::Image,
        regions: &[BufferImageCopy],
    );

    /// Bind render targets, optionally clearing them.
    unsafe fn begin_render_target(&mut self, targets: &[B::Image], clear: Option<ClearColor>);

    /// Unbind render targets.
    unsafe fn end_render_target(&mut self);

    /// Bind pipeline.
    unsafe fn bind_pipeline(&mut self, pipeline: &B::Pipeline);

    /// Bind vertex buffers starting from `first` binding.
    unsafe fn bind_vertex_buffers(&mut self, first: u32, buffers: &[(B::Buffer, u64)]);

    /// Bind index buffer.
    unsafe fn bind_index_buffer(&mut self, buffer: &B::Buffer, offset: u64, index_type: IndexType);

    /// Bind descriptor set located at `offsets` in the heap.
    unsafe fn bind_descriptor_heap(
        &mut self,
        bind_point: BindPoint,
        set: u32,
        heap: &B::DescriptorHeap,
        offsets: DescriptorOffsets,
    );

    /// Draw indexed primitives.
    unsafe fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>);

    /// Dispatch compute work groups.
    unsafe fn dispatch(&mut self, groups: [u32; 3]);

    /// Trace rays.
    unsafe fn trace_rays(&mut self, size: [u32; 3]);

    /// Execute secondary command buffers.
    unsafe fn execute_commands(&mut self, buffers: &[&B::CommandBuffer]);
}
