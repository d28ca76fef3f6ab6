//! Command buffers recording explicit-barrier native commands.

use {
    super::{
        layout::{AccessFlags, ImageLayout},
        Backend, Buffer, Image, VK_ERROR_VALIDATION_FAILED,
    },
    crate::host::{
        command::{Commands, HostCommand, Misuse, Nested},
        counters::Counters,
        memory::{Memory, RowCopy},
    },
    kiln_core::{
        hal::{
            self,
            command::{Barrier, Inheritance},
        },
        BindPoint, BufferCopy, BufferImageCopy, ClearColor, CommandBufferFlags, CommandLevel,
        DescriptorOffsets, DeviceError, ImageCopy, IndexType, QueueType,
    },
    smallvec::SmallVec,
    std::{ops::Range, sync::Arc},
};

/// Buffer memory barrier. Buffers have no layout.
#[derive(Clone, Debug)]
pub struct BufferMemoryBarrier {
    /// Buffer.
    pub buffer: Buffer,
    /// Access before the barrier.
    pub src_access: AccessFlags,
    /// Access after the barrier.
    pub dst_access: AccessFlags,
}

/// Image memory barrier with layout transition.
#[derive(Clone, Debug)]
pub struct ImageMemoryBarrier {
    /// Image.
    pub image: Image,
    /// Layout before the barrier.
    pub old_layout: ImageLayout,
    /// Layout after the barrier.
    pub new_layout: ImageLayout,
    /// Access before the barrier.
    pub src_access: AccessFlags,
    /// Access after the barrier.
    pub dst_access: AccessFlags,
}

/// Native command.
#[derive(Clone, Debug)]
pub enum Command {
    /// Memory and layout barrier.
    PipelineBarrier {
        /// Buffer barriers.
        buffers: SmallVec<[BufferMemoryBarrier; 4]>,
        /// Image barriers.
        images: SmallVec<[ImageMemoryBarrier; 4]>,
    },
    /// Buffer to buffer copy.
    CopyBuffer {
        /// Source.
        src: Buffer,
        /// Destination.
        dst: Buffer,
        /// Regions.
        regions: SmallVec<[BufferCopy; 2]>,
    },
    /// Image to image copy.
    CopyImage {
        /// Source.
        src: Image,
        /// Destination.
        dst: Image,
        /// Regions.
        regions: SmallVec<[ImageCopy; 2]>,
    },
    /// Buffer to image copy.
    CopyBufferToImage {
        /// Source.
        src: Buffer,
        /// Destination.
        dst: Image,
        /// Regions.
        regions: SmallVec<[BufferImageCopy; 2]>,
    },
    /// Start render pass with color attachments.
    BeginRenderPass {
        /// Color attachments.
        attachments: SmallVec<[Image; 4]>,
        /// Clear value for load op clear.
        clear: Option<ClearColor>,
    },
    /// End render pass.
    EndRenderPass,
    /// Bind pipeline.
    BindPipeline {
        /// Bind point.
        bind_point: BindPoint,
        /// Pipeline id.
        pipeline: u64,
    },
    /// Bind vertex buffers.
    BindVertexBuffers {
        /// First binding.
        first_binding: u32,
        /// Buffer ids and offsets.
        buffers: SmallVec<[(u64, u64); 4]>,
    },
    /// Bind index buffer.
    BindIndexBuffer {
        /// Buffer id.
        buffer: u64,
        /// Offset.
        offset: u64,
        /// Index type.
        index_type: IndexType,
    },
    /// Bind descriptor set allocated from a pool.
    BindDescriptorSets {
        /// Bind point.
        bind_point: BindPoint,
        /// Set index.
        first_set: u32,
        /// Pool id.
        pool: u64,
        /// Offsets of the set in the pool.
        offsets: DescriptorOffsets,
    },
    /// Indexed draw.
    DrawIndexed {
        /// Indices.
        indices: Range<u32>,
        /// Added to each index.
        vertex_offset: i32,
        /// Instances.
        instances: Range<u32>,
    },
    /// Compute dispatch.
    Dispatch {
        /// Work group count.
        group_count: [u32; 3],
    },
    /// Ray-tracing dispatch.
    TraceRays {
        /// Launch size.
        size: [u32; 3],
    },
    /// Execute secondary command buffers.
    ExecuteCommands(Vec<Nested<Command>>),
}

fn copy(counters: &Counters, what: &str, src: &Memory, dst: &Memory, region: RowCopy) {
    if let Err(err) = Memory::copy(src, dst, region) {
        counters.validation_error(format_args!("{}: {}", what, err));
    }
}

impl HostCommand for Command {
    fn execute(&self, counters: &Counters) {
        match self {
            Command::PipelineBarrier { buffers, images } => {
                for barrier in images {
                    let mut layout = barrier.image.state.lock();
                    if barrier.old_layout != ImageLayout::Undefined && barrier.old_layout != *layout
                    {
                        counters.validation_error(format_args!(
                            "vkCmdPipelineBarrier: image {} old layout {:?} doesn't match current layout {:?}",
                            barrier.image.id, barrier.old_layout, *layout
                        ));
                    }
                    *layout = barrier.new_layout;
                    Counters::bump(&counters.barriers);
                }
                for _ in buffers {
                    Counters::bump(&counters.barriers);
                }
            }
            Command::CopyBuffer { src, dst, regions } => {
                for region in regions {
                    copy(
                        counters,
                        "vkCmdCopyBuffer",
                        &src.memory,
                        &dst.memory,
                        RowCopy::linear(region.src, region.dst, region.size),
                    );
                }
                Counters::bump(&counters.copies);
            }
            Command::CopyImage { src, dst, regions } => {
                let src_layout = *src.state.lock();
                let dst_layout = *dst.state.lock();
                if !src_layout.is_transfer_src() || !dst_layout.is_transfer_dst() {
                    counters.validation_error(format_args!(
                        "vkCmdCopyImage: image layouts {:?} -> {:?} are invalid for transfer",
                        src_layout, dst_layout
                    ));
                }
                if src.info.format != dst.info.format {
                    counters.validation_error(format_args!(
                        "vkCmdCopyImage: formats {:?} and {:?} don't match",
                        src.info.format, dst.info.format
                    ));
                    return;
                }
                for region in regions {
                    copy(
                        counters,
                        "vkCmdCopyImage",
                        &src.memory,
                        &dst.memory,
                        RowCopy::image(&src.info, &dst.info, region),
                    );
                }
                Counters::bump(&counters.copies);
            }
            Command::CopyBufferToImage { src, dst, regions } => {
                let dst_layout = *dst.state.lock();
                if !dst_layout.is_transfer_dst() {
                    counters.validation_error(format_args!(
                        "vkCmdCopyBufferToImage: image layout {:?} is invalid for transfer",
                        dst_layout
                    ));
                }
                for region in regions {
                    copy(
                        counters,
                        "vkCmdCopyBufferToImage",
                        &src.memory,
                        &dst.memory,
                        RowCopy::buffer_to_image(&dst.info, region),
                    );
                }
                Counters::bump(&counters.copies);
            }
            Command::BeginRenderPass { attachments, clear } => {
                for attachment in attachments {
                    let layout = *attachment.state.lock();
                    if layout != ImageLayout::ColorAttachmentOptimal && layout != ImageLayout::General
                    {
                        counters.validation_error(format_args!(
                            "vkCmdBeginRenderPass: attachment {} is in layout {:?}",
                            attachment.id, layout
                        ));
                    }
                    if let Some(clear) = clear {
                        attachment.memory.fill(&clear.encode(attachment.info.format));
                    }
                }
            }
            Command::DrawIndexed { .. } => Counters::bump(&counters.draws),
            Command::Dispatch { .. } => Counters::bump(&counters.dispatches),
            Command::TraceRays { .. } => Counters::bump(&counters.traces),
            Command::EndRenderPass
            | Command::BindPipeline { .. }
            | Command::BindVertexBuffers { .. }
            | Command::BindIndexBuffer { .. }
            | Command::BindDescriptorSets { .. }
            | Command::ExecuteCommands(_) => {}
        }
    }

    fn nested(&self) -> &[Nested<Self>] {
        match self {
            Command::ExecuteCommands(nested) => nested,
            _ => &[],
        }
    }
}

pub(super) fn reject(call: &'static str, misuse: Misuse) -> DeviceError {
    log::debug!("{} rejected: {:?}", call, misuse);
    DeviceError::rejected(call, VK_ERROR_VALIDATION_FAILED)
}

/// Command buffer allocated from a per-queue command pool.
#[derive(Debug)]
pub struct CommandBuffer {
    commands: Commands<Command>,
    render_pass: bool,
}

impl CommandBuffer {
    pub(super) fn new(queue: QueueType, level: CommandLevel, counters: Arc<Counters>) -> Self {
        CommandBuffer {
            commands: Commands::new(queue, level, counters),
            render_pass: false,
        }
    }

    pub(super) fn commands(&self) -> &Commands<Command> {
        &self.commands
    }
}

impl hal::command::CommandBuffer<Backend> for CommandBuffer {
    fn level(&self) -> CommandLevel {
        self.commands.level()
    }

    fn queue_type(&self) -> QueueType {
        self.commands.queue()
    }

    unsafe fn begin(
        &mut self,
        flags: CommandBufferFlags,
        inheritance: Option<Inheritance<'_, Backend>>,
    ) -> Result<(), DeviceError> {
        self.commands
            .begin(flags)
            .map_err(|misuse| reject("vkBeginCommandBuffer", misuse))?;
        self.render_pass = match inheritance {
            Some(inheritance) => {
                flags.contains(CommandBufferFlags::RENDER_TARGET_CONTINUE)
                    && !inheritance.targets.is_empty()
            }
            None => false,
        };
        Ok(())
    }

    unsafe fn reset(&mut self) -> Result<(), DeviceError> {
        self.render_pass = false;
        self.commands
            .reset()
            .map_err(|misuse| reject("vkResetCommandBuffer", misuse))
    }

    unsafe fn finish(&mut self) -> Result<(), DeviceError> {
        if self.render_pass && self.commands.level() == CommandLevel::Primary {
            self.commands.counters().validation_error(format_args!(
                "vkEndCommandBuffer: command buffer {} ends inside render pass",
                self.commands.id()
            ));
        }
        self.commands
            .finish()
            .map_err(|misuse| reject("vkEndCommandBuffer", misuse))
    }

    unsafe fn transition(&mut self, barriers: &[Barrier<'_, Backend>]) {
        let mut buffers = SmallVec::new();
        let mut images = SmallVec::new();
        for barrier in barriers {
            let states = barrier.states();
            match barrier {
                Barrier::Buffer { target, .. } => buffers.push(BufferMemoryBarrier {
                    buffer: (*target).clone(),
                    src_access: AccessFlags::from_state(states.start),
                    dst_access: AccessFlags::from_state(states.end),
                }),
                Barrier::Image { target, .. } => images.push(ImageMemoryBarrier {
                    image: (*target).clone(),
                    old_layout: ImageLayout::from_state(states.start),
                    new_layout: ImageLayout::from_state(states.end),
                    src_access: AccessFlags::from_state(states.start),
                    dst_access: AccessFlags::from_state(states.end),
                }),
            }
        }
        self.commands
            .push(Command::PipelineBarrier { buffers, images });
    }

    unsafe fn copy_buffer(&mut self, src: &Buffer, dst: &Buffer, regions: &[BufferCopy]) {
        self.commands.push(Command::CopyBuffer {
            src: src.clone(),
            dst: dst.clone(),
            regions: regions.iter().cloned().collect(),
        });
    }

    unsafe fn copy_image(&mut self, src: &Image, dst: &Image, regions: &[ImageCopy]) {
        self.commands.push(Command::CopyImage {
            src: src.clone(),
            dst: dst.clone(),
            regions: regions.iter().cloned().collect(),
        });
    }

    unsafe fn copy_buffer_to_image(&mut self, src: &Buffer, dst: &Image, regions: &[BufferImageCopy]) {
        self.commands.push(Command::CopyBufferToImage {
            src: src.clone(),
            dst: dst.clone(),
            regions: regions.iter().cloned().collect(),
        });
    }

    unsafe fn begin_render_target(&mut self, targets: &[Image], clear: Option<ClearColor>) {
        self.commands
            .require_queue(&[QueueType::Graphics], "vkCmdBeginRenderPass");
        if self.render_pass {
            self.commands.counters().validation_error(format_args!(
                "vkCmdBeginRenderPass: command buffer {} is already inside render pass",
                self.commands.id()
            ));
        }
        self.render_pass = true;
        self.commands.push(Command::BeginRenderPass {
            attachments: targets.iter().cloned().collect(),
            clear,
        });
    }

    unsafe fn end_render_target(&mut self) {
        if !self.render_pass {
            self.commands.counters().validation_error(format_args!(
                "vkCmdEndRenderPass: command buffer {} is outside of render pass",
                self.commands.id()
            ));
        }
        self.render_pass = false;
        self.commands.push(Command::EndRenderPass);
    }

    unsafe fn bind_pipeline(&mut self, pipeline: &crate::host::Pipeline) {
        self.commands.push(Command::BindPipeline {
            bind_point: pipeline.bind_point,
            pipeline: pipeline.id,
        });
    }

    unsafe fn bind_vertex_buffers(&mut self, first: u32, buffers: &[(Buffer, u64)]) {
        self.commands.push(Command::BindVertexBuffers {
            first_binding: first,
            buffers: buffers
                .iter()
                .map(|(buffer, offset)| (buffer.id, *offset))
                .collect(),
        });
    }

    unsafe fn bind_index_buffer(&mut self, buffer: &Buffer, offset: u64, index_type: IndexType) {
        self.commands.push(Command::BindIndexBuffer {
            buffer: buffer.id,
            offset,
            index_type,
        });
    }

    unsafe fn bind_descriptor_heap(
        &mut self,
        bind_point: BindPoint,
        set: u32,
        heap: &crate::host::heap::DescriptorHeap,
        offsets: DescriptorOffsets,
    ) {
        self.commands.push(Command::BindDescriptorSets {
            bind_point,
            first_set: set,
            pool: heap.id(),
            offsets,
        });
    }

    unsafe fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        self.commands
            .require_queue(&[QueueType::Graphics], "vkCmdDrawIndexed");
        if !self.render_pass {
            self.commands.counters().validation_error(format_args!(
                "vkCmdDrawIndexed: command buffer {} is outside of render pass",
                self.commands.id()
            ));
        }
        self.commands.push(Command::DrawIndexed {
            indices,
            vertex_offset: base_vertex,
            instances,
        });
    }

    unsafe fn dispatch(&mut self, groups: [u32; 3]) {
        self.commands
            .require_queue(&[QueueType::Graphics, QueueType::Compute], "vkCmdDispatch");
        self.commands.push(Command::Dispatch {
            group_count: groups,
        });
    }

    unsafe fn trace_rays(&mut self, size: [u32; 3]) {
        self.commands
            .require_queue(&[QueueType::Graphics, QueueType::Compute], "vkCmdTraceRaysKHR");
        self.commands.push(Command::TraceRays { size });
    }

    unsafe fn execute_commands(&mut self, buffers: &[&CommandBuffer]) {
        let nested = buffers
            .iter()
            .filter_map(|buffer| buffer.commands.nested())
            .collect();
        self.commands.push(Command::ExecuteCommands(nested));
    }
}
