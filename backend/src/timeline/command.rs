//! Command lists recording resource-state native commands.

use {
    super::{Backend, Buffer, DescriptorHeap, Image, ResourceStates, E_INVALIDARG},
    crate::host::{
        command::{Commands, HostCommand, Misuse, Nested},
        counters::Counters,
        memory::{Memory, RowCopy},
        Pipeline,
    },
    kiln_core::{
        hal::{
            self,
            command::{Barrier, Inheritance},
        },
        BindPoint, BufferCopy, BufferImageCopy, ClearColor, CommandBufferFlags, CommandLevel,
        DescriptorOffsets, DeviceError, HeapVisibility, ImageCopy, IndexType, QueueType,
    },
    parking_lot::Mutex,
    smallvec::SmallVec,
    std::{ops::Range, sync::Arc},
};

/// Transitioned resource.
#[derive(Clone, Debug)]
pub enum BarrierResource {
    /// Buffer.
    Buffer(Buffer),
    /// Texture.
    Texture(Image),
}

impl BarrierResource {
    fn id(&self) -> u64 {
        match self {
            BarrierResource::Buffer(buffer) => buffer.id,
            BarrierResource::Texture(image) => image.id,
        }
    }

    fn state(&self) -> &Arc<Mutex<ResourceStates>> {
        match self {
            BarrierResource::Buffer(buffer) => &buffer.state,
            BarrierResource::Texture(image) => &image.state,
        }
    }
}

/// Resource state transition.
#[derive(Clone, Debug)]
pub struct TransitionBarrier {
    /// Resource.
    pub resource: BarrierResource,
    /// State before.
    pub before: ResourceStates,
    /// State after.
    pub after: ResourceStates,
}

/// Source of a texture copy.
#[derive(Clone, Debug)]
pub enum TextureCopySource {
    /// Region of another texture.
    Texture(Image, ImageCopy),
    /// Tightly packed texels in a buffer.
    PlacedFootprint(Buffer, BufferImageCopy),
}

/// Native command.
#[derive(Clone, Debug)]
pub enum Command {
    /// State transitions.
    ResourceBarrier(SmallVec<[TransitionBarrier; 4]>),
    /// Buffer to buffer copy.
    CopyBufferRegion {
        /// Destination.
        dst: Buffer,
        /// Source.
        src: Buffer,
        /// Region.
        region: BufferCopy,
    },
    /// Copy into texture.
    CopyTextureRegion {
        /// Destination.
        dst: Image,
        /// Source.
        src: TextureCopySource,
    },
    /// Bind render targets. Empty list unbinds.
    OmSetRenderTargets(SmallVec<[Image; 4]>),
    /// Clear render target.
    ClearRenderTargetView {
        /// Target.
        target: Image,
        /// Color.
        color: ClearColor,
    },
    /// Set pipeline state.
    SetPipelineState(u64),
    /// Bind vertex buffers.
    IaSetVertexBuffers {
        /// First slot.
        start_slot: u32,
        /// Buffer ids and offsets.
        views: SmallVec<[(u64, u64); 4]>,
    },
    /// Bind index buffer.
    IaSetIndexBuffer {
        /// Buffer id.
        buffer: u64,
        /// Offset.
        offset: u64,
        /// Index type.
        format: IndexType,
    },
    /// Bind descriptor heap.
    SetDescriptorHeaps(u64),
    /// Bind descriptor table located in the bound heap.
    SetRootDescriptorTable {
        /// Bind point.
        bind_point: BindPoint,
        /// Root parameter.
        root_parameter: u32,
        /// Table offsets.
        offsets: DescriptorOffsets,
    },
    /// Indexed draw.
    DrawIndexedInstanced {
        /// Indices.
        indices: Range<u32>,
        /// Added to each index.
        base_vertex: i32,
        /// Instances.
        instances: Range<u32>,
    },
    /// Compute dispatch.
    Dispatch([u32; 3]),
    /// Ray-tracing dispatch.
    DispatchRays([u32; 3]),
    /// Execute bundles.
    ExecuteBundle(Vec<Nested<Command>>),
}

fn copy(counters: &Counters, what: &str, src: &Memory, dst: &Memory, region: RowCopy) {
    if let Err(err) = Memory::copy(src, dst, region) {
        counters.validation_error(format_args!("{}: {}", what, err));
    }
}

fn check_copy_states(
    counters: &Counters,
    what: &str,
    src: &Arc<Mutex<ResourceStates>>,
    dst: &Arc<Mutex<ResourceStates>>,
) {
    let src = *src.lock();
    let dst = *dst.lock();
    if !src.contains(ResourceStates::COPY_SOURCE) || dst != ResourceStates::COPY_DEST {
        counters.validation_error(format_args!(
            "{}: copy from state {:?} to state {:?}",
            what, src, dst
        ));
    }
}

impl HostCommand for Command {
    fn execute(&self, counters: &Counters) {
        match self {
            Command::ResourceBarrier(barriers) => {
                for barrier in barriers {
                    let mut state = barrier.resource.state().lock();
                    if *state != barrier.before {
                        counters.validation_error(format_args!(
                            "ResourceBarrier: resource {} before state {:?} doesn't match current state {:?}",
                            barrier.resource.id(),
                            barrier.before,
                            *state
                        ));
                    }
                    *state = barrier.after;
                    Counters::bump(&counters.barriers);
                }
            }
            Command::CopyBufferRegion { dst, src, region } => {
                check_copy_states(counters, "CopyBufferRegion", &src.state, &dst.state);
                copy(
                    counters,
                    "CopyBufferRegion",
                    &src.memory,
                    &dst.memory,
                    RowCopy::linear(region.src, region.dst, region.size),
                );
                Counters::bump(&counters.copies);
            }
            Command::CopyTextureRegion { dst, src } => {
                match src {
                    TextureCopySource::Texture(src, region) => {
                        check_copy_states(counters, "CopyTextureRegion", &src.state, &dst.state);
                        if src.info.format != dst.info.format {
                            counters.validation_error(format_args!(
                                "CopyTextureRegion: formats {:?} and {:?} don't match",
                                src.info.format, dst.info.format
                            ));
                            return;
                        }
                        copy(
                            counters,
                            "CopyTextureRegion",
                            &src.memory,
                            &dst.memory,
                            RowCopy::image(&src.info, &dst.info, region),
                        );
                    }
                    TextureCopySource::PlacedFootprint(src, region) => {
                        check_copy_states(counters, "CopyTextureRegion", &src.state, &dst.state);
                        copy(
                            counters,
                            "CopyTextureRegion",
                            &src.memory,
                            &dst.memory,
                            RowCopy::buffer_to_image(&dst.info, region),
                        );
                    }
                }
                Counters::bump(&counters.copies);
            }
            Command::OmSetRenderTargets(targets) => {
                for target in targets {
                    let state = *target.state.lock();
                    if state != ResourceStates::RENDER_TARGET {
                        counters.validation_error(format_args!(
                            "OMSetRenderTargets: target {} is in state {:?}",
                            target.id, state
                        ));
                    }
                }
            }
            Command::ClearRenderTargetView { target, color } => {
                target.memory.fill(&color.encode(target.info.format));
            }
            Command::DrawIndexedInstanced { .. } => Counters::bump(&counters.draws),
            Command::Dispatch(_) => Counters::bump(&counters.dispatches),
            Command::DispatchRays(_) => Counters::bump(&counters.traces),
            Command::SetPipelineState(_)
            | Command::IaSetVertexBuffers { .. }
            | Command::IaSetIndexBuffer { .. }
            | Command::SetDescriptorHeaps(_)
            | Command::SetRootDescriptorTable { .. }
            | Command::ExecuteBundle(_) => {}
        }
    }

    fn nested(&self) -> &[Nested<Self>] {
        match self {
            Command::ExecuteBundle(nested) => nested,
            _ => &[],
        }
    }
}

pub(super) fn reject(call: &'static str, misuse: Misuse) -> DeviceError {
    log::debug!("{} rejected: {:?}", call, misuse);
    DeviceError::rejected(call, E_INVALIDARG)
}

/// Command list with its own allocator.
#[derive(Debug)]
pub struct CommandList {
    commands: Commands<Command>,
    bound_heap: Option<u64>,
}

impl CommandList {
    pub(super) fn new(queue: QueueType, level: CommandLevel, counters: Arc<Counters>) -> Self {
        CommandList {
            commands: Commands::new(queue, level, counters),
            bound_heap: None,
        }
    }

    pub(super) fn commands(&self) -> &Commands<Command> {
        &self.commands
    }
}

impl hal::command::CommandBuffer<Backend> for CommandList {
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
            .map_err(|misuse| reject("ID3D12GraphicsCommandList::Reset", misuse))?;
        self.bound_heap = None;
        if let Some(inheritance) = inheritance {
            if !inheritance.targets.is_empty() {
                self.commands
                    .push(Command::OmSetRenderTargets(inheritance.targets.iter().cloned().collect()));
            }
        }
        Ok(())
    }

    unsafe fn reset(&mut self) -> Result<(), DeviceError> {
        self.commands
            .reset()
            .map_err(|misuse| reject("ID3D12CommandAllocator::Reset", misuse))
    }

    unsafe fn finish(&mut self) -> Result<(), DeviceError> {
        self.commands
            .finish()
            .map_err(|misuse| reject("ID3D12GraphicsCommandList::Close", misuse))
    }

    unsafe fn transition(&mut self, barriers: &[Barrier<'_, Backend>]) {
        let barriers: SmallVec<_> = barriers
            .iter()
            .filter_map(|barrier| {
                let states = barrier.states();
                let before = ResourceStates::from_state(states.start);
                let after = ResourceStates::from_state(states.end);
                if before == after {
                    return None;
                }
                let resource = match barrier {
                    Barrier::Buffer { target, .. } => BarrierResource::Buffer((*target).clone()),
                    Barrier::Image { target, .. } => BarrierResource::Texture((*target).clone()),
                };
                Some(TransitionBarrier {
                    resource,
                    before,
                    after,
                })
            })
            .collect();

        if !barriers.is_empty() {
            self.commands.push(Command::ResourceBarrier(barriers));
        }
    }

    unsafe fn copy_buffer(&mut self, src: &Buffer, dst: &Buffer, regions: &[BufferCopy]) {
        for region in regions {
            self.commands.push(Command::CopyBufferRegion {
                dst: dst.clone(),
                src: src.clone(),
                region: *region,
            });
        }
    }

    unsafe fn copy_image(&mut self, src: &Image, dst: &Image, regions: &[ImageCopy]) {
        for region in regions {
            self.commands.push(Command::CopyTextureRegion {
                dst: dst.clone(),
                src: TextureCopySource::Texture(src.clone(), *region),
            });
        }
    }

    unsafe fn copy_buffer_to_image(&mut self, src: &Buffer, dst: &Image, regions: &[BufferImageCopy]) {
        for region in regions {
            self.commands.push(Command::CopyTextureRegion {
                dst: dst.clone(),
                src: TextureCopySource::PlacedFootprint(src.clone(), *region),
            });
        }
    }

    unsafe fn begin_render_target(&mut self, targets: &[Image], clear: Option<ClearColor>) {
        self.commands
            .require_queue(&[QueueType::Graphics], "OMSetRenderTargets");
        self.commands
            .push(Command::OmSetRenderTargets(targets.iter().cloned().collect()));
        if let Some(color) = clear {
            for target in targets {
                self.commands.push(Command::ClearRenderTargetView {
                    target: target.clone(),
                    color,
                });
            }
        }
    }

    unsafe fn end_render_target(&mut self) {
        self.commands.push(Command::OmSetRenderTargets(SmallVec::new()));
    }

    unsafe fn bind_pipeline(&mut self, pipeline: &Pipeline) {
        self.commands.push(Command::SetPipelineState(pipeline.id));
    }

    unsafe fn bind_vertex_buffers(&mut self, first: u32, buffers: &[(Buffer, u64)]) {
        self.commands.push(Command::IaSetVertexBuffers {
            start_slot: first,
            views: buffers
                .iter()
                .map(|(buffer, offset)| (buffer.id, *offset))
                .collect(),
        });
    }

    unsafe fn bind_index_buffer(&mut self, buffer: &Buffer, offset: u64, index_type: IndexType) {
        self.commands.push(Command::IaSetIndexBuffer {
            buffer: buffer.id,
            offset,
            format: index_type,
        });
    }

    unsafe fn bind_descriptor_heap(
        &mut self,
        bind_point: BindPoint,
        set: u32,
        heap: &DescriptorHeap,
        offsets: DescriptorOffsets,
    ) {
        if heap.desc().visibility != HeapVisibility::ShaderVisible {
            self.commands.counters().validation_error(format_args!(
                "SetDescriptorHeaps: heap {} is not shader visible",
                heap.id()
            ));
        }
        if self.bound_heap != Some(heap.id()) {
            self.bound_heap = Some(heap.id());
            self.commands.push(Command::SetDescriptorHeaps(heap.id()));
        }
        self.commands.push(Command::SetRootDescriptorTable {
            bind_point,
            root_parameter: set,
            offsets,
        });
    }

    unsafe fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        self.commands
            .require_queue(&[QueueType::Graphics], "DrawIndexedInstanced");
        self.commands.push(Command::DrawIndexedInstanced {
            indices,
            base_vertex,
            instances,
        });
    }

    unsafe fn dispatch(&mut self, groups: [u32; 3]) {
        self.commands
            .require_queue(&[QueueType::Graphics, QueueType::Compute], "Dispatch");
        self.commands.push(Command::Dispatch(groups));
    }

    unsafe fn trace_rays(&mut self, size: [u32; 3]) {
        self.commands
            .require_queue(&[QueueType::Graphics, QueueType::Compute], "DispatchRays");
        self.commands.push(Command::DispatchRays(size));
    }

    unsafe fn execute_commands(&mut self, lists: &[&CommandList]) {
        let nested = lists
            .iter()
            .filter_map(|list| list.commands.nested())
            .collect();
        self.commands.push(Command::ExecuteBundle(nested));
    }
}
