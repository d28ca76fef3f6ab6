//! Command recorder.
//!
//! Recorder owns a ring of command buffer slots. Each primary slot has its own
//! fence, so a slot can be recorded while the previous ones are still executing.
//! Every slot goes through `Idle -> Recording -> Ended -> Pending -> Idle`.
//! Recorder tracks resource states while recording and inserts transition
//! barriers before operations that require particular state.

use {
    crate::{
        error::RecorderError, fence::Fence, queue::Queues, submission::Submission,
        swapchain::Swapchain,
    },
    kiln_core::{
        hal::{
            command::{Barrier, CommandBuffer as _, Inheritance},
            device::Device as _,
            queue::SyncPoint,
            Backend,
        },
        BindPoint, BufferCopy, BufferImageCopy, ClearColor, CommandBufferFlags, CommandLevel,
        Device, DeviceError, Extent, ImageCopy, IndexType, Offset, QueueType, ResourceState,
        SteadyStatePolicy,
    },
    kiln_descriptor::{DescriptorManager, DescriptorSet},
    kiln_resource::{Buffer, Image, KeepAlive, Pipeline},
    parking_lot::{Mutex, MutexGuard},
    smallvec::SmallVec,
    std::{
        mem::ManuallyDrop,
        ops::Range,
        sync::{Arc, Weak},
    },
    thread_profiler::profile_scope,
};

/// Queue and level the recorder is created for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RecorderUsage {
    /// Primary buffers for the graphics queue.
    Graphics,
    /// Primary buffers for the compute queue.
    Compute,
    /// Primary buffers for the transfer queue.
    Transfer,
    /// Secondary buffers executed by graphics primaries.
    Secondary,
}

impl Default for RecorderUsage {
    fn default() -> Self {
        RecorderUsage::Graphics
    }
}

impl RecorderUsage {
    /// Queue recorded commands execute on.
    pub fn queue(self) -> QueueType {
        match self {
            RecorderUsage::Graphics | RecorderUsage::Secondary => QueueType::Graphics,
            RecorderUsage::Compute => QueueType::Compute,
            RecorderUsage::Transfer => QueueType::Transfer,
        }
    }

    /// Level of the command buffers.
    pub fn level(self) -> CommandLevel {
        match self {
            RecorderUsage::Secondary => CommandLevel::Secondary,
            _ => CommandLevel::Primary,
        }
    }
}

/// State of a recorder slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordingState {
    /// Ready to begin recording.
    Idle,
    /// Between `begin` and `end`.
    Recording,
    /// Recorded and ready for submission or nested execution.
    Ended,
    /// Submitted and not yet observed complete.
    Pending,
}

/// Result of waiting for submitted work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WaitStatus {
    /// All waited work is complete.
    Complete,
    /// Timeout expired first.
    Timeout,
}

/// Recorder creation parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct RecorderConfig {
    /// Queue and level of command buffers.
    pub usage: RecorderUsage,

    /// Number of slots in the ring.
    pub buffer_count: usize,

    /// State resources settle in after an operation leaves them undefined.
    pub steady_state: SteadyStatePolicy,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        RecorderConfig {
            usage: RecorderUsage::Graphics,
            buffer_count: 1,
            steady_state: SteadyStatePolicy::General,
        }
    }
}

type SharedSlot<B> = Arc<Mutex<Slot<B>>>;

#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
struct Slot<B: Backend> {
    #[derivative(Debug = "ignore")]
    device: Arc<Device<B>>,
    raw: ManuallyDrop<B::CommandBuffer>,

    /// Secondary slots complete together with their host.
    fence: Option<Fence<B>>,
    state: RecordingState,

    #[derivative(Debug = "ignore")]
    keep_alive: Vec<KeepAlive>,

    /// Secondary slots executed by this slot.
    children: Vec<SharedSlot<B>>,

    /// Primary slot that executes this secondary slot.
    #[derivative(Debug = "ignore")]
    host: Option<Weak<Mutex<Slot<B>>>>,

    /// Render target binding opened by this slot.
    render_targets: Option<SmallVec<[B::Image; 4]>>,

    /// Render target binding inherited from the primary.
    inherited: Option<SmallVec<[B::Image; 4]>>,
}

impl<B> Slot<B>
where
    B: Backend,
{
    fn new(device: &Arc<Device<B>>, usage: RecorderUsage) -> Result<Self, DeviceError> {
        let raw = device.create_command_buffer(usage.queue(), usage.level())?;
        let fence = match usage.level() {
            CommandLevel::Primary => match Fence::new(device, false) {
                Ok(fence) => Some(fence),
                Err(err) => {
                    unsafe { device.destroy_command_buffer(raw) };
                    return Err(err);
                }
            },
            CommandLevel::Secondary => None,
        };

        Ok(Slot {
            device: device.clone(),
            raw: ManuallyDrop::new(raw),
            fence,
            state: RecordingState::Idle,
            keep_alive: Vec::new(),
            children: Vec::new(),
            host: None,
            render_targets: None,
            inherited: None,
        })
    }

    /// Observed completion releases everything the recording referenced.
    fn complete(&mut self) {
        self.state = RecordingState::Idle;
        self.keep_alive.clear();
        self.host = None;
    }

    fn barriers(&mut self, barriers: &[Barrier<'_, B>]) {
        if !barriers.is_empty() {
            unsafe { self.raw.transition(barriers) }
        }
    }
}

impl<B> Drop for Slot<B>
where
    B: Backend,
{
    fn drop(&mut self) {
        if let Some(mut fence) = self.fence.take() {
            if fence.is_submitted() {
                match fence.wait_signaled(&self.device, !0) {
                    Ok(true) => {}
                    Ok(false) => {
                        log::error!("Fence wait timed out. Command buffer leaked");
                        std::mem::forget(fence);
                        return;
                    }
                    Err(err) => {
                        log::error!("Fence wait failed: {}. Command buffer leaked", err);
                        std::mem::forget(fence);
                        return;
                    }
                }
            }
            fence.dispose(&self.device);
        }
        unsafe {
            let raw = ManuallyDrop::take(&mut self.raw);
            self.device.destroy_command_buffer(raw);
        }
    }
}

/// Lock slot that must be recording.
fn recording<'a, B: Backend>(
    slot: &'a SharedSlot<B>,
    operation: &'static str,
) -> Result<MutexGuard<'a, Slot<B>>, RecorderError> {
    let slot = slot.lock();
    if slot.state != RecordingState::Recording {
        log::error!("`{}` called in {:?} state", operation, slot.state);
        return Err(RecorderError::InvalidState {
            operation,
            state: slot.state,
        });
    }
    Ok(slot)
}

/// Resource with tracked state.
trait Tracked {
    type Backend: Backend;

    fn state(&self) -> ResourceState;
    fn steady_state(&self, policy: SteadyStatePolicy) -> ResourceState;
    fn transition_to(&mut self, state: ResourceState) -> Option<Range<ResourceState>>;
    fn barrier(&self, states: Range<ResourceState>) -> Barrier<'_, Self::Backend>;
    fn keep_alive(&self) -> KeepAlive;
}

impl<B> Tracked for Buffer<B>
where
    B: Backend,
{
    type Backend = B;

    fn state(&self) -> ResourceState {
        Buffer::state(self)
    }

    fn steady_state(&self, policy: SteadyStatePolicy) -> ResourceState {
        Buffer::steady_state(self, policy)
    }

    fn transition_to(&mut self, state: ResourceState) -> Option<Range<ResourceState>> {
        Buffer::transition_to(self, state)
    }

    fn barrier(&self, states: Range<ResourceState>) -> Barrier<'_, B> {
        Barrier::Buffer {
            target: self.raw(),
            states,
        }
    }

    fn keep_alive(&self) -> KeepAlive {
        Buffer::keep_alive(self)
    }
}

impl<B> Tracked for Image<B>
where
    B: Backend,
{
    type Backend = B;

    fn state(&self) -> ResourceState {
        Image::state(self)
    }

    fn steady_state(&self, policy: SteadyStatePolicy) -> ResourceState {
        Image::steady_state(self, policy)
    }

    fn transition_to(&mut self, state: ResourceState) -> Option<Range<ResourceState>> {
        Image::transition_to(self, state)
    }

    fn barrier(&self, states: Range<ResourceState>) -> Barrier<'_, B> {
        Barrier::Image {
            target: self.raw(),
            states,
        }
    }

    fn keep_alive(&self) -> KeepAlive {
        Image::keep_alive(self)
    }
}

/// Move resource into state that satisfies `required`.
fn acquire<T: Tracked>(resource: &mut T, required: ResourceState) -> Option<Range<ResourceState>> {
    if resource.state().satisfies(required) {
        None
    } else {
        resource.transition_to(required)
    }
}

/// Move resource back into the state it was in before `acquire`.
/// Undefined content settles in the steady state instead.
fn release<T: Tracked>(
    resource: &mut T,
    acquired: Option<Range<ResourceState>>,
    policy: SteadyStatePolicy,
) -> Option<Range<ResourceState>> {
    let prior = acquired?.start;
    let state = match prior {
        ResourceState::Undefined => resource.steady_state(policy),
        state => state,
    };
    resource.transition_to(state)
}

/// Record barriers of two resources at once.
fn barrier_pair<B, S, D>(
    slot: &mut Slot<B>,
    src: (&S, Option<Range<ResourceState>>),
    dst: (&D, Option<Range<ResourceState>>),
) where
    B: Backend,
    S: Tracked<Backend = B>,
    D: Tracked<Backend = B>,
{
    let barriers: SmallVec<[Barrier<'_, B>; 2]> = [
        src.1.map(|states| src.0.barrier(states)),
        dst.1.map(|states| dst.0.barrier(states)),
    ]
    .into_iter()
    .flatten()
    .collect();
    slot.barriers(&barriers);
}

/// Command recorder over a ring of command buffers.
///
/// # Parameters
///
/// `B` - backend.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
pub struct CommandRecorder<B: Backend> {
    #[derivative(Debug = "ignore")]
    queues: Arc<Queues<B>>,
    usage: RecorderUsage,
    policy: SteadyStatePolicy,
    slots: Vec<SharedSlot<B>>,
    current: usize,
    last_submitted: Option<usize>,

    /// Nested recorders begun inside the current recording.
    children: Vec<SharedSlot<B>>,
}

impl<B> CommandRecorder<B>
where
    B: Backend,
{
    /// Create recorder with `config.buffer_count` slots.
    /// Zero slots are replaced by one.
    pub fn new(queues: &Arc<Queues<B>>, config: RecorderConfig) -> Result<Self, RecorderError> {
        let count = if config.buffer_count == 0 {
            log::warn!("Recorder can't have zero command buffers. Using one");
            1
        } else {
            config.buffer_count
        };

        let device = queues.device();
        let slots = (0..count)
            .map(|_| Slot::new(device, config.usage).map(|slot| Arc::new(Mutex::new(slot))))
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!(
            "{:?} recorder with {} command buffers created",
            config.usage,
            count
        );

        Ok(CommandRecorder {
            queues: queues.clone(),
            usage: config.usage,
            policy: config.steady_state,
            slots,
            current: 0,
            last_submitted: None,
            children: Vec::new(),
        })
    }

    /// Usage of the recorder.
    pub fn usage(&self) -> RecorderUsage {
        self.usage
    }

    /// Steady state policy of the recorder.
    pub fn policy(&self) -> SteadyStatePolicy {
        self.policy
    }

    /// Number of slots.
    pub fn buffer_count(&self) -> usize {
        self.slots.len()
    }

    /// Index of the current slot.
    pub fn index(&self) -> usize {
        self.current
    }

    /// State of the current slot.
    pub fn state(&self) -> RecordingState {
        self.slots[self.current].lock().state
    }

    /// Begin recording into the current slot.
    /// If the slot is still pending this waits for its completion first.
    pub fn begin(&mut self) -> Result<(), RecorderError> {
        profile_scope!("begin");
        if self.usage == RecorderUsage::Secondary {
            log::trace!("Secondary recorder begins without render target inheritance");
        }
        self.begin_with(None)
    }

    /// Begin recording secondary commands executed by `parent`.
    /// Render target binding of `parent` is inherited.
    pub fn begin_nested(&mut self, parent: &mut CommandRecorder<B>) -> Result<(), RecorderError> {
        profile_scope!("begin_nested");
        if self.usage != RecorderUsage::Secondary {
            log::error!("{:?} recorder can't be nested", self.usage);
            return Err(RecorderError::NotSecondary);
        }

        let inherited = {
            let slot = recording(&parent.slots[parent.current], "begin_nested")?;
            slot.render_targets.clone().or_else(|| slot.inherited.clone())
        };

        self.begin_with(inherited)?;
        parent.children.push(self.slots[self.current].clone());
        Ok(())
    }

    fn begin_with(&mut self, inherited: Option<SmallVec<[B::Image; 4]>>) -> Result<(), RecorderError> {
        let state = self.state();
        if state == RecordingState::Recording {
            log::error!("Slot {} is already recording", self.current);
            return Err(RecorderError::InvalidState {
                operation: "begin",
                state,
            });
        }

        if state == RecordingState::Pending {
            log::trace!("Slot {} is pending. Waiting", self.current);
            self.observe(self.current, !0)?;
        }

        let mut slot = self.slots[self.current].lock();
        let children = std::mem::take(&mut slot.children);
        let device = slot.device.clone();
        if let Some(fence) = slot.fence.as_mut() {
            fence.reset(&device)?;
        }
        slot.keep_alive.clear();

        let flags = match inherited {
            Some(_) => CommandBufferFlags::ONE_TIME_SUBMIT | CommandBufferFlags::RENDER_TARGET_CONTINUE,
            None => CommandBufferFlags::ONE_TIME_SUBMIT,
        };
        unsafe {
            slot.raw.reset()?;
            slot.raw.begin(
                flags,
                inherited
                    .as_ref()
                    .map(|targets| Inheritance { targets: &targets[..] }),
            )?;
        }

        slot.render_targets = None;
        slot.inherited = inherited;
        slot.state = RecordingState::Recording;
        drop(slot);
        drop(children);

        log::trace!("{:?} recorder slot {} begins", self.usage, self.current);
        Ok(())
    }

    /// Finish recording of the current slot.
    pub fn end(&mut self) -> Result<(), RecorderError> {
        profile_scope!("end");
        let mut slot = recording(&self.slots[self.current], "end")?;
        if !self.children.is_empty() {
            log::warn!(
                "{} nested recorders were never executed",
                self.children.len()
            );
            self.children.clear();
        }

        unsafe {
            if slot.render_targets.take().is_some() {
                slot.raw.end_render_target();
            }
            slot.raw.finish()?;
        }
        slot.state = RecordingState::Ended;
        log::trace!("{:?} recorder slot {} ended", self.usage, self.current);
        Ok(())
    }

    /// Advance to the next slot of the ring.
    /// Returns index of the new current slot.
    pub fn next(&mut self) -> Result<usize, RecorderError> {
        let state = self.state();
        if state == RecordingState::Recording {
            log::error!("Can't advance while slot {} is recording", self.current);
            return Err(RecorderError::InvalidState {
                operation: "next",
                state,
            });
        }
        self.current = (self.current + 1) % self.slots.len();
        Ok(self.current)
    }

    /// Copy bytes between buffers.
    /// Both buffers are returned into their prior states after the copy.
    pub fn copy_buffer(
        &mut self,
        src: &mut Buffer<B>,
        src_offset: u64,
        dst: &mut Buffer<B>,
        dst_offset: u64,
        size: u64,
    ) -> Result<(), RecorderError> {
        profile_scope!("copy_buffer");
        let mut slot = recording(&self.slots[self.current], "copy_buffer")?;

        let src_states = acquire(src, ResourceState::TransferSrc);
        let dst_states = acquire(dst, ResourceState::TransferDst);
        barrier_pair(&mut *slot, (&*src, src_states.clone()), (&*dst, dst_states.clone()));

        unsafe {
            slot.raw.copy_buffer(
                src.raw(),
                dst.raw(),
                &[BufferCopy {
                    src: src_offset,
                    dst: dst_offset,
                    size,
                }],
            );
        }

        let src_states = release(src, src_states, self.policy);
        let dst_states = release(dst, dst_states, self.policy);
        barrier_pair(&mut *slot, (&*src, src_states), (&*dst, dst_states));

        slot.keep_alive.push(Tracked::keep_alive(&*src));
        slot.keep_alive.push(Tracked::keep_alive(&*dst));
        Ok(())
    }

    /// Copy region between images.
    pub fn copy_image(
        &mut self,
        src: &mut Image<B>,
        dst: &mut Image<B>,
        region: ImageCopy,
    ) -> Result<(), RecorderError> {
        profile_scope!("copy_image");
        let mut slot = recording(&self.slots[self.current], "copy_image")?;

        let src_states = acquire(src, ResourceState::TransferSrc);
        let dst_states = acquire(dst, ResourceState::TransferDst);
        barrier_pair(&mut *slot, (&*src, src_states.clone()), (&*dst, dst_states.clone()));

        unsafe {
            slot.raw.copy_image(src.raw(), dst.raw(), &[region]);
        }

        let src_states = release(src, src_states, self.policy);
        let dst_states = release(dst, dst_states, self.policy);
        barrier_pair(&mut *slot, (&*src, src_states), (&*dst, dst_states));

        slot.keep_alive.push(Tracked::keep_alive(&*src));
        slot.keep_alive.push(Tracked::keep_alive(&*dst));
        Ok(())
    }

    /// Copy tightly packed texels from buffer into image region.
    pub fn copy_buffer_to_image(
        &mut self,
        src: &mut Buffer<B>,
        dst: &mut Image<B>,
        region: BufferImageCopy,
    ) -> Result<(), RecorderError> {
        profile_scope!("copy_buffer_to_image");
        let mut slot = recording(&self.slots[self.current], "copy_buffer_to_image")?;

        let src_states = acquire(src, ResourceState::TransferSrc);
        let dst_states = acquire(dst, ResourceState::TransferDst);
        barrier_pair(&mut *slot, (&*src, src_states.clone()), (&*dst, dst_states.clone()));

        unsafe {
            slot.raw.copy_buffer_to_image(src.raw(), dst.raw(), &[region]);
        }

        let src_states = release(src, src_states, self.policy);
        let dst_states = release(dst, dst_states, self.policy);
        barrier_pair(&mut *slot, (&*src, src_states), (&*dst, dst_states));

        slot.keep_alive.push(Tracked::keep_alive(&*src));
        slot.keep_alive.push(Tracked::keep_alive(&*dst));
        Ok(())
    }

    /// Copy image into the current backbuffer of the swapchain.
    /// Backbuffer is left presentable.
    pub fn copy_image_to_swapchain(
        &mut self,
        src: &mut Image<B>,
        swapchain: &mut dyn Swapchain<B>,
    ) -> Result<(), RecorderError> {
        profile_scope!("copy_image_to_swapchain");
        let mut slot = recording(&self.slots[self.current], "copy_image_to_swapchain")?;
        let dst = swapchain.backbuffer_mut();

        let extent = Extent {
            width: src.extent().width.min(dst.extent().width),
            height: src.extent().height.min(dst.extent().height),
        };

        let src_states = acquire(src, ResourceState::TransferSrc);
        let dst_states = dst.transition_to(ResourceState::TransferDst);
        barrier_pair(&mut *slot, (&*src, src_states.clone()), (&*dst, dst_states));

        unsafe {
            slot.raw.copy_image(
                src.raw(),
                dst.raw(),
                &[ImageCopy {
                    src_offset: Offset::default(),
                    dst_offset: Offset::default(),
                    extent,
                }],
            );
        }

        let src_states = release(src, src_states, self.policy);
        let dst_states = dst.transition_to(ResourceState::Present);
        barrier_pair(&mut *slot, (&*src, src_states), (&*dst, dst_states));

        slot.keep_alive.push(Tracked::keep_alive(&*src));
        slot.keep_alive.push(Tracked::keep_alive(&*dst));
        Ok(())
    }

    /// Move buffer into specified state.
    pub fn transition_buffer(
        &mut self,
        buffer: &mut Buffer<B>,
        state: ResourceState,
    ) -> Result<(), RecorderError> {
        let mut slot = recording(&self.slots[self.current], "transition_buffer")?;
        if let Some(states) = buffer.transition_to(state) {
            slot.barriers(&[Tracked::barrier(&*buffer, states)]);
        }
        slot.keep_alive.push(Tracked::keep_alive(&*buffer));
        Ok(())
    }

    /// Move image into specified state.
    pub fn transition_image(
        &mut self,
        image: &mut Image<B>,
        state: ResourceState,
    ) -> Result<(), RecorderError> {
        let mut slot = recording(&self.slots[self.current], "transition_image")?;
        if let Some(states) = image.transition_to(state) {
            slot.barriers(&[Tracked::barrier(&*image, states)]);
        }
        slot.keep_alive.push(Tracked::keep_alive(&*image));
        Ok(())
    }

    /// Bind render targets, optionally clearing them.
    /// Targets are moved into render target state.
    /// Binding opened earlier by this recording is closed first.
    pub fn begin_render_target(
        &mut self,
        targets: &mut [&mut Image<B>],
        clear: Option<ClearColor>,
    ) -> Result<(), RecorderError> {
        profile_scope!("begin_render_target");
        let mut slot = recording(&self.slots[self.current], "begin_render_target")?;
        if slot.render_targets.take().is_some() {
            log::warn!("Render target binding is replaced without being closed");
            unsafe { slot.raw.end_render_target() };
        }

        let states: SmallVec<[_; 4]> = targets
            .iter_mut()
            .map(|target| target.transition_to(ResourceState::RenderTarget))
            .collect();
        let barriers: SmallVec<[Barrier<'_, B>; 4]> = targets
            .iter()
            .zip(states)
            .filter_map(|(target, states)| states.map(|states| Tracked::barrier(&**target, states)))
            .collect();
        slot.barriers(&barriers);

        let raws: SmallVec<[B::Image; 4]> = targets.iter().map(|target| target.raw().clone()).collect();
        unsafe { slot.raw.begin_render_target(&raws, clear) };
        slot.render_targets = Some(raws);
        slot.keep_alive
            .extend(targets.iter().map(|target| Tracked::keep_alive(&**target)));
        Ok(())
    }

    /// Close render target binding.
    pub fn end_render_target(&mut self) -> Result<(), RecorderError> {
        let mut slot = recording(&self.slots[self.current], "end_render_target")?;
        if slot.render_targets.take().is_some() {
            unsafe { slot.raw.end_render_target() };
        } else {
            log::warn!("No render target binding to close");
        }
        Ok(())
    }

    /// Bind pipeline.
    pub fn bind_pipeline(&mut self, pipeline: &Pipeline<B>) -> Result<(), RecorderError> {
        let mut slot = recording(&self.slots[self.current], "bind_pipeline")?;
        unsafe { slot.raw.bind_pipeline(pipeline.raw()) };
        slot.keep_alive.push(pipeline.keep_alive());
        Ok(())
    }

    /// Bind vertex buffers starting from binding `first`.
    pub fn bind_vertex_buffers(
        &mut self,
        first: u32,
        buffers: &[(&Buffer<B>, u64)],
    ) -> Result<(), RecorderError> {
        let mut slot = recording(&self.slots[self.current], "bind_vertex_buffers")?;
        let raws: SmallVec<[(B::Buffer, u64); 4]> = buffers
            .iter()
            .map(|&(buffer, offset)| (buffer.raw().clone(), offset))
            .collect();
        unsafe { slot.raw.bind_vertex_buffers(first, &raws) };
        slot.keep_alive
            .extend(buffers.iter().map(|&(buffer, _)| buffer.keep_alive()));
        Ok(())
    }

    /// Bind index buffer.
    pub fn bind_index_buffer(
        &mut self,
        buffer: &Buffer<B>,
        offset: u64,
        index_type: IndexType,
    ) -> Result<(), RecorderError> {
        let mut slot = recording(&self.slots[self.current], "bind_index_buffer")?;
        unsafe { slot.raw.bind_index_buffer(buffer.raw(), offset, index_type) };
        slot.keep_alive.push(buffer.keep_alive());
        Ok(())
    }

    /// Bind descriptor set at `index`.
    /// Binding nothing is a no-op.
    pub fn bind_descriptor_set(
        &mut self,
        bind_point: BindPoint,
        index: u32,
        set: Option<(&DescriptorManager<B>, &DescriptorSet<B>)>,
    ) -> Result<(), RecorderError> {
        let mut slot = recording(&self.slots[self.current], "bind_descriptor_set")?;
        let (manager, set) = match set {
            Some(set) => set,
            None => {
                log::trace!("No descriptor set for {:?} index {}. Skipped", bind_point, index);
                return Ok(());
            }
        };

        let device = self.queues.device();
        let storage = manager.get_storage(device)?;
        unsafe {
            slot.raw
                .bind_descriptor_heap(bind_point, index, &storage, set.offsets());
        }
        Ok(())
    }

    /// Draw indexed primitives.
    pub fn draw_indexed(
        &mut self,
        indices: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
    ) -> Result<(), RecorderError> {
        let mut slot = recording(&self.slots[self.current], "draw_indexed")?;
        unsafe { slot.raw.draw_indexed(indices, base_vertex, instances) };
        Ok(())
    }

    /// Dispatch compute work groups.
    pub fn dispatch(&mut self, groups: [u32; 3]) -> Result<(), RecorderError> {
        let mut slot = recording(&self.slots[self.current], "dispatch")?;
        unsafe { slot.raw.dispatch(groups) };
        Ok(())
    }

    /// Trace rays.
    pub fn trace_rays(&mut self, size: [u32; 3]) -> Result<(), RecorderError> {
        let mut slot = recording(&self.slots[self.current], "trace_rays")?;
        unsafe { slot.raw.trace_rays(size) };
        Ok(())
    }

    /// Execute nested recorders begun for this recording.
    /// Nested recorders that have not ended are skipped.
    pub fn execute_children(&mut self) -> Result<(), RecorderError> {
        profile_scope!("execute_children");
        let mut slot = recording(&self.slots[self.current], "execute_children")?;

        let mut accepted: SmallVec<[SharedSlot<B>; 4]> = SmallVec::new();
        for child in self.children.drain(..) {
            if accepted.iter().any(|other| Arc::ptr_eq(other, &child)) {
                continue;
            }
            let state = child.lock().state;
            if state == RecordingState::Ended {
                accepted.push(child);
            } else {
                log::error!("Nested recorder in {:?} state is skipped", state);
            }
        }

        {
            let guards: SmallVec<[MutexGuard<'_, Slot<B>>; 4]> =
                accepted.iter().map(|child| child.lock()).collect();
            let raws: SmallVec<[&B::CommandBuffer; 4]> =
                guards.iter().map(|guard| &*guard.raw).collect();
            if !raws.is_empty() {
                unsafe { slot.raw.execute_commands(&raws) };
            }
        }

        log::trace!("{} nested recorders executed", accepted.len());
        slot.children.extend(accepted);
        Ok(())
    }

    /// Submit the current slot to its queue.
    /// If swapchain image is acquired the submission waits for it
    /// and makes swapchain ready to present.
    pub fn submit(&mut self, mut swapchain: Option<&mut dyn Swapchain<B>>) -> Result<(), RecorderError> {
        profile_scope!("submit");
        if self.usage == RecorderUsage::Secondary {
            log::error!("Secondary recorder can't be submitted");
            return Err(RecorderError::SecondarySubmit);
        }

        let presentable = swapchain.as_ref().map_or(false, |swapchain| swapchain.is_presentable());
        match swapchain.as_deref() {
            Some(swapchain) if presentable => self.submit_with(
                &[swapchain.image_acquired().sync_point()],
                &[swapchain.render_finished().sync_point()],
            )?,
            _ => self.submit_with(&[], &[])?,
        }

        if presentable {
            if let Some(swapchain) = swapchain.as_deref_mut() {
                swapchain.on_submitted();
            }
        }
        Ok(())
    }

    /// Submit the current slot with additional sync points.
    pub(crate) fn submit_with(
        &mut self,
        waits: &[SyncPoint<'_, B>],
        signals: &[SyncPoint<'_, B>],
    ) -> Result<(), RecorderError> {
        let mut guard = self.slots[self.current].lock();
        if guard.state != RecordingState::Ended {
            log::error!("`submit` called in {:?} state", guard.state);
            return Err(RecorderError::InvalidState {
                operation: "submit",
                state: guard.state,
            });
        }

        let slot = &mut *guard;
        let submission = Submission::new()
            .submits(Some(&*slot.raw))
            .wait(waits.iter().copied())
            .signal(signals.iter().copied());
        unsafe {
            self.queues.queue(self.usage.queue()).submit(
                &slot.device,
                Some(submission),
                slot.fence.as_mut(),
            )?;
        }

        let host = Arc::downgrade(&self.slots[self.current]);
        for child in &slot.children {
            let mut child = child.lock();
            child.state = RecordingState::Pending;
            child.host = Some(host.clone());
        }
        slot.state = RecordingState::Pending;
        drop(guard);

        log::trace!("{:?} recorder slot {} submitted", self.usage, self.current);
        self.last_submitted = Some(self.current);
        Ok(())
    }

    /// Wait for the most recent submission to complete.
    /// Nested recorders wait for the submission of their primary.
    pub fn wait(&mut self, timeout_ns: u64) -> Result<WaitStatus, RecorderError> {
        profile_scope!("wait");
        let index = self.last_submitted.unwrap_or(self.current);
        let status = self.observe(index, timeout_ns)?;
        if status == WaitStatus::Complete && self.last_submitted == Some(index) {
            self.last_submitted = None;
        }
        Ok(status)
    }

    /// Wait for pending slot. Completed slot becomes idle.
    fn observe(&self, index: usize, timeout_ns: u64) -> Result<WaitStatus, RecorderError> {
        let device = self.queues.device();
        let host = {
            let mut slot = self.slots[index].lock();
            if slot.state != RecordingState::Pending {
                return Ok(WaitStatus::Complete);
            }
            match slot.fence.as_mut() {
                Some(fence) => {
                    if fence.is_submitted() && !fence.wait_signaled(device, timeout_ns)? {
                        return Ok(WaitStatus::Timeout);
                    }
                    slot.complete();
                    return Ok(WaitStatus::Complete);
                }
                None => slot.host.clone(),
            }
        };

        // Own lock is released before locking the host.
        if let Some(host) = host.and_then(|host| host.upgrade()) {
            let mut host = host.lock();
            if let Some(fence) = host.fence.as_mut() {
                if fence.is_submitted() && !fence.wait_signaled(device, timeout_ns)? {
                    return Ok(WaitStatus::Timeout);
                }
            }
        }
        self.slots[index].lock().complete();
        Ok(WaitStatus::Complete)
    }
}

impl<B> Drop for CommandRecorder<B>
where
    B: Backend,
{
    fn drop(&mut self) {
        for index in 0..self.slots.len() {
            if let Err(err) = self.observe(index, !0) {
                log::error!("Failed to wait for recorder slot {}: {}", index, err);
            }
        }
        log::debug!("{:?} recorder dropped", self.usage);
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        kiln_core::{
            hal::device::Device as _, BufferInfo, BufferUsage, DeviceConfig, Format, ImageInfo,
            ImageUsage,
        },
        kiln_resource::Resources,
    };

    fn queues<B: Backend>() -> Arc<Queues<B>> {
        let _ = env_logger::builder().is_test(true).try_init();
        let device = Device::<B>::open(&DeviceConfig::default()).expect("device");
        Arc::new(Queues::new(Arc::new(device)))
    }

    fn config(usage: RecorderUsage, buffer_count: usize) -> RecorderConfig {
        RecorderConfig {
            usage,
            buffer_count,
            ..RecorderConfig::default()
        }
    }

    fn staging<B: Backend>(queues: &Queues<B>, resources: &Resources<B>, size: u64) -> Buffer<B> {
        resources
            .create_buffer(
                queues.device(),
                BufferInfo {
                    size,
                    usage: BufferUsage::TRANSFER_SRC | BufferUsage::TRANSFER_DST,
                },
            )
            .expect("buffer")
    }

    fn begin_twice_is_rejected<B: Backend>() {
        let queues = queues::<B>();
        let mut recorder = CommandRecorder::new(&queues, config(RecorderUsage::Graphics, 1)).unwrap();
        recorder.begin().unwrap();
        assert_eq!(
            recorder.begin(),
            Err(RecorderError::InvalidState {
                operation: "begin",
                state: RecordingState::Recording,
            })
        );
        assert_eq!(recorder.state(), RecordingState::Recording);
    }

    fn zero_buffer_count_becomes_one<B: Backend>() {
        let queues = queues::<B>();
        let mut recorder = CommandRecorder::new(&queues, config(RecorderUsage::Compute, 0)).unwrap();
        assert_eq!(recorder.buffer_count(), 1);
        assert_eq!(recorder.next().unwrap(), 0);
    }

    fn copy_restores_states<B: Backend>() {
        let queues = queues::<B>();
        let resources = Resources::new(queues.device());
        let mut src = staging(&queues, &resources, 64);
        let mut dst = staging(&queues, &resources, 64);
        queues.device().write_buffer(src.raw(), 0, &[7; 64]).unwrap();

        let mut recorder = CommandRecorder::new(&queues, config(RecorderUsage::Transfer, 1)).unwrap();
        recorder.begin().unwrap();
        recorder.transition_buffer(&mut src, ResourceState::GenericRead).unwrap();
        recorder.copy_buffer(&mut src, 0, &mut dst, 0, 64).unwrap();
        assert_eq!(src.state(), ResourceState::GenericRead);
        assert_eq!(dst.state(), ResourceState::General);
        recorder.copy_buffer(&mut dst, 0, &mut src, 0, 64).unwrap();
        assert_eq!(src.state(), ResourceState::GenericRead);
        assert_eq!(dst.state(), ResourceState::General);
        recorder.end().unwrap();
        recorder.submit(None).unwrap();
        assert_eq!(recorder.wait(!0).unwrap(), WaitStatus::Complete);
        assert_eq!(recorder.state(), RecordingState::Idle);

        let mut data = [0; 64];
        queues.device().read_buffer(dst.raw(), 0, &mut data).unwrap();
        assert_eq!(data, [7; 64]);
        assert_eq!(queues.device().statistics().validation_errors, 0);
    }

    fn operations_outside_recording_are_rejected<B: Backend>() {
        let queues = queues::<B>();
        let mut recorder = CommandRecorder::new(&queues, config(RecorderUsage::Compute, 1)).unwrap();
        assert_eq!(
            recorder.dispatch([1, 1, 1]),
            Err(RecorderError::InvalidState {
                operation: "dispatch",
                state: RecordingState::Idle,
            })
        );
        assert!(recorder.submit(None).is_err());
        recorder.begin().unwrap();
        assert!(recorder.submit(None).is_err());
        assert!(recorder.next().is_err());
        recorder.dispatch([1, 1, 1]).unwrap();
        recorder.end().unwrap();
        assert_eq!(recorder.wait(0).unwrap(), WaitStatus::Complete);
    }

    fn ring_records_while_previous_pending<B: Backend>() {
        let queues = queues::<B>();
        let mut recorder = CommandRecorder::new(&queues, config(RecorderUsage::Graphics, 2)).unwrap();
        recorder.begin().unwrap();
        recorder.end().unwrap();
        recorder.submit(None).unwrap();
        assert_eq!(recorder.next().unwrap(), 1);
        assert_eq!(recorder.state(), RecordingState::Idle);
        recorder.begin().unwrap();
        recorder.end().unwrap();
        recorder.submit(None).unwrap();
        assert_eq!(recorder.next().unwrap(), 0);

        // Re-recording a pending slot waits for it.
        recorder.begin().unwrap();
        assert_eq!(recorder.state(), RecordingState::Recording);
        recorder.end().unwrap();
    }

    fn nested_recorder_inherits_render_target<B: Backend>() {
        let queues = queues::<B>();
        let resources = Resources::new(queues.device());
        let mut target = resources
            .create_image(
                queues.device(),
                ImageInfo {
                    extent: Extent {
                        width: 4,
                        height: 4,
                    },
                    format: Format::Rgba8Unorm,
                    usage: ImageUsage::COLOR_ATTACHMENT | ImageUsage::TRANSFER_SRC,
                },
            )
            .unwrap();

        let mut primary = CommandRecorder::new(&queues, config(RecorderUsage::Graphics, 1)).unwrap();
        let mut secondary = CommandRecorder::new(&queues, config(RecorderUsage::Secondary, 1)).unwrap();

        assert_eq!(secondary.begin_nested(&mut primary).unwrap_err(), RecorderError::InvalidState {
            operation: "begin_nested",
            state: RecordingState::Idle,
        });
        assert_eq!(primary.begin_nested(&mut secondary), Err(RecorderError::NotSecondary));

        primary.begin().unwrap();
        primary
            .begin_render_target(&mut [&mut target], Some(ClearColor { rgba: [1.0, 0.0, 0.0, 1.0] }))
            .unwrap();
        secondary.begin_nested(&mut primary).unwrap();
        secondary.end().unwrap();
        primary.execute_children().unwrap();
        primary.end_render_target().unwrap();
        primary.end().unwrap();
        assert_eq!(secondary.submit(None), Err(RecorderError::SecondarySubmit));

        primary.submit(None).unwrap();
        assert_eq!(secondary.state(), RecordingState::Pending);
        assert_eq!(secondary.wait(!0).unwrap(), WaitStatus::Complete);
        assert_eq!(secondary.state(), RecordingState::Idle);
        assert_eq!(primary.wait(!0).unwrap(), WaitStatus::Complete);
        assert_eq!(target.state(), ResourceState::RenderTarget);
        assert_eq!(queues.device().statistics().validation_errors, 0);
    }

    fn unended_children_are_skipped<B: Backend>() {
        let queues = queues::<B>();
        let mut primary = CommandRecorder::new(&queues, config(RecorderUsage::Graphics, 1)).unwrap();
        let mut secondary = CommandRecorder::new(&queues, config(RecorderUsage::Secondary, 1)).unwrap();
        primary.begin().unwrap();
        secondary.begin_nested(&mut primary).unwrap();
        primary.execute_children().unwrap();
        primary.end().unwrap();
        primary.submit(None).unwrap();
        assert_eq!(secondary.state(), RecordingState::Recording);
        assert_eq!(primary.wait(!0).unwrap(), WaitStatus::Complete);
    }

    fn oversized_copy_is_reported_and_queue_survives<B: Backend>() {
        let queues = queues::<B>();
        let resources = Resources::new(queues.device());
        let mut src = staging(&queues, &resources, 64);
        let mut dst = staging(&queues, &resources, 64);
        queues.device().write_buffer(src.raw(), 0, &[3; 64]).unwrap();

        let mut recorder = CommandRecorder::new(&queues, config(RecorderUsage::Transfer, 1)).unwrap();
        recorder.begin().unwrap();
        recorder.copy_buffer(&mut src, 0, &mut dst, 0, u64::MAX).unwrap();
        recorder.end().unwrap();
        recorder.submit(None).unwrap();
        assert_eq!(recorder.wait(!0).unwrap(), WaitStatus::Complete);
        assert_eq!(queues.device().statistics().validation_errors, 1);

        let mut data = [1; 64];
        queues.device().read_buffer(dst.raw(), 0, &mut data).unwrap();
        assert_eq!(data, [0; 64]);

        // Queue keeps executing later submissions.
        recorder.begin().unwrap();
        recorder.copy_buffer(&mut src, 0, &mut dst, 0, 64).unwrap();
        recorder.end().unwrap();
        recorder.submit(None).unwrap();
        assert_eq!(recorder.wait(!0).unwrap(), WaitStatus::Complete);
        queues.device().read_buffer(dst.raw(), 0, &mut data).unwrap();
        assert_eq!(data, [3; 64]);
        assert_eq!(queues.device().statistics().validation_errors, 1);
    }

    fn recorders_submit_from_many_threads<B: Backend>() {
        let queues = queues::<B>();
        let resources = Arc::new(Resources::new(queues.device()));

        let workers: Vec<_> = (0..4u8)
            .map(|index| {
                let queues = queues.clone();
                let resources = resources.clone();
                std::thread::spawn(move || {
                    let mut src = staging(&queues, &resources, 256);
                    let mut dst = staging(&queues, &resources, 256);
                    let mut recorder =
                        CommandRecorder::new(&queues, config(RecorderUsage::Transfer, 2)).unwrap();
                    for round in 0..8u8 {
                        let value = index * 16 + round;
                        queues.device().write_buffer(src.raw(), 0, &[value; 256]).unwrap();
                        recorder.begin().unwrap();
                        recorder.copy_buffer(&mut src, 0, &mut dst, 0, 256).unwrap();
                        recorder.end().unwrap();
                        recorder.submit(None).unwrap();
                        assert_eq!(recorder.wait(!0).unwrap(), WaitStatus::Complete);

                        let mut data = [0; 256];
                        queues.device().read_buffer(dst.raw(), 0, &mut data).unwrap();
                        assert_eq!(data, [value; 256]);
                        recorder.next().unwrap();
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(queues.device().statistics().validation_errors, 0);
    }

    macro_rules! backend_tests {
        ($($name:ident),* $(,)?) => {
            mod explicit {
                $(
                    #[test]
                    fn $name() {
                        super::$name::<kiln_backend::explicit::Backend>();
                    }
                )*
            }

            mod timeline {
                $(
                    #[test]
                    fn $name() {
                        super::$name::<kiln_backend::timeline::Backend>();
                    }
                )*
            }
        };
    }

    backend_tests!(
        begin_twice_is_rejected,
        zero_buffer_count_becomes_one,
        copy_restores_states,
        operations_outside_recording_are_rejected,
        ring_records_while_previous_pending,
        nested_recorder_inherits_render_target,
        unended_children_are_skipped,
        oversized_copy_is_reported_and_queue_survives,
        recorders_submit_from_many_threads,
    );
}
