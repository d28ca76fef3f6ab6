//! Scenarios that exercise recorders, submitters, descriptor managers and
//! swapchains together on every host backend.

use kiln::{
    command::{
        CommandRecorder, RecorderConfig, RecorderError, RecorderUsage, RecordingState, Semaphore,
        Submission, Swapchain, WaitStatus,
    },
    core::{
        hal::{Backend, Descriptor, PipelineDesc},
        BindPoint, BufferImageCopy, BufferInfo, BufferKind, BufferUsage, DescriptorKind, Extent,
        Format, ImageInfo, ImageUsage, Offset, QueueType, ResourceState, ShaderStageFlags,
        SteadyStatePolicy,
    },
    descriptor::{DescriptorSetLayout, LayoutBinding},
    resource::{Buffer, Image},
    Config, Context,
};

fn context<B: Backend>() -> Context<B> {
    let _ = env_logger::builder().is_test(true).try_init();
    Context::new(Config::default().with_name(B::NAME)).expect("device")
}

fn storage<B: Backend>(context: &Context<B>, size: u64) -> Buffer<B> {
    context
        .create_buffer_of_kind(BufferKind::Storage, size)
        .expect("buffer")
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|index| (index * 7 % 251) as u8 + 1).collect()
}

fn image_info() -> ImageInfo {
    ImageInfo {
        extent: Extent {
            width: 4,
            height: 4,
        },
        format: Format::Rgba8Unorm,
        usage: ImageUsage::TRANSFER_SRC | ImageUsage::TRANSFER_DST | ImageUsage::SAMPLED,
    }
}

/// Swapchain whose image becomes available only when the test opens it.
/// Submissions that wait for it stay pending until then.
#[derive(Debug)]
struct Gate<B: Backend> {
    image: Image<B>,
    opened: Semaphore<B>,
    finished: Semaphore<B>,
}

impl<B: Backend> Gate<B> {
    fn new(context: &Context<B>) -> Self {
        Gate {
            image: context.create_image(image_info()).unwrap(),
            opened: Semaphore::new(context.device()).unwrap(),
            finished: Semaphore::new(context.device()).unwrap(),
        }
    }

    /// Signal from a queue that is not blocked by the gate.
    fn open(&self, context: &Context<B>, queue: QueueType) {
        unsafe {
            context
                .queues()
                .queue(queue)
                .submit(
                    context.device(),
                    Some(Submission::new().signal_semaphore(&self.opened)),
                    None,
                )
                .unwrap();
        }
    }

    fn dispose(self, context: &Context<B>) {
        context.wait_idle().unwrap();
        unsafe {
            self.opened.dispose(context.device());
            self.finished.dispose(context.device());
        }
    }
}

impl<B: Backend> Swapchain<B> for Gate<B> {
    fn is_presentable(&self) -> bool {
        true
    }

    fn frame_index(&self) -> usize {
        0
    }

    fn image_acquired(&self) -> &Semaphore<B> {
        &self.opened
    }

    fn render_finished(&self) -> &Semaphore<B> {
        &self.finished
    }

    fn backbuffer_mut(&mut self) -> &mut Image<B> {
        &mut self.image
    }
}

fn begin_twice_is_rejected<B: Backend>() {
    let context = context::<B>();
    let mut recorder = context.create_recorder().unwrap();
    recorder.begin().unwrap();
    assert_eq!(
        recorder.begin(),
        Err(RecorderError::InvalidState {
            operation: "begin",
            state: RecordingState::Recording,
        })
    );
    recorder.end().unwrap();
    assert_eq!(recorder.state(), RecordingState::Ended);
}

fn wait_without_pending_work_returns_immediately<B: Backend>() {
    let context = context::<B>();
    let mut recorder = context.create_recorder().unwrap();
    let mut submitter = context.create_submitter();
    assert_eq!(recorder.wait(0).unwrap(), WaitStatus::Complete);
    assert_eq!(submitter.wait(0).unwrap(), WaitStatus::Complete);

    recorder.begin().unwrap();
    recorder.end().unwrap();
    recorder.submit(None).unwrap();
    assert_eq!(recorder.wait(!0).unwrap(), WaitStatus::Complete);
    assert_eq!(recorder.wait(0).unwrap(), WaitStatus::Complete);
}

fn copies_restore_resource_states<B: Backend>() {
    let context = context::<B>();
    let mut staging = context
        .create_buffer_of_kind(BufferKind::Staging, 64)
        .unwrap();
    let mut sampled = context.create_image(image_info()).unwrap();
    let mut copy = context.create_image(image_info()).unwrap();
    let data = pattern(64);
    context.write_buffer(&staging, 0, &data).unwrap();

    let mut recorder = context
        .create_recorder_with(RecorderConfig {
            usage: RecorderUsage::Graphics,
            buffer_count: 1,
            steady_state: SteadyStatePolicy::ByUsage,
        })
        .unwrap();
    recorder.begin().unwrap();

    // Undefined content settles in the state picked by usage.
    let region = BufferImageCopy {
        buffer_offset: 0,
        image_offset: Offset::default(),
        extent: sampled.extent(),
    };
    recorder
        .copy_buffer_to_image(&mut staging, &mut sampled, region)
        .unwrap();
    assert_eq!(sampled.state(), ResourceState::ShaderRead);
    assert_eq!(staging.state(), ResourceState::General);

    recorder
        .transition_image(&mut copy, ResourceState::ShaderRead)
        .unwrap();
    let before = (sampled.state(), copy.state());
    let sampled_extent = sampled.extent();
    recorder
        .copy_image(
            &mut sampled,
            &mut copy,
            kiln::core::ImageCopy {
                src_offset: Offset::default(),
                dst_offset: Offset::default(),
                extent: sampled_extent,
            },
        )
        .unwrap();
    assert_eq!((sampled.state(), copy.state()), before);

    recorder.end().unwrap();
    recorder.submit(None).unwrap();
    assert_eq!(recorder.wait(!0).unwrap(), WaitStatus::Complete);

    let mut texels = vec![0; 64];
    context.read_image(&copy, &mut texels).unwrap();
    assert_eq!(texels, data);
    assert_eq!(context.statistics().validation_errors, 0);
}

fn ring_does_not_block_on_pending_slot<B: Backend>() {
    let context = context::<B>();
    let mut src = storage(&context, 256);
    let mut dst = storage(&context, 256);
    let data = pattern(256);
    context.write_buffer(&src, 0, &data).unwrap();
    let mut gate = Gate::new(&context);

    let mut recorder = context
        .create_recorder_with(RecorderConfig {
            buffer_count: 2,
            ..RecorderConfig::default()
        })
        .unwrap();
    recorder.begin().unwrap();
    recorder.copy_buffer(&mut src, 0, &mut dst, 0, 256).unwrap();
    recorder.end().unwrap();
    recorder.submit(Some(&mut gate)).unwrap();
    assert_eq!(recorder.state(), RecordingState::Pending);

    assert_eq!(recorder.next().unwrap(), 1);
    recorder.begin().unwrap();
    assert_eq!(recorder.state(), RecordingState::Recording);
    recorder.end().unwrap();

    // Slot 0 is still held by the gate.
    assert_eq!(recorder.wait(0).unwrap(), WaitStatus::Timeout);

    gate.open(&context, QueueType::Transfer);
    assert_eq!(recorder.wait(!0).unwrap(), WaitStatus::Complete);

    let mut result = vec![0; 256];
    context.read_buffer(&dst, 0, &mut result).unwrap();
    assert_eq!(result, data);

    drop(recorder);
    gate.dispose(&context);
    assert_eq!(context.statistics().validation_errors, 0);
}

fn later_batches_see_earlier_writes<B: Backend>() {
    let context = context::<B>();
    let mut src = storage(&context, 128);
    let mut mid = storage(&context, 128);
    let mut dst = storage(&context, 128);
    let data = pattern(128);
    context.write_buffer(&src, 0, &data).unwrap();
    let mut gate = Gate::new(&context);

    let mut upload = context
        .create_recorder_with(RecorderConfig {
            usage: RecorderUsage::Transfer,
            ..RecorderConfig::default()
        })
        .unwrap();
    upload.begin().unwrap();
    upload.copy_buffer(&mut src, 0, &mut mid, 0, 128).unwrap();
    upload.end().unwrap();

    let mut consume = context
        .create_recorder_with(RecorderConfig {
            usage: RecorderUsage::Compute,
            ..RecorderConfig::default()
        })
        .unwrap();
    consume.begin().unwrap();
    consume.copy_buffer(&mut mid, 0, &mut dst, 0, 128).unwrap();
    consume.end().unwrap();

    let mut submitter = context.create_submitter();
    submitter
        .submit(vec![vec![&mut upload], vec![&mut consume]], Some(&mut gate))
        .unwrap();

    // Nothing runs before the first batch may start.
    assert_eq!(submitter.wait(0).unwrap(), WaitStatus::Timeout);
    let mut result = vec![0; 128];
    context.read_buffer(&dst, 0, &mut result).unwrap();
    assert!(result.iter().all(|&byte| byte == 0));

    gate.open(&context, QueueType::Graphics);
    assert_eq!(submitter.wait(!0).unwrap(), WaitStatus::Complete);
    assert_eq!(submitter.completed().unwrap(), 2);
    context.read_buffer(&dst, 0, &mut result).unwrap();
    assert_eq!(result, data);

    drop(submitter);
    drop(upload);
    drop(consume);
    gate.dispose(&context);
    assert_eq!(context.statistics().validation_errors, 0);
}

fn headless_frame_is_presented<B: Backend>() {
    let context = context::<B>();
    let mut swapchain = context.create_swapchain(image_info(), 2).unwrap();
    let mut texture = context.create_image(image_info()).unwrap();
    let mut staging = context
        .create_buffer_of_kind(BufferKind::Staging, 64)
        .unwrap();
    let data = pattern(64);
    context.write_buffer(&staging, 0, &data).unwrap();

    let mut recorder = context.create_recorder().unwrap();
    assert_eq!(swapchain.acquire().unwrap(), 0);
    assert!(swapchain.is_presentable());

    recorder.begin().unwrap();
    let texture_extent = texture.extent();
    recorder
        .copy_buffer_to_image(
            &mut staging,
            &mut texture,
            BufferImageCopy {
                buffer_offset: 0,
                image_offset: Offset::default(),
                extent: texture_extent,
            },
        )
        .unwrap();
    recorder
        .copy_image_to_swapchain(&mut texture, &mut swapchain)
        .unwrap();
    recorder.end().unwrap();
    recorder.submit(Some(&mut swapchain)).unwrap();
    assert!(!swapchain.is_presentable());

    swapchain.present().unwrap();
    assert_eq!(swapchain.presented(), 1);
    assert_eq!(swapchain.frame_index(), 1);
    assert_eq!(recorder.wait(!0).unwrap(), WaitStatus::Complete);

    let mut texels = vec![0; 64];
    swapchain.read(0, &mut texels).unwrap();
    assert_eq!(texels, data);
    assert_eq!(swapchain.image(0).state(), ResourceState::Present);
    assert_eq!(context.statistics().validation_errors, 0);
}

fn descriptor_sets_are_bound<B: Backend>() {
    let context = context::<B>();
    let uniform = context
        .create_buffer(BufferInfo {
            size: 256,
            usage: BufferUsage::UNIFORM,
        })
        .unwrap();
    let manager = context
        .create_descriptor_manager(vec![DescriptorSetLayout::new(vec![
            LayoutBinding::new(0, DescriptorKind::UniformBuffer, ShaderStageFlags::COMPUTE),
            LayoutBinding::new(1, DescriptorKind::Sampler, ShaderStageFlags::COMPUTE),
        ])])
        .unwrap();
    let set = manager.create_set(context.device(), 0).unwrap();
    manager.attach(
        context.device(),
        &set,
        0,
        0,
        Descriptor::Buffer {
            kind: DescriptorKind::UniformBuffer,
            buffer: uniform.raw(),
            range: 0..256,
        },
    );

    let pipeline = context
        .create_pipeline(&PipelineDesc {
            label: "fill".to_owned(),
            bind_point: BindPoint::Compute,
            cache: Some(vec![1, 2, 3]),
        })
        .unwrap();
    assert_eq!(pipeline.cache_data(context.device()), vec![1, 2, 3]);

    let mut recorder = context
        .create_recorder_with(RecorderConfig {
            usage: RecorderUsage::Compute,
            ..RecorderConfig::default()
        })
        .unwrap();
    recorder.begin().unwrap();
    recorder.bind_pipeline(&pipeline).unwrap();
    recorder
        .bind_descriptor_set(BindPoint::Compute, 0, Some((&manager, &set)))
        .unwrap();
    recorder
        .bind_descriptor_set(BindPoint::Compute, 1, None)
        .unwrap();
    recorder.dispatch([4, 1, 1]).unwrap();
    recorder.end().unwrap();
    recorder.submit(None).unwrap();
    assert_eq!(recorder.wait(!0).unwrap(), WaitStatus::Complete);

    let statistics = context.statistics();
    assert_eq!(statistics.dispatches, 1);
    assert_eq!(statistics.validation_errors, 0);

    manager.free(set);
    drop(recorder);
    unsafe { context.destroy_descriptor_manager(manager) };
}

fn dropped_resources_are_destroyed_after_completion<B: Backend>() {
    let mut context = context::<B>();
    let mut src = storage(&context, 64);
    let mut dst = storage(&context, 64);

    let mut recorder: CommandRecorder<B> = context.create_recorder().unwrap();
    recorder.begin().unwrap();
    recorder.copy_buffer(&mut src, 0, &mut dst, 0, 64).unwrap();
    recorder.end().unwrap();
    recorder.submit(None).unwrap();
    drop(src);
    drop(dst);

    // Recorder keeps both buffers alive until completion is observed.
    assert_eq!(recorder.wait(!0).unwrap(), WaitStatus::Complete);
    assert_eq!(context.cleanup(), 2);
    assert_eq!(context.cleanup(), 0);
}

macro_rules! backend_tests {
    ($($name:ident),* $(,)?) => {
        mod explicit {
            $(
                #[test]
                fn $name() {
                    super::$name::<kiln::explicit::Backend>();
                }
            )*
        }

        mod timeline {
            $(
                #[test]
                fn $name() {
                    super::$name::<kiln::timeline::Backend>();
                }
            )*
        }
    };
}

backend_tests!(
    begin_twice_is_rejected,
    wait_without_pending_work_returns_immediately,
    copies_restore_resource_states,
    ring_does_not_block_on_pending_slot,
    later_batches_see_earlier_writes,
    headless_frame_is_presented,
    descriptor_sets_are_bound,
    dropped_resources_are_destroyed_after_completion,
);
