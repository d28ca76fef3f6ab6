//! Swapchain interface and headless implementation.

use {
    crate::{error::SubmitError, queue::Queues, semaphore::Semaphore, submission::Submission},
    kiln_core::{
        hal::{device::Device as _, Backend},
        ImageInfo, ImageUsage, MapError, QueueType,
    },
    kiln_resource::{Image, Resources},
    std::{fmt::Debug, mem::ManuallyDrop, sync::Arc},
};

/// Presentation engine as seen by command recorders and submitters.
pub trait Swapchain<B: Backend>: Debug + Send {
    /// Check if a backbuffer is acquired and not yet rendered to.
    fn is_presentable(&self) -> bool;

    /// Index of the current backbuffer.
    fn frame_index(&self) -> usize;

    /// Semaphore signaled when the current backbuffer is acquired.
    fn image_acquired(&self) -> &Semaphore<B>;

    /// Semaphore the final submission of a frame signals.
    fn render_finished(&self) -> &Semaphore<B>;

    /// Current backbuffer.
    fn backbuffer_mut(&mut self) -> &mut Image<B>;

    /// Called after a submission waited for `image_acquired`
    /// and signaled `render_finished`.
    fn on_submitted(&mut self) {}
}

/// Swapchain without a window.
/// Backbuffers are regular images that can be read back by the host.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
pub struct HeadlessSwapchain<B: Backend> {
    #[derivative(Debug = "ignore")]
    queues: Arc<Queues<B>>,
    images: Vec<Image<B>>,
    frame: usize,
    image_acquired: ManuallyDrop<Semaphore<B>>,
    render_finished: ManuallyDrop<Semaphore<B>>,
    acquired: bool,
    rendered: bool,
    presented: u64,
}

impl<B> HeadlessSwapchain<B>
where
    B: Backend,
{
    /// Create swapchain with `count` backbuffers.
    /// Backbuffers are always usable as copy source and destination.
    pub fn new(
        queues: &Arc<Queues<B>>,
        resources: &Resources<B>,
        mut info: ImageInfo,
        count: usize,
    ) -> Result<Self, SubmitError> {
        let device = queues.device();
        info.usage |= ImageUsage::TRANSFER_SRC | ImageUsage::TRANSFER_DST;
        let images = (0..count.max(1))
            .map(|_| resources.create_image(device, info))
            .collect::<Result<Vec<_>, _>>()?;

        let image_acquired = Semaphore::new(device)?;
        let render_finished = match Semaphore::new(device) {
            Ok(semaphore) => semaphore,
            Err(err) => {
                unsafe { image_acquired.dispose(device) };
                return Err(err.into());
            }
        };

        log::debug!("Headless swapchain with {} images created", images.len());
        Ok(HeadlessSwapchain {
            queues: queues.clone(),
            images,
            frame: 0,
            image_acquired: ManuallyDrop::new(image_acquired),
            render_finished: ManuallyDrop::new(render_finished),
            acquired: false,
            rendered: false,
            presented: 0,
        })
    }

    /// Acquire next backbuffer.
    /// Returns its index.
    pub fn acquire(&mut self) -> Result<usize, SubmitError> {
        if self.acquired {
            log::warn!("Backbuffer {} is already acquired", self.frame);
            return Ok(self.frame);
        }

        unsafe {
            self.queues.queue(QueueType::Graphics).submit(
                self.queues.device(),
                Some(Submission::new().signal_semaphore(&self.image_acquired)),
                None,
            )?;
        }
        self.acquired = true;
        log::trace!("Backbuffer {} acquired", self.frame);
        Ok(self.frame)
    }

    /// Present rendered backbuffer and advance to the next one.
    pub fn present(&mut self) -> Result<(), SubmitError> {
        if !self.rendered {
            log::warn!("Nothing was rendered into backbuffer {}. Present skipped", self.frame);
            return Ok(());
        }

        unsafe {
            self.queues.queue(QueueType::Graphics).submit(
                self.queues.device(),
                Some(Submission::new().wait_semaphore(&self.render_finished)),
                None,
            )?;
        }
        log::trace!("Backbuffer {} presented", self.frame);
        self.rendered = false;
        self.presented += 1;
        self.frame = (self.frame + 1) % self.images.len();
        Ok(())
    }

    /// Number of presented frames.
    pub fn presented(&self) -> u64 {
        self.presented
    }

    /// Get backbuffer.
    pub fn image(&self, index: usize) -> &Image<B> {
        &self.images[index]
    }

    /// Read backbuffer content.
    /// Rendering into it must be complete.
    pub fn read(&self, index: usize, data: &mut [u8]) -> Result<(), MapError> {
        self.queues
            .device()
            .read_image(self.images[index].raw(), data)
    }
}

impl<B> Swapchain<B> for HeadlessSwapchain<B>
where
    B: Backend,
{
    fn is_presentable(&self) -> bool {
        self.acquired
    }

    fn frame_index(&self) -> usize {
        self.frame
    }

    fn image_acquired(&self) -> &Semaphore<B> {
        &self.image_acquired
    }

    fn render_finished(&self) -> &Semaphore<B> {
        &self.render_finished
    }

    fn backbuffer_mut(&mut self) -> &mut Image<B> {
        &mut self.images[self.frame]
    }

    fn on_submitted(&mut self) {
        self.acquired = false;
        self.rendered = true;
    }
}

impl<B> Drop for HeadlessSwapchain<B>
where
    B: Backend,
{
    fn drop(&mut self) {
        if let Err(err) = self.queues.wait_idle() {
            log::error!("Failed to wait for swapchain semaphores: {}", err);
            return;
        }
        unsafe {
            let device = self.queues.device();
            ManuallyDrop::take(&mut self.image_acquired).dispose(device);
            ManuallyDrop::take(&mut self.render_finished).dispose(device);
        }
    }
}
