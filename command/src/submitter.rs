//! Ordered submission of recorder batches across queues.
//!
//! Batches execute one after another. Recorders inside one batch may execute
//! concurrently on different queues. Every submission gets its own timeline:
//! batch `i` waits for the timeline to reach `i` and raises it to `i + 1`.

use {
    crate::{
        error::{RecorderError, SubmitError},
        queue::Queues,
        recorder::{CommandRecorder, RecorderUsage, RecordingState, WaitStatus},
        semaphore::{Semaphore, Timeline},
        submission::Submission,
        swapchain::Swapchain,
    },
    kiln_core::{
        hal::{queue::SyncPoint, Backend},
        Device, DeviceError, QueueType,
    },
    smallvec::SmallVec,
    std::sync::Arc,
    thread_profiler::profile_scope,
};

/// Sync objects of one `submit` call.
#[derive(Debug)]
struct Flight<B: Backend> {
    timeline: Timeline<B>,
    joins: Vec<Semaphore<B>>,
    last: u64,
}

impl<B> Flight<B>
where
    B: Backend,
{
    fn is_complete(&self, device: &Device<B>) -> Result<bool, DeviceError> {
        Ok(self.timeline.value(device)? >= self.last)
    }

    unsafe fn dispose(self, device: &Device<B>) {
        for join in self.joins {
            join.dispose(device);
        }
        self.timeline.dispose(device);
    }
}

/// Submits batches of recorders preserving batch order.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
pub struct CommandSubmitter<B: Backend> {
    #[derivative(Debug = "ignore")]
    queues: Arc<Queues<B>>,
    current: Option<Flight<B>>,
    retired: Vec<Flight<B>>,
}

impl<B> CommandSubmitter<B>
where
    B: Backend,
{
    /// Create new submitter.
    pub fn new(queues: &Arc<Queues<B>>) -> Self {
        CommandSubmitter {
            queues: queues.clone(),
            current: None,
            retired: Vec::new(),
        }
    }

    /// Submit batches of ended primary recorders.
    ///
    /// Work of batch `i + 1` starts only after all work of batch `i` completes.
    /// If swapchain image is acquired, the first batch waits for it and
    /// the last batch makes swapchain ready to present.
    /// Nothing is submitted if any recorder can't be submitted.
    pub fn submit(
        &mut self,
        batches: Vec<Vec<&mut CommandRecorder<B>>>,
        mut swapchain: Option<&mut dyn Swapchain<B>>,
    ) -> Result<(), SubmitError> {
        profile_scope!("submit");

        for (batch, recorders) in batches.iter().enumerate() {
            for (index, recorder) in recorders.iter().enumerate() {
                let error = match (recorder.usage(), recorder.state()) {
                    (RecorderUsage::Secondary, _) => RecorderError::SecondarySubmit,
                    (_, RecordingState::Ended) => continue,
                    (_, state) => RecorderError::InvalidState {
                        operation: "submit",
                        state,
                    },
                };
                log::error!("Recorder {} of batch {} rejected: {}", index, batch, error);
                return Err(SubmitError::Recorder {
                    batch,
                    recorder: index,
                    error,
                });
            }
        }

        self.retire();

        let mut flight = Flight {
            timeline: Timeline::new(self.queues.device(), 0)?,
            joins: Vec::new(),
            last: 0,
        };

        let count = batches.len();
        let presentable = count > 0
            && swapchain
                .as_ref()
                .map_or(false, |swapchain| swapchain.is_presentable());
        let result = self.schedule(
            &mut flight,
            batches,
            swapchain.as_deref().filter(|_| presentable),
        );
        log::trace!("{} of {} batches scheduled", flight.last, count);
        self.current = Some(flight);
        result?;

        if presentable {
            if let Some(swapchain) = swapchain.as_deref_mut() {
                swapchain.on_submitted();
            }
        }
        Ok(())
    }

    fn schedule(
        &self,
        flight: &mut Flight<B>,
        batches: Vec<Vec<&mut CommandRecorder<B>>>,
        swapchain: Option<&dyn Swapchain<B>>,
    ) -> Result<(), SubmitError> {
        let device = self.queues.device();
        let count = batches.len();

        for (batch, recorders) in batches.into_iter().enumerate() {
            let value = batch as u64 + 1;

            let mut groups: [Vec<(usize, &mut CommandRecorder<B>)>; 3] = Default::default();
            for (index, recorder) in recorders.into_iter().enumerate() {
                groups[recorder.usage().queue().index()].push((index, recorder));
            }
            let used = groups.iter().filter(|group| !group.is_empty()).count();

            let mut acquired = swapchain
                .filter(|_| batch == 0)
                .map(|swapchain| swapchain.image_acquired().sync_point());

            let mut waits: SmallVec<[SyncPoint<'_, B>; 2]> = SmallVec::new();
            if batch > 0 {
                waits.push(flight.timeline.wait_point(batch as u64));
            }

            let mut done: SmallVec<[SyncPoint<'_, B>; 2]> = SmallVec::new();
            done.push(flight.timeline.signal_point(value));
            if batch + 1 == count {
                done.extend(swapchain.map(|swapchain| swapchain.render_finished().sync_point()));
            }

            if used > 1 {
                // Groups on different queues signal own semaphores.
                // Graphics queue joins them and raises the timeline.
                let start = flight.joins.len();
                for _ in 0..used {
                    flight.joins.push(Semaphore::new(device)?);
                }
                let joins = &flight.joins[start..];

                for (group, join) in groups
                    .iter_mut()
                    .filter(|group| !group.is_empty())
                    .zip(joins)
                {
                    let mut group_waits = waits.clone();
                    group_waits.extend(acquired.take());
                    submit_group(batch, group, &group_waits, &[join.sync_point()])?;
                }

                unsafe {
                    self.queues.queue(QueueType::Graphics).submit(
                        device,
                        Some(
                            Submission::new()
                                .wait(joins.iter().map(Semaphore::sync_point))
                                .signal(done),
                        ),
                        None,
                    )?;
                }
            } else {
                waits.extend(acquired.take());
                match groups.iter_mut().find(|group| !group.is_empty()) {
                    Some(group) => submit_group(batch, group, &waits, &done)?,
                    None => unsafe {
                        log::trace!("Batch {} is empty", batch);
                        self.queues.queue(QueueType::Graphics).submit(
                            device,
                            Some(Submission::new().wait(waits).signal(done)),
                            None,
                        )?;
                    },
                }
            }

            flight.last = value;
        }
        Ok(())
    }

    /// Wait for all work of the last `submit` call.
    pub fn wait(&mut self, timeout_ns: u64) -> Result<WaitStatus, SubmitError> {
        profile_scope!("wait");
        let flight = match &self.current {
            Some(flight) => flight,
            None => return Ok(WaitStatus::Complete),
        };

        if flight
            .timeline
            .wait(self.queues.device(), flight.last, timeout_ns)?
        {
            Ok(WaitStatus::Complete)
        } else {
            Ok(WaitStatus::Timeout)
        }
    }

    /// Number of batches of the last `submit` call known to be complete.
    pub fn completed(&self) -> Result<u64, SubmitError> {
        match &self.current {
            Some(flight) => Ok(flight.timeline.value(self.queues.device())?),
            None => Ok(0),
        }
    }

    /// Destroy sync objects of completed submissions.
    fn retire(&mut self) {
        self.retired.extend(self.current.take());
        let device = self.queues.device();
        let mut index = 0;
        while index < self.retired.len() {
            match self.retired[index].is_complete(device) {
                Ok(true) => unsafe { self.retired.swap_remove(index).dispose(device) },
                Ok(false) => index += 1,
                Err(err) => {
                    log::error!("Failed to query submission progress: {}", err);
                    index += 1;
                }
            }
        }
    }
}

fn submit_group<B: Backend>(
    batch: usize,
    group: &mut [(usize, &mut CommandRecorder<B>)],
    waits: &[SyncPoint<'_, B>],
    signals: &[SyncPoint<'_, B>],
) -> Result<(), SubmitError> {
    let last = group.len() - 1;
    for (position, (index, recorder)) in group.iter_mut().enumerate() {
        let waits = if position == 0 { waits } else { &[] };
        let signals = if position == last { signals } else { &[] };
        recorder
            .submit_with(waits, signals)
            .map_err(|error| SubmitError::Recorder {
                batch,
                recorder: *index,
                error,
            })?;
    }
    Ok(())
}

impl<B> Drop for CommandSubmitter<B>
where
    B: Backend,
{
    fn drop(&mut self) {
        let device = self.queues.device();
        for flight in self.current.take().into_iter().chain(self.retired.drain(..)) {
            match flight.timeline.wait(device, flight.last, !0) {
                Ok(true) => unsafe { flight.dispose(device) },
                Ok(false) => log::error!("Submission never completed. Sync objects leaked"),
                Err(err) => log::error!("Failed to wait for submission: {}. Sync objects leaked", err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::recorder::RecorderConfig,
        kiln_core::DeviceConfig,
    };

    fn queues<B: Backend>() -> Arc<Queues<B>> {
        let _ = env_logger::builder().is_test(true).try_init();
        let device = Device::<B>::open(&DeviceConfig::default()).expect("device");
        Arc::new(Queues::new(Arc::new(device)))
    }

    fn recorder<B: Backend>(queues: &Arc<Queues<B>>, usage: RecorderUsage) -> CommandRecorder<B> {
        let mut recorder = CommandRecorder::new(
            queues,
            RecorderConfig {
                usage,
                ..RecorderConfig::default()
            },
        )
        .unwrap();
        recorder.begin().unwrap();
        recorder.end().unwrap();
        recorder
    }

    fn nothing_submitted_is_complete<B: Backend>() {
        let queues = queues::<B>();
        let mut submitter = CommandSubmitter::new(&queues);
        assert_eq!(submitter.wait(0).unwrap(), WaitStatus::Complete);
        submitter.submit(Vec::new(), None).unwrap();
        assert_eq!(submitter.wait(0).unwrap(), WaitStatus::Complete);
    }

    fn rejected_recorder_is_located<B: Backend>() {
        let queues = queues::<B>();
        let mut ended = recorder(&queues, RecorderUsage::Graphics);
        let mut idle = CommandRecorder::new(&queues, RecorderConfig::default()).unwrap();
        let mut submitter = CommandSubmitter::new(&queues);

        let error = submitter
            .submit(vec![vec![&mut ended], vec![&mut idle]], None)
            .unwrap_err();
        assert_eq!(
            error,
            SubmitError::Recorder {
                batch: 1,
                recorder: 0,
                error: RecorderError::InvalidState {
                    operation: "submit",
                    state: RecordingState::Idle,
                },
            }
        );
        // Nothing was submitted.
        assert_eq!(ended.state(), RecordingState::Ended);
    }

    fn batches_complete_in_order<B: Backend>() {
        let queues = queues::<B>();
        let mut graphics = recorder(&queues, RecorderUsage::Graphics);
        let mut compute = recorder(&queues, RecorderUsage::Compute);
        let mut transfer = recorder(&queues, RecorderUsage::Transfer);
        let mut last = recorder(&queues, RecorderUsage::Graphics);
        let mut submitter = CommandSubmitter::new(&queues);

        submitter
            .submit(
                vec![
                    vec![&mut transfer],
                    vec![&mut graphics, &mut compute],
                    vec![],
                    vec![&mut last],
                ],
                None,
            )
            .unwrap();
        assert_eq!(submitter.wait(!0).unwrap(), WaitStatus::Complete);
        assert_eq!(submitter.completed().unwrap(), 4);

        for recorder in [&mut graphics, &mut compute, &mut transfer, &mut last] {
            assert_eq!(recorder.state(), RecordingState::Pending);
            assert_eq!(recorder.wait(!0).unwrap(), WaitStatus::Complete);
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
        nothing_submitted_is_complete,
        rejected_recorder_is_located,
        batches_complete_in_order,
    );
}
