use {
    super::counters::Counters,
    kiln_core::{CommandBufferFlags, CommandLevel, QueueType},
    std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

/// Native command executed by a queue worker.
pub trait HostCommand: std::fmt::Debug + Send + Sync + Sized + 'static {
    /// Execute the command.
    fn execute(&self, counters: &Counters);

    /// Secondary command buffers executed by this command.
    fn nested(&self) -> &[Nested<Self>] {
        &[]
    }
}

/// Snapshot of a secondary command buffer recorded into a primary one.
#[derive(derivative::Derivative)]
#[derivative(Clone(bound = ""), Debug)]
pub struct Nested<C> {
    #[derivative(Debug = "ignore")]
    pub commands: Arc<[C]>,
    #[derivative(Debug = "ignore")]
    in_flight: Arc<AtomicUsize>,
}

/// Marks command buffer as pending until dropped.
#[derive(Debug)]
pub struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        InFlight(counter.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Commands of a submitted command buffer, pending until dropped.
#[derive(Debug)]
pub struct Submitted<C> {
    pub commands: Arc<[C]>,
    _in_flight: Vec<InFlight>,
}

impl<C> Submitted<C>
where
    C: HostCommand,
{
    pub fn execute(&self, counters: &Counters) {
        for command in self.commands.iter() {
            command.execute(counters);
            for nested in command.nested() {
                for command in nested.commands.iter() {
                    command.execute(counters);
                }
            }
        }
    }
}

/// Command buffer lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Initial,
    Recording,
    Executable,
}

/// Invalid command buffer usage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Misuse {
    /// Command buffer is pending execution.
    Pending,
    /// Command buffer is in wrong lifecycle state.
    Lifecycle(Lifecycle),
}

/// Recording storage shared by host command buffers.
#[derive(derivative::Derivative)]
#[derivative(Debug)]
pub struct Commands<C> {
    id: u64,
    level: CommandLevel,
    queue: QueueType,
    lifecycle: Lifecycle,
    flags: CommandBufferFlags,
    #[derivative(Debug = "ignore")]
    recording: Vec<C>,
    #[derivative(Debug = "ignore")]
    executable: Arc<[C]>,
    in_flight: Arc<AtomicUsize>,
    #[derivative(Debug = "ignore")]
    counters: Arc<Counters>,
}

impl<C> Commands<C>
where
    C: HostCommand,
{
    pub fn new(queue: QueueType, level: CommandLevel, counters: Arc<Counters>) -> Self {
        Commands {
            id: super::memory::next_id(),
            level,
            queue,
            lifecycle: Lifecycle::Initial,
            flags: CommandBufferFlags::empty(),
            recording: Vec::new(),
            executable: Arc::from(Vec::new()),
            in_flight: Arc::new(AtomicUsize::new(0)),
            counters,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn level(&self) -> CommandLevel {
        self.level
    }

    pub fn queue(&self) -> QueueType {
        self.queue
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) > 0
    }

    pub fn begin(&mut self, flags: CommandBufferFlags) -> Result<(), Misuse> {
        if self.is_pending() && !self.flags.contains(CommandBufferFlags::SIMULTANEOUS_USE) {
            self.counters.validation_error(format_args!(
                "Command buffer {} begins recording while pending",
                self.id
            ));
            return Err(Misuse::Pending);
        }
        if self.lifecycle == Lifecycle::Recording {
            self.counters.validation_error(format_args!(
                "Command buffer {} is already recording",
                self.id
            ));
            return Err(Misuse::Lifecycle(self.lifecycle));
        }
        self.recording.clear();
        self.flags = flags;
        self.lifecycle = Lifecycle::Recording;
        Ok(())
    }

    pub fn reset(&mut self) -> Result<(), Misuse> {
        if self.is_pending() {
            self.counters.validation_error(format_args!(
                "Command buffer {} is reset while pending",
                self.id
            ));
            return Err(Misuse::Pending);
        }
        self.recording.clear();
        self.executable = Arc::from(Vec::new());
        self.lifecycle = Lifecycle::Initial;
        Ok(())
    }

    pub fn finish(&mut self) -> Result<(), Misuse> {
        if self.lifecycle != Lifecycle::Recording {
            self.counters.validation_error(format_args!(
                "Command buffer {} finished while not recording",
                self.id
            ));
            return Err(Misuse::Lifecycle(self.lifecycle));
        }
        self.executable = Arc::from(std::mem::take(&mut self.recording));
        self.lifecycle = Lifecycle::Executable;
        Ok(())
    }

    /// Record command.
    pub fn push(&mut self, command: C) {
        if self.lifecycle != Lifecycle::Recording {
            self.counters.validation_error(format_args!(
                "Command {:?} recorded into command buffer {} while not recording",
                command, self.id
            ));
            return;
        }
        self.recording.push(command);
    }

    /// Report work recorded into command buffer for a queue that can't execute it.
    pub fn require_queue(&self, allowed: &[QueueType], what: &str) {
        if !allowed.contains(&self.queue) {
            self.counters.validation_error(format_args!(
                "{} recorded into command buffer {} for {:?} queue",
                what, self.id, self.queue
            ));
        }
    }

    /// Snapshot executable commands of a secondary command buffer.
    pub fn nested(&self) -> Option<Nested<C>> {
        if self.level != CommandLevel::Secondary || self.lifecycle != Lifecycle::Executable {
            self.counters.validation_error(format_args!(
                "Command buffer {} ({:?}, {:?}) can't be executed as secondary",
                self.id, self.level, self.lifecycle
            ));
            return None;
        }
        Some(Nested {
            commands: self.executable.clone(),
            in_flight: self.in_flight.clone(),
        })
    }

    /// Snapshot executable commands of a primary command buffer for submission.
    /// Marks it and every secondary it executes pending.
    pub fn submit(&self, queue: QueueType) -> Option<Submitted<C>> {
        if self.level != CommandLevel::Primary || self.lifecycle != Lifecycle::Executable {
            self.counters.validation_error(format_args!(
                "Command buffer {} ({:?}, {:?}) can't be submitted",
                self.id, self.level, self.lifecycle
            ));
            return None;
        }
        if self.queue != queue {
            self.counters.validation_error(format_args!(
                "Command buffer {} for {:?} queue submitted to {:?} queue",
                self.id, self.queue, queue
            ));
            return None;
        }
        if self.is_pending() && !self.flags.contains(CommandBufferFlags::SIMULTANEOUS_USE) {
            self.counters.validation_error(format_args!(
                "Command buffer {} submitted while pending",
                self.id
            ));
        }

        let mut in_flight = vec![InFlight::new(&self.in_flight)];
        for command in self.executable.iter() {
            in_flight.extend(
                command
                    .nested()
                    .iter()
                    .map(|nested| InFlight::new(&nested.in_flight)),
            );
        }

        Some(Submitted {
            commands: self.executable.clone(),
            _in_flight: in_flight,
        })
    }
}
