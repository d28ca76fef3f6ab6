use {
    crate::{
        error::DescriptorError,
        layout::{DescriptorSetLayout, LayoutSignature},
        ranges::DescriptorRanges,
    },
    kiln_core::{
        hal::{device::Device as _, Backend, Descriptor},
        DescriptorClass, DescriptorHeapDesc, DescriptorOffsets, Device, DeviceId, HeapVisibility,
    },
    parking_lot::{MappedMutexGuard, Mutex, MutexGuard},
    std::{
        collections::HashMap,
        marker::PhantomData,
        sync::atomic::{AtomicU64, Ordering},
    },
    thread_profiler::profile_scope,
};

/// Slots of each class added on top of declared totals.
const HEADROOM: u32 = 1;

static MANAGER_ID: AtomicU64 = AtomicU64::new(0);

/// Range of descriptor slots allocated for one layout group.
/// Must be returned with `DescriptorManager::free`.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
pub struct DescriptorSet<B: Backend> {
    manager: u64,
    group: usize,
    signature: LayoutSignature,
    offsets: DescriptorOffsets,
    #[derivative(Debug = "ignore")]
    relevant: relevant::Relevant,
    #[derivative(Debug = "ignore")]
    marker: PhantomData<fn() -> B>,
}

impl<B> DescriptorSet<B>
where
    B: Backend,
{
    /// Layout group the set was created for.
    pub fn group(&self) -> usize {
        self.group
    }

    /// First slot of each class.
    pub fn offsets(&self) -> DescriptorOffsets {
        self.offsets
    }

    /// Signature of the layout.
    pub fn signature(&self) -> LayoutSignature {
        self.signature
    }

    /// Slots occupied by the set.
    pub fn ranges(&self) -> std::ops::Range<DescriptorRanges> {
        let start = DescriptorRanges::from_offsets(self.offsets);
        start..start + self.signature.ranges()
    }
}

#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
struct Inner<B: Backend> {
    layouts: Vec<DescriptorSetLayout>,
    signatures: Vec<LayoutSignature>,

    // Host writable heap all descriptors are written to.
    working: B::DescriptorHeap,
    capacity: DescriptorRanges,

    // Bindable copy of `working`.
    visible: B::DescriptorHeap,
    visible_capacity: DescriptorRanges,

    // Bindable heaps replaced by bigger ones. May still be used by commands.
    retired: Vec<B::DescriptorHeap>,

    high_water: DescriptorRanges,
    free: HashMap<LayoutSignature, Vec<DescriptorOffsets>>,
    live: usize,
    growth_count: usize,
    dirty: bool,
    poisoned: bool,
}

fn create_heap<B: Backend>(
    device: &Device<B>,
    capacity: DescriptorRanges,
    visibility: HeapVisibility,
) -> Result<B::DescriptorHeap, DescriptorError> {
    let desc = DescriptorHeapDesc {
        resources: capacity.get(DescriptorClass::Resource),
        samplers: capacity.get(DescriptorClass::Sampler),
        visibility,
    };
    device.create_descriptor_heap(desc).map_err(|err| {
        log::error!("Failed to create descriptor heap {:?}: {}", desc, err);
        DescriptorError::from(err)
    })
}

impl<B> Inner<B>
where
    B: Backend,
{
    fn poison(&mut self, error: DescriptorError) -> DescriptorError {
        self.poisoned = true;
        error
    }

    fn grow(&mut self, device: &Device<B>, required: DescriptorRanges) -> Result<(), DescriptorError> {
        profile_scope!("grow");

        let mut capacity = self.capacity;
        for &class in DescriptorClass::ALL.iter() {
            let old = capacity.get(class);
            let required = required.get(class);
            if required > old {
                capacity.set(class, required.max(old + (old + 1) / 2));
            }
        }

        let working = create_heap(device, capacity, HeapVisibility::HostOnly)
            .map_err(|err| self.poison(err))?;

        // Working heap is never referenced by commands.
        unsafe {
            for (class, count) in &self.high_water {
                device.copy_descriptors(&self.working, &working, class, count);
            }
            let old = std::mem::replace(&mut self.working, working);
            device.destroy_descriptor_heap(old);
        }

        log::debug!(
            "Descriptor heap grown from {:?} to {:?}",
            self.capacity,
            capacity
        );
        self.capacity = capacity;
        self.growth_count += 1;
        self.dirty = true;
        Ok(())
    }

    fn flush(&mut self, device: &Device<B>) -> Result<(), DescriptorError> {
        profile_scope!("flush");

        if self.visible_capacity != self.capacity {
            let visible = create_heap(device, self.capacity, HeapVisibility::ShaderVisible)
                .map_err(|err| self.poison(err))?;
            let old = std::mem::replace(&mut self.visible, visible);
            self.retired.push(old);
            self.visible_capacity = self.capacity;
        }

        unsafe {
            for (class, count) in &self.high_water {
                device.copy_descriptors(&self.working, &self.visible, class, count);
            }
        }

        log::trace!("Descriptor storage flushed: {:?}", self.high_water);
        self.dirty = false;
        Ok(())
    }
}

/// Owns descriptor heaps for a fixed list of layout groups
/// and allocates descriptor sets from them.
///
/// Every allocated set occupies a contiguous range of slots of each class.
/// Ranges of live sets never overlap.
/// Freed ranges are reused by sets with the same layout signature
/// before the heap is grown.
///
/// Descriptors are written into a host-only working heap.
/// `get_storage` returns a shader-visible copy of it.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
pub struct DescriptorManager<B: Backend> {
    device: DeviceId,
    id: u64,
    inner: Mutex<Inner<B>>,
    #[derivative(Debug = "ignore")]
    relevant: relevant::Relevant,
}

kiln_core::device_owned!(DescriptorManager<B>);

impl<B> DescriptorManager<B>
where
    B: Backend,
{
    /// Create manager for layout groups.
    /// Initial heaps fit one set of every group.
    pub fn setup(
        device: &Device<B>,
        layouts: Vec<DescriptorSetLayout>,
    ) -> Result<Self, DescriptorError> {
        let totals = layouts
            .iter()
            .fold(DescriptorRanges::zero(), |totals, layout| {
                totals + layout.ranges()
            });
        let capacity = totals + DescriptorRanges::splat(HEADROOM);

        let working = create_heap(device, capacity, HeapVisibility::HostOnly)?;
        let visible = match create_heap(device, capacity, HeapVisibility::ShaderVisible) {
            Ok(visible) => visible,
            Err(err) => {
                unsafe { device.destroy_descriptor_heap(working) };
                return Err(err);
            }
        };

        let id = MANAGER_ID.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "Descriptor manager {} set up for {} groups with capacity {:?}",
            id,
            layouts.len(),
            capacity
        );

        Ok(DescriptorManager {
            device: device.id(),
            id,
            inner: Mutex::new(Inner {
                signatures: layouts.iter().map(DescriptorSetLayout::signature).collect(),
                layouts,
                working,
                capacity,
                visible,
                visible_capacity: capacity,
                retired: Vec::new(),
                high_water: DescriptorRanges::zero(),
                free: HashMap::new(),
                live: 0,
                growth_count: 0,
                dirty: false,
                poisoned: false,
            }),
            relevant: relevant::Relevant,
        })
    }

    /// Allocate set for the layout group.
    pub fn create_set(
        &self,
        device: &Device<B>,
        group: usize,
    ) -> Result<DescriptorSet<B>, DescriptorError> {
        self.assert_device_owner(device);
        let mut inner = self.inner.lock();
        if inner.poisoned {
            return Err(DescriptorError::Poisoned);
        }

        let signature = match inner.signatures.get(group) {
            Some(&signature) => signature,
            None => {
                log::error!("Descriptor set requested for unknown group {}", group);
                return Err(DescriptorError::UnknownGroup {
                    group,
                    groups: inner.layouts.len(),
                });
            }
        };

        let offsets = match inner.free.get_mut(&signature).and_then(Vec::pop) {
            Some(offsets) => {
                log::trace!("Reuse freed range {:?} for group {}", offsets, group);
                offsets
            }
            None => {
                let start = inner.high_water;
                let end = start + signature.ranges();
                if !end.fits(&inner.capacity) {
                    inner.grow(device, end)?;
                }
                inner.high_water = end;
                log::trace!("Carve range {:?}..{:?} for group {}", start, end, group);
                start.offsets()
            }
        };

        inner.live += 1;
        Ok(DescriptorSet {
            manager: self.id,
            group,
            signature,
            offsets,
            relevant: relevant::Relevant,
            marker: PhantomData,
        })
    }

    /// Return set's range to the free-list.
    /// Commands referencing the set must be complete.
    pub fn free(&self, set: DescriptorSet<B>) {
        let DescriptorSet {
            manager,
            group,
            signature,
            offsets,
            relevant,
            ..
        } = set;
        relevant.dispose();

        if manager != self.id {
            log::error!(
                "Descriptor set of manager {} is freed into manager {}",
                manager,
                self.id
            );
            return;
        }

        log::trace!("Free range {:?} of group {}", offsets, group);
        let mut inner = self.inner.lock();
        inner.live -= 1;
        inner.free.entry(signature).or_default().push(offsets);
    }

    /// Write descriptor into an element of the set's binding.
    /// Unknown bindings and descriptors of wrong class are ignored.
    pub fn attach(
        &self,
        device: &Device<B>,
        set: &DescriptorSet<B>,
        binding: u32,
        element: u32,
        descriptor: Descriptor<'_, B>,
    ) {
        self.assert_device_owner(device);
        if set.manager != self.id {
            log::error!(
                "Descriptor set of manager {} is attached through manager {}",
                set.manager,
                self.id
            );
            return;
        }

        let mut inner = self.inner.lock();
        let layout = &inner.layouts[set.group];
        let expected = match layout.binding(binding) {
            Some(layout_binding) => layout_binding.kind,
            None => {
                log::error!(
                    "Binding {} is not declared by layout group {}",
                    binding,
                    set.group
                );
                return;
            }
        };

        if expected.class() != descriptor.kind().class() {
            log::error!(
                "Descriptor {:?} can't be attached to binding {} of kind {:?}",
                descriptor.kind(),
                binding,
                expected
            );
            return;
        }

        let (class, slot) = match layout.slot(binding, element) {
            Some(slot) => slot,
            None => {
                log::error!("Element {} is out of binding {} bounds", element, binding);
                return;
            }
        };

        let first = match class {
            DescriptorClass::Resource => set.offsets.resources,
            DescriptorClass::Sampler => set.offsets.samplers,
        };

        log::trace!(
            "Attach {:?} to binding {}[{}] at {:?} slot {}",
            descriptor.kind(),
            binding,
            element,
            class,
            first + slot
        );
        unsafe {
            device.write_descriptor(&inner.working, first + slot, descriptor);
        }
        inner.dirty = true;
    }

    /// Get shader-visible heap, updated with everything attached so far.
    /// Manager is locked until the guard is dropped.
    pub fn get_storage(
        &self,
        device: &Device<B>,
    ) -> Result<MappedMutexGuard<'_, B::DescriptorHeap>, DescriptorError> {
        self.assert_device_owner(device);
        let mut inner = self.inner.lock();
        if inner.poisoned {
            return Err(DescriptorError::Poisoned);
        }
        if inner.dirty {
            inner.flush(device)?;
        }
        Ok(MutexGuard::map(inner, |inner| &mut inner.visible))
    }

    /// Destroy heaps replaced by grown ones.
    ///
    /// # Safety
    ///
    /// Commands referencing retired heaps must be complete.
    pub unsafe fn cleanup(&self, device: &Device<B>) -> usize {
        self.assert_device_owner(device);
        let retired = std::mem::take(&mut self.inner.lock().retired);
        let count = retired.len();
        for heap in retired {
            device.destroy_descriptor_heap(heap);
        }
        if count > 0 {
            log::debug!("{} retired descriptor heaps destroyed", count);
        }
        count
    }

    /// Number of times the heaps were grown.
    pub fn growth_count(&self) -> usize {
        self.inner.lock().growth_count
    }

    /// Current heap capacity.
    pub fn capacity(&self) -> DescriptorRanges {
        self.inner.lock().capacity
    }

    /// Number of live sets.
    pub fn allocated(&self) -> usize {
        self.inner.lock().live
    }

    /// Number of layout groups.
    pub fn groups(&self) -> usize {
        self.inner.lock().layouts.len()
    }

    /// Destroy all heaps.
    ///
    /// # Safety
    ///
    /// Commands referencing any heap of the manager must be complete.
    pub unsafe fn dispose(self, device: &Device<B>) {
        self.assert_device_owner(device);
        let inner = self.inner.into_inner();
        if inner.live > 0 {
            log::error!("{} descriptor sets were not freed", inner.live);
        }
        for heap in inner.retired {
            device.destroy_descriptor_heap(heap);
        }
        device.destroy_descriptor_heap(inner.working);
        device.destroy_descriptor_heap(inner.visible);
        self.relevant.dispose();
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::layout::LayoutBinding,
        kiln_backend::{explicit, timeline, DescriptorRecord},
        kiln_core::{
            hal::device::Device as _, BufferInfo, BufferUsage, DescriptorKind, DeviceConfig,
            Filter, SamplerDesc, ShaderStageFlags, WrapMode,
        },
        rand::{Rng, SeedableRng},
        std::sync::Arc,
    };

    fn layouts() -> Vec<DescriptorSetLayout> {
        vec![
            DescriptorSetLayout::new(vec![
                LayoutBinding::new(0, DescriptorKind::UniformBuffer, ShaderStageFlags::VERTEX),
                LayoutBinding::new(1, DescriptorKind::Sampler, ShaderStageFlags::FRAGMENT),
            ]),
            DescriptorSetLayout::new(vec![LayoutBinding::new(
                0,
                DescriptorKind::StorageBuffer,
                ShaderStageFlags::COMPUTE,
            )
            .with_count(3)]),
        ]
    }

    fn overlaps(a: &std::ops::Range<DescriptorRanges>, b: &std::ops::Range<DescriptorRanges>) -> bool {
        DescriptorClass::ALL.iter().any(|&class| {
            a.start.get(class) < b.end.get(class)
                && b.start.get(class) < a.end.get(class)
                && a.start.get(class) < a.end.get(class)
                && b.start.get(class) < b.end.get(class)
        })
    }

    fn allocations_never_overlap<B: Backend>() {
        let device = Device::<B>::open(&DeviceConfig::default()).unwrap();
        let manager = DescriptorManager::setup(&device, layouts()).unwrap();
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x6b696c6e);
        let mut live: Vec<DescriptorSet<B>> = Vec::new();

        for _ in 0..500 {
            if live.is_empty() || rng.gen_bool(0.6) {
                let set = manager.create_set(&device, rng.gen_range(0..2)).unwrap();
                for other in &live {
                    assert!(
                        !overlaps(&set.ranges(), &other.ranges()),
                        "{:?} overlaps {:?}",
                        set.ranges(),
                        other.ranges()
                    );
                }
                assert!(set.ranges().end.fits(&manager.capacity()));
                live.push(set);
            } else {
                let index = rng.gen_range(0..live.len());
                manager.free(live.swap_remove(index));
            }
        }

        assert_eq!(manager.allocated(), live.len());
        live.into_iter().for_each(|set| manager.free(set));
        unsafe { manager.dispose(&device) };
    }

    #[test]
    fn allocations_never_overlap_explicit() {
        allocations_never_overlap::<explicit::Backend>();
    }

    #[test]
    fn allocations_never_overlap_timeline() {
        allocations_never_overlap::<timeline::Backend>();
    }

    /// Number of growth steps needed to reach `to` slots from `from`.
    fn growth_steps(mut from: u32, to: u32) -> usize {
        let mut steps = 0;
        while from < to {
            from = (from + (from + 1) / 2).max(from + 1);
            steps += 1;
        }
        steps
    }

    fn shared_manager_across_threads<B>()
    where
        B: Backend<DescriptorHeap = explicit::DescriptorPool>,
    {
        let _ = env_logger::builder().is_test(true).try_init();
        let device = Arc::new(Device::<B>::open(&DeviceConfig::default()).unwrap());
        let manager = Arc::new(DescriptorManager::setup(&device, layouts()).unwrap());
        let initial = manager.capacity();
        let registry = Arc::new(Mutex::new(HashMap::new()));
        let samplers = [
            SamplerDesc::new(Filter::Linear, WrapMode::Clamp),
            SamplerDesc::new(Filter::Nearest, WrapMode::Tile),
            SamplerDesc::new(Filter::Linear, WrapMode::Mirror),
            SamplerDesc::new(Filter::Nearest, WrapMode::Clamp),
        ];

        let workers: Vec<_> = (0..samplers.len())
            .map(|index| {
                let device = device.clone();
                let manager = manager.clone();
                let registry = registry.clone();
                let sampler = samplers[index];
                std::thread::spawn(move || {
                    let mut rng = rand::rngs::StdRng::seed_from_u64(0x6b696c6e + index as u64);
                    let buffer = device
                        .create_buffer(BufferInfo {
                            size: 4096,
                            usage: BufferUsage::STORAGE,
                        })
                        .unwrap();
                    let mut live: Vec<(u64, DescriptorSet<B>)> = Vec::new();

                    for step in 0..300u64 {
                        if live.is_empty() || rng.gen_bool(0.55) {
                            let set = manager.create_set(&device, rng.gen_range(0..2)).unwrap();
                            assert!(set.ranges().end.fits(&manager.capacity()));

                            // Live ranges of every thread are registered before use
                            // and unregistered before being freed.
                            let key = (index as u64) << 32 | step;
                            let mut registry = registry.lock();
                            for (other, ranges) in registry.iter() {
                                assert!(
                                    !overlaps(&set.ranges(), ranges),
                                    "{:?} overlaps {:?} of {:x}",
                                    set.ranges(),
                                    ranges,
                                    other
                                );
                            }
                            registry.insert(key, set.ranges());
                            drop(registry);
                            live.push((key, set));
                        } else if rng.gen_bool(0.5) {
                            let (_, set) = &live[rng.gen_range(0..live.len())];
                            let storage = |class: DescriptorClass, slot: u32| {
                                manager.get_storage(&device).unwrap().read(class, slot)
                            };
                            if set.group() == 0 {
                                manager.attach(&device, set, 1, 0, Descriptor::Sampler(sampler));
                                assert_eq!(
                                    storage(DescriptorClass::Sampler, set.offsets().samplers),
                                    Some(DescriptorRecord::Sampler(sampler))
                                );
                            } else {
                                let element = rng.gen_range(0..3);
                                let start = rng.gen_range(0..256u64) * 16;
                                manager.attach(
                                    &device,
                                    set,
                                    0,
                                    element,
                                    Descriptor::Buffer {
                                        kind: DescriptorKind::StorageBuffer,
                                        buffer: &buffer,
                                        range: start..start + 16,
                                    },
                                );
                                match storage(DescriptorClass::Resource, set.offsets().resources + element) {
                                    Some(DescriptorRecord::Buffer { kind, range, .. }) => {
                                        assert_eq!(kind, DescriptorKind::StorageBuffer);
                                        assert_eq!(range, start..start + 16);
                                    }
                                    record => panic!("Unexpected record {:?}", record),
                                }
                            }
                        } else {
                            let (key, set) = live.swap_remove(rng.gen_range(0..live.len()));
                            registry.lock().remove(&key);
                            manager.free(set);
                        }
                    }

                    for (key, set) in live {
                        registry.lock().remove(&key);
                        manager.free(set);
                    }
                    unsafe { device.destroy_buffer(buffer) };
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(manager.allocated(), 0);
        assert!(registry.lock().is_empty());

        let capacity = manager.capacity();
        assert!(initial.fits(&capacity));
        let most = DescriptorClass::ALL
            .iter()
            .map(|&class| growth_steps(initial.get(class), capacity.get(class)))
            .sum::<usize>();
        let growth_count = manager.growth_count();
        assert_eq!(growth_count == 0, capacity == initial);
        assert!(growth_count <= most, "{} growths for {:?}", growth_count, capacity);
        assert_eq!(device.statistics().validation_errors, 0);

        let manager = Arc::try_unwrap(manager).unwrap();
        unsafe {
            manager.cleanup(&device);
            manager.dispose(&device);
        }
    }

    #[test]
    fn shared_manager_across_threads_explicit() {
        shared_manager_across_threads::<explicit::Backend>();
    }

    #[test]
    fn shared_manager_across_threads_timeline() {
        shared_manager_across_threads::<timeline::Backend>();
    }

    #[test]
    fn freed_range_is_reused_without_growth() {
        let device = Device::<explicit::Backend>::open(&DeviceConfig::default()).unwrap();
        let manager = DescriptorManager::setup(&device, layouts()).unwrap();

        let first = manager.create_set(&device, 0).unwrap();
        let offsets = first.offsets();
        let capacity = manager.capacity();
        manager.free(first);

        let second = manager.create_set(&device, 0).unwrap();
        assert_eq!(second.offsets(), offsets);
        assert_eq!(manager.capacity(), capacity);
        assert_eq!(manager.growth_count(), 0);

        manager.free(second);
        unsafe { manager.dispose(&device) };
    }

    #[test]
    fn grows_once_per_threshold_crossing() {
        let device = Device::<timeline::Backend>::open(&DeviceConfig::default()).unwrap();
        let manager = DescriptorManager::setup(&device, layouts()).unwrap();

        // 4 resource slots and 1 sampler slot declared, plus headroom.
        assert_eq!(manager.capacity(), DescriptorRanges::new(5, 2));

        let mut sets = Vec::new();
        let mut growths = 0;
        for _ in 0..32 {
            let before = manager.capacity();
            sets.push(manager.create_set(&device, 1).unwrap());
            let after = manager.capacity();
            if after != before {
                growths += 1;
                let old = before.get(DescriptorClass::Resource);
                assert!(after.get(DescriptorClass::Resource) * 2 >= old * 3);
            }
            assert_eq!(manager.growth_count(), growths);
        }
        assert!(growths > 0);

        sets.into_iter().for_each(|set| manager.free(set));
        unsafe { manager.dispose(&device) };
    }

    #[test]
    fn storage_reflects_attached_descriptors() {
        let _ = env_logger::builder().is_test(true).try_init();
        let device = Device::<explicit::Backend>::open(&DeviceConfig::default()).unwrap();
        let manager = DescriptorManager::setup(&device, layouts()).unwrap();
        let buffer = device
            .create_buffer(BufferInfo {
                size: 256,
                usage: BufferUsage::UNIFORM,
            })
            .unwrap();

        let set = manager.create_set(&device, 0).unwrap();
        manager.attach(
            &device,
            &set,
            0,
            0,
            Descriptor::Buffer {
                kind: DescriptorKind::UniformBuffer,
                buffer: &buffer,
                range: 0..256,
            },
        );
        manager.attach(
            &device,
            &set,
            1,
            0,
            Descriptor::Sampler(SamplerDesc::new(Filter::Linear, WrapMode::Clamp)),
        );

        // Ignored: unknown binding and class mismatch.
        manager.attach(
            &device,
            &set,
            7,
            0,
            Descriptor::Sampler(SamplerDesc::new(Filter::Nearest, WrapMode::Tile)),
        );
        manager.attach(
            &device,
            &set,
            0,
            0,
            Descriptor::Sampler(SamplerDesc::new(Filter::Nearest, WrapMode::Tile)),
        );

        {
            let storage = manager.get_storage(&device).unwrap();
            assert_eq!(storage.desc().visibility, HeapVisibility::ShaderVisible);
            assert_eq!(
                storage.read(DescriptorClass::Resource, set.offsets().resources),
                Some(DescriptorRecord::Buffer {
                    kind: DescriptorKind::UniformBuffer,
                    buffer: buffer.id,
                    range: 0..256,
                })
            );
            assert_eq!(
                storage.read(DescriptorClass::Sampler, set.offsets().samplers),
                Some(DescriptorRecord::Sampler(SamplerDesc::new(
                    Filter::Linear,
                    WrapMode::Clamp
                )))
            );
        }

        assert_eq!(device.statistics().descriptor_writes, 2);

        manager.free(set);
        unsafe {
            device.destroy_buffer(buffer);
            manager.dispose(&device);
        }
    }

    #[test]
    fn grown_storage_keeps_descriptors() {
        let device = Device::<timeline::Backend>::open(&DeviceConfig::default()).unwrap();
        let manager = DescriptorManager::setup(&device, layouts()).unwrap();
        let sampler = SamplerDesc::new(Filter::Nearest, WrapMode::Mirror);

        let first = manager.create_set(&device, 0).unwrap();
        manager.attach(&device, &first, 1, 0, Descriptor::Sampler(sampler));
        let old_heap = manager.get_storage(&device).unwrap().id();

        let mut sets = vec![first];
        while manager.growth_count() == 0 {
            sets.push(manager.create_set(&device, 0).unwrap());
        }

        {
            let storage = manager.get_storage(&device).unwrap();
            assert_ne!(storage.id(), old_heap);
            assert_eq!(
                storage.read(DescriptorClass::Sampler, sets[0].offsets().samplers),
                Some(DescriptorRecord::Sampler(sampler))
            );
        }
        assert_eq!(unsafe { manager.cleanup(&device) }, 1);
        assert_eq!(device.statistics().validation_errors, 0);

        sets.into_iter().for_each(|set| manager.free(set));
        unsafe { manager.dispose(&device) };
    }

    #[test]
    fn unknown_group_is_rejected() {
        let device = Device::<explicit::Backend>::open(&DeviceConfig::default()).unwrap();
        let manager = DescriptorManager::setup(&device, layouts()).unwrap();
        assert_eq!(
            manager.create_set(&device, 2).unwrap_err(),
            DescriptorError::UnknownGroup { group: 2, groups: 2 }
        );
        unsafe { manager.dispose(&device) };
    }
}
