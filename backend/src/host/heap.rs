use {
    super::{
        counters::Counters,
        memory::{next_id, Resource},
    },
    kiln_core::{
        hal::{Backend, Descriptor},
        BufferInfo, BufferUsage, DescriptorClass, DescriptorHeapDesc, DescriptorKind, ImageInfo,
        ImageUsage, SamplerDesc,
    },
    parking_lot::RwLock,
    std::{ops::Range, sync::Arc},
};

/// Content of one descriptor slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DescriptorRecord {
    /// Buffer view.
    Buffer {
        /// Descriptor kind.
        kind: DescriptorKind,
        /// Id of the buffer.
        buffer: u64,
        /// Viewed range.
        range: Range<u64>,
    },
    /// Image view.
    Image {
        /// Descriptor kind.
        kind: DescriptorKind,
        /// Id of the image.
        image: u64,
    },
    /// Sampler.
    Sampler(SamplerDesc),
    /// Acceleration structure.
    AccelerationStructure {
        /// Id of the buffer holding the structure.
        buffer: u64,
    },
}

impl DescriptorRecord {
    /// Class of heap slots the record can be stored in.
    pub fn class(&self) -> DescriptorClass {
        match self {
            DescriptorRecord::Sampler(_) => DescriptorClass::Sampler,
            _ => DescriptorClass::Resource,
        }
    }
}

impl DescriptorRecord {
    /// Translate descriptor, reporting resources created without matching usage.
    pub(crate) fn new<B, SB, SI>(descriptor: Descriptor<'_, B>, counters: &Counters) -> Self
    where
        B: Backend<Buffer = Resource<BufferInfo, SB>, Image = Resource<ImageInfo, SI>>,
    {
        match descriptor {
            Descriptor::Buffer {
                kind,
                buffer,
                range,
            } => {
                let required = match kind {
                    DescriptorKind::UniformBuffer => BufferUsage::UNIFORM,
                    DescriptorKind::StorageBuffer => BufferUsage::STORAGE,
                    _ => {
                        counters.validation_error(format_args!(
                            "{:?} descriptor can't view buffer {}",
                            kind, buffer.id
                        ));
                        BufferUsage::empty()
                    }
                };
                if !buffer.info.usage.contains(required) || range.end > buffer.info.size {
                    counters.validation_error(format_args!(
                        "{:?} descriptor of range {:?} is invalid for buffer {} {:?}",
                        kind, range, buffer.id, buffer.info
                    ));
                }
                DescriptorRecord::Buffer {
                    kind,
                    buffer: buffer.id,
                    range,
                }
            }
            Descriptor::Image { kind, image } => {
                let required = match kind {
                    DescriptorKind::SampledImage => ImageUsage::SAMPLED,
                    DescriptorKind::StorageImage => ImageUsage::STORAGE,
                    _ => {
                        counters.validation_error(format_args!(
                            "{:?} descriptor can't view image {}",
                            kind, image.id
                        ));
                        ImageUsage::empty()
                    }
                };
                if !image.info.usage.contains(required) {
                    counters.validation_error(format_args!(
                        "{:?} descriptor is invalid for image {} {:?}",
                        kind, image.id, image.info
                    ));
                }
                DescriptorRecord::Image {
                    kind,
                    image: image.id,
                }
            }
            Descriptor::Sampler(desc) => DescriptorRecord::Sampler(desc),
            Descriptor::AccelerationStructure(buffer) => {
                if !buffer
                    .info
                    .usage
                    .contains(BufferUsage::ACCELERATION_STRUCTURE)
                {
                    counters.validation_error(format_args!(
                        "Buffer {} can't hold acceleration structure",
                        buffer.id
                    ));
                }
                DescriptorRecord::AccelerationStructure { buffer: buffer.id }
            }
        }
    }
}

/// Descriptor heap of a host backend.
#[derive(Clone, derivative::Derivative)]
#[derivative(Debug)]
pub struct DescriptorHeap {
    id: u64,
    desc: DescriptorHeapDesc,
    #[derivative(Debug = "ignore")]
    slots: Arc<RwLock<[Vec<Option<DescriptorRecord>>; 2]>>,
}

impl PartialEq for DescriptorHeap {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl DescriptorHeap {
    pub(crate) fn new(desc: DescriptorHeapDesc) -> Self {
        DescriptorHeap {
            id: next_id(),
            desc,
            slots: Arc::new(RwLock::new([
                vec![None; desc.resources as usize],
                vec![None; desc.samplers as usize],
            ])),
        }
    }

    /// Unique id of the heap.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Creation info.
    pub fn desc(&self) -> &DescriptorHeapDesc {
        &self.desc
    }

    /// Read content of the slot.
    pub fn read(&self, class: DescriptorClass, slot: u32) -> Option<DescriptorRecord> {
        self.slots.read()[class.index()]
            .get(slot as usize)
            .cloned()
            .flatten()
    }

    /// Number of occupied slots of specified class.
    pub fn occupied(&self, class: DescriptorClass) -> usize {
        self.slots.read()[class.index()]
            .iter()
            .filter(|slot| slot.is_some())
            .count()
    }

    /// Returns `false` if slot is out of bounds.
    pub(crate) fn write(&self, slot: u32, record: DescriptorRecord) -> bool {
        let class = record.class();
        match self.slots.write()[class.index()].get_mut(slot as usize) {
            Some(target) => {
                *target = Some(record);
                true
            }
            None => false,
        }
    }

    /// Copy first `count` slots of `class` from `src`.
    /// Returns `false` if either heap is too small.
    pub(crate) fn copy_from(&self, src: &DescriptorHeap, class: DescriptorClass, count: u32) -> bool {
        if Arc::ptr_eq(&self.slots, &src.slots) {
            return (count as usize) <= self.slots.read()[class.index()].len();
        }
        let src = src.slots.read();
        let mut dst = self.slots.write();
        let count = count as usize;
        let (src, dst) = (&src[class.index()], &mut dst[class.index()]);
        if src.len() < count || dst.len() < count {
            return false;
        }
        dst[..count].clone_from_slice(&src[..count]);
        true
    }
}
