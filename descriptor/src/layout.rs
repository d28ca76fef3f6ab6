use {
    crate::ranges::DescriptorRanges,
    kiln_core::{DescriptorClass, DescriptorKind, ShaderStageFlags},
    std::{
        collections::hash_map::DefaultHasher,
        hash::{Hash, Hasher},
    },
};

/// One binding of a descriptor set layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutBinding {
    /// Binding index.
    pub binding: u32,
    /// Kind of descriptors.
    pub kind: DescriptorKind,
    /// Number of array elements.
    pub count: u32,
    /// Shader stages the binding is visible to.
    pub visibility: ShaderStageFlags,
}

impl LayoutBinding {
    /// Binding with one element.
    pub fn new(binding: u32, kind: DescriptorKind, visibility: ShaderStageFlags) -> Self {
        LayoutBinding {
            binding,
            kind,
            count: 1,
            visibility,
        }
    }

    /// Set number of array elements.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }
}

/// Identifies layouts whose sets are interchangeable.
/// Sets with equal signatures occupy equally sized ranges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayoutSignature {
    hash: u64,
    ranges: DescriptorRanges,
}

impl LayoutSignature {
    /// Slots occupied by a set with this signature.
    pub fn ranges(&self) -> DescriptorRanges {
        self.ranges
    }
}

/// Layout of a group of descriptors bound together.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DescriptorSetLayout {
    bindings: Vec<LayoutBinding>,
}

impl DescriptorSetLayout {
    /// Create layout from bindings in any order.
    pub fn new(mut bindings: Vec<LayoutBinding>) -> Self {
        bindings.sort_by_key(|binding| binding.binding);
        log::trace!("Creating new layout with bindings: {:?}", bindings);
        DescriptorSetLayout { bindings }
    }

    /// Bindings ordered by binding index.
    pub fn bindings(&self) -> &[LayoutBinding] {
        &self.bindings
    }

    /// Find binding by index.
    pub fn binding(&self, binding: u32) -> Option<&LayoutBinding> {
        self.bindings
            .binary_search_by_key(&binding, |b| b.binding)
            .ok()
            .map(|index| &self.bindings[index])
    }

    /// Slots a set of this layout occupies.
    pub fn ranges(&self) -> DescriptorRanges {
        DescriptorRanges::from_bindings(&self.bindings)
    }

    /// Hash of ordered binding kinds, counts and visibility.
    pub fn signature(&self) -> LayoutSignature {
        let mut hasher = DefaultHasher::new();
        for binding in &self.bindings {
            binding.kind.hash(&mut hasher);
            binding.count.hash(&mut hasher);
            binding.visibility.hash(&mut hasher);
        }
        LayoutSignature {
            hash: hasher.finish(),
            ranges: self.ranges(),
        }
    }

    /// Slot of the array element of the binding relative to the set's first slot of its class.
    pub fn slot(&self, binding: u32, element: u32) -> Option<(DescriptorClass, u32)> {
        let target = self.binding(binding)?;
        if element >= target.count {
            return None;
        }
        let class = target.kind.class();
        let offset: u32 = self
            .bindings
            .iter()
            .take_while(|b| b.binding < binding)
            .filter(|b| b.kind.class() == class)
            .map(|b| b.count)
            .sum();
        Some((class, offset + element))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> DescriptorSetLayout {
        DescriptorSetLayout::new(vec![
            LayoutBinding::new(2, DescriptorKind::Sampler, ShaderStageFlags::FRAGMENT),
            LayoutBinding::new(0, DescriptorKind::UniformBuffer, ShaderStageFlags::VERTEX),
            LayoutBinding::new(1, DescriptorKind::SampledImage, ShaderStageFlags::FRAGMENT)
                .with_count(4),
        ])
    }

    #[test]
    fn slots_are_packed_per_class() {
        let layout = layout();
        assert_eq!(layout.ranges(), DescriptorRanges::new(5, 1));
        assert_eq!(layout.slot(0, 0), Some((DescriptorClass::Resource, 0)));
        assert_eq!(layout.slot(1, 3), Some((DescriptorClass::Resource, 4)));
        assert_eq!(layout.slot(2, 0), Some((DescriptorClass::Sampler, 0)));
        assert_eq!(layout.slot(1, 4), None);
        assert_eq!(layout.slot(3, 0), None);
    }

    #[test]
    fn signature_depends_on_visibility() {
        let a = layout();
        let b = DescriptorSetLayout::new(vec![
            LayoutBinding::new(0, DescriptorKind::UniformBuffer, ShaderStageFlags::ALL),
            LayoutBinding::new(1, DescriptorKind::SampledImage, ShaderStageFlags::FRAGMENT)
                .with_count(4),
            LayoutBinding::new(2, DescriptorKind::Sampler, ShaderStageFlags::FRAGMENT),
        ]);
        assert_eq!(a.signature(), a.clone().signature());
        assert_ne!(a.signature(), b.signature());
        assert_eq!(a.signature().ranges(), b.signature().ranges());
    }
}
