use {
    crate::layout::LayoutBinding,
    kiln_core::{DescriptorClass, DescriptorOffsets},
    std::ops::{Add, AddAssign},
};

const DESCRIPTOR_CLASSES_COUNT: usize = 2;

/// Number of heap slots of each class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DescriptorRanges {
    counts: [u32; DESCRIPTOR_CLASSES_COUNT],
}

impl DescriptorRanges {
    /// No slots.
    pub fn zero() -> Self {
        DescriptorRanges {
            counts: [0; DESCRIPTOR_CLASSES_COUNT],
        }
    }

    /// Ranges with specified counts.
    pub fn new(resources: u32, samplers: u32) -> Self {
        DescriptorRanges {
            counts: [resources, samplers],
        }
    }

    /// Same count for every class.
    pub fn splat(count: u32) -> Self {
        DescriptorRanges {
            counts: [count; DESCRIPTOR_CLASSES_COUNT],
        }
    }

    /// Iterate over non-empty classes.
    pub fn iter(&self) -> DescriptorRangesIter<'_> {
        DescriptorRangesIter {
            counts: &self.counts,
            index: 0,
        }
    }

    /// Count of slots of specified class.
    pub fn get(&self, class: DescriptorClass) -> u32 {
        self.counts[class.index()]
    }

    /// Set count of slots of specified class.
    pub fn set(&mut self, class: DescriptorClass, count: u32) {
        self.counts[class.index()] = count;
    }

    /// Sum of counts of all bindings.
    pub fn from_bindings(bindings: &[LayoutBinding]) -> Self {
        let mut ranges = DescriptorRanges::zero();

        for binding in bindings {
            ranges.counts[binding.kind.class().index()] += binding.count;
        }

        ranges
    }

    /// Checks that every class fits into `capacity`.
    pub fn fits(&self, capacity: &Self) -> bool {
        (0..DESCRIPTOR_CLASSES_COUNT).all(|i| self.counts[i] <= capacity.counts[i])
    }

    /// Treat counts as slot offsets of a range.
    pub fn offsets(&self) -> DescriptorOffsets {
        DescriptorOffsets {
            resources: self.counts[0],
            samplers: self.counts[1],
        }
    }

    /// Inverse of `offsets`.
    pub fn from_offsets(offsets: DescriptorOffsets) -> Self {
        DescriptorRanges::new(offsets.resources, offsets.samplers)
    }
}

impl Add for DescriptorRanges {
    type Output = Self;
    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for DescriptorRanges {
    fn add_assign(&mut self, rhs: Self) {
        for i in 0..DESCRIPTOR_CLASSES_COUNT {
            self.counts[i] += rhs.counts[i];
        }
    }
}

impl<'a> IntoIterator for &'a DescriptorRanges {
    type Item = (DescriptorClass, u32);
    type IntoIter = DescriptorRangesIter<'a>;

    fn into_iter(self) -> DescriptorRangesIter<'a> {
        self.iter()
    }
}

/// Iterator over non-empty classes of `DescriptorRanges`.
#[derive(Debug)]
pub struct DescriptorRangesIter<'a> {
    counts: &'a [u32; DESCRIPTOR_CLASSES_COUNT],
    index: u8,
}

impl<'a> Iterator for DescriptorRangesIter<'a> {
    type Item = (DescriptorClass, u32);

    fn next(&mut self) -> Option<(DescriptorClass, u32)> {
        loop {
            let index = self.index as usize;
            if index >= DESCRIPTOR_CLASSES_COUNT {
                return None;
            } else {
                self.index += 1;
                if self.counts[index] > 0 {
                    return Some((DescriptorClass::ALL[index], self.counts[index]));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_is_per_class() {
        let a = DescriptorRanges::new(1, 2);
        let b = DescriptorRanges::new(2, 2);
        let c = DescriptorRanges::new(2, 1);
        assert!(a.fits(&b));
        assert!(c.fits(&b));
        assert!(!a.fits(&c));
        assert!(!c.fits(&a));
    }

    #[test]
    fn iter_skips_empty_classes() {
        let ranges = DescriptorRanges::new(0, 3) + DescriptorRanges::new(0, 2);
        let classes: Vec<_> = ranges.iter().collect();
        assert_eq!(classes, vec![(DescriptorClass::Sampler, 5)]);
    }
}
