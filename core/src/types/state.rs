/// Logical usage state of a buffer or image.
///
/// Backends translate it into native image layouts and access masks
/// or into native resource-state bitmasks.
/// A resource is in exactly one state at any moment of the GPU timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResourceState {
    /// Content is undefined. Initial state of every resource.
    Undefined,

    /// Any access is allowed, possibly at reduced performance.
    General,

    /// Combination of every read-only state,
    /// including transfer source.
    GenericRead,

    /// Source of a transfer operation.
    TransferSrc,

    /// Destination of a transfer operation.
    TransferDst,

    /// Read by shaders.
    ShaderRead,

    /// Unordered read-write access from shaders.
    UnorderedAccess,

    /// Bound as color render target.
    RenderTarget,

    /// Ready for presentation.
    Present,
}

impl ResourceState {
    /// Check if resource in this state can be used by an operation
    /// that requires `required` state without a transition.
    pub fn satisfies(self, required: ResourceState) -> bool {
        self == required
            || match (self, required) {
                (ResourceState::GenericRead, ResourceState::TransferSrc) => true,
                _ => false,
            }
    }
}

impl Default for ResourceState {
    fn default() -> Self {
        ResourceState::Undefined
    }
}

/// Policy that picks the state a resource settles in
/// after an operation, when it had no defined state before.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SteadyStatePolicy {
    /// Always settle in `ResourceState::General`.
    General,

    /// Pick the state from resource usage flags.
    ByUsage,
}

impl Default for SteadyStatePolicy {
    fn default() -> Self {
        SteadyStatePolicy::General
    }
}

impl SteadyStatePolicy {
    /// Steady state for buffer with specified usage.
    pub fn buffer_state(self, usage: crate::BufferUsage) -> ResourceState {
        use crate::BufferUsage;
        match self {
            SteadyStatePolicy::General => ResourceState::General,
            SteadyStatePolicy::ByUsage => {
                if usage.contains(BufferUsage::STORAGE) {
                    ResourceState::UnorderedAccess
                } else if usage
                    .intersects(BufferUsage::VERTEX | BufferUsage::INDEX | BufferUsage::UNIFORM)
                {
                    ResourceState::GenericRead
                } else {
                    ResourceState::General
                }
            }
        }
    }

    /// Steady state for image with specified usage.
    pub fn image_state(self, usage: crate::ImageUsage) -> ResourceState {
        use crate::ImageUsage;
        match self {
            SteadyStatePolicy::General => ResourceState::General,
            SteadyStatePolicy::ByUsage => {
                if usage.contains(ImageUsage::COLOR_ATTACHMENT) {
                    ResourceState::RenderTarget
                } else if usage.contains(ImageUsage::STORAGE) {
                    ResourceState::UnorderedAccess
                } else if usage.contains(ImageUsage::SAMPLED) {
                    ResourceState::ShaderRead
                } else {
                    ResourceState::General
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BufferUsage, ImageUsage};

    #[test]
    fn generic_read_is_transfer_source() {
        assert!(ResourceState::GenericRead.satisfies(ResourceState::TransferSrc));
        assert!(!ResourceState::GenericRead.satisfies(ResourceState::TransferDst));
        assert!(!ResourceState::General.satisfies(ResourceState::TransferSrc));
        assert!(ResourceState::Present.satisfies(ResourceState::Present));
    }

    #[test]
    fn steady_state_by_usage() {
        let policy = SteadyStatePolicy::ByUsage;
        assert_eq!(
            policy.buffer_state(BufferUsage::VERTEX | BufferUsage::TRANSFER_DST),
            ResourceState::GenericRead
        );
        assert_eq!(
            policy.buffer_state(BufferUsage::STORAGE | BufferUsage::UNIFORM),
            ResourceState::UnorderedAccess
        );
        assert_eq!(
            policy.buffer_state(BufferUsage::TRANSFER_SRC),
            ResourceState::General
        );
        assert_eq!(
            policy.image_state(ImageUsage::SAMPLED | ImageUsage::COLOR_ATTACHMENT),
            ResourceState::RenderTarget
        );
        assert_eq!(
            policy.image_state(ImageUsage::SAMPLED),
            ResourceState::ShaderRead
        );
        assert_eq!(
            SteadyStatePolicy::default().image_state(ImageUsage::SAMPLED),
            ResourceState::General
        );
    }
}
