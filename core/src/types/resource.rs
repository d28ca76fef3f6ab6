use bitflags::bitflags;

bitflags! {
    /// Bitmask specifying intended usage of a buffer.
    #[repr(transparent)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct BufferUsage: u32 {
        /// Buffer can be used as the source of a transfer command.
        const TRANSFER_SRC = 0x001;

        /// Buffer can be used as the destination of a transfer command.
        const TRANSFER_DST = 0x002;

        /// Buffer can back a uniform buffer descriptor.
        const UNIFORM = 0x010;

        /// Buffer can back a storage buffer descriptor.
        const STORAGE = 0x020;

        /// Buffer can be bound as index buffer.
        const INDEX = 0x040;

        /// Buffer can be bound as vertex buffer.
        const VERTEX = 0x080;

        /// Buffer can hold ray-tracing acceleration structure.
        const ACCELERATION_STRUCTURE = 0x100;
    }
}

bitflags! {
    /// Bitmask specifying intended usage of an image.
    #[repr(transparent)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ImageUsage: u32 {
        /// Image can be used as the source of a transfer command.
        const TRANSFER_SRC = 0x01;

        /// Image can be used as the destination of a transfer command.
        const TRANSFER_DST = 0x02;

        /// Image can be sampled by shaders.
        const SAMPLED = 0x04;

        /// Image can back a storage image descriptor.
        const STORAGE = 0x08;

        /// Image can be bound as color render target.
        const COLOR_ATTACHMENT = 0x10;
    }
}

/// Kind of buffer as requested by the layers above.
/// Each kind maps to a fixed set of usage flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BufferKind {
    /// Vertex data uploaded once.
    Vertex,
    /// Index data uploaded once.
    Index,
    /// Shader constants.
    Uniform,
    /// Shader read-write data.
    Storage,
    /// Host writable upload buffer.
    Staging,
    /// Host readable download buffer.
    Readback,
    /// Storage for ray-tracing acceleration structures.
    AccelerationStructure,
}

impl BufferKind {
    /// Decode buffer kind from the raw value used across tool boundaries.
    /// Unknown values resolve to `Staging`.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => BufferKind::Vertex,
            1 => BufferKind::Index,
            2 => BufferKind::Uniform,
            3 => BufferKind::Storage,
            4 => BufferKind::Staging,
            5 => BufferKind::Readback,
            6 => BufferKind::AccelerationStructure,
            _ => {
                log::error!("Unknown buffer kind {}, falling back to staging buffer", raw);
                BufferKind::Staging
            }
        }
    }

    /// Usage flags for buffers of this kind.
    pub fn usage(self) -> BufferUsage {
        match self {
            BufferKind::Vertex => BufferUsage::VERTEX | BufferUsage::TRANSFER_DST,
            BufferKind::Index => BufferUsage::INDEX | BufferUsage::TRANSFER_DST,
            BufferKind::Uniform => BufferUsage::UNIFORM | BufferUsage::TRANSFER_DST,
            BufferKind::Storage => {
                BufferUsage::STORAGE | BufferUsage::TRANSFER_SRC | BufferUsage::TRANSFER_DST
            }
            BufferKind::Staging => BufferUsage::TRANSFER_SRC,
            BufferKind::Readback => BufferUsage::TRANSFER_DST,
            BufferKind::AccelerationStructure => {
                BufferUsage::ACCELERATION_STRUCTURE | BufferUsage::STORAGE
            }
        }
    }
}

/// Texel format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Format {
    /// Single 8 bit normalized channel.
    R8Unorm,
    /// Four 8 bit normalized channels.
    Rgba8Unorm,
    /// Four 8 bit normalized channels in BGRA order. Typical backbuffer format.
    Bgra8Unorm,
    /// Single 32 bit float channel.
    R32Float,
    /// Four 16 bit float channels.
    Rgba16Float,
    /// Four 32 bit float channels.
    Rgba32Float,
}

impl Format {
    /// Size of one texel in bytes.
    pub fn texel_size(self) -> u32 {
        match self {
            Format::R8Unorm => 1,
            Format::Rgba8Unorm | Format::Bgra8Unorm | Format::R32Float => 4,
            Format::Rgba16Float => 8,
            Format::Rgba32Float => 16,
        }
    }
}

/// Size of an image in texels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Extent {
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

impl Extent {
    /// Number of texels.
    pub fn area(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Buffer creation info.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferInfo {
    /// Buffer size in bytes.
    pub size: u64,

    /// Buffer usage flags.
    pub usage: BufferUsage,
}

/// Image creation info.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageInfo {
    /// Image extent.
    pub extent: Extent,

    /// Texel format.
    pub format: Format,

    /// Image usage flags.
    pub usage: ImageUsage,
}

impl ImageInfo {
    /// Size of tightly packed image content in bytes.
    pub fn size(&self) -> u64 {
        self.extent.area() * u64::from(self.format.texel_size())
    }
}

/// Region of buffer to buffer copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferCopy {
    /// Offset in source buffer.
    pub src: u64,
    /// Offset in destination buffer.
    pub dst: u64,
    /// Number of bytes.
    pub size: u64,
}

/// Texel offset in an image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Offset {
    /// Horizontal offset.
    pub x: u32,
    /// Vertical offset.
    pub y: u32,
}

/// Region of image to image copy.
/// Both images must have the same format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageCopy {
    /// Offset in source image.
    pub src_offset: Offset,
    /// Offset in destination image.
    pub dst_offset: Offset,
    /// Size of the region.
    pub extent: Extent,
}

/// Region of buffer to image copy.
/// Buffer texels are tightly packed rows of `extent.width` texels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferImageCopy {
    /// Offset in source buffer.
    pub buffer_offset: u64,
    /// Offset in destination image.
    pub image_offset: Offset,
    /// Size of the region.
    pub extent: Extent,
}

/// Color render targets are cleared to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClearColor {
    /// Red, green, blue and alpha in `0.0 ..= 1.0`.
    pub rgba: [f32; 4],
}

impl ClearColor {
    /// Encode the clear color as one texel of specified format.
    pub fn encode(&self, format: Format) -> Vec<u8> {
        let unorm = |v: f32| (v.max(0.0).min(1.0) * 255.0).round() as u8;
        let [r, g, b, a] = self.rgba;
        match format {
            Format::R8Unorm => vec![unorm(r)],
            Format::Rgba8Unorm => vec![unorm(r), unorm(g), unorm(b), unorm(a)],
            Format::Bgra8Unorm => vec![unorm(b), unorm(g), unorm(r), unorm(a)],
            Format::R32Float => r.to_le_bytes().to_vec(),
            Format::Rgba16Float => [r, g, b, a]
                .iter()
                .flat_map(|&v| half_bits(v).to_le_bytes().to_vec())
                .collect(),
            Format::Rgba32Float => [r, g, b, a]
                .iter()
                .flat_map(|v| v.to_le_bytes().to_vec())
                .collect(),
        }
    }
}

fn half_bits(value: f32) -> u16 {
    let bits = value.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exp = ((bits >> 23) & 0xff) as i32 - 127 + 15;
    let mantissa = ((bits >> 13) & 0x3ff) as u16;
    // Values below the smallest normal half flush to zero.
    if exp <= 0 {
        sign
    } else if exp >= 0x1f {
        sign | 0x7c00
    } else {
        sign | ((exp as u16) << 10) | mantissa
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_buffer_kind_is_staging() {
        assert_eq!(BufferKind::from_raw(2), BufferKind::Uniform);
        assert_eq!(BufferKind::from_raw(42), BufferKind::Staging);
        assert!(BufferKind::from_raw(u32::max_value())
            .usage()
            .contains(BufferUsage::TRANSFER_SRC));
    }

    #[test]
    fn clear_color_encoding() {
        let color = ClearColor {
            rgba: [1.0, 0.0, 0.5, 1.0],
        };
        assert_eq!(color.encode(Format::Rgba8Unorm), vec![255, 0, 128, 255]);
        assert_eq!(color.encode(Format::Bgra8Unorm), vec![128, 0, 255, 255]);
        assert_eq!(color.encode(Format::Rgba16Float).len(), 8);
        assert_eq!(&color.encode(Format::Rgba16Float)[..2], &0x3c00u16.to_le_bytes());
    }
}
