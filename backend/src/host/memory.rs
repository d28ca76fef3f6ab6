use {
    kiln_core::{BufferImageCopy, ImageCopy, ImageInfo, MapError, Offset},
    parking_lot::{Mutex, RwLock},
    std::sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Unique id for host objects. Used in logs and descriptor records.
pub fn next_id() -> u64 {
    NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Bytes of a buffer or an image.
#[derive(Clone, Debug)]
pub struct Memory(Arc<RwLock<Vec<u8>>>);

/// Two dimensional copy of `rows` rows of `row_size` bytes.
#[derive(Clone, Copy, Debug)]
pub struct RowCopy {
    pub src_offset: u64,
    pub src_pitch: u64,
    pub dst_offset: u64,
    pub dst_pitch: u64,
    pub row_size: u64,
    pub rows: u64,
}

impl RowCopy {
    /// Linear copy of `size` bytes.
    pub fn linear(src_offset: u64, dst_offset: u64, size: u64) -> Self {
        RowCopy {
            src_offset,
            src_pitch: size,
            dst_offset,
            dst_pitch: size,
            row_size: size,
            rows: 1,
        }
    }

    /// Image to image copy. Formats must match.
    pub fn image(src: &ImageInfo, dst: &ImageInfo, region: &ImageCopy) -> Self {
        let texel = u64::from(src.format.texel_size());
        RowCopy {
            src_offset: Self::texel_offset(region.src_offset, src),
            src_pitch: u64::from(src.extent.width) * texel,
            dst_offset: Self::texel_offset(region.dst_offset, dst),
            dst_pitch: u64::from(dst.extent.width) * texel,
            row_size: u64::from(region.extent.width) * texel,
            rows: u64::from(region.extent.height),
        }
    }

    /// Buffer to image copy. Buffer rows are tightly packed.
    pub fn buffer_to_image(dst: &ImageInfo, region: &BufferImageCopy) -> Self {
        let texel = u64::from(dst.format.texel_size());
        let row_size = u64::from(region.extent.width) * texel;
        RowCopy {
            src_offset: region.buffer_offset,
            src_pitch: row_size,
            dst_offset: Self::texel_offset(region.image_offset, dst),
            dst_pitch: u64::from(dst.extent.width) * texel,
            row_size,
            rows: u64::from(region.extent.height),
        }
    }

    fn texel_offset(offset: Offset, info: &ImageInfo) -> u64 {
        (u64::from(offset.y) * u64::from(info.extent.width) + u64::from(offset.x))
            .saturating_mul(u64::from(info.format.texel_size()))
    }

    /// Number of bytes moved. `None` if it doesn't fit in address space.
    fn bytes(&self) -> Option<usize> {
        let bytes = self.row_size.checked_mul(self.rows)?;
        usize::try_from(bytes).ok()
    }

    /// End of the touched source range. `None` on overflow.
    fn src_end(&self) -> Option<u64> {
        self.end(self.src_offset, self.src_pitch)
    }

    /// End of the touched destination range. `None` on overflow.
    fn dst_end(&self) -> Option<u64> {
        self.end(self.dst_offset, self.dst_pitch)
    }

    fn end(&self, offset: u64, pitch: u64) -> Option<u64> {
        match self.rows {
            0 => Some(offset),
            rows => pitch
                .checked_mul(rows - 1)?
                .checked_add(self.row_size)?
                .checked_add(offset),
        }
    }
}

/// Check that `start..end` lies within `size` bytes.
/// Overflowed end is reported as `u64::MAX`.
fn check(start: u64, end: Option<u64>, size: u64) -> Result<(), MapError> {
    match end {
        Some(end) if end <= size && start <= end => Ok(()),
        end => Err(MapError::OutOfBounds {
            start,
            end: end.unwrap_or(u64::MAX),
            size,
        }),
    }
}

impl Memory {
    pub fn new(size: u64) -> Self {
        Memory(Arc::new(RwLock::new(vec![0; size as usize])))
    }

    pub fn size(&self) -> u64 {
        self.0.read().len() as u64
    }

    pub fn write(&self, offset: u64, data: &[u8]) -> Result<(), MapError> {
        let mut bytes = self.0.write();
        let end = offset.checked_add(data.len() as u64);
        check(offset, end, bytes.len() as u64)?;
        bytes[offset as usize..][..data.len()].copy_from_slice(data);
        Ok(())
    }

    pub fn read(&self, offset: u64, data: &mut [u8]) -> Result<(), MapError> {
        let bytes = self.0.read();
        let end = offset.checked_add(data.len() as u64);
        check(offset, end, bytes.len() as u64)?;
        data.copy_from_slice(&bytes[offset as usize..][..data.len()]);
        Ok(())
    }

    /// Fill whole memory with repeated pattern.
    pub fn fill(&self, pattern: &[u8]) {
        if pattern.is_empty() {
            return;
        }
        let mut bytes = self.0.write();
        for chunk in bytes.chunks_mut(pattern.len()) {
            chunk.copy_from_slice(&pattern[..chunk.len()]);
        }
    }

    /// Copy rows from `src` into `dst`. `src` and `dst` may be the same memory.
    /// Both ranges are checked before anything is touched.
    pub fn copy(src: &Memory, dst: &Memory, copy: RowCopy) -> Result<(), MapError> {
        check(copy.src_offset, copy.src_end(), src.size())?;
        check(copy.dst_offset, copy.dst_end(), dst.size())?;
        let size = copy.bytes().ok_or(MapError::OutOfBounds {
            start: copy.src_offset,
            end: u64::MAX,
            size: src.size(),
        })?;
        let row_size = copy.row_size as usize;

        let mut staging = vec![0; size];
        {
            let bytes = src.0.read();
            for row in 0..copy.rows {
                let start = (copy.src_offset + row * copy.src_pitch) as usize;
                let at = (row * copy.row_size) as usize;
                staging[at..at + row_size].copy_from_slice(&bytes[start..start + row_size]);
            }
        }

        let mut bytes = dst.0.write();
        for row in 0..copy.rows {
            let start = (copy.dst_offset + row * copy.dst_pitch) as usize;
            let at = (row * copy.row_size) as usize;
            bytes[start..start + row_size].copy_from_slice(&staging[at..at + row_size]);
        }
        Ok(())
    }
}

/// Host buffer or image.
/// `I` is the creation info, `S` is the native state tracked by the backend.
#[derive(derivative::Derivative)]
#[derivative(Clone(bound = "I: Clone"), Debug(bound = "I: std::fmt::Debug"))]
pub struct Resource<I, S> {
    pub id: u64,
    pub info: I,
    #[derivative(Debug = "ignore")]
    pub memory: Memory,
    #[derivative(Debug = "ignore")]
    pub state: Arc<Mutex<S>>,
}

impl<I, S> Resource<I, S> {
    pub fn new(info: I, size: u64, state: S) -> Self {
        Resource {
            id: next_id(),
            info,
            memory: Memory::new(size),
            state: Arc::new(Mutex::new(state)),
        }
    }
}

impl<I, S> PartialEq for Resource<I, S> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_copy_within_memory() {
        let memory = Memory::new(16);
        memory.write(0, &[1, 2, 3, 4]).unwrap();
        Memory::copy(&memory, &memory, RowCopy::linear(0, 2, 4)).unwrap();
        let mut data = [0; 6];
        memory.read(0, &mut data).unwrap();
        assert_eq!(data, [1, 2, 1, 2, 3, 4]);
    }

    #[test]
    fn image_region_copy() {
        use kiln_core::{Extent, Format, ImageUsage};

        let info = ImageInfo {
            extent: Extent {
                width: 4,
                height: 4,
            },
            format: Format::R8Unorm,
            usage: ImageUsage::TRANSFER_SRC | ImageUsage::TRANSFER_DST,
        };
        let src = Memory::new(info.size());
        let dst = Memory::new(info.size());
        src.write(0, &(0..16).collect::<Vec<u8>>()).unwrap();

        let copy = RowCopy::image(
            &info,
            &info,
            &ImageCopy {
                src_offset: Offset { x: 1, y: 1 },
                dst_offset: Offset { x: 0, y: 0 },
                extent: Extent {
                    width: 2,
                    height: 2,
                },
            },
        );
        Memory::copy(&src, &dst, copy).unwrap();

        let mut data = [0; 6];
        dst.read(0, &mut data).unwrap();
        assert_eq!(data, [5, 6, 0, 0, 9, 10]);
    }

    #[test]
    fn out_of_bounds_copy_is_rejected() {
        let src = Memory::new(8);
        let dst = Memory::new(4);
        assert_eq!(
            Memory::copy(&src, &dst, RowCopy::linear(0, 0, 8)),
            Err(MapError::OutOfBounds {
                start: 0,
                end: 8,
                size: 4
            })
        );
    }

    #[test]
    fn overflowing_ranges_are_rejected() {
        let src = Memory::new(64);
        let dst = Memory::new(64);
        assert_eq!(
            Memory::copy(&src, &dst, RowCopy::linear(0, 0, u64::MAX)),
            Err(MapError::OutOfBounds {
                start: 0,
                end: u64::MAX,
                size: 64
            })
        );
        assert_eq!(
            Memory::copy(&src, &dst, RowCopy::linear(8, 0, u64::MAX)),
            Err(MapError::OutOfBounds {
                start: 8,
                end: u64::MAX,
                size: 64
            })
        );
        assert!(src.write(u64::MAX, &[1, 2]).is_err());
        assert!(dst.read(u64::MAX - 1, &mut [0; 4]).is_err());

        // Nothing was written by the rejected operations.
        let mut data = [1; 64];
        dst.read(0, &mut data).unwrap();
        assert_eq!(data, [0; 64]);
    }
}
