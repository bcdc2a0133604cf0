use std::ops::{Index, IndexMut};

use crate::disk::SECTOR_SIZE;
use crate::error::{VmError, VmResult};

/// Size of the emulated address space.
pub const MEMORY_SIZE: usize = 0x10000;

/// The flat memory image shared by the CPU and the disk controller.
pub struct RAM {
    data: Vec<u8>,
}

impl RAM {
    pub fn new() -> Self {
        Self {
            data: vec![0; MEMORY_SIZE],
        }
    }

    /// The sector-sized DMA window starting at `address`.
    pub fn window(&self, address: u16) -> VmResult<&[u8; SECTOR_SIZE]> {
        self.data[address as usize..]
            .first_chunk()
            .ok_or(VmError::DmaOutOfBounds { address })
    }

    /// Mutable version of `window`.
    pub fn window_mut(&mut self, address: u16) -> VmResult<&mut [u8; SECTOR_SIZE]> {
        self.data[address as usize..]
            .first_chunk_mut()
            .ok_or(VmError::DmaOutOfBounds { address })
    }

    /// Copy a raw image into memory at the given address.
    pub fn load(&mut self, address: u16, image: &[u8]) -> VmResult<()> {
        let start = address as usize;
        if image.len() > MEMORY_SIZE - start {
            return Err(VmError::Boot(format!(
                "{} bytes do not fit in memory at {:#06X}", image.len(), address)));
        }
        self.data[start..start + image.len()].copy_from_slice(image);
        Ok(())
    }
}

impl Default for RAM {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<u16> for RAM {
    type Output = u8;

    fn index(&self, index: u16) -> &Self::Output {
        self.data.index(index as usize)
    }
}

impl IndexMut<u16> for RAM {
    fn index_mut(&mut self, index: u16) -> &mut Self::Output {
        self.data.index_mut(index as usize)
    }
}
