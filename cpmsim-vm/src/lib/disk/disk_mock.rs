use std::collections::HashMap;

use super::disk_interface::*;
use crate::error::{Direction, VmError, VmResult};

/// An in-memory sector store, used when testing other components. Behaves
/// like the real one: missing drives are configuration errors, and sectors
/// hanging off the end of an image are short transfers. Writes never grow an
/// image.
#[derive(Default)]
pub struct MockSectorStore {
    images: HashMap<u8, Vec<u8>>,
}

impl MockSectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a blank image of `num_sectors` sectors for the given drive.
    pub fn insert_blank(&mut self, drive: u8, num_sectors: usize) {
        self.images.insert(drive, vec![0; num_sectors * SECTOR_SIZE]);
    }

    pub fn insert(&mut self, drive: u8, image: Vec<u8>) {
        self.images.insert(drive, image);
    }

    pub fn image(&self, drive: u8) -> Option<&[u8]> {
        self.images.get(&drive).map(Vec::as_slice)
    }

    fn locate(&mut self, drive: u8, offset: u64,
              direction: Direction) -> VmResult<&mut [u8]> {
        let image = self.images.get_mut(&drive).ok_or_else(|| VmError::Configuration(
            format!("Can't open disk image for drive {}", drive)))?;
        let start = (offset as usize).min(image.len());
        let end = (start + SECTOR_SIZE).min(image.len());
        if end - start != SECTOR_SIZE {
            return Err(VmError::TransferSize {
                direction,
                expected: SECTOR_SIZE,
                actual: end - start,
            });
        }
        Ok(&mut image[start..end])
    }
}

impl SectorStore for MockSectorStore {
    fn read_sector(&mut self, drive: u8, offset: u64, sector: &mut Sector) -> VmResult<()> {
        let found = self.locate(drive, offset, Direction::Read)?;
        sector.copy_from_slice(found);
        Ok(())
    }

    fn write_sector(&mut self, drive: u8, offset: u64, sector: &Sector) -> VmResult<()> {
        let found = self.locate(drive, offset, Direction::Write)?;
        found.copy_from_slice(sector);
        Ok(())
    }
}
