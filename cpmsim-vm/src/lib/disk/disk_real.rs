use cpmsim_utils::hexprint::pretty_print_hex_block;
use log::{debug, log_enabled, trace, Level};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use super::disk_interface::*;
use crate::error::{Direction, VmError, VmResult};

/// Sector storage on the host filesystem: one flat image per drive at
/// `<root>/<letter>/DISK.IMG`. Images are opened afresh for every transfer
/// and closed again before returning.
pub struct RealSectorStore {
    root: PathBuf,
}

impl RealSectorStore {
    /// Create a store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        RealSectorStore {
            root: root.into(),
        }
    }

    /// Where the image for the given drive lives.
    pub fn image_path(&self, drive: u8) -> VmResult<PathBuf> {
        match drive_letter(drive) {
            Some(letter) => Ok(self.root
                .join(letter.to_string())
                .join(IMAGE_FILE_NAME)),
            None => Err(VmError::Configuration(format!(
                "No disk image for drive {}: only {} drives exist.",
                drive, NUM_DRIVES))),
        }
    }

    /// Open the image for the given drive and position it at `offset`.
    fn open_at(&self, drive: u8, offset: u64,
               direction: Direction) -> VmResult<(PathBuf, File)> {
        let path = self.image_path(drive)?;
        // Writes must neither create nor truncate: the rest of the image
        // has to survive.
        let opened = match direction {
            Direction::Read => File::open(&path),
            Direction::Write => OpenOptions::new().write(true).open(&path),
        };
        let mut file = opened.map_err(|e| VmError::Configuration(format!(
            "Can't open disk image '{}': {}", path.display(), e)))?;
        if let Err(source) = file.seek(SeekFrom::Start(offset)) {
            return Err(VmError::DiskIo { path, source });
        }
        Ok((path, file))
    }
}

impl SectorStore for RealSectorStore {
    fn read_sector(&mut self, drive: u8, offset: u64, sector: &mut Sector) -> VmResult<()> {
        let (path, mut file) = self.open_at(drive, offset, Direction::Read)?;

        // Only copy out once the whole sector has arrived.
        let mut buffer = [0; SECTOR_SIZE];
        let actual = transfer(|done| file.read(&mut buffer[done..]))
            .map_err(|source| VmError::DiskIo { path: path.clone(), source })?;
        if actual != SECTOR_SIZE {
            return Err(VmError::TransferSize {
                direction: Direction::Read,
                expected: SECTOR_SIZE,
                actual,
            });
        }
        *sector = buffer;

        debug!("Read {} bytes at offset {} of '{}'.", SECTOR_SIZE, offset, path.display());
        trace_sector(offset, sector);
        Ok(())
    }

    fn write_sector(&mut self, drive: u8, offset: u64, sector: &Sector) -> VmResult<()> {
        let (path, mut file) = self.open_at(drive, offset, Direction::Write)?;

        // Images never grow: only the bytes already there can be written.
        let len = file.metadata()
            .map_err(|source| VmError::DiskIo { path: path.clone(), source })?
            .len();
        let available = len.saturating_sub(offset).min(SECTOR_SIZE as u64) as usize;
        if available != SECTOR_SIZE {
            return Err(VmError::TransferSize {
                direction: Direction::Write,
                expected: SECTOR_SIZE,
                actual: available,
            });
        }

        let actual = transfer(|done| file.write(&sector[done..]))
            .and_then(|actual| file.flush().map(|_| actual))
            .map_err(|source| VmError::DiskIo { path: path.clone(), source })?;
        if actual != SECTOR_SIZE {
            return Err(VmError::TransferSize {
                direction: Direction::Write,
                expected: SECTOR_SIZE,
                actual,
            });
        }

        debug!("Wrote {} bytes at offset {} of '{}'.", SECTOR_SIZE, offset, path.display());
        trace_sector(offset, sector);
        Ok(())
    }
}

/// Keep calling `step` with the number of bytes moved so far until a whole
/// sector has been moved or it reports end of file. Returns the total.
fn transfer<F>(mut step: F) -> io::Result<usize>
    where F: FnMut(usize) -> io::Result<usize>
{
    let mut done = 0;
    while done < SECTOR_SIZE {
        match step(done) {
            Ok(0) => break,
            Ok(n) => done += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(done)
}

fn trace_sector(offset: u64, sector: &Sector) {
    if log_enabled!(Level::Trace) {
        trace!("Sector contents:\n{}", pretty_print_hex_block(sector, offset as usize));
    }
}
