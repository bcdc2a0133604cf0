use crate::error::VmResult;

// Every drive uses the same sector size.
pub const SECTOR_SIZE: usize = 128;
pub type Sector = [u8; SECTOR_SIZE];

// Drive classes: A-D are 8" floppies, the rest are hard disks.
pub const NUM_FLOPPY_DRIVES: u8 = 4;
pub const SECTORS_PER_TRACK_FLOPPY: u32 = 26;
pub const SECTORS_PER_TRACK_HARD: u32 = 128;

// One backing file per drive letter.
pub const DRIVE_LETTERS: &[u8; 16] = b"abcdefghijklmnop";
pub const NUM_DRIVES: u8 = DRIVE_LETTERS.len() as u8;
pub const IMAGE_FILE_NAME: &str = "DISK.IMG";

/// Sectors per track for the class of the given drive.
pub fn sectors_per_track(drive: u8) -> u32 {
    if drive < NUM_FLOPPY_DRIVES {
        SECTORS_PER_TRACK_FLOPPY
    } else {
        SECTORS_PER_TRACK_HARD
    }
}

/// The letter naming the given drive, if there is one.
pub fn drive_letter(drive: u8) -> Option<char> {
    DRIVE_LETTERS.get(drive as usize).map(|&l| l as char)
}

/// Somewhere whole sectors can be read from and written to, addressed by
/// drive and byte offset.
pub trait SectorStore {
    fn read_sector(&mut self, drive: u8, offset: u64, sector: &mut Sector) -> VmResult<()>;
    fn write_sector(&mut self, drive: u8, offset: u64, sector: &Sector) -> VmResult<()>;
}
