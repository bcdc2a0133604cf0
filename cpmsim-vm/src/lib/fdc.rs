use log::debug;

use crate::disk::{NUM_DRIVES, SECTOR_SIZE, SectorStore, sectors_per_track};
use crate::error::{Direction, VmError, VmResult};
use crate::ram::RAM;

// Command register values.
pub const COMMAND_READ: u8 = 0;
pub const COMMAND_WRITE: u8 = 1;

/// The controller's registers, in port order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdcRegister {
    Drive,
    Track,
    Sector,
    Command,
    Status,
    DmaLow,
    DmaHigh,
}

/// Raw register contents. Everything starts at zero.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FdcRegisters {
    pub drive: u8,
    pub track: u8,
    pub sector: u8,
    pub command: u8,
    pub status: u8,
    pub dma_low: u8,
    pub dma_high: u8,
}

impl FdcRegisters {
    pub fn dma_address(&self) -> u16 {
        u16::from_be_bytes([self.dma_high, self.dma_low])
    }

    pub fn set_dma_address(&mut self, address: u16) {
        [self.dma_high, self.dma_low] = address.to_be_bytes();
    }

    pub fn disk_address(&self) -> DiskAddress {
        DiskAddress {
            drive: self.drive,
            track: self.track,
            sector: self.sector,
        }
    }
}

/// A (drive, track, sector) triple. Sectors are numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskAddress {
    pub drive: u8,
    pub track: u8,
    pub sector: u8,
}

impl DiskAddress {
    /// Sectors from the start of the image, or None for sector 0.
    pub fn linear_sector(&self) -> Option<u32> {
        if self.sector == 0 {
            return None;
        }
        Some(self.track as u32 * sectors_per_track(self.drive) + self.sector as u32 - 1)
    }

    pub fn byte_offset(&self) -> Option<u64> {
        self.linear_sector().map(|s| s as u64 * SECTOR_SIZE as u64)
    }
}

/// The floppy disk controller. Writing the command register performs the
/// whole transfer there and then.
pub struct FloppyController<S> {
    registers: FdcRegisters,
    store: S,
}

impl<S: SectorStore> FloppyController<S> {
    pub fn new(store: S) -> Self {
        FloppyController {
            registers: FdcRegisters::default(),
            store,
        }
    }

    pub fn registers(&self) -> &FdcRegisters {
        &self.registers
    }

    #[cfg(test)]
    pub fn sector_store(&self) -> &S {
        &self.store
    }

    /// Read a register.
    pub fn load(&self, register: FdcRegister) -> u8 {
        let r = &self.registers;
        match register {
            FdcRegister::Drive => r.drive,
            FdcRegister::Track => r.track,
            FdcRegister::Sector => r.sector,
            FdcRegister::Command => r.command,
            FdcRegister::Status => r.status,
            FdcRegister::DmaLow => r.dma_low,
            FdcRegister::DmaHigh => r.dma_high,
        }
    }

    /// Write a register. A command write also runs the transfer against
    /// `ram`, in the direction given by the value written.
    pub fn store(&mut self, register: FdcRegister, value: u8, ram: &mut RAM) -> VmResult<()> {
        let r = &mut self.registers;
        match register {
            FdcRegister::Drive => r.drive = value,
            FdcRegister::Track => r.track = value,
            FdcRegister::Sector => r.sector = value,
            FdcRegister::Command => {
                r.command = value;
                return self.execute(ram);
            }
            FdcRegister::Status => r.status = value,
            FdcRegister::DmaLow => r.dma_low = value,
            FdcRegister::DmaHigh => r.dma_high = value,
        }
        Ok(())
    }

    /// Move one sector between the backing store and the DMA window,
    /// according to the current registers.
    pub fn execute(&mut self, ram: &mut RAM) -> VmResult<()> {
        let direction = match self.registers.command {
            COMMAND_WRITE => Direction::Write,
            _ => Direction::Read,
        };
        let address = self.registers.disk_address();
        let dma = self.registers.dma_address();

        // Check everything before touching the disk.
        if address.drive >= NUM_DRIVES {
            return Err(VmError::Configuration(format!(
                "No disk image for drive {}: only {} drives exist.",
                address.drive, NUM_DRIVES)));
        }
        let offset = address.byte_offset().ok_or(VmError::InvalidSector {
            track: address.track,
            sector: address.sector,
        })?;
        let window = ram.window_mut(dma)?;

        debug!("FDC {:?}: drive {} track {} sector {} (offset {}), DMA {:#06X}.",
               direction, address.drive, address.track, address.sector, offset, dma);
        match direction {
            Direction::Read => self.store.read_sector(address.drive, offset, window),
            Direction::Write => self.store.write_sector(address.drive, offset, window),
        }
    }
}
