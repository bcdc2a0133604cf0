use iz80::{Cpu, Machine};
use log::{debug, error, info};
use std::fs;
use std::path::PathBuf;

use crate::console::Console;
use crate::disk::SectorStore;
use crate::error::{VmError, VmResult};
use crate::fdc::{FdcRegister, COMMAND_READ};
use crate::ports::PortDispatcher;

/// Where the first code comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootSource {
    /// Read track 0 sector 1 of drive A into address 0.
    Disk,
    /// Copy a raw file into memory at address 0.
    File(PathBuf),
}

/// The CPU core's view of the machine. The core's hooks have no way to
/// report failure, so the first fatal error is parked here until the run
/// loop collects it.
struct Bus<S, C> {
    ports: PortDispatcher<S, C>,
    fault: Option<VmError>,
}

impl<S, C> Bus<S, C> {
    fn latch(&mut self, e: VmError) {
        if self.fault.is_none() {
            error!("Peripheral fault: {}", e);
            self.fault = Some(e);
        }
    }
}

impl<S: SectorStore, C: Console> Machine for Bus<S, C> {
    fn peek(&self, address: u16) -> u8 {
        self.ports.ram()[address]
    }

    fn poke(&mut self, address: u16, value: u8) {
        self.ports.ram_mut()[address] = value;
    }

    fn port_in(&mut self, address: u16) -> u8 {
        // Only the low byte selects the port; the high byte is whatever
        // the CPU happened to have in A or B.
        if self.fault.is_some() {
            return 0xFF;
        }
        match self.ports.read(address as u8) {
            Ok(value) => value,
            Err(e) => {
                self.latch(e);
                0xFF
            }
        }
    }

    fn port_out(&mut self, address: u16, value: u8) {
        if self.fault.is_some() {
            return;
        }
        if let Err(e) = self.ports.write(address as u8, value) {
            self.latch(e);
        }
    }
}

/// A Z80 wired up to the port dispatcher.
pub struct CPU<S, C> {
    core: Cpu,
    bus: Bus<S, C>,
}

impl<S: SectorStore, C: Console> CPU<S, C> {
    pub fn new(ports: PortDispatcher<S, C>) -> Self {
        CPU {
            core: Cpu::new_z80(),
            bus: Bus {
                ports,
                fault: None,
            },
        }
    }

    /// Print every instruction as it executes.
    pub fn set_trace(&mut self, trace: bool) {
        self.core.set_trace(trace);
    }

    pub fn ports(&self) -> &PortDispatcher<S, C> {
        &self.bus.ports
    }

    pub fn ports_mut(&mut self) -> &mut PortDispatcher<S, C> {
        &mut self.bus.ports
    }

    /// Put the first code into memory.
    pub fn boot(&mut self, source: &BootSource) -> VmResult<()> {
        match source {
            BootSource::Disk => {
                info!("Booting from drive A.");
                let ports = &mut self.bus.ports;
                ports.store_fdc(FdcRegister::Drive, 0)?;
                ports.store_fdc(FdcRegister::Track, 0)?;
                ports.store_fdc(FdcRegister::Sector, 1)?;
                ports.store_fdc(FdcRegister::DmaLow, 0)?;
                ports.store_fdc(FdcRegister::DmaHigh, 0)?;
                ports.store_fdc(FdcRegister::Command, COMMAND_READ)
            }
            BootSource::File(path) => {
                info!("Booting from '{}'.", path.display());
                let image = fs::read(path).map_err(|e| VmError::Boot(format!(
                    "Failed to read boot file '{}': {}", path.display(), e)))?;
                debug!("Loading {} bytes at 0x0000.", image.len());
                self.bus.ports.ram_mut().load(0, &image)
            }
        }
    }

    /// Execute until the CPU halts or a peripheral fails.
    pub fn run(&mut self) -> VmResult<()> {
        info!("CPU starting.");
        while !self.core.is_halted() {
            self.core.execute_instruction(&mut self.bus);
            if let Some(e) = self.bus.fault.take() {
                info!("Fatal peripheral error, halting.");
                return Err(e);
            }
        }
        info!("CPU halted.");
        Ok(())
    }
}
