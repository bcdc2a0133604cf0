use log::{log, Level};

use crate::console::Console;
use crate::disk::SectorStore;
use crate::error::VmResult;
use crate::fdc::{FdcRegister, FloppyController};
use crate::ram::RAM;

// Port numbers.
pub const PORT_CONSOLE_STATUS: u8 = 0x00;
pub const PORT_CONSOLE_DATA: u8 = 0x01;
pub const PORT_PRINTER_STATUS: u8 = 0x02;
pub const PORT_PRINTER_DATA: u8 = 0x03;
pub const PORT_AUX_DATA: u8 = 0x05;
pub const PORT_FDC_DRIVE: u8 = 0x0A;
pub const PORT_FDC_TRACK: u8 = 0x0B;
pub const PORT_FDC_SECTOR: u8 = 0x0C;
pub const PORT_FDC_COMMAND: u8 = 0x0D;
pub const PORT_FDC_STATUS: u8 = 0x0E;
pub const PORT_FDC_DMA_LOW: u8 = 0x0F;
pub const PORT_FDC_DMA_HIGH: u8 = 0x10;

// Console status values.
pub const CONSOLE_READY: u8 = 0xFF;
pub const CONSOLE_NOT_READY: u8 = 0x00;

// Stub and unknown port accesses are logged at this level. It has to get
// past the default stderr filter.
pub const DIAGNOSTIC_LEVEL: Level = Level::Warn;

// What an IN from nowhere returns.
pub const UNHANDLED_PORT_VALUE: u8 = 0xFF;

const LF: u8 = 0x0A;
const CR: u8 = 0x0D;

/// What a port is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortFunction {
    ConsoleStatus,
    ConsoleData,
    PrinterStatus,
    PrinterData,
    AuxData,
    Fdc(FdcRegister),
    Unhandled,
}

impl From<u8> for PortFunction {
    fn from(port: u8) -> Self {
        match port {
            PORT_CONSOLE_STATUS => PortFunction::ConsoleStatus,
            PORT_CONSOLE_DATA => PortFunction::ConsoleData,
            PORT_PRINTER_STATUS => PortFunction::PrinterStatus,
            PORT_PRINTER_DATA => PortFunction::PrinterData,
            PORT_AUX_DATA => PortFunction::AuxData,
            PORT_FDC_DRIVE => PortFunction::Fdc(FdcRegister::Drive),
            PORT_FDC_TRACK => PortFunction::Fdc(FdcRegister::Track),
            PORT_FDC_SECTOR => PortFunction::Fdc(FdcRegister::Sector),
            PORT_FDC_COMMAND => PortFunction::Fdc(FdcRegister::Command),
            PORT_FDC_STATUS => PortFunction::Fdc(FdcRegister::Status),
            PORT_FDC_DMA_LOW => PortFunction::Fdc(FdcRegister::DmaLow),
            PORT_FDC_DMA_HIGH => PortFunction::Fdc(FdcRegister::DmaHigh),
            _ => PortFunction::Unhandled,
        }
    }
}

/// Routes every IN and OUT the CPU performs. Owns the memory image and
/// every device, since the disk controller needs memory for DMA.
pub struct PortDispatcher<S, C> {
    ram: RAM,
    fdc: FloppyController<S>,
    console: C,
}

impl<S: SectorStore, C: Console> PortDispatcher<S, C> {
    pub fn new(store: S, console: C) -> Self {
        PortDispatcher {
            ram: RAM::new(),
            fdc: FloppyController::new(store),
            console,
        }
    }

    pub fn ram(&self) -> &RAM {
        &self.ram
    }

    pub fn ram_mut(&mut self) -> &mut RAM {
        &mut self.ram
    }

    pub fn fdc(&self) -> &FloppyController<S> {
        &self.fdc
    }

    #[cfg(test)]
    pub fn console(&mut self) -> &mut C {
        &mut self.console
    }

    /// Write an FDC register through the same path an OUT would take.
    pub fn store_fdc(&mut self, register: FdcRegister, value: u8) -> VmResult<()> {
        self.fdc.store(register, value, &mut self.ram)
    }

    /// Handle an IN instruction.
    pub fn read(&mut self, port: u8) -> VmResult<u8> {
        Ok(match PortFunction::from(port) {
            PortFunction::ConsoleStatus => {
                if self.console.input_ready()? {
                    CONSOLE_READY
                } else {
                    CONSOLE_NOT_READY
                }
            }
            PortFunction::ConsoleData => match self.console.read_byte()? {
                LF => CR,
                byte => byte,
            },
            PortFunction::PrinterStatus => 0,
            PortFunction::PrinterData => {
                log!(DIAGNOSTIC_LEVEL, "Printer data requested, but not implemented.");
                0
            }
            PortFunction::AuxData => {
                log!(DIAGNOSTIC_LEVEL, "AUX data requested, but not implemented.");
                0
            }
            PortFunction::Fdc(register) => self.fdc.load(register),
            PortFunction::Unhandled => {
                log!(DIAGNOSTIC_LEVEL, "IN: port={:#04X}", port);
                UNHANDLED_PORT_VALUE
            }
        })
    }

    /// Handle an OUT instruction.
    pub fn write(&mut self, port: u8, value: u8) -> VmResult<()> {
        match PortFunction::from(port) {
            PortFunction::ConsoleStatus | PortFunction::PrinterStatus => Ok(()),
            PortFunction::ConsoleData => self.console.write_byte(value),
            PortFunction::PrinterData => {
                log!(DIAGNOSTIC_LEVEL, "Printer data sent, but not implemented.");
                Ok(())
            }
            PortFunction::AuxData => {
                log!(DIAGNOSTIC_LEVEL, "AUX data sent, but not implemented.");
                Ok(())
            }
            PortFunction::Fdc(register) => self.store_fdc(register, value),
            PortFunction::Unhandled => {
                log!(DIAGNOSTIC_LEVEL, "OUT: port={:#04X}, value={:#04X}", port, value);
                Ok(())
            }
        }
    }
}
