mod console;
mod cpu;
mod disk;
mod error;
mod fdc;
mod ports;
mod ram;

use log::info;
use std::path::PathBuf;

// Public API.
pub use crate::console::{Console, RawTerminal, StdioConsole};
pub use crate::cpu::{BootSource, CPU};
pub use crate::disk::{sectors_per_track, RealSectorStore, Sector, SectorStore, SECTOR_SIZE};
pub use crate::error::{Direction, VmError, VmResult};
pub use crate::fdc::{DiskAddress, FdcRegister, FdcRegisters, FloppyController,
                     COMMAND_READ, COMMAND_WRITE};
pub use crate::ports::{PortDispatcher, PortFunction, DIAGNOSTIC_LEVEL};
pub use crate::ram::{MEMORY_SIZE, RAM};

/// Everything needed to start a machine.
#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Directory holding one sub-directory per drive letter.
    pub disk_root: PathBuf,
    pub boot: BootSource,
    /// Put the host terminal in raw mode while running.
    pub raw_terminal: bool,
    /// Print every instruction executed.
    pub trace_cpu: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            disk_root: PathBuf::from("disks"),
            boot: BootSource::Disk,
            raw_terminal: false,
            trace_cpu: false,
        }
    }
}

/// Boot the machine and run it on the host console until the CPU halts.
pub fn run(config: &VmConfig) -> VmResult<()> {
    info!("Disk images are under '{}'.", config.disk_root.display());
    let store = RealSectorStore::new(&config.disk_root);
    let ports = PortDispatcher::new(store, StdioConsole::new());
    let mut cpu = CPU::new(ports);
    cpu.set_trace(config.trace_cpu);

    cpu.boot(&config.boot)?;

    // Restored when dropped, whichever way we leave.
    let _raw = if config.raw_terminal {
        Some(RawTerminal::enable()?)
    } else {
        None
    };
    cpu.run()
}

/// Send all log output to the test harness. Safe to call from every test.
#[cfg(test)]
fn init_test_logging() {
    // The logger can only be initialised once, but we don't know the order of
    // tests. Therefore we ignore the result.
    let _ = simplelog::TestLogger::init(
        simplelog::LevelFilter::Trace, simplelog::Config::default());
}

#[cfg(test)]
mod tests {
    use super::*;

    use ntest::timeout;
    use std::fs;

    #[test]
    #[timeout(2000)]
    fn test_run_from_boot_disk() {
        init_test_logging();
        let temp_dir = tempfile::tempdir().unwrap();
        let drive_a = temp_dir.path().join("a");
        fs::create_dir(&drive_a).unwrap();
        let mut image = vec![0xE5; 77 * 26 * SECTOR_SIZE];
        image[0] = 0x76;  // HALT
        fs::write(drive_a.join("DISK.IMG"), &image).unwrap();

        let config = VmConfig {
            disk_root: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        run(&config).unwrap();
    }

    #[test]
    fn test_run_without_disks() {
        init_test_logging();
        let temp_dir = tempfile::tempdir().unwrap();
        let config = VmConfig {
            disk_root: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        match run(&config) {
            Err(VmError::Configuration(msg)) => assert!(msg.contains("DISK.IMG")),
            other => panic!("expected a configuration error, got {:?}", other),
        }
    }
}
