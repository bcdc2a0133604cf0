use clap::{Arg, ArgAction, ArgMatches, Command, value_parser, ValueEnum};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, LevelPadding,
                TermLogger, TerminalMode, WriteLogger};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use time::macros::format_description;

use cpmsim_vm::{BootSource, VmConfig};

const DISK_ROOT: &str = "DISK_ROOT";
const BOOT_FILE: &str = "BOOT_FILE";
const RAW_TERMINAL: &str = "RAW_TERMINAL";
const TRACE_CPU: &str = "TRACE_CPU";
const LOG_PATH: &str = "LOG_PATH";
const LOG_LEVEL: &str = "LOG_LEVEL";

/// What reaches stderr when there is no log file.
const STDERR_LEVEL: LevelFilter = LevelFilter::Warn;

const DISK_MSG: &str = "\
cpmsim needs a directory of disk images to boot from. Each drive has its\n\
own folder named after its letter, holding a single DISK.IMG, e.g.\n\
disks/a/DISK.IMG for drive A. The directory defaults to ./disks but can\n\
be set with --disks.";

/// Possible log levels.
#[derive(Debug, PartialEq, Eq, Copy, Clone, ValueEnum)]
enum LogLevel {
    TRACE,
    DEBUG,
    INFO,
}

fn cli() -> Command {
    // Hack to make the build dirty when the toml changes.
    include_str!("../../Cargo.toml");

    clap::command!()
        .max_term_width(100)
        .after_help("\
This is an 8-bit CP/M machine. It boots from the first sector of drive A \
(or from a raw file given with --boot-file) and runs until the CPU halts. \
The console is attached to this terminal; use --raw to pass keystrokes \
through one at a time.")
        .arg(Arg::new(DISK_ROOT)
            .help("The directory holding the drive folders (defaults to ./disks).")
            .long("disks")
            .action(ArgAction::Set)
            .value_parser(value_parser!(PathBuf))
            .default_value("disks"))
        .arg(Arg::new(BOOT_FILE)
            .help("Boot by loading this raw file at address 0 instead of \
                   reading the boot sector from drive A.")
            .long("boot-file")
            .action(ArgAction::Set)
            .value_parser(value_parser!(PathBuf)))
        .arg(Arg::new(RAW_TERMINAL)
            .help("Put the terminal in raw mode while the machine runs.")
            .long("raw")
            .action(ArgAction::SetTrue))
        .arg(Arg::new(TRACE_CPU)
            .help("Print every instruction as it executes.")
            .long("trace-cpu")
            .action(ArgAction::SetTrue))
        .arg(Arg::new(LOG_PATH)
            .help("If set, a debug log will be written to the given path. \
                   Otherwise warnings go to stderr.")
            .short('l')
            .long("log")
            .action(ArgAction::Set))
        .arg(Arg::new(LOG_LEVEL)
            .help("Set the log level. Has no effect without \
                   specifying --log as well. Case insensitive.")
            .short('L')
            .long("log-level")
            .action(ArgAction::Set)
            .value_parser(value_parser!(LogLevel))
            .ignore_case(true)
            .default_value("trace"))
}

/// Ensure that the given path exists and is a directory.
fn check_disk_root(path: &Path) -> Result<(), String> {
    match fs::metadata(path) {
        Ok(meta) => {
            if !meta.is_dir() {
                Err(format!("'{}' is not a directory.\n\n{}", path.display(), DISK_MSG))
            } else {
                Ok(())
            }
        }
        Err(e) => {
            Err(format!("Could not access '{}': {}\n\n{}", path.display(), e, DISK_MSG))
        }
    }
}

/// Logging format shared by both destinations.
fn log_config() -> simplelog::Config {
    ConfigBuilder::new()
        .set_level_padding(LevelPadding::Right)
        .set_location_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off)
        .set_time_format_custom(format_description!(
            "[hour]:[minute]:[second].[subsecond digits:6]"))
        .add_filter_ignore_str("mio")
        .build()
}

/// Initialise logging: to the given file if there is one, otherwise
/// warnings and errors to stderr.
#[cfg(not(test))]
fn init_logging(logfile: Option<File>, level: LevelFilter) -> Result<(), String> {
    match logfile {
        Some(logfile) => WriteLogger::init(level, log_config(), logfile),
        None => TermLogger::init(STDERR_LEVEL, log_config(),
                                 TerminalMode::Stderr, ColorChoice::Auto),
    }.map_err(|e| format!("Failed to initialise logging: {}", e))
}

/// Logging setup for testing build (ignores multiple invocations).
#[cfg(test)]
fn init_logging(logfile: Option<File>, level: LevelFilter) -> Result<(), String> {
    let _ = match logfile {
        Some(logfile) => WriteLogger::init(level, log_config(), logfile),
        None => TermLogger::init(STDERR_LEVEL, log_config(),
                                 TerminalMode::Stderr, ColorChoice::Never),
    };
    Ok(())
}

/// Main run function; returns an exit code.
fn run(args: ArgMatches) -> u8 {
    return match _run(args) {
        Ok(()) => {
            println!("CPU halted.");
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    fn _run(args: ArgMatches) -> Result<(), String> {
        // Initialise logging first so everything after can use it.
        let logfile = match args.get_one::<String>(LOG_PATH) {
            Some(log_path) => Some(File::create(log_path).map_err(|e| {
                format!("Failed to create log file: {}", e)
            })?),
            None => None,
        };
        let level = match args.get_one::<LogLevel>(LOG_LEVEL).unwrap() {
            LogLevel::TRACE => LevelFilter::Trace,
            LogLevel::DEBUG => LevelFilter::Debug,
            LogLevel::INFO => LevelFilter::Info,
        };
        init_logging(logfile, level)?;

        let disk_root = args.get_one::<PathBuf>(DISK_ROOT).unwrap().clone();
        let boot = match args.get_one::<PathBuf>(BOOT_FILE) {
            Some(path) => BootSource::File(path.clone()),
            None => BootSource::Disk,
        };
        // Booting from disk needs the disk directory up front.
        if boot == BootSource::Disk {
            check_disk_root(&disk_root)?;
        }
        let config = VmConfig {
            disk_root,
            boot,
            raw_terminal: args.get_flag(RAW_TERMINAL),
            trace_cpu: args.get_flag(TRACE_CPU),
        };

        // Run the machine.
        cpmsim_vm::run(&config).map_err(|e| e.to_string())
    }
}

fn main() {
    let args = cli().get_matches();
    std::process::exit(run(args).into());
}

#[cfg(test)]
mod tests {
    use super::*;

    use ntest::timeout;

    macro_rules! invoke {
        ($($args:expr),+) => {{
            let args = cli().try_get_matches_from(
                    vec!["cpmsim".to_string(), $($args.to_string()),*])
                .unwrap();
            run(args)
        }}
    }

    /// A disk root containing drive A with the given boot sector.
    fn disk_root(boot: &[u8]) -> tempfile::TempDir {
        let tempdir = tempfile::tempdir().unwrap();
        let drive_a = tempdir.path().join("a");
        fs::create_dir(&drive_a).unwrap();
        let mut image = vec![0xE5; 77 * 26 * cpmsim_vm::SECTOR_SIZE];
        image[..boot.len()].copy_from_slice(boot);
        fs::write(drive_a.join("DISK.IMG"), image).unwrap();
        tempdir
    }

    #[test]
    #[timeout(2000)]
    fn test_disk_boot_halts() {
        let root = disk_root(&[0x76]);
        assert_eq!(invoke!("--disks", root.path().display()), 0);
    }

    #[test]
    #[timeout(2000)]
    fn test_file_boot_halts() {
        let root = tempfile::tempdir().unwrap();
        let boot = root.path().join("boot.bin");
        fs::write(&boot, [0x00, 0x00, 0x76]).unwrap();
        assert_eq!(invoke!("--disks", root.path().display(),
                           "--boot-file", boot.display()), 0);
    }

    #[test]
    #[timeout(2000)]
    fn test_file_boot_without_disk_root() {
        let root = tempfile::tempdir().unwrap();
        let boot = root.path().join("boot.bin");
        fs::write(&boot, [0x76]).unwrap();
        let missing = root.path().join("nope");
        assert_eq!(invoke!("--disks", missing.display(),
                           "--boot-file", boot.display()), 0);
    }

    #[test]
    fn test_port_diagnostics_reach_stderr() {
        assert!(cpmsim_vm::DIAGNOSTIC_LEVEL <= STDERR_LEVEL);
    }

    #[test]
    fn test_missing_disk_root() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("nope");
        assert_eq!(invoke!("--disks", missing.display()), 1);
    }

    #[test]
    fn test_missing_boot_image() {
        // The root exists but drive A has no image.
        let root = tempfile::tempdir().unwrap();
        assert_eq!(invoke!("--disks", root.path().display()), 1);
    }

    #[test]
    #[timeout(2000)]
    fn test_fatal_transfer() {
        // Boot sector asks for a sector far past the end of drive A.
        let root = disk_root(&[
            0x3E, 0xFF, 0xD3, 0x0B, // track 255
            0x3E, 0x01, 0xD3, 0x0C, // sector 1
            0x3E, 0x00, 0xD3, 0x0D, // read
            0x76,
        ]);
        assert_eq!(invoke!("--disks", root.path().display()), 1);
    }

    #[test]
    fn test_log_level_case_insensitive() {
        let args = cli().try_get_matches_from(
            vec!["cpmsim", "--log", "x.log", "-L", "debug"]).unwrap();
        assert_eq!(args.get_one::<LogLevel>(LOG_LEVEL), Some(&LogLevel::DEBUG));
        assert!(cli().try_get_matches_from(vec!["cpmsim", "-L", "loud"]).is_err());
    }
}
