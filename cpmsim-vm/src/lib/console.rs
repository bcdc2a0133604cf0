use crossterm::{terminal, tty::IsTty};
use log::{info, warn};
use std::io::{self, Write};
use std::os::unix::io::RawFd;

use crate::error::{VmError, VmResult};

/// The machine's terminal: one input stream that can be checked without
/// blocking, and one output stream.
pub trait Console {
    /// Is there a byte waiting? Never consumes anything.
    fn input_ready(&mut self) -> VmResult<bool>;
    /// Take exactly one byte, waiting for it if necessary.
    fn read_byte(&mut self) -> VmResult<u8>;
    /// Send one byte straight out.
    fn write_byte(&mut self, byte: u8) -> VmResult<()>;
}

/// The host's stdin and stdout.
///
/// Stdin is read directly from the file descriptor rather than through
/// `io::Stdin`: anything sitting in std's buffer would be invisible to
/// `poll`.
pub struct StdioConsole {
    input: RawFd,
    stdout: io::Stdout,
}

impl StdioConsole {
    pub fn new() -> Self {
        Self::with_input(libc::STDIN_FILENO)
    }

    /// Take input from the given file descriptor instead of stdin. The
    /// descriptor is borrowed, not closed.
    pub fn with_input(input: RawFd) -> Self {
        StdioConsole {
            input,
            stdout: io::stdout(),
        }
    }
}

impl Default for StdioConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for StdioConsole {
    fn input_ready(&mut self) -> VmResult<bool> {
        let mut pollfd = libc::pollfd {
            fd: self.input,
            events: libc::POLLIN,
            revents: 0,
        };
        loop {
            // SAFETY: pollfd is a single valid entry and the timeout is zero.
            let result = unsafe { libc::poll(&mut pollfd, 1, 0) };
            if result >= 0 {
                return Ok(result > 0 && pollfd.revents & libc::POLLIN != 0);
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(VmError::Poll(err));
            }
        }
    }

    fn read_byte(&mut self) -> VmResult<u8> {
        let mut byte = 0u8;
        loop {
            // SAFETY: the destination is one byte of valid, writable memory.
            let result = unsafe {
                libc::read(self.input, (&mut byte as *mut u8).cast(), 1)
            };
            match result {
                1 => return Ok(byte),
                0 => return Err(VmError::Console(io::Error::new(
                    io::ErrorKind::UnexpectedEof, "end of console input"))),
                _ => {
                    let err = io::Error::last_os_error();
                    if err.kind() != io::ErrorKind::Interrupted {
                        return Err(VmError::Console(err));
                    }
                }
            }
        }
    }

    fn write_byte(&mut self, byte: u8) -> VmResult<()> {
        self.stdout.write_all(&[byte])
            .and_then(|_| self.stdout.flush())
            .map_err(VmError::Console)
    }
}

/// Puts the host terminal into raw mode for as long as it lives, so that
/// keystrokes reach the machine one at a time and unechoed.
pub struct RawTerminal {
    enabled: bool,
}

impl RawTerminal {
    /// Enable raw mode if stdin is a terminal; otherwise do nothing.
    pub fn enable() -> VmResult<Self> {
        if !io::stdin().is_tty() {
            info!("Console input is not a terminal, leaving it as it is.");
            return Ok(RawTerminal { enabled: false });
        }
        terminal::enable_raw_mode().map_err(VmError::Console)?;
        info!("Terminal switched to raw mode.");
        Ok(RawTerminal { enabled: true })
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        if self.enabled {
            if let Err(e) = terminal::disable_raw_mode() {
                warn!("Failed to restore the terminal: {}", e);
            }
        }
    }
}

/// A scripted console, used when testing other components.
#[cfg(test)]
#[derive(Default)]
pub struct MockConsole {
    pub input: std::collections::VecDeque<u8>,
    pub output: Vec<u8>,
    pub poll_fails: bool,
}

#[cfg(test)]
impl MockConsole {
    pub fn with_input(input: &[u8]) -> Self {
        MockConsole {
            input: input.iter().copied().collect(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
impl Console for MockConsole {
    fn input_ready(&mut self) -> VmResult<bool> {
        if self.poll_fails {
            return Err(VmError::Poll(io::Error::from(io::ErrorKind::Other)));
        }
        Ok(!self.input.is_empty())
    }

    fn read_byte(&mut self) -> VmResult<u8> {
        self.input.pop_front().ok_or_else(|| VmError::Console(
            io::Error::from(io::ErrorKind::UnexpectedEof)))
    }

    fn write_byte(&mut self, byte: u8) -> VmResult<()> {
        self.output.push(byte);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Both ends of a pipe, closed on drop.
    struct Pipe {
        read: RawFd,
        write: Option<RawFd>,
    }

    impl Pipe {
        fn new() -> Self {
            let mut fds = [0; 2];
            assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
            Pipe {
                read: fds[0],
                write: Some(fds[1]),
            }
        }

        fn send(&self, bytes: &[u8]) {
            let fd = self.write.unwrap();
            let written = unsafe { libc::write(fd, bytes.as_ptr().cast(), bytes.len()) };
            assert_eq!(written, bytes.len() as isize);
        }

        fn close_writer(&mut self) {
            if let Some(fd) = self.write.take() {
                unsafe { libc::close(fd) };
            }
        }
    }

    impl Drop for Pipe {
        fn drop(&mut self) {
            self.close_writer();
            unsafe { libc::close(self.read) };
        }
    }

    #[test]
    fn test_empty_input_not_ready() {
        let pipe = Pipe::new();
        let mut console = StdioConsole::with_input(pipe.read);
        assert!(!console.input_ready().unwrap());
    }

    #[test]
    fn test_ready_check_does_not_consume() {
        let pipe = Pipe::new();
        let mut console = StdioConsole::with_input(pipe.read);
        pipe.send(b"x");

        assert!(console.input_ready().unwrap());
        assert!(console.input_ready().unwrap());
        assert_eq!(console.read_byte().unwrap(), b'x');
        assert!(!console.input_ready().unwrap());
    }

    #[test]
    fn test_read_one_byte_at_a_time() {
        let pipe = Pipe::new();
        let mut console = StdioConsole::with_input(pipe.read);
        pipe.send(b"\r\n");

        assert_eq!(console.read_byte().unwrap(), b'\r');
        assert!(console.input_ready().unwrap());
        assert_eq!(console.read_byte().unwrap(), b'\n');
    }

    #[test]
    fn test_end_of_input() {
        let mut pipe = Pipe::new();
        let mut console = StdioConsole::with_input(pipe.read);
        pipe.send(b"q");
        pipe.close_writer();

        assert_eq!(console.read_byte().unwrap(), b'q');
        match console.read_byte() {
            Err(VmError::Console(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected end of input, got {:?}", other),
        }
    }
}
