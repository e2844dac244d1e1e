use std::io::BufRead;
use std::sync::mpsc;
use std::time::Duration;

/// ## Host interface
///
/// Everything the machine can do to the outside world. The embedding
/// firmware supplies the console and the pins; the machine only ever
/// calls through here, so tests substitute a capture buffer and the
/// sandbox stays a sandbox.
pub trait Host {
    /// Write one line to the host output.
    fn print_line(&mut self, s: &str);
    /// Report a diagnostic on the host error channel.
    fn diag(&mut self, s: &str);
    /// Read one line, waiting at most `timeout_ms`. `None` on timeout.
    fn read_line(&mut self, timeout_ms: u32) -> Option<String>;
    /// Block for `ms` milliseconds.
    fn sleep_ms(&mut self, ms: u32);
    /// Configure a pin as an output.
    fn set_pin_output(&mut self, pin: u8);
    /// Drive an output pin high or low.
    fn write_pin(&mut self, pin: u8, level: bool);
}

/// Console host for the runner binary: stdout, stderr, stdin, real sleeps.
/// Pin operations have nowhere to go and are dropped.
pub struct StdHost {
    input: Option<mpsc::Receiver<String>>,
    color: bool,
}

impl StdHost {
    pub fn new(color: bool) -> StdHost {
        StdHost { input: None, color }
    }

    /// Lines are pulled through a channel fed by a reader thread, which is
    /// what makes the input timeout possible on a blocking stdin. The
    /// thread parks on stdin between requests.
    fn input(&mut self) -> &mpsc::Receiver<String> {
        self.input.get_or_insert_with(|| {
            let (tx, rx) = mpsc::channel();
            std::thread::spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    let line = match line {
                        Ok(line) => line,
                        Err(_) => break,
                    };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            });
            rx
        })
    }
}

impl Host for StdHost {
    fn print_line(&mut self, s: &str) {
        println!("{}", s);
    }

    fn diag(&mut self, s: &str) {
        if self.color {
            eprintln!("{}", ansi_term::Colour::Red.paint(format!("?{}", s)));
        } else {
            eprintln!("?{}", s);
        }
    }

    fn read_line(&mut self, timeout_ms: u32) -> Option<String> {
        self.input()
            .recv_timeout(Duration::from_millis(timeout_ms as u64))
            .ok()
    }

    fn sleep_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms as u64));
    }

    fn set_pin_output(&mut self, _pin: u8) {}

    fn write_pin(&mut self, _pin: u8, _level: bool) {}
}

/// Host that swallows everything; input always times out.
#[derive(Debug, Default)]
pub struct NullHost;

impl Host for NullHost {
    fn print_line(&mut self, _s: &str) {}
    fn diag(&mut self, _s: &str) {}
    fn read_line(&mut self, _timeout_ms: u32) -> Option<String> {
        None
    }
    fn sleep_ms(&mut self, _ms: u32) {}
    fn set_pin_output(&mut self, _pin: u8) {}
    fn write_pin(&mut self, _pin: u8, _level: bool) {}
}
