#![allow(dead_code)]

use ember::mach::{compile, Host, Policy, Runtime};
use std::collections::VecDeque;

/// Capture host: output and diagnostics land in vectors, input is
/// scripted, sleeps and pin writes are recorded.
#[derive(Debug, Default)]
pub struct TestHost {
    pub out: Vec<String>,
    pub diags: Vec<String>,
    pub input: VecDeque<String>,
    pub pins: Vec<(u8, bool)>,
    pub slept_ms: u32,
}

impl TestHost {
    pub fn with_input(lines: &[&str]) -> TestHost {
        TestHost {
            input: lines.iter().map(|s| s.to_string()).collect(),
            ..TestHost::default()
        }
    }

    pub fn diag_text(&self) -> String {
        self.diags.join("\n")
    }
}

impl Host for TestHost {
    fn print_line(&mut self, s: &str) {
        self.out.push(s.to_string());
    }

    fn diag(&mut self, s: &str) {
        self.diags.push(s.to_string());
    }

    fn read_line(&mut self, _timeout_ms: u32) -> Option<String> {
        self.input.pop_front()
    }

    fn sleep_ms(&mut self, ms: u32) {
        self.slept_ms += ms;
    }

    fn set_pin_output(&mut self, _pin: u8) {}

    fn write_pin(&mut self, pin: u8, level: bool) {
        self.pins.push((pin, level));
    }
}

/// Compiles and runs under the default policy, returning the host.
pub fn exec(source: &str) -> TestHost {
    let mut host = TestHost::default();
    exec_into(source, Policy::default(), &mut host);
    host
}

/// Compiles and runs with an explicit policy and host; returns the
/// machine for state inspection.
pub fn exec_into(source: &str, policy: Policy, host: &mut TestHost) -> Runtime {
    let program = compile(source, &policy);
    for error in program.errors() {
        host.diag(&error.to_string());
    }
    let mut vm = Runtime::new(policy);
    if vm.load(program, host) {
        vm.run(host);
    }
    vm
}
