use super::compile::compile;
use super::host::Host;
use super::listing::{disassemble, dump_state};
use super::policy::Policy;
use super::program::Program;
use super::runtime::{Runtime, State};
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// ## Embedding facade
///
/// Owns a policy and the machine, and forwards the handful of calls an
/// embedder needs. Compile diagnostics are reported to the host as they
/// surface; the compiled program is held until the next `run`.
pub struct Ember {
    policy: Policy,
    runtime: Runtime,
    program: Option<Program>,
}

impl Default for Ember {
    fn default() -> Ember {
        Ember::new()
    }
}

impl Ember {
    pub fn new() -> Ember {
        Ember::with_policy(Policy::default())
    }

    pub fn with_policy(policy: Policy) -> Ember {
        let runtime = Runtime::new(policy.clone());
        Ember {
            policy,
            runtime,
            program: None,
        }
    }

    /// Compiles source text, reporting diagnostics to the host. Returns
    /// true when the source compiled without any.
    pub fn compile(&mut self, source: &str, host: &mut dyn Host) -> bool {
        let program = compile(source, &self.policy);
        let clean = program.errors().is_empty();
        for error in program.errors() {
            host.diag(&error.to_string());
        }
        self.program = Some(program);
        clean
    }

    /// Loads the compiled program into the machine and runs it to
    /// completion. Returns false if nothing compiles or verification
    /// refuses the program.
    pub fn run(&mut self, host: &mut dyn Host) -> bool {
        let program = match &self.program {
            Some(program) => program.clone(),
            None => return false,
        };
        if !self.runtime.load(program, host) {
            return false;
        }
        self.runtime.run(host);
        true
    }

    pub fn step(&mut self, host: &mut dyn Host) -> bool {
        self.runtime.step(host)
    }

    pub fn stop(&mut self) {
        self.runtime.stop()
    }

    pub fn is_running(&self) -> bool {
        self.runtime.is_running()
    }

    pub fn state(&self) -> State {
        self.runtime.state()
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Disassembly of the most recently compiled program.
    pub fn listing(&self) -> Option<String> {
        self.program
            .as_ref()
            .map(|p| disassemble(p.code(), p.strings()))
    }

    pub fn dump_state(&self) -> String {
        dump_state(&self.runtime)
    }

    pub fn set_max_instructions(&mut self, limit: u32) -> Result<()> {
        self.policy.set_max_instructions(limit)?;
        self.runtime.policy_mut().set_max_instructions(limit)
    }

    pub fn set_max_string_length(&mut self, limit: usize) -> Result<()> {
        self.policy.set_max_string_length(limit)?;
        self.runtime.policy_mut().set_max_string_length(limit)
    }

    pub fn set_stack_size(&mut self, size: usize) -> Result<()> {
        self.policy.set_stack_size(size)?;
        self.runtime.policy_mut().set_stack_size(size)
    }

    pub fn set_max_variable_name_length(&mut self, limit: usize) -> Result<()> {
        self.policy.set_max_variable_name_length(limit)?;
        self.runtime.policy_mut().set_max_variable_name_length(limit)
    }

    pub fn set_max_expression_depth(&mut self, limit: usize) -> Result<()> {
        self.policy.set_max_expression_depth(limit)?;
        self.runtime.policy_mut().set_max_expression_depth(limit)
    }

    pub fn set_max_for_depth(&mut self, limit: usize) -> Result<()> {
        self.policy.set_max_for_depth(limit)?;
        self.runtime.policy_mut().set_max_for_depth(limit)
    }

    pub fn set_max_if_depth(&mut self, limit: usize) -> Result<()> {
        self.policy.set_max_if_depth(limit)?;
        self.runtime.policy_mut().set_max_if_depth(limit)
    }

    pub fn set_allowed_pins(&mut self, pins: Vec<u8>) {
        self.policy.set_allowed_pins(pins.clone());
        self.runtime.policy_mut().set_allowed_pins(pins);
    }

    pub fn add_allowed_pin(&mut self, pin: u8) {
        self.policy.add_allowed_pin(pin);
        self.runtime.policy_mut().add_allowed_pin(pin);
    }

    pub fn remove_allowed_pin(&mut self, pin: u8) {
        self.policy.remove_allowed_pin(pin);
        self.runtime.policy_mut().remove_allowed_pin(pin);
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }
}
