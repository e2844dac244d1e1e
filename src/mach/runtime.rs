use super::host::Host;
use super::opcode::{bits_to_float, Inst, Opcode};
use super::policy::{Policy, MAX_ITERATIONS};
use super::program::Program;
use super::stack::Stack;
use super::strings::StringTable;
use super::val::{Cmp, Outcome, Val};
use super::verify::verify;
use super::Address;
use crate::lang::{self, Error};
use std::collections::HashMap;

type Result<T> = std::result::Result<T, Error>;

/// How long `input` waits for the host before defaulting the variable.
pub const INPUT_TIMEOUT_MS: u32 = 30_000;

/// Machine lifecycle. A verifier rejection keeps the machine in `Idle`;
/// from `Halted` only a fresh [`Runtime::load`] gets it moving again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Loaded,
    Running,
    Halted,
}

/// ## Virtual machine
///
/// A single-threaded fetch-decode-execute loop over the loaded program.
/// `step` runs exactly one instruction; `run` loops until something stops
/// it. Arithmetic faults diagnose and continue with a neutral result;
/// stack or addressing failures stop the machine at once.
pub struct Runtime {
    policy: Policy,
    program: Vec<Inst>,
    strings: StringTable,
    pc: Address,
    stack: Stack,
    vars: HashMap<String, Val>,
    state: State,
    instruction_count: u32,
    iteration_count: u32,
}

impl Runtime {
    pub fn new(policy: Policy) -> Runtime {
        let stack = Stack::new(policy.stack_size());
        let strings = StringTable::new(policy.max_string_length());
        Runtime {
            policy,
            program: vec![],
            strings,
            pc: 0,
            stack,
            vars: HashMap::new(),
            state: State::Idle,
            instruction_count: 0,
            iteration_count: 0,
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut Policy {
        &mut self.policy
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }

    pub fn pc(&self) -> Address {
        self.pc
    }

    pub fn sp(&self) -> usize {
        self.stack.len()
    }

    pub fn instruction_count(&self) -> u32 {
        self.instruction_count
    }

    pub fn iteration_count(&self) -> u32 {
        self.iteration_count
    }

    pub fn stack_items(&self) -> &[Val] {
        self.stack.items()
    }

    pub fn variables(&self) -> &HashMap<String, Val> {
        &self.vars
    }

    pub fn string_table(&self) -> &StringTable {
        &self.strings
    }

    pub fn program(&self) -> &[Inst] {
        &self.program
    }

    /// Sanitizes, verifies, and installs a program. On a verifier
    /// rejection the diagnostic goes to the host and the machine stays
    /// in `Idle` with nothing loaded.
    pub fn load(&mut self, program: Program, host: &mut dyn Host) -> bool {
        self.reset();
        let (code, strings) = program.into_parts();
        let strings = StringTable::from_entries(strings, self.policy.max_string_length());
        if let Err(e) = verify(&code, strings.entries(), &self.policy) {
            host.diag(&e.to_string());
            return false;
        }
        self.program = code;
        self.strings = strings;
        self.state = State::Loaded;
        true
    }

    fn reset(&mut self) {
        self.program = vec![];
        self.strings = StringTable::new(self.policy.max_string_length());
        self.pc = 0;
        self.stack = Stack::new(self.policy.stack_size());
        self.vars.clear();
        self.state = State::Idle;
        self.instruction_count = 0;
        self.iteration_count = 0;
    }

    /// Executes one instruction. Returns false once the machine is no
    /// longer running.
    pub fn step(&mut self, host: &mut dyn Host) -> bool {
        match self.state {
            State::Loaded | State::Running => {}
            State::Idle | State::Halted => return false,
        }
        self.state = State::Running;
        if self.pc >= self.program.len() {
            self.state = State::Halted;
            return false;
        }
        self.iteration_count += 1;
        if self.iteration_count > MAX_ITERATIONS {
            self.fault(host, error!(IterationLimit; "POSSIBLE INFINITE LOOP"));
            return false;
        }
        let inst = self.program[self.pc];
        self.pc += 1;
        match Opcode::try_from(inst.opcode) {
            Ok(op) => {
                if let Err(e) = self.dispatch(op, inst, host) {
                    self.fault(host, e);
                    return false;
                }
            }
            Err(()) => {
                self.fault(host, error!(InvalidOpcode; "{}", inst.opcode));
                return false;
            }
        }
        self.instruction_count += 1;
        if self.instruction_count > self.policy.max_instructions() {
            self.fault(host, error!(InstructionLimit));
            return false;
        }
        self.state == State::Running
    }

    /// Runs until halt, budget exhaustion, or an unrecoverable failure.
    pub fn run(&mut self, host: &mut dyn Host) {
        while self.step(host) {}
    }

    /// External cancellation: back to idle with PC and stack cleared.
    pub fn stop(&mut self) {
        self.state = State::Idle;
        self.pc = 0;
        self.stack.clear();
    }

    fn fault(&mut self, host: &mut dyn Host, error: Error) {
        host.diag(&error.to_string());
        self.state = State::Halted;
    }

    fn dispatch(&mut self, op: Opcode, inst: Inst, host: &mut dyn Host) -> Result<()> {
        use Opcode::*;
        match op {
            Nop => Ok(()),
            Print => self.r#print(inst, host),
            LedOn => self.r#led(inst, host, true),
            LedOff => self.r#led(inst, host, false),
            Delay => {
                host.sleep_ms(inst.arg1);
                Ok(())
            }
            PushInt => self.stack.push(Val::Int(inst.arg1 as i32)),
            PushFloat => self.stack.push(Val::Float(bits_to_float(inst.arg1))),
            PushString => {
                let idx = self.string_index(inst.arg1)?;
                self.stack.push(Val::Str(idx))
            }
            Pop => self.stack.pop().map(|_| ()),
            Add => self.r#add(host),
            Sub => self.binary(host, Val::subtract),
            Mul => self.binary(host, Val::multiply),
            Div => self.binary(host, Val::divide),
            Mod => self.binary(host, Val::modulo),
            Pow => self.binary(host, Val::power),
            Max => self.binary(host, Val::largest),
            Min => self.binary(host, Val::smallest),
            Abs => self.unary(host, Val::magnitude),
            Sqrt => self.unary(host, Val::root),
            Eq => self.comparison(Cmp::Eq),
            Neq => self.comparison(Cmp::Neq),
            Lt => self.comparison(Cmp::Lt),
            Gt => self.comparison(Cmp::Gt),
            Lte => self.comparison(Cmp::Lte),
            Gte => self.comparison(Cmp::Gte),
            Jump => self.branch(inst.arg1),
            JumpIf => self.r#jump_if(inst),
            PrintNum => self.r#print_num(host),
            Store => self.r#store(inst),
            Load => self.r#load_var(inst, host),
            Input => self.r#input(inst, host),
            Halt => {
                self.state = State::Halted;
                Ok(())
            }
        }
    }

    fn string_index(&self, arg: u32) -> Result<u16> {
        if arg <= u16::MAX as u32 && (arg as usize) < self.strings.len() {
            Ok(arg as u16)
        } else {
            Err(error!(InvalidStringIndex; "{}", arg))
        }
    }

    fn variable_name(&self, arg: u32) -> Result<String> {
        let idx = self.string_index(arg)?;
        Ok(self.strings.get(idx).unwrap_or("").to_string())
    }

    fn r#print(&mut self, inst: Inst, host: &mut dyn Host) -> Result<()> {
        match self.string_index(inst.arg1) {
            Ok(idx) => host.print_line(self.strings.get(idx).unwrap_or("")),
            // Skipping the print is safe recovery.
            Err(e) => host.diag(&e.to_string()),
        }
        Ok(())
    }

    fn r#led(&mut self, inst: Inst, host: &mut dyn Host, level: bool) -> Result<()> {
        if inst.arg1 > 255 || !self.policy.is_pin_allowed(inst.arg1 as u8) {
            host.diag(&error!(PinNotAllowed; "{}", inst.arg1).to_string());
            return Ok(());
        }
        let pin = inst.arg1 as u8;
        host.set_pin_output(pin);
        host.write_pin(pin, level);
        host.print_line(&format!(
            "LED {} pin {}",
            if level { "ON" } else { "OFF" },
            pin
        ));
        Ok(())
    }

    fn r#add(&mut self, host: &mut dyn Host) -> Result<()> {
        let (lhs, rhs) = self.stack.pop_2()?;
        let (val, fault) = Val::sum(lhs, rhs, &mut self.strings);
        if let Some(e) = fault {
            host.diag(&e.to_string());
        }
        self.stack.push(val)
    }

    fn binary(&mut self, host: &mut dyn Host, f: fn(Val, Val) -> Outcome) -> Result<()> {
        let (lhs, rhs) = self.stack.pop_2()?;
        let (val, fault) = f(lhs, rhs);
        if let Some(e) = fault {
            host.diag(&e.to_string());
        }
        self.stack.push(val)
    }

    /// Unary intrinsics replace the top of stack in place.
    fn unary(&mut self, host: &mut dyn Host, f: fn(Val) -> Outcome) -> Result<()> {
        let (val, fault) = f(self.stack.peek()?);
        if let Some(e) = fault {
            host.diag(&e.to_string());
        }
        self.stack.set_top(val)
    }

    /// Comparisons push inverted truth: 0 for true, 1 for false. The
    /// conditional branch compiled after them jumps on non-zero, which
    /// makes "condition true" fall through into the body.
    fn comparison(&mut self, cmp: Cmp) -> Result<()> {
        let (lhs, rhs) = self.stack.pop_2()?;
        let truth = Val::compare(lhs, rhs, cmp, &self.strings);
        self.stack.push(Val::Int(if truth { 0 } else { 1 }))
    }

    fn branch(&mut self, target: u32) -> Result<()> {
        if (target as usize) < self.program.len() {
            self.pc = target as usize;
            Ok(())
        } else {
            Err(error!(InvalidJumpTarget; "{}", target))
        }
    }

    fn r#jump_if(&mut self, inst: Inst) -> Result<()> {
        let condition = self.stack.pop()?;
        if condition.truthy(&self.strings) {
            self.branch(inst.arg1)
        } else {
            Ok(())
        }
    }

    /// Prints the top of stack without popping it.
    fn r#print_num(&mut self, host: &mut dyn Host) -> Result<()> {
        let text = match self.stack.peek()? {
            Val::Int(n) => n.to_string(),
            Val::Float(n) => format!("{:.2}", n),
            Val::Str(idx) => match self.strings.get(idx) {
                Some(s) => s.to_string(),
                None => return Err(error!(InvalidStringIndex; "{}", idx)),
            },
        };
        host.print_line(&text);
        Ok(())
    }

    fn r#store(&mut self, inst: Inst) -> Result<()> {
        let name = self.variable_name(inst.arg1)?;
        let val = self.stack.pop()?;
        self.vars.insert(name, val);
        Ok(())
    }

    fn r#load_var(&mut self, inst: Inst, host: &mut dyn Host) -> Result<()> {
        let name = self.variable_name(inst.arg1)?;
        let val = match self.vars.get(&name) {
            Some(val) => *val,
            None => {
                host.diag(&error!(VariableNotFound; "{}", name).to_string());
                Val::Int(0)
            }
        };
        self.stack.push(val)
    }

    fn r#input(&mut self, inst: Inst, host: &mut dyn Host) -> Result<()> {
        let name = self.variable_name(inst.arg1)?;
        host.print_line(&format!("INPUT {}:", name));
        let line = host
            .read_line(INPUT_TIMEOUT_MS)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let val = match line {
            Some(text) => self.input_value(&text, host),
            None => {
                host.diag(&error!(InputTimeout; "{} DEFAULTS TO 0", name).to_string());
                Val::Int(0)
            }
        };
        self.vars.insert(name, val);
        Ok(())
    }

    /// Typed input: integer shape, then float shape, then interned text.
    fn input_value(&mut self, text: &str, host: &mut dyn Host) -> Val {
        if lang::is_integer(text) {
            if let Ok(n) = text.parse::<i32>() {
                return Val::Int(n);
            }
        }
        if lang::is_integer(text) || lang::is_float(text) {
            if let Ok(f) = text.parse::<f32>() {
                return Val::Float(f);
            }
        }
        match self.strings.intern(text) {
            Ok(idx) => Val::Str(idx),
            Err(e) => {
                host.diag(&e.to_string());
                Val::Int(0)
            }
        }
    }
}
