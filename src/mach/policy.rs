use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// Iteration counter cap; not configurable.
pub const MAX_ITERATIONS: u32 = 100_000;
/// Longest permitted delay, in milliseconds; not configurable.
pub const MAX_DELAY_MS: u32 = 60_000;
/// Longest program the verifier will accept.
pub const MAX_PROGRAM_LEN: usize = 10_000;
/// Largest string table the verifier will accept at load time.
pub const MAX_LOAD_STRINGS: usize = 1_000;
/// The emitter refuses to grow the bytecode past this point.
pub const MAX_EMIT: usize = 65_535;
/// Longest cleaned source line the compiler will take.
pub const MAX_LINE_LEN: usize = 512;
/// Most tokens one expression may hold.
pub const MAX_EXPR_TOKENS: usize = 100;

/// Default allow-listed pin: the board's builtin LED.
pub const BUILTIN_LED: u8 = 13;

/// ## Resource policy
///
/// Every budget the sandbox enforces, with validating setters. An
/// out-of-range value is rejected and the prior value stays in place.
#[derive(Debug, Clone)]
pub struct Policy {
    max_instructions: u32,
    max_string_length: usize,
    max_variable_name_length: usize,
    max_expression_depth: usize,
    max_for_depth: usize,
    max_if_depth: usize,
    stack_size: usize,
    allowed_pins: Vec<u8>,
}

impl Default for Policy {
    fn default() -> Policy {
        Policy {
            max_instructions: 10_000,
            max_string_length: 256,
            max_variable_name_length: 32,
            max_expression_depth: 32,
            max_for_depth: 16,
            max_if_depth: 16,
            stack_size: 256,
            allowed_pins: vec![BUILTIN_LED],
        }
    }
}

fn check_range(value: usize, min: usize, max: usize, name: &str) -> Result<()> {
    if value < min || value > max {
        return Err(error!(InvalidConfig; "{} MUST BE {}..={}", name, min, max));
    }
    Ok(())
}

impl Policy {
    pub fn max_instructions(&self) -> u32 {
        self.max_instructions
    }

    pub fn max_string_length(&self) -> usize {
        self.max_string_length
    }

    pub fn max_variable_name_length(&self) -> usize {
        self.max_variable_name_length
    }

    pub fn max_expression_depth(&self) -> usize {
        self.max_expression_depth
    }

    pub fn max_for_depth(&self) -> usize {
        self.max_for_depth
    }

    pub fn max_if_depth(&self) -> usize {
        self.max_if_depth
    }

    pub fn stack_size(&self) -> usize {
        self.stack_size
    }

    pub fn allowed_pins(&self) -> &[u8] {
        &self.allowed_pins
    }

    pub fn is_pin_allowed(&self, pin: u8) -> bool {
        self.allowed_pins.contains(&pin)
    }

    pub fn set_max_instructions(&mut self, limit: u32) -> Result<()> {
        check_range(limit as usize, 1_000, 1_000_000, "MAX INSTRUCTIONS")?;
        self.max_instructions = limit;
        Ok(())
    }

    pub fn set_max_string_length(&mut self, limit: usize) -> Result<()> {
        check_range(limit, 1, 4_096, "MAX STRING LENGTH")?;
        self.max_string_length = limit;
        Ok(())
    }

    pub fn set_max_variable_name_length(&mut self, limit: usize) -> Result<()> {
        check_range(limit, 1, 256, "MAX VARIABLE NAME LENGTH")?;
        self.max_variable_name_length = limit;
        Ok(())
    }

    pub fn set_max_expression_depth(&mut self, limit: usize) -> Result<()> {
        check_range(limit, 1, 256, "MAX EXPRESSION DEPTH")?;
        self.max_expression_depth = limit;
        Ok(())
    }

    pub fn set_max_for_depth(&mut self, limit: usize) -> Result<()> {
        check_range(limit, 1, 64, "MAX FOR DEPTH")?;
        self.max_for_depth = limit;
        Ok(())
    }

    pub fn set_max_if_depth(&mut self, limit: usize) -> Result<()> {
        check_range(limit, 1, 64, "MAX IF DEPTH")?;
        self.max_if_depth = limit;
        Ok(())
    }

    pub fn set_stack_size(&mut self, size: usize) -> Result<()> {
        check_range(size, 16, 2_048, "STACK SIZE")?;
        self.stack_size = size;
        Ok(())
    }

    pub fn set_allowed_pins(&mut self, pins: Vec<u8>) {
        self.allowed_pins = pins;
    }

    pub fn add_allowed_pin(&mut self, pin: u8) {
        if !self.allowed_pins.contains(&pin) {
            self.allowed_pins.push(pin);
        }
    }

    pub fn remove_allowed_pin(&mut self, pin: u8) {
        self.allowed_pins.retain(|p| *p != pin);
    }
}
