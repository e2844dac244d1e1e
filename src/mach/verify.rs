use super::opcode::{Inst, Opcode};
use super::policy::{Policy, MAX_DELAY_MS, MAX_LOAD_STRINGS, MAX_PROGRAM_LEN};
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// ## Bytecode verifier
///
/// Runs once over a `(bytecode, strings)` pair before anything executes.
/// A program that fails any check is refused outright; the machine never
/// starts it. String entries are expected to be sanitized already.
pub fn verify(code: &[Inst], strings: &[String], policy: &Policy) -> Result<()> {
    if code.len() > MAX_PROGRAM_LEN {
        return Err(error!(ProgramTooLarge; "{} INSTRUCTIONS", code.len()));
    }
    if strings.len() > MAX_LOAD_STRINGS {
        return Err(error!(StringTableOverflow; "{} ENTRIES", strings.len()));
    }
    let mut has_halt = false;
    for (addr, inst) in code.iter().enumerate() {
        let op = match Opcode::try_from(inst.opcode) {
            Ok(op) => op,
            Err(()) => {
                return Err(error!(InvalidOpcode; "{} AT {}", inst.opcode, addr));
            }
        };
        match op {
            Opcode::Jump | Opcode::JumpIf => {
                if inst.arg1 as usize >= code.len() {
                    return Err(error!(InvalidJumpTarget; "{} AT {}", inst.arg1, addr));
                }
            }
            Opcode::Print | Opcode::Store | Opcode::Load | Opcode::PushString | Opcode::Input => {
                if inst.arg1 as usize >= strings.len() {
                    return Err(error!(InvalidStringIndex; "{} AT {}", inst.arg1, addr));
                }
            }
            Opcode::LedOn | Opcode::LedOff => {
                if inst.arg1 > 255 || !policy.is_pin_allowed(inst.arg1 as u8) {
                    return Err(error!(PinNotAllowed; "{} AT {}", inst.arg1, addr));
                }
            }
            Opcode::Delay => {
                if inst.arg1 > MAX_DELAY_MS {
                    return Err(error!(DelayTooLong; "{}MS AT {}", inst.arg1, addr));
                }
            }
            Opcode::Halt => has_halt = true,
            _ => {}
        }
    }
    if !has_halt && code.len() > 10 {
        return Err(error!(MissingHalt));
    }
    Ok(())
}
