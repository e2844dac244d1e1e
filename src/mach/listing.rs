use super::opcode::{bits_to_float, Inst, Opcode};
use super::runtime::Runtime;
use super::val::Val;
use std::fmt::Write;

/// ## Listing
///
/// Textual disassembly and machine state dumps, used by tests and the
/// runner's `--listing`/`--dump` flags.

/// Renders a `(bytecode, strings)` pair, one numbered instruction per
/// line. String operands appear quoted; out-of-range operands are
/// flagged rather than hidden.
pub fn disassemble(code: &[Inst], strings: &[String]) -> String {
    let mut out = String::new();
    for (addr, inst) in code.iter().enumerate() {
        let _ = write!(out, "{}: ", addr);
        match Opcode::try_from(inst.opcode) {
            Ok(op) => disassemble_inst(&mut out, op, *inst, strings),
            Err(()) => {
                let _ = write!(out, "UNKNOWN {}", inst.opcode);
            }
        }
        out.push('\n');
    }
    out
}

fn disassemble_inst(out: &mut String, op: Opcode, inst: Inst, strings: &[String]) {
    use Opcode::*;
    let _ = match op {
        Print | PushString => match strings.get(inst.arg1 as usize) {
            Some(s) => write!(out, "{} \"{}\"", op, s),
            None => write!(out, "{} <invalid {}>", op, inst.arg1),
        },
        Store | Load | Input => match strings.get(inst.arg1 as usize) {
            Some(s) => write!(out, "{} {}", op, s),
            None => write!(out, "{} <invalid {}>", op, inst.arg1),
        },
        PushInt => write!(out, "{} {}", op, inst.arg1 as i32),
        PushFloat => write!(out, "{} {:.4}", op, bits_to_float(inst.arg1)),
        LedOn | LedOff => write!(out, "{} pin={}", op, inst.arg1),
        Delay => write!(out, "{} {}ms", op, inst.arg1),
        Jump | JumpIf => write!(out, "{} {}", op, inst.arg1),
        _ => write!(out, "{}", op),
    };
}

/// Snapshot of the machine: counters, the top of the stack, and the
/// variable bindings in name order.
pub fn dump_state(runtime: &Runtime) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== VM State ===");
    let _ = writeln!(out, "State: {:?}", runtime.state());
    let _ = writeln!(out, "Program Counter: {}", runtime.pc());
    let _ = writeln!(out, "Stack Pointer: {}", runtime.sp());
    let _ = writeln!(out, "Instructions: {}", runtime.instruction_count());
    let _ = writeln!(out, "Stack: [");
    for (slot, val) in runtime.stack_items().iter().enumerate().take(10) {
        let _ = writeln!(out, "  {}: {}", slot, dump_val(runtime, val));
    }
    if runtime.sp() > 10 {
        let _ = writeln!(out, "  ...");
    }
    let _ = writeln!(out, "]");
    let _ = writeln!(out, "Variables: {{");
    let mut names: Vec<&String> = runtime.variables().keys().collect();
    names.sort();
    for name in names {
        let val = &runtime.variables()[name];
        let _ = writeln!(out, "  {}: {}", name, dump_val(runtime, val));
    }
    let _ = writeln!(out, "}}");
    out
}

fn dump_val(runtime: &Runtime, val: &Val) -> String {
    match val {
        Val::Int(n) => format!("INT {}", n),
        Val::Float(n) => format!("FLOAT {:.4}", n),
        Val::Str(idx) => format!(
            "STRING \"{}\"",
            runtime.string_table().get(*idx).unwrap_or("<invalid>")
        ),
    }
}
