use super::{Inst, StringTable};
use crate::lang::Error;

/// ## Compiled program
///
/// The `(bytecode, string table)` pair the compiler hands to the machine,
/// plus any diagnostics produced along the way. Recoverable compile errors
/// leave a runnable program; the diagnostics still deserve a report.
#[derive(Debug, Clone, Default)]
pub struct Program {
    code: Vec<Inst>,
    strings: Vec<String>,
    errors: Vec<Error>,
}

impl Program {
    pub fn new(code: Vec<Inst>, strings: StringTable, errors: Vec<Error>) -> Program {
        Program {
            code,
            strings: strings.into_entries(),
            errors,
        }
    }

    /// Wraps hand-crafted bytecode, e.g. for feeding the verifier directly.
    pub fn from_raw(code: Vec<Inst>, strings: Vec<String>) -> Program {
        Program {
            code,
            strings,
            errors: vec![],
        }
    }

    pub fn code(&self) -> &[Inst] {
        &self.code
    }

    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn into_parts(self) -> (Vec<Inst>, Vec<String>) {
        (self.code, self.strings)
    }
}
