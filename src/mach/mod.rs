/*!
## Machine Module

The compiler back half and the virtual machine: bytecode encoding, string
interning, expression and line compilation, the verifier, and the stack VM
with its resource policy.

*/

pub type Address = usize;

mod compile;
mod ember;
mod expr;
mod host;
mod listing;
mod opcode;
mod policy;
mod program;
mod runtime;
mod stack;
mod strings;
mod val;
mod verify;

pub use compile::compile;
pub use ember::Ember;
pub use host::{Host, NullHost, StdHost};
pub use listing::{disassemble, dump_state};
pub use opcode::{bits_to_float, float_to_bits, Inst, Opcode};
pub use policy::Policy;
pub use program::Program;
pub use runtime::{Runtime, State};
pub use strings::{sanitize, StringTable};
pub use val::{Cmp, Val};
pub use verify::verify;

#[cfg(test)]
mod tests;
