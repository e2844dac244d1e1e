//! # Ember
//!
//! A tiny sandboxed scripting language for microcontroller-class targets.
//!
//! Source text is compiled one line at a time into compact bytecode plus an
//! interned string table, then executed on a stack virtual machine with
//! strict resource budgets. The VM talks to the outside world only through
//! the [`mach::Host`] trait, so the same program runs against a serial
//! console, a test capture buffer, or nothing at all.
//!
//! ```
//! use ember::Ember;
//! use ember::mach::NullHost;
//!
//! let mut host = NullHost::default();
//! let mut ember = Ember::new();
//! ember.compile("print \"hello\"\nhalt\n", &mut host);
//! ember.run(&mut host);
//! ```

#[macro_use]
pub mod lang;
pub mod mach;

pub use mach::Ember;
