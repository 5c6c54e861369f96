//! The Push virtual machine.
//!
//! Programs are trees of [`Atom`]s. Executing a program routes every value to
//! the stack matching its runtime type; instructions pop their arguments from
//! typed stacks and push results back. Control flow lives on the `exec`
//! stack, which is itself an ordinary value stack.
//!
//! # Example
//!
//! ```
//! use pushgp::push::{instructions, Atom, CodeBlock, OutputSpec, PushConfig, PushInterpreter, StackKind, Value};
//!
//! let add = instructions::lookup("int_add").unwrap();
//! let program = CodeBlock::new(vec![
//!     Atom::Literal(Value::Int(5)),
//!     Atom::Literal(Value::Int(5)),
//!     Atom::Instruction(add),
//! ]);
//!
//! let mut interpreter = PushInterpreter::new(PushConfig::default());
//! let outputs = interpreter.run(&program, &[], &[OutputSpec::Stack(StackKind::Int)]);
//! assert_eq!(outputs, vec![Some(Value::Int(10))]);
//! ```

mod atom;
mod config;
mod instruction;
pub mod instructions;
mod interpreter;
mod program;
mod stack;
mod state;
mod value;

pub use atom::{Atom, CodeBlock};
pub use config::PushConfig;
pub use instruction::{Instruction, Outputs};
pub use interpreter::{OutputSpec, PushInterpreter, RunStatus};
pub use program::{Program, ProgramSignature};
pub use stack::{Stack, StackLimits};
pub use state::State;
pub use value::{StackKind, Value};
