// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! pushgp: program synthesis by evolving programs for a typed multi-stack VM.
//!
//! The crate has two layers:
//! - a Push interpreter that routes every value to a stack keyed by its
//!   runtime type and runs programs under strict resource limits
//! - a generational search driver that evolves linear genomes, translates
//!   them to nested Push code, and scores them against fitness cases
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  Search Driver (GA / annealing)     │
//! ├─────────────────────────────────────┤
//! │ Selection │ Variation │ Simplifier  │
//! ├─────────────────────────────────────┤
//! │  Evaluator (cases → error vector)   │
//! ├─────────────────────────────────────┤
//! │  Genome → Code translation          │
//! ├─────────────────────────────────────┤
//! │  Push interpreter (typed stacks)    │
//! └─────────────────────────────────────┘
//! ```

pub mod error;
pub mod gp;
pub mod push;

pub use error::{ConfigError, SearchError, SerializationError};

// Re-export the core VM types at crate root for convenience
pub use push::{
    Atom, CodeBlock, Instruction, OutputSpec, Program, ProgramSignature, PushConfig,
    PushInterpreter, RunStatus, StackKind, State, Value,
};
