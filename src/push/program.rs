//! Programs bundled with their calling convention.

use serde::{Deserialize, Serialize};

use crate::push::atom::CodeBlock;
use crate::push::config::PushConfig;
use crate::push::interpreter::{OutputSpec, PushInterpreter};
use crate::push::value::Value;

/// Calling convention shared by every program of a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramSignature {
    /// Number of input registers a program may reference.
    pub input_arity: usize,
    /// Outputs read after each run, in order.
    pub outputs: Vec<OutputSpec>,
    /// Interpreter limits.
    #[serde(default)]
    pub push_config: PushConfig,
}

impl ProgramSignature {
    /// Signature with default limits.
    #[must_use]
    pub fn new(input_arity: usize, outputs: Vec<OutputSpec>) -> Self {
        Self {
            input_arity,
            outputs,
            push_config: PushConfig::default(),
        }
    }

    /// Replace the interpreter limits.
    #[must_use]
    pub fn with_config(mut self, push_config: PushConfig) -> Self {
        self.push_config = push_config;
        self
    }
}

/// Code plus the signature it was evolved for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Calling convention.
    pub signature: ProgramSignature,
    /// Program body.
    pub code: CodeBlock,
}

impl Program {
    /// Bundle code with a signature.
    #[must_use]
    pub fn new(signature: ProgramSignature, code: CodeBlock) -> Self {
        Self { signature, code }
    }

    /// A fresh interpreter configured for this program.
    #[must_use]
    pub fn interpreter(&self) -> PushInterpreter {
        PushInterpreter::new(self.signature.push_config)
    }

    /// Run on `inputs` and return the declared outputs.
    #[must_use]
    pub fn apply(&self, inputs: &[Value]) -> Vec<Option<Value>> {
        self.apply_with(&mut self.interpreter(), inputs)
    }

    /// Like [`Program::apply`], reusing an interpreter across calls.
    pub fn apply_with(&self, interpreter: &mut PushInterpreter, inputs: &[Value]) -> Vec<Option<Value>> {
        interpreter.run(&self.code, inputs, &self.signature.outputs)
    }
}
