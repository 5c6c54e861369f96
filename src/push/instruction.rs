//! Instruction definitions and the dispatch wrapper.
//!
//! Every instruction is a total function over [`State`]: when arguments are
//! missing, a precondition fails, the result does not fit, or the body
//! panics, the state is left exactly as it was.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::warn;

use crate::push::stack::Stack;
use crate::push::state::State;
use crate::push::value::{StackKind, Value};

type SimpleFn = dyn Fn(&[Value]) -> Option<Vec<Value>> + Send + Sync;
type TakesStateFn = dyn Fn(&State, &[Value]) -> Option<Vec<Value>> + Send + Sync;
type StateFn = dyn Fn(&mut State) -> bool + Send + Sync;

/// Where an instruction's results go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outputs {
    /// Exactly one result per listed stack, pushed in order.
    Fixed(Vec<StackKind>),
    /// Any number of results, all onto one stack, pushed in order.
    Many(StackKind),
}

impl Outputs {
    fn kinds(&self, produced: usize) -> Option<Vec<StackKind>> {
        match self {
            Outputs::Fixed(kinds) if kinds.len() == produced => Some(kinds.clone()),
            Outputs::Fixed(_) => None,
            Outputs::Many(kind) => Some(vec![*kind; produced]),
        }
    }

    fn stacks(&self) -> Vec<StackKind> {
        match self {
            Outputs::Fixed(kinds) => kinds.clone(),
            Outputs::Many(kind) => vec![*kind],
        }
    }
}

enum Op {
    /// Pops `inputs`, computes results from the popped values only.
    Simple {
        inputs: Vec<StackKind>,
        outputs: Outputs,
        f: Box<SimpleFn>,
    },
    /// Like `Simple` but may read the rest of the state.
    TakesState {
        inputs: Vec<StackKind>,
        outputs: Outputs,
        f: Box<TakesStateFn>,
    },
    /// Mutates the state directly. Must return `false` without mutating
    /// when it cannot run.
    StateToState { f: Box<StateFn> },
}

/// A named operation over the state.
pub struct Instruction {
    name: String,
    stacks: Vec<StackKind>,
    code_blocks: u8,
    docstring: String,
    op: Op,
}

impl Instruction {
    /// Instruction computed from its popped arguments alone.
    ///
    /// `f` receives arguments in `inputs` order, where repeated kinds yield
    /// successive items from the top.
    pub fn simple<F>(name: impl Into<String>, inputs: Vec<StackKind>, outputs: Outputs, f: F) -> Self
    where
        F: Fn(&[Value]) -> Option<Vec<Value>> + Send + Sync + 'static,
    {
        let stacks = merge_stacks(&inputs, &outputs.stacks());
        Self {
            name: name.into(),
            stacks,
            code_blocks: 0,
            docstring: String::new(),
            op: Op::Simple {
                inputs,
                outputs,
                f: Box::new(f),
            },
        }
    }

    /// Instruction that also reads the state after its arguments are popped.
    pub fn takes_state<F>(
        name: impl Into<String>,
        inputs: Vec<StackKind>,
        outputs: Outputs,
        f: F,
    ) -> Self
    where
        F: Fn(&State, &[Value]) -> Option<Vec<Value>> + Send + Sync + 'static,
    {
        let stacks = merge_stacks(&inputs, &outputs.stacks());
        Self {
            name: name.into(),
            stacks,
            code_blocks: 0,
            docstring: String::new(),
            op: Op::TakesState {
                inputs,
                outputs,
                f: Box::new(f),
            },
        }
    }

    /// Instruction that mutates the state directly.
    ///
    /// `stacks` must list every stack `f` may touch; they are snapshotted
    /// so a panic inside `f` can be rolled back.
    pub fn state_to_state<F>(name: impl Into<String>, stacks: Vec<StackKind>, f: F) -> Self
    where
        F: Fn(&mut State) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            stacks: merge_stacks(&stacks, &[]),
            code_blocks: 0,
            docstring: String::new(),
            op: Op::StateToState { f: Box::new(f) },
        }
    }

    /// Set how many blocks open after this instruction in translation.
    #[must_use]
    pub fn with_code_blocks(mut self, code_blocks: u8) -> Self {
        self.code_blocks = code_blocks;
        self
    }

    /// Attach a human-readable description.
    #[must_use]
    pub fn with_doc(mut self, docstring: impl Into<String>) -> Self {
        self.docstring = docstring.into();
        self
    }

    /// Stable catalog name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stacks read or written.
    #[must_use]
    pub fn stacks(&self) -> &[StackKind] {
        &self.stacks
    }

    /// Blocks opened after this instruction in translation.
    #[must_use]
    pub fn code_blocks(&self) -> u8 {
        self.code_blocks
    }

    /// Human-readable description.
    #[must_use]
    pub fn docstring(&self) -> &str {
        &self.docstring
    }

    /// Run the instruction. Returns whether the state changed.
    pub fn execute(&self, state: &mut State) -> bool {
        match &self.op {
            Op::Simple { inputs, outputs, f } => {
                let Some(args) = state.pop_many(inputs) else {
                    return false;
                };
                let result = catch_unwind(AssertUnwindSafe(|| f(&args)));
                self.finish(state, inputs, args, outputs, result)
            }
            Op::TakesState { inputs, outputs, f } => {
                let Some(args) = state.pop_many(inputs) else {
                    return false;
                };
                let view: &State = state;
                let result = catch_unwind(AssertUnwindSafe(|| f(view, &args)));
                self.finish(state, inputs, args, outputs, result)
            }
            Op::StateToState { f } => {
                let snapshot: Vec<Stack> = self
                    .stacks
                    .iter()
                    .map(|kind| state.stack(*kind).clone())
                    .collect();
                let stdout_len = state.stdout().len();
                match catch_unwind(AssertUnwindSafe(|| f(state))) {
                    Ok(changed) => changed,
                    Err(_) => {
                        warn!(instruction = %self.name, "instruction panicked; reverting");
                        state.replace_stacks(snapshot);
                        state.truncate_stdout(stdout_len);
                        false
                    }
                }
            }
        }
    }

    fn finish(
        &self,
        state: &mut State,
        inputs: &[StackKind],
        args: Vec<Value>,
        outputs: &Outputs,
        result: std::thread::Result<Option<Vec<Value>>>,
    ) -> bool {
        let values = match result {
            Ok(Some(values)) => values,
            Ok(None) => {
                state.restore(inputs, args);
                return false;
            }
            Err(_) => {
                warn!(instruction = %self.name, "instruction panicked; reverting");
                state.restore(inputs, args);
                return false;
            }
        };
        let pushed = match outputs.kinds(values.len()) {
            Some(kinds) => state.push_many(values, &kinds),
            None => false,
        };
        if !pushed {
            state.restore(inputs, args);
        }
        pushed
    }
}

fn merge_stacks(a: &[StackKind], b: &[StackKind]) -> Vec<StackKind> {
    let mut stacks: Vec<StackKind> = a.iter().chain(b).copied().collect();
    stacks.sort_unstable();
    stacks.dedup();
    stacks
}

impl PartialEq for Instruction {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instruction")
            .field("name", &self.name)
            .field("stacks", &self.stacks)
            .field("code_blocks", &self.code_blocks)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
