//! Interpreter state: one stack per kind, the input register and stdout.

use serde::{Deserialize, Serialize};

use crate::push::atom::{Atom, CodeBlock};
use crate::push::config::PushConfig;
use crate::push::stack::Stack;
use crate::push::value::{StackKind, Value};

/// Complete machine state for one run.
///
/// Size is the sum of all stack depths plus the byte length of stdout and is
/// kept at or below `state_size_limit` by [`State::push_many`],
/// [`State::print`] and the interpreter loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    stacks: Vec<Stack>,
    inputs: Vec<Value>,
    stdout: String,
    config: PushConfig,
}

impl State {
    /// Empty state with one stack per kind.
    #[must_use]
    pub fn new(config: PushConfig) -> Self {
        let limits = config.stack_limits();
        Self {
            stacks: StackKind::ALL
                .iter()
                .map(|&kind| Stack::new(kind, limits))
                .collect(),
            inputs: Vec::new(),
            stdout: String::new(),
            config,
        }
    }

    /// Limits this state was created with.
    #[must_use]
    pub fn config(&self) -> &PushConfig {
        &self.config
    }

    /// Clear every stack, the inputs and stdout.
    pub fn reset(&mut self) {
        for stack in &mut self.stacks {
            stack.flush();
        }
        self.inputs.clear();
        self.stdout.clear();
    }

    /// The stack for `kind`.
    #[must_use]
    pub fn stack(&self, kind: StackKind) -> &Stack {
        &self.stacks[kind.index()]
    }

    /// Mutable access to the stack for `kind`.
    pub fn stack_mut(&mut self, kind: StackKind) -> &mut Stack {
        &mut self.stacks[kind.index()]
    }

    /// Depth of the stack for `kind`.
    #[must_use]
    pub fn depth(&self, kind: StackKind) -> usize {
        self.stack(kind).depth()
    }

    /// Total state size.
    #[must_use]
    pub fn size(&self) -> usize {
        self.stacks.iter().map(Stack::depth).sum::<usize>() + self.stdout.len()
    }

    /// How many more items fit before the state size limit.
    #[must_use]
    pub fn remaining_capacity(&self) -> usize {
        self.config.state_size_limit.saturating_sub(self.size())
    }

    /// Whether every stack and stdout are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    // ==================== Inputs ====================

    /// Replace the input register.
    pub fn load_inputs(&mut self, inputs: Vec<Value>) {
        self.inputs = inputs;
    }

    /// The input register.
    #[must_use]
    pub fn inputs(&self) -> &[Value] {
        &self.inputs
    }

    /// Push a program onto the exec stack so its first atom runs first.
    ///
    /// Returns `false` if the children do not fit in the state.
    pub fn load_program(&mut self, program: &CodeBlock) -> bool {
        if program.len() > self.remaining_capacity() {
            return false;
        }
        let exec = self.stack_mut(StackKind::Exec);
        for atom in program.atoms().iter().rev() {
            exec.push(Value::code(atom.clone()));
        }
        true
    }

    // ==================== Multi-stack access ====================

    /// Pop one value per entry of `kinds`.
    ///
    /// Repeated kinds pop successive items, so for `[Int, Int]` the result
    /// is `[top, second]`. Returns `None` and leaves the state untouched if
    /// any stack is too shallow.
    pub fn pop_many(&mut self, kinds: &[StackKind]) -> Option<Vec<Value>> {
        let mut needed = [0usize; StackKind::COUNT];
        for kind in kinds {
            needed[kind.index()] += 1;
        }
        if StackKind::ALL
            .iter()
            .any(|kind| self.depth(*kind) < needed[kind.index()])
        {
            return None;
        }
        let mut values = Vec::with_capacity(kinds.len());
        for &kind in kinds {
            values.push(self.stack_mut(kind).pop()?);
        }
        Some(values)
    }

    /// Undo a successful [`State::pop_many`].
    pub fn restore(&mut self, kinds: &[StackKind], values: Vec<Value>) {
        for (kind, value) in kinds.iter().zip(values).rev() {
            self.stack_mut(*kind).push(value);
        }
    }

    /// Push `values[i]` onto `kinds[i]`, in order.
    ///
    /// All or nothing: if the values would overflow the state size limit,
    /// a value is rejected by its stack, or the lengths differ, nothing is
    /// pushed and `false` is returned.
    pub fn push_many(&mut self, values: Vec<Value>, kinds: &[StackKind]) -> bool {
        if values.len() != kinds.len() || values.len() > self.remaining_capacity() {
            return false;
        }
        let limits = self.config.stack_limits();
        let mut limited = Vec::with_capacity(values.len());
        for (value, kind) in values.into_iter().zip(kinds) {
            if !kind.accepts(&value) {
                return false;
            }
            match value.limited(&limits) {
                Some(value) => limited.push(value),
                None => return false,
            }
        }
        for (value, kind) in limited.into_iter().zip(kinds) {
            self.stack_mut(*kind).push(value);
        }
        true
    }

    /// Push a value onto the stack matching its type, respecting capacity.
    pub fn push(&mut self, value: Value) -> bool {
        let kind = value.kind();
        self.push_many(vec![value], &[kind])
    }

    /// Push a code value onto the exec stack.
    pub fn push_exec(&mut self, atom: Atom) -> bool {
        self.push_many(vec![Value::code(atom)], &[StackKind::Exec])
    }

    /// Peek at values without popping.
    ///
    /// Each entry of `kinds` reads the next item down its stack, so
    /// `[Int, Int]` observes `[top, second]`. Missing items are `None`.
    #[must_use]
    pub fn observe(&self, kinds: &[StackKind]) -> Vec<Option<Value>> {
        let mut cursor = [0usize; StackKind::COUNT];
        kinds
            .iter()
            .map(|kind| {
                let depth = &mut cursor[kind.index()];
                let value = self.stack(*kind).nth(*depth).cloned();
                *depth += 1;
                value
            })
            .collect()
    }

    // ==================== Stdout ====================

    /// Text printed so far.
    #[must_use]
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    /// Append to stdout, truncating at the state size limit.
    ///
    /// Returns `false` if nothing could be appended.
    pub fn print(&mut self, text: &str) -> bool {
        let room = self.remaining_capacity();
        if text.len() <= room {
            self.stdout.push_str(text);
            return true;
        }
        let mut end = room;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        self.stdout.push_str(&text[..end]);
        end > 0
    }

    pub(crate) fn truncate_stdout(&mut self, len: usize) {
        self.stdout.truncate(len);
    }

    pub(crate) fn replace_stacks(&mut self, snapshot: Vec<Stack>) {
        for stack in snapshot {
            let index = stack.kind().index();
            self.stacks[index] = stack;
        }
    }
}
