//! The interpreter loop.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::push::atom::{Atom, CodeBlock};
use crate::push::config::PushConfig;
use crate::push::state::State;
use crate::push::value::{StackKind, Value};

/// How a run ended. Every status other than `Normal` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Exec stack drained within every limit.
    Normal,
    /// `step_limit` atoms were executed.
    StepLimitExceeded,
    /// The state reached `state_size_limit`.
    StateSizeLimitExceeded,
    /// One step grew the state by more than `growth_limit`.
    GrowthLimitExceeded,
}

/// Where one program output is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSpec {
    /// Next unread item of a stack, from the top.
    Stack(StackKind),
    /// The whole stdout buffer as a string.
    Stdout,
}

/// Runs programs under a fixed [`PushConfig`].
///
/// The state is reused across runs and reset at the start of each.
#[derive(Debug, Clone)]
pub struct PushInterpreter {
    config: PushConfig,
    state: State,
    status: RunStatus,
    steps: usize,
}

impl PushInterpreter {
    /// New interpreter with an empty state.
    #[must_use]
    pub fn new(config: PushConfig) -> Self {
        Self {
            config,
            state: State::new(config),
            status: RunStatus::Normal,
            steps: 0,
        }
    }

    /// Limits in force.
    #[must_use]
    pub fn config(&self) -> &PushConfig {
        &self.config
    }

    /// State after the last run.
    #[must_use]
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Status of the last run.
    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Steps taken by the last run.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Run `program` on `inputs` and read `outputs` from the final state.
    ///
    /// Outputs that cannot be read (empty stack) are `None`. Limits stop
    /// the run early but outputs are still read.
    pub fn run(
        &mut self,
        program: &CodeBlock,
        inputs: &[Value],
        outputs: &[OutputSpec],
    ) -> Vec<Option<Value>> {
        self.execute(program, inputs);
        self.read_outputs(outputs)
    }

    /// Run `program` on `inputs`, returning the final status.
    pub fn execute(&mut self, program: &CodeBlock, inputs: &[Value]) -> RunStatus {
        self.state.reset();
        self.state.load_inputs(inputs.to_vec());
        self.steps = 0;
        self.status = if self.state.load_program(program) {
            self.run_loop()
        } else {
            RunStatus::StateSizeLimitExceeded
        };
        trace!(steps = self.steps, status = ?self.status, "run finished");
        self.status
    }

    fn run_loop(&mut self) -> RunStatus {
        loop {
            if self.state.stack(StackKind::Exec).is_empty() {
                return RunStatus::Normal;
            }
            if self.steps >= self.config.step_limit {
                return RunStatus::StepLimitExceeded;
            }
            let before = self.state.size();
            let Some(next) = self.state.stack_mut(StackKind::Exec).pop() else {
                return RunStatus::Normal;
            };
            self.step(next);
            self.steps += 1;

            let after = self.state.size();
            if after >= self.config.state_size_limit {
                return RunStatus::StateSizeLimitExceeded;
            }
            if after.saturating_sub(before) > self.config.growth_limit {
                return RunStatus::GrowthLimitExceeded;
            }
        }
    }

    fn step(&mut self, item: Value) {
        let atom = match item {
            Value::Code(atom) => *atom,
            // non-code values never reach exec; treat as literals
            other => Atom::Literal(other),
        };
        match atom {
            Atom::Literal(value) => {
                self.state.push(value);
            }
            Atom::Instruction(instr) => {
                instr.execute(&mut self.state);
            }
            Atom::Input(index) => {
                if let Some(value) = self.state.inputs().get(index).cloned() {
                    self.state.push(value);
                }
            }
            Atom::Block(block) => {
                // unfold only if the children fit
                let children = block.into_atoms();
                if children.len() <= self.state.remaining_capacity() {
                    let exec = self.state.stack_mut(StackKind::Exec);
                    for child in children.into_iter().rev() {
                        exec.push(Value::code(child));
                    }
                }
            }
        }
    }

    /// Read outputs from the current state.
    #[must_use]
    pub fn read_outputs(&self, outputs: &[OutputSpec]) -> Vec<Option<Value>> {
        let kinds: Vec<StackKind> = outputs
            .iter()
            .filter_map(|spec| match spec {
                OutputSpec::Stack(kind) => Some(*kind),
                OutputSpec::Stdout => None,
            })
            .collect();
        let mut observed = self.state.observe(&kinds).into_iter();
        outputs
            .iter()
            .map(|spec| match spec {
                OutputSpec::Stack(_) => observed.next().flatten(),
                OutputSpec::Stdout => Some(Value::Str(self.state.stdout().to_string())),
            })
            .collect()
    }
}
