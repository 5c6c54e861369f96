//! CLI command for running a saved program.

use std::path::Path;

use pushgp::gp::{from_json, load_program};
use pushgp::{RunStatus, Value};

use crate::cli::CliError;

/// Execute the exec command.
pub(crate) fn execute(path: &Path, inputs: &str, trace: bool) -> Result<(), CliError> {
    let program = load_program(path)?;
    let inputs: Vec<Value> =
        from_json(inputs).map_err(|e| CliError::new(format!("invalid inputs: {e}")))?;
    if inputs.len() < program.signature.input_arity {
        return Err(CliError::new(format!(
            "program takes {} inputs, got {}",
            program.signature.input_arity,
            inputs.len()
        )));
    }

    let mut interpreter = program.interpreter();
    let outputs = program.apply_with(&mut interpreter, &inputs);
    if interpreter.status() != RunStatus::Normal {
        eprintln!("Run ended with {:?} after {} steps", interpreter.status(), interpreter.steps());
    }
    for (spec, output) in program.signature.outputs.iter().zip(&outputs) {
        match output {
            Some(value) => println!("{spec:?}: {value}"),
            None => println!("{spec:?}: <none>"),
        }
    }
    if trace {
        let state = serde_json::to_string_pretty(interpreter.state())
            .map_err(|e| CliError::new(e.to_string()))?;
        println!("{state}");
    }
    Ok(())
}
