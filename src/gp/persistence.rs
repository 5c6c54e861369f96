//! Persistence for programs, genomes and search checkpoints.
//!
//! Everything is JSON. Atoms use their tagged form, so files are readable
//! and instruction names are checked against the catalog on load.

use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SerializationError;
use crate::gp::genome::Genome;
use crate::push::Program;

/// Current checkpoint format version.
pub const CHECKPOINT_VERSION: u32 = 1;

/// A genome with the error vector it scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredGenome {
    /// The genome.
    pub genome: Genome,
    /// Its errors; infinite entries are stored as `null`.
    #[serde(with = "nullable_errors")]
    pub error_vector: Vec<f64>,
}

/// Search state at the start of a generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Format version.
    pub version: u32,
    /// Generation about to be evaluated.
    pub generation: usize,
    /// Seed of the run that wrote the checkpoint.
    pub seed: u64,
    /// Genomes of the generation.
    pub population: Vec<Genome>,
    /// Best individual seen so far.
    pub best: Option<ScoredGenome>,
}

impl Checkpoint {
    /// Checkpoint in the current format.
    #[must_use]
    pub fn new(generation: usize, seed: u64, population: Vec<Genome>, best: Option<ScoredGenome>) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            generation,
            seed,
            population,
            best,
        }
    }
}

mod nullable_errors {
    use super::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(errors: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(errors.iter().map(|e| e.is_finite().then_some(*e)))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let raw = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(raw.into_iter().map(|e| e.unwrap_or(f64::INFINITY)).collect())
    }
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<(), SerializationError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(fs::File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SerializationError> {
    let reader = BufReader::new(fs::File::open(path)?);
    decode(&mut serde_json::Deserializer::from_reader(reader))
}

/// Decode JSON text of any nesting depth.
///
/// Deeply nested code exceeds `serde_json`'s default recursion limit, so the
/// limit is lifted and the native stack grows on demand instead.
///
/// # Errors
///
/// Returns an error if the text is malformed or names an unknown
/// instruction.
pub fn from_json<T: DeserializeOwned>(json: &str) -> Result<T, SerializationError> {
    decode(&mut serde_json::Deserializer::from_str(json))
}

fn decode<'de, T, R>(de: &mut serde_json::Deserializer<R>) -> Result<T, SerializationError>
where
    T: Deserialize<'de>,
    R: serde_json::de::Read<'de>,
{
    de.disable_recursion_limit();
    let value = T::deserialize(serde_stacker::Deserializer::new(&mut *de))?;
    de.end()?;
    Ok(value)
}

/// Save a checkpoint, creating parent directories.
///
/// # Errors
///
/// Returns an error if serialization or file I/O fails.
pub fn save_checkpoint(checkpoint: &Checkpoint, path: &Path) -> Result<(), SerializationError> {
    write_json(checkpoint, path)
}

/// Load a checkpoint.
///
/// # Errors
///
/// Returns an error if the file is unreadable, malformed, names an unknown
/// instruction or has an unsupported version.
pub fn load_checkpoint(path: &Path) -> Result<Checkpoint, SerializationError> {
    let checkpoint: Checkpoint = read_json(path)?;
    if checkpoint.version != CHECKPOINT_VERSION {
        return Err(SerializationError::UnsupportedVersion(checkpoint.version));
    }
    Ok(checkpoint)
}

/// Path of the checkpoint for `generation` inside `dir`.
#[must_use]
pub fn checkpoint_path(dir: &Path, generation: usize) -> PathBuf {
    dir.join(format!("gen_{generation:05}.json"))
}

/// The checkpoint with the highest generation in `dir`, if any.
///
/// # Errors
///
/// Returns an error if `dir` cannot be listed.
pub fn latest_checkpoint(dir: &Path) -> Result<Option<PathBuf>, SerializationError> {
    let mut latest: Option<(usize, PathBuf)> = None;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(generation) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix("gen_"))
            .and_then(|n| n.strip_suffix(".json"))
            .and_then(|n| n.parse::<usize>().ok())
        else {
            continue;
        };
        if latest.as_ref().is_none_or(|(g, _)| generation > *g) {
            latest = Some((generation, path));
        }
    }
    Ok(latest.map(|(_, path)| path))
}

/// Save a program with its signature.
///
/// # Errors
///
/// Returns an error if serialization or file I/O fails.
pub fn save_program(program: &Program, path: &Path) -> Result<(), SerializationError> {
    write_json(program, path)
}

/// Load a program.
///
/// # Errors
///
/// Returns an error if the file is unreadable, malformed or names an
/// unknown instruction.
pub fn load_program(path: &Path) -> Result<Program, SerializationError> {
    read_json(path)
}

/// Save a genome as an array of gene records.
///
/// # Errors
///
/// Returns an error if serialization or file I/O fails.
pub fn save_genome(genome: &Genome, path: &Path) -> Result<(), SerializationError> {
    write_json(genome, path)
}

/// Load a genome.
///
/// # Errors
///
/// Returns an error if the file is unreadable, malformed or names an
/// unknown instruction.
pub fn load_genome(path: &Path) -> Result<Genome, SerializationError> {
    read_json(path)
}
