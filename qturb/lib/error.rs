//! Collection of all error types.
//!
//! All errors derive [`thiserror::Error`], making them composable when allowed
//! and compatible with application code using [`anyhow`][anyhow].
//!
//! [anyhow]: https://crates.io/crates/anyhow

use std::path::PathBuf;
use ndarray_npy::{ ReadNpyError, ReadNpzError, WriteNpyError, WriteNpzError };
use thiserror::Error;

/// Returned when run parameters are invalid.
///
/// Always fatal, and always raised before the evolution loop is entered.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Grid sizes must be even powers of two.
    #[error("grid sizes must be powers of two greater than 1; got {0}")]
    BadGridSize(usize),

    /// Returned when a spacing, step size, or physical coefficient is
    /// non-positive or non-finite.
    #[error("{0} must be positive and finite; got {1}")]
    NotPositive(&'static str, f64),

    /// Returned when a step count or interval that must be non-zero is zero.
    #[error("{0} must be greater than 0")]
    Zero(&'static str),

    /// Vortices are imprinted in vortex-antivortex pairs.
    #[error("vortex count must be even; got {0}")]
    OddVortexCount(usize),

    /// Returned when the vortex-position generator cannot satisfy its
    /// minimum-separation constraint.
    #[error("could not place {count} vortices with separation {min_sep:.3e} after {attempts} attempts")]
    VortexPlacement { count: usize, min_sep: f64, attempts: usize },

    /// Returned when a parameter file cannot be read.
    #[error("unable to read parameter file {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    /// Returned when a parameter file cannot be parsed.
    #[error("unable to parse parameter file: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    pub(crate) fn check_grid_size(n: usize) -> Result<(), Self> {
        (n > 1 && n.is_power_of_two()).then_some(()).ok_or(Self::BadGridSize(n))
    }

    pub(crate) fn check_positive(name: &'static str, val: f64)
        -> Result<(), Self>
    {
        (val.is_finite() && val > 0.0).then_some(())
            .ok_or(Self::NotPositive(name, val))
    }

    pub(crate) fn check_nonzero(name: &'static str, val: u64)
        -> Result<(), Self>
    {
        (val != 0).then_some(()).ok_or(Self::Zero(name))
    }

    pub(crate) fn check_vortex_count(n: usize) -> Result<(), Self> {
        (n % 2 == 0).then_some(()).ok_or(Self::OddVortexCount(n))
    }
}

/// Returned when a continued run cannot recover its state from the checkpoint.
#[derive(Debug, Error)]
pub enum RestoreError {
    /// Returned when a continued run is requested but no checkpoint exists.
    #[error("no checkpoint found at {0}")]
    MissingCheckpoint(PathBuf),

    /// Returned when a checkpoint entry is absent or inconsistent with the
    /// configured grid.
    #[error("malformed checkpoint field '{field}': {reason}")]
    Malformed { field: &'static str, reason: String },

    /// Returned when the primary dataset of a continued run is missing.
    #[error("no primary dataset found at {0}")]
    MissingDataset(PathBuf),

    /// [`std::io::Error`]
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// [`ReadNpzError`]
    #[error("npz read error: {0}")]
    Npz(#[from] ReadNpzError),

    /// [`ReadNpyError`]
    #[error("npy read error: {0}")]
    Npy(#[from] ReadNpyError),
}

/// Underlying cause of a [`StorageError`].
#[derive(Debug, Error)]
pub enum WriteCause {
    /// [`std::io::Error`]
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// [`WriteNpyError`]
    #[error("npy write error: {0}")]
    Npy(#[from] WriteNpyError),

    /// [`WriteNpzError`]
    #[error("npz write error: {0}")]
    Npz(#[from] WriteNpzError),
}

/// Returned when a snapshot, checkpoint, or dataset write fails.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to write {path}: {cause}")]
    WriteFailure { path: PathBuf, #[source] cause: WriteCause },
}

impl StorageError {
    pub(crate) fn write<E>(path: impl Into<PathBuf>) -> impl FnOnce(E) -> Self
    where E: Into<WriteCause>
    {
        let path = path.into();
        move |err| Self::WriteFailure { path, cause: err.into() }
    }
}

/// Returned when the wavefunction picks up non-finite values.
#[derive(Debug, Error)]
pub enum NumericError {
    /// `last_checkpoint` is the step count stored in the last checkpoint
    /// written by this run, if any.
    #[error("non-finite wavefunction at step {step} (t = {time:.4}); last good checkpoint: {}", fmt_checkpoint(.last_checkpoint))]
    NonFinite { step: u64, time: f64, last_checkpoint: Option<u64> },
}

fn fmt_checkpoint(step: &Option<u64>) -> String {
    match step {
        Some(s) => format!("step {}", s),
        None => "none".to_string(),
    }
}

/// Returned from the time-evolution driver.
#[derive(Debug, Error)]
pub enum RunError {
    /// [`ConfigError`]
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// [`RestoreError`]
    #[error("restore error: {0}")]
    Restore(#[from] RestoreError),

    /// [`StorageError`]
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// [`NumericError`]
    #[error("numeric instability: {0}")]
    Numeric(#[from] NumericError),
}
