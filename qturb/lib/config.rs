//! Run parameters.
//!
//! A single immutable [`Params`] value is built once (from defaults or from a
//! TOML file), validated, and then passed by reference to every component.

use std::{ fs, path::{ Path, PathBuf } };
use serde::{ Deserialize, Serialize };
use crate::error::ConfigError;

pub type CResult<T> = Result<T, ConfigError>;

/// Spatial discretization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridParams {
    /// Number of grid points along x
    pub nx: usize,
    /// Number of grid points along y
    pub ny: usize,
    /// Grid spacing along x
    pub dx: f64,
    /// Grid spacing along y
    pub dy: f64,
}

impl Default for GridParams {
    fn default() -> Self {
        Self { nx: 1024, ny: 1024, dx: 1.0, dy: 1.0 }
    }
}

/// Physical parameters of the condensate and of the initial vortex tangle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CondensateParams {
    /// Contact interaction coefficient
    pub c0: f64,
    /// Target background density
    pub n0: f64,
    /// Number of imprinted vortices (half of them antivortices)
    pub n_vort: usize,
}

impl Default for CondensateParams {
    fn default() -> Self {
        Self {
            c0: 3e-5,
            n0: 1.6e9 / 1024.0_f64.powi(2),
            n_vort: 1000,
        }
    }
}

fn def_checkpoint_every() -> u64 { 50_000 }
fn def_relax_iters() -> usize { 500 }

/// Time stepping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeParams {
    /// Number of real-time steps
    pub nt: u64,
    /// Time step, shared by the relaxation and real-time phases
    pub dt: f64,
    /// Save a snapshot every `nframe` steps
    pub nframe: u64,
    /// Overwrite the checkpoint every `checkpoint_every` steps
    #[serde(default = "def_checkpoint_every")]
    pub checkpoint_every: u64,
    /// Fixed number of imaginary-time relaxation iterations
    #[serde(default = "def_relax_iters")]
    pub relax_iters: usize,
}

impl Default for TimeParams {
    fn default() -> Self {
        Self {
            nt: 10_000_000,
            dt: 1e-2,
            nframe: 10_000,
            checkpoint_every: def_checkpoint_every(),
            relax_iters: def_relax_iters(),
        }
    }
}

fn def_backoff() -> u64 { 100 }

/// Output locations and write policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputParams {
    /// Directory holding the primary (trajectory) dataset
    pub data_path: PathBuf,
    /// Single-slot checkpoint file
    pub backup_path: PathBuf,
    /// Number of times a failed snapshot or checkpoint write is retried
    #[serde(default)]
    pub write_retries: u32,
    /// Base backoff between retries, in milliseconds
    #[serde(default = "def_backoff")]
    pub retry_backoff_ms: u64,
}

impl Default for OutputParams {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/scalar/scalar_imp"),
            backup_path: PathBuf::from("data/scalar/scalar_imp_backup.npz"),
            write_retries: 0,
            retry_backoff_ms: def_backoff(),
        }
    }
}

fn def_fresh() -> bool { true }

/// All parameters of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Params {
    /// `true` for a fresh run, `false` to continue from the checkpoint
    #[serde(default = "def_fresh")]
    pub fresh: bool,
    /// Seed for the vortex-position generator; drawn from entropy if absent
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub grid: GridParams,
    #[serde(default)]
    pub condensate: CondensateParams,
    #[serde(default)]
    pub time: TimeParams,
    #[serde(default)]
    pub output: OutputParams,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            fresh: def_fresh(),
            seed: None,
            grid: GridParams::default(),
            condensate: CondensateParams::default(),
            time: TimeParams::default(),
            output: OutputParams::default(),
        }
    }
}

impl Params {
    /// Parse parameters from a TOML string. Missing sections take their
    /// default values. The result is validated.
    pub fn from_toml_str(s: &str) -> CResult<Self> {
        let params: Self = toml::from_str(s)?;
        params.validate()?;
        Ok(params)
    }

    /// Read parameters from a TOML file. The result is validated.
    pub fn from_file<P>(path: P) -> CResult<Self>
    where P: AsRef<Path>
    {
        let path = path.as_ref();
        let s = fs::read_to_string(path)
            .map_err(|err| ConfigError::Read(path.to_path_buf(), err))?;
        Self::from_toml_str(&s)
    }

    /// Check every parameter that the numerical scheme depends on.
    pub fn validate(&self) -> CResult<()> {
        ConfigError::check_grid_size(self.grid.nx)?;
        ConfigError::check_grid_size(self.grid.ny)?;
        ConfigError::check_positive("dx", self.grid.dx)?;
        ConfigError::check_positive("dy", self.grid.dy)?;
        ConfigError::check_positive("c0", self.condensate.c0)?;
        ConfigError::check_positive("n0", self.condensate.n0)?;
        ConfigError::check_vortex_count(self.condensate.n_vort)?;
        ConfigError::check_positive("dt", self.time.dt)?;
        ConfigError::check_nonzero("nframe", self.time.nframe)?;
        ConfigError::check_nonzero(
            "checkpoint_every", self.time.checkpoint_every)?;
        Ok(())
    }

    /// Healing length ξ = 1 / √(2 n0 c0).
    pub fn healing_length(&self) -> f64 {
        (2.0 * self.condensate.n0 * self.condensate.c0).sqrt().recip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_production_run() {
        let p = Params::default();
        assert!(p.validate().is_ok());
        assert_eq!(p.grid.nx, 1024);
        assert_eq!(p.time.nt, 10_000_000);
        assert_eq!(p.time.nframe, 10_000);
        assert_eq!(p.time.checkpoint_every, 50_000);
        assert_eq!(p.time.relax_iters, 500);
        assert!(p.fresh);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let s = r#"
            fresh = false
            seed = 7

            [grid]
            nx = 64
            ny = 64
            dx = 1.0
            dy = 1.0

            [time]
            nt = 100
            dt = 0.01
            nframe = 10
        "#;
        let p = Params::from_toml_str(s).unwrap();
        assert!(!p.fresh);
        assert_eq!(p.seed, Some(7));
        assert_eq!(p.grid.nx, 64);
        assert_eq!(p.time.checkpoint_every, 50_000);
        assert_eq!(p.condensate, CondensateParams::default());
        assert_eq!(p.output.write_retries, 0);
    }

    #[test]
    fn rejects_odd_grid() {
        let mut p = Params::default();
        p.grid.nx = 63;
        assert!(matches!(p.validate(), Err(ConfigError::BadGridSize(63))));
    }

    #[test]
    fn rejects_zero_nframe_and_bad_dt() {
        let mut p = Params::default();
        p.time.nframe = 0;
        assert!(matches!(p.validate(), Err(ConfigError::Zero("nframe"))));
        let mut p = Params::default();
        p.time.dt = -0.01;
        assert!(matches!(p.validate(), Err(ConfigError::NotPositive("dt", _))));
    }

    #[test]
    fn rejects_odd_vortex_count() {
        let mut p = Params::default();
        p.condensate.n_vort = 3;
        assert!(matches!(p.validate(), Err(ConfigError::OddVortexCount(3))));
    }

    #[test]
    fn healing_length_value() {
        let mut p = Params::default();
        p.condensate.n0 = 1.0;
        p.condensate.c0 = 0.5;
        assert!((p.healing_length() - 1.0).abs() < 1e-12);
    }
}
