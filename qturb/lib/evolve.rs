//! Real-time evolution of the relaxed condensate.
//!
//! A [`Simulation`] owns the spectral wavefunction and moves through the phases
//! ```text
//! Initializing → Evolving ⇄ Snapshotting
//!                   ⇅
//!              Checkpointing → Terminated
//! ```
//! Every `nframe` steps the real-space wavefunction is appended to the
//! trajectory; every `checkpoint_every` steps the spectral wavefunction and the
//! loop counters overwrite the single-slot checkpoint, from which an
//! interrupted run can be continued.

use log::{ debug, error, info, log_enabled, Level };
use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    config::Params,
    error::{ NumericError, RunError },
    grid::Grid,
    imprint::PhaseImprinter,
    observables::{ atom_number_spectral, energy },
    propagate::{ Regime, SplitStep },
    relax::initial_state,
    storage::Archive,
    utils::{ all_finite, to_double, Fft2 },
};

pub type EResult<T> = Result<T, RunError>;

/// Current stage of a [`Simulation`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Initial state is ready but no step has been taken.
    Initializing,
    /// Advancing the wavefunction.
    Evolving,
    /// Writing a snapshot.
    Snapshotting,
    /// Writing the checkpoint.
    Checkpointing,
    /// The loop has finished, successfully or not.
    Terminated,
}

/// Everything needed to continue a run.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationState {
    /// Spectral wavefunction
    pub psi_k: nd::Array2<C64>,
    /// Elapsed simulated time
    pub time: f64,
    /// Index of the next snapshot
    pub index: u64,
    /// Number of completed real-time steps
    pub step: u64,
}

/// Progress callback, invoked before every step whose index is a multiple of
/// `nframe`.
pub trait Observer {
    fn observe(&mut self, step: u64, time: f64);
}

impl<F> Observer for F
where F: FnMut(u64, f64)
{
    fn observe(&mut self, step: u64, time: f64) { self(step, time) }
}

/// Observer that logs the elapsed time.
#[derive(Copy, Clone, Debug, Default)]
pub struct LogProgress;

impl Observer for LogProgress {
    fn observe(&mut self, _step: u64, time: f64) { info!("t = {:.4}", time); }
}

/// Driver for a single run.
#[derive(Debug)]
pub struct Simulation {
    params: Params,
    grid: Grid,
    fft: Fft2,
    archive: Archive,
    state: SimulationState,
    phase: Phase,
    last_checkpoint: Option<u64>,
}

impl Simulation {
    /// Set up a fresh run: build the relaxed initial state with `imprinter`
    /// and create the output dataset.
    pub fn fresh<I>(params: Params, imprinter: &mut I) -> EResult<Self>
    where I: PhaseImprinter + ?Sized
    {
        params.validate()?;
        let grid = Grid::from_params(&params.grid)?;
        let fft = Fft2::new(grid.nx, grid.ny);
        let relaxed = initial_state(&params, &grid, &fft, imprinter)?;
        let psi0 = fft.ifft2(&relaxed.psi_k);
        let archive = Archive::create(
            &params.output, &grid, &params.time, &psi0, relaxed.atom_number)?;
        let state = SimulationState {
            psi_k: relaxed.psi_k,
            time: 0.0,
            index: 0,
            step: 0,
        };
        Ok(Self {
            params, grid, fft, archive, state,
            phase: Phase::Initializing,
            last_checkpoint: None,
        })
    }

    /// Continue a run from its checkpoint. Snapshots written after the
    /// checkpoint are discarded so that the trajectory stays contiguous.
    pub fn resume(params: Params) -> EResult<Self> {
        params.validate()?;
        let grid = Grid::from_params(&params.grid)?;
        let fft = Fft2::new(grid.nx, grid.ny);
        let archive = Archive::open(&params.output)?;
        let checkpoint = archive.restore(&grid)?;
        let step = checkpoint.step;
        info!(
            "continuing from {} at step {} (t = {:.4}, k = {})",
            archive.backup.path().display(), step, checkpoint.time,
            checkpoint.index,
        );
        let state = SimulationState {
            psi_k: to_double(&checkpoint.psi_k),
            time: checkpoint.time,
            index: checkpoint.index,
            step,
        };
        Ok(Self {
            params, grid, fft, archive, state,
            phase: Phase::Initializing,
            last_checkpoint: Some(checkpoint.step),
        })
    }

    /// [`Self::fresh`] or [`Self::resume`], according to `params.fresh`.
    pub fn start<I>(params: Params, imprinter: &mut I) -> EResult<Self>
    where I: PhaseImprinter + ?Sized
    {
        if params.fresh {
            Self::fresh(params, imprinter)
        } else {
            Self::resume(params)
        }
    }

    pub fn phase(&self) -> Phase { self.phase }

    pub fn state(&self) -> &SimulationState { &self.state }

    pub fn params(&self) -> &Params { &self.params }

    pub fn grid(&self) -> &Grid { &self.grid }

    pub fn archive(&self) -> &Archive { &self.archive }

    /// Step count stored in the most recent checkpoint known to this run.
    pub fn last_checkpoint(&self) -> Option<u64> { self.last_checkpoint }

    fn check_finite(&self) -> Result<(), NumericError> {
        if all_finite(&self.state.psi_k) { return Ok(()); }
        error!(
            "non-finite wavefunction at step {} (t = {:.4})",
            self.state.step, self.state.time,
        );
        Err(NumericError::NonFinite {
            step: self.state.step,
            time: self.state.time,
            last_checkpoint: self.last_checkpoint,
        })
    }

    fn log_diagnostics(&self) {
        let c0 = self.params.condensate.c0;
        let e = energy(&self.state.psi_k, &self.grid, &self.fft, c0);
        debug!(
            "step {}: N = {:.6e}, E_kin = {:.6e}, E_int = {:.6e}",
            self.state.step,
            atom_number_spectral(&self.state.psi_k, &self.grid),
            e.kinetic,
            e.interaction,
        );
    }

    /// Run the remaining real-time steps, reporting progress to `observer`.
    ///
    /// The simulation is [`Phase::Terminated`] afterwards, whether or not an
    /// error occurred; calling this method again is a no-op.
    pub fn run<O>(&mut self, observer: &mut O) -> EResult<&SimulationState>
    where O: Observer + ?Sized
    {
        if self.phase == Phase::Terminated {
            return Ok(&self.state);
        }
        let res = self.evolve(observer);
        self.phase = Phase::Terminated;
        res?;
        info!(
            "finished {} steps (t = {:.4}); {} snapshots; N = {:.6e}",
            self.state.step,
            self.state.time,
            self.state.index,
            atom_number_spectral(&self.state.psi_k, &self.grid),
        );
        Ok(&self.state)
    }

    fn evolve<O>(&mut self, observer: &mut O) -> EResult<()>
    where O: Observer + ?Sized
    {
        let nt = self.params.time.nt;
        let dt = self.params.time.dt;
        let nframe = self.params.time.nframe;
        let every = self.params.time.checkpoint_every;
        let split = SplitStep::new(
            &self.grid, &self.fft, self.params.condensate.c0, dt);
        self.check_finite()?;
        self.phase = Phase::Evolving;
        debug!("evolving steps {}..{}", self.state.step, nt);
        while self.state.step < nt {
            if self.state.step % nframe == 0 {
                if log_enabled!(Level::Debug) { self.log_diagnostics(); }
                observer.observe(self.state.step, self.state.time);
            }
            split.step_spectral(&mut self.state.psi_k, Regime::Real);
            self.state.time += dt;
            self.state.step += 1;

            if self.state.step % nframe == 0 {
                self.phase = Phase::Snapshotting;
                self.check_finite()?;
                let psi = self.fft.ifft2(&self.state.psi_k);
                self.archive.snapshot(self.state.index, &psi)?;
                self.state.index += 1;
            }
            if self.state.step % every == 0 {
                self.phase = Phase::Checkpointing;
                self.check_finite()?;
                self.archive.checkpoint(
                    self.state.time,
                    &self.state.psi_k,
                    self.state.index,
                    self.state.step,
                )?;
                self.last_checkpoint = Some(self.state.step);
            }
            self.phase = Phase::Evolving;
        }
        self.check_finite()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{ fs, path::PathBuf };
    use assert_approx_eq::assert_approx_eq;
    use crate::imprint::PairImprinter;

    struct TempDir(PathBuf);

    impl TempDir {
        fn new(tag: &str) -> Self {
            let path = std::env::temp_dir()
                .join(format!("qturb-evolve-{}-{}", tag, std::process::id()));
            let _ = fs::remove_dir_all(&path);
            fs::create_dir_all(&path).unwrap();
            Self(path)
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) { let _ = fs::remove_dir_all(&self.0); }
    }

    fn small_params(dir: &TempDir) -> Params {
        let mut params = Params::default();
        params.grid.nx = 32;
        params.grid.ny = 32;
        params.condensate.n0 = 1.0;
        params.condensate.c0 = 0.05;
        params.condensate.n_vort = 2;
        params.time.nt = 20;
        params.time.dt = 0.01;
        params.time.nframe = 5;
        params.time.checkpoint_every = 10;
        params.time.relax_iters = 20;
        params.output.data_path = dir.0.join("run");
        params.output.backup_path = dir.0.join("backup.npz");
        params
    }

    #[test]
    fn phases_and_counters() {
        let dir = TempDir::new("phases");
        let params = small_params(&dir);
        let mut sim
            = Simulation::fresh(params, &mut PairImprinter::seeded(5)).unwrap();
        assert_eq!(sim.phase(), Phase::Initializing);
        let mut calls: Vec<u64> = Vec::new();
        let mut observer = |step: u64, _t: f64| { calls.push(step); };
        let state = sim.run(&mut observer).unwrap().clone();
        assert_eq!(calls, vec![0, 5, 10, 15]);
        assert_eq!(state.step, 20);
        assert_eq!(state.index, 4);
        assert_approx_eq!(state.time, 0.2, 1e-12);
        assert_eq!(sim.phase(), Phase::Terminated);
        assert_eq!(sim.last_checkpoint(), Some(20));
        assert_eq!(sim.archive().dataset.len(), 4);

        // a terminated simulation does not move
        sim.run(&mut LogProgress).unwrap();
        assert_eq!(sim.state().step, 20);
    }

    #[test]
    fn non_finite_state_aborts() {
        let dir = TempDir::new("nan");
        let params = small_params(&dir);
        let mut sim
            = Simulation::fresh(params, &mut PairImprinter::seeded(5)).unwrap();
        sim.state.psi_k[[3, 4]] = C64::new(f64::NAN, 0.0);
        let res = sim.run(&mut LogProgress);
        assert!(matches!(
            res,
            Err(RunError::Numeric(NumericError::NonFinite {
                step: 0, last_checkpoint: None, .. })),
        ));
        assert_eq!(sim.phase(), Phase::Terminated);
        assert!(sim.archive().dataset.is_empty());
    }

    #[test]
    fn resume_without_checkpoint_fails() {
        let dir = TempDir::new("nockpt");
        let mut params = small_params(&dir);
        Simulation::fresh(params.clone(), &mut PairImprinter::seeded(5)).unwrap();
        params.fresh = false;
        assert!(matches!(
            Simulation::resume(params),
            Err(RunError::Restore(crate::error::RestoreError::MissingCheckpoint(_))),
        ));
    }
}
