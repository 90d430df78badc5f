//! Construction of the initial state.
//!
//! A uniform condensate of density `n0` is given the phase of an imprinted
//! vortex tangle and then relaxed in imaginary time. After every split step
//! the atom number is restored and the phase is pinned back to the imprint,
//! so only the density relaxes: vortex cores fill in at the healing length
//! while the vortex positions stay put.

use log::{ debug, info, log_enabled, Level };
use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    Arr2,
    config::Params,
    error::ConfigError,
    grid::Grid,
    imprint::PhaseImprinter,
    observables::{ atom_number, atom_number_spectral },
    propagate::{ Regime, SplitStep },
    utils::Fft2,
    wavefunction::Wavefunction,
};

pub type RResult<T> = Result<T, ConfigError>;

/// Minimum vortex separation in units of the healing length.
pub const SEPARATION_XI: f64 = 5.0;

/// Output of the initializer.
#[derive(Clone, Debug)]
pub struct RelaxedState {
    /// Relaxed spectral wavefunction
    pub psi_k: nd::Array2<C64>,
    /// Atom number fixed by the imprinted state
    pub atom_number: f64,
}

/// Rescale the amplitude of `wf` so that its atom number equals `target`.
///
/// Returns a spectral wavefunction.
pub fn renormalize(wf: Wavefunction, target: f64, grid: &Grid, fft: &Fft2)
    -> Wavefunction
{
    let mut psi = wf.into_real(fft);
    let current = atom_number(&psi, grid);
    let scale = (target / current).sqrt();
    psi.mapv_inplace(|q| q * scale);
    Wavefunction::Real(psi).to_spectral(fft)
}

/// Replace the phase of `wf` by `theta_fix` while keeping its amplitude:
/// `ψ ← ψ exp(i θ_fix - i arg ψ)`.
///
/// Returns a spectral wavefunction.
pub fn phase_lock<S>(wf: Wavefunction, theta_fix: &Arr2<S>, fft: &Fft2)
    -> Wavefunction
where S: nd::Data<Elem = f64>
{
    let mut psi = wf.into_real(fft);
    nd::Zip::from(&mut psi).and(theta_fix)
        .for_each(|q, th| {
            let correction = C64::cis(th - q.arg());
            *q *= correction;
        });
    Wavefunction::Real(psi).to_spectral(fft)
}

/// Run `iters` iterations of phase-locked imaginary-time relaxation, keeping
/// the atom number at `target`.
pub fn relax<S>(
    wf: Wavefunction,
    theta_fix: &Arr2<S>,
    target: f64,
    iters: usize,
    split: &SplitStep,
) -> Wavefunction
where S: nd::Data<Elem = f64>
{
    let mut wf = wf.to_spectral(split.fft);
    for it in 0..iters {
        wf = split.step(wf, Regime::Imaginary);
        if it + 1 == iters && log_enabled!(Level::Debug) {
            let n = atom_number_spectral(wf.array(), split.grid);
            debug!(
                "atom number drift over last step {:.3e}", (n - target) / target);
        }
        wf = renormalize(wf, target, split.grid, split.fft);
        wf = phase_lock(wf, theta_fix, split.fft);
    }
    wf
}

/// Build the relaxed initial state for a fresh run.
///
/// Imprints `n_vort` vortices separated by at least 5ξ, constructs
/// `ψ = √n0 exp(iθ)` and relaxes it for `relax_iters` iterations.
pub fn initial_state<I>(
    params: &Params,
    grid: &Grid,
    fft: &Fft2,
    imprinter: &mut I,
) -> RResult<RelaxedState>
where I: PhaseImprinter + ?Sized
{
    let n0 = params.condensate.n0;
    let c0 = params.condensate.c0;
    let n_vort = params.condensate.n_vort;
    let xi = params.healing_length();
    info!("imprinting {} vortices; healing length {:.4e}", n_vort, xi);

    let positions = imprinter.generate_positions(
        n_vort, SEPARATION_XI * xi, grid.len_x(), grid.len_y())?;
    let theta = imprinter.compute_phase(n_vort, &positions, grid);

    let psi: nd::Array2<C64> = theta.mapv(|th| n0.sqrt() * C64::cis(th));
    let target = atom_number(&psi, grid);
    let theta_fix: nd::Array2<f64> = psi.mapv(|q| q.arg());

    let split = SplitStep::new(grid, fft, c0, params.time.dt);
    let wf = relax(
        Wavefunction::Real(psi),
        &theta_fix,
        target,
        params.time.relax_iters,
        &split,
    );
    let psi_k = wf.into_spectral(fft);
    info!(
        "relaxation finished after {} iterations; N = {:.6e}",
        params.time.relax_iters, target,
    );
    Ok(RelaxedState { psi_k, atom_number: target })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;
    use assert_approx_eq::assert_approx_eq;
    use crate::imprint::PairImprinter;

    fn bumpy(grid: &Grid) -> nd::Array2<C64> {
        nd::Array2::from_shape_fn(grid.shape(), |(i, j)| {
            let a = 1.0 + 0.5 * (TAU * i as f64 / grid.nx as f64).sin();
            a * C64::cis(TAU * j as f64 / grid.ny as f64 + 0.2 * i as f64)
        })
    }

    #[test]
    fn renormalize_restores_atom_number() {
        let grid = Grid::new(16, 16, 0.5, 0.5).unwrap();
        let fft = Fft2::new(16, 16);
        let split = SplitStep::new(&grid, &fft, 0.2, 0.05);
        let target = 12.5;
        let mut wf = Wavefunction::Real(bumpy(&grid));
        for _ in 0..5 {
            wf = split.step(wf, Regime::Imaginary);
            wf = renormalize(wf, target, &grid, &fft);
            assert!(wf.is_spectral());
            assert_approx_eq!(
                atom_number(&wf.real_copy(&fft), &grid), target, 1e-10);
        }
    }

    #[test]
    fn phase_lock_pins_phase_and_keeps_amplitude() {
        let grid = Grid::new(16, 8, 1.0, 1.0).unwrap();
        let fft = Fft2::new(16, 8);
        let psi = bumpy(&grid);
        let theta = nd::Array2::from_shape_fn(
            (16, 8), |(i, j)| 0.1 * i as f64 - 0.2 * j as f64);
        let locked = phase_lock(Wavefunction::Real(psi.clone()), &theta, &fft)
            .into_real(&fft);
        nd::Zip::from(&locked).and(&psi).and(&theta)
            .for_each(|l, p, th| {
                assert_approx_eq!(l.norm(), p.norm(), 1e-12);
                assert_approx_eq!((l * C64::cis(-th)).arg(), 0.0, 1e-10);
            });
    }

    #[test]
    fn phase_lock_is_idempotent() {
        let grid = Grid::new(16, 16, 1.0, 1.0).unwrap();
        let fft = Fft2::new(16, 16);
        let theta = nd::Array2::from_shape_fn(
            (16, 16), |(i, j)| ((i * j) as f64).sin());
        let once = phase_lock(Wavefunction::Real(bumpy(&grid)), &theta, &fft);
        let twice = phase_lock(once.clone(), &theta, &fft);
        once.array().iter().zip(twice.array())
            .for_each(|(a, b)| { assert!((a - b).norm() < 1e-10); });
    }

    #[test]
    fn relaxation_keeps_number_and_phase() {
        let mut params = Params::default();
        params.grid.nx = 32;
        params.grid.ny = 32;
        params.condensate.n0 = 1.0;
        params.condensate.c0 = 0.05;
        params.condensate.n_vort = 2;
        params.time.dt = 0.05;
        params.time.relax_iters = 100;
        let grid = Grid::from_params(&params.grid).unwrap();
        let fft = Fft2::new(32, 32);
        let mut imp = PairImprinter::seeded(11);
        let state = initial_state(&params, &grid, &fft, &mut imp).unwrap();
        assert_approx_eq!(state.atom_number, 1024.0, 1e-9);
        let psi = fft.ifft2(&state.psi_k);
        assert_approx_eq!(atom_number(&psi, &grid), 1024.0, 1e-8);
        // vortex cores are depleted
        let dens: Vec<f64> = psi.iter().map(|q| q.norm_sqr()).collect();
        let min = dens.iter().cloned().fold(f64::INFINITY, f64::min);
        assert!(min < 0.5);
        assert!(dens.iter().all(|d| d.is_finite()));
    }

    #[test]
    fn placement_failure_propagates() {
        let mut params = Params::default();
        params.grid.nx = 16;
        params.grid.ny = 16;
        params.condensate.n0 = 1.0;
        params.condensate.c0 = 1e-4;
        params.condensate.n_vort = 4;
        let grid = Grid::from_params(&params.grid).unwrap();
        let fft = Fft2::new(16, 16);
        let mut imp = PairImprinter::seeded(0).with_max_attempts(50);
        assert!(matches!(
            initial_state(&params, &grid, &fft, &mut imp),
            Err(ConfigError::VortexPlacement { .. }),
        ));
    }
}
