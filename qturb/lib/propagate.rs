//! Split-step Fourier propagation of the Gross-Pitaevskii equation.
//!
//! A full step of size `dt` is the symmetric (Strang) splitting
//! ```text
//! ψ̂ ← exp(-¼ dt k²) ψ̂        (kinetic, spectral space)
//! ψ  ← IFFT ψ̂
//! ψ  ← exp(-dt c0 |ψ|²) ψ      (interaction, real space)
//! ψ̂ ← FFT ψ
//! ψ̂ ← exp(-¼ dt k²) ψ̂        (kinetic, spectral space)
//! ```
//! where every exponent carries an extra factor of *i* in real time.

use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    Arr2,
    grid::Grid,
    utils::Fft2,
    wavefunction::Wavefunction,
};

/// Selects between damped (imaginary-time) and unitary (real-time)
/// propagation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Regime {
    /// Multiply by `exp(-a)`.
    Imaginary,
    /// Multiply by `exp(-i a)`.
    Real,
}

impl Regime {
    /// The propagation factor for a real exponent `a`.
    pub fn factor(self, a: f64) -> C64 {
        match self {
            Self::Imaginary => C64::from((-a).exp()),
            Self::Real => C64::cis(-a),
        }
    }
}

/// Apply half a step of free-particle evolution to a spectral wavefunction in
/// place: `ψ̂ ← exp(-¼ dt k²) ψ̂` (imaginary time) or `ψ̂ ← exp(-¼ i dt k²) ψ̂`
/// (real time).
pub fn kinetic_half_step<S, T>(
    psi_k: &mut Arr2<S>,
    K2: &Arr2<T>,
    dt: f64,
    regime: Regime,
)
where
    S: nd::DataMut<Elem = C64>,
    T: nd::Data<Elem = f64>,
{
    nd::Zip::from(psi_k).and(K2)
        .par_for_each(|qk, k2| { *qk *= regime.factor(0.25 * dt * k2); });
}

/// Apply the local interaction factor to a real-space wavefunction in place:
/// `ψ ← exp(-dt c0 |ψ|²) ψ` (imaginary time) or `ψ ← exp(-i dt c0 |ψ|²) ψ`
/// (real time).
pub fn interaction_step<S>(psi: &mut Arr2<S>, c0: f64, dt: f64, regime: Regime)
where S: nd::DataMut<Elem = C64>
{
    psi.par_map_inplace(|qk| {
        let factor = regime.factor(dt * c0 * qk.norm_sqr());
        *qk *= factor;
    });
}

/// Borrowed context for repeated full steps on one grid.
#[derive(Copy, Clone, Debug)]
pub struct SplitStep<'a> {
    pub grid: &'a Grid,
    pub fft: &'a Fft2,
    pub c0: f64,
    pub dt: f64,
}

impl<'a> SplitStep<'a> {
    pub fn new(grid: &'a Grid, fft: &'a Fft2, c0: f64, dt: f64) -> Self {
        Self { grid, fft, c0, dt }
    }

    /// Take one full Strang step. The result is always spectral.
    pub fn step(&self, wf: Wavefunction, regime: Regime) -> Wavefunction {
        let mut psi_k = wf.into_spectral(self.fft);
        kinetic_half_step(&mut psi_k, &self.grid.K2, self.dt, regime);
        let mut psi = Wavefunction::Spectral(psi_k).into_real(self.fft);
        interaction_step(&mut psi, self.c0, self.dt, regime);
        let mut psi_k = Wavefunction::Real(psi).into_spectral(self.fft);
        kinetic_half_step(&mut psi_k, &self.grid.K2, self.dt, regime);
        Wavefunction::Spectral(psi_k)
    }

    /// Take one full Strang step on a bare spectral array in place.
    pub fn step_spectral(&self, psi_k: &mut nd::Array2<C64>, regime: Regime) {
        kinetic_half_step(psi_k, &self.grid.K2, self.dt, regime);
        self.fft.inverse(psi_k);
        interaction_step(psi_k, self.c0, self.dt, regime);
        self.fft.forward(psi_k);
        kinetic_half_step(psi_k, &self.grid.K2, self.dt, regime);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;
    use assert_approx_eq::assert_approx_eq;
    use crate::utils::sum_norm_sqr;

    fn wavy(grid: &Grid) -> nd::Array2<C64> {
        nd::Array2::from_shape_fn(grid.shape(), |(i, j)| {
            let amp = 1.0 + 0.3 * (TAU * i as f64 / grid.nx as f64).cos();
            amp * C64::cis(TAU * (2.0 * j as f64 / grid.ny as f64))
        })
    }

    #[test]
    fn real_kinetic_is_pure_phase() {
        let grid = Grid::new(16, 16, 1.0, 1.0).unwrap();
        let fft = Fft2::new(16, 16);
        let psi_k0 = fft.fft2(&wavy(&grid));
        let mut psi_k = psi_k0.clone();
        kinetic_half_step(&mut psi_k, &grid.K2, 0.1, Regime::Real);
        psi_k.iter().zip(&psi_k0)
            .for_each(|(a, b)| { assert_approx_eq!(a.norm(), b.norm(), 1e-9); });
    }

    #[test]
    fn imaginary_kinetic_damps_by_quarter_dt_k2() {
        let grid = Grid::new(8, 8, 1.0, 1.0).unwrap();
        let mut psi_k = nd::Array2::from_elem((8, 8), C64::new(1.0, 1.0));
        kinetic_half_step(&mut psi_k, &grid.K2, 0.2, Regime::Imaginary);
        assert_eq!(psi_k[[0, 0]], C64::new(1.0, 1.0));
        let expected = (-0.25 * 0.2 * grid.K2[[3, 5]]).exp();
        assert_approx_eq!(psi_k[[3, 5]].re, expected, 1e-14);
        assert_approx_eq!(psi_k[[3, 5]].im, expected, 1e-14);
    }

    #[test]
    fn interaction_factors() {
        let mut psi = nd::Array2::from_elem((4, 4), C64::new(0.0, 2.0));
        interaction_step(&mut psi, 0.5, 0.1, Regime::Real);
        // |ψ|² = 4 so the phase advances by -0.2
        assert_approx_eq!(psi[[1, 1]].norm(), 2.0, 1e-14);
        assert_approx_eq!(psi[[1, 1]].arg(), TAU / 4.0 - 0.2, 1e-14);

        let mut psi = nd::Array2::from_elem((4, 4), C64::new(0.0, 2.0));
        interaction_step(&mut psi, 0.5, 0.1, Regime::Imaginary);
        assert_approx_eq!(psi[[2, 3]].norm(), 2.0 * (-0.2_f64).exp(), 1e-14);
        assert_approx_eq!(psi[[2, 3]].arg(), TAU / 4.0, 1e-14);
    }

    #[test]
    fn real_time_steps_conserve_norm() {
        let grid = Grid::new(32, 32, 1.0, 1.0).unwrap();
        let fft = Fft2::new(32, 32);
        let split = SplitStep::new(&grid, &fft, 0.7, 0.05);
        let psi0 = wavy(&grid);
        let n0 = sum_norm_sqr(&psi0);
        let mut wf = Wavefunction::Real(psi0);
        for _ in 0..50 { wf = split.step(wf, Regime::Real); }
        assert!(wf.is_spectral());
        assert_approx_eq!(sum_norm_sqr(&wf.into_real(&fft)), n0, 1e-8 * n0);
    }

    #[test]
    fn imaginary_time_steps_lose_norm() {
        let grid = Grid::new(16, 16, 1.0, 1.0).unwrap();
        let fft = Fft2::new(16, 16);
        let split = SplitStep::new(&grid, &fft, 0.7, 0.05);
        let psi0 = wavy(&grid);
        let n0 = sum_norm_sqr(&psi0);
        let wf = split.step(Wavefunction::Real(psi0), Regime::Imaginary);
        assert!(sum_norm_sqr(&wf.into_real(&fft)) < n0);
    }

    #[test]
    fn in_place_step_matches_value_step() {
        let grid = Grid::new(16, 8, 0.5, 1.0).unwrap();
        let fft = Fft2::new(16, 8);
        let split = SplitStep::new(&grid, &fft, 0.3, 0.02);
        let psi_k = fft.fft2(&wavy(&grid));
        let mut a = psi_k.clone();
        split.step_spectral(&mut a, Regime::Real);
        let b = split.step(Wavefunction::Spectral(psi_k), Regime::Real)
            .into_array();
        assert_eq!(a, b);
    }
}
