//! Conserved quantities and energies of the condensate.

use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{ Arr2, grid::Grid, utils::{ sum_norm_sqr, Fft2 } };

/// Atom number `N = Σ |ψ|² dx dy` of a real-space wavefunction.
pub fn atom_number<S>(psi: &Arr2<S>, grid: &Grid) -> f64
where S: nd::Data<Elem = C64>
{
    sum_norm_sqr(psi) * grid.cell_area()
}

/// Atom number computed from a spectral wavefunction via Parseval's theorem.
pub fn atom_number_spectral<S>(psi_k: &Arr2<S>, grid: &Grid) -> f64
where S: nd::Data<Elem = C64>
{
    sum_norm_sqr(psi_k) * grid.cell_area() / (grid.nx * grid.ny) as f64
}

/// Mean-field energy, split into its two contributions.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Energy {
    /// `½ ∫ |∇ψ|²`
    pub kinetic: f64,
    /// `½ c0 ∫ |ψ|⁴`
    pub interaction: f64,
}

impl Energy {
    pub fn total(&self) -> f64 { self.kinetic + self.interaction }
}

/// Compute the energy of a spectral wavefunction.
pub fn energy<S>(psi_k: &Arr2<S>, grid: &Grid, fft: &Fft2, c0: f64) -> Energy
where S: nd::Data<Elem = C64>
{
    let norm = grid.cell_area() / (grid.nx * grid.ny) as f64;
    let kinetic
        = nd::Zip::from(psi_k).and(&grid.K2)
        .fold(0.0, |acc, qk, k2| acc + 0.5 * k2 * qk.norm_sqr())
        * norm;
    let psi = fft.ifft2(psi_k);
    let interaction
        = psi.iter().map(|q| q.norm_sqr().powi(2)).sum::<f64>()
        * 0.5 * c0 * grid.cell_area();
    Energy { kinetic, interaction }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn uniform_state() {
        let grid = Grid::new(16, 16, 0.5, 0.5).unwrap();
        let fft = Fft2::new(16, 16);
        let psi = nd::Array2::from_elem((16, 16), C64::new(0.0, 2.0));
        assert_approx_eq!(atom_number(&psi, &grid), 4.0 * 64.0);
        let psi_k = fft.fft2(&psi);
        assert_approx_eq!(atom_number_spectral(&psi_k, &grid), 4.0 * 64.0, 1e-9);
        let e = energy(&psi_k, &grid, &fft, 0.1);
        assert!(e.kinetic.abs() < 1e-12);
        // ½ c0 |ψ|⁴ over the box area
        assert_approx_eq!(e.interaction, 0.5 * 0.1 * 16.0 * 64.0, 1e-9);
    }

    #[test]
    fn plane_wave_kinetic_energy() {
        let grid = Grid::new(32, 32, 1.0, 1.0).unwrap();
        let fft = Fft2::new(32, 32);
        let psi = nd::Array2::from_shape_fn((32, 32), |(i, _)| {
            C64::cis(TAU * 3.0 * i as f64 / 32.0)
        });
        let e = energy(&fft.fft2(&psi), &grid, &fft, 0.0);
        let k = 3.0 * grid.dkx;
        assert_approx_eq!(e.kinetic, 0.5 * k * k * 1024.0, 1e-8);
        assert_eq!(e.interaction, 0.0);
        assert_approx_eq!(e.total(), e.kinetic);
    }
}
