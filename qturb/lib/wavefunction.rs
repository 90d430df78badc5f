//! The condensate wavefunction in whichever of its two representations is
//! currently authoritative.

use ndarray as nd;
use num_complex::{ Complex32 as C32, Complex64 as C64 };
use crate::utils::{ self, Fft2 };

/// A complex field on the grid, held either in real space (ψ) or in spectral
/// space (ψ̂).
///
/// Only the held representation exists; the other is produced on demand by a
/// consuming conversion, so a stale copy can never be read by accident.
#[derive(Clone, Debug, PartialEq)]
pub enum Wavefunction {
    /// ψ(x, y)
    Real(nd::Array2<C64>),
    /// ψ̂(kx, ky), in unshifted FFT order
    Spectral(nd::Array2<C64>),
}

impl Wavefunction {
    /// Return the real-space representation, transforming if necessary.
    pub fn to_real(self, fft: &Fft2) -> Self {
        match self {
            Self::Real(psi) => Self::Real(psi),
            Self::Spectral(mut psi_k) => {
                fft.inverse(&mut psi_k);
                Self::Real(psi_k)
            },
        }
    }

    /// Return the spectral representation, transforming if necessary.
    pub fn to_spectral(self, fft: &Fft2) -> Self {
        match self {
            Self::Spectral(psi_k) => Self::Spectral(psi_k),
            Self::Real(mut psi) => {
                fft.forward(&mut psi);
                Self::Spectral(psi)
            },
        }
    }

    /// Return `true` if the real-space representation is held.
    pub fn is_real(&self) -> bool { matches!(self, Self::Real(_)) }

    /// Return `true` if the spectral representation is held.
    pub fn is_spectral(&self) -> bool { matches!(self, Self::Spectral(_)) }

    /// Mutable access to ψ, if it is the held representation.
    pub fn as_real_mut(&mut self) -> Option<&mut nd::Array2<C64>> {
        match self {
            Self::Real(psi) => Some(psi),
            Self::Spectral(_) => None,
        }
    }

    /// Mutable access to ψ̂, if it is the held representation.
    pub fn as_spectral_mut(&mut self) -> Option<&mut nd::Array2<C64>> {
        match self {
            Self::Spectral(psi_k) => Some(psi_k),
            Self::Real(_) => None,
        }
    }

    /// The held array, regardless of representation.
    pub fn array(&self) -> &nd::Array2<C64> {
        match self {
            Self::Real(a) | Self::Spectral(a) => a,
        }
    }

    /// Consume `self`, returning the held array.
    pub fn into_array(self) -> nd::Array2<C64> {
        match self {
            Self::Real(a) | Self::Spectral(a) => a,
        }
    }

    /// Convert to real space and return ψ.
    pub fn into_real(self, fft: &Fft2) -> nd::Array2<C64> {
        self.to_real(fft).into_array()
    }

    /// Convert to spectral space and return ψ̂.
    pub fn into_spectral(self, fft: &Fft2) -> nd::Array2<C64> {
        self.to_spectral(fft).into_array()
    }

    /// Compute ψ without giving up the held representation.
    pub fn real_copy(&self, fft: &Fft2) -> nd::Array2<C64> {
        match self {
            Self::Real(psi) => psi.clone(),
            Self::Spectral(psi_k) => fft.ifft2(psi_k),
        }
    }

    /// Single-precision copy of the held array, as written to disk.
    pub fn to_single(&self) -> nd::Array2<C32> {
        utils::to_single(self.array())
    }

    /// Return `true` if no element is NaN or infinite.
    pub fn is_finite(&self) -> bool { utils::all_finite(self.array()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_round_trip() {
        let fft = Fft2::new(8, 8);
        let psi = nd::Array2::from_shape_fn(
            (8, 8), |(i, j)| C64::new(i as f64, -(j as f64) / 3.0));
        let wf = Wavefunction::Real(psi.clone());
        let wf = wf.to_spectral(&fft);
        assert!(wf.is_spectral());
        assert!(wf.real_copy(&fft).iter().zip(&psi)
            .all(|(a, b)| (a - b).norm() < 1e-12));
        let back = wf.to_real(&fft);
        assert!(back.is_real());
        assert!(back.array().iter().zip(&psi)
            .all(|(a, b)| (a - b).norm() < 1e-12));
    }

    #[test]
    fn conversion_to_held_domain_is_noop() {
        let fft = Fft2::new(4, 4);
        let a = nd::Array2::from_elem((4, 4), C64::new(1.0, 2.0));
        let wf = Wavefunction::Spectral(a.clone());
        assert_eq!(wf.to_spectral(&fft), Wavefunction::Spectral(a));
    }

    #[test]
    fn only_held_representation_is_mutable() {
        let mut wf = Wavefunction::Real(crate::utils::zeros(4, 4));
        assert!(wf.as_real_mut().is_some());
        assert!(wf.as_spectral_mut().is_none());
    }
}
