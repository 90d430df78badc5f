//! Miscellaneous tools: the 2D FFT pair, FFT index shifting, and reductions
//! over complex fields.

use std::{ fmt, sync::Arc };
use ndarray::{ self as nd, concatenate, parallel::prelude::* };
use num_complex::{ Complex, Complex32 as C32, Complex64 as C64 };
use num_traits::{ Float, Zero };
use rustfft::{ Fft, FftPlanner };
use crate::{ Arr1, Arr2 };

/// Cached forward and inverse plans for two-dimensional FFTs over arrays of
/// shape `[nx, ny]`.
///
/// Follows the NumPy convention: [`forward`][Self::forward] is unnormalized and
/// [`inverse`][Self::inverse] carries the full `1 / (nx ny)` factor, so that
/// `inverse(forward(ψ)) == ψ`.
#[derive(Clone)]
pub struct Fft2 {
    nx: usize,
    ny: usize,
    fwd_x: Arc<dyn Fft<f64>>,
    inv_x: Arc<dyn Fft<f64>>,
    fwd_y: Arc<dyn Fft<f64>>,
    inv_y: Arc<dyn Fft<f64>>,
}

impl fmt::Debug for Fft2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fft2")
            .field("nx", &self.nx)
            .field("ny", &self.ny)
            .finish()
    }
}

impl Fft2 {
    /// Plan transforms for arrays of shape `[nx, ny]`.
    pub fn new(nx: usize, ny: usize) -> Self {
        let mut plan = FftPlanner::new();
        Self {
            nx,
            ny,
            fwd_x: plan.plan_fft_forward(nx),
            inv_x: plan.plan_fft_inverse(nx),
            fwd_y: plan.plan_fft_forward(ny),
            inv_y: plan.plan_fft_inverse(ny),
        }
    }

    /// Shape of the arrays these plans apply to.
    pub fn shape(&self) -> (usize, usize) { (self.nx, self.ny) }

    /// Perform the unnormalized forward transform in place.
    ///
    /// *Panics if `a` does not have shape `[nx, ny]`*.
    pub fn forward<S>(&self, a: &mut Arr2<S>)
    where S: nd::DataMut<Elem = C64>
    {
        assert_eq!(a.dim(), (self.nx, self.ny));
        fft_axis(a, 1, &self.fwd_y);
        fft_axis(a, 0, &self.fwd_x);
    }

    /// Perform the normalized inverse transform in place.
    ///
    /// *Panics if `a` does not have shape `[nx, ny]`*.
    pub fn inverse<S>(&self, a: &mut Arr2<S>)
    where S: nd::DataMut<Elem = C64>
    {
        assert_eq!(a.dim(), (self.nx, self.ny));
        fft_axis(a, 1, &self.inv_y);
        fft_axis(a, 0, &self.inv_x);
        let n = (self.nx * self.ny) as f64;
        a.par_map_inplace(|ak| { *ak /= n; });
    }

    /// Return the forward transform of `a`.
    pub fn fft2<S>(&self, a: &Arr2<S>) -> nd::Array2<C64>
    where S: nd::Data<Elem = C64>
    {
        let mut f = a.to_owned();
        self.forward(&mut f);
        f
    }

    /// Return the inverse transform of `f`.
    pub fn ifft2<S>(&self, f: &Arr2<S>) -> nd::Array2<C64>
    where S: nd::Data<Elem = C64>
    {
        let mut a = f.to_owned();
        self.inverse(&mut a);
        a
    }
}

// transform every lane of `a` running along `axis`
fn fft_axis<S>(a: &mut Arr2<S>, axis: usize, plan: &Arc<dyn Fft<f64>>)
where S: nd::DataMut<Elem = C64>
{
    a.axis_iter_mut(nd::Axis(1 - axis)).into_par_iter()
        .for_each(|mut lane| {
            if let Some(buf) = lane.as_slice_mut() {
                plan.process(buf);
            } else {
                let mut buf: Vec<C64> = lane.to_vec();
                plan.process(&mut buf);
                lane.iter_mut().zip(buf)
                    .for_each(|(lk, bk)| { *lk = bk; });
            }
        });
}

/// Return a copy of `x` with its two halves swapped, moving the zero-frequency
/// component from the center to index 0 and vice versa for even lengths.
pub fn fft_shift<S, A>(x: &Arr1<S>) -> nd::Array1<A>
where
    S: nd::Data<Elem = A>,
    A: Clone,
{
    let n = x.len();
    let (p, m)
        = if n % 2 == 0 {
            x.view().split_at(nd::Axis(0), n / 2)
        } else {
            x.view().split_at(nd::Axis(0), n / 2 + 1)
        };
    concatenate!(nd::Axis(0), m.into_owned(), p.into_owned())
}

/// Integer samples `-n/2, ..., n/2 - 1` scaled by `d`.
pub fn centered_samples(n: usize, d: f64) -> nd::Array1<f64> {
    let m = (n / 2) as f64;
    (0..n).map(|i| (i as f64 - m) * d).collect()
}

/// Compute `Σ |a|²` over a complex field.
pub fn sum_norm_sqr<S, A, D>(a: &nd::ArrayBase<S, D>) -> A
where
    S: nd::Data<Elem = Complex<A>>,
    A: Float,
    D: nd::Dimension,
{
    a.iter().fold(A::zero(), |acc, ak| acc + ak.norm_sqr())
}

/// Return `true` if every component of every element of `a` is finite.
pub fn all_finite<S, A, D>(a: &nd::ArrayBase<S, D>) -> bool
where
    S: nd::Data<Elem = Complex<A>>,
    A: Float,
    D: nd::Dimension,
{
    a.iter().all(|ak| ak.re.is_finite() && ak.im.is_finite())
}

/// Truncate a double-precision field to single precision.
pub fn to_single<S>(a: &Arr2<S>) -> nd::Array2<C32>
where S: nd::Data<Elem = C64>
{
    a.mapv(|ak| C32::new(ak.re as f32, ak.im as f32))
}

/// Promote a single-precision field to double precision.
pub fn to_double<S>(a: &Arr2<S>) -> nd::Array2<C64>
where S: nd::Data<Elem = C32>
{
    a.mapv(|ak| C64::new(ak.re as f64, ak.im as f64))
}

/// Allocate a zero-valued complex field of shape `[nx, ny]`.
pub fn zeros(nx: usize, ny: usize) -> nd::Array2<C64> {
    nd::Array2::from_elem((nx, ny), C64::zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;
    use assert_approx_eq::assert_approx_eq;

    fn test_field(nx: usize, ny: usize) -> nd::Array2<C64> {
        nd::Array2::from_shape_fn((nx, ny), |(i, j)| {
            let x = i as f64 / nx as f64;
            let y = j as f64 / ny as f64;
            C64::new((TAU * x).sin() + 0.3 * y, (3.0 * TAU * y).cos() - x * y)
        })
    }

    #[test]
    fn round_trip() {
        let fft = Fft2::new(16, 8);
        let psi = test_field(16, 8);
        let back = fft.ifft2(&fft.fft2(&psi));
        psi.iter().zip(&back)
            .for_each(|(a, b)| { assert!((a - b).norm() < 1e-12); });
    }

    #[test]
    fn constant_field_goes_to_zero_mode() {
        let fft = Fft2::new(8, 8);
        let psi = nd::Array2::from_elem((8, 8), C64::new(2.0, -1.0));
        let f = fft.fft2(&psi);
        assert!((f[[0, 0]] - C64::new(128.0, -64.0)).norm() < 1e-10);
        f.indexed_iter()
            .filter(|((i, j), _)| (*i, *j) != (0, 0))
            .for_each(|(_, fk)| { assert!(fk.norm() < 1e-10); });
    }

    #[test]
    fn plane_wave_lands_on_its_mode() {
        // exp(2πi (2 i / nx)) puts all weight at index [2, 0]
        let (nx, ny) = (16, 4);
        let fft = Fft2::new(nx, ny);
        let psi = nd::Array2::from_shape_fn((nx, ny), |(i, _)| {
            C64::cis(TAU * 2.0 * i as f64 / nx as f64)
        });
        let f = fft.fft2(&psi);
        assert_approx_eq!(f[[2, 0]].re, (nx * ny) as f64, 1e-9);
        assert_approx_eq!(sum_norm_sqr(&f), ((nx * ny) as f64).powi(2), 1e-6);
    }

    #[test]
    fn parseval() {
        let fft = Fft2::new(32, 16);
        let psi = test_field(32, 16);
        let f = fft.fft2(&psi);
        assert_approx_eq!(
            sum_norm_sqr(&psi), sum_norm_sqr(&f) / (32.0 * 16.0), 1e-9);
    }

    #[test]
    fn shift_even() {
        let x = nd::array![0, 1, 2, 3, 4, 5];
        assert_eq!(fft_shift(&x), nd::array![3, 4, 5, 0, 1, 2]);
        assert_eq!(fft_shift(&fft_shift(&x)), x);
    }

    #[test]
    fn centered() {
        assert_eq!(
            centered_samples(4, 0.5), nd::array![-1.0, -0.5, 0.0, 0.5]);
    }

    #[test]
    fn finiteness_and_precision() {
        let mut a = test_field(4, 4);
        assert!(all_finite(&a));
        let single = to_single(&a);
        let back = to_double(&single);
        a.iter().zip(&back)
            .for_each(|(x, y)| { assert!((x - y).norm() < 1e-6); });
        a[[1, 2]] = C64::new(f64::NAN, 0.0);
        assert!(!all_finite(&a));
    }
}
