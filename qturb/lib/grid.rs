//! Spatial and spectral discretization of the doubly periodic box.
//!
//! All 2D arrays are indexed `[i, j]` with `i` running along *x* (`nx` points)
//! and `j` along *y* (`ny` points).

use std::f64::consts::PI;
use ndarray as nd;
use crate::{
    config::GridParams,
    error::ConfigError,
    utils::{ centered_samples, fft_shift },
};

pub type GResult<T> = Result<T, ConfigError>;

/// Immutable real- and spectral-space coordinates for an `nx × ny` box.
#[derive(Clone, Debug)]
pub struct Grid {
    pub nx: usize,
    pub ny: usize,
    pub dx: f64,
    pub dy: f64,
    /// Spectral spacing along *x*, π / (nx/2 · dx)
    pub dkx: f64,
    /// Spectral spacing along *y*, π / (ny/2 · dy)
    pub dky: f64,
    /// Real-space coordinates along *x*, `(-nx/2 .. nx/2) · dx`
    pub x: nd::Array1<f64>,
    /// Real-space coordinates along *y*, `(-ny/2 .. ny/2) · dy`
    pub y: nd::Array1<f64>,
    /// FFT-shifted spectral coordinates along *x*; `kx[0] == 0`
    pub kx: nd::Array1<f64>,
    /// FFT-shifted spectral coordinates along *y*; `ky[0] == 0`
    pub ky: nd::Array1<f64>,
    /// `X[[i, j]] = x[i]`
    pub X: nd::Array2<f64>,
    /// `Y[[i, j]] = y[j]`
    pub Y: nd::Array2<f64>,
    /// `K2[[i, j]] = kx[i]² + ky[j]²`
    pub K2: nd::Array2<f64>,
}

impl Grid {
    /// Construct the grid, checking that both sizes are powers of two and both
    /// spacings positive.
    pub fn new(nx: usize, ny: usize, dx: f64, dy: f64) -> GResult<Self> {
        ConfigError::check_grid_size(nx)?;
        ConfigError::check_grid_size(ny)?;
        ConfigError::check_positive("dx", dx)?;
        ConfigError::check_positive("dy", dy)?;

        let dkx = PI / ((nx / 2) as f64 * dx);
        let dky = PI / ((ny / 2) as f64 * dy);
        let x = centered_samples(nx, dx);
        let y = centered_samples(ny, dy);
        let kx = fft_shift(&centered_samples(nx, dkx));
        let ky = fft_shift(&centered_samples(ny, dky));
        let X = nd::Array2::from_shape_fn((nx, ny), |(i, _)| x[i]);
        let Y = nd::Array2::from_shape_fn((nx, ny), |(_, j)| y[j]);
        let K2
            = nd::Array2::from_shape_fn(
                (nx, ny), |(i, j)| kx[i].powi(2) + ky[j].powi(2));
        Ok(Self { nx, ny, dx, dy, dkx, dky, x, y, kx, ky, X, Y, K2 })
    }

    /// Construct the grid described by a [`GridParams`].
    pub fn from_params(params: &GridParams) -> GResult<Self> {
        Self::new(params.nx, params.ny, params.dx, params.dy)
    }

    /// Array shape `(nx, ny)`.
    pub fn shape(&self) -> (usize, usize) { (self.nx, self.ny) }

    /// Box length along *x*.
    pub fn len_x(&self) -> f64 { self.nx as f64 * self.dx }

    /// Box length along *y*.
    pub fn len_y(&self) -> f64 { self.ny as f64 * self.dy }

    /// Area of a single grid cell, `dx · dy`.
    pub fn cell_area(&self) -> f64 { self.dx * self.dy }
}
