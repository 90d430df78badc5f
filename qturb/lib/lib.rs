#![allow(dead_code, non_snake_case)]

//! Provides the pieces of a pseudo-spectral solver for the two-dimensional
//! Gross-Pitaevskii equation, aimed at simulating quantum turbulence in a
//! doubly periodic scalar Bose-Einstein condensate.
//!
//! A run proceeds in two stages:
//! - Initialization: a random tangle of vortex-antivortex pairs is
//!   phase-imprinted on a uniform condensate, whose density is then relaxed in
//!   imaginary time while the phase is held fixed.
//! - Evolution: the relaxed state is propagated in real time with a symmetric
//!   split-step Fourier scheme, with periodic snapshots and a single-slot
//!   checkpoint from which interrupted runs can be continued.
//!
//! See [`docs`] for theoretical background.

pub mod config;
pub mod error;
pub mod evolve;
pub mod grid;
pub mod imprint;
pub mod observables;
pub mod propagate;
pub mod relax;
pub mod storage;
pub mod utils;
pub mod wavefunction;

pub mod docs;

pub type Arr1<S> = ndarray::ArrayBase<S, ndarray::Ix1>;
pub type Arr2<S> = ndarray::ArrayBase<S, ndarray::Ix2>;
