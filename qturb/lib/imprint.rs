//! Phase imprinting of an initial vortex tangle.
//!
//! The initializer only talks to a [`PhaseImprinter`]; [`PairImprinter`] is the
//! default implementation, placing vortex-antivortex pairs at random and
//! superposing their doubly periodic phase fields.

use std::f64::consts::{ PI, TAU };
use ndarray as nd;
use rand::{ rngs::StdRng, Rng, SeedableRng };
use rayon::prelude::*;
use crate::{ error::ConfigError, grid::Grid };

pub type IResult<T> = Result<T, ConfigError>;

/// Source of vortex positions and of the phase field they imprint.
pub trait PhaseImprinter {
    /// Produce `count` positions inside the box `[-len_x/2, len_x/2) ×
    /// [-len_y/2, len_y/2)`, no two of which are closer than `min_sep` along
    /// both axes.
    fn generate_positions(
        &mut self,
        count: usize,
        min_sep: f64,
        len_x: f64,
        len_y: f64,
    ) -> IResult<Vec<(f64, f64)>>;

    /// Compute the phase field of `count` vortices at `positions` on `grid`.
    fn compute_phase(
        &self,
        count: usize,
        positions: &[(f64, f64)],
        grid: &Grid,
    ) -> nd::Array2<f64>;
}

/// Uniform random placement by rejection sampling, with vortex-antivortex pair
/// phase fields.
///
/// A candidate position is rejected when it lies within `min_sep` of an
/// accepted one along both axes. Draws are made one vortex at a time; if a
/// vortex cannot be placed within the attempt budget, placement starts over
/// from an empty set, up to a fixed number of restarts.
///
/// Of `count` positions, the first half carry winding -1 and the second half
/// winding +1; position `k` is paired with position `count / 2 + k`.
#[derive(Clone, Debug)]
pub struct PairImprinter {
    rng: StdRng,
    max_attempts: usize,
}

impl PairImprinter {
    const DEF_MAX_ATTEMPTS: usize = 10_000;
    const MAX_RESTARTS: usize = 100;
    // periodic images summed along y for each pair
    const IMAGES: i32 = 5;

    /// Seeded generator, for reproducible tangles.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            max_attempts: Self::DEF_MAX_ATTEMPTS,
        }
    }

    /// Generator seeded from system entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            max_attempts: Self::DEF_MAX_ATTEMPTS,
        }
    }

    /// Seeded if `seed` is given, otherwise from entropy.
    pub fn new(seed: Option<u64>) -> Self {
        seed.map(Self::seeded).unwrap_or_else(Self::from_entropy)
    }

    /// Set the number of draws allowed per vortex before placement starts
    /// over.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    // one pass of sequential placement; `None` if some vortex ran out of
    // attempts
    fn try_place(&mut self, count: usize, min_sep: f64, len_x: f64, len_y: f64)
        -> Option<Vec<(f64, f64)>>
    {
        let attempts = self.max_attempts;
        let rng = &mut self.rng;
        let mut positions: Vec<(f64, f64)> = Vec::with_capacity(count);
        for _ in 0..count {
            let new
                = (0..attempts)
                .map(|_| {
                    (
                        rng.gen_range(-len_x / 2.0..len_x / 2.0),
                        rng.gen_range(-len_y / 2.0..len_y / 2.0),
                    )
                })
                .find(|p| positions.iter().all(|q| separated(*p, *q, min_sep)))?;
            positions.push(new);
        }
        Some(positions)
    }
}

fn separated(a: (f64, f64), b: (f64, f64), min_sep: f64) -> bool {
    (a.0 - b.0).abs() >= min_sep || (a.1 - b.1).abs() >= min_sep
}

fn heaviside(x: f64) -> f64 { if x >= 0.0 { 1.0 } else { 0.0 } }

// phase at (x, y) of the pair (xm, ym) [winding -1], (xp, yp) [winding +1]
fn pair_phase(
    (xm, ym): (f64, f64),
    (xp, yp): (f64, f64),
    x: f64,
    y: f64,
    len_x: f64,
    len_y: f64,
) -> f64 {
    let Xm = TAU * (x - xm) / len_x;
    let Ym = TAU * (y - ym) / len_y;
    let Xp = TAU * (x - xp) / len_x;
    let Yp = TAU * (y - yp) / len_y;
    let tm = ((Xm - PI) / 2.0).tan();
    let tp = ((Xp - PI) / 2.0).tan();
    let images: f64
        = (-PairImprinter::IMAGES..=PairImprinter::IMAGES)
        .map(|n| {
            let s = TAU * n as f64;
            (((Ym + s) / 2.0).tanh() * tm).atan()
                - (((Yp + s) / 2.0).tanh() * tp).atan()
        })
        .sum();
    images
        + PI * (heaviside(Xp) - heaviside(Xm))
        - TAU * (y / len_y) * (xp - xm) / len_x
}

impl PhaseImprinter for PairImprinter {
    fn generate_positions(
        &mut self,
        count: usize,
        min_sep: f64,
        len_x: f64,
        len_y: f64,
    ) -> IResult<Vec<(f64, f64)>> {
        ConfigError::check_vortex_count(count)?;
        (0..Self::MAX_RESTARTS)
            .find_map(|_| self.try_place(count, min_sep, len_x, len_y))
            .ok_or(ConfigError::VortexPlacement {
                count, min_sep, attempts: self.max_attempts })
    }

    fn compute_phase(
        &self,
        count: usize,
        positions: &[(f64, f64)],
        grid: &Grid,
    ) -> nd::Array2<f64> {
        let half = count.min(positions.len()) / 2;
        let (len_x, len_y) = (grid.len_x(), grid.len_y());
        (0..half).into_par_iter()
            .map(|k| {
                let m = positions[k];
                let p = positions[half + k];
                nd::Zip::from(&grid.X).and(&grid.Y)
                    .map_collect(|&x, &y| pair_phase(m, p, x, y, len_x, len_y))
            })
            .reduce(
                || nd::Array2::zeros(grid.shape()),
                |acc, theta| acc + theta,
            )
    }
}
