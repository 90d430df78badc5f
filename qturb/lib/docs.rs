//! Theoretical background.
//!
//! # Contents
//! - [Background](#background)
//! - [Split-step evolution](#split-step-evolution)
//! - [Imaginary time](#imaginary-time)
//! - [Phase imprinting](#phase-imprinting)
//! - [Output](#output)
//!
//! # Background
//! A weakly interacting, single-component Bose-Einstein condensate in two
//! dimensions is described at the mean-field level by the Gross-Pitaevskii
//! equation (GPE). In the dimensionless units used throughout this crate
//! (ħ = *m* = 1, no external potential),
//! ```text
//!   ∂ψ      1
//! i -- = - --- ∇²ψ + c0 |ψ|² ψ
//!   ∂t      2
//! ```
//! where *c*<sub>0</sub> is the contact interaction coefficient. The atom
//! number
//! ```text
//! N = ∫ |ψ|² dx dy
//! ```
//! and the energy
//! ```text
//!     ⌠   1            c0
//! E = ⎮ ( - |∇ψ|²  +  --- |ψ|⁴ ) dx dy
//!     ⌡   2            2
//! ```
//! are conserved. For a uniform background of density *n*<sub>0</sub>, the
//! length scale over which the density recovers from a local perturbation is
//! the healing length
//! ```text
//!          1
//! ξ = -----------
//!     √(2 n0 c0)
//! ```
//! which sets the size of a vortex core.
//!
//! The domain is a doubly periodic box of `nx × ny` points with spacings `dx`,
//! `dy`. Coordinates are centered, `x[i] = (i - nx/2) dx`, and wavenumbers are
//! stored in FFT order with spacing `2π / (nx dx)`, so that `kx[0] = 0`.
//!
//! # Split-step evolution
//! The right-hand side of the GPE is the sum of a kinetic term, diagonal in
//! momentum space, and an interaction term, diagonal in position space. Over a
//! short step *dt* the two can be applied separately with the symmetric
//! (Strang) splitting
//! ```text
//!               -i K dt/2  -i V dt  -i K dt/2
//! ψ(t + dt) = [e          e        e         ] ψ(t) + O(dt³)
//!
//! K = k²/2
//! V = c0 |ψ|²
//! ```
//! where each kinetic half-step is a pointwise multiplication by
//! `exp(-¼ i k² dt)` in momentum space and the interaction step is a pointwise
//! multiplication by `exp(-i c0 |ψ|² dt)` in position space. Transforms use
//! the unnormalized forward and `1/(nx ny)`-normalized inverse discrete Fourier
//! transform.
//!
//! The wavefunction is kept in momentum space between steps:
//! ```text
//!     ψ̂(t)
//!       |
//!       V
//!  -i k² dt/4
//! e
//!       |
//!       '--> iFFT ---.
//!                    |
//!                    V
//!             -i c0 |ψ|² dt
//!            e
//!                    |
//!       .--- FFT <---'
//!       |
//!       V
//!  -i k² dt/4
//! e
//!       |
//!       V
//!   ψ̂(t + dt)
//! ```
//!
//! # Imaginary time
//! Substituting *t* → -*i* *t* turns every phase factor into a decay factor,
//! `exp(-¼ k² dt)` and `exp(-c0 |ψ|² dt)`, which damps high-energy components
//! faster than low-energy ones. Renormalizing to a fixed atom number after
//! every step then relaxes any starting state towards the lowest-energy state
//! at that atom number.
//!
//! Relaxation alone would also unwind any vortices. Here, the phase is
//! additionally pinned after every step,
//! ```text
//! ψ ← ψ exp(i θ_fix - i arg ψ)
//! ```
//! so that only the density relaxes. Starting from `√n0 exp(i θ_fix)`, the
//! result is a state whose density dips to zero over about one healing length
//! at each imprinted phase singularity, with vortex positions unchanged.
//!
//! # Phase imprinting
//! A vortex of winding *s* at (*x*<sub>v</sub>, *y*<sub>v</sub>) in free space
//! has phase `s atan2(y - y_v, x - x_v)`, which is not periodic. On the torus
//! the phase of a vortex-antivortex pair is instead built from
//! ```text
//! X = 2π (x - x_v) / Lx
//! Y = 2π (y - y_v) / Ly
//!
//! θ_v(x, y) = Σ_n atan[ tanh((Y + 2πn)/2) tan((X - π)/2) ]
//! ```
//! summed over a few periodic images *n* along y. The pair phase is
//! `θ_m - θ_p + π [H(X_p) - H(X_m)] - 2π (y/Ly) (x_p - x_m)/Lx`, where *H* is
//! the Heaviside step; the last two terms remove the branch cut between the
//! two cores and the linear phase mismatch across the y boundary. Vortex
//! positions are drawn uniformly with a minimum (periodic) separation of 5ξ.
//!
//! # Output
//! The trajectory is written as a directory of NumPy files: `meta.npz` holds
//! the grid coordinates, the time-stepping parameters, and the relaxed
//! initial state; `wavefunction/psi/NNNNNNNN.npy` holds one complex64 frame
//! per snapshot, indexed `[x, y]`. Stacking the frames along a trailing axis
//! gives the `[nx, ny, K]` trajectory.
//!
//! The checkpoint is a single `.npz` archive with entries `time`,
//! `wavefunction/psi_k` (momentum space, complex64), `array_index`, and
//! `step`. Both stores are written to a temporary file and renamed into place.
