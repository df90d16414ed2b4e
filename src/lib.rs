//! A small, dependency-light numerical time-integration engine: Runge–Kutta
//! and IMEX (implicit/explicit) steppers driven by a common [`flow::Flow`],
//! with coupled-state support and decimated trajectory observation.
//!
//! Module surface: [`tableau`] (Butcher coefficients), [`coupled`]
//! (`Pair`/`Triplet` state composition), [`timerange`] (sub-step
//! partitioning), [`system`] (explicit/implicit term dispatch),
//! [`stagecache`] (forward-stage recording for adjoint sweeps),
//! [`monitor`] (trajectory sampling), [`method`] (RK4, CB3R2R, CNRK2),
//! and [`flow`] (the driver tying them together).
//!
//! # Invariants
//! - No module panics on malformed *numerical* input (NaN/Inf): those
//!   propagate, per the design notes in `DESIGN.md`.
//! - Programming errors (cache misuse, out-of-range slot access) panic
//!   rather than returning `Result`; recoverable construction errors
//!   (malformed tableaux, degenerate time ranges, zero decimation
//!   periods) return `Result` via a `thiserror` enum local to the
//!   owning module.

#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms)]

pub mod coupled;
pub mod flow;
pub mod method;
pub mod monitor;
pub mod stagecache;
pub mod system;
pub mod tableau;
pub mod timerange;

pub use coupled::{couple, couple3, refcouple, refcouple3, Pair, Triplet};
pub use flow::{Flow, FlowError};
pub use method::{Cb3r2r, Cnrk2, Rk4};
pub use monitor::{Monitor, RamStorage};
pub use stagecache::{StageCache, StageRecord};
pub use system::{Implicit, NoOpImplicit, State, System1, System2, System3, SystemOps};
pub use tableau::{cb2, cb3e, IMEXTableau, Tableau};
pub use timerange::TimeRange;
