#![warn(clippy::all, clippy::pedantic)]

// disable some style lints
#![allow(clippy::needless_return, clippy::must_use_candidate, clippy::comparison_chain)]
#![allow(clippy::redundant_field_names, clippy::redundant_closure_for_method_calls)]
#![allow(clippy::unreadable_literal, clippy::option_if_let_else, clippy::range_plus_one)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc, clippy::module_name_repetitions)]

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap, clippy::cast_lossless, clippy::cast_sign_loss)]
#![allow(clippy::default_trait_access)]

// Tests lints
#![cfg_attr(test, allow(clippy::float_cmp))]

pub mod types;
pub use types::*;

pub(crate) mod math;

mod errors;
pub use self::errors::Error;

pub mod lattice;
pub use self::lattice::PeriodicLattice;

pub mod shapes;
pub use self::shapes::{Shape, Polygon, FreeformShape};

pub mod model;
pub use self::model::{Model, ModelOptions};

pub mod solvers;
pub use self::solvers::{EigenResult, SparseSolverParameters, SparseTarget, solve_dense, solve_sparse};

pub mod observables;
pub use self::observables::{SpatialObservable, calc_spatial_ldos, calc_dos, calc_ldos, calc_probability};
