//! Declarative scheduling compiled to mixed-integer programs.
//!
//! A [`Scenario`] holds tasks, resources and constraints stated in
//! scheduling vocabulary. The crate compiles it into a flat MIP model
//! with one of two formulations, hands the model to a solver backend and
//! maps the solved assignment back into a [`Solution`].
//!
//! # Modules
//!
//! - **`models`**: Entity store: `Task`, `Resource`, `Precedence`,
//!   `ResourceRequirement`, `CapacitySlice`, `Scenario`, `Solution`
//! - **`algebra`**: Affine start-time expressions and their normalization
//!   into precedences and bounds
//! - **`registry`**: Constraint registry with per-task/per-resource lookups
//! - **`groups`**: Task-group partition (symmetry reduction) and fan-out
//! - **`capacity`**: Capacity slice aggregation over occupancy
//! - **`compile`**: Continuous big-M and discrete time-indexed formulations
//! - **`mip`**: Solver-agnostic MIP model and its LP-format dump
//! - **`solver`**: `MipSolver` boundary and the bundled `microlp` backend
//! - **`materialize`**: Solved values back to placements
//! - **`solve`**: The end-to-end pipeline and [`SolveResult`]
//! - **`validation`** / **`verify`**: Checks before compiling and after solving
//!
//! # Example
//! ```
//! use u_schedule_mip::{solve, Formulation, Precedence, Resource, ResourceRequirement,
//!     Scenario, SolverParams, Task};
//!
//! let mut s = Scenario::new("demo").with_horizon(6);
//! s.add_resource(Resource::new("M1")).unwrap();
//! s.add_task(Task::new("cut", 2)).unwrap();
//! s.add_task(Task::new("weld", 1)).unwrap();
//! s.add_requirement(ResourceRequirement::new(["cut", "weld"], ["M1"])).unwrap();
//! s.add_precedence(Precedence::lax("cut", "weld", 0)).unwrap();
//!
//! let result = solve(&s.with_flowtime_objective(), Formulation::ContinuousBigM,
//!     &SolverParams::new()).unwrap();
//! let solution = result.solution().unwrap();
//! assert_eq!(solution.tuples(), vec![("cut", "M1", 0, 2), ("weld", "M1", 2, 3)]);
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Pritsker, Watters & Wolfe (1969), "Multiproject scheduling with limited
//!   resources: a zero-one programming approach"
//! - Manne (1960), "On the job-shop scheduling problem"

pub mod algebra;
pub mod capacity;
pub mod compile;
pub mod error;
pub mod groups;
pub mod materialize;
pub mod mip;
pub mod models;
pub mod registry;
pub mod solve;
pub mod solver;
pub mod validation;
pub mod verify;

pub use compile::{compile, CompileOptions, CompiledModel, Formulation};
pub use error::{Result, ScheduleError};
pub use models::{
    CapacitySlice, Objective, Precedence, Resource, ResourceRequirement, Scenario, SliceKind,
    Solution, Task,
};
pub use solve::{solve, solve_with, SolveResult};
pub use solver::{MicroLpSolver, MipSolver, SolverParams};
pub use verify::verify_solution;
