//! Scheduling domain models.
//!
//! Provides the entity store of a scheduling scenario and the solution
//! type produced by the solve pipeline. Domain-agnostic within
//! scheduling: applicable to job-shop, flow-shop, project scheduling,
//! shift planning and routing-as-scheduling.
//!
//! # Domain Mappings
//!
//! | u-schedule-mip | Manufacturing | Healthcare | Logistics |
//! |----------------|--------------|------------|-----------|
//! | Task | Operation | Procedure | Transport Leg |
//! | Resource | Machine/Worker | Room/Doctor | Truck/Driver |
//! | Task group | Batch of identical parts | Recurring slot | Fleet of trips |
//! | Solution | Production Plan | OR Schedule | Route Plan |

mod constraint;
mod objective;
mod resource;
mod scenario;
mod solution;
mod task;

pub use constraint::{
    CapacitySense, CapacitySlice, Constraint, Operand, Precedence, PrecedenceKind, ResourceRef,
    ResourceRequirement, SliceKind, TaskRef,
};
pub use objective::Objective;
pub use resource::Resource;
pub use scenario::{Scenario, MAKESPAN_TASK};
pub use solution::{Assignment, Placement, Solution, Violation, ViolationType};
pub use task::{Task, LENGTH_PARAM};
