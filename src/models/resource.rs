//! Resource model.
//!
//! Resources are the capacity-limited entities tasks occupy: machines,
//! workers, rooms, vehicles. `size` is the number of units available in
//! parallel at every period.

use serde::{Deserialize, Serialize};

/// A resource that tasks can be bound to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique resource identifier.
    pub id: String,
    /// Parallel capacity in units (>= 1).
    pub size: i64,
    /// Minimum total busy unit-periods over the horizon.
    pub load_lower: Option<f64>,
    /// Maximum total busy unit-periods over the horizon.
    pub load_upper: Option<f64>,
    /// Cost charged per busy unit-period.
    pub cost_per_period: Option<f64>,
}

impl Resource {
    /// Creates a unit-capacity resource.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            size: 1,
            load_lower: None,
            load_upper: None,
            cost_per_period: None,
        }
    }

    /// Sets the parallel capacity.
    pub fn with_size(mut self, size: i64) -> Self {
        self.size = size;
        self
    }

    /// Sets the lower bound on total load.
    pub fn with_load_lower(mut self, lower: f64) -> Self {
        self.load_lower = Some(lower);
        self
    }

    /// Sets the upper bound on total load.
    pub fn with_load_upper(mut self, upper: f64) -> Self {
        self.load_upper = Some(upper);
        self
    }

    /// Sets the per-period usage cost.
    pub fn with_cost_per_period(mut self, cost: f64) -> Self {
        self.cost_per_period = Some(cost);
        self
    }

    /// Whether this is a disjunctive (unit-capacity) resource.
    #[inline]
    pub fn is_unary(&self) -> bool {
        self.size == 1
    }

    /// Whether any total-load bound is set.
    pub fn has_load_bounds(&self) -> bool {
        self.load_lower.is_some() || self.load_upper.is_some()
    }
}
