//! Session budgets and graceful stop.
//!
//! Caps on DFS depth, wall-clock time, and stagnation. When a budget is hit
//! the engine stops with a partial graph rather than failing; the stop
//! reason rides on the session report.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Budget limits for one exploration session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SessionBudget {
    /// Maximum DFS depth (frontier height).
    pub max_depth: u32,
    /// Maximum wall-clock seconds before forced stop.
    pub max_wall_secs: u64,
    /// Consecutive actions with no new fingerprint before aborting.
    pub stagnation_limit: u32,
    /// Maximum total actions across the session.
    pub max_actions: u64,
}

impl Default for SessionBudget {
    fn default() -> Self {
        Self {
            max_depth: 10,
            max_wall_secs: 300,
            stagnation_limit: 8,
            max_actions: 2000,
        }
    }
}

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Frontier emptied: every reachable safe element explored.
    Complete,
    WallTimeExceeded,
    ActionLimitExceeded,
    /// No new fingerprint across the stagnation window.
    Stagnated,
    Cancelled,
}

impl StopReason {
    /// Whether the resulting graph covers everything reachable.
    pub fn is_complete(&self) -> bool {
        matches!(self, StopReason::Complete)
    }
}

/// Checks session progress against budgets.
pub struct BudgetChecker {
    budget: SessionBudget,
    start: Instant,
}

impl BudgetChecker {
    pub fn new(budget: SessionBudget) -> Self {
        Self {
            budget,
            start: Instant::now(),
        }
    }

    /// Returns the stop reason if any budget is exhausted.
    pub fn check(&self, actions: u64, stagnant_actions: u32) -> Option<StopReason> {
        if self.start.elapsed().as_secs() >= self.budget.max_wall_secs {
            return Some(StopReason::WallTimeExceeded);
        }
        if actions >= self.budget.max_actions {
            return Some(StopReason::ActionLimitExceeded);
        }
        if stagnant_actions >= self.budget.stagnation_limit {
            return Some(StopReason::Stagnated);
        }
        None
    }

    /// Whether recursing to `depth` stays inside the depth budget.
    pub fn depth_allowed(&self, depth: u32) -> bool {
        depth <= self.budget.max_depth
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    pub fn budget(&self) -> &SessionBudget {
        &self.budget
    }
}
