//! The convergence engine: reconciliation and the apply pass.

pub mod converge;
pub mod reconcile;

pub use converge::{Engine, RunCancelled, RunOptions, RunSummary};
pub use reconcile::{DeployItem, DeployPlan, PackagePlan, Plan};
