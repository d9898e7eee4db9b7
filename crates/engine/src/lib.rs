//! The reconciliation engine: scans an assistant reply for structured
//! blocks, resolves the clients they reference, and applies the whole
//! turn to storage atomically.

pub mod reconcile;
pub mod resolver;

pub use reconcile::{
    ClientEntry, Manifest, MessageEntry, ProposalEntry, ReconcileError, ReconciledTurn,
    Reconciler, ServiceEntry, SkippedBlock,
};
pub use resolver::{resolve, Resolution};
