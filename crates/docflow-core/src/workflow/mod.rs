//! Document approval workflow.
//!
//! A document moves through three filling steps, each owned by one filler
//! role, then waits for every approver to sign off.
//!
//! ```text
//! Filling(1) ──► Filling(2) ──► Filling(3) ──► Approval ──► Completed
//!     ▲                                            │
//!     └──────────────── any reject ────────────────┘
//! ```
//!
//! [`machine`] holds the pure transitions, [`policy`] and [`role`] decide who
//! may do what, and [`service`] runs transitions against the database under
//! a per-document lock.

pub mod locks;
pub mod machine;
pub mod policy;
pub mod quorum;
pub mod role;
pub mod service;
pub mod view;

pub use locks::DocumentLocks;
pub use machine::{ApprovalOutcome, FieldUpdate, FillOutcome};
pub use policy::FieldVisibility;
pub use quorum::RoleHolders;
pub use role::Role;
pub use service::{ApprovalResult, FieldUpdateResult, WorkflowService};
pub use view::{DocumentStatus, DocumentView, FilteredDocumentView};
