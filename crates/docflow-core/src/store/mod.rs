pub mod approval_store;
pub mod document_store;
pub mod principal_store;

pub use approval_store::ApprovalStore;
pub use document_store::DocumentStore;
pub use principal_store::PrincipalStore;
