pub mod approval;
pub mod document;
pub mod principal;

pub use approval::*;
pub use document::*;
pub use principal::*;
