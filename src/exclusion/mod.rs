pub mod filter;
pub mod types;

pub use filter::filter_included;
pub use types::ExcludedMemberSet;
