pub mod visibility;

pub use visibility::compute_visibility;
