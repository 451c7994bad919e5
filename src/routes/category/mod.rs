mod handler;
pub mod model;

pub use handler::{create_category, delete_category, list_categories, update_category};
