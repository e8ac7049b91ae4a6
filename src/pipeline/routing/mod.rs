pub mod types;
pub mod classify;

pub use types::*;
pub use classify::route_query;
