pub mod routing;
pub mod entities;
pub mod assistant;
