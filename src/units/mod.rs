// Units module
// Property units, their image galleries and occupancy statistics

pub mod handlers;
pub mod models;
pub mod parse;
pub mod repository;
pub mod service;

pub use handlers::*;
pub use models::*;
pub use repository::UnitRepository;
pub use service::UnitService;
