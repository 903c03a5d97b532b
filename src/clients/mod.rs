// Clients module
// Client records, owned by brokers and optionally attached to a unit

pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

pub use handlers::*;
pub use models::*;
pub use repository::ClientRepository;
pub use service::ClientService;
