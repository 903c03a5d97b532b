// Brokers module
// Broker profiles with references, education, seminars and sales history

pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

pub use handlers::*;
pub use models::*;
pub use repository::BrokerRepository;
pub use service::BrokerService;
