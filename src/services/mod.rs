pub mod auth_service;
pub mod entry_service;
pub mod export_service;
pub mod message_service;
pub mod shipment_service;

pub use auth_service::{AuthService, Session};
pub use shipment_service::ShipmentService;
