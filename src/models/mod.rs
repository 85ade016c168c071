pub mod reference;
pub mod shipment;
pub mod user;

pub use reference::{NewReference, ReferenceKind, ReferenceList};
pub use shipment::{
    BatchEntry, BatchMessage, BatchReceipt, BatchRequest, NewShipment, ShipmentFilter,
    ShipmentPatch, ShipmentRecord, ShipmentSummary, SummaryKey,
};
pub use user::{Claims, LoginRequest, LoginResponse, NewUser, Role, User, UserDto};
