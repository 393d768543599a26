//! Data models for Oficina

mod change;
mod customer;
mod mechanic;
mod product;
mod record;
mod service_item;
mod service_order;
mod vehicle;

pub use change::{ChangeEntry, ChangeOp};
pub use customer::Customer;
pub use mechanic::Mechanic;
pub use product::Product;
pub use record::{EntityKind, EntityPayload, LocalId, LocalRecord, RemoteId, RemoteRecord};
pub use service_item::ServiceItem;
pub use service_order::{OrderStatus, ServiceOrder};
pub use vehicle::Vehicle;
