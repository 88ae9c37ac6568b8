pub mod event;
pub mod issuance;
pub mod lot;
pub mod order;
pub mod order_item;
pub mod payment;
pub mod session;
pub mod ticket;
pub mod user;

pub use order::OrderStatus;
pub use payment::{PaymentStatus, Provider};
pub use ticket::TicketStatus;
