pub mod catalog;
pub mod order;
pub mod payment;
pub mod session;
pub mod ticket;
pub mod user;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::Catalog;
pub use order::Order;
pub use payment::Payment;
pub use session::Session;
pub use ticket::Ticket;
pub use user::User;

use sea_orm::{DbErr, SqlErr};

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
  matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
