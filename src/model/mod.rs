//! Types that represent the core data model: stores, prices, expense records and inbound
//! messages.
mod expense;
mod message;
mod price;
mod store;

pub use expense::{Expense, DATE_FORMAT};
pub use message::{Message, Update};
pub use price::{Price, PriceError};
pub use store::{Store, Stores};
