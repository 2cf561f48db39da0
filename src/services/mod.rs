pub mod catalog;
pub mod commerce;
pub mod orders;
pub mod payments;
pub mod stock;
pub mod users;
