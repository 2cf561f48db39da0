//! Cart and wishlist endpoints
pub mod containers;

pub use containers::{carts_routes, wishlists_routes};
