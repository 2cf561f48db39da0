//! Cart, wishlist and checkout services
pub mod checkout;
pub mod container;
pub mod snapshot;

pub use checkout::CheckoutAssembler;
pub use container::{
    CartKind, CartService, ContainerKind, ContainerService, ContainerView, SyncOutcome,
    WishlistKind, WishlistService,
};
pub use snapshot::{LineItem, RequestedLine};
