pub mod commerce;
pub mod order;
pub mod order_item;
pub mod payment_transaction;
pub mod product;
pub mod user;

pub use order::{Entity as Order, Model as OrderModel, OrderStatus};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use payment_transaction::{
    Entity as PaymentTransaction, Model as PaymentTransactionModel, PaymentMethod,
    TransactionStatus,
};
pub use product::{Entity as Product, Model as ProductModel, ProductStatus};
pub use user::{Entity as User, Model as UserModel};
