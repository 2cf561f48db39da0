//! Schema migrations against the default SQLite backend.

use chrono::Utc;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait, Set};
use sea_orm_migration::{MigratorTrait, SchemaManager};
use stateset_checkout::{
    entities::{product, ProductStatus},
    migrator::Migrator,
};
use uuid::Uuid;

const TABLES: [&str; 9] = [
    "products",
    "users",
    "carts",
    "cart_items",
    "wishlists",
    "wishlist_items",
    "orders",
    "order_items",
    "payment_transactions",
];

async fn memory_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    Database::connect(opts).await.unwrap()
}

#[tokio::test]
async fn migrations_create_every_table() {
    let db = memory_db().await;
    Migrator::up(&db, None).await.unwrap();

    let manager = SchemaManager::new(&db);
    for table in TABLES {
        assert!(manager.has_table(table).await.unwrap(), "missing table {table}");
    }
}

#[tokio::test]
async fn migrations_roll_back_and_reapply() {
    let db = memory_db().await;
    Migrator::up(&db, None).await.unwrap();
    Migrator::down(&db, None).await.unwrap();

    let manager = SchemaManager::new(&db);
    for table in TABLES {
        assert!(!manager.has_table(table).await.unwrap(), "{table} survived rollback");
    }

    Migrator::up(&db, None).await.unwrap();
    assert!(manager.has_table("payment_transactions").await.unwrap());
}

#[tokio::test]
async fn decimal_columns_round_trip() {
    let db = memory_db().await;
    Migrator::up(&db, None).await.unwrap();

    let now = Utc::now();
    let id = Uuid::new_v4();
    product::ActiveModel {
        id: Set(id),
        name: Set("Standing Desk".into()),
        price: Set(dec!(1234.5)),
        quantity: Set(3),
        status: Set(ProductStatus::Active),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&db)
    .await
    .unwrap();

    let stored = product::Entity::find_by_id(id).one(&db).await.unwrap().unwrap();
    assert_eq!(stored.price, dec!(1234.5));
}
