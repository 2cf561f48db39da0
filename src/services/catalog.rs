use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::{product, ProductStatus};
use crate::errors::ServiceError;

/// Read access to the product catalog. Soft-deleted products read as absent.
#[derive(Clone)]
pub struct ProductCatalog {
    db: Arc<DatabaseConnection>,
}

impl ProductCatalog {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn get_active_product(&self, product_id: Uuid) -> Result<product::Model, ServiceError> {
        Self::get_active_product_with(self.db.as_ref(), product_id).await
    }

    /// Looks a product up on the given connection, typically an open transaction.
    pub async fn get_active_product_with<C: ConnectionTrait>(
        conn: &C,
        product_id: Uuid,
    ) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(product_id)
            .filter(product::Column::Status.ne(ProductStatus::Deleted))
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Resolves every id, failing on the first one that is missing.
    pub async fn get_active_products_with<C: ConnectionTrait>(
        conn: &C,
        product_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, product::Model>, ServiceError> {
        let found: HashMap<Uuid, product::Model> = product::Entity::find()
            .filter(product::Column::Id.is_in(product_ids.iter().copied()))
            .filter(product::Column::Status.ne(ProductStatus::Deleted))
            .all(conn)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        if let Some(missing) = product_ids.iter().find(|id| !found.contains_key(id)) {
            return Err(ServiceError::NotFound(format!("Product {} not found", missing)));
        }
        Ok(found)
    }
}
