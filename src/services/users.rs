use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::user;
use crate::errors::ServiceError;

/// Postal address captured on an order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub recipient: Option<String>,
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl ShippingAddress {
    /// Names of required fields that are missing or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        let mut missing = Vec::new();
        if blank(&self.line1) {
            missing.push("line1");
        }
        if blank(&self.city) {
            missing.push("city");
        }
        if blank(&self.postal_code) {
            missing.push("postal_code");
        }
        if blank(&self.country) {
            missing.push("country");
        }
        missing
    }

    pub fn is_empty(&self) -> bool {
        *self == ShippingAddress::default()
    }
}

impl From<&user::Model> for ShippingAddress {
    fn from(u: &user::Model) -> Self {
        Self {
            recipient: u.shipping_recipient.clone().or_else(|| Some(u.name.clone())),
            line1: u.shipping_line1.clone(),
            line2: u.shipping_line2.clone(),
            city: u.shipping_city.clone(),
            region: u.shipping_region.clone(),
            postal_code: u.shipping_postal_code.clone(),
            country: u.shipping_country.clone(),
        }
    }
}

/// Read access to user accounts.
#[derive(Clone)]
pub struct UserDirectory {
    db: Arc<DatabaseConnection>,
}

impl UserDirectory {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<user::Model, ServiceError> {
        Self::get_user_with(self.db.as_ref(), user_id).await
    }

    pub async fn get_user_with<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
    ) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(user_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))
    }

    /// The user's stored default address, if one is on file.
    pub async fn default_shipping_address<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
    ) -> Result<Option<ShippingAddress>, ServiceError> {
        let user = Self::get_user_with(conn, user_id).await?;
        if user.shipping_line1.is_none() {
            return Ok(None);
        }
        Ok(Some(ShippingAddress::from(&user)))
    }
}
