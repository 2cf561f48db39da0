use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{product, ProductStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockWarningKind {
    LimitedStock,
    OutOfStock,
    Discontinued,
}

/// Advisory signal that a requested quantity cannot be fully honored. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockWarning {
    pub product_id: Uuid,
    pub product_name: String,
    pub kind: StockWarningKind,
}

/// Classifies availability of `requested` units of `product`.
///
/// Discontinued wins over everything, then out-of-stock, then limited stock.
/// `None` means the request can be fully served.
pub fn evaluate(product: &product::Model, requested: i32) -> Option<StockWarning> {
    let kind = if product.status == ProductStatus::Discontinued {
        StockWarningKind::Discontinued
    } else if product.quantity <= 0 {
        StockWarningKind::OutOfStock
    } else if product.quantity < requested {
        StockWarningKind::LimitedStock
    } else {
        return None;
    };

    Some(StockWarning {
        product_id: product.id,
        product_name: product.name.clone(),
        kind,
    })
}

#[cfg(test)]
pub(crate) fn test_product(quantity: i32, status: ProductStatus) -> product::Model {
    use rust_decimal_macros::dec;
    let now = chrono::Utc::now();
    product::Model {
        id: Uuid::new_v4(),
        name: "Desk Lamp".to_string(),
        price: dec!(50.00),
        quantity,
        status,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(10, ProductStatus::Active, 2, None)]
    #[case(3, ProductStatus::Active, 3, None)]
    #[case(3, ProductStatus::Active, 5, Some(StockWarningKind::LimitedStock))]
    #[case(0, ProductStatus::Active, 1, Some(StockWarningKind::OutOfStock))]
    #[case(0, ProductStatus::Discontinued, 1, Some(StockWarningKind::Discontinued))]
    #[case(100, ProductStatus::Discontinued, 1, Some(StockWarningKind::Discontinued))]
    fn classifies_availability(
        #[case] available: i32,
        #[case] status: ProductStatus,
        #[case] requested: i32,
        #[case] expected: Option<StockWarningKind>,
    ) {
        let product = test_product(available, status);
        assert_eq!(evaluate(&product, requested).map(|w| w.kind), expected);
    }

    #[test]
    fn warning_names_the_product() {
        let product = test_product(1, ProductStatus::Active);
        let warning = evaluate(&product, 4).unwrap();
        assert_eq!(warning.product_id, product.id);
        assert_eq!(warning.product_name, "Desk Lamp");
    }
}
