//! Full-replacement reconciliation of a container against a requested item list.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::entities::product;
use crate::services::stock::{self, StockWarning};

/// Capabilities the merger needs from a container line.
pub trait LineItem {
    fn product_id(&self) -> Uuid;
    fn quantity(&self) -> i32;
    fn price_snapshot(&self) -> Decimal;
    fn set_quantity(&mut self, quantity: i32);
}

/// One (product, quantity) pair of a submitted snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct MergeOutcome<L> {
    /// Final line set, order irrelevant
    pub items: Vec<L>,
    /// Warnings in request order
    pub warnings: Vec<StockWarning>,
}

/// Reconciles `existing` against `requested`.
///
/// Lines whose product is absent from the request are dropped. A requested
/// line that produces a stock warning is skipped, leaving any previous
/// quantity in place. Surviving lines keep their price snapshot; new lines
/// are built by `new_line` from the current catalog entry. Every requested
/// product must be present in `products`.
pub fn merge<L, F>(
    existing: Vec<L>,
    requested: &[RequestedLine],
    products: &HashMap<Uuid, product::Model>,
    mut new_line: F,
) -> MergeOutcome<L>
where
    L: LineItem,
    F: FnMut(&product::Model, i32) -> L,
{
    let wanted: HashSet<Uuid> = requested.iter().map(|r| r.product_id).collect();

    let mut order: Vec<Uuid> = Vec::with_capacity(existing.len() + requested.len());
    let mut by_product: HashMap<Uuid, L> = HashMap::with_capacity(existing.len());
    for item in existing {
        let id = item.product_id();
        if wanted.contains(&id) {
            order.push(id);
            by_product.insert(id, item);
        }
    }

    let mut warnings = Vec::new();
    for line in requested {
        let Some(product) = products.get(&line.product_id) else {
            continue;
        };
        if let Some(warning) = stock::evaluate(product, line.quantity) {
            warnings.push(warning);
            continue;
        }
        match by_product.get_mut(&line.product_id) {
            Some(item) => item.set_quantity(line.quantity),
            None => {
                order.push(line.product_id);
                by_product.insert(line.product_id, new_line(product, line.quantity));
            }
        }
    }

    let items = order
        .into_iter()
        .filter_map(|id| by_product.remove(&id))
        .collect();

    MergeOutcome { items, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ProductStatus;
    use crate::services::stock::{test_product, StockWarningKind};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[derive(Debug, Clone, PartialEq)]
    struct Line {
        product_id: Uuid,
        quantity: i32,
        price: Decimal,
    }

    impl LineItem for Line {
        fn product_id(&self) -> Uuid {
            self.product_id
        }
        fn quantity(&self) -> i32 {
            self.quantity
        }
        fn price_snapshot(&self) -> Decimal {
            self.price
        }
        fn set_quantity(&mut self, quantity: i32) {
            self.quantity = quantity;
        }
    }

    fn new_line(p: &product::Model, quantity: i32) -> Line {
        Line {
            product_id: p.id,
            quantity,
            price: p.price,
        }
    }

    fn catalog(products: &[&product::Model]) -> HashMap<Uuid, product::Model> {
        products.iter().map(|p| (p.id, (*p).clone())).collect()
    }

    fn req(product: &product::Model, quantity: i32) -> RequestedLine {
        RequestedLine {
            product_id: product.id,
            quantity,
        }
    }

    fn quantity_of(items: &[Line], id: Uuid) -> Option<i32> {
        items.iter().find(|l| l.product_id == id).map(|l| l.quantity)
    }

    #[test]
    fn limited_stock_keeps_previous_quantity() {
        let lamp = test_product(3, ProductStatus::Active);
        let existing = vec![Line {
            product_id: lamp.id,
            quantity: 2,
            price: dec!(50.00),
        }];

        let outcome = merge(existing, &[req(&lamp, 5)], &catalog(&[&lamp]), new_line);

        assert_eq!(quantity_of(&outcome.items, lamp.id), Some(2));
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].kind, StockWarningKind::LimitedStock);
        assert_eq!(outcome.warnings[0].product_id, lamp.id);
    }

    #[test]
    fn omitted_lines_are_removed() {
        let a = test_product(10, ProductStatus::Active);
        let b = test_product(10, ProductStatus::Active);
        let existing = vec![new_line(&a, 1), new_line(&b, 1)];

        let outcome = merge(existing, &[req(&a, 1)], &catalog(&[&a, &b]), new_line);

        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0].product_id, a.id);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn surviving_line_keeps_price_snapshot() {
        let mut lamp = test_product(10, ProductStatus::Active);
        let existing = vec![Line {
            product_id: lamp.id,
            quantity: 1,
            price: dec!(40.00),
        }];
        lamp.price = dec!(65.00);

        let outcome = merge(existing, &[req(&lamp, 4)], &catalog(&[&lamp]), new_line);

        assert_eq!(outcome.items[0].quantity, 4);
        assert_eq!(outcome.items[0].price, dec!(40.00));
    }

    #[test]
    fn new_line_snapshots_current_price() {
        let lamp = test_product(10, ProductStatus::Active);
        let outcome = merge(Vec::<Line>::new(), &[req(&lamp, 2)], &catalog(&[&lamp]), new_line);
        assert_eq!(outcome.items, vec![new_line(&lamp, 2)]);
    }

    #[test]
    fn warned_new_line_is_not_added() {
        let gone = test_product(0, ProductStatus::Active);
        let old = test_product(5, ProductStatus::Discontinued);

        let outcome = merge(
            Vec::<Line>::new(),
            &[req(&gone, 1), req(&old, 1)],
            &catalog(&[&gone, &old]),
            new_line,
        );

        assert!(outcome.items.is_empty());
        let kinds: Vec<_> = outcome.warnings.iter().map(|w| w.kind).collect();
        assert_eq!(
            kinds,
            vec![StockWarningKind::OutOfStock, StockWarningKind::Discontinued]
        );
    }

    #[test]
    fn omitted_line_is_removed_even_when_other_lines_warn() {
        let a = test_product(1, ProductStatus::Active);
        let b = test_product(10, ProductStatus::Active);
        let existing = vec![new_line(&a, 1), new_line(&b, 3)];

        let outcome = merge(existing, &[req(&a, 9)], &catalog(&[&a, &b]), new_line);

        assert_eq!(quantity_of(&outcome.items, a.id), Some(1));
        assert_eq!(quantity_of(&outcome.items, b.id), None);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn duplicate_request_last_valid_entry_wins() {
        let lamp = test_product(5, ProductStatus::Active);
        let outcome = merge(
            Vec::<Line>::new(),
            &[req(&lamp, 2), req(&lamp, 4), req(&lamp, 9)],
            &catalog(&[&lamp]),
            new_line,
        );
        assert_eq!(quantity_of(&outcome.items, lamp.id), Some(4));
        assert_eq!(outcome.warnings.len(), 1);
    }

    proptest! {
        #[test]
        fn merging_twice_is_idempotent(
            stocks in proptest::collection::vec(0i32..6, 1..6),
            wants in proptest::collection::vec(1i32..8, 1..6),
            seed_quantities in proptest::collection::vec(1i32..4, 0..6),
        ) {
            let products: Vec<product::Model> = stocks
                .iter()
                .map(|s| test_product(*s, ProductStatus::Active))
                .collect();
            let refs: Vec<&product::Model> = products.iter().collect();
            let lookup = catalog(&refs);

            let existing: Vec<Line> = products
                .iter()
                .zip(seed_quantities.iter())
                .map(|(p, q)| new_line(p, *q))
                .collect();
            let requested: Vec<RequestedLine> = products
                .iter()
                .zip(wants.iter())
                .map(|(p, q)| req(p, *q))
                .collect();

            let first = merge(existing, &requested, &lookup, new_line);
            let mut first_items = first.items.clone();
            let second = merge(first.items, &requested, &lookup, new_line);
            let mut second_items = second.items;

            first_items.sort_by_key(|l| l.product_id);
            second_items.sort_by_key(|l| l.product_id);
            prop_assert_eq!(first_items, second_items);
            prop_assert!(second.warnings.len() <= first.warnings.len());
        }

        #[test]
        fn result_only_contains_requested_products(
            keep in proptest::collection::vec(any::<bool>(), 1..8),
        ) {
            let products: Vec<product::Model> = keep
                .iter()
                .map(|_| test_product(100, ProductStatus::Active))
                .collect();
            let refs: Vec<&product::Model> = products.iter().collect();
            let existing: Vec<Line> = products.iter().map(|p| new_line(p, 1)).collect();
            let requested: Vec<RequestedLine> = products
                .iter()
                .zip(keep.iter())
                .filter(|(_, k)| **k)
                .map(|(p, _)| req(p, 2))
                .collect();

            let outcome = merge(existing, &requested, &catalog(&refs), new_line);

            prop_assert_eq!(outcome.items.len(), requested.len());
            for line in &outcome.items {
                prop_assert!(requested.iter().any(|r| r.product_id == line.product_id));
                prop_assert_eq!(line.quantity, 2);
            }
        }
    }
}
