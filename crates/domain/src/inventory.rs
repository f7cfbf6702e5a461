//! Stock sufficiency checks.

use std::collections::HashMap;

use common::ProductId;
use store::{CartLineItem, Product};

/// Returns the names of products that cannot cover their line, in line order.
///
/// An empty result means every line can be fulfilled. A line whose product is
/// missing from `products` is reported by its product id.
pub fn check_availability(lines: &[CartLineItem], products: &[Product]) -> Vec<String> {
    let by_id: HashMap<ProductId, &Product> = products.iter().map(|p| (p.id, p)).collect();

    lines
        .iter()
        .filter_map(|line| match by_id.get(&line.product_id) {
            Some(product) if product.available_quantity >= line.quantity => None,
            Some(product) => Some(product.title.clone()),
            None => Some(line.product_id.to_string()),
        })
        .collect()
}
