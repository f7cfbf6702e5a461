//! Product references shown alongside cart and order lines.

use std::collections::HashMap;

use common::ProductId;
use serde::{Deserialize, Serialize};
use store::{Product, ProductRepository};

use crate::error::DomainError;

/// Denormalized pointer to a catalog product.
///
/// `title` is `None` once the product has been removed from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    pub id: ProductId,
    pub title: Option<String>,
}

impl From<&Product> for ProductRef {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            title: Some(product.title.clone()),
        }
    }
}

/// Resolves references for every id, including ids no longer in the catalog.
pub async fn product_refs<R>(
    repo: &mut R,
    ids: impl IntoIterator<Item = ProductId>,
) -> Result<HashMap<ProductId, ProductRef>, DomainError>
where
    R: ProductRepository + ?Sized,
{
    let mut ids: Vec<ProductId> = ids.into_iter().collect();
    ids.sort();
    ids.dedup();

    let found: HashMap<ProductId, Product> = repo
        .find_products(&ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    Ok(ids
        .into_iter()
        .map(|id| {
            let title = found.get(&id).map(|p| p.title.clone());
            (id, ProductRef { id, title })
        })
        .collect())
}
