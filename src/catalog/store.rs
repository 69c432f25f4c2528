//! # Catalog Store
//!
//! The fixed, in-memory product collection. It is built once at startup and never mutated, so
//! it is shared between requests behind an `Arc` with no locking.

use crate::core::error::{CatalogError, CatalogResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use utoipa::ToSchema;

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub author: String,
    pub description: String,
    /// Exact decimal, written as a JSON number with no float rounding
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    #[schema(value_type = f64)]
    pub price: Decimal,
}

impl Product {
    pub fn new(id: i32, name: &str, author: &str, description: &str, price: Decimal) -> Self {
        Self {
            id,
            name: name.to_string(),
            author: author.to_string(),
            description: description.to_string(),
            price,
        }
    }
}

/// Read-only product collection
#[derive(Debug, Clone)]
pub struct CatalogStore {
    products: Arc<[Product]>,
}

impl CatalogStore {
    /// Build a store, rejecting non-positive or duplicate ids
    pub fn new(products: Vec<Product>) -> CatalogResult<Self> {
        let mut seen = HashSet::with_capacity(products.len());
        for product in &products {
            if product.id <= 0 {
                return Err(CatalogError::config(format!(
                    "Product id {} must be positive",
                    product.id
                )));
            }
            if !seen.insert(product.id) {
                return Err(CatalogError::config(format!(
                    "Product id {} is not unique",
                    product.id
                )));
            }
        }

        Ok(Self {
            products: products.into(),
        })
    }

    /// The five books the service ships with
    pub fn seeded() -> Self {
        Self {
            products: seed_products().into(),
        }
    }

    /// Every product in insertion order
    pub fn list_all(&self) -> &[Product] {
        &self.products
    }

    pub fn get_by_id(&self, id: i32) -> Option<&Product> {
        self.products.iter().find(|product| product.id == id)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

fn seed_products() -> Vec<Product> {
    vec![
        Product::new(
            1,
            "Fish Without Hate",
            "HACHIRO PERALEZ",
            "A book about fish and people that hates fish, but not the other way around.",
            Decimal::new(15, 0),
        ),
        Product::new(
            2,
            "Wife Of The North",
            "LAURENCE COLON",
            "The main story is about the wife of the famous man called the North.",
            Decimal::new(666, 0),
        ),
        Product::new(
            3,
            "Men Of The East",
            "KRIS CHAMBERS",
            "Kris Chambers describes his life in this biography.",
            Decimal::new(499, 2),
        ),
        Product::new(
            4,
            "Women Of Tomorrow",
            "JOE ATKINSON",
            "Women of tomorrow is the story about empowering the ongoing feminism movement in a modern perspective.",
            Decimal::new(1499, 2),
        ),
        Product::new(
            5,
            "Turtles And Spiders",
            "TYLER MITCHELL",
            "What does turtles and spiders in common? Read this book and you will be surprised.",
            Decimal::new(39, 0),
        ),
    ]
}
