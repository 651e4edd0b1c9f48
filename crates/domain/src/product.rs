//! Catalog product entity.

use chrono::{DateTime, Utc};
use common::ProductId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::Money;

/// Errors that can occur constructing or editing a product.
#[derive(Debug, Error)]
pub enum ProductError {
    /// Slug contains characters that are not URL-safe.
    #[error("invalid slug '{slug}': lowercase letters, digits, and dashes only")]
    InvalidSlug { slug: String },

    /// Price must not be negative.
    #[error("invalid price {price}: must not be negative")]
    NegativePrice { price: Money },

    /// Title must not be empty.
    #[error("product title must not be empty")]
    EmptyTitle,
}

/// Product category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductCategory {
    Earrings,
    Necklaces,
    Bracelets,
}

impl ProductCategory {
    /// Returns the category name as stored and served.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::Earrings => "earrings",
            ProductCategory::Necklaces => "necklaces",
            ProductCategory::Bracelets => "bracelets",
        }
    }
}

impl std::fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProductCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "earrings" => Ok(ProductCategory::Earrings),
            "necklaces" => Ok(ProductCategory::Necklaces),
            "bracelets" => Ok(ProductCategory::Bracelets),
            other => Err(format!("unknown product category: {other}")),
        }
    }
}

/// A catalog product.
///
/// `inventory_count` is mutated only through the store's reserve/release
/// operations, never directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    /// Unique, URL-safe identifier used in storefront links.
    pub slug: String,
    pub category: ProductCategory,
    pub price: Money,
    /// Original price shown struck through when discounting.
    pub compare_at_price: Option<Money>,
    /// Ordered image URLs; the first is the primary image.
    pub images: Vec<String>,
    pub inventory_count: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Creates a product, validating title, slug, and price.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ProductId,
        title: impl Into<String>,
        slug: impl Into<String>,
        category: ProductCategory,
        price: Money,
        compare_at_price: Option<Money>,
        images: Vec<String>,
        inventory_count: u32,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ProductError> {
        let title = title.into();
        let slug = slug.into();

        if title.trim().is_empty() {
            return Err(ProductError::EmptyTitle);
        }
        if !is_valid_slug(&slug) {
            return Err(ProductError::InvalidSlug { slug });
        }
        if price.is_negative() {
            return Err(ProductError::NegativePrice { price });
        }

        Ok(Self {
            id,
            title,
            slug,
            category,
            price,
            compare_at_price,
            images,
            inventory_count,
            is_active: true,
            created_at,
        })
    }

    /// Returns the primary image URL, if any.
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
