//! Domain types for the storefront's products, categories and orders.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::api_types::de;

/// Canonical list result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paginated<T> {
  pub items: Vec<T>,
  pub total: u64,
  /// 1-indexed
  pub page: u64,
  pub limit: u64,
}

impl<T> Paginated<T> {
  pub fn total_pages(&self) -> u64 {
    self.total.div_ceil(self.limit.max(1)).max(1)
  }
}

// ============================================================================
// Products
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
  Active,
  Draft,
  Hidden,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  #[serde(rename = "_id")]
  pub id: String,
  pub title: String,
  pub slug: String,
  #[serde(default)]
  pub image: Option<String>,
  #[serde(deserialize_with = "de::number")]
  pub price: f64,
  #[serde(default, deserialize_with = "de::opt_number")]
  pub compare_at_price: Option<f64>,
  #[serde(default)]
  pub is_discounted: Option<bool>,
  #[serde(default, deserialize_with = "de::opt_integer")]
  pub stock: Option<i64>,
  #[serde(default)]
  pub category_slug: Option<String>,
  #[serde(default)]
  pub tag_slugs: Vec<String>,
  pub status: ProductStatus,
  #[serde(default)]
  pub created_at: Option<String>,
  #[serde(default)]
  pub updated_at: Option<String>,
}

/// Body of `POST /admin/products`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateProduct {
  pub title: String,
  pub slug: String,
  pub price: f64,
  pub stock: i64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub image: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub compare_at_price: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_discounted: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<ProductStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub category_slug: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub tag_slugs: Option<Vec<String>>,
}

/// Body of `PATCH /admin/products/:id`; every field optional.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProduct {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub slug: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub price: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub stock: Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub image: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub compare_at_price: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_discounted: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<ProductStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub category_slug: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub tag_slugs: Option<Vec<String>>,
}

impl UpdateProduct {
  pub fn is_empty(&self) -> bool {
    *self == Self::default()
  }
}

/// Filters for `GET /products`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductListQuery {
  pub page: Option<u32>,
  pub limit: Option<u32>,
  pub q: Option<String>,
  pub category: Option<String>,
  pub tag: Option<String>,
  pub discounted: Option<bool>,
}

impl Default for ProductListQuery {
  fn default() -> Self {
    Self {
      page: Some(1),
      limit: Some(20),
      q: None,
      category: None,
      tag: None,
      discounted: None,
    }
  }
}

// ============================================================================
// Categories
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CategoryStatus {
  Active,
  Hidden,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
  #[serde(rename = "_id")]
  pub id: String,
  pub title: String,
  pub slug: String,
  #[serde(default)]
  pub image: Option<String>,
  pub status: CategoryStatus,
  #[serde(default)]
  pub created_at: Option<String>,
  #[serde(default)]
  pub updated_at: Option<String>,
}

impl Category {
  pub fn is_active(&self) -> bool {
    self.status == CategoryStatus::Active
  }
}

/// Body of `POST /admin/categories`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreateCategory {
  pub title: String,
  pub slug: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub image: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<CategoryStatus>,
}

/// Body of `PATCH /admin/categories/:id`.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct UpdateCategory {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub slug: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub image: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<CategoryStatus>,
}

impl UpdateCategory {
  pub fn is_empty(&self) -> bool {
    *self == Self::default()
  }
}

// ============================================================================
// Orders
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
  Pending,
  InProgress,
  InShipping,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  pub fn label(self) -> &'static str {
    match self {
      OrderStatus::Pending => "Pending",
      OrderStatus::InProgress => "In Progress",
      OrderStatus::InShipping => "In Shipping",
      OrderStatus::Delivered => "Delivered",
      OrderStatus::Cancelled => "Cancelled",
    }
  }

  /// Terminal statuses need an explicit confirmation before being applied.
  pub fn requires_confirmation(self) -> bool {
    matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
  }

  pub fn as_param(self) -> &'static str {
    match self {
      OrderStatus::Pending => "PENDING",
      OrderStatus::InProgress => "IN_PROGRESS",
      OrderStatus::InShipping => "IN_SHIPPING",
      OrderStatus::Delivered => "DELIVERED",
      OrderStatus::Cancelled => "CANCELLED",
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Customer {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub phone: String,
  #[serde(default)]
  pub address: String,
  #[serde(default)]
  pub area: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
  pub product_id: String,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub image: Option<String>,
  #[serde(deserialize_with = "de::number")]
  pub price: f64,
  #[serde(deserialize_with = "de::integer")]
  pub qty: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
  #[serde(default, deserialize_with = "de::opt_number")]
  pub sub_total: Option<f64>,
  #[serde(default, deserialize_with = "de::opt_number")]
  pub shipping: Option<f64>,
  #[serde(default, deserialize_with = "de::opt_number")]
  pub grand_total: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  #[serde(rename = "_id")]
  pub id: String,
  #[serde(default)]
  pub customer: Customer,
  #[serde(default)]
  pub lines: Vec<OrderLine>,
  #[serde(default)]
  pub totals: OrderTotals,
  pub status: OrderStatus,
  #[serde(default)]
  pub created_at: Option<String>,
  // The backend has shipped this field as `updatedAT` on orders.
  #[serde(default, alias = "updatedAT")]
  pub updated_at: Option<String>,
}

impl Order {
  /// Case-insensitive match on the order id or customer name.
  pub fn matches(&self, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    needle.is_empty()
      || self.id.to_lowercase().contains(&needle)
      || self.customer.name.to_lowercase().contains(&needle)
  }

  pub fn item_count(&self) -> u32 {
    self.lines.iter().map(|l| l.qty).sum()
  }
}

/// Body of `PATCH /orders/:id`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UpdateOrder {
  pub status: OrderStatus,
}

/// Filters for `GET /orders`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderListQuery {
  pub page: Option<u32>,
  pub limit: Option<i64>,
  pub status: Option<OrderStatus>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_product_accepts_stringified_numbers() {
    let product: Product = serde_json::from_value(json!({
      "_id": "p1",
      "title": "Raw Honey",
      "slug": "raw-honey",
      "price": "450",
      "compareAtPrice": 500,
      "stock": "12",
      "status": "ACTIVE"
    }))
    .unwrap();

    assert_eq!(product.price, 450.0);
    assert_eq!(product.compare_at_price, Some(500.0));
    assert_eq!(product.stock, Some(12));
    assert!(product.tag_slugs.is_empty());
  }

  #[test]
  fn test_order_accepts_misspelled_updated_at() {
    let order: Order = serde_json::from_value(json!({
      "_id": "o1",
      "customer": {"name": "Karim", "email": "k@x.com", "phone": "017", "address": "Road 1", "area": "Dhaka"},
      "lines": [{"productId": "p1", "title": "Ghee", "price": 900, "qty": 2}],
      "totals": {"subTotal": 1800, "shipping": 60, "grandTotal": 1860},
      "status": "IN_SHIPPING",
      "updatedAT": "2024-05-01T10:00:00Z"
    }))
    .unwrap();

    assert_eq!(order.status, OrderStatus::InShipping);
    assert_eq!(order.updated_at.as_deref(), Some("2024-05-01T10:00:00Z"));
    assert_eq!(order.item_count(), 2);
    assert_eq!(order.totals.grand_total, Some(1860.0));
  }

  #[test]
  fn test_order_search_matches_id_or_customer() {
    let order: Order = serde_json::from_value(json!({
      "_id": "66ABC",
      "customer": {"name": "Fatema Begum"},
      "status": "PENDING"
    }))
    .unwrap();

    assert!(order.matches("abc"));
    assert!(order.matches("fatema"));
    assert!(order.matches("  "));
    assert!(!order.matches("rahim"));
  }

  #[test]
  fn test_update_bodies_skip_unset_fields() {
    let body = UpdateProduct {
      stock: Some(3),
      ..Default::default()
    };
    assert_eq!(serde_json::to_value(&body).unwrap(), json!({"stock": 3}));
    assert!(UpdateProduct::default().is_empty());

    let body = UpdateOrder {
      status: OrderStatus::InProgress,
    };
    assert_eq!(serde_json::to_value(&body).unwrap(), json!({"status": "IN_PROGRESS"}));
  }

  #[test]
  fn test_total_pages() {
    let page = Paginated::<u8> {
      items: vec![],
      total: 47,
      page: 1,
      limit: 24,
    };
    assert_eq!(page.total_pages(), 2);

    let empty = Paginated::<u8> {
      items: vec![],
      total: 0,
      page: 1,
      limit: 24,
    };
    assert_eq!(empty.total_pages(), 1);
  }

  #[test]
  fn test_terminal_statuses_need_confirmation() {
    assert!(OrderStatus::Delivered.requires_confirmation());
    assert!(OrderStatus::Cancelled.requires_confirmation());
    assert!(!OrderStatus::InProgress.requires_confirmation());
  }
}
