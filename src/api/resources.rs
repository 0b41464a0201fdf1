//! Per-resource query caches over the storefront API.
//!
//! [`ResourceCache`] is one generic implementation of list/get/create/update/
//! delete with tag bookkeeping; [`Products`], [`Categories`] and [`Orders`]
//! describe the endpoints each resource uses.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::marker::PhantomData;
use tracing::debug;

use crate::cache::{CacheLayer, Cacheable, QueryKey, Tag};
use crate::error::ApiError;

use super::api_types::{into_data, Created, Deleted};
use super::client::ApiClient;
use super::normalize::{paginate, PageHint};
use super::types::{
  Category, CreateCategory, CreateProduct, Order, OrderListQuery, OrderStatus, Paginated, Product,
  ProductListQuery, UpdateCategory, UpdateOrder, UpdateProduct,
};

/// Default and maximum page sizes accepted by the orders endpoint.
pub const ORDERS_DEFAULT_LIMIT: i64 = 24;
pub const ORDERS_MAX_LIMIT: i64 = 60;

// ============================================================================
// Cacheable implementations
// ============================================================================

impl Cacheable for Product {
  fn cache_id(&self) -> &str {
    &self.id
  }

  fn resource() -> &'static str {
    "Products"
  }
}

impl Cacheable for Category {
  fn cache_id(&self) -> &str {
    &self.id
  }

  fn resource() -> &'static str {
    "Categories"
  }
}

impl Cacheable for Order {
  fn cache_id(&self) -> &str {
    &self.id
  }

  fn resource() -> &'static str {
    "Orders"
  }
}

// ============================================================================
// List parameters
// ============================================================================

/// Query parameters of a list request.
pub trait ListParams {
  /// Parameters in the order they are sent.
  fn params(&self) -> Vec<(&'static str, String)>;

  /// Requested page and limit, used when the response omits them.
  fn page_hint(&self) -> PageHint;
}

impl ListParams for ProductListQuery {
  fn params(&self) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(page) = self.page.filter(|p| *p > 0) {
      params.push(("page", page.to_string()));
    }
    if let Some(limit) = self.limit.filter(|l| *l > 0) {
      params.push(("limit", limit.to_string()));
    }
    if let Some(q) = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
      params.push(("q", q.to_string()));
    }
    if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
      params.push(("category", category.to_string()));
    }
    if let Some(tag) = self.tag.as_deref().filter(|t| !t.is_empty()) {
      params.push(("tag", tag.to_string()));
    }
    if let Some(discounted) = self.discounted {
      params.push(("discounted", discounted.to_string()));
    }
    params
  }

  fn page_hint(&self) -> PageHint {
    PageHint {
      page: self.page.filter(|p| *p > 0).map(u64::from),
      limit: self.limit.filter(|l| *l > 0).map(u64::from),
    }
  }
}

impl OrderListQuery {
  /// Page size actually requested: default for missing or non-positive, capped at the maximum.
  pub fn effective_limit(&self) -> i64 {
    match self.limit {
      Some(limit) if limit > 0 => limit.min(ORDERS_MAX_LIMIT),
      _ => ORDERS_DEFAULT_LIMIT,
    }
  }

  pub fn effective_page(&self) -> u32 {
    self.page.filter(|p| *p > 0).unwrap_or(1)
  }
}

impl ListParams for OrderListQuery {
  fn params(&self) -> Vec<(&'static str, String)> {
    let mut params = vec![
      ("page", self.effective_page().to_string()),
      ("limit", self.effective_limit().to_string()),
    ];
    if let Some(status) = self.status {
      params.push(("status", status.as_param().to_string()));
    }
    params
  }

  fn page_hint(&self) -> PageHint {
    PageHint {
      page: Some(u64::from(self.effective_page())),
      limit: Some(self.effective_limit() as u64),
    }
  }
}

/// Categories are listed without parameters.
impl ListParams for () {
  fn params(&self) -> Vec<(&'static str, String)> {
    Vec::new()
  }

  fn page_hint(&self) -> PageHint {
    PageHint::default()
  }
}

// ============================================================================
// Resource descriptors
// ============================================================================

/// Endpoints and payload types of one API resource.
pub trait Resource: Send + Sync + 'static {
  type Entity: Cacheable;
  type Query: ListParams + Send + Sync;
  type Update: Serialize + Send + Sync;

  /// `GET` path of the collection
  const LIST_PATH: &'static str;

  /// `PATCH`/`DELETE` path of one entity
  fn item_path(id: &str) -> String;
}

/// Resources with a single-entity read endpoint.
pub trait Detail: Resource {
  fn detail_path(key: &str) -> String;
}

/// Resources that can be created.
pub trait Creatable: Resource {
  type Create: Serialize + Send + Sync;

  const CREATE_PATH: &'static str;
}

pub struct Products;

impl Resource for Products {
  type Entity = Product;
  type Query = ProductListQuery;
  type Update = UpdateProduct;

  const LIST_PATH: &'static str = "/products";

  fn item_path(id: &str) -> String {
    format!("/admin/products/{}", id)
  }
}

impl Detail for Products {
  /// Products are read by slug.
  fn detail_path(slug: &str) -> String {
    format!("/products/{}", slug)
  }
}

impl Creatable for Products {
  type Create = CreateProduct;

  const CREATE_PATH: &'static str = "/admin/products";
}

pub struct Categories;

impl Resource for Categories {
  type Entity = Category;
  type Query = ();
  type Update = UpdateCategory;

  const LIST_PATH: &'static str = "/categories";

  fn item_path(id: &str) -> String {
    format!("/admin/categories/{}", id)
  }
}

impl Creatable for Categories {
  type Create = CreateCategory;

  const CREATE_PATH: &'static str = "/admin/categories";
}

pub struct Orders;

impl Resource for Orders {
  type Entity = Order;
  type Query = OrderListQuery;
  type Update = UpdateOrder;

  const LIST_PATH: &'static str = "/orders";

  fn item_path(id: &str) -> String {
    format!("/orders/{}", id)
  }
}

impl Detail for Orders {
  fn detail_path(id: &str) -> String {
    format!("/orders/{}", id)
  }
}

// ============================================================================
// Query keys
// ============================================================================

/// Cache key of a resource read.
#[derive(Clone, Debug)]
pub enum ResourceQueryKey {
  /// A list query with its resolved parameters
  List {
    resource: &'static str,
    params: Vec<(&'static str, String)>,
  },
  /// A single-entity read
  Detail { resource: &'static str, key: String },
}

impl QueryKey for ResourceQueryKey {
  fn cache_hash(&self) -> String {
    let input = match self {
      Self::List { resource, params } => {
        let mut params = params.clone();
        params.sort();
        let params: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        format!("list:{}:{}", resource, params.join("&"))
      }
      Self::Detail { resource, key } => format!("detail:{}:{}", resource, key),
    };

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
  }

  fn description(&self) -> String {
    match self {
      Self::List { resource, params } if params.is_empty() => format!("{} list", resource),
      Self::List { resource, params } => {
        let params: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        format!("{} list ({})", resource, params.join(", "))
      }
      Self::Detail { resource, key } => format!("{} {}", resource, key),
    }
  }
}

// ============================================================================
// Resource cache
// ============================================================================

/// Cached reads and tag-invalidating mutations for one resource.
pub struct ResourceCache<R> {
  client: ApiClient,
  cache: CacheLayer,
  _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for ResourceCache<R> {
  fn clone(&self) -> Self {
    Self {
      client: self.client.clone(),
      cache: self.cache.clone(),
      _resource: PhantomData,
    }
  }
}

impl<R: Resource> ResourceCache<R> {
  pub fn new(client: ApiClient, cache: CacheLayer) -> Self {
    Self {
      client,
      cache,
      _resource: PhantomData,
    }
  }

  fn resource() -> &'static str {
    <R::Entity as Cacheable>::resource()
  }

  fn list_tag() -> Tag {
    Tag::list(Self::resource())
  }

  /// List one page. Cached per exact parameter set; tagged with every
  /// returned entity and the collection tag.
  pub async fn list(&self, query: &R::Query) -> Result<Paginated<R::Entity>, ApiError> {
    let params = query.params();
    let hint = query.page_hint();
    let key = ResourceQueryKey::List {
      resource: Self::resource(),
      params: params.clone(),
    };

    let result = self
      .cache
      .fetch(
        &key,
        |page: &Paginated<R::Entity>| {
          page
            .items
            .iter()
            .map(Cacheable::entity_tag)
            .chain(std::iter::once(Self::list_tag()))
            .collect()
        },
        || async {
          let raw = self.client.get(R::LIST_PATH, &params).await?;
          Ok::<_, ApiError>(paginate(&raw, hint))
        },
      )
      .await?;

    debug!(query = %key.description(), source = ?result.source, cached_at = ?result.cached_at, "list served");
    Ok(result.data)
  }

  /// Update one entity, then invalidate it and every list.
  pub async fn update(&self, id: &str, payload: &R::Update) -> Result<R::Entity, ApiError> {
    let raw = self.client.patch(&R::item_path(id), payload).await?;
    self.cache.invalidate(&[
      Tag::entity(Self::resource(), id),
      Self::list_tag(),
    ]);

    let entity: R::Entity = into_data(raw)?;
    if entity.cache_id() != id {
      self.cache.invalidate(&[entity.entity_tag()]);
    }
    Ok(entity)
  }

  /// Delete one entity, then invalidate it and every list.
  pub async fn delete(&self, id: &str) -> Result<Deleted, ApiError> {
    let raw = self.client.delete(&R::item_path(id)).await?;
    self.cache.invalidate(&[
      Tag::entity(Self::resource(), id),
      Self::list_tag(),
    ]);

    Deleted::from_response(raw, id)
  }

  /// Mark every list of this resource stale.
  pub fn refresh(&self) -> usize {
    self.cache.invalidate(&[Self::list_tag()])
  }
}

impl<R: Detail> ResourceCache<R> {
  /// Read one entity. Tagged with the entity's own id, whatever key it was read by.
  pub async fn get(&self, key: &str) -> Result<R::Entity, ApiError> {
    let query_key = ResourceQueryKey::Detail {
      resource: Self::resource(),
      key: key.to_string(),
    };

    let result = self
      .cache
      .fetch(
        &query_key,
        |entity: &R::Entity| vec![entity.entity_tag()],
        || async {
          let raw = self.client.get(&R::detail_path(key), &[]).await?;
          into_data::<R::Entity>(raw)
        },
      )
      .await?;

    debug!(query = %query_key.description(), source = ?result.source, cached_at = ?result.cached_at, "detail served");
    Ok(result.data)
  }
}

impl<R: Creatable> ResourceCache<R> {
  /// Create an entity, then invalidate every list.
  pub async fn create(&self, payload: &R::Create) -> Result<Created, ApiError> {
    let raw = self.client.post(R::CREATE_PATH, payload).await?;
    self.cache.invalidate(&[Self::list_tag()]);

    into_data(raw)
  }
}

impl ResourceCache<Orders> {
  pub async fn set_status(&self, id: &str, status: OrderStatus) -> Result<Order, ApiError> {
    self.update(id, &UpdateOrder { status }).await
  }
}
