//! Normalization of list payloads into [`Paginated`].
//!
//! List endpoints have returned their items under several envelope shapes
//! (`items`, `docs`, `data`, `results`, a bare array) with pagination fields
//! that may be missing or stringified. The probe order below is a
//! compatibility shim over those shapes, not a contract.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use super::api_types::coerce_number;
use super::types::Paginated;

/// Limit used when neither the payload, the request, nor the item count gives one.
pub const FALLBACK_LIMIT: u64 = 50;

/// Pagination the caller asked for; used when the payload is silent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageHint {
  pub page: Option<u64>,
  pub limit: Option<u64>,
}

type Strategy = fn(&Value) -> Option<&Vec<Value>>;

/// Item extraction strategies, tried in order.
const STRATEGIES: &[Strategy] = &[
  items_key,
  docs_key,
  data_key,
  results_key,
  Value::as_array,
  first_array_property,
];

fn items_key(v: &Value) -> Option<&Vec<Value>> {
  v.get("items")?.as_array()
}

fn docs_key(v: &Value) -> Option<&Vec<Value>> {
  v.get("docs")?.as_array()
}

fn data_key(v: &Value) -> Option<&Vec<Value>> {
  v.get("data")?.as_array()
}

fn results_key(v: &Value) -> Option<&Vec<Value>> {
  v.get("results")?.as_array()
}

// Map iteration follows serde_json's key order, not the wire order.
fn first_array_property(v: &Value) -> Option<&Vec<Value>> {
  v.as_object()?.values().find_map(Value::as_array)
}

/// Find the item array in `container`, or an empty slice.
fn find_items(container: &Value) -> &[Value] {
  STRATEGIES
    .iter()
    .find_map(|strategy| strategy(container))
    .map(Vec::as_slice)
    .unwrap_or(&[])
}

/// First positive numeric value of `key` across `sources`.
fn positive_field(sources: [&Value; 2], key: &str) -> Option<u64> {
  sources
    .iter()
    .filter_map(|source| source.get(key))
    .filter_map(coerce_number)
    .find(|n| *n >= 1.0)
    .map(|n| n as u64)
}

/// Reshape a list payload into a [`Paginated`]. Never fails: unrecognized
/// shapes yield an empty page and items that don't decode as `T` are skipped.
pub fn paginate<T: DeserializeOwned>(raw: &Value, hint: PageHint) -> Paginated<T> {
  let container = match raw.get("data") {
    Some(data) if !data.is_null() => data,
    _ => raw,
  };

  let items: Vec<T> = find_items(container)
    .iter()
    .filter_map(|value| match serde_json::from_value(value.clone()) {
      Ok(item) => Some(item),
      Err(e) => {
        warn!(error = %e, "skipping list item that does not match the expected shape");
        None
      }
    })
    .collect();
  let count = items.len() as u64;
  let sources = [container, raw];

  let page = positive_field(sources, "page")
    .or(hint.page.filter(|p| *p >= 1))
    .unwrap_or(1);

  let limit = positive_field(sources, "limit").unwrap_or_else(|| {
    hint
      .limit
      .filter(|l| *l >= 1)
      .map(|l| l.max(count))
      .or((count > 0).then_some(count))
      .unwrap_or(FALLBACK_LIMIT)
  });

  let total = positive_field(sources, "total").unwrap_or(count);

  Paginated {
    items,
    total,
    page,
    limit,
  }
}
