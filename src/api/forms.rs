//! Product form helpers: slug generation, discount pricing and image URLs.

use color_eyre::{eyre::eyre, Result};
use url::Url;

use super::types::{CreateProduct, ProductStatus};

/// Derive a URL slug from a title: lowercase ASCII alphanumerics joined by `-`.
pub fn slugify(title: &str) -> String {
  title
    .to_lowercase()
    .split(|c: char| !c.is_ascii_lowercase() && !c.is_ascii_digit())
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join("-")
}

/// Percentage saved relative to `compare_at`, rounded; 0 when there is no saving.
pub fn discount_percent(price: f64, compare_at: Option<f64>) -> u32 {
  match compare_at {
    Some(compare) if compare > price && compare > 0.0 => {
      (((compare - price) / compare) * 100.0).round() as u32
    }
    _ => 0,
  }
}

/// Image URLs must be site-relative or http(s).
pub fn is_valid_image_url(url: &str) -> bool {
  let url = url.trim();
  if url.is_empty() {
    return false;
  }
  if url.starts_with('/') {
    return true;
  }
  Url::parse(url)
    .map(|u| matches!(u.scheme(), "http" | "https"))
    .unwrap_or(false)
}

/// Sale price, compare-at price and discount flag derived from a form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
  pub price: f64,
  pub compare_at_price: Option<f64>,
  pub is_discounted: bool,
}

impl Pricing {
  /// A discount strictly between 0 and the list price becomes the sale price.
  pub fn from_form(price: f64, discount: Option<f64>) -> Self {
    match discount {
      Some(discount) if discount > 0.0 && discount < price => Self {
        price: discount,
        compare_at_price: Some(price),
        is_discounted: true,
      },
      _ => Self {
        price,
        compare_at_price: None,
        is_discounted: false,
      },
    }
  }
}

/// Product as entered by the administrator.
#[derive(Debug, Clone, Default)]
pub struct ProductDraft {
  pub title: String,
  /// Generated from the title when absent
  pub slug: Option<String>,
  pub price: f64,
  pub discount: Option<f64>,
  pub stock: i64,
  pub image: Option<String>,
  pub category_slug: Option<String>,
  /// ACTIVE when set, DRAFT otherwise
  pub active: bool,
}

impl ProductDraft {
  fn slug(&self) -> String {
    self
      .slug
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(String::from)
      .unwrap_or_else(|| slugify(&self.title))
  }

  fn image(&self) -> Result<Option<String>> {
    match self.image.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
      None => Ok(None),
      Some(url) if is_valid_image_url(url) => Ok(Some(url.to_string())),
      Some(url) => Err(eyre!("Image URL must start with / or use http(s): {}", url)),
    }
  }

  /// Body for `POST /admin/products`.
  pub fn to_create(&self) -> Result<CreateProduct> {
    let title = self.title.trim();
    if title.is_empty() {
      return Err(eyre!("Title is required"));
    }
    let slug = self.slug();
    if slug.is_empty() {
      return Err(eyre!("Could not derive a slug from '{}'", title));
    }

    let pricing = Pricing::from_form(self.price, self.discount);
    Ok(CreateProduct {
      title: title.to_string(),
      slug,
      price: pricing.price,
      stock: self.stock,
      image: self.image()?,
      compare_at_price: pricing.compare_at_price,
      is_discounted: Some(pricing.is_discounted),
      status: Some(if self.active {
        ProductStatus::Active
      } else {
        ProductStatus::Draft
      }),
      category_slug: self.category_slug.clone().filter(|s| !s.is_empty()),
      tag_slugs: Some(Vec::new()),
    })
  }
}
