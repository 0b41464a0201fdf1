//! Plain-text rendering of lists and detail views for terminal output.

use std::fmt::Write;

use crate::api::forms::discount_percent;
use crate::api::types::{Category, Order, Paginated, Product};

// ============================================================================
// Formatting helpers
// ============================================================================

/// Taka amount without trailing zero decimals.
pub fn price(amount: f64) -> String {
  if amount.fract() == 0.0 {
    format!("৳{:.0}", amount)
  } else {
    format!("৳{:.2}", amount)
  }
}

fn truncate(s: &str, max: usize) -> String {
  if s.chars().count() <= max {
    s.to_string()
  } else {
    let cut: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", cut)
  }
}

/// Date part of an ISO-8601 timestamp, or `-`.
fn date(timestamp: Option<&str>) -> String {
  match timestamp {
    Some(ts) => chrono::DateTime::parse_from_rfc3339(ts)
      .map(|dt| dt.format("%Y-%m-%d").to_string())
      .unwrap_or_else(|_| ts.chars().take(10).collect()),
    None => "-".to_string(),
  }
}

fn footer<T>(page: &Paginated<T>, noun: &str) -> String {
  format!(
    "Page {}/{} · {} {} · {} per page",
    page.page,
    page.total_pages(),
    page.total,
    noun,
    page.limit
  )
}

// ============================================================================
// Products
// ============================================================================

pub fn products(page: &Paginated<Product>) -> String {
  let mut out = String::new();
  if page.items.is_empty() {
    out.push_str("No products found.\n");
  } else {
    let _ = writeln!(
      out,
      "{:<24}  {:<28}  {:>10}  {:>6}  {:>6}  {}",
      "ID", "TITLE", "PRICE", "OFF", "STOCK", "STATUS"
    );
    for p in &page.items {
      let pct = discount_percent(p.price, p.compare_at_price);
      let _ = writeln!(
        out,
        "{:<24}  {:<28}  {:>10}  {:>6}  {:>6}  {:?}",
        p.id,
        truncate(&p.title, 28),
        price(p.price),
        if pct > 0 { format!("-{}%", pct) } else { String::new() },
        p.stock.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
        p.status
      );
    }
  }
  out.push_str(&footer(page, "products"));
  out
}

pub fn product(p: &Product) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "{}  ({})", p.title, p.slug);
  let _ = writeln!(out, "  id        {}", p.id);
  match p.compare_at_price.filter(|c| *c > p.price) {
    Some(compare) => {
      let _ = writeln!(
        out,
        "  price     {} (was {}, -{}%)",
        price(p.price),
        price(compare),
        discount_percent(p.price, Some(compare))
      );
    }
    None => {
      let _ = writeln!(out, "  price     {}", price(p.price));
    }
  }
  let _ = writeln!(
    out,
    "  stock     {}",
    p.stock.map(|s| s.to_string()).unwrap_or_else(|| "-".into())
  );
  let _ = writeln!(out, "  status    {:?}", p.status);
  let _ = writeln!(out, "  category  {}", p.category_slug.as_deref().unwrap_or("-"));
  if !p.tag_slugs.is_empty() {
    let _ = writeln!(out, "  tags      {}", p.tag_slugs.join(", "));
  }
  let _ = write!(out, "  image     {}", p.image.as_deref().unwrap_or("-"));
  out
}

// ============================================================================
// Categories
// ============================================================================

pub fn categories(page: &Paginated<Category>) -> String {
  let mut out = String::new();
  if page.items.is_empty() {
    out.push_str("No categories found.\n");
  } else {
    let _ = writeln!(out, "{:<24}  {:<24}  {:<24}  {}", "ID", "TITLE", "SLUG", "STATUS");
    for c in &page.items {
      let _ = writeln!(
        out,
        "{:<24}  {:<24}  {:<24}  {}",
        c.id,
        truncate(&c.title, 24),
        truncate(&c.slug, 24),
        if c.is_active() { "Active" } else { "Hidden" }
      );
    }
  }
  out.push_str(&footer(page, "categories"));
  out
}

// ============================================================================
// Orders
// ============================================================================

fn order_row(out: &mut String, o: &Order) {
  let _ = writeln!(
    out,
    "{:<24}  {:<20}  {:>5}  {:>10}  {:<12}  {}",
    o.id,
    truncate(&o.customer.name, 20),
    o.item_count(),
    o.totals.grand_total.map(price).unwrap_or_else(|| "-".into()),
    o.status.label(),
    date(o.created_at.as_deref())
  );
}

fn order_header(out: &mut String) {
  let _ = writeln!(
    out,
    "{:<24}  {:<20}  {:>5}  {:>10}  {:<12}  {}",
    "ID", "CUSTOMER", "ITEMS", "TOTAL", "STATUS", "PLACED"
  );
}

/// Orders page, optionally narrowed to those matching `search`.
pub fn orders(page: &Paginated<Order>, search: Option<&str>) -> String {
  let mut out = String::new();
  let visible: Vec<&Order> = page
    .items
    .iter()
    .filter(|o| search.map_or(true, |s| o.matches(s)))
    .collect();

  if visible.is_empty() {
    out.push_str("No orders found.\n");
  } else {
    order_header(&mut out);
    for o in visible {
      order_row(&mut out, o);
    }
  }
  out.push_str(&footer(page, "orders"));
  out
}

pub fn order(o: &Order) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "Order {}  [{}]", o.id, o.status.label());
  let _ = writeln!(out, "  placed    {}", date(o.created_at.as_deref()));
  let _ = writeln!(out, "  updated   {}", date(o.updated_at.as_deref()));
  let _ = writeln!(out, "  customer  {}", o.customer.name);
  for (label, value) in [
    ("email", &o.customer.email),
    ("phone", &o.customer.phone),
    ("address", &o.customer.address),
    ("area", &o.customer.area),
  ] {
    if !value.is_empty() {
      let _ = writeln!(out, "  {:<9} {}", label, value);
    }
  }

  if !o.lines.is_empty() {
    let _ = writeln!(out, "  items");
    for line in &o.lines {
      let _ = writeln!(
        out,
        "    {:>3} × {:<28} {:>10}",
        line.qty,
        truncate(&line.title, 28),
        price(line.price * f64::from(line.qty))
      );
    }
  }

  let totals = [
    ("subtotal", o.totals.sub_total),
    ("shipping", o.totals.shipping),
    ("total", o.totals.grand_total),
  ];
  let totals: Vec<String> = totals
    .iter()
    .filter_map(|(label, v)| v.map(|v| format!("{} {}", label, price(v))))
    .collect();
  let _ = write!(out, "  {}", totals.join(" · "));
  out
}

// ============================================================================
// Dashboard
// ============================================================================

/// Number of orders shown on the dashboard.
pub const RECENT_ORDERS: usize = 5;

pub fn dashboard(
  products: &Paginated<Product>,
  categories: &Paginated<Category>,
  orders: &Paginated<Order>,
) -> String {
  let mut out = String::new();
  let _ = writeln!(
    out,
    "Products {}   Categories {}   Orders {}",
    products.total, categories.total, orders.total
  );
  out.push('\n');
  if orders.items.is_empty() {
    out.push_str("No orders yet.");
    return out;
  }
  let _ = writeln!(out, "Recent orders");
  order_header(&mut out);
  for o in orders.items.iter().take(RECENT_ORDERS) {
    order_row(&mut out, o);
  }
  out.truncate(out.trim_end().len());
  out
}
