//! Command-line surface, shared by one-shot invocations and the shell.

use clap::{Args as ClapArgs, Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;

use crate::api::forms::{is_valid_image_url, slugify, Pricing, ProductDraft};
use crate::api::types::{
  CategoryStatus, CreateCategory, OrderListQuery, OrderStatus, ProductListQuery, ProductStatus,
  UpdateCategory, UpdateProduct,
};
use crate::auth::Route;

#[derive(Parser, Debug)]
#[command(name = "oadmin")]
#[command(about = "Admin console for the organic products storefront")]
#[command(version)]
pub struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/oadmin/config.yaml)
  #[arg(short, long)]
  pub config: Option<PathBuf>,

  /// API base URL, e.g. http://localhost:5000/api/v1 (env: OADMIN_API_BASE)
  #[arg(long)]
  pub api_base: Option<String>,

  /// Command to run; starts the interactive shell when omitted
  #[command(subcommand)]
  pub command: Option<Command>,
}

/// One line typed into the shell.
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
  /// Log in as administrator
  Login {
    /// Administrator email (default: admin_email from config)
    #[arg(short, long)]
    email: Option<String>,
  },
  /// Forget the stored credential
  Logout,
  /// Show whether a credential is stored
  Whoami,
  /// Counts and recent orders
  Dashboard,
  /// Manage products
  Products {
    #[command(subcommand)]
    action: Option<ProductsCommand>,
  },
  /// Manage categories
  Categories {
    #[command(subcommand)]
    action: Option<CategoriesCommand>,
  },
  /// Manage orders
  Orders {
    #[command(subcommand)]
    action: Option<OrdersCommand>,
  },
  /// Interactive shell
  Shell,
}

impl Command {
  /// Screen this command renders, if it is gated.
  pub fn route(&self) -> Option<Route> {
    match self {
      Command::Login { .. } => Some(Route::Login),
      Command::Dashboard => Some(Route::Dashboard),
      Command::Products { .. } => Some(Route::Products),
      Command::Categories { .. } => Some(Route::Categories),
      Command::Orders { .. } => Some(Route::Orders),
      Command::Logout | Command::Whoami | Command::Shell => None,
    }
  }

  /// Notification shown when the command fails without a server message.
  pub fn failure_message(&self) -> &'static str {
    match self {
      Command::Login { .. } => "Login failed",
      Command::Products {
        action: Some(ProductsCommand::Create(_) | ProductsCommand::Update { .. }),
      } => "Failed to save product",
      Command::Products {
        action: Some(ProductsCommand::Delete { .. }),
      } => "Failed to delete product",
      Command::Products { .. } => "Failed to load products",
      Command::Categories {
        action: Some(CategoriesCommand::Create(_) | CategoriesCommand::Update { .. }),
      } => "Failed to save category",
      Command::Categories {
        action: Some(CategoriesCommand::Delete { .. }),
      } => "Failed to delete category",
      Command::Categories { .. } => "Failed to load categories",
      Command::Orders {
        action: Some(OrdersCommand::Status { .. }),
      } => "Failed to update order status",
      Command::Orders {
        action: Some(OrdersCommand::Delete { .. }),
      } => "Failed to delete order",
      Command::Orders { .. } => "Failed to load orders",
      Command::Dashboard => "Failed to load dashboard",
      Command::Logout | Command::Whoami | Command::Shell => "Command failed",
    }
  }

  pub fn is_product_save(&self) -> bool {
    matches!(
      self,
      Command::Products {
        action: Some(ProductsCommand::Create(_) | ProductsCommand::Update { .. }),
      }
    )
  }
}

// ============================================================================
// Products
// ============================================================================

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ProductsCommand {
  /// List products
  List(ProductListArgs),
  /// Show one product by slug
  Get { slug: String },
  /// Create a product
  Create(ProductCreateArgs),
  /// Update fields of a product
  Update {
    id: String,
    #[command(flatten)]
    fields: ProductUpdateArgs,
  },
  /// Delete a product
  Delete {
    id: String,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,
  },
}

#[derive(ClapArgs, Debug, Clone, PartialEq)]
pub struct ProductListArgs {
  #[arg(long, default_value_t = 1)]
  pub page: u32,
  #[arg(long, default_value_t = 20)]
  pub limit: u32,
  /// Search text
  #[arg(short, long)]
  pub q: Option<String>,
  /// Category slug
  #[arg(long)]
  pub category: Option<String>,
  /// Tag slug
  #[arg(long)]
  pub tag: Option<String>,
  /// Only discounted (true) or only full-price (false) products
  #[arg(long)]
  pub discounted: Option<bool>,
}

impl ProductListArgs {
  pub fn to_query(&self) -> ProductListQuery {
    ProductListQuery {
      page: Some(self.page),
      limit: Some(self.limit),
      q: self.q.clone(),
      category: self.category.clone(),
      tag: self.tag.clone(),
      discounted: self.discounted,
    }
  }
}

#[derive(ClapArgs, Debug, Clone, PartialEq)]
pub struct ProductCreateArgs {
  pub title: String,
  /// URL slug (default: generated from the title)
  #[arg(long)]
  pub slug: Option<String>,
  #[arg(long)]
  pub price: f64,
  /// Sale price; applied only when below the price
  #[arg(long)]
  pub discount: Option<f64>,
  #[arg(long, default_value_t = 0)]
  pub stock: i64,
  /// Image URL, site-relative or http(s)
  #[arg(long)]
  pub image: Option<String>,
  /// Category slug
  #[arg(long)]
  pub category: Option<String>,
  /// Save as draft instead of active
  #[arg(long)]
  pub draft: bool,
}

impl ProductCreateArgs {
  pub fn to_draft(&self) -> ProductDraft {
    ProductDraft {
      title: self.title.clone(),
      slug: self.slug.clone(),
      price: self.price,
      discount: self.discount,
      stock: self.stock,
      image: self.image.clone(),
      category_slug: self.category.clone(),
      active: !self.draft,
    }
  }
}

#[derive(ClapArgs, Debug, Clone, PartialEq, Default)]
pub struct ProductUpdateArgs {
  /// New title; also regenerates the slug unless --slug is given
  #[arg(long)]
  pub title: Option<String>,
  #[arg(long)]
  pub slug: Option<String>,
  #[arg(long)]
  pub price: Option<f64>,
  /// Sale price; requires --price
  #[arg(long, requires = "price")]
  pub discount: Option<f64>,
  #[arg(long)]
  pub stock: Option<i64>,
  #[arg(long)]
  pub image: Option<String>,
  #[arg(long)]
  pub category: Option<String>,
  #[arg(long, value_enum)]
  pub status: Option<ProductStatus>,
}

impl ProductUpdateArgs {
  pub fn to_update(&self) -> Result<UpdateProduct> {
    let slug = self
      .slug
      .clone()
      .or_else(|| self.title.as_deref().map(slugify))
      .filter(|s| !s.is_empty());

    if let Some(image) = self.image.as_deref().filter(|i| !is_valid_image_url(i)) {
      return Err(eyre!("Image URL must start with / or use http(s): {}", image));
    }

    let mut update = UpdateProduct {
      title: self.title.clone(),
      slug,
      stock: self.stock,
      image: self.image.clone(),
      status: self.status,
      category_slug: self.category.clone(),
      ..Default::default()
    };

    if let Some(price) = self.price {
      let pricing = Pricing::from_form(price, self.discount);
      update.price = Some(pricing.price);
      update.compare_at_price = pricing.compare_at_price;
      update.is_discounted = Some(pricing.is_discounted);
    }

    if update.is_empty() {
      return Err(eyre!("Nothing to update"));
    }
    Ok(update)
  }
}

// ============================================================================
// Categories
// ============================================================================

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CategoriesCommand {
  /// List categories
  List,
  /// Create a category
  Create(CategoryCreateArgs),
  /// Update fields of a category
  Update {
    id: String,
    #[command(flatten)]
    fields: CategoryUpdateArgs,
  },
  /// Delete a category
  Delete {
    id: String,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,
  },
}

#[derive(ClapArgs, Debug, Clone, PartialEq)]
pub struct CategoryCreateArgs {
  pub title: String,
  /// URL slug (default: generated from the title)
  #[arg(long)]
  pub slug: Option<String>,
  #[arg(long)]
  pub image: Option<String>,
  /// Create hidden instead of active
  #[arg(long)]
  pub hidden: bool,
}

impl CategoryCreateArgs {
  pub fn to_create(&self) -> Result<CreateCategory> {
    let title = self.title.trim();
    let slug = self.slug.clone().unwrap_or_else(|| slugify(title));
    if title.is_empty() || slug.is_empty() {
      return Err(eyre!("Title and slug are required"));
    }
    if let Some(image) = self.image.as_deref().filter(|i| !is_valid_image_url(i)) {
      return Err(eyre!("Image URL must start with / or use http(s): {}", image));
    }

    Ok(CreateCategory {
      title: title.to_string(),
      slug,
      image: self.image.clone(),
      status: Some(if self.hidden {
        CategoryStatus::Hidden
      } else {
        CategoryStatus::Active
      }),
    })
  }
}

#[derive(ClapArgs, Debug, Clone, PartialEq, Default)]
pub struct CategoryUpdateArgs {
  /// New title; also regenerates the slug unless --slug is given
  #[arg(long)]
  pub title: Option<String>,
  #[arg(long)]
  pub slug: Option<String>,
  #[arg(long)]
  pub image: Option<String>,
  #[arg(long, value_enum)]
  pub status: Option<CategoryStatus>,
}

impl CategoryUpdateArgs {
  pub fn to_update(&self) -> Result<UpdateCategory> {
    if let Some(image) = self.image.as_deref().filter(|i| !is_valid_image_url(i)) {
      return Err(eyre!("Image URL must start with / or use http(s): {}", image));
    }

    let update = UpdateCategory {
      title: self.title.clone(),
      slug: self
        .slug
        .clone()
        .or_else(|| self.title.as_deref().map(slugify))
        .filter(|s| !s.is_empty()),
      image: self.image.clone(),
      status: self.status,
    };
    if update.is_empty() {
      return Err(eyre!("Nothing to update"));
    }
    Ok(update)
  }
}

// ============================================================================
// Orders
// ============================================================================

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum OrdersCommand {
  /// List orders
  List(OrderListArgs),
  /// Show one order
  Get { id: String },
  /// Change an order's status
  Status {
    id: String,
    #[arg(value_enum)]
    status: OrderStatus,
    /// Skip the confirmation prompt for delivered/cancelled
    #[arg(short, long)]
    yes: bool,
  },
  /// Delete an order
  Delete {
    id: String,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,
  },
}

#[derive(ClapArgs, Debug, Clone, PartialEq, Default)]
pub struct OrderListArgs {
  #[arg(long)]
  pub page: Option<u32>,
  /// Page size (default 24, at most 60)
  #[arg(long, allow_negative_numbers = true)]
  pub limit: Option<i64>,
  #[arg(long, value_enum)]
  pub status: Option<OrderStatus>,
  /// Filter the page by order id or customer name
  #[arg(short, long)]
  pub search: Option<String>,
}

impl OrderListArgs {
  pub fn to_query(&self) -> OrderListQuery {
    OrderListQuery {
      page: self.page,
      limit: self.limit,
      status: self.status,
    }
  }
}

/// Parse one shell line whose first word has already been resolved to `command`.
pub fn parse_shell_line(command: &str, rest: &[String]) -> Result<Command, clap::Error> {
  let argv = std::iter::once(command.to_string()).chain(rest.iter().cloned());
  ShellLine::try_parse_from(argv).map(|line| line.command)
}
