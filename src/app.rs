use crate::api::types::{OrderListQuery, ProductListQuery};
use crate::api::{ApiClient, Categories, Orders, Products, ResourceCache};
use crate::auth::{AuthGate, AuthService, Navigation, Route};
use crate::cache::{CacheLayer, MemoryStorage, NoopStorage};
use crate::cli::{self, CategoriesCommand, Command, OrderListArgs, OrdersCommand, ProductsCommand};
use crate::commands::{self, COMMANDS};
use crate::config::Config;
use crate::error::ApiError;
use crate::event::{Event, EventHandler};
use crate::render;
use crate::session::{SessionStore, SqliteTokenStorage, TokenStorage};
use color_eyre::{eyre::eyre, Report, Result};
use std::io::Write;
use tokio::io::AsyncBufRead;
use tracing::{debug, info, warn};

/// Prompted input: shell lines, login fields and confirmations
pub struct Console {
  events: EventHandler,
}

impl Console {
  pub fn stdin() -> Self {
    Self {
      events: EventHandler::stdin(),
    }
  }

  pub fn from_reader<R>(reader: R) -> Self
  where
    R: AsyncBufRead + Unpin + Send + 'static,
  {
    Self {
      events: EventHandler::from_reader(reader),
    }
  }

  /// Print `prompt` and wait for a line; `None` once input is closed.
  pub async fn read_line(&mut self, prompt: &str) -> Option<String> {
    print!("{}", prompt);
    // Best effort: the prompt still works if stdout is gone
    std::io::stdout().flush().ok();

    match self.events.next().await {
      Event::Line(line) => Some(line),
      Event::Closed => {
        println!();
        None
      }
    }
  }

  pub async fn confirm(&mut self, question: &str) -> bool {
    match self.read_line(&format!("{} [y/N] ", question)).await {
      Some(answer) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
      None => false,
    }
  }
}

/// How a command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  Done,
  Failed,
  /// The credential was refused; session and cache have been cleared
  Unauthorized,
}

/// Application context: session, gate and the per-resource caches
pub struct App {
  config: Config,
  session: SessionStore,
  gate: AuthGate,
  auth: AuthService,
  cache: CacheLayer,
  products: ResourceCache<Products>,
  categories: ResourceCache<Categories>,
  orders: ResourceCache<Orders>,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let storage = match &config.session.path {
      Some(path) => SqliteTokenStorage::open_at(path)?,
      None => SqliteTokenStorage::open()?,
    };
    Self::with_storage(config, storage)
  }

  /// Build the context over `storage`. The session is hydrated before anything
  /// can issue a request.
  pub fn with_storage(config: Config, storage: impl TokenStorage + 'static) -> Result<Self> {
    let session = SessionStore::new(storage);
    session.hydrate()?;

    let client = ApiClient::new(&config.api.base_url, session.clone())?;
    let cache = if config.cache.enabled {
      CacheLayer::new(MemoryStorage::new())
    } else {
      CacheLayer::new(NoopStorage)
    }
    .with_stale_time(config.stale_time()?);

    info!(
      api = %config.api.base_url,
      cache = config.cache.enabled,
      authenticated = session.has_credential(),
      "app ready"
    );

    Ok(Self {
      gate: AuthGate::new(session.clone()),
      auth: AuthService::new(client.clone(), session.clone()),
      products: ResourceCache::new(client.clone(), cache.clone()),
      categories: ResourceCache::new(client.clone(), cache.clone()),
      orders: ResourceCache::new(client, cache.clone()),
      cache,
      session,
      config,
    })
  }

  /// Run one command and report its failure, if any.
  pub async fn run(&self, cmd: &Command, console: &mut Console) -> Outcome {
    match self.execute(cmd, console).await {
      Ok(()) => Outcome::Done,
      Err(e) => self.report(&e, cmd),
    }
  }

  /// Interactive loop over the command palette
  pub async fn shell(&self, console: &mut Console) {
    println!("oadmin shell. Type `help` for commands, `quit` to leave.");

    while let Some(line) = console.read_line("oadmin> ").await {
      let args = match commands::split_args(&line) {
        Ok(args) => args,
        Err(e) => {
          eprintln!("✗ {}", e);
          continue;
        }
      };
      let Some((word, rest)) = args.split_first() else {
        continue;
      };
      let Some(command) = commands::resolve(word) else {
        eprintln!("✗ Unknown command: {}. Type `help` for commands.", word);
        continue;
      };

      match command.name {
        "quit" => break,
        "help" => print_help(),
        name => match cli::parse_shell_line(name, rest) {
          Ok(Command::Shell) => {}
          Ok(cmd) => {
            if self.run(&cmd, console).await == Outcome::Unauthorized {
              self.run(&Command::Login { email: None }, console).await;
            }
          }
          Err(e) => {
            let _ = e.print();
          }
        },
      }
    }
  }

  async fn execute(&self, cmd: &Command, console: &mut Console) -> Result<()> {
    if let Some(route) = cmd.route() {
      match self.gate.require_auth(route) {
        Navigation::Render(screen) => debug!(route = %screen, "rendering"),
        Navigation::Redirect(to) => {
          println!("Not logged in; redirecting to {}", to);
          self.login(None, console).await?;
        }
      }
    }

    match cmd {
      Command::Login { email } => self.login(email.as_deref(), console).await,
      Command::Logout => {
        self.auth.logout()?;
        self.cache.clear();
        println!("✓ Logged out");
        Ok(())
      }
      Command::Whoami => {
        if self.gate.is_authenticated() {
          println!("Logged in to {}", self.config.api.base_url);
        } else {
          println!("Not logged in");
        }
        Ok(())
      }
      Command::Dashboard => self.dashboard().await,
      Command::Products { action } => self.products(action.as_ref(), console).await,
      Command::Categories { action } => self.categories(action.as_ref(), console).await,
      Command::Orders { action } => self.orders(action.as_ref(), console).await,
      Command::Shell => Ok(()),
    }
  }

  /// Print the notification for a failed command.
  fn report(&self, err: &Report, cmd: &Command) -> Outcome {
    let Some(api) = err.downcast_ref::<ApiError>() else {
      eprintln!("✗ {}", err);
      return Outcome::Failed;
    };

    if api.is_auth_failure() {
      warn!(error = %api, "credential refused, clearing session");
      if let Err(e) = self.session.clear() {
        warn!(error = %e, "failed to clear stored credential");
      }
      self.cache.clear();
      eprintln!("✗ Session expired; redirecting to {}", Route::Login);
      return Outcome::Unauthorized;
    }

    if api.is_conflict() && cmd.is_product_save() {
      eprintln!("✗ Title/Slug already exists. Please change and try again.");
    } else {
      eprintln!("✗ {}", api.user_message(cmd.failure_message()));
    }
    Outcome::Failed
  }

  async fn login(&self, email: Option<&str>, console: &mut Console) -> Result<()> {
    let email = match email.or(self.config.admin_email.as_deref()) {
      Some(email) => email.to_string(),
      None => console
        .read_line("Email: ")
        .await
        .ok_or_else(|| eyre!("Login cancelled"))?,
    };
    let password = match Config::get_password() {
      Some(password) => password,
      None => console
        .read_line("Password: ")
        .await
        .ok_or_else(|| eyre!("Login cancelled"))?,
    };

    self.auth.login(email.trim(), &password).await?;
    // Results cached under a previous credential are not reused
    self.cache.clear();
    println!("✓ Logged in");
    Ok(())
  }

  async fn confirm(&self, yes: bool, question: &str, console: &mut Console) -> bool {
    if yes || console.confirm(question).await {
      return true;
    }
    println!("Cancelled");
    false
  }

  async fn dashboard(&self) -> Result<()> {
    let product_query = ProductListQuery {
      limit: Some(1),
      ..Default::default()
    };
    let order_query = OrderListQuery {
      page: Some(1),
      limit: Some(render::RECENT_ORDERS as i64),
      status: None,
    };
    let (products, categories, orders) = tokio::join!(
      self.products.list(&product_query),
      self.categories.list(&()),
      self.orders.list(&order_query),
    );

    println!("{}", render::dashboard(&products?, &categories?, &orders?));
    Ok(())
  }

  async fn products(&self, action: Option<&ProductsCommand>, console: &mut Console) -> Result<()> {
    match action {
      None => {
        let page = self.products.list(&ProductListQuery::default()).await?;
        println!("{}", render::products(&page));
      }
      Some(ProductsCommand::List(args)) => {
        let page = self.products.list(&args.to_query()).await?;
        println!("{}", render::products(&page));
      }
      Some(ProductsCommand::Get { slug }) => {
        let product = self.products.get(slug).await?;
        println!("{}", render::product(&product));
      }
      Some(ProductsCommand::Create(args)) => {
        let body = args.to_draft().to_create()?;
        let created = self.products.create(&body).await?;
        println!(
          "✓ Created product {} ({})",
          created.id,
          created.slug.unwrap_or(body.slug)
        );
      }
      Some(ProductsCommand::Update { id, fields }) => {
        let body = fields.to_update()?;
        let product = self.products.update(id, &body).await?;
        println!("✓ Updated product {}", product.title);
      }
      Some(ProductsCommand::Delete { id, yes }) => {
        if self.confirm(*yes, &format!("Delete product {}?", id), console).await {
          let deleted = self.products.delete(id).await?;
          println!("✓ Deleted product {}", deleted.id);
        }
      }
    }
    Ok(())
  }

  async fn categories(&self, action: Option<&CategoriesCommand>, console: &mut Console) -> Result<()> {
    match action {
      None | Some(CategoriesCommand::List) => {
        let page = self.categories.list(&()).await?;
        println!("{}", render::categories(&page));
      }
      Some(CategoriesCommand::Create(args)) => {
        let body = args.to_create()?;
        let created = self.categories.create(&body).await?;
        println!("✓ Created category {} ({})", created.id, body.slug);
      }
      Some(CategoriesCommand::Update { id, fields }) => {
        let body = fields.to_update()?;
        let category = self.categories.update(id, &body).await?;
        println!("✓ Updated category {}", category.title);
      }
      Some(CategoriesCommand::Delete { id, yes }) => {
        if self.confirm(*yes, &format!("Delete category {}?", id), console).await {
          let deleted = self.categories.delete(id).await?;
          println!("✓ Deleted category {}", deleted.id);
        }
      }
    }
    Ok(())
  }

  async fn orders(&self, action: Option<&OrdersCommand>, console: &mut Console) -> Result<()> {
    match action {
      None => self.list_orders(&OrderListArgs::default()).await?,
      Some(OrdersCommand::List(args)) => self.list_orders(args).await?,
      Some(OrdersCommand::Get { id }) => {
        let order = self.orders.get(id).await?;
        println!("{}", render::order(&order));
      }
      Some(OrdersCommand::Status { id, status, yes }) => {
        let question = format!("Mark order {} as {}?", id, status);
        if !status.requires_confirmation() || self.confirm(*yes, &question, console).await {
          let order = self.orders.set_status(id, *status).await?;
          println!("✓ Order {} is now {}", order.id, order.status);
        }
      }
      Some(OrdersCommand::Delete { id, yes }) => {
        if self.confirm(*yes, &format!("Delete order {}?", id), console).await {
          let deleted = self.orders.delete(id).await?;
          println!("✓ Deleted order {}", deleted.id);
        }
      }
    }
    Ok(())
  }

  async fn list_orders(&self, args: &OrderListArgs) -> Result<()> {
    let page = self.orders.list(&args.to_query()).await?;
    println!("{}", render::orders(&page, args.search.as_deref()));
    Ok(())
  }
}

fn print_help() {
  for cmd in COMMANDS {
    println!("  {:<12} {:<24} {}", cmd.name, cmd.aliases.join(", "), cmd.description);
  }
  println!("\nAppend --help to a command for its options, e.g. `products create --help`.");
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::OrderStatus;
  use crate::session::MemoryTokenStorage;
  use serde_json::json;
  use tokio::io::BufReader;
  use wiremock::matchers::{header, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn app(server: &MockServer) -> App {
    let config = Config::default().with_api_base(Some(format!("{}/api/v1", server.uri())));
    App::with_storage(config, MemoryTokenStorage::default()).unwrap()
  }

  fn console(input: &'static str) -> Console {
    Console::from_reader(BufReader::new(input.as_bytes()))
  }

  fn orders_cmd() -> Command {
    Command::Orders { action: None }
  }

  #[tokio::test]
  async fn test_gated_command_prompts_login_first() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/v1/admin/auth/login"))
      .respond_with(
        ResponseTemplate::new(200).set_body_json(json!({"ok": true, "data": {"accessToken": "T1"}})),
      )
      .expect(1)
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/api/v1/orders"))
      .and(header("Authorization", "Bearer T1"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "data": {"items": []}})))
      .expect(1)
      .mount(&server)
      .await;

    let app = app(&server);
    let mut console = console("a@b.com\nx\n");

    assert_eq!(app.run(&orders_cmd(), &mut console).await, Outcome::Done);
    assert!(app.gate.is_authenticated());
  }

  #[tokio::test]
  async fn test_cancelled_login_stops_command() {
    let server = MockServer::start().await;
    let app = app(&server);
    let mut console = console("");

    assert_eq!(app.run(&orders_cmd(), &mut console).await, Outcome::Failed);
    assert!(server.received_requests().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_refused_credential_clears_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v1/orders"))
      .respond_with(ResponseTemplate::new(401).set_body_json(json!({"ok": false, "code": "UNAUTHORIZED"})))
      .mount(&server)
      .await;

    let app = app(&server);
    app.session.set_credential("stale").unwrap();

    let outcome = app.run(&orders_cmd(), &mut console("")).await;
    assert_eq!(outcome, Outcome::Unauthorized);
    assert!(!app.gate.is_authenticated());
    assert_eq!(app.gate.require_auth(Route::Orders), Navigation::Redirect(Route::Login));
  }

  #[tokio::test]
  async fn test_terminal_status_needs_confirmation() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
      .and(path("/api/v1/orders/o1"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "ok": true,
        "data": {"_id": "o1", "status": "DELIVERED"}
      })))
      .expect(1)
      .mount(&server)
      .await;

    let app = app(&server);
    app.session.set_credential("T1").unwrap();
    let status = |yes| Command::Orders {
      action: Some(OrdersCommand::Status {
        id: "o1".into(),
        status: OrderStatus::Delivered,
        yes,
      }),
    };

    // Declined: no request
    assert_eq!(app.run(&status(false), &mut console("n\n")).await, Outcome::Done);
    // Confirmed
    assert_eq!(app.run(&status(false), &mut console("y\n")).await, Outcome::Done);
  }

  #[tokio::test]
  async fn test_dashboard_loads_all_resources() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v1/products"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "data": {"items": [], "total": 12}})))
      .expect(1)
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/api/v1/categories"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "data": []})))
      .expect(1)
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/api/v1/orders"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "data": {"items": [], "total": 3}})))
      .expect(1)
      .mount(&server)
      .await;

    let app = app(&server);
    app.session.set_credential("T1").unwrap();

    assert_eq!(app.run(&Command::Dashboard, &mut console("")).await, Outcome::Done);
  }

  #[tokio::test]
  async fn test_logout_clears_cache_and_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v1/categories"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "data": []})))
      .expect(1)
      .mount(&server)
      .await;

    let app = app(&server);
    app.session.set_credential("T1").unwrap();
    let categories = Command::Categories { action: None };

    assert_eq!(app.run(&categories, &mut console("")).await, Outcome::Done);
    assert_eq!(app.run(&Command::Logout, &mut console("")).await, Outcome::Done);
    assert!(!app.gate.is_authenticated());

    // Logged out and no input to log in with
    assert_eq!(app.run(&categories, &mut console("")).await, Outcome::Failed);
  }
}
