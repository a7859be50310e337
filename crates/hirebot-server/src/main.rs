//! hirebot server binary.
//!
//! `serve` reads `config.toml` (or the path given with `--config`), opens the
//! SQLite store and serves the tenant API over HTTP. The other subcommands
//! are operator tasks run directly against the store.
//!
//! # Provisioning a tenant
//!
//! ```text
//! hirebot create-company "Acme"
//! hirebot issue-key <company-id> --name chatbot
//! hirebot add-staff <company-id> rita@acme.com --name Rita
//! ```

mod settings;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::{Parser, Subcommand};
use hirebot_api::AppState;
use hirebot_core::{change::ChangeEvent, company::NewStaffUser, store::TenantStore};
use hirebot_store_sqlite::SqliteStore;
use rand_core::OsRng;
use tokio::{net::TcpListener, sync::broadcast, task::JoinHandle};
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::settings::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "Multi-tenant recruiting chatbot backend")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml", global = true)]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API.
  Serve,
  /// Create a company (tenant).
  CreateCompany { name: String },
  /// List every company.
  ListCompanies,
  /// Delete a company and everything it owns.
  DeleteCompany { company_id: Uuid },
  /// Issue an API key for a company. The key is printed once.
  IssueKey {
    company_id: Uuid,
    #[arg(long, default_value = "default")]
    name:       String,
  },
  /// Revoke an API key by id.
  RevokeKey { key_id: Uuid },
  /// Provision a staff user; the password is read from stdin.
  AddStaff {
    company_id: Uuid,
    email:      String,
    #[arg(long, default_value = "")]
    name:       String,
  },
  /// Print the argon2 hash for a password entered on stdin and exit.
  HashPassword,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  match cli.command {
    Command::Serve => {
      let (cfg, store) = open(&cli.config).await?;
      serve(cfg, store).await?;
    }
    Command::CreateCompany { name } => {
      let (_, store) = open(&cli.config).await?;
      let company = store.add_company(&name).await.context("failed to create company")?;
      println!("{}\t{}", company.company_id, company.company_name);
    }
    Command::ListCompanies => {
      let (_, store) = open(&cli.config).await?;
      for company in store.list_companies().await.context("failed to list companies")? {
        let state = if company.is_active { "active" } else { "inactive" };
        println!("{}\t{}\t{state}", company.company_id, company.company_name);
      }
    }
    Command::DeleteCompany { company_id } => {
      let (_, store) = open(&cli.config).await?;
      if !store.delete_company(company_id).await.context("failed to delete company")? {
        anyhow::bail!("no company {company_id}");
      }
      println!("deleted {company_id}");
    }
    Command::IssueKey { company_id, name } => {
      let (_, store) = open(&cli.config).await?;
      let issued = store
        .issue_api_key(company_id, &name)
        .await
        .context("failed to issue key")?;
      eprintln!("key id {}: store the key now, it cannot be shown again", issued.key.key_id);
      println!("{}", issued.secret);
    }
    Command::RevokeKey { key_id } => {
      let (_, store) = open(&cli.config).await?;
      let key = store.revoke_api_key(key_id).await.context("failed to revoke key")?;
      println!("revoked {} ({})", key.key_id, key.name);
    }
    Command::AddStaff { company_id, email, name } => {
      let (_, store) = open(&cli.config).await?;
      let password_hash = hash_password(&read_password()?)?;
      let user = store
        .add_staff_user(NewStaffUser { company_id, email, name, password_hash })
        .await
        .context("failed to add staff user")?;
      println!("{}\t{}", user.user_id, user.email);
    }
    Command::HashPassword => println!("{}", hash_password(&read_password()?)?),
  }

  Ok(())
}

async fn open(config: &Path) -> anyhow::Result<(ServerConfig, SqliteStore)> {
  let cfg = ServerConfig::load(config)?;
  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;
  Ok((cfg, store))
}

async fn serve(cfg: ServerConfig, store: SqliteStore) -> anyhow::Result<()> {
  let (changes, subscriber) = broadcast::channel::<ChangeEvent>(cfg.change_buffer.max(1));
  spawn_change_log(subscriber);

  let app = hirebot_api::api_router(AppState::new(Arc::new(store), changes))
    .layer(TraceLayer::new_for_http());
  let address = cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Delivery to external subscribers is not wired up; log what would go out.
/// The task ends once every sender is dropped.
fn spawn_change_log(mut subscriber: broadcast::Receiver<ChangeEvent>) -> JoinHandle<()> {
  tokio::spawn(async move {
    loop {
      match subscriber.recv().await {
        Ok(event) => tracing::info!(
          kind = %event.kind,
          resource_id = %event.resource_id,
          company_id = %event.company_id,
          change = ?event.change,
          "change notification"
        ),
        Err(broadcast::error::RecvError::Lagged(n)) => {
          tracing::warn!(skipped = n, "change log lagged");
        }
        Err(broadcast::error::RecvError::Closed) => break,
      }
    }
  })
}

fn hash_password(password: &str) -> anyhow::Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string(),
  )
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  eprint!("Password: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}

#[cfg(test)]
mod tests {
  use hirebot_core::{change::Change, kind::Kind};

  use super::*;

  fn event() -> ChangeEvent {
    ChangeEvent {
      kind:        Kind::Benefit,
      resource_id: Uuid::new_v4(),
      company_id:  Uuid::new_v4(),
      change:      Change::Created,
    }
  }

  #[tokio::test]
  async fn change_log_drains_and_stops_when_senders_close() {
    let (changes, subscriber) = broadcast::channel::<ChangeEvent>(4);
    let task = spawn_change_log(subscriber);

    changes.send(event()).unwrap();
    changes.send(event()).unwrap();
    drop(changes);

    task.await.unwrap();
  }

  #[tokio::test]
  async fn change_log_survives_lagging() {
    let (changes, subscriber) = broadcast::channel::<ChangeEvent>(1);
    for _ in 0..3 {
      changes.send(event()).unwrap();
    }
    let task = spawn_change_log(subscriber);
    drop(changes);

    task.await.unwrap();
  }

  #[test]
  fn hashed_password_verifies() {
    use argon2::{PasswordHash, PasswordVerifier};

    let hash = hash_password("secret").unwrap();
    let parsed = PasswordHash::new(&hash).unwrap();
    assert!(Argon2::default().verify_password(b"secret", &parsed).is_ok());
    assert!(Argon2::default().verify_password(b"wrong", &parsed).is_err());
  }
}
