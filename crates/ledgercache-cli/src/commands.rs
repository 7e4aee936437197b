use std::io::{self, BufRead, Write};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{SecondsFormat, Utc};
use tracing::{info, warn};

use ledgercache_core::models::{NewTransaction, NewUser, UserUpdate};
use ledgercache_core::sync::StartupOutcome;
use ledgercache_core::{ApiClient, CacheManager, Config, Session, SessionContext, SyncService};

use crate::output;
use crate::Command;

pub struct App {
    config: Config,
    session: Session,
    sync: SyncService<ApiClient>,
}

impl App {
    pub fn new(config: Config, api_url: Option<&str>) -> Result<Self> {
        let cache_dir = config.cache_dir()?;
        let cache = CacheManager::new(cache_dir)?;

        let mut session = Session::new(cache.store());
        if let Err(e) = session.load() {
            warn!(error = %e, "Ignoring unreadable session");
        }

        let url = match api_url {
            Some(url) => url.to_string(),
            None => config.api_url(),
        };
        let api = ApiClient::new(&url)?;
        let sync = SyncService::new(api, cache, config.sync_options());

        Ok(Self {
            config,
            session,
            sync,
        })
    }

    pub async fn run(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Login { username } => self.login(username).await,
            Command::Register { username, email } => self.register(username, email).await,
            Command::Logout => self.logout(),
            Command::Transactions { json } => self.transactions(json).await,
            Command::Summary => self.summary().await,
            Command::Add {
                kind,
                amount,
                description,
                category,
                date,
            } => {
                let session = self.require_session()?;
                let transaction = NewTransaction {
                    user_id: session.user_id(),
                    kind,
                    amount,
                    description,
                    category,
                    date: Some(date.unwrap_or_else(now_utc)),
                };
                let created = self.sync.create_transaction(&session, transaction).await?;
                println!("Added transaction {}", output::format_id(created.id));
                Ok(())
            }
            Command::Edit {
                id,
                kind,
                amount,
                description,
                category,
                date,
            } => {
                let session = self.require_session()?;
                let existing = self
                    .sync
                    .user_transactions(&session)
                    .await
                    .data
                    .into_iter()
                    .find(|t| t.id == Some(id))
                    .ok_or_else(|| anyhow!("Transaction {} not found", id))?;

                let mut update = existing.to_replay(session.user_id());
                update.kind = kind.unwrap_or(update.kind);
                update.amount = amount.unwrap_or(update.amount);
                update.description = description.or(update.description);
                update.category = category.or(update.category);
                update.date = date.or(update.date);

                self.sync.update_transaction(&session, id, update).await?;
                println!("Updated transaction {}", id);
                Ok(())
            }
            Command::Delete { id } => {
                let session = self.require_session()?;
                self.sync.delete_transaction(&session, id).await?;
                println!("Deleted transaction {}", id);
                Ok(())
            }
            Command::Profile {
                username,
                email,
                password,
            } => self.profile(username, email, password).await,
            Command::Backup => {
                self.sync.probe().await;
                let report = self.sync.backup_all(self.session.context()).await;
                output::print_backup(&report);
                Ok(())
            }
            Command::Restore => {
                let report = self.sync.restore_data(self.session.context()).await;
                output::print_restore(&report);
                Ok(())
            }
            Command::Status => self.status().await,
            Command::ClearCache => {
                self.sync.cache().clear()?;
                println!("Local backup cleared");
                Ok(())
            }
            Command::Watch => self.watch().await,
        }
    }

    fn require_session(&self) -> Result<SessionContext> {
        self.session
            .context()
            .cloned()
            .ok_or_else(|| anyhow!("Not logged in. Run `ledgercache login` first."))
    }

    async fn login(&mut self, username: Option<String>) -> Result<()> {
        let username = match username.or_else(|| self.config.last_username.clone()) {
            Some(name) => name,
            None => prompt("Username: ")?,
        };
        let password = rpassword::prompt_password(format!("Password for {}: ", username))?;

        let context = self.sync.login(&username, &password).await?;
        self.start_session(context).await
    }

    async fn register(&mut self, username: String, email: String) -> Result<()> {
        let password = rpassword::prompt_password("Password: ")?;
        let confirm = rpassword::prompt_password("Confirm password: ")?;
        if password != confirm {
            bail!("Passwords do not match");
        }

        let context = self
            .sync
            .register(NewUser {
                username,
                email,
                password,
            })
            .await?;
        self.start_session(context).await
    }

    async fn start_session(&mut self, context: SessionContext) -> Result<()> {
        println!("Logged in as {}", context.username());
        self.config.last_username = context.user.username().map(str::to_string);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        self.sync.probe().await;
        let report = self.sync.backup_all(Some(&context)).await;
        output::print_backup(&report);

        self.session.begin(context)
    }

    fn logout(&mut self) -> Result<()> {
        self.session.clear()?;
        println!("Logged out. The local backup is kept.");
        Ok(())
    }

    async fn transactions(&self, json: bool) -> Result<()> {
        let session = self.require_session()?;
        let loaded = self.sync.user_transactions(&session).await;

        if json {
            println!("{}", serde_json::to_string_pretty(&loaded.data)?);
            return Ok(());
        }

        output::print_transactions(&loaded.data);
        if loaded.is_cached() {
            println!("\n(backend unavailable, showing local backup)");
        }
        Ok(())
    }

    async fn summary(&self) -> Result<()> {
        let session = self.require_session()?;
        let summary = self.sync.summary(&session).await;
        output::print_summary(&summary.data);
        if summary.is_cached() {
            println!("\n(computed from local backup)");
        }
        Ok(())
    }

    async fn profile(
        &mut self,
        username: Option<String>,
        email: Option<String>,
        password: bool,
    ) -> Result<()> {
        let session = self.require_session()?;

        let password = if password {
            Some(rpassword::prompt_password("New password: ")?)
        } else {
            None
        };
        let update = UserUpdate {
            username,
            email,
            password,
        };

        if update.is_empty() {
            output::print_profile(&session);
            return Ok(());
        }

        let updated = self.sync.update_profile(&session, &update).await?;
        output::print_profile(&updated);
        self.session.begin(updated)
    }

    async fn status(&self) -> Result<()> {
        let connectivity = self.sync.probe().await;
        let cache = self.sync.cache();
        let ages = cache.get_cache_ages();

        println!("Backend:       {} ({})", self.sync.api().base_url(), connectivity);
        match self.session.context() {
            Some(session) => println!("Logged in as:  {}", session.username()),
            None => println!("Logged in as:  -"),
        }
        println!(
            "Users:         {} cached, updated {}",
            cache.stored_users().len(),
            ages.users_age()
        );
        println!(
            "Transactions:  {} cached, updated {}",
            cache.stored_transactions().len(),
            ages.transactions_age()
        );
        if cache.any_stale() {
            println!("\nBackup is stale; run `ledgercache backup`.");
        }
        Ok(())
    }

    async fn watch(&self) -> Result<()> {
        let session = self.require_session()?;

        let mut status = self.sync.subscribe();
        tokio::spawn(async move {
            while status.changed().await.is_ok() {
                let current = *status.borrow_and_update();
                info!(
                    phase = %current.phase,
                    connectivity = %current.connectivity,
                    "Sync status changed"
                );
            }
        });

        match self.sync.startup(Some(&session)).await {
            StartupOutcome::Restored(report) => output::print_restore(&report),
            StartupOutcome::AlreadyStarted(connectivity) => {
                println!("Backend is {}", connectivity);
            }
        }

        let interval = self.sync.options().backup_interval;
        let auto = self.sync.spawn_auto_backup(session, interval);
        println!("Backing up every {}s. Press Ctrl-C to stop.", interval.as_secs());

        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
        info!("Stop requested");

        if let Some(report) = auto.shutdown().await {
            output::print_backup(&report);
        }
        Ok(())
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let value = line.trim().to_string();
    if value.is_empty() {
        bail!("No input given");
    }
    Ok(value)
}

fn now_utc() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
