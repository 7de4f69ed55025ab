//! Application state and login flow for the command line front end.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use chaladshare_core::auth::{CredentialStore, Session};
use chaladshare_core::friends::{NoticeKind, Notification};
use chaladshare_core::{ApiClient, Config, TabCoordinator};

/// Environment variable holding the login password
const PASSWORD_ENV: &str = "CHALADSHARE_PASSWORD";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    LoggingIn,
    Quitting,
}

pub struct App {
    pub config: Config,
    pub session: Session,
    pub api: ApiClient,
    pub coordinator: TabCoordinator,
    pub state: AppState,
    login_email: Option<String>,
}

impl App {
    pub fn new(config: Config, email: Option<String>) -> Result<Self> {
        let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
        debug!(?cache_dir, "Cache directory configured");

        let mut session = Session::new(cache_dir);
        match session.load() {
            Ok(found) => debug!(found, "Session loaded"),
            Err(e) => warn!(error = %e, "Failed to load session"),
        }

        let mut api = ApiClient::new(&config.api_base_url, config.request_timeout_secs)?;
        if let Some(cookie) = session.cookie() {
            api.set_session_cookie(cookie)?;
        }

        let coordinator = TabCoordinator::new(Arc::new(api.clone()), config.controller_settings());
        let login_email = email.or_else(|| config.last_email.clone());

        Ok(Self {
            config,
            session,
            api,
            coordinator,
            state: AppState::Normal,
            login_email,
        })
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub fn is_authenticated(&self) -> bool {
        self.session.is_valid()
    }

    /// Log in, prompting for whatever the environment and keychain do not supply
    pub async fn login_interactive(&mut self) -> Result<()> {
        self.state = AppState::LoggingIn;
        println!("\n=== ChaladShare Login ===\n");

        let email = match self.login_email.clone() {
            Some(email) if !email.trim().is_empty() => email,
            _ => Self::prompt_email()?,
        };

        let password = match std::env::var(PASSWORD_ENV) {
            Ok(password) if !password.is_empty() => password,
            _ if CredentialStore::has_credentials(&email) => {
                CredentialStore::get_password(&email)?
            }
            _ => Self::prompt_password()?,
        };

        println!("Logging in as {}...", email);
        self.login(&email, &password).await?;
        println!("Login successful!\n");
        Ok(())
    }

    /// Log in again without prompting, using stored credentials only
    async fn login_silently(&mut self) -> Result<()> {
        let email = self
            .login_email
            .clone()
            .ok_or_else(|| anyhow::anyhow!("No email to log in with"))?;
        let password = match std::env::var(PASSWORD_ENV) {
            Ok(password) if !password.is_empty() => password,
            _ => CredentialStore::get_password(&email)?,
        };
        self.login(&email, &password).await
    }

    async fn login(&mut self, email: &str, password: &str) -> Result<()> {
        let session_data = match self.api.authenticate(email, password).await {
            Ok(data) => data,
            Err(e) => {
                error!(error = %e, "Login failed");
                return Err(e);
            }
        };

        if let Err(e) = CredentialStore::store(email, password) {
            warn!(error = %e, "Failed to store credentials");
        }

        self.config.last_email = Some(email.to_string());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        self.api.set_session_cookie(&session_data.cookie)?;
        self.session.update(session_data);
        if let Err(e) = self.session.save() {
            warn!(error = %e, "Failed to save session");
        }

        self.login_email = Some(email.to_string());
        self.state = AppState::Normal;
        info!("Login successful");
        Ok(())
    }

    pub async fn logout(&mut self) -> Result<()> {
        if self.session.is_valid() {
            if let Err(e) = self.api.logout().await {
                warn!(error = %e, "Server logout failed");
            }
        }
        self.api.clear_session();
        self.session.clear().context("Failed to remove saved session")?;

        if let Some(ref email) = self.login_email {
            if CredentialStore::has_credentials(email) {
                CredentialStore::delete(email)?;
            }
        }
        info!("Logged out");
        Ok(())
    }

    fn prompt_email() -> Result<String> {
        print!("Email: ");
        io::stdout().flush()?;

        let mut email = String::new();
        io::stdin().read_line(&mut email)?;
        Ok(email.trim().to_string())
    }

    fn prompt_password() -> Result<String> {
        let password = rpassword::prompt_password("Password: ")?;
        Ok(password)
    }

    // =========================================================================
    // Friends controller
    // =========================================================================

    /// Point the controller at the current session
    pub fn connect(&mut self) {
        self.coordinator.reconnect(Arc::new(self.api.clone()));
    }

    /// Print queued notifications. An expired session triggers one silent
    /// re-login; if that fails the app quits.
    pub async fn process_notifications(&mut self) {
        let notices = self.coordinator.drain_notifications();
        let expired = notices.iter().any(|n| n.kind == NoticeKind::SessionExpired);

        for notice in &notices {
            print_notice(notice);
        }

        if expired {
            warn!("Session expired, logging in again");
            match self.login_silently().await {
                Ok(()) => self.connect(),
                Err(e) => {
                    error!(error = %e, "Silent re-login failed");
                    println!("Please run chaladshare again to log in.");
                    self.state = AppState::Quitting;
                }
            }
        }
    }
}

fn print_notice(notice: &Notification) {
    match notice.kind {
        NoticeKind::Info => println!("\n* {}", notice),
        NoticeKind::Error | NoticeKind::SessionExpired => println!("\n! {}", notice),
    }
}
