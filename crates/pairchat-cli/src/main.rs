//! # pairchat
//!
//! Terminal client for the pairing chat server: account commands, the
//! interactive chat, and post-chat ratings.

#![deny(unsafe_code)]

mod chat;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use pairchat_api::{ApiClient, Rating};
use pairchat_client::{AuthShell, CredentialStore, SessionClient, SessionConfig, WsConnector};
use pairchat_core::{Credential, SessionId};
use pairchat_settings::PairchatSettings;

/// Pairing chat client.
#[derive(Parser, Debug)]
#[command(name = "pairchat", version, about = "Chat with a randomly paired partner")]
struct Cli {
    /// HTTP base URL of the server (overrides settings).
    #[arg(long, global = true)]
    http_url: Option<String>,

    /// WebSocket base URL of the server (overrides settings).
    #[arg(long, global = true)]
    ws_url: Option<String>,

    /// Directory holding settings and the stored credential.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log filter, e.g. `info` or `pairchat_client=debug`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account.
    Register(Credentials),
    /// Log in and store the credential.
    Login(Credentials),
    /// Forget the stored credential.
    Logout,
    /// Join the pairing queue and chat.
    Chat {
        /// Store each finished conversation with the server.
        #[arg(long)]
        save: bool,
    },
    /// Rate a finished conversation.
    Rate {
        /// Pairing session to rate.
        session_id: String,
        /// Score from 1 to 5.
        #[arg(value_parser = clap::value_parser!(u8).range(1..=5))]
        score: u8,
        /// You think the partner was a human.
        #[arg(long, conflicts_with = "ai")]
        human: bool,
        /// You think the partner was an AI.
        #[arg(long)]
        ai: bool,
    },
    /// Show a stored conversation.
    Session {
        /// Pairing session to fetch.
        session_id: String,
    },
}

#[derive(Args, Debug)]
struct Credentials {
    /// Account name.
    username: String,
    /// Account password.
    #[arg(long, env = "PAIRCHAT_PASSWORD", hide_env_values = true)]
    password: String,
}

impl Cli {
    /// Apply command-line overrides on top of loaded settings.
    fn apply_to(&self, settings: &mut PairchatSettings) {
        if let Some(ref url) = self.http_url {
            settings.server.http_url.clone_from(url);
        }
        if let Some(ref url) = self.ws_url {
            settings.server.ws_url.clone_from(url);
        }
        if let Some(ref dir) = self.data_dir {
            settings.data_dir = Some(dir.clone());
        }
        if let Some(ref level) = self.log_level {
            settings.logging.level.clone_from(level);
        }
    }
}

fn load_settings(cli: &Cli) -> Result<PairchatSettings> {
    let path = match cli.data_dir {
        Some(ref dir) => dir.join("settings.json"),
        None => pairchat_settings::settings_path(),
    };
    let mut settings = pairchat_settings::load_settings_from_path(&path)
        .with_context(|| format!("failed to load settings from {}", path.display()))?;
    cli.apply_to(&mut settings);
    settings.validate().context("invalid settings")?;
    Ok(settings)
}

fn data_dir(settings: &PairchatSettings) -> PathBuf {
    settings
        .data_dir
        .clone()
        .unwrap_or_else(pairchat_settings::default_data_dir)
}

fn build_shell(settings: &PairchatSettings) -> AuthShell {
    let client = SessionClient::new(
        Arc::new(WsConnector),
        SessionConfig::from_settings(settings),
    );
    AuthShell::new(CredentialStore::new(&data_dir(settings)), client)
}

fn require_login(shell: &AuthShell) -> Result<(Credential, String)> {
    let Some(credential) = shell.credential() else {
        bail!("not logged in; run `pairchat login <username>` first");
    };
    Ok((credential, shell.username().unwrap_or_default()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    if settings.logging.json {
        pairchat_core::logging::init_json_subscriber(&settings.logging.level);
    } else {
        pairchat_core::logging::init_subscriber(&settings.logging.level);
    }
    tracing::debug!(
        http = %settings.server.http_url,
        ws = %settings.server.ws_url,
        "settings loaded"
    );

    let api = ApiClient::new(settings.server.http_url.clone());
    let mut shell = build_shell(&settings);

    match cli.command {
        Command::Register(ref creds) => {
            let resp = api.register(&creds.username, &creds.password).await?;
            println!("{}", resp.message);
        }
        Command::Login(ref creds) => {
            let _ = shell
                .sign_in(&api, &creds.username, &creds.password)
                .await?;
            println!("logged in as {}", creds.username);
        }
        Command::Logout => {
            shell.on_logged_out().await?;
            println!("logged out");
        }
        Command::Chat { save } => {
            chat::run(&mut shell, &api, &chat::ChatOptions { save }).await?;
        }
        Command::Rate {
            ref session_id,
            score,
            human,
            ai,
        } => {
            if !human && !ai {
                bail!("say whether the partner seemed --human or --ai");
            }
            let (credential, user) = require_login(&shell)?;
            let rating = Rating {
                session_id: SessionId::from(session_id.as_str()),
                user,
                rating: score,
                is_human_guess: human,
            };
            let receipt = api.submit_rating(&credential, &rating).await?;
            println!("{} ({})", receipt.message, receipt.rating_id);
        }
        Command::Session { ref session_id } => {
            let (credential, _) = require_login(&shell)?;
            let record = api
                .get_chat_session(&credential, &SessionId::from(session_id.as_str()))
                .await?;
            println!(
                "{} with {} and {} at {}{}",
                record.session_id,
                record.user1,
                record.user2,
                record.created_at,
                if record.is_ai { " (ai)" } else { "" }
            );
            for entry in &record.messages {
                println!("  {}", render::entry_line(entry));
            }
        }
    }

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_override_settings() {
        let cli = Cli::try_parse_from([
            "pairchat",
            "--ws-url",
            "ws://chat.example",
            "--log-level",
            "debug",
            "logout",
        ])
        .unwrap();
        let mut settings = PairchatSettings::default();
        cli.apply_to(&mut settings);
        assert_eq!(settings.server.ws_url, "ws://chat.example");
        assert_eq!(settings.server.http_url, "http://localhost:8000");
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn rate_score_is_range_checked() {
        assert!(Cli::try_parse_from(["pairchat", "rate", "s1", "6", "--ai"]).is_err());
        assert!(Cli::try_parse_from(["pairchat", "rate", "s1", "0", "--ai"]).is_err());
        let cli = Cli::try_parse_from(["pairchat", "rate", "s1", "5", "--human"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Rate { score: 5, human: true, ai: false, .. }
        ));
    }

    #[test]
    fn rate_rejects_both_guesses() {
        assert!(Cli::try_parse_from(["pairchat", "rate", "s1", "3", "--human", "--ai"]).is_err());
    }

    #[test]
    fn login_takes_password_flag() {
        let cli =
            Cli::try_parse_from(["pairchat", "login", "alice", "--password", "pw"]).unwrap();
        let Command::Login(creds) = cli.command else {
            panic!("expected login");
        };
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.password, "pw");
    }
}
