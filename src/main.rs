mod api;
mod commands;
mod config;
mod output;
mod session;
mod state;

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;
use zeroize::Zeroize;

use api::types::{Credentials, ItemInput};
use api::ApiError;
use config::{Config, SessionBackend};
use session::{KeychainStorage, MemoryStorage, SessionError, SessionStorage, SessionStore};
use state::AppState;

mod cli {
    use clap::{Parser, Subcommand};

    use crate::config::{SessionBackend, DEFAULT_API_URL, DEFAULT_KEYCHAIN_SERVICE};

    #[derive(Parser, Debug)]
    #[command(name = "sheets-manager", version, about = "Manage items in a Sheets Manager backend")]
    pub struct Args {
        /// Backend origin (API paths start with /api/)
        #[arg(long, global = true, env = "SHEETS_API_URL", default_value = DEFAULT_API_URL)]
        pub api_url: String,

        /// Keychain service the session is stored under
        #[arg(long, global = true, env = "SHEETS_KEYCHAIN_SERVICE", default_value = DEFAULT_KEYCHAIN_SERVICE)]
        pub keychain_service: String,

        /// Where to keep the session between commands
        #[arg(long, global = true, env = "SHEETS_SESSION_STORE", value_enum, default_value_t = SessionBackend::Keychain)]
        pub session_store: SessionBackend,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Subcommand, Debug)]
    pub enum Command {
        /// Log in and remember the session
        Login {
            username: String,
            /// Read the password from the first line of stdin instead of prompting
            #[arg(long)]
            password_stdin: bool,
        },
        /// Forget the stored session
        Logout,
        /// Show who is logged in
        Status,
        /// List all items
        List,
        /// Show one item
        Get { id: u64 },
        /// Create an item
        Create {
            #[arg(long)]
            name: String,
            #[arg(long, default_value = "")]
            description: String,
        },
        /// Replace an item's name and description
        Update {
            id: u64,
            #[arg(long)]
            name: String,
            /// Replaces the current description; omitted means empty
            #[arg(long, default_value = "")]
            description: String,
        },
        /// Delete an item
        Delete {
            id: u64,
            /// Skip the confirmation prompt
            #[arg(long, short)]
            yes: bool,
        },
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("Failed to read input: {0}")]
    Input(#[from] io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env from the working directory when present
    let _ = dotenvy::dotenv();

    env_logger::init();

    let args = cli::Args::parse();
    let config = Config::new(&args.api_url, &args.keychain_service, args.session_store);
    log::debug!("Using API at {}", config.api_base_url);

    let session = match open_session(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let state = Arc::new(AppState::new(&config.api_base_url, Arc::new(session)));
    let watcher = state.watch_session();

    let result = run(&state, args.command).await;
    watcher.abort();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Open the session store on the configured backend, falling back to memory
/// when the OS keychain cannot be reached.
fn open_session(config: &Config) -> Result<SessionStore, SessionError> {
    let storage: Box<dyn SessionStorage> = match config.session_backend {
        SessionBackend::Memory => Box::new(MemoryStorage::new()),
        SessionBackend::Keychain => match KeychainStorage::new(&config.keychain_service) {
            Ok(keychain) => Box::new(keychain),
            Err(e) => {
                log::warn!("Keychain unavailable ({}), session will not persist", e);
                Box::new(MemoryStorage::new())
            }
        },
    };
    SessionStore::open(storage)
}

async fn run(state: &AppState, command: cli::Command) -> Result<(), CliError> {
    use cli::Command;

    match command {
        Command::Login {
            username,
            password_stdin,
        } => {
            let password = if password_stdin {
                read_stdin_line()?
            } else {
                rpassword::prompt_password("Password: ")?
            };
            let credentials = Credentials::new(username, password);
            commands::login(state, &credentials).await?;
            println!("Logged in as {}", credentials.username);
        }
        Command::Logout => {
            commands::logout(state).await?;
            println!("Logged out");
        }
        Command::Status => {
            let status = commands::status(state).await;
            println!("{}", output::status_line(&status));
        }
        Command::List => {
            commands::load_items(state).await?;
            output::print_items(&state.items().await);
        }
        Command::Get { id } => {
            let item = commands::show_item(state, id).await?;
            output::print_item(&item);
        }
        Command::Create { name, description } => {
            let item = commands::create_item(state, &ItemInput::new(name, description)).await?;
            println!("Created item {}", item.id);
            output::print_item(&item);
        }
        Command::Update {
            id,
            name,
            description,
        } => {
            let item = commands::update_item(state, id, &ItemInput::new(name, description)).await?;
            println!("Updated item {}", item.id);
            output::print_item(&item);
        }
        Command::Delete { id, yes } => {
            if !yes {
                let item = commands::show_item(state, id).await?;
                let prompt = format!(
                    "Delete \"{}\"? This action cannot be undone.",
                    item.name
                );
                if !confirm(&prompt)? {
                    println!("Cancelled");
                    return Ok(());
                }
            }
            commands::delete_item(state, id).await?;
            println!("Deleted item {}", id);
        }
    }
    Ok(())
}

/// First line of stdin without its line ending.
fn read_stdin_line() -> io::Result<String> {
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let value = line.trim_end_matches(['\r', '\n']).to_string();
    line.zeroize();
    Ok(value)
}

fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
