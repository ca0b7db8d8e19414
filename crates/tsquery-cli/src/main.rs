//! tsq - ServerQuery CLI client
//!
//! Interactive command-line client for TeamSpeak 3 ServerQuery.
//!
//! # Usage
//!
//! ```bash
//! # Connect to local server
//! tsq
//!
//! # Log in and select the virtual server on voice port 9987
//! tsq --host ts.example.com --user serveradmin --password secret --server-port 9987
//!
//! # Execute single command
//! tsq -u serveradmin -w secret --server-id 1 -c "clientlist -uid"
//! ```

mod input;
mod output;

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use tsquery_client::{Connection, ConnectionConfig, ConnectionState, Event, ThrottleConfig};
use tsquery_protocol::{Message, Request, DEFAULT_PORT};

/// ServerQuery Command Line Interface
#[derive(Parser, Debug)]
#[command(name = "tsq")]
#[command(author, version, about = "tsq - TeamSpeak 3 ServerQuery client")]
struct Args {
    /// Server hostname
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "TSQ_HOST")]
    host: String,

    /// ServerQuery port
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "TSQ_PORT")]
    port: u16,

    /// Query login name
    #[arg(short, long, env = "TSQ_USER", requires = "password")]
    user: Option<String>,

    /// Query login password
    #[arg(short = 'w', long, env = "TSQ_PASSWORD", requires = "user")]
    password: Option<String>,

    /// Select the virtual server listening on this voice port
    #[arg(long, env = "TSQ_SERVER_PORT", conflicts_with = "server_id")]
    server_port: Option<u16>,

    /// Select the virtual server with this id
    #[arg(long, env = "TSQ_SERVER_ID")]
    server_id: Option<u32>,

    /// Execute command and exit
    #[arg(short, long)]
    command: Option<String>,

    /// Connect timeout in milliseconds
    #[arg(long, default_value_t = 10_000, env = "TSQ_TIMEOUT")]
    timeout: u64,

    /// Write commands without waiting for each response
    #[arg(long)]
    parallel: bool,

    /// Stay under the server's flood limit (10 commands / 3 seconds)
    #[arg(long)]
    throttle: bool,

    /// Print responses as JSON
    #[arg(long)]
    json: bool,

    /// Quiet mode (no banner)
    #[arg(short, long)]
    quiet: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TSQ_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

impl Args {
    fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn config(&self) -> ConnectionConfig {
        let config = ConnectionConfig::default()
            .with_connect_timeout(Duration::from_millis(self.timeout))
            .with_parallel_requests(self.parallel);
        if self.throttle {
            config.with_throttle(ThrottleConfig::server_default())
        } else {
            config
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.to_lowercase()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let connection = Connection::new(args.config());
    let notifications = tokio::spawn(print_events(connection.subscribe(), args.json));

    establish(&connection, &args).await?;

    if !args.quiet && args.command.is_none() {
        let login = match &args.user {
            Some(user) => format!(" as {}", user),
            None => String::new(),
        };
        println!(
            "{}",
            format!(
                r#"
  tsq  Connected to {}{}
       Type 'help' for commands, 'quit' to exit
"#,
                args.endpoint(),
                login
            )
            .cyan()
        );
    }

    // Single command mode
    if let Some(line) = &args.command {
        let result = execute(&connection, line, args.json).await;
        connection.close().await?;
        notifications.abort();
        let message = result?;
        if !message.is_ok() {
            bail!("Command failed with id {}", message.error().get("id").unwrap_or("?"));
        }
        return Ok(());
    }

    // Interactive mode
    let mut rl = DefaultEditor::new()?;
    let history_path = dirs_next::home_dir()
        .map(|p| p.join(".tsq_history"))
        .unwrap_or_default();

    let _ = rl.load_history(&history_path);

    loop {
        let prompt = format!("{}> ", "tsq".green());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Handle local commands
                match line.to_lowercase().as_str() {
                    "quit" | "exit" => break,
                    "help" => {
                        print_help();
                        continue;
                    }
                    "clear" => {
                        print!("\x1B[2J\x1B[1;1H");
                        continue;
                    }
                    "status" => {
                        print_status(&connection);
                        continue;
                    }
                    _ => {}
                }

                if let Err(e) = execute(&connection, line, args.json).await {
                    eprintln!("{} {}", "Error:".red(), e);
                }

                // Try to reconnect
                if !connection.is_ready() {
                    match establish(&connection, &args).await {
                        Ok(()) => println!("{}", "Reconnected.".yellow()),
                        Err(e) => {
                            eprintln!("{} {:#}", "Connection lost.".red(), e);
                            break;
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);
    connection.close().await?;
    notifications.abort();
    Ok(())
}

/// Connect, log in and select a virtual server as requested.
async fn establish(connection: &Connection, args: &Args) -> Result<()> {
    let endpoint = args.endpoint();
    connection
        .connect(endpoint.clone())
        .await
        .with_context(|| format!("Failed to connect to {}", endpoint))?;

    if let (Some(user), Some(password)) = (&args.user, &args.password) {
        let message = send(connection, Request::login(user, password)?).await?;
        if !message.is_ok() {
            bail!("Login failed: {}", message.message().unwrap_or("unknown error"));
        }
    }

    let selection = match (args.server_port, args.server_id) {
        (Some(port), _) => Some(Request::use_port(port)),
        (None, Some(id)) => Some(Request::use_id(id)),
        (None, None) => None,
    };
    if let Some(request) = selection {
        let message = send(connection, request).await?;
        if !message.is_ok() {
            bail!(
                "Failed to select virtual server: {}",
                message.message().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

async fn send(connection: &Connection, request: Request) -> Result<Message> {
    let command = request.command().to_string();
    connection
        .send(request)
        .await?
        .with_context(|| format!("No response to '{}', connection lost", command))
}

async fn execute(connection: &Connection, line: &str, json: bool) -> Result<Message> {
    let request = input::parse_line(line)?;
    debug!(request = %request, "Executing");

    let message = send(connection, request).await?;
    output::print_message(&message, json);
    Ok(message)
}

async fn print_events(mut events: broadcast::Receiver<Event>, json: bool) {
    loop {
        match events.recv().await {
            Ok(Event::Notified(notification)) => output::print_notification(&notification, json),
            Ok(Event::Banned(message)) => eprintln!(
                "{} {} {}",
                "Banned:".red().bold(),
                message.message().unwrap_or_default(),
                message.extra_message().unwrap_or_default()
            ),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "Fell behind on events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_status(connection: &Connection) {
    let state = connection.state();
    let state = match state {
        ConnectionState::Ready => state.to_string().green(),
        ConnectionState::Banned => state.to_string().red(),
        _ => state.to_string().yellow(),
    };
    println!("state      {}", state);
    println!("logged in  {}", connection.is_logged_in());
    if let (Some(local), Some(peer)) = (connection.local_addr(), connection.peer_addr()) {
        println!("local      {}", local);
        println!("peer       {}", peer);
    }
}

fn print_help() {
    println!(
        r#"
{}

  <command> [key=value ...] [-option ...]

  Values containing spaces may be double-quoted; escaping is automatic.

{}
  login client_login_name=<name> client_login_password=<pw>
  use sid=<id> | use port=<port>
  serverlist | serverinfo
  channellist [-topic -flags] | channelinfo cid=<id>
  clientlist [-uid -away -voice] | clientinfo clid=<id>
  clientfind pattern=<name>
  clientpoke clid=<id> msg=<text>
  servernotifyregister event=<server|channel|textserver|...> [id=<cid>]
  whoami | version

{}
  help                                   Show this help
  status                                 Connection state
  clear                                  Clear screen
  quit/exit                              Disconnect and exit
"#,
        "tsq Commands".cyan().bold(),
        "Common server commands".yellow().bold(),
        "Local".yellow().bold(),
    );
}

// Minimal dirs_next replacement for home directory
mod dirs_next {
    use std::path::PathBuf;

    pub fn home_dir() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
    }
}
