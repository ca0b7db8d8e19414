//! Basic tsquery Example
//!
//! Logs in, queues a batch of requests before the connection is up, then
//! projects a few responses into typed entities.
//!
//! Run with: TSQ_USER=serveradmin TSQ_PASSWORD=secret cargo run --example basic

use std::env;

use anyhow::{bail, Context, Result};
use tokio::sync::broadcast;

use tsquery_client::{Connection, ConnectionConfig, Event};
use tsquery_model::{Client, FromGroup, VirtualServer};
use tsquery_protocol::{Request, DEFAULT_PORT};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let host = env::var("TSQ_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = match env::var("TSQ_PORT") {
        Ok(port) => port.parse().context("TSQ_PORT is not a port number")?,
        Err(_) => DEFAULT_PORT,
    };
    let user = env::var("TSQ_USER").unwrap_or_else(|_| "serveradmin".to_string());
    let password = env::var("TSQ_PASSWORD").context("TSQ_PASSWORD is not set")?;

    println!("tsquery Basic Example\n");

    let connection = Connection::new(ConnectionConfig::default());
    let events = tokio::spawn(log_events(connection.subscribe()));

    // Everything below is queued before the handshake finishes
    let connected = connection.connect(format!("{}:{}", host, port));
    let login = connection.submit(Request::login(&user, &password)?)?;
    let selected = connection.submit(Request::use_port(9987))?;
    let bans = connection.submit(Request::banlist())?;
    let clients = connection.submit(Request::clientlist())?;
    let channels = connection.submit(Request::channellist())?;

    connected.await?;
    match login.await {
        Some(message) if message.is_ok() => {}
        Some(message) => bail!("Login failed: {}", message.message().unwrap_or("?")),
        None => bail!("Connection lost during login"),
    }
    if let Some(message) = selected.await {
        println!("use port=9987: {}", message.message().unwrap_or("?"));
    }
    for (name, reply) in [("banlist", bans), ("clientlist", clients), ("channellist", channels)] {
        if let Some(message) = reply.await {
            println!("{}: {} groups", name, message.groups().count());
        }
    }

    let version = connection
        .send(Request::version())
        .await?
        .context("No response to version")?;
    if let Some(group) = version.group() {
        println!(
            "\nServer {} (build {}) on {}",
            group.get("version").unwrap_or("?"),
            group.get("build").unwrap_or("?"),
            group.get("platform").unwrap_or("?")
        );
    }

    connection
        .send(Request::servernotifyregister("server", None)?)
        .await?;

    if let Some(message) = connection.send(Request::clientfind("a")?).await? {
        println!("\nClients matching 'a':");
        for client in Client::from_message(&message) {
            println!(
                "  - {} (clid {})",
                client.nickname.as_deref().unwrap_or("?"),
                client.id.unwrap_or_default()
            );
        }
    }

    if let Some(message) = connection.send(Request::serverlist()).await? {
        println!("\nVirtual servers:");
        for server in VirtualServer::from_message(&message) {
            println!(
                "  - {} on port {} ({})",
                server.name.as_deref().unwrap_or("?"),
                server.port.unwrap_or_default(),
                server.status.as_deref().unwrap_or("?")
            );
        }
    }

    connection.send(Request::logout()).await?;
    connection.disconnect().await?;
    connection.close().await?;
    events.abort();

    Ok(())
}

async fn log_events(mut events: broadcast::Receiver<Event>) {
    while let Ok(event) = events.recv().await {
        match event {
            Event::Sent(request) => println!(">> {}", request),
            Event::Received { request, message } => println!(
                "<< {} error id={}",
                request.command(),
                message.id().unwrap_or_default()
            ),
            Event::Notified(notification) => println!("!! notify{}", notification.event()),
            Event::Banned(message) => println!("!! banned: {:?}", message.extra_message()),
            _ => {}
        }
    }
}
