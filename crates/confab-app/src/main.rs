//! Confab host binary - composition root.
//!
//! Assembles the widget engine for a terminal host:
//! 1. Load configuration from TOML
//! 2. Build the HTTP responder against the configured endpoint
//! 3. Assemble the widget with speechless capabilities (a terminal has no
//!    recognizer or synthesizer to offer)
//! 4. Act as the rendering-layer collaborator: print assistant and system
//!    messages as they land, read user lines from stdin, and feed them
//!    through the send path

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use confab_client::HttpResponder;
use confab_core::config::WidgetConfig;
use confab_core::events::SessionEvent;
use confab_core::types::{MessageStatus, Sender};
use confab_voice::{UnsupportedRecognizer, UnsupportedSynthesizer};
use confab_widget::AssistantWidget;

mod cli;

use cli::CliArgs;

/// Print assistant replies and system notices as they land in the history.
///
/// Pending placeholders are skipped; their animation frames are not worth a
/// terminal line each. This task is the stand-in for a real rendering layer.
async fn message_printer(widget: Arc<AssistantWidget>, markup: bool) {
    let mut events = widget.subscribe();
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "printer lagged behind session events");
                continue;
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        };

        let id = match event {
            SessionEvent::MessageAppended { id } | SessionEvent::MessageUpdated { id } => id,
            _ => continue,
        };
        let Some(message) = widget.store().message(id) else {
            continue;
        };

        match message.sender() {
            Sender::User => {}
            Sender::System => println!("  [notice] {}", message.text),
            Sender::Assistant => match message.status() {
                Some(MessageStatus::Pending) | None => {}
                Some(MessageStatus::Loaded) => {
                    if markup {
                        println!("assistant> {}", widget.render_markup(&message.text));
                    } else {
                        println!("assistant> {}", message.text);
                    }
                }
                Some(MessageStatus::Failed) => println!("assistant> {}", message.text),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Tracing.
    let default_filter = args.resolve_log_level().unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    tracing::info!("Starting Confab v{}", env!("CARGO_PKG_VERSION"));

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = WidgetConfig::load_or_default(&config_file);
    config.responder.endpoint = args.resolve_endpoint(&config.responder.endpoint);
    tracing::info!(
        path = %config_file.display(),
        endpoint = %config.responder.endpoint,
        "Configuration resolved"
    );

    // Engine. A terminal host has no speech stack to offer, so both
    // capabilities report unavailable and voice gestures degrade to notices.
    let responder = Arc::new(HttpResponder::new(config.responder.endpoint.clone()));
    let widget = AssistantWidget::new(
        &config,
        responder,
        Arc::new(UnsupportedRecognizer::new()),
        Arc::new(UnsupportedSynthesizer::new()),
    );

    tokio::spawn(message_printer(Arc::clone(&widget), args.markup));

    // The host opens the panel immediately; the greeting lands first.
    widget.open();

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"you> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim().to_string();
        if line == ":quit" || line == ":q" {
            break;
        }

        match widget.send(&line) {
            // Wait for the reply before prompting again; a second in-flight
            // send would be refused anyway.
            Ok(handle) => {
                if let Some(err) = handle.outcome().await.error() {
                    tracing::debug!(error = %err, "request failed");
                }
            }
            Err(e) => tracing::debug!(error = %e, "send rejected"),
        }
    }

    tracing::info!("Confab host exiting");
    Ok(())
}
