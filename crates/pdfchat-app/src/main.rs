//! pdfchat binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Install the tracing subscriber
//! 3. Build the HTTP query client and the chat widget with console speech
//! 4. Print every appended message and run the stdin REPL

mod cli;
mod console;

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use pdfchat_chat::{render_message, ChatWidget, HttpQueryClient};
use pdfchat_core::{PdfChatConfig, WidgetEvent};
use pdfchat_speech::{SpeechInput, SpeechOutput};

use cli::{CliArgs, Command, HELP};
use console::{status_line, status_summary, ConsoleSpeechInput, ConsoleSpeechOutput};

/// Print messages, busy/speaking indicators and speech errors as the
/// widget reports them.
async fn print_events(mut rx: broadcast::Receiver<WidgetEvent>) {
    loop {
        match rx.recv().await {
            Ok(WidgetEvent::MessageAppended { message, .. }) => {
                println!("{}", render_message(&message));
            }
            Ok(WidgetEvent::StateChanged { to, .. }) => {
                if let Some(line) = status_line(to) {
                    println!("{line}");
                }
            }
            Ok(WidgetEvent::SpeechError { code }) => {
                eprintln!("(speech recognition failed: {code})");
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event printer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is read before tracing exists; failures are reported below.
    let config_file = args.resolve_config_path();
    let loaded = PdfChatConfig::load(&config_file);
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => PdfChatConfig::default(),
    };

    // Tracing. RUST_LOG wins over the configured level.
    let level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting pdfchat v{}", env!("CARGO_PKG_VERSION"));
    match loaded {
        Ok(_) => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Err(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config. Using defaults."
        ),
    }

    config.service.base_url = args.resolve_base_url(&config.service.base_url);

    // Query client.
    let client = HttpQueryClient::from_config(&config.service)?;
    tracing::info!(url = %client.url(), "Query service configured");

    // Widget with console speech engines.
    let console_input = Arc::new(ConsoleSpeechInput::new());
    let speech_input: Arc<dyn SpeechInput> = console_input.clone();
    let speech_output: Arc<dyn SpeechOutput> = Arc::new(ConsoleSpeechOutput::stdout());
    let widget = Arc::new(ChatWidget::from_config(
        &config,
        Arc::new(client),
        Some(speech_input),
        Some(speech_output),
    ));

    tokio::spawn(print_events(widget.subscribe()));

    let widget_events = Arc::clone(&widget);
    tokio::spawn(async move {
        widget_events.run_events().await;
    });

    println!("{}", config.widget.title);
    println!("{} (/help for commands)", config.widget.placeholder);

    // === REPL ===

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Command::Quit => break,
            Command::Help => println!("{HELP}"),
            Command::Mic => {
                if !widget.speech_input_available() {
                    println!("(speech input is not available)");
                } else if widget.toggle_listening() {
                    if widget.is_listening() {
                        println!("(listening: type what you would say)");
                    } else {
                        println!("(microphone off)");
                    }
                } else {
                    println!("(microphone is disabled right now)");
                }
            }
            Command::Stop => {
                widget.stop_speaking();
            }
            Command::Status => println!("{}", status_summary(&widget.snapshot())),
            Command::Unknown(cmd) => println!("(unknown command {cmd}; /help for commands)"),
            Command::Text(text) => {
                if console_input.is_capturing() {
                    console_input.deliver(&text);
                } else if widget.set_pending_input(text) {
                    widget.submit_pending().await;
                } else {
                    println!("(busy; wait for the answer or /stop)");
                }
            }
        }
    }

    widget.stop_listening();
    widget.stop_speaking();
    tracing::info!("pdfchat exiting");
    Ok(())
}
