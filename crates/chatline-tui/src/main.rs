use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Result};
use chatline_core::{
    logging, ChatClient, ChatController, ChatTransport, Config, DisplayMode, DraftClearPolicy,
    Resolution,
};
use clap::{Parser, Subcommand};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;

#[derive(Parser)]
#[command(name = "chatline")]
#[command(about = "Terminal chat client for a /chat HTTP backend", version)]
struct Cli {
    /// Backend base URL (overrides CHATLINE_BACKEND_URL and the config file)
    #[arg(long)]
    base_url: Option<String>,

    /// Show only the latest reply instead of the full conversation
    #[arg(long)]
    single_reply: bool,

    /// Clear the draft as soon as it is sent, not when the reply succeeds
    #[arg(long)]
    clear_on_attempt: bool,

    /// Log file path
    #[arg(long, env = "CHATLINE_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Persist the effective settings to the config file
    #[arg(long)]
    save_config: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message and print the reply
    Ask {
        /// Message text
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
}

impl Cli {
    /// Fold the command-line flags into a loaded config.
    ///
    /// `base_url` is only set from `--base-url`, never from the environment or
    /// the default.
    fn apply_to(&self, config: &mut Config) {
        if self.single_reply {
            config.display = DisplayMode::SingleReply;
        }
        if self.clear_on_attempt {
            config.draft_clear = DraftClearPolicy::OnAttempt;
        }
        if let Some(url) = &self.base_url {
            config.base_url = Some(url.clone());
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Logging is best-effort; a chat session shouldn't fail because of it
    if let Some(path) = cli.log_file.clone().or_else(logging::default_log_path) {
        let _ = logging::init(&path);
    }

    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not load config, using defaults");
        Config::new()
    });
    cli.apply_to(&mut config);
    if cli.save_config {
        config.save()?;
    }

    let base_url = config.resolve_base_url(cli.base_url.as_deref());
    let client = ChatClient::new(&base_url);
    let controller = ChatController::new(config.draft_clear, config.display);
    tracing::info!(endpoint = %client.endpoint(), "starting chatline");

    match cli.command {
        Some(Commands::Ask { message }) => run_ask(&client, controller, message.join(" ")).await,
        None => run_tui(client, controller).await,
    }
}

/// Result of a one-shot `ask`
#[derive(Debug, PartialEq, Eq)]
enum AskOutcome {
    Reply(String),
    /// Display text for a failed send
    Failed(String),
}

impl AskOutcome {
    fn exit_code(&self) -> u8 {
        match self {
            AskOutcome::Reply(_) => 0,
            AskOutcome::Failed(_) => 1,
        }
    }
}

async fn ask<T>(transport: &T, mut controller: ChatController, message: String) -> Result<AskOutcome>
where
    T: ChatTransport + ?Sized,
{
    controller.set_draft(message);

    match controller.send_via(transport).await {
        None => bail!("Nothing to send: message is empty"),
        Some(Resolution::Replied) => {
            let reply = controller
                .conversation()
                .last_reply()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(AskOutcome::Reply(reply))
        }
        Some(_) => Ok(AskOutcome::Failed(
            controller.display_text().unwrap_or_default().to_string(),
        )),
    }
}

async fn run_ask(client: &ChatClient, controller: ChatController, message: String) -> Result<ExitCode> {
    let outcome = ask(client, controller, message).await?;
    match &outcome {
        AskOutcome::Reply(reply) => println!("{}", reply),
        AskOutcome::Failed(text) => eprintln!("{}", text),
    }
    Ok(ExitCode::from(outcome.exit_code()))
}

async fn run_tui(client: ChatClient, controller: ChatController) -> Result<ExitCode> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();
    let mut app = App::new(client, controller, events.sender());

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result.map(|_| ExitCode::SUCCESS)
}

async fn run_loop(terminal: &mut tui::Tui, app: &mut App, events: &mut tui::EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}
