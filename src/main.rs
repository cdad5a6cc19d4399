mod app;
mod azure;
mod classify;
mod cli;
mod config;
mod fetch;
mod fixture;
mod input;
mod model;
mod projection;
mod ui;

use anyhow::{Context, Result};
use app::{App, AppCommand};
use azure::AzCliGateway;
use clap::Parser;
use cli::CliArgs;
use config::AzrConfig;
use crossterm::event::{
    Event, EventStream, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use fetch::{CloudProvider, FetchEvent};
use fixture::FixtureProvider;
use futures::StreamExt;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::fs::OpenOptions;
use std::io::{self, Stdout};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter, args.log_file.as_deref())?;

    let config = AzrConfig::load(args.config.as_deref())?.with_cli_overrides(&args);
    if let Some(source) = config.source.as_deref() {
        info!("loaded config from {source}");
    }
    let provider = build_provider(&config)?;
    info!("listing through {}", provider.name());

    let mut app = App::new();
    run(&mut app, provider).await
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();

    // stdout belongs to the TUI; without a log file the output is discarded.
    let _ = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(io::sink).try_init(),
    };

    Ok(())
}

fn build_provider(config: &AzrConfig) -> Result<Arc<dyn CloudProvider>> {
    match config.fixture.as_deref() {
        Some(path) => Ok(Arc::new(FixtureProvider::load(path)?)),
        None => Ok(Arc::new(AzCliGateway::new(config))),
    }
}

async fn run(app: &mut App, provider: Arc<dyn CloudProvider>) -> Result<()> {
    let (mut terminal, keyboard_enhanced) = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, provider).await;
    let restore_result = restore_terminal(&mut terminal, keyboard_enhanced);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<(TuiTerminal, bool)> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    if keyboard_enhanced {
        execute!(
            stdout,
            EnterAlternateScreen,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )
        .context("failed to enter alternate screen with keyboard enhancement")?;
    } else {
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok((terminal, keyboard_enhanced))
}

fn restore_terminal(terminal: &mut TuiTerminal, keyboard_enhanced: bool) -> Result<()> {
    if keyboard_enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
            .context("failed to pop keyboard enhancement flags")?;
    }
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut App,
    provider: Arc<dyn CloudProvider>,
) -> Result<()> {
    let (fetch_tx, mut fetch_rx) = mpsc::unbounded_channel::<FetchEvent>();
    let size = terminal.size().context("failed to read terminal size")?;
    app.set_viewport(size.width, size.height);
    dispatch(app.initial_command(), &provider, &fetch_tx);

    let mut reader = EventStream::new();

    loop {
        terminal
            .draw(|frame| ui::render(frame, app))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Some(action) = input::map_key(app.mode(), key) {
                            debug!("action={action:?}");
                            let command = app.apply_action(action);
                            dispatch(command, &provider, &fetch_tx);
                        }
                    }
                    Some(Ok(Event::Resize(width, height))) => {
                        app.set_viewport(width, height);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        app.set_status(format!("terminal event error: {error}"));
                    }
                    None => {
                        app.set_status("terminal event stream closed");
                        break;
                    }
                }
            }
            maybe_fetch = fetch_rx.recv() => {
                if let Some(event) = maybe_fetch {
                    app.handle_fetch_event(event);
                }
            }
        }
    }

    Ok(())
}

/// Each fetch runs on its own task and reports back through the channel.
fn dispatch(
    command: AppCommand,
    provider: &Arc<dyn CloudProvider>,
    fetch_tx: &mpsc::UnboundedSender<FetchEvent>,
) {
    let AppCommand::Fetch(request) = command else {
        return;
    };

    debug!("dispatching fetch of {}", request.describe());
    let provider = Arc::clone(provider);
    let fetch_tx = fetch_tx.clone();
    tokio::spawn(async move {
        let event = fetch::execute(provider.as_ref(), request).await;
        if !matches!(event, FetchEvent::FetchFailed { .. }) {
            info!("fetched {}", event.request().describe());
        }
        let _ = fetch_tx.send(event);
    });
}
