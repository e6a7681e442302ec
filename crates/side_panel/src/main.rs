use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::rc::Rc;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;

use chat_service::CredentialStore;
use side_panel::cli::{CliView, InputOutcome};
use side_panel::commands::HELP_TEXT;
use side_panel::config::{PanelConfig, DEFAULT_LOG_FILTER};
use side_panel::events::PanelAction;
use side_panel::runtime::{EventSink, PanelRuntime, WakeCallback};
use side_panel::services::service_from_config;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

enum HostMessage {
    Line(String),
    Wake,
    InputClosed,
}

fn main() -> io::Result<()> {
    let config = PanelConfig::from_env().map_err(io::Error::other)?;
    configure_logging(&config.log_filter);

    let store: Arc<dyn CredentialStore> =
        Arc::new(config.credential_store().map_err(io::Error::other)?);
    let service = service_from_config(&config).map_err(io::Error::other)?;
    info!(
        service = service.service_id(),
        base_url = %config.base_url,
        "starting sidechat"
    );

    let (sender, receiver) = mpsc::channel();
    spawn_stdin_reader(sender.clone())?;
    let wake: WakeCallback = Arc::new(move || {
        let _ = sender.send(HostMessage::Wake);
    });

    let view = Rc::new(RefCell::new(CliView::new()));
    let sink: EventSink = {
        let view = Rc::clone(&view);
        Box::new(move |event| {
            let lines = view.borrow_mut().apply_event(&event);
            print_lines(&lines);
        })
    };

    let mut runtime = PanelRuntime::new(service, store, sink, wake);
    print_lines(&[HELP_TEXT.to_string()]);
    runtime.handle(PanelAction::Show);

    let mut input_closed = false;
    while let Ok(message) = receiver.recv() {
        match message {
            HostMessage::Wake => {
                runtime.flush_pending();
                if input_closed && !runtime.has_active_request() {
                    break;
                }
            }
            HostMessage::InputClosed => {
                if !runtime.has_active_request() {
                    break;
                }
                input_closed = true;
            }
            HostMessage::Line(line) => {
                let outcome = view.borrow_mut().interpret(&line);
                match outcome {
                    InputOutcome::Action(action) => runtime.handle(action),
                    InputOutcome::Print(text) => print_lines(&[text]),
                    InputOutcome::Ignore => {}
                    InputOutcome::Quit => break,
                }
            }
        }
    }

    runtime.handle(PanelAction::Dispose);
    Ok(())
}

fn configure_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn spawn_stdin_reader(sender: Sender<HostMessage>) -> io::Result<()> {
    thread::Builder::new()
        .name("sidechat-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if sender.send(HostMessage::Line(line)).is_err() {
                            return;
                        }
                    }
                    Err(error) => {
                        warn!(%error, "failed to read stdin");
                        break;
                    }
                }
            }
            let _ = sender.send(HostMessage::InputClosed);
        })
        .map(|_| ())
}

fn print_lines(lines: &[String]) {
    let mut stdout = io::stdout().lock();
    for line in lines {
        let _ = writeln!(stdout, "{line}");
    }
    let _ = stdout.flush();
}
