use std::io::Write;
use std::sync::Mutex;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use chat_widget::{
    ChatService, ExchangeOutcome, HttpTransport, Message, Origin, TranscriptChange, WidgetConfig,
};

/// Prints assistant text as it grows, only emitting what is new since the
/// last update when the reply extends what is already on screen.
struct TerminalRenderer {
    typing_indicator: String,
    shown: Mutex<String>,
}

impl TerminalRenderer {
    fn render(&self, change: &TranscriptChange, messages: &[Message]) {
        let mut stdout = std::io::stdout().lock();
        let Ok(mut shown) = self.shown.lock() else {
            return;
        };
        match *change {
            TranscriptChange::Appended { index } if messages[index].origin == Origin::User => {
                let _ = writeln!(stdout, "{}", self.typing_indicator);
            }
            TranscriptChange::Appended { .. } => shown.clear(),
            TranscriptChange::Replaced { index } => {
                let text = &messages[index].text;
                match text.strip_prefix(shown.as_str()) {
                    Some(fresh) if !shown.is_empty() => {
                        let _ = write!(stdout, "{fresh}");
                    }
                    _ if shown.is_empty() => {
                        let _ = write!(stdout, "bot> {text}");
                    }
                    _ => {
                        let _ = write!(stdout, "\nbot> {text}");
                    }
                }
                shown.clone_from(text);
            }
            TranscriptChange::Completed { index } => {
                if messages[index].is_copyable() {
                    let _ = writeln!(stdout);
                }
                shown.clear();
            }
            TranscriptChange::Removed { .. } => shown.clear(),
        }
        let _ = stdout.flush();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout is the conversation.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_widget=info".into()),
        )
        .init();

    // ── Configuration ─────────────────────────────────────────────────────────
    let config = WidgetConfig::from_env()?;
    info!(
        endpoint = %config.endpoint,
        visitor = %config.visitor_biz_id,
        session = %config.session_id,
        "Starting chat session"
    );

    // ── Dependency wiring ─────────────────────────────────────────────────────
    let transport = HttpTransport::new(&config)?;
    let renderer = TerminalRenderer {
        typing_indicator: config.localization.typing_indicator.clone(),
        shown: Mutex::new(String::new()),
    };
    let placeholder = config.localization.placeholder.clone();
    let send_button = config.localization.send_button.clone();
    let mut chat = ChatService::new(config, transport);
    chat.transcript_mut()
        .subscribe(move |change: &TranscriptChange, messages: &[Message]| {
            renderer.render(change, messages)
        });

    // ── Input loop ────────────────────────────────────────────────────────────
    println!("{placeholder} (Enter to {send_button}, /quit to leave)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim() == "/quit" {
            break;
        }
        match chat.submit(&line).await {
            Ok(ExchangeOutcome::Ignored) => {}
            Ok(ExchangeOutcome::Completed { qualifying_events: 0, .. }) => {
                println!("(no reply)");
            }
            Ok(ExchangeOutcome::Completed { .. }) => {}
            Err(e) => eprintln!("error: {e}"),
        }
    }

    info!(messages = chat.transcript().len(), "Chat session closed");
    Ok(())
}
