use std::io::Write as _;
use std::sync::Arc;

use aboraya_engine::{ChatSession, MessageId, Role, SessionViewer};
use aboraya_gemini::{GeminiService, GeminiSettings};
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// Reset confirmation, localized like the engine's fixed reply-error text.
const RESET_CONFIRM_PROMPT: &str = "تحب نبدأ صفحة جديدة؟ [y/N]";

/// Terminal front-end for the conversation engine.
///
/// Strictly a presentation consumer: it pulls transcript snapshots whenever
/// the session's revision counter changes, honors `loading` as the
/// single-flight gate, and owns the reset preconditions (non-empty log plus
/// explicit confirmation) the engine deliberately leaves to its caller.
#[tokio::main]
async fn main() {
    // Log to stderr so the transcript itself stays clean.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let settings = GeminiSettings::load();
    let service = match GeminiService::new(settings) {
        Ok(service) => Arc::new(service),
        Err(error) => {
            tracing::error!(%error, "failed to initialize the Gemini service");
            eprintln!("{error}");
            std::process::exit(1);
        }
    };

    let session = ChatSession::new(service);
    let renderer = tokio::spawn(render_replies(session.viewer()));

    println!(
        "{}",
        "aboraya — /reset clears the conversation, /quit exits".dimmed()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt("you>");
        let Ok(Some(line)) = lines.next_line().await else {
            break;
        };

        match line.trim() {
            "" => {}
            "/quit" | "/exit" => break,
            "/reset" => handle_reset(&session, &mut lines).await,
            _ => {
                session.send(&line).await;
                // Let the renderer drain the final revision before the next
                // prompt is printed.
                tokio::task::yield_now().await;
            }
        }
    }

    renderer.abort();
}

async fn handle_reset(session: &ChatSession, lines: &mut Lines<BufReader<Stdin>>) {
    if session.loading() {
        println!(
            "{}",
            "a reply is still streaming; try again in a moment".yellow()
        );
        return;
    }
    if session.snapshot().is_empty() {
        println!("{}", "nothing to clear yet".dimmed());
        return;
    }

    prompt(RESET_CONFIRM_PROMPT);
    let confirmed = matches!(
        lines.next_line().await,
        Ok(Some(answer)) if matches!(answer.trim(), "y" | "Y")
    );

    if confirmed {
        session.reset().await;
        println!("{}", "conversation cleared".dimmed());
    }
}

/// Prints model replies incrementally as the snapshot changes.
async fn render_replies(viewer: SessionViewer) {
    let mut revisions = viewer.subscribe();
    let mut open: Option<MessageId> = None;
    let mut printed_bytes = 0usize;
    let mut closed = false;

    while revisions.changed().await.is_ok() {
        let transcript = viewer.snapshot();
        let Some(last) = transcript.last() else {
            open = None;
            continue;
        };
        if last.role != Role::Model {
            continue;
        }

        if open != Some(last.id) {
            open = Some(last.id);
            printed_bytes = 0;
            closed = false;
            print!("{} ", "aboraya>".green().bold());
            flush();
        }
        if closed {
            continue;
        }

        if last.is_error {
            if printed_bytes > 0 {
                println!();
            }
            println!("{}", last.content.red());
            closed = true;
        } else {
            // Content grows by appended chunks, so the printed byte offset
            // always lands on a character boundary.
            if last.content.len() > printed_bytes {
                print!("{}", &last.content[printed_bytes..]);
                printed_bytes = last.content.len();
                flush();
            }
            if !viewer.loading() {
                println!();
                closed = true;
            }
        }
    }

    // Only reachable if the session was dropped while the renderer is alive.
    tracing::warn!("session revision channel closed; renderer exiting");
}

fn prompt(label: &str) {
    print!("{} ", label.blue().bold());
    flush();
}

fn flush() {
    let _ = std::io::stdout().flush();
}
