//! Driver binary — line-delimited JSON over stdin/stdout.
//!
//! One request per input line, the full event sequence as NDJSON on stdout.
//! This is a harness for exercising the session facade; the real transport
//! layer lives elsewhere.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use majordomo::{ChatRequest, ChatSession, Config, ProviderRegistry, StreamEvent};

#[tokio::main]
async fn main() {
    majordomo::logging::init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    let registry = Arc::new(ProviderRegistry::new(config));
    let session = ChatSession::new(registry);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        let request: ChatRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(e) => {
                // Malformed framing is a driver concern, not a session one.
                print_event(&StreamEvent::error(None, format!("invalid request: {e}")));
                continue;
            }
        };

        let (tx, mut rx) = mpsc::channel::<StreamEvent>(64);
        let printer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                print_event(&event);
            }
        });

        session.handle(request, tx).await;
        let _ = printer.await;
    }
}

fn print_event(event: &StreamEvent) {
    match serde_json::to_string(event) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::error!(error = %e, "failed to serialize event"),
    }
}
