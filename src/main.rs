//! Line-oriented transport: each stdin line is `<user_id> <message text>`,
//! each reply is one JSON object on stdout.

use async_trait::async_trait;
use deal_tracker::{
    setup_logging, AppConfig, InboundMessage, Pipeline, Reply, ReplySink, TrackerError, UserId,
};
use serde::Serialize;
use std::error::Error;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info, warn};

#[derive(Serialize)]
struct Outbound<'a> {
    user_id: UserId,
    reply: &'a Reply,
}

struct StdoutSink {
    user_id: UserId,
}

#[async_trait]
impl ReplySink for StdoutSink {
    async fn send(&self, reply: Reply) -> Result<(), TrackerError> {
        let line = serde_json::to_string(&Outbound {
            user_id: self.user_id,
            reply: &reply,
        })
        .map_err(|e| TrackerError::ParseError(e.to_string()))?;
        println!("{line}");
        Ok(())
    }
}

fn parse_line(line: &str) -> Option<InboundMessage> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (user, text) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    match user.parse::<i64>() {
        Ok(id) => Some(InboundMessage::new(id, text)),
        Err(_) => {
            warn!(line = %line, "Skipping line without a numeric user id");
            None
        }
    }
}

fn report_handler(result: Result<(), JoinError>) {
    if let Err(e) = result {
        error!(error = %e, "Message handler aborted");
    }
}

/// Drop handlers that have already finished so the set tracks only live ones.
fn reap(handlers: &mut JoinSet<()>) {
    while let Some(result) = handlers.try_join_next() {
        report_handler(result);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load().unwrap_or_else(|e| e.exit());

    if let Err(e) = setup_logging(config.logging()) {
        eprintln!("{e}");
    }

    let pipeline = Pipeline::from_config(&config)?;
    let semaphore = Arc::new(Semaphore::new(config.handler_permits()));
    info!("Tracker is running, reading messages from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut handlers = JoinSet::new();

    while let Some(line) = lines.next_line().await? {
        let Some(message) = parse_line(&line) else {
            continue;
        };

        reap(&mut handlers);

        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        let pipeline = pipeline.clone();
        handlers.spawn(async move {
            let _permit = permit;
            let sink = StdoutSink {
                user_id: message.user_id,
            };
            if let Err(e) = pipeline.handle(&message, &sink).await {
                e.log();
            }
        });
    }

    while let Some(result) = handlers.join_next().await {
        report_handler(result);
    }

    info!("Input closed, shutting down");
    Ok(())
}
