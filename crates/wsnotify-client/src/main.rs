//! wsnotify client CLI
//!
//! - Connects to the endpoint from `wsnotify.yaml` (or the path given as the
//!   first argument) and logs every inbound envelope
//! - Each stdin line `TYPE [JSON]` is sent as one envelope
//! - Ctrl-C or stdin EOF closes the connection and prints the metrics

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

use wsnotify_client::{config, Hooks, NotifyClient};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "wsnotify.yaml".to_string());
    let cfg = config::load_from_file(&path).expect("config load failed");

    let hooks = Hooks::new()
        .on_connect(|| tracing::info!("link up"))
        .on_disconnect(|| tracing::info!("link down"))
        .on_error(|e| tracing::warn!(code = e.kind().as_str(), error = %e, "client error"));

    let client = NotifyClient::connect(&cfg, hooks).expect("client start failed");

    let _tail = client.listen(|env| {
        tracing::info!(
            msg_type = %env.msg_type,
            sender = env.sender.as_deref().unwrap_or("-"),
            timestamp = env.timestamp.as_deref().unwrap_or("-"),
            content = %env.content(),
            "inbound"
        );
        Ok(())
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) => send_line(&client, line.trim()),
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "stdin read failed");
                    break;
                }
            },
        }
    }

    tracing::info!(state = %client.state(), "shutting down");
    print!("{}", client.metrics().render());
    client.shutdown().await;
}

fn send_line(client: &NotifyClient, line: &str) {
    if line.is_empty() {
        return;
    }
    let (msg_type, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let content = match rest.trim() {
        "" => Value::Null,
        raw => serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())),
    };
    match client.send(msg_type, content) {
        Ok(()) => tracing::debug!(msg_type, "sent"),
        Err(e) => tracing::warn!(msg_type, error = %e, "send failed"),
    }
}
