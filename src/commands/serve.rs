use std::sync::Arc;

use clap::Args;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use super::chat::{handle_message, Incoming};
use crate::app::App;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Maximum number of replies buffered before readers wait for stdout
    #[arg(long, default_value = "64")]
    pub buffer: usize,
}

/// Reply written for an event, one JSON object per line.
#[derive(Debug, Serialize)]
struct Outgoing {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<serde_json::Value>,
    reply: String,
}

impl ServeArgs {
    pub async fn execute(&self, app: Arc<App>) -> anyhow::Result<()> {
        let input = BufReader::new(tokio::io::stdin());
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("cannot listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
        };
        serve(app, input, tokio::io::stdout(), self.buffer, shutdown).await
    }
}

/// Read events from `input` until EOF or `shutdown`, handling each on its own
/// task, and write replies to `output` as they complete.
pub async fn serve<R, W, S>(
    app: Arc<App>,
    input: R,
    mut output: W,
    buffer: usize,
    shutdown: S,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
    S: std::future::Future<Output = ()>,
{
    let (tx, mut rx) = mpsc::channel::<Outgoing>(buffer.max(1));
    let writer = tokio::spawn(async move {
        while let Some(out) = rx.recv().await {
            let mut line = serde_json::to_vec(&out)?;
            line.push(b'\n');
            output.write_all(&line).await?;
            output.flush().await?;
        }
        anyhow::Ok(())
    });

    let mut lines = input.lines();
    let mut tasks = JoinSet::new();
    tokio::pin!(shutdown);
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            () = &mut shutdown => {
                tracing::info!("shutdown requested");
                break;
            }
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        let event: Incoming = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("skipping malformed event: {e}");
                continue;
            }
        };

        let app = Arc::clone(&app);
        let tx = tx.clone();
        tasks.spawn(async move {
            match handle_message(&app, &event).await {
                Ok(Some(reply)) => {
                    if let Err(e) = tx.send(Outgoing { id: event.id, reply }).await {
                        tracing::warn!(user = event.user_id, "reply dropped, writer stopped: {e}");
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(user = event.user_id, "failed to handle event: {e:#}"),
            }
        });
        // Reap finished handlers so the set does not grow without bound.
        while tasks.try_join_next().is_some() {}
    }

    while tasks.join_next().await.is_some() {}
    drop(tx);
    writer.await??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, StoreBackend};

    async fn app() -> Arc<App> {
        let mut config = Config::default();
        config.store.backend = StoreBackend::Memory;
        config.assets.store_assets = false;
        Arc::new(App::open(config).await.expect("open"))
    }

    async fn run(app: Arc<App>, input: &str) -> Vec<serde_json::Value> {
        let (client, mut server) = tokio::io::duplex(64 * 1024);
        serve(app, input.as_bytes(), client, 8, std::future::pending())
            .await
            .expect("serve");
        let mut raw = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut server, &mut raw)
            .await
            .expect("read output");
        raw.lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect()
    }

    #[tokio::test]
    async fn replies_only_to_commands_and_matches() {
        let app = app().await;
        let input = concat!(
            r#"{"id":1,"user_id":7,"user_name":"alice","content":"dyn-res.post ping pong"}"#,
            "\n",
            "not json\n",
            "\n",
            r#"{"id":2,"user_id":8,"user_name":"bob","content":"unrelated"}"#,
            "\n",
        );
        let replies = run(app.clone(), input).await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["id"], 1);
        assert!(replies[0]["reply"].as_str().unwrap().starts_with("Respondent created."));

        let replies = run(app, r#"{"id":"x","user_id":8,"content":"ping"}"#).await;
        assert_eq!(replies, vec![serde_json::json!({"id": "x", "reply": "pong"})]);
    }

    #[tokio::test]
    async fn stops_on_shutdown() {
        let app = app().await;
        let (_keep_open, reader) = tokio::io::duplex(64);
        let (client, _server) = tokio::io::duplex(64);
        serve(app, BufReader::new(reader), client, 8, async {})
            .await
            .expect("serve");
    }

    #[tokio::test]
    async fn closed_output_still_handles_events_and_reports_failure() {
        let app = app().await;
        let (client, server) = tokio::io::duplex(64);
        drop(server);
        let input = concat!(
            r#"{"id":1,"user_id":7,"content":"dyn-res.post ping pong"}"#,
            "\n",
            r#"{"id":2,"user_id":7,"content":"dyn-res.post ping pang"}"#,
            "\n",
        );

        let result = serve(app.clone(), input.as_bytes(), client, 1, std::future::pending()).await;
        assert!(result.is_err());

        let stored = app
            .service
            .list(&crate::respondent::RespondentFilter::trigger("ping"))
            .await
            .expect("list");
        assert_eq!(stored.len(), 2);
    }
}
