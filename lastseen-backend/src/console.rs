//! Line-oriented console front end: `join`, `quit`, `seen`, `firstseen`, `exit`.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinSet;

use crate::{Host, PresenceTask, commands};

/// Serve commands from `input` until `exit` or end of input, writing replies
/// to `output`. Presence writes still in flight are awaited before returning.
pub async fn run<R, W>(host: &Host, input: R, mut output: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut pending: JoinSet<lastseen_db::Result<()>> = JoinSet::new();
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        let mut parts = line.split_whitespace();
        let reply = match (parts.next(), parts.next(), parts.next()) {
            (None, _, _) => continue,
            (Some("exit"), None, _) => break,
            (Some("join"), Some(player), None) => track(&mut pending, host.on_join(player).await),
            (Some("quit"), Some(player), None) => track(&mut pending, host.on_quit(player).await),
            _ => Some(
                commands::dispatch(host, &line)
                    .await
                    .unwrap_or_else(|| format!("Unknown command: {}", line.trim())),
            ),
        };

        if let Some(reply) = reply {
            output.write_all(format!("{reply}\n").as_bytes()).await?;
        }
        // Reap writes that already finished so the set stays small.
        while pending.try_join_next().is_some() {}
    }

    output.flush().await?;

    let outstanding = pending.len();
    if outstanding > 0 {
        tracing::info!(outstanding, "waiting for presence writes");
    }
    while pending.join_next().await.is_some() {}
    Ok(())
}

/// Keep the presence write alive past the loop; returns any reply for the user.
fn track(
    pending: &mut JoinSet<lastseen_db::Result<()>>,
    event: Result<PresenceTask, crate::AppError>,
) -> Option<String> {
    match event {
        Ok(task) => {
            pending.spawn(async move { task.await? });
            None
        }
        Err(e) => Some(e.user_message()),
    }
}
