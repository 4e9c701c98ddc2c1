//! Line-delimited transport over stdin/stdout.
//!
//! Each input line is one exchange, dispatched on its own task. Responses
//! are written one per line in completion order.

use std::sync::Arc;

use axum::body::Bytes;
use scm_protocol::RequestContext;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::server::{RequestHandler, dispatch_guarded};

/// Serve exchanges on the process's stdin/stdout until EOF.
pub async fn serve_stdio<H: RequestHandler>(
    handler: Arc<H>,
    base: RequestContext,
) -> std::io::Result<()> {
    info!("Serving exchanges on stdio");
    serve_lines(
        handler,
        base,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
}

/// Serve exchanges from any line reader to any writer. Returns once input
/// is exhausted and every in-flight response has been written.
pub async fn serve_lines<H, R, W>(
    handler: Arc<H>,
    base: RequestContext,
    reader: R,
    mut writer: W,
) -> std::io::Result<()>
where
    H: RequestHandler,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<String>(64);

    let writer_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let handler = handler.clone();
        let ctx = base.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let response = dispatch_guarded(handler, ctx, Bytes::from(line)).await;
            if tx.send(response.to_json()).await.is_err() {
                debug!("Output closed, response dropped");
            }
        });
    }
    drop(tx);

    match writer_task.await {
        Ok(result) => result,
        Err(e) => Err(std::io::Error::other(e)),
    }
}
