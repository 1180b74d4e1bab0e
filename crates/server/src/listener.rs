// SPDX-License-Identifier: MIT

//! The stdio listener: newline-delimited JSON, one response per request, in
//! order.
//!
//! A malformed line answers with an error frame and keeps the loop alive.
//! `shutdown` (or EOF, or cancellation from outside) ends the loop; any
//! request already dispatched finishes its store work first, so no
//! transaction is cut off mid-flight.

use cue_core::Clock;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::ops::Ops;
use crate::protocol::{decode_request, encode_response, Request, Response};

/// Serve requests from `input`, writing responses to `output`, until EOF,
/// a shutdown request, or cancellation.
pub async fn serve<C, R, W>(
    ops: Ops<C>,
    input: R,
    mut output: W,
    cancel: CancellationToken,
) -> std::io::Result<()>
where
    C: Clock + Send + Sync + 'static,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => {
                info!("listener cancelled");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            info!("input closed");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match decode_request(&line) {
            Ok(Request::Shutdown) => {
                write_line(&mut output, &Response::ok(serde_json::json!({"stopping": true})))
                    .await?;
                cancel.cancel();
                break;
            }
            Ok(request) => dispatch(&ops, request).await,
            Err(e) => {
                warn!(error = %e, "malformed request line");
                Response::invalid(e.to_string())
            }
        };
        write_line(&mut output, &response).await?;
    }
    Ok(())
}

// Store work is blocking; move it off the reactor so a slow disk cannot
// stall the runtime.
async fn dispatch<C>(ops: &Ops<C>, request: Request) -> Response
where
    C: Clock + Send + Sync + 'static,
{
    let ops = ops.clone();
    match tokio::task::spawn_blocking(move || ops.handle(request)).await {
        Ok(response) => response,
        Err(e) => Response::Error {
            kind: "Internal".to_string(),
            message: format!("handler task failed: {e}"),
        },
    }
}

async fn write_line<W: AsyncWrite + Unpin>(
    output: &mut W,
    response: &Response,
) -> std::io::Result<()> {
    let mut frame = encode_response(response);
    frame.push('\n');
    output.write_all(frame.as_bytes()).await?;
    output.flush().await
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
