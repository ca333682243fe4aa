//! Line-delimited JSON request loop.
//!
//! Each input line is one command; each output line is
//! `{"ok":true,"result":...}` or `{"ok":false,"error":{"kind":...,"message":...}}`.

use anyhow::{Context, Result};
use lockbox_core::command::command_name;
use lockbox_core::{Command, Error, Manager, PersistenceProvider, Reply};
use serde::Serialize;
use std::io::{BufRead, Write};
use tokio::runtime::Runtime;

#[derive(Serialize)]
struct Success<'a> {
    ok: bool,
    result: &'a Reply,
}

#[derive(Serialize)]
struct Failure<'a> {
    ok: bool,
    error: ErrorBody<'a>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    kind: &'a str,
    message: String,
}

/// Decode, execute and encode a single request line.
pub async fn handle_line<P: PersistenceProvider>(manager: &mut Manager<P>, line: &str) -> Result<String> {
    let outcome = match Command::from_json(line) {
        Ok(command) => {
            let name = command_name(&command);
            let outcome = manager.dispatch(command).await;
            if let Err(err) = &outcome {
                tracing::warn!("{} failed: {}", name, err);
            }
            outcome
        }
        Err(err) => {
            tracing::warn!("Rejected request: {}", err);
            Err(err)
        }
    };

    let encoded = match outcome {
        Ok(reply) => serde_json::to_string(&Success {
            ok: true,
            result: &reply,
        }),
        Err(err) => serde_json::to_string(&failure(&err)),
    };
    encoded.context("Failed to encode reply")
}

fn failure(err: &Error) -> Failure<'static> {
    Failure {
        ok: false,
        error: ErrorBody {
            kind: err.kind(),
            message: err.to_string(),
        },
    }
}

/// Serve requests from `input` until it is exhausted, one at a time.
pub fn run<P, R, W>(runtime: &Runtime, manager: &mut Manager<P>, input: R, mut output: W) -> Result<()>
where
    P: PersistenceProvider,
    R: BufRead,
    W: Write,
{
    for line in input.lines() {
        let line = line.context("Failed to read request")?;
        if line.trim().is_empty() {
            continue;
        }

        let reply = runtime.block_on(handle_line(manager, &line))?;
        writeln!(output, "{reply}").context("Failed to write reply")?;
        output.flush().context("Failed to flush reply")?;
    }

    tracing::info!("Input closed, shutting down");
    Ok(())
}
