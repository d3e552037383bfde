//! Terminal chat client.
//!
//! Prompts for a server address and display name, dials the server over
//! the hand-rolled WebSocket transport, sends the name as the identity
//! frame, then runs two loops: a background receive loop printing every
//! chat line, and a foreground loop sending each stdin line as a Text
//! frame. Typing `quit` (any case) closes the connection.

use std::io::Write;
use std::process;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

use chatwire::client;
use chatwire::ws::frame::{self, DEFAULT_MAX_PAYLOAD, Opcode};
use chatwire::ws::session::ANONYMOUS_NAME;

const DEFAULT_ADDR: &str = "127.0.0.1:8080";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // The terminal is the chat surface; keep tracing quiet unless asked.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let mut input = BufReader::new(tokio::io::stdin()).lines();

    let addr = prompt(
        &mut input,
        &format!("Enter server address (default {DEFAULT_ADDR}): "),
    )
    .await?;
    let addr = non_empty_or(addr, DEFAULT_ADDR);
    let name = prompt(&mut input, "Enter a display name: ").await?;
    let name = non_empty_or(name, ANONYMOUS_NAME);

    println!("Connecting to ws://{addr}/ws...");
    let stream = client::dial(&addr, "/ws")
        .await
        .with_context(|| format!("failed to connect to {addr}"))?;
    let (mut reader, mut writer) = stream.into_split();

    // The first frame after the handshake announces our display name.
    frame::write_frame(&mut writer, Opcode::Text, name.as_bytes())
        .await
        .context("failed to send display name")?;

    // Receive loop: prints every chat line; ends the process when the
    // stream closes or the server says Close.
    tokio::spawn(async move {
        loop {
            match frame::read_frame(&mut reader, DEFAULT_MAX_PAYLOAD).await {
                Ok(frame) => match frame.opcode {
                    Opcode::Text => println!("{}", String::from_utf8_lossy(&frame.payload)),
                    Opcode::Close => {
                        println!("Server sent close frame. Exiting.");
                        process::exit(0);
                    }
                    _ => {}
                },
                Err(_) => {
                    println!("Connection closed by peer.");
                    process::exit(0);
                }
            }
        }
    });

    // Foreground loop: one Text frame per input line.
    while let Some(line) = input.next_line().await? {
        if client::is_quit(&line) {
            let _ = frame::write_frame(&mut writer, Opcode::Close, &[]).await;
            break;
        }
        if let Err(err) = frame::write_frame(&mut writer, Opcode::Text, line.as_bytes()).await {
            eprintln!("Failed to send message: {err}");
            break;
        }
    }

    Ok(())
}

/// Prints `message` and reads one line; EOF counts as an empty answer.
async fn prompt(input: &mut Lines<BufReader<Stdin>>, message: &str) -> anyhow::Result<String> {
    print!("{message}");
    std::io::stdout().flush()?;
    Ok(input.next_line().await?.unwrap_or_default())
}

/// Trims `value`, substituting `default` when nothing is left.
fn non_empty_or(value: String, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}
