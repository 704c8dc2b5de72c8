//! Interactive line client for the chat relay.
//!
//! Connects, sends the display name as the first line, then relays stdin
//! lines to the server while printing whatever the server pushes back.

use std::env;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[tokio::main]
async fn main() -> Result<()> {
    // Where to connect and who to be: env overrides or defaults.
    let addr = env::var("RELAY_CLIENT_ADDR").unwrap_or_else(|_| "127.0.0.1:12345".to_string());
    let name = env::var("RELAY_CLIENT_NAME").unwrap_or_default();

    println!("Connecting to {}...", addr);
    let stream = TcpStream::connect(&addr).await?;
    println!("Connected.");
    println!("Messages look like 'sender:recipient:payload'; the sender field is ignored,");
    println!("and an empty recipient broadcasts:");
    println!("  me::hello everyone");
    println!("  me:2:just for peer 2");
    println!("Type 'quit' or 'exit' to leave.\n");

    let (read_half, mut write_half) = stream.into_split();

    // First line identifies us to the server; blank means unnamed.
    write_half.write_all(format!("{}\n", name).as_bytes()).await?;

    let mut server_lines = BufReader::new(read_half).lines();
    let mut stdin_lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = server_lines.next_line() => match line? {
                Some(text) => println!("<< {}", text),
                None => {
                    println!("Server closed the connection.");
                    break;
                }
            },
            line = stdin_lines.next_line() => match line? {
                Some(text) => {
                    let trimmed = text.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
                        println!("Exiting client.");
                        break;
                    }
                    write_half.write_all(format!("{}\n", trimmed).as_bytes()).await?;
                }
                None => break,
            },
        }
    }

    Ok(())
}
