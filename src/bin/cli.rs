//! sablekv CLI Client
//!
//! Command-line interface for talking to a running sablekv server. Sends one
//! request line over TCP, prints the decoded response, and exits non-zero on
//! an error response.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use sablekv::protocol::{read_response, write_command, Command, Response};
use sablekv::{Result, SableError};

/// sablekv CLI
#[derive(Parser, Debug)]
#[command(name = "sablekv-cli", version)]
#[command(about = "CLI for the sablekv key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7878")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Put a key-value pair
    Put {
        /// The key to put
        key: String,

        /// The value to store
        value: String,
    },

    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Put many pairs at once: alternating KEY VALUE arguments
    BatchPut {
        /// KEY VALUE KEY VALUE ...
        #[arg(required = true, num_args = 2..)]
        pairs: Vec<String>,
    },

    /// List all pairs with start <= key <= end
    Range {
        /// Inclusive start key
        start: String,

        /// Inclusive end key
        end: String,
    },

    /// Ping the server
    Ping,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let command = match build_command(args.command) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match send(&args.server, &command) {
        Ok(response) => print_response(&command, &response),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Translate CLI subcommands into protocol commands
fn build_command(command: Commands) -> Result<Command> {
    Ok(match command {
        Commands::Put { key, value } => Command::Put { key, value },
        Commands::Get { key } => Command::Get { key },
        Commands::Del { key } => Command::Delete { key },
        Commands::BatchPut { pairs } => {
            if pairs.len() % 2 != 0 {
                return Err(SableError::InvalidArgument(
                    "batch-put needs an even number of arguments (KEY VALUE ...)".to_string(),
                ));
            }
            let mut keys = Vec::with_capacity(pairs.len() / 2);
            let mut values = Vec::with_capacity(pairs.len() / 2);
            for chunk in pairs.chunks_exact(2) {
                keys.push(chunk[0].clone());
                values.push(chunk[1].clone());
            }
            Command::BatchPut { keys, values }
        }
        Commands::Range { start, end } => Command::GetRange {
            start_key: start,
            end_key: end,
        },
        Commands::Ping => Command::Ping,
    })
}

/// Send one command, read one response
fn send(server: &str, command: &Command) -> Result<Response> {
    let stream = TcpStream::connect(server)
        .map_err(|e| SableError::Network(format!("failed to connect to {}: {}", server, e)))?;

    let mut writer = BufWriter::new(stream.try_clone()?);
    let mut reader = BufReader::new(stream);

    write_command(&mut writer, command)?;

    read_response(&mut reader)?.ok_or_else(|| {
        SableError::Network("server closed the connection without responding".to_string())
    })
}

/// Print the response the way the issued command expects it
fn print_response(command: &Command, response: &Response) -> ExitCode {
    if !response.is_ok() {
        let message = response.message.as_deref().unwrap_or("unknown error");
        eprintln!("error: {}", message);
        return ExitCode::FAILURE;
    }

    match command {
        Command::Get { .. } => match &response.value {
            Some(value) => println!("{}", value),
            None => println!("(nil)"),
        },
        Command::GetRange { .. } => {
            for (key, value) in response.pairs.as_deref().unwrap_or_default() {
                println!("{}\t{}", key, value);
            }
        }
        Command::Ping => println!("{}", response.value.as_deref().unwrap_or("PONG")),
        _ => println!("OK"),
    }

    ExitCode::SUCCESS
}
