//! respkv CLI Client
//!
//! Command-line interface for interacting with a respkv server.

use std::io::{BufReader, BufWriter, Write};
use std::net::TcpStream;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use respkv::protocol::{encode_command, read_frame, Frame};

/// respkv CLI
#[derive(Parser, Debug)]
#[command(name = "respkv-cli")]
#[command(about = "CLI for the respkv key-value server")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ping the server, optionally echoing a message
    Ping {
        message: Option<String>,
    },

    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Count how many of the keys exist
    Exists {
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Delete one or more keys
    Del {
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

impl Commands {
    fn to_parts(&self) -> Vec<&[u8]> {
        let (name, args): (&str, Vec<&String>) = match self {
            Commands::Ping { message } => ("PING", message.iter().collect()),
            Commands::Get { key } => ("GET", vec![key]),
            Commands::Set { key, value } => ("SET", vec![key, value]),
            Commands::Exists { keys } => ("EXISTS", keys.iter().collect()),
            Commands::Del { keys } => ("DEL", keys.iter().collect()),
        };

        std::iter::once(name.as_bytes())
            .chain(args.into_iter().map(|arg| arg.as_bytes()))
            .collect()
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(frame) => {
            print_frame(&frame, 0);
            if frame.is_error() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Could not talk to {}: {}", args.server, e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> respkv::Result<Frame> {
    let stream = TcpStream::connect(&args.server)?;
    let mut writer = BufWriter::new(stream.try_clone()?);
    let mut reader = BufReader::new(stream);

    writer.write_all(&encode_command(&args.command.to_parts()))?;
    writer.flush()?;

    read_frame(&mut reader)
}

/// Print a reply the way redis-cli does
fn print_frame(frame: &Frame, indent: usize) {
    let pad = " ".repeat(indent);
    if frame.is_null() {
        println!("{}(nil)", pad);
        return;
    }

    match frame {
        Frame::Simple(text) => println!("{}{}", pad, text),
        Frame::Error(text) => println!("{}(error) {}", pad, text),
        Frame::Integer(n) => println!("{}(integer) {}", pad, n),
        Frame::Bulk(Some(data)) => println!("{}{:?}", pad, String::from_utf8_lossy(data)),
        // Printed as (nil) above
        Frame::Bulk(None) | Frame::Array(None) => {}
        Frame::Array(Some(items)) if items.is_empty() => println!("{}(empty array)", pad),
        Frame::Array(Some(items)) => {
            for (i, item) in items.iter().enumerate() {
                println!("{}{})", pad, i + 1);
                print_frame(item, indent + 2);
            }
        }
    }
}
