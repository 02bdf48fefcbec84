//! BucketKV CLI Client
//!
//! Command-line interface for interacting with BucketKV.

use std::process::ExitCode;

use bucketkv::network::Client;
use bucketkv::protocol::Response;
use bucketkv::Keystore;
use clap::{Parser, Subcommand};

/// BucketKV CLI
#[derive(Parser, Debug)]
#[command(name = "bucketkv-cli")]
#[command(about = "CLI for BucketKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Username
    #[arg(short, long, default_value = "admin")]
    user: String,

    /// Password
    #[arg(short, long, default_value = "admin")]
    pass: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upsert entries into a bucket
    Write {
        db: String,
        bucket: String,

        /// Entries as KEY=VALUE
        #[arg(required = true, value_parser = parse_entry)]
        entries: Vec<(String, String)>,
    },

    /// Read entries (all of them when no keys are given)
    Read {
        db: String,
        bucket: String,
        keys: Vec<String>,
    },

    /// Delete keys from a bucket
    Delete {
        db: String,
        bucket: String,
        keys: Vec<String>,
    },

    /// Ping the server
    Ping,
}

fn parse_entry(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(response) => {
            print_response(&response);
            if response.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> bucketkv::Result<Response> {
    let mut client = Client::connect(&args.server)?;

    if let Commands::Ping = args.command {
        return client.ping();
    }

    let auth = client.authenticate(&args.user, &args.pass)?;
    if !auth.is_success() {
        return Ok(auth);
    }

    match args.command {
        Commands::Write { db, bucket, entries } => {
            let entries: Keystore = entries.into_iter().collect();
            client.write(&db, &bucket, entries)
        }
        Commands::Read { db, bucket, keys } => client.read(&db, &bucket, keys),
        Commands::Delete { db, bucket, keys } => client.delete(&db, &bucket, keys),
        Commands::Ping => client.ping(),
    }
}

fn print_response(response: &Response) {
    let reply = &response.reply;
    println!("success: {}", reply.success);
    println!("message: {}", reply.message);
    for (key, value) in &reply.keystore {
        println!("{}={}", key, value);
    }
}
