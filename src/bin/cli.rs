//! msgboard CLI Client
//!
//! Interactive user application for the message board.

use std::io::{self, BufRead, Write};

use clap::Parser;
use msgboard::client::{describe_status, Client, ClientCommand, Outcome, Session};
use msgboard::protocol::CommandKind;
use msgboard::validation::{is_valid_address, is_valid_port};
use msgboard::{BoardError, ClientConfig};
use tracing_subscriber::{fmt, EnvFilter};

/// msgboard CLI
#[derive(Parser, Debug)]
#[command(name = "msgboard-cli")]
#[command(about = "Interactive client for the msgboard server")]
struct Args {
    /// Server host name or IPv4 address
    #[arg(short = 'n', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = msgboard::config::DEFAULT_PORT.to_string())]
    port: String,

    /// Directory where retrieved files are saved
    #[arg(short, long, default_value = ".")]
    download_dir: String,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();
    if !is_valid_address(&args.host) || !is_valid_port(&args.port) {
        eprintln!("[-] Invalid server address {}:{}", args.host, args.port);
        std::process::exit(1);
    }

    let config = ClientConfig {
        server_host: args.host,
        server_port: args.port.parse().unwrap_or(msgboard::config::DEFAULT_PORT),
        download_dir: args.download_dir.into(),
        ..ClientConfig::default()
    };

    let client = match Client::connect(config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("[-] Cannot reach server: {}", e);
            std::process::exit(1);
        }
    };

    let mut session = Session::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                eprintln!("[-] Failed to read input: {}", e);
                break;
            }
            None => "exit".to_string(),
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match ClientCommand::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("[-] {}", e);
                continue;
            }
        };

        match client.execute(&mut session, command) {
            Ok(Outcome::Exit) => {
                println!("[+] Exiting...");
                break;
            }
            Ok(outcome) => print_outcome(&outcome),
            Err(e @ BoardError::Malformed(_)) => {
                eprintln!("[-] Unexpected reply from server ({}). Exiting.", e);
                std::process::exit(1);
            }
            Err(e) => eprintln!("[-] {}", e),
        }
    }
}

fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Status { kind, status } => println!("[+] {}", describe_status(*kind, *status)),
        Outcome::ServerError(kind) => eprintln!("[-] Server could not parse the {} request", kind.verb()),
        Outcome::Groups { kind, groups } => {
            if groups.is_empty() {
                match kind {
                    CommandKind::MyGroups => println!("[+] You are not subscribed to any group."),
                    _ => println!("[+] There are no available groups."),
                }
                return;
            }
            println!("[+] {} group(s): (GID | GName | Last MID)", groups.len());
            for group in groups {
                println!("-> {} | {:>24} | {}", group.gid, group.name, group.last_mid);
            }
        }
        Outcome::Members { gid, members } => {
            println!("[+] Users subscribed to group {}: (UID)", gid);
            for uid in members {
                println!("-> {}", uid);
            }
        }
        Outcome::UnknownGroup(gid) => eprintln!("[-] Group {} does not exist.", gid),
        Outcome::Posted(mid) => println!("[+] Message posted with ID {}.", mid),
        Outcome::PostRejected => eprintln!("[-] The post was rejected by the server."),
        Outcome::Retrieved(messages) => {
            println!("[+] {} message(s) retrieved:", messages.len());
            for message in messages {
                println!("-> {} | {} | {}", message.mid, message.author, message.text);
                if let Some(file) = &message.file {
                    println!("   file saved: {} ({} bytes)", file.name, file.size);
                }
            }
        }
        Outcome::NoMessages => println!("[+] There are no messages available."),
        Outcome::NotSubscribed => eprintln!("[-] You are not subscribed to the selected group."),
        Outcome::ShowUid(Some(uid)) => println!("[+] You're logged in with user ID {}.", uid),
        Outcome::ShowUid(None) => println!("[-] You're not logged in into any account."),
        Outcome::ShowGid(Some(gid)) => println!("[+] Group {} is selected.", gid),
        Outcome::ShowGid(None) => println!("[-] You haven't selected any group yet."),
        Outcome::Selected(gid) => println!("[+] Group {} selected.", gid),
        Outcome::Refused(reason) => eprintln!("[-] {}", reason),
        Outcome::Exit => {}
    }
}
