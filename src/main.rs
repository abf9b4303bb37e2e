//! flashkv-cli - Command-line front end for the FlashKV client
//!
//! Runs one command against a server and prints the reply followed by the
//! client's performance summary.

use anyhow::{bail, Context};
use flashkv_client::{ClientConfig, FullClient};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

/// Parsed command line
struct Cli {
    config: ClientConfig,
    /// Log every command at debug level
    verbose: bool,
    /// RENAMENX instead of RENAME
    no_overwrite: bool,
    /// SCAN page size (0 lets the server decide)
    count: usize,
    /// Subcommand and its arguments
    command: Vec<String>,
}

impl Cli {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut cli = Cli {
            config: ClientConfig::default(),
            verbose: false,
            no_overwrite: false,
            count: 0,
            command: Vec::new(),
        };
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    cli.config.host = value_of(&args, i, "--host").to_string();
                    i += 2;
                }
                "--port" | "-p" => {
                    cli.config.port = value_of(&args, i, "--port").parse().unwrap_or_else(|_| {
                        eprintln!("Error: invalid port number");
                        std::process::exit(1);
                    });
                    i += 2;
                }
                "--password" | "-a" => {
                    cli.config.password = Some(value_of(&args, i, "--password").to_string());
                    i += 2;
                }
                "--db" | "-n" => {
                    cli.config.database = value_of(&args, i, "--db").parse().unwrap_or_else(|_| {
                        eprintln!("Error: invalid database number");
                        std::process::exit(1);
                    });
                    i += 2;
                }
                "--count" | "-c" => {
                    cli.count = value_of(&args, i, "--count").parse().unwrap_or_else(|_| {
                        eprintln!("Error: invalid count");
                        std::process::exit(1);
                    });
                    i += 2;
                }
                "--nx" => {
                    cli.no_overwrite = true;
                    i += 1;
                }
                "--verbose" => {
                    cli.verbose = true;
                    i += 1;
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("flashkv-cli version {}", flashkv_client::VERSION);
                    std::process::exit(0);
                }
                flag if flag.starts_with("--") => {
                    eprintln!("Unknown argument: {}", flag);
                    print_help();
                    std::process::exit(1);
                }
                _ => {
                    cli.command.push(args[i].clone());
                    i += 1;
                }
            }
        }

        if cli.command.is_empty() {
            print_help();
            std::process::exit(1);
        }
        cli
    }
}

fn value_of<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i + 1) {
        Some(value) => value,
        None => {
            eprintln!("Error: {} requires a value", flag);
            std::process::exit(1);
        }
    }
}

fn print_help() {
    println!(
        r#"
flashkv-cli - Run commands against a FlashKV (or Redis) server

USAGE:
    flashkv-cli [OPTIONS] <COMMAND> [ARGS...]

OPTIONS:
    -h, --host <HOST>          Server host (default: 127.0.0.1)
    -p, --port <PORT>          Server port (default: 6379)
    -a, --password <PASSWORD>  Password sent with AUTH
    -n, --db <INDEX>           Database selected after connecting
    -c, --count <N>            SCAN page size hint
        --nx                   rename: fail if the new key exists
        --verbose              Log every command
    -v, --version              Print version information
        --help                 Print this help message

COMMANDS:
    ping
    keys <PATTERN>
    scan [PATTERN]
    append <KEY> <VALUE>
    getrange <KEY> <START> <END>
    setrange <KEY> <OFFSET> <VALUE>
    strlen <KEY>
    rename <KEY> <NEWKEY>

EXAMPLES:
    flashkv-cli append greeting "Hello"
    flashkv-cli getrange greeting 0 -1
    flashkv-cli --count 500 scan "user:*"
    flashkv-cli --nx rename draft published
"#
    );
}

fn arg<'a>(command: &'a [String], index: usize, name: &str) -> anyhow::Result<&'a str> {
    match command.get(index) {
        Some(value) => Ok(value),
        None => bail!("{} requires <{}>", command[0], name),
    }
}

async fn run(client: &FullClient, cli: &Cli) -> anyhow::Result<()> {
    let command = &cli.command;
    match command[0].to_ascii_lowercase().as_str() {
        "ping" => println!("{}", client.ping().await?),
        "keys" => {
            for key in client.search(arg(command, 1, "PATTERN")?).await? {
                println!("{}", key);
            }
        }
        "scan" => {
            let pattern = command.get(1).map(String::as_str).unwrap_or("");
            let mut pages = client.keys_scan(pattern, cli.count);
            let mut page_count = 0;
            while let Some(keys) = pages.next_page().await? {
                page_count += 1;
                debug!(page = page_count, keys = keys.len(), cursor = pages.cursor(), "Scan page");
                for key in keys {
                    println!("{}", key);
                }
            }
        }
        "append" => {
            let len = client
                .append(arg(command, 1, "KEY")?, arg(command, 2, "VALUE")?)
                .await?;
            println!("(integer) {}", len);
        }
        "getrange" => {
            let start: i64 = arg(command, 2, "START")?.parse().context("invalid START")?;
            let end: i64 = arg(command, 3, "END")?.parse().context("invalid END")?;
            println!("\"{}\"", client.get_range(arg(command, 1, "KEY")?, start, end).await?);
        }
        "setrange" => {
            let offset: u64 = arg(command, 2, "OFFSET")?.parse().context("invalid OFFSET")?;
            let len = client
                .set_range(arg(command, 1, "KEY")?, offset, arg(command, 3, "VALUE")?)
                .await?;
            println!("(integer) {}", len);
        }
        "strlen" => println!("(integer) {}", client.str_len(arg(command, 1, "KEY")?).await?),
        "rename" => {
            let renamed = client
                .rename(
                    arg(command, 1, "KEY")?,
                    arg(command, 2, "NEWKEY")?,
                    !cli.no_overwrite,
                )
                .await?;
            println!("{}", if renamed { "OK" } else { "(not renamed: target exists)" });
        }
        other => bail!("unknown command '{}' (see --help)", other),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let cli = Cli::from_args();

    // Set up logging
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();

    let client = FullClient::connect(cli.config.clone());
    debug!(server = %cli.config.address(), "Client created");

    let result = run(&client, &cli).await;
    eprintln!("{}", client.perf());
    result
}
