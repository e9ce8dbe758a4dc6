//! Entrypoint of the tradestream binary

use dotenvy::dotenv;

mod commands {
    pub(crate) mod common;
    pub(crate) mod emit;
}
mod logging;
mod sink;
mod trades;

enum ReturnCode {
    Failure = 1,
}

#[derive(Debug, clap::Parser)]
#[clap(
    name = "tradestream",
    about = "Generate stock trades and stream them into an ingestion server",
    long_about = r#"Generate stock trades and stream them into an ingestion server

Examples:
    # Emit trades to the stream `trades` with a fixed backpressure gate
    tradestream emit --stream trades --max-outstanding 10000 --backpressure-delay 100ms

    # Emit trades with the slow-cycle retuning policy
    tradestream emit --stream trades --throughput-mode slow-cycle

    # Run with full debug logging specified with LOG_FILTER
    LOG_FILTER=debug tradestream emit --stream trades --throughput-mode 1
"#
)]
struct Config {
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, clap::Parser)]
enum Command {
    /// Generate trades and emit them to a running ingestion server
    Emit(commands::emit::Config),
}

#[tokio::main]
async fn main() {
    // load all environment variables from .env before doing anything
    load_dotenv();

    let config: Config = clap::Parser::parse();

    if let Err(e) = logging::init_logs() {
        eprintln!("Initializing logs failed: {e}");
        std::process::exit(ReturnCode::Failure as _);
    }

    match config.command {
        None => println!("command required, -h/--help for help"),
        Some(Command::Emit(config)) => {
            if let Err(e) = commands::emit::command(config).await {
                eprintln!("Emit command failed: {e:#}");
                std::process::exit(ReturnCode::Failure as _)
            }
        }
    }
}

/// Source the .env file before initialising the Config struct - this sets
/// any envs in the file, which the Config struct then uses.
///
/// Precedence is given to existing env variables.
fn load_dotenv() {
    match dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            // Ignore this - a missing env file is not an error, defaults will
            // be applied when initialising the Config struct.
        }
        Err(e) => {
            eprintln!("FATAL Error loading config from: {e}");
            eprintln!("Aborting");
            std::process::exit(1);
        }
    };
}
