mod channels;
mod config;
mod core;
mod dates;
mod intent;
mod meals;
mod mensa;
mod openmensa;
mod providers;
#[cfg(test)]
mod testing;

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Load .env before anything reads environment variables.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config_path = PathBuf::from("config.toml");
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                let Some(path) = iter.next() else {
                    eprintln!("--config requires a path");
                    std::process::exit(2);
                };
                config_path = PathBuf::from(path);
            }
            other => {
                eprintln!("Unknown argument: '{}'", other);
                print_help();
                std::process::exit(2);
            }
        }
    }

    let config = config::AppConfig::load(&config_path)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(crate::core::run(config))
}

fn print_help() {
    println!(
        "{} {}\n{}\n\n\
         USAGE:\n    {} [OPTIONS]\n\n\
         OPTIONS:\n    \
         -c, --config <PATH>    Path to the config file (default: config.toml)\n    \
         -h, --help             Print help\n    \
         -V, --version          Print version",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_NAME"),
    );
}
