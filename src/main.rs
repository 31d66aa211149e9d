use std::env;
use std::process::ExitCode;

use siftclick::automation::{AutoClicker, RandomPacer};
use siftclick::catalog::Catalog;
use siftclick::config::{help_text, Command, RunConfig};
use siftclick::engine::MatchEngine;
use siftclick::errors::AutoClickError;
use siftclick::{desktop, Sift};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let config = match RunConfig::parse(env::args().skip(1)) {
        Ok(Command::Run(config)) => config,
        Ok(Command::Help) => {
            println!("{}", help_text());
            return ExitCode::SUCCESS;
        }
        Ok(Command::Version) => {
            println!("siftclick v{}", env!("CARGO_PKG_VERSION"));
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprintln!("{err}\n\n{}", help_text());
            return ExitCode::from(2);
        }
    };

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: RunConfig) -> Result<(), AutoClickError> {
    let engine = MatchEngine::with_extractor(Sift::default()).with_policy(config.match_policy);
    let catalog = Catalog::load_directory(&config.templates_dir, engine.extractor())?;
    let (screen, pointer) = desktop::open()?;
    let pacer = RandomPacer::new(config.sleep_min, config.sleep_max);

    let mut clicker = AutoClicker::new(screen, pointer, pacer, engine, catalog);
    clicker.run(config.max_cycles)
}
