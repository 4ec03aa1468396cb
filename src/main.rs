use std::process::ExitCode;

use log::{error, info};

use vitrine::ShowroomConfig;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("loading configuration from {path}");
            match ShowroomConfig::load(&path) {
                Ok(config) => config,
                Err(e) => {
                    error!("{e}");
                    return ExitCode::FAILURE;
                }
            }
        }
        None => ShowroomConfig::default(),
    };

    match vitrine::run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
