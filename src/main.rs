use clap::Parser;
use colored::Colorize;
use log::LevelFilter;
use std::process::ExitCode;

mod chapter_range;
mod console;
mod convert;
mod library;
mod manga;
mod version;
use manga::get::GetManga;

#[tokio::main]
async fn main() -> ExitCode {
    let manga = GetManga::parse();

    env_logger::Builder::new()
        .filter_level(if manga.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .parse_default_env()
        .init();

    tokio::select! {
        result = manga.run() => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                console::report(&err);
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            println!("{}", "\nCancelled".dimmed());
            // Blocking reads of stdin would keep the runtime alive.
            std::process::exit(130)
        }
    }
}
