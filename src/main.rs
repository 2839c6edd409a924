mod api;
mod app;
mod application;
mod config;
mod console;
mod domain;
mod ui;
mod utils;

use std::error::Error;
use std::io;

use clap::Parser;
use iced::{window, Size};

use crate::config::{AppConfig, Cli};

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    config::init_logging(cli.verbose);

    let config = AppConfig::from_cli(&cli);
    log::info!("saving downloads to {}", config.download_dir.display());

    if cli.console {
        let stdin = io::stdin();
        let mut console = console::Console::new(
            config.coordinator(),
            config.download_dir.clone(),
            stdin.lock(),
            io::stdout(),
        )?;
        console.run()?;
        return Ok(());
    }

    iced::application(
        move || app::DownloadApp::new(&config),
        app::update,
        app::view,
    )
    .title("YTD - YouTube Downloader")
    .window(window::Settings {
        size: Size::new(720.0, 760.0),
        min_size: Some(Size::new(560.0, 520.0)),
        ..Default::default()
    })
    .run()?;

    Ok(())
}
