use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use simplelog::{ColorChoice, TermLogger, TerminalMode};

use rawland::{create_a_window, destroy_a_window, WindowConfig};

use cli::Rawland;

mod cli;

fn main() -> Result<()> {
    let cli = Rawland::parse();
    make_logger(cli.quiet);

    let config = WindowConfig {
        width: cli.width,
        height: cli.height,
        title: cli.title,
        app_id: cli.app_id,
    };

    let mut window = create_a_window(config).context("failed to connect to the compositor")?;
    let result = window.run();
    destroy_a_window(window);
    result.context("wayland session ended with an error")?;

    info!("goodbye");
    Ok(())
}

fn make_logger(quiet: bool) {
    let config = simplelog::ConfigBuilder::new()
        .set_thread_level(LevelFilter::Off)
        .build();

    let level = if quiet {
        LevelFilter::Error
    } else {
        LevelFilter::Debug
    };

    // a second logger can only come from a test harness, which already has one
    if let Err(e) = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto) {
        eprintln!("failed to initialize logger: {e}");
    }
}
