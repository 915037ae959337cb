use std::io::Error;
use std::path::PathBuf;

use clap::CommandFactory;
use clap_complete::{generate_to, Shell};

include!("src/cli.rs");

const APP_NAME: &str = "rawland";

fn main() -> Result<(), Error> {
    println!("cargo:rerun-if-changed=src/cli.rs");

    let outdir = completion_dir()?;
    let mut app = Rawland::command();

    let shells = [Shell::Bash, Shell::Zsh, Shell::Fish, Shell::Elvish];
    for shell in shells {
        generate_to(shell, &mut app, APP_NAME, &outdir)?;
    }
    Ok(())
}

/// Completions go next to the other build artifacts, so building never touches the source tree
fn completion_dir() -> std::io::Result<PathBuf> {
    let out_dir = std::env::var_os("OUT_DIR")
        .ok_or_else(|| Error::other("cargo did not set OUT_DIR"))?;
    let path = PathBuf::from(out_dir).join("completions");
    if !path.is_dir() {
        std::fs::create_dir(&path)?;
    }
    Ok(path)
}
