//! Renders `scanrelay` man pages into `OUT_DIR`.
//!
//! `scanrelay.1` documents the top-level command. Each subcommand (`submit`,
//! `run`, `watch` and `monitor`) gets its own `scanrelay-<name>.1` page so
//! the relay's flags are readable offline on the DAQ hosts.

use std::env;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Command, CommandFactory};
use clap_mangen::Man;

#[path = "src/cli/mod.rs"]
mod cli;

use cli::Cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = std::io::stdout();
    writeln!(stdout, "cargo:rerun-if-changed=build.rs")?;
    writeln!(stdout, "cargo:rerun-if-changed=src/cli/mod.rs")?;

    let out_dir =
        PathBuf::from(env::var_os("OUT_DIR").ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "OUT_DIR was not set")
        })?);

    let command = Cli::command();
    render(&command, &out_dir.join("scanrelay.1"))?;
    for subcommand in command.get_subcommands() {
        let page = format!("scanrelay-{}.1", subcommand.get_name());
        render(subcommand, &out_dir.join(page))?;
    }

    Ok(())
}

fn render(command: &Command, target: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut buffer = Vec::new();
    Man::new(command.clone()).render(&mut buffer)?;
    File::create(target)?.write_all(&buffer)?;
    Ok(())
}
