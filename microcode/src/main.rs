mod cli;
mod compiler;
mod ds;
mod error;
mod hex;
mod layout;
mod logging;
mod ssd;
mod table;

use std::path::Path;

use clap::Parser;
use cli::{Cli, Command};
use compiler::RomCompiler;
use log::info;
use table::{ConditionTable, InstructionTable};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose)?;

    match cli.selected() {
        Command::Microcode { output } => generate_microcode(&output)?,
        Command::Ssd { dir } => ssd::write_images(&dir)?,
    }

    Ok(())
}

fn generate_microcode(output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let table = InstructionTable::reference()?;
    let conditions = ConditionTable::reference(&table)?;
    let image = RomCompiler::new(&table, &conditions)?.compile();
    info!("{} words, layout {:?}", image.len(), image.layout());

    hex::write_hex_file(output, image.raw_words(), 4)?;
    Ok(())
}
