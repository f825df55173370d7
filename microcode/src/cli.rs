use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "Microcode ROM Programmer")]
#[command(version = "1.0")]
#[command(about = "Generates ROM images for the 8-bit CPU", long_about = None)]
pub(crate) struct Cli {
    /// Log more detail (repeat for more)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub(crate) verbose: u8,

    /// Image to generate (defaults to the instruction decoder ROM)
    #[command(subcommand)]
    pub(crate) command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub(crate) enum Command {
    /// Instruction decoder ROM
    Microcode {
        /// Output file
        #[arg(short, long, default_value = DEFAULT_OUTPUT)]
        output: PathBuf,
    },
    /// Seven-segment display EEPROMs
    Ssd {
        /// Output directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
}

pub(crate) const DEFAULT_OUTPUT: &str = "mc_rom.txt";

impl Cli {
    pub(crate) fn selected(&self) -> Command {
        self.command.clone().unwrap_or_else(|| Command::Microcode {
            output: PathBuf::from(DEFAULT_OUTPUT),
        })
    }
}
