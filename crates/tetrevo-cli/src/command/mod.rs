use clap::{Parser, Subcommand};

use self::{evolve::EvolveArg, peer::PeerArg, states::StatesArg};

mod config;
mod evolve;
mod interrupt;
mod peer;
mod states;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Evolve a population in this process
    Evolve(#[clap(flatten)] EvolveArg),
    /// Run one unit of a multi-process evolution sharing a store directory
    Peer(#[clap(flatten)] PeerArg),
    /// Print the latest render states of every agent
    States(#[clap(flatten)] StatesArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Evolve(arg) => evolve::run(&arg)?,
        Mode::Peer(arg) => peer::run(&arg)?,
        Mode::States(arg) => states::run(&arg)?,
    }
    Ok(())
}
