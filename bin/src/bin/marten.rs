use clap::Parser;
use marten_bin::{
    cli::{Cli, Command},
    commands,
};

fn main() {
    let cli = Cli::parse();

    let _log_guard = match marten_log::init(marten_log::LogConfig {
        log_file_path: cli.log_file.clone(),
    }) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: Failed to initialize logging: {e}");
            None
        },
    };

    let command = cli.command.clone().unwrap_or(Command::Repl);
    let result = match command {
        Command::Repl => commands::repl::handle(&cli),
        Command::Check => commands::check::handle(&cli),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
