mod cli;

use colored::Colorize;

fn main() {
    // diagnostics are printed by the CLI itself; RUST_LOG turns on the library's log output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("off")).init();
    let command_line_interface = cli::CommandLineInterface::load();
    if let Err(error) = command_line_interface.run() {
        eprintln!("{} {error:#}", "error:".red().bold());
        std::process::exit(1);
    }
}
