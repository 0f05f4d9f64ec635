use anyhow::Result;
use clap::Parser;

use xdgmenu_cli::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();

    let (name, quiet) = match &args.command {
        cli::Command::Show(_) => ("show", true),
        cli::Command::Validate(_) => ("validate", false),
        cli::Command::Edit(opts) => ("edit", opts.dry_run),
        cli::Command::Completions(_) | cli::Command::Version => ("cli", true),
    };
    logging::init_subscriber(args.verbose, quiet, name);
    let log = logging::Logger::new(name);

    match args.command {
        cli::Command::Show(opts) => commands::show::run(&args.global, &opts, &log),
        cli::Command::Validate(opts) => commands::validate::run(&args.global, &opts, &log),
        cli::Command::Edit(opts) => commands::edit::run(&args.global, &opts, &log),
        cli::Command::Completions(opts) => {
            commands::completions::run(&opts, &mut std::io::stdout().lock());
            Ok(())
        }
        cli::Command::Version => Ok(commands::version::run(&mut std::io::stdout().lock())?),
    }
}
