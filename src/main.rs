use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::Shell;

use xcode_update::{
    commands::{self, UpdateOptions},
    paths::Paths,
    ui::{ColorMode, Ui},
};

#[derive(Parser)]
#[command(name = "xcode-update")]
#[command(
    about = "Install the newest Xcode, retire an old one and keep the Xcode-Beta and Xcode-Release links current"
)]
#[command(version)]
struct Cli {
    /// Apply the plan without previewing it or asking for confirmation
    #[arg(short = 'n', long)]
    non_interactive: bool,

    /// Do not delete any installed Xcode version
    #[arg(short = 's', long)]
    skip_delete: bool,

    /// Only update the links; never install or delete
    #[arg(short = 'l', long)]
    links_only: bool,

    /// Show installed versions and the current links, then exit
    #[arg(long, conflicts_with_all = ["non_interactive", "skip_delete", "links_only"])]
    status: bool,

    /// Do not create Finder aliases next to the links
    #[arg(long)]
    no_finder_alias: bool,

    /// Print a shell completion script to stdout
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,

    /// Print every xcodes invocation and check
    #[arg(long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// When to use colors: always, auto, never
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    color: ColorMode,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let ui = Ui::new(cli.color, cli.no_color).with_verbose(cli.verbose);

    match run(cli, &ui) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui.err(format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, ui: &Ui) -> Result<()> {
    if let Some(shell) = cli.completions {
        clap_complete::generate(shell, &mut Cli::command(), "xcode-update", &mut io::stdout());
        return Ok(());
    }

    let mut paths = Paths::from_env()?;
    if cli.no_finder_alias {
        paths.finder_aliases = false;
    }

    if cli.status {
        return commands::status(&paths, ui);
    }

    let options = UpdateOptions {
        non_interactive: cli.non_interactive,
        skip_delete: cli.skip_delete,
        links_only: cli.links_only,
    };
    commands::run(&paths, ui, options)?;
    Ok(())
}
