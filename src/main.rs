use std::io::IsTerminal;

use clap::Parser;

use winup::cli::Cli;
use winup::error::WinupError;
use winup::pipeline::{Pipeline, ProvisionRequest};
use winup::progress::OutputMode;
use winup::{logging, paths, privilege};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let mode = resolve_output_mode(cli.verbose);
    logging::init(mode);

    if let Err(err) = run(cli, mode).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

async fn run(cli: Cli, mode: OutputMode) -> Result<(), WinupError> {
    let request = ProvisionRequest {
        ram: cli.ram,
        cpus: cli.cpus,
        disk_size_gb: cli.disk_size,
        iso: cli.iso,
        disk_path: cli.disk_image.unwrap_or_else(paths::default_disk_path),
        net: cli.net,
        download_dir: cli.download_dir.unwrap_or_else(paths::download_dir),
    };

    // Malformed input aborts here, before the pipeline touches the host.
    request.validate()?;

    let checker = privilege::platform_checker();
    Pipeline::new().run(checker.as_ref(), request, mode).await
}

fn resolve_output_mode(verbose: bool) -> OutputMode {
    if verbose {
        OutputMode::Verbose
    } else if std::io::stdout().is_terminal() && std::io::stderr().is_terminal() {
        OutputMode::Normal
    } else {
        OutputMode::Plain
    }
}
