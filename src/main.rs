use anyhow::{anyhow, Context, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use combien::build::{build_site, Clock};
use combien::config::Config;
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let matches = App::new("combien")
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("build")
                .about("Builds the site into the output directory")
                .arg(
                    Arg::with_name("PROJECT")
                        .help("The project directory (or any directory below it)")
                        .default_value("."),
                )
                .arg(
                    Arg::with_name("output")
                        .short("o")
                        .long("output")
                        .value_name("DIR")
                        .help("The output directory")
                        .default_value("_site"),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        ("build", Some(matches)) => build(matches),
        (name, _) => Err(anyhow!("Unknown subcommand `{}`", name)),
    }
}

fn build(matches: &ArgMatches) -> Result<()> {
    // Both arguments have defaults.
    let project = Path::new(matches.value_of("PROJECT").unwrap_or("."));
    let output = Path::new(matches.value_of("output").unwrap_or("_site"));

    let project = std::fs::canonicalize(project)
        .with_context(|| format!("Resolving project directory {}", project.display()))?;
    let config = Config::from_directory(&project, output)?;
    std::fs::create_dir_all(&config.output_directory)
        .with_context(|| format!("Creating output directory {}", output.display()))?;
    let report = build_site(&config, &Clock::now()).context("Building site")?;
    println!(
        "Wrote {} files into {}",
        report.files_written + report.static_files_copied,
        config.output_directory.display()
    );
    Ok(())
}
