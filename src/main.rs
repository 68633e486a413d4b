use catgen::build::build_project;
use clap::{App, AppSettings, Arg, SubCommand};
use std::path::{Path, PathBuf};
use std::process::exit;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let matches = App::new("catgen")
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .multiple(true)
                .global(true)
                .help("Increases logging verbosity (repeatable)"),
        )
        .subcommand(
            SubCommand::with_name("build")
                .about("Builds the category pages for a project")
                .arg(
                    Arg::with_name("project")
                        .short("p")
                        .long("project")
                        .takes_value(true)
                        .value_name("DIR")
                        .help("A directory inside the project (defaults to the current directory)"),
                )
                .arg(
                    Arg::with_name("output")
                        .short("o")
                        .long("output")
                        .takes_value(true)
                        .value_name("DIR")
                        .help("The output directory (defaults to `_site` in the project root)"),
                ),
        )
        .get_matches();

    init_logging(matches.occurrences_of("verbose"));

    if let ("build", Some(matches)) = matches.subcommand() {
        let project = PathBuf::from(matches.value_of("project").unwrap_or("."));
        let output = matches.value_of("output").map(Path::new);
        match build_project(&project, output) {
            Ok(report) => info!(
                posts = report.posts,
                pages = report.pages.len(),
                "done"
            ),
            Err(e) => {
                error!("{}", e);
                exit(1);
            }
        }
    }
}

// `RUST_LOG` wins over `-v`.
fn init_logging(verbosity: u64) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false).without_time())
        .with(filter)
        .init();
}
