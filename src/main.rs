//! `xsql-npm-publish` entrypoint.
//!
//! Publishes one xsql release to npm: pins manifest versions, pulls the
//! platform binaries from the GitHub release, and publishes every package.

use clap::Parser;
use std::io::Write;
use xsql_npm_release::cli::Cli;
use xsql_npm_release::config::ReleaseConfig;
use xsql_npm_release::error::Result;
use xsql_npm_release::orchestrator::release;
use xsql_npm_release::output::write_stderr_line;

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Install `env_logger`; `RUST_LOG` overrides the level chosen by `-v`/`-q`.
fn init_logging(cli: &Cli) {
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let request = cli.release_request()?;
    let root = cli.root_dir();
    let config = ReleaseConfig::load(root, cli.config.as_deref())?;
    release(&config, root, &request, stderr)?;
    Ok(())
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            log::debug!("release aborted: {err:?}");
            write_stderr_line(stderr, err);
            1
        }
    }
}
