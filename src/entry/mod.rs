mod plan;

use std::ffi::OsString;
use std::path::Path;

use clap::{ArgMatches, CommandFactory, FromArgMatches};

use crate::args::HarnessArgs;
use crate::config::DEFAULT_CONFIG_FILES;
use crate::error::AppResult;
use plan::{build_plan, execute_plan};

pub(crate) use plan::{ProbeSettings, RunSettings};

/// Environment variable clap reads the bootstrap token from.
const TOKEN_ENV: &str = "AGENTSTORM_TOKEN";

pub(crate) fn run() -> AppResult<()> {
    let Some((args, matches)) = parse_args()? else {
        return Ok(());
    };

    crate::system::logger::init_logging(args.verbose, args.no_color);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_async(args, &matches))
}

fn parse_args() -> AppResult<Option<(HarnessArgs, ArgMatches)>> {
    let mut cmd = HarnessArgs::command();
    let raw_args: Vec<OsString> = std::env::args_os().collect();

    if should_show_help(&raw_args) {
        cmd.print_help()?;
        println!();
        return Ok(None);
    }

    let matches = cmd.get_matches_from(raw_args);
    let args = HarnessArgs::from_arg_matches(&matches)?;

    Ok(Some((args, matches)))
}

/// A bare invocation prints help unless a config file or token env var
/// could make it a valid run.
fn should_show_help(raw_args: &[OsString]) -> bool {
    let treat_as_empty =
        matches!(raw_args, [] | [_]) || matches!(raw_args, [_, second] if second == "--");
    if !treat_as_empty {
        return false;
    }

    !has_default_config() && std::env::var_os(TOKEN_ENV).is_none()
}

fn has_default_config() -> bool {
    DEFAULT_CONFIG_FILES
        .iter()
        .any(|path| Path::new(path).exists())
}

async fn run_async(args: HarnessArgs, matches: &ArgMatches) -> AppResult<()> {
    let plan = build_plan(args, matches)?;
    execute_plan(plan).await
}
