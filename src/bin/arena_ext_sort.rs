//! Command-line front-end for the external sort. Arguments are order-
//! independent `name=value` pairs, matching the reference `Utils::Arguments`
//! contract exactly rather than introducing `--flag`-style parsing that
//! would change the on-disk CLI (see `SPEC_FULL.md` §6, §9).

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use arena_ext_sort::sort::ExternalSort;
use log::{error, info};

const ARG_USAGE_REQUEST: &str = "?";
const ARG_INPUT: &str = "input";
const ARG_OUTPUT: &str = "output";
const ARG_TEMP_DIR: &str = "temp_dir";
const ARG_MAX_MEMORY_USAGE_MB: &str = "max_memory_usage_Mb";
const ARG_MAX_WRITE_BUFFER_KB: &str = "max_write_buffer_Kb";
const ARG_REMOVE_TEMP_FILES: &str = "remove_temp_files";

const DEFAULT_TEMP_DIR: &str = "./temp/";
const DEFAULT_MAX_MEMORY_USAGE_MB: &str = "16";
const DEFAULT_MAX_WRITE_BUFFER_KB: &str = "128";
const DEFAULT_REMOVE_TEMP_FILES: &str = "1";

/// Parses `name=value` command-line arguments into a lookup map, mirroring
/// the reference's `Utils::Arguments` parser: a bare `name` (no `=`) is
/// recorded with an empty value, surrounding whitespace is trimmed, and a
/// single pair of enclosing double quotes is stripped before the `=` split.
fn parse_args(raw: &[String]) -> BTreeMap<String, String> {
    let mut args = BTreeMap::new();
    for arg in raw {
        let trimmed = arg.trim();
        if trimmed.is_empty() {
            continue;
        }
        let unquoted = if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
            &trimmed[1..trimmed.len() - 1]
        } else {
            trimmed
        };
        match unquoted.find('=') {
            Some(pos) => {
                let name = unquoted[..pos].trim().to_string();
                let value = unquoted[pos + 1..].trim().to_string();
                args.insert(name, value);
            }
            None => {
                args.insert(unquoted.trim().to_string(), String::new());
            }
        }
    }
    args
}

fn usage(app_name: &str) -> String {
    format!(
        "\n{app_name} usage:\n\n\
         Parameters format is 'param_name=param_value'\n\n\
         {app_name} {ARG_INPUT} {ARG_OUTPUT} [{ARG_TEMP_DIR}] [{ARG_MAX_MEMORY_USAGE_MB}] [{ARG_MAX_WRITE_BUFFER_KB}] [{ARG_REMOVE_TEMP_FILES}]\n\n\
         Where:\n\
         \u{20}\u{20}{ARG_INPUT} - file path to be sorted (must exist).\n\
         \u{20}\u{20}{ARG_OUTPUT} - result file path (must NOT exist).\n\
         \u{20}\u{20}{ARG_TEMP_DIR} - path to a directory for temporary files (default '{DEFAULT_TEMP_DIR}').\n\
         \u{20}\u{20}{ARG_MAX_MEMORY_USAGE_MB} - max memory usage in Mb (default '{DEFAULT_MAX_MEMORY_USAGE_MB}').\n\
         \u{20}\u{20}{ARG_MAX_WRITE_BUFFER_KB} - max write buffer size in Kb (default '{DEFAULT_MAX_WRITE_BUFFER_KB}').\n\
         \u{20}\u{20}{ARG_REMOVE_TEMP_FILES} - set to 1/true/yes to remove temporary files (default '{DEFAULT_REMOVE_TEMP_FILES}').\n"
    )
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(anyhow!("unexpected bool argument value (name = '{name}', value = '{other}')")),
    }
}

fn run(args: &BTreeMap<String, String>, app_name: &str) -> Result<()> {
    if args.contains_key(ARG_USAGE_REQUEST) {
        info!("{}", usage(app_name));
        return Ok(());
    }

    let input = args
        .get(ARG_INPUT)
        .ok_or_else(|| anyhow!("missing required argument '{ARG_INPUT}'"))?;
    let output = args
        .get(ARG_OUTPUT)
        .ok_or_else(|| anyhow!("missing required argument '{ARG_OUTPUT}'"))?;
    let temp_dir = args.get(ARG_TEMP_DIR).map(String::as_str).unwrap_or(DEFAULT_TEMP_DIR);
    let max_memory_usage_mb: usize = args
        .get(ARG_MAX_MEMORY_USAGE_MB)
        .map(String::as_str)
        .unwrap_or(DEFAULT_MAX_MEMORY_USAGE_MB)
        .parse()
        .context("invalid max_memory_usage_Mb")?;
    let max_write_buffer_kb: usize = args
        .get(ARG_MAX_WRITE_BUFFER_KB)
        .map(String::as_str)
        .unwrap_or(DEFAULT_MAX_WRITE_BUFFER_KB)
        .parse()
        .context("invalid max_write_buffer_Kb")?;
    let remove_temp_files = parse_bool(
        ARG_REMOVE_TEMP_FILES,
        args.get(ARG_REMOVE_TEMP_FILES).map(String::as_str).unwrap_or(DEFAULT_REMOVE_TEMP_FILES),
    )?;

    if max_memory_usage_mb == 0 {
        return Err(anyhow!("max_memory_usage_Mb must be at least 1"));
    }
    if max_write_buffer_kb == 0 {
        return Err(anyhow!("max_write_buffer_Kb must be at least 1"));
    }

    info!("args: {args:?}");

    let mut external_sort = ExternalSort::new(PathBuf::from(input), PathBuf::from(output));
    external_sort.with_tmp_dir(PathBuf::from(temp_dir));
    external_sort.with_max_memory_usage_bytes(max_memory_usage_mb * 1024 * 1024);
    external_sort.with_max_write_buffer_bytes(max_write_buffer_kb * 1024);
    external_sort.with_remove_temp_files(remove_temp_files);

    let report = external_sort.sort()?;
    info!(
        "done: {} run(s), {} merge task(s), {} bytes merged",
        report.runs_generated, report.merge_tasks, report.bytes_merged
    );
    Ok(())
}

fn main() -> ExitCode {
    simple_logger::SimpleLogger::new().env().init().expect("failed to initialize logger");

    let app_name = std::env::args()
        .next()
        .map(PathBuf::from)
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "arena-ext-sort".to_string());
    let rest: Vec<String> = std::env::args().skip(1).collect();
    let args = parse_args(&rest);

    match run(&args, &app_name) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            for cause in err.chain() {
                error!("{cause}");
            }
            ExitCode::FAILURE
        }
    }
}
