//! CLI entry point for the transcript recorder.
//!
//! # Usage
//!
//! ```bash
//! # Check if accessibility permissions are granted
//! transcript-recorder --check-permissions
//!
//! # Record Zoom captions every 10 seconds, 30 times, then merge
//! transcript-recorder --record apps.json zoom --interval 10 --count 30
//!
//! # Run the configured search paths against a saved tree dump
//! transcript-recorder --replay apps.json zoom tree.json --output /tmp/out
//!
//! # Merge snapshot files into one transcript
//! transcript-recorder --merge merged.txt snap1.txt snap2.txt snap3.txt
//! ```
//!
//! Results are printed to stdout as JSON; diagnostics go to stderr and the
//! log (`RUST_LOG=debug`).

use std::env;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use serde_json::json;

use transcript_recorder::ax::memory::{MemoryHost, MemoryNode};
use transcript_recorder::merge::merge_transcript_files;
use transcript_recorder::{
    load_app_config, AppConfig, AxHost, ExportOutcome, MergeOutcome, ProcessLister, TranscriptRecorder,
    DEFAULT_MIN_MATCH_LENGTH,
};

/// Pid under which a replayed tree dump is registered
const REPLAY_PID: u32 = 1;

/// CLI command to execute
#[derive(Debug, Clone, PartialEq)]
enum Command {
    /// Check if accessibility permissions are granted
    CheckPermissions,
    /// Poll an application and write snapshots
    Record(RecordArgs),
    /// Export once from a JSON tree dump
    Replay {
        config: PathBuf,
        app: String,
        tree: PathBuf,
        output: Option<PathBuf>,
    },
    /// Merge transcript files
    Merge { output: PathBuf, inputs: Vec<PathBuf> },
    /// Show help message
    Help,
}

#[derive(Debug, Clone, PartialEq)]
struct RecordArgs {
    config: PathBuf,
    app: String,
    output: Option<PathBuf>,
    interval: Option<u64>,
    /// 0 polls until interrupted
    count: u64,
}

/// Parse command line arguments (without the program name)
fn parse_args(args: &[String]) -> Result<Command, String> {
    let Some(command) = args.first() else {
        return Ok(Command::Help);
    };

    match command.as_str() {
        "--check-permissions" | "-c" => Ok(Command::CheckPermissions),
        "--record" | "-r" => {
            let (positional, options) = split_options(&args[1..])?;
            let [config, app] = positional.as_slice() else {
                return Err("--record requires <CONFIG> <APP> (e.g., --record apps.json zoom)".into());
            };
            Ok(Command::Record(RecordArgs {
                config: PathBuf::from(config),
                app: app.clone(),
                output: options.output,
                interval: options.interval,
                count: options.count.unwrap_or(0),
            }))
        }
        "--replay" => {
            let (positional, options) = split_options(&args[1..])?;
            let [config, app, tree] = positional.as_slice() else {
                return Err("--replay requires <CONFIG> <APP> <TREE_JSON>".into());
            };
            Ok(Command::Replay {
                config: PathBuf::from(config),
                app: app.clone(),
                tree: PathBuf::from(tree),
                output: options.output,
            })
        }
        "--merge" | "-m" => {
            if args.len() < 3 {
                return Err("--merge requires <OUTPUT> and at least one input file".into());
            }
            Ok(Command::Merge {
                output: PathBuf::from(&args[1]),
                inputs: args[2..].iter().map(PathBuf::from).collect(),
            })
        }
        "--help" | "-h" => Ok(Command::Help),
        arg => Err(format!("Unknown argument: {}", arg)),
    }
}

#[derive(Debug, Default)]
struct Options {
    output: Option<PathBuf>,
    interval: Option<u64>,
    count: Option<u64>,
}

/// Separate positional arguments from `--output`, `--interval` and `--count`.
fn split_options(args: &[String]) -> Result<(Vec<String>, Options), String> {
    let mut positional = Vec::new();
    let mut options = Options::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--output" | "-o" => {
                let value = iter.next().ok_or("--output requires a directory")?;
                options.output = Some(PathBuf::from(value));
            }
            "--interval" | "-i" => {
                let value = iter.next().ok_or("--interval requires a number of seconds")?;
                options.interval = Some(parse_number(value, "--interval")?);
            }
            "--count" | "-n" => {
                let value = iter.next().ok_or("--count requires a number")?;
                options.count = Some(parse_number(value, "--count")?);
            }
            _ => positional.push(arg.clone()),
        }
    }
    Ok((positional, options))
}

fn parse_number(value: &str, flag: &str) -> Result<u64, String> {
    value
        .parse()
        .map_err(|_| format!("{} expects a non-negative integer, got '{}'", flag, value))
}

/// Print help message to stdout
fn print_help() {
    println!("transcript-recorder - Capture live captions from desktop applications");
    println!();
    println!("USAGE:");
    println!("    transcript-recorder [COMMAND]");
    println!();
    println!("COMMANDS:");
    println!("    -c, --check-permissions                  Check if accessibility permissions are granted");
    println!("    -r, --record <CONFIG> <APP> [OPTIONS]    Poll APP and write transcript snapshots (macOS)");
    println!("        --replay <CONFIG> <APP> <TREE_JSON>  Export once from a saved accessibility tree dump");
    println!("    -m, --merge <OUTPUT> <FILE>...           Merge snapshot files into one transcript");
    println!("    -h, --help                               Print this help message");
    println!();
    println!("OPTIONS:");
    println!("    -o, --output <DIR>      Override base_transcript_directory");
    println!("    -i, --interval <SECS>   Override monitor_interval_seconds");
    println!("    -n, --count <N>         Stop after N polls and merge (default: poll until interrupted)");
    println!();
    println!("OUTPUT:");
    println!("    All output is JSON formatted to stdout.");
    println!("    Errors are written to stderr.");
}

fn print_json(value: &serde_json::Value) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("[TRANSCRIPT] ❌ Error serializing output: {}", e);
            1
        }
    }
}

fn outcome_json(outcome: &ExportOutcome) -> serde_json::Value {
    match outcome {
        ExportOutcome::Exported(record) => json!({"exported": true, "snapshot": record}),
        ExportOutcome::NotFound(reason) => json!({"exported": false, "reason": reason.to_string()}),
    }
}

fn merge_json(outcome: &MergeOutcome) -> serde_json::Value {
    match outcome {
        MergeOutcome::Merged {
            path,
            snapshot_count,
            overlap_count,
        } => json!({
            "merged": true,
            "path": path,
            "snapshot_count": snapshot_count,
            "overlap_count": overlap_count,
        }),
        MergeOutcome::Single(path) => json!({"merged": false, "path": path, "snapshot_count": 1}),
        MergeOutcome::NoSnapshots => json!({"merged": false, "snapshot_count": 0}),
    }
}

fn load_config(path: &Path, app: &str, output: Option<&Path>) -> Result<AppConfig, i32> {
    load_app_config(path, Some(app), output).map_err(|e| {
        eprintln!("[TRANSCRIPT] ❌ {}", e);
        1
    })
}

/// Handle the --check-permissions command
#[cfg(target_os = "macos")]
fn handle_check_permissions() -> i32 {
    use transcript_recorder::platform::macos::permissions;

    let enabled = permissions::is_trusted();
    let output = json!({
        "enabled": enabled,
        "message": if enabled {
            "Accessibility permissions are granted"
        } else {
            "Accessibility permissions are NOT granted"
        },
        "instructions": if enabled { "" } else { permissions::get_permission_instructions() },
    });
    print_json(&output);
    if enabled { 0 } else { 1 }
}

#[cfg(not(target_os = "macos"))]
fn handle_check_permissions() -> i32 {
    print_json(&json!({
        "enabled": false,
        "message": "No native accessibility host on this platform",
    }));
    1
}

/// Poll `recorder`, writing the index after each snapshot and merging at the end.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn run_recording<H: AxHost, P: ProcessLister>(mut recorder: TranscriptRecorder<H, P>, args: &RecordArgs) -> i32 {
    let interval = Duration::from_secs(
        args.interval
            .unwrap_or(recorder.config().monitor_interval_seconds)
            .max(1),
    );
    eprintln!(
        "[TRANSCRIPT] 🚀 Recording '{}' every {}s into {}",
        recorder.config().name,
        interval.as_secs(),
        recorder.transcript_base_dir().display()
    );

    let mut poll = 0u64;
    loop {
        poll += 1;
        match recorder.export_transcript_text(None) {
            Ok(outcome) => {
                print_json(&outcome_json(&outcome));
                if outcome.is_exported() {
                    if let Err(e) = recorder.export_snapshots_index(None) {
                        eprintln!("[TRANSCRIPT] ❌ {}", e);
                    }
                }
            }
            Err(e) => eprintln!("[TRANSCRIPT] ❌ Export failed: {}", e),
        }

        if args.count > 0 && poll >= args.count {
            break;
        }
        std::thread::sleep(interval);
    }

    match recorder.merge_snapshots(None, DEFAULT_MIN_MATCH_LENGTH) {
        Ok(outcome) => print_json(&merge_json(&outcome)),
        Err(e) => {
            eprintln!("[TRANSCRIPT] ❌ Merge failed: {}", e);
            1
        }
    }
}

/// Handle the --record command
#[cfg(target_os = "macos")]
fn handle_record(args: &RecordArgs) -> i32 {
    let config = match load_config(&args.config, &args.app, args.output.as_deref()) {
        Ok(config) => config,
        Err(code) => return code,
    };
    match TranscriptRecorder::for_macos(config) {
        Ok(recorder) => run_recording(recorder, args),
        Err(e) => {
            eprintln!("[TRANSCRIPT] ❌ {}", e);
            1
        }
    }
}

#[cfg(not(target_os = "macos"))]
fn handle_record(_args: &RecordArgs) -> i32 {
    eprintln!("[TRANSCRIPT] ❌ Live recording needs a native accessibility host (macOS); use --replay");
    1
}

/// Handle the --replay command
fn handle_replay(config: &Path, app: &str, tree: &Path, output: Option<&Path>) -> i32 {
    let config = match load_config(config, app, output) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let root = match std::fs::read_to_string(tree)
        .map_err(|e| e.to_string())
        .and_then(|json| MemoryNode::from_json_str(&json).map_err(|e| e.to_string()))
    {
        Ok(root) => root,
        Err(e) => {
            eprintln!("[TRANSCRIPT] ❌ Cannot load tree dump {}: {}", tree.display(), e);
            return 1;
        }
    };

    let host = MemoryHost::new().with_application(REPLAY_PID, root);
    let pids = |_: &[String], _: &[String]| vec![REPLAY_PID];
    let mut recorder = match TranscriptRecorder::new(config, host, pids) {
        Ok(recorder) => recorder,
        Err(e) => {
            eprintln!("[TRANSCRIPT] ❌ {}", e);
            return 1;
        }
    };

    match recorder.export_transcript_text(None) {
        Ok(outcome) => {
            let code = print_json(&outcome_json(&outcome));
            if outcome.is_exported() { code } else { 1 }
        }
        Err(e) => {
            eprintln!("[TRANSCRIPT] ❌ Export failed: {}", e);
            1
        }
    }
}

/// Handle the --merge command
fn handle_merge(output: &Path, inputs: &[PathBuf]) -> i32 {
    match merge_transcript_files(inputs, output, DEFAULT_MIN_MATCH_LENGTH) {
        Ok(Some(result)) => print_json(&json!({
            "path": output,
            "file_count": inputs.len(),
            "line_count": result.lines.len(),
            "overlap_count": result.overlap_count,
        })),
        Ok(None) => {
            eprintln!("[TRANSCRIPT] ❌ Nothing to merge");
            1
        }
        Err(e) => {
            eprintln!("[TRANSCRIPT] ❌ Merge failed: {}", e);
            1
        }
    }
}

fn main() {
    env_logger::init();

    log::debug!("transcript-recorder starting");

    let args: Vec<String> = env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information.");
            process::exit(1);
        }
    };

    log::debug!("Executing command: {:?}", command);

    let exit_code = match command {
        Command::CheckPermissions => handle_check_permissions(),
        Command::Record(args) => handle_record(&args),
        Command::Replay {
            config,
            app,
            tree,
            output,
        } => handle_replay(&config, &app, &tree, output.as_deref()),
        Command::Merge { output, inputs } => handle_merge(&output, &inputs),
        Command::Help => {
            print_help();
            0
        }
    };

    log::debug!("Exiting with code: {}", exit_code);

    process::exit(exit_code);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_arguments_shows_help() {
        assert_eq!(parse_args(&[]), Ok(Command::Help));
        assert_eq!(parse_args(&args(&["-h"])), Ok(Command::Help));
    }

    #[test]
    fn test_parse_record_with_options() {
        let cmd = parse_args(&args(&["--record", "apps.json", "zoom", "--interval", "10", "-n", "3"])).unwrap();
        assert_eq!(
            cmd,
            Command::Record(RecordArgs {
                config: PathBuf::from("apps.json"),
                app: "zoom".into(),
                output: None,
                interval: Some(10),
                count: 3,
            })
        );
    }

    #[test]
    fn test_parse_record_requires_config_and_app() {
        assert!(parse_args(&args(&["--record", "apps.json"])).is_err());
        assert!(parse_args(&args(&["--record", "apps.json", "zoom", "--count", "many"])).is_err());
        assert!(parse_args(&args(&["--record", "apps.json", "zoom", "--output"])).is_err());
    }

    #[test]
    fn test_parse_replay() {
        let cmd = parse_args(&args(&["--replay", "apps.json", "teams", "tree.json", "-o", "/tmp/out"])).unwrap();
        assert_eq!(
            cmd,
            Command::Replay {
                config: PathBuf::from("apps.json"),
                app: "teams".into(),
                tree: PathBuf::from("tree.json"),
                output: Some(PathBuf::from("/tmp/out")),
            }
        );
    }

    #[test]
    fn test_parse_merge() {
        let cmd = parse_args(&args(&["--merge", "out.txt", "a.txt", "b.txt"])).unwrap();
        assert_eq!(
            cmd,
            Command::Merge {
                output: PathBuf::from("out.txt"),
                inputs: vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")],
            }
        );
        assert!(parse_args(&args(&["--merge", "out.txt"])).is_err());
    }

    #[test]
    fn test_unknown_argument() {
        let err = parse_args(&args(&["--extract"])).unwrap_err();
        assert!(err.contains("--extract"));
    }

    #[test]
    fn test_outcome_json_shapes() {
        let missing = outcome_json(&ExportOutcome::NotFound(transcript_recorder::NotFound::NoProcesses));
        assert_eq!(missing["exported"], false);
        assert!(missing["reason"].as_str().unwrap().contains("process"));

        let none = merge_json(&MergeOutcome::NoSnapshots);
        assert_eq!(none["snapshot_count"], 0);
    }
}
