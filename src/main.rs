//! foldex CLI - folder index and nested file creation for project trees
//!
//! Usage: foldex <command> [arguments]

mod create_cmd;
mod index_cmd;
mod terminal;
mod watch_cmd;

use anyhow::{Context, Result};
use foldex::{Mode, OutputFormat, Settings, WatcherConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn print_usage() {
    eprintln!("foldex - ignore-aware folder index and nested file creation");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  foldex <command> [arguments]");
    eprintln!("  foldex --help");
    eprintln!("  foldex --version");
    eprintln!();
    eprintln!("  foldex index --root <DIR> [--config <FILE>] [--ignore <PATTERN>]... [--ignore-hidden] [--external]");
    eprintln!("  foldex create --root <DIR> [--dest <DIR>] [--mode <select|input>] [--open-after] [--open-all] [INPUT]");
    eprintln!("  foldex watch --root <DIR> [--debounce-ms <N>]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  index     Print every directory under the root that the ignore rules keep");
    eprintln!("  create    Create files and folders; prompts on the terminal without INPUT");
    eprintln!("  watch     Keep the index current and print every rebuild");
    eprintln!();
    eprintln!("Global arguments:");
    eprintln!("  --output <FORMAT>   Output format: human (default) or json");
    eprintln!("  --verbose           Log debug detail to stderr (RUST_LOG overrides)");
    eprintln!();
    eprintln!("Settings arguments (index, create, watch):");
    eprintln!("  --root <DIR>        Workspace root");
    eprintln!("  --config <FILE>     Settings JSON (default: <root>/.foldex.json if present)");
    eprintln!("  --ignore <PATTERN>  Extra ignore rule; `*` spans folders, leading `!` negates");
    eprintln!("  --ignore-hidden     Skip every entry whose name starts with `.`");
    eprintln!();
    eprintln!("Index arguments:");
    eprintln!("  --external          Enumerate with the system `find` instead of walking in-process");
    eprintln!();
    eprintln!("Create arguments:");
    eprintln!("  --dest <DIR>        Destination folder relative to the root (default: /)");
    eprintln!("  --mode <MODE>       Interactive flow: select (pick a folder) or input (type a path)");
    eprintln!("  --open-after        Open the first created file");
    eprintln!("  --no-open           Open nothing");
    eprintln!("  --open-all          Open every created file when more than one was created");
    eprintln!("  INPUT               Comma-separated targets, e.g. \"a.txt, lib/b.rs, docs/\"");
    eprintln!();
    eprintln!("Watch arguments:");
    eprintln!("  --debounce-ms <N>   Debounce delay in milliseconds (default: 500)");
}

/// Settings file plus command-line overrides.
#[derive(Debug, Default)]
struct SettingsArgs {
    config: Option<PathBuf>,
    ignore: Vec<String>,
    ignore_hidden: bool,
    mode: Option<Mode>,
    open_after: Option<bool>,
    open_all: bool,
    verbose: bool,
}

impl SettingsArgs {
    fn resolve(&self, root: &Path) -> Result<Settings> {
        let mut settings = Settings::discover(root, self.config.as_deref())?;

        if !self.ignore.is_empty() {
            let mut patterns = settings.ignore_patterns.clone();
            for pattern in &self.ignore {
                if !patterns.is_empty() && !patterns.ends_with('\n') {
                    patterns.push('\n');
                }
                patterns.push_str(pattern);
            }
            settings.ignore_patterns = patterns;
        }
        if self.ignore_hidden {
            settings.ignore_hidden_entries = true;
        }
        if let Some(mode) = self.mode {
            settings.mode = mode;
        }
        if let Some(open_after) = self.open_after {
            settings.open_after_create = open_after;
        }
        if self.open_all {
            settings.open_all_created = true;
        }
        if self.verbose {
            settings.verbose_logging = true;
        }

        Ok(settings)
    }
}

enum Command {
    Index {
        root: PathBuf,
        settings: SettingsArgs,
        external: bool,
    },
    Create {
        root: PathBuf,
        settings: SettingsArgs,
        dest: String,
        input: Option<String>,
    },
    Watch {
        root: PathBuf,
        settings: SettingsArgs,
        config: WatcherConfig,
    },
    Version,
}

fn take_value(args: &[String], i: &mut usize, flag: &str) -> Result<String> {
    if *i + 1 >= args.len() {
        return Err(anyhow::anyhow!("{} requires an argument", flag));
    }
    *i += 1;
    Ok(args[*i].clone())
}

/// Shared flags; returns `false` if `args[*i]` is not one of them.
fn parse_settings_flag(args: &[String], i: &mut usize, settings: &mut SettingsArgs) -> Result<bool> {
    match args[*i].as_str() {
        "--config" => settings.config = Some(PathBuf::from(take_value(args, i, "--config")?)),
        "--ignore" => settings.ignore.push(take_value(args, i, "--ignore")?),
        "--ignore-hidden" => settings.ignore_hidden = true,
        "--verbose" | "-v" => settings.verbose = true,
        // Consumed globally
        "--output" => {
            take_value(args, i, "--output")?;
        }
        _ => return Ok(false),
    }
    Ok(true)
}

fn parse_args(args: &[String]) -> Result<Command> {
    if args.len() < 2 {
        return Err(anyhow::anyhow!("Missing command"));
    }

    let command = &args[1];

    if command == "--help" || command == "-h" {
        print_usage();
        std::process::exit(0);
    }

    let mut root: Option<PathBuf> = None;
    let mut settings = SettingsArgs::default();

    match command.as_str() {
        "--version" | "-V" | "version" => Ok(Command::Version),
        "index" => {
            let mut external = false;
            let mut i = 2;
            while i < args.len() {
                if !parse_settings_flag(args, &mut i, &mut settings)? {
                    match args[i].as_str() {
                        "--root" => root = Some(PathBuf::from(take_value(args, &mut i, "--root")?)),
                        "--external" => external = true,
                        other => return Err(anyhow::anyhow!("Unknown argument: {}", other)),
                    }
                }
                i += 1;
            }

            Ok(Command::Index {
                root: root.ok_or_else(|| anyhow::anyhow!("--root is required"))?,
                settings,
                external,
            })
        }
        "create" => {
            let mut dest = "/".to_string();
            let mut inputs: Vec<String> = Vec::new();
            let mut i = 2;
            while i < args.len() {
                if !parse_settings_flag(args, &mut i, &mut settings)? {
                    match args[i].as_str() {
                        "--root" => root = Some(PathBuf::from(take_value(args, &mut i, "--root")?)),
                        "--dest" => dest = take_value(args, &mut i, "--dest")?,
                        "--mode" => {
                            let value = take_value(args, &mut i, "--mode")?;
                            settings.mode = Some(match value.as_str() {
                                "select" => Mode::Select,
                                "input" => Mode::Input,
                                other => return Err(anyhow::anyhow!("Unknown mode: {}", other)),
                            });
                        }
                        "--open-after" => settings.open_after = Some(true),
                        "--no-open" => settings.open_after = Some(false),
                        "--open-all" => settings.open_all = true,
                        other if other.starts_with("--") => {
                            return Err(anyhow::anyhow!("Unknown argument: {}", other))
                        }
                        other => inputs.push(other.to_string()),
                    }
                }
                i += 1;
            }

            let input = if inputs.is_empty() {
                None
            } else {
                Some(inputs.join(","))
            };

            Ok(Command::Create {
                root: root.ok_or_else(|| anyhow::anyhow!("--root is required"))?,
                settings,
                dest,
                input,
            })
        }
        "watch" => {
            let mut config = WatcherConfig::default();
            let mut i = 2;
            while i < args.len() {
                if !parse_settings_flag(args, &mut i, &mut settings)? {
                    match args[i].as_str() {
                        "--root" => root = Some(PathBuf::from(take_value(args, &mut i, "--root")?)),
                        "--debounce-ms" => {
                            let value = take_value(args, &mut i, "--debounce-ms")?;
                            config.debounce_ms = value
                                .parse()
                                .with_context(|| format!("Invalid --debounce-ms: {}", value))?;
                        }
                        other => return Err(anyhow::anyhow!("Unknown argument: {}", other)),
                    }
                }
                i += 1;
            }

            Ok(Command::Watch {
                root: root.ok_or_else(|| anyhow::anyhow!("--root is required"))?,
                settings,
                config,
            })
        }
        other => Err(anyhow::anyhow!("Unknown command: {}", other)),
    }
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins; otherwise `info`, or `debug` for this crate when verbose.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose { "info,foldex=debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}

fn run(command: Command, output_format: OutputFormat) -> Result<u8> {
    match command {
        Command::Version => {
            println!("{}", foldex::version::version());
            Ok(0)
        }
        Command::Index {
            root,
            settings,
            external,
        } => {
            let settings = settings.resolve(&root)?;
            init_logging(settings.verbose_logging);
            runtime()?.block_on(index_cmd::run_index(root, settings, external, output_format))?;
            Ok(0)
        }
        Command::Create {
            root,
            settings,
            dest,
            input,
        } => {
            let settings = settings.resolve(&root)?;
            init_logging(settings.verbose_logging);
            runtime()?.block_on(create_cmd::run_create(root, settings, dest, input, output_format))
        }
        Command::Watch {
            root,
            settings,
            config,
        } => {
            let settings = settings.resolve(&root)?;
            init_logging(settings.verbose_logging);
            runtime()?.block_on(watch_cmd::run_watch(root, settings, config))?;
            Ok(0)
        }
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let output_format = args
        .iter()
        .position(|x| x == "--output")
        .and_then(|i| args.get(i + 1))
        .and_then(|fmt| OutputFormat::parse(fmt))
        .unwrap_or(OutputFormat::Human);

    match parse_args(&args) {
        Ok(command) => match run(command, output_format) {
            Ok(code) => ExitCode::from(code),
            Err(e) => {
                eprintln!("Error: {:#}", e);
                ExitCode::from(1)
            }
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_create_joins_inputs() {
        let parsed = parse_args(&args(&["foldex", "create", "--root", "/p", "a.txt,", "b/c.txt"])).unwrap();
        match parsed {
            Command::Create { input, dest, .. } => {
                assert_eq!(input.as_deref(), Some("a.txt,,b/c.txt"));
                assert_eq!(dest, "/");
            }
            _ => panic!("expected create"),
        }
    }

    #[test]
    fn test_parse_requires_root() {
        assert!(parse_args(&args(&["foldex", "index"])).is_err());
    }

    #[test]
    fn test_parse_settings_flags() {
        let parsed = parse_args(&args(&[
            "foldex", "index", "--root", "/p", "--ignore", "build", "--ignore-hidden", "--output", "json",
        ]))
        .unwrap();
        match parsed {
            Command::Index { settings, .. } => {
                assert_eq!(settings.ignore, vec!["build".to_string()]);
                assert!(settings.ignore_hidden);
            }
            _ => panic!("expected index"),
        }
    }

    #[test]
    fn test_overrides_append_patterns() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(foldex::config::CONFIG_FILE_NAME),
            r#"{"ignorePatterns": "node_modules"}"#,
        )
        .unwrap();

        let overrides = SettingsArgs {
            ignore: vec!["dist".to_string()],
            ..SettingsArgs::default()
        };
        let settings = overrides.resolve(temp_dir.path()).unwrap();
        assert_eq!(settings.ignore_patterns, "node_modules\ndist");
    }
}
