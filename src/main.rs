use chrono::{DateTime, Utc};
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Parser, Subcommand};
use dialoguer::console::style;
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const CONFIG_DIR_ENV: &str = "TERMUX_DEV_CONFIG_DIR";
const LOG_FILTER_ENV: &str = "TERMUX_DEV_LOG";
const SETTINGS_FILE_NAME: &str = "config.json";
const LAUNCH_SCRIPT_NAME: &str = "start-browser.sh";

const PACKAGE_MANAGER: &str = "pkg";
const BROWSER_PACKAGE: &str = "chromium";
const DOCTOR_TOOLS: [&str; 5] = ["pkg", "termux-info", "termux-x11", "pulseaudio", "chromium"];
const STATUS_SERVICES: [&str; 3] = ["termux-x11", "pulseaudio", "chromium"];

const COMMAND_HELP: [(&str, &str); 6] = [
    ("help", "Show this message"),
    ("doctor", "Inspect Termux requirements and installed tooling"),
    (
        "setup",
        "Install base developer dependencies (git, node, python, etc.)",
    ),
    (
        "browser:install",
        "Provision X11, PulseAudio, and the Chromium browser",
    ),
    (
        "browser:start",
        "Launch Chromium with developer flags via Termux X11",
    ),
    (
        "browser:status",
        "Check the running status of X11/PulseAudio/Chromium",
    ),
];

const HELP_EXAMPLES: [&str; 3] = [
    "termux-dev setup",
    "termux-dev browser:install",
    "termux-dev browser:start --incognito https://developer.chrome.com",
];

/// One package-manager invocation, optionally preceded by a progress banner.
struct PackageStep {
    banner: Option<&'static str>,
    args: &'static [&'static str],
}

const SETUP_STEPS: &[PackageStep] = &[
    PackageStep {
        banner: Some("Updating Termux package list..."),
        args: &["update", "-y"],
    },
    PackageStep {
        banner: None,
        args: &["upgrade", "-y"],
    },
    PackageStep {
        banner: Some("Installing developer essentials..."),
        args: &[
            "install",
            "-y",
            "git",
            "nodejs-lts",
            "python",
            "openssl-tool",
            "proot-distro",
            "wget",
            "tsu",
        ],
    },
];

const BROWSER_INSTALL_STEPS: &[PackageStep] = &[
    PackageStep {
        banner: Some("Enabling X11 and Tur repos..."),
        args: &["install", "-y", "x11-repo"],
    },
    PackageStep {
        banner: None,
        args: &["install", "-y", "tur-repo"],
    },
    PackageStep {
        banner: Some("Installing Termux X11 server and dependencies..."),
        args: &["install", "-y", "termux-x11-nightly", "pulseaudio", "mesa"],
    },
    PackageStep {
        banner: Some("Installing Chromium for Termux..."),
        args: &["install", "-y", BROWSER_PACKAGE],
    },
];

const LAUNCH_SCRIPT: &str = r#"#!/data/data/com.termux/files/usr/bin/bash
set -euo pipefail

if ! command -v termux-x11 >/dev/null 2>&1; then
  echo "termux-x11 is required but missing. Run: termux-dev browser:install"
  exit 1
fi

if ! command -v pulseaudio >/dev/null 2>&1; then
  echo "pulseaudio is required but missing. Run: termux-dev browser:install"
  exit 1
fi

export DISPLAY=:0
export PULSE_SERVER=127.0.0.1

if ! pgrep -f termux-x11 >/dev/null 2>&1; then
  echo "Launching Termux X11 server..."
  termux-x11 :0 >/dev/null 2>&1 &
  sleep 2
fi

if ! pgrep -f pulseaudio >/dev/null 2>&1; then
  echo "Starting PulseAudio for sound..."
  pulseaudio --start --exit-idle-time=-1
fi

echo "Starting Chromium with developer flags..."
chromium \
  --no-sandbox \
  --enable-features=UseOzonePlatform \
  --ozone-platform=wayland \
  --remote-debugging-port=9222 \
  --password-store=basic \
  "$@"
"#;

#[derive(Parser, Debug)]
#[command(
    name = "termux-dev",
    version,
    about = "Termux Dev CLI",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(long)]
    config_dir: Option<PathBuf>,
    #[arg(long)]
    json: bool,
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    Help,
    Doctor,
    Setup,
    #[command(name = "browser:install")]
    BrowserInstall,
    #[command(name = "browser:start")]
    BrowserStart,
    #[command(name = "browser:status")]
    BrowserStatus,
}

#[derive(Debug, Error)]
enum TermuxDevError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("settings file {} is malformed: {source}", .path.display())]
    Settings {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to run {command}: {reason}")]
    Spawn {
        program: String,
        command: String,
        reason: io::Error,
    },
    #[error("command \"{command}\" exited with code {code}")]
    CommandFailed { command: String, code: i32 },
    #[error("Unknown command \"{name}\". Available commands: {}", command_names().join(", "))]
    UnknownCommand { name: String },
}

impl TermuxDevError {
    fn exit_code(&self) -> i32 {
        match self {
            TermuxDevError::CommandFailed { code, .. } => *code,
            _ => 1,
        }
    }

    fn details(&self) -> Option<ProcessErrorDetails> {
        match self {
            TermuxDevError::Spawn {
                program,
                command,
                reason,
            } => Some(ProcessErrorDetails {
                error_code: "command_not_started".to_string(),
                hint: (reason.kind() == io::ErrorKind::NotFound).then(|| {
                    format!("Install `{program}` (for example with `pkg install`) and ensure it is on your PATH.")
                }),
                command: Some(command.clone()),
                exit_code: None,
            }),
            TermuxDevError::CommandFailed { command, code } => Some(ProcessErrorDetails {
                error_code: "command_failed".to_string(),
                hint: None,
                command: Some(command.clone()),
                exit_code: Some(*code),
            }),
            TermuxDevError::Settings { path, .. } => Some(ProcessErrorDetails {
                error_code: "settings_malformed".to_string(),
                hint: Some(format!("Fix or delete {} and rerun.", path.display())),
                command: None,
                exit_code: None,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonResult<T: Serialize> {
    ok: bool,
    result: Option<T>,
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_details: Option<ProcessErrorDetails>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
struct ProcessErrorDetails {
    error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exit_code: Option<i32>,
}

#[derive(Debug, Clone)]
struct Context {
    config_dir: PathBuf,
    json: bool,
}

impl Context {
    fn settings_path(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE_NAME)
    }

    fn launch_script_path(&self) -> PathBuf {
        self.config_dir.join(LAUNCH_SCRIPT_NAME)
    }
}

/// Provisioning history persisted between invocations.
///
/// Keys this version does not know about are carried through `extra` so a
/// read-modify-write never drops them.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct Settings {
    created_at: DateTime<Utc>,
    #[serde(default)]
    last_setup_at: Option<DateTime<Utc>>,
    #[serde(default)]
    x11_repo_enabled: bool,
    #[serde(default)]
    browser_package: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

impl Settings {
    fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            last_setup_at: None,
            x11_repo_enabled: false,
            browser_package: None,
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Creates the backing file with default values when it is missing.
    /// Returns whether a file was created.
    fn ensure(&self) -> Result<bool, TermuxDevError> {
        if self.path.exists() {
            return Ok(false);
        }
        let settings = Settings::new(Utc::now());
        write_atomic_text_file(&self.path, &settings_body(&settings)?, Some(0o600))?;
        info!(path = %self.path.display(), "created settings file");
        Ok(true)
    }

    fn read(&self) -> Result<Settings, TermuxDevError> {
        self.ensure()?;
        let content = fs::read_to_string(&self.path)?;
        serde_json::from_str(&content).map_err(|source| TermuxDevError::Settings {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, settings: &Settings) -> Result<(), TermuxDevError> {
        write_atomic_text_file_preserving_mode(&self.path, &settings_body(settings)?, 0o600)?;
        debug!(path = %self.path.display(), "wrote settings file");
        Ok(())
    }

    fn update<F>(&self, apply: F) -> Result<Settings, TermuxDevError>
    where
        F: FnOnce(Settings) -> Settings,
    {
        let current = self.read()?;
        let next = apply(current);
        self.write(&next)?;
        Ok(next)
    }
}

fn settings_body(settings: &Settings) -> Result<String, TermuxDevError> {
    let mut body = serde_json::to_string_pretty(settings)?;
    body.push('\n');
    Ok(body)
}

#[derive(Debug, Clone)]
struct CommandOutput {
    status_code: i32,
    stdout: Vec<u8>,
}

impl CommandOutput {
    fn success(&self) -> bool {
        self.status_code == 0
    }
}

trait CommandRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        capture_output: bool,
    ) -> Result<CommandOutput, io::Error>;
}

struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        capture_output: bool,
    ) -> Result<CommandOutput, io::Error> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        if capture_output {
            let output = cmd.output()?;
            let status_code =
                output
                    .status
                    .code()
                    .unwrap_or(if output.status.success() { 0 } else { 1 });
            Ok(CommandOutput {
                status_code,
                stdout: output.stdout,
            })
        } else {
            let status = cmd.status()?;
            let status_code = status
                .code()
                .unwrap_or(if status.success() { 0 } else { 1 });
            Ok(CommandOutput {
                status_code,
                stdout: Vec::new(),
            })
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
struct ProcessMatch {
    pid: u32,
    command_line: String,
}

#[derive(Debug, Clone, Serialize)]
struct ServiceStatus {
    name: String,
    running: bool,
    processes: Vec<ProcessMatch>,
}

#[derive(Debug, Clone, Serialize)]
struct ToolCheck {
    name: String,
    available: bool,
    path: Option<PathBuf>,
}

fn main() -> Result<(), TermuxDevError> {
    let (cli_args, command_args) = split_command_args(env::args().collect());
    let cli = match Cli::try_parse_from(cli_args) {
        Ok(cli) => cli,
        Err(err) => exit_on_parse_error(err),
    };
    init_logging(cli.verbose);
    let ctx = build_context(&cli);
    let runner = SystemCommandRunner;
    let command = cli.command.unwrap_or(Commands::Help);

    if let Err(err) = dispatch(&ctx, command, &command_args, &runner) {
        if ctx.json {
            let payload = JsonResult::<serde_json::Value> {
                ok: false,
                result: None,
                error: Some(err.to_string()),
                error_details: err.details(),
            };
            print_json(&payload)?;
        } else {
            eprintln!("{} {err}", style("✖").red().for_stderr());
        }
        std::process::exit(err.exit_code());
    }

    Ok(())
}

/// Splits argv right after the command name. Clap only sees the global flags
/// and the command; everything after it is returned untouched, so
/// `browser:start` can forward `--help`, `-v` or `--` to the browser and the
/// other commands ignore extra arguments.
fn split_command_args(mut raw: Vec<String>) -> (Vec<String>, Vec<String>) {
    let mut index = 1;
    while index < raw.len() {
        if raw[index] == "--config-dir" {
            index += 2;
        } else if raw[index].starts_with('-') {
            index += 1;
        } else {
            let rest = raw.split_off(index + 1);
            return (raw, rest);
        }
    }
    (raw, Vec::new())
}

fn exit_on_parse_error(err: clap::Error) -> ! {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
        ErrorKind::InvalidSubcommand => {
            let name = match err.get(ContextKind::InvalidSubcommand) {
                Some(ContextValue::String(name)) => name.clone(),
                _ => String::new(),
            };
            eprintln!("{}", TermuxDevError::UnknownCommand { name });
            std::process::exit(1)
        }
        ErrorKind::UnknownArgument => {
            let _ = err.print();
            eprintln!("Available commands: {}", command_names().join(", "));
            std::process::exit(1)
        }
        _ => {
            let _ = err.print();
            std::process::exit(1)
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn build_context(cli: &Cli) -> Context {
    Context {
        config_dir: resolve_config_dir(cli.config_dir.as_ref()),
        json: cli.json,
    }
}

fn resolve_config_dir(override_path: Option<&PathBuf>) -> PathBuf {
    if let Some(path) = override_path {
        return path.clone();
    }
    if let Ok(path) = env::var(CONFIG_DIR_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    let mut base = home_dir().unwrap_or_else(|| PathBuf::from("."));
    base.push(".termux-dev");
    base
}

fn command_names() -> Vec<&'static str> {
    COMMAND_HELP.iter().map(|(name, _)| *name).collect()
}

fn dispatch<R: CommandRunner>(
    ctx: &Context,
    command: Commands,
    command_args: &[String],
    runner: &R,
) -> Result<(), TermuxDevError> {
    if !command_args.is_empty() && command != Commands::BrowserStart {
        debug!(args = ?command_args, "ignoring extra arguments");
    }
    let store = SettingsStore::new(ctx.settings_path());
    store.ensure()?;

    match command {
        Commands::Help => handle_help(ctx),
        Commands::Doctor => handle_doctor(ctx),
        Commands::Setup => handle_setup(ctx, &store, runner),
        Commands::BrowserInstall => handle_browser_install(ctx, &store, runner),
        Commands::BrowserStart => handle_browser_start(ctx, &store, runner, command_args),
        Commands::BrowserStatus => handle_browser_status(ctx, runner),
    }
}

fn running_in_termux() -> bool {
    env::var("PREFIX")
        .map(|prefix| prefix.contains("com.termux"))
        .unwrap_or(false)
}

fn warn_if_not_termux() {
    if !running_in_termux() {
        eprintln!(
            "{} This workflow is tuned for Termux. Some commands may not behave elsewhere.",
            style("⚠").yellow().for_stderr()
        );
    }
}

fn progress(ctx: &Context, message: &str) {
    if ctx.json {
        eprintln!("{} {message}", style("▶").cyan().for_stderr());
    } else {
        println!("{} {message}", style("▶").cyan());
    }
}

fn render_command(program: &str, args: &[String]) -> String {
    fn shell_quote(part: &str) -> String {
        if part.is_empty() {
            return "\"\"".to_string();
        }
        if part.chars().any(|c| c.is_whitespace()) {
            return format!("\"{}\"", part.replace('"', "\\\""));
        }
        part.to_string()
    }
    let mut parts = Vec::with_capacity(args.len() + 1);
    parts.push(program.to_string());
    parts.extend(args.iter().map(|arg| shell_quote(arg)));
    parts.join(" ")
}

/// Runs a child with inherited stdio. Anything other than exit code zero
/// becomes an error carrying the rendered command line.
fn run_checked<R: CommandRunner>(
    runner: &R,
    program: &str,
    args: &[String],
) -> Result<(), TermuxDevError> {
    let command = render_command(program, args);
    debug!(%command, "running command");
    let output = runner
        .run(program, args, false)
        .map_err(|reason| TermuxDevError::Spawn {
            program: program.to_string(),
            command: command.clone(),
            reason,
        })?;
    if !output.success() {
        debug!(%command, code = output.status_code, "command failed");
        return Err(TermuxDevError::CommandFailed {
            command,
            code: output.status_code,
        });
    }
    Ok(())
}

fn run_package_steps<R: CommandRunner>(
    ctx: &Context,
    runner: &R,
    steps: &[PackageStep],
) -> Result<(), TermuxDevError> {
    for step in steps {
        if let Some(banner) = step.banner {
            progress(ctx, banner);
        }
        let args: Vec<String> = step.args.iter().map(|arg| arg.to_string()).collect();
        run_checked(runner, PACKAGE_MANAGER, &args)?;
    }
    Ok(())
}

fn find_processes<R: CommandRunner>(runner: &R, pattern: &str) -> Vec<ProcessMatch> {
    let args = vec!["-fl".to_string(), pattern.to_string()];
    match runner.run("pgrep", &args, true) {
        Ok(output) if output.success() => {
            parse_pgrep_output(&String::from_utf8_lossy(&output.stdout))
        }
        Ok(output) => {
            debug!(pattern, code = output.status_code, "no matching processes");
            Vec::new()
        }
        Err(err) => {
            warn!(pattern, error = %err, "failed to query the process table");
            Vec::new()
        }
    }
}

fn parse_pgrep_output(text: &str) -> Vec<ProcessMatch> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            let (pid, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
            match pid.parse::<u32>() {
                Ok(pid) => Some(ProcessMatch {
                    pid,
                    command_line: rest.trim().to_string(),
                }),
                Err(_) => {
                    debug!(line, "skipping unparsable pgrep line");
                    None
                }
            }
        })
        .collect()
}

fn write_launch_script(path: &Path) -> Result<(), TermuxDevError> {
    write_atomic_text_file(path, LAUNCH_SCRIPT, Some(0o755))?;
    info!(path = %path.display(), "wrote launch script");
    Ok(())
}

fn handle_help(ctx: &Context) -> Result<(), TermuxDevError> {
    if ctx.json {
        let commands: Vec<serde_json::Value> = COMMAND_HELP
            .iter()
            .map(|(name, description)| json!({"name": name, "description": description}))
            .collect();
        return output(json!({
                "usage": "termux-dev <command> [options]",
                "commands": commands,
                "examples": HELP_EXAMPLES,
            }),
        );
    }

    println!("Termux Dev CLI");
    println!("==============");
    println!();
    println!("Usage:");
    println!("  termux-dev <command> [options]");
    println!();
    println!("Commands:");
    for (name, description) in COMMAND_HELP {
        println!("  {name:<19}{description}");
    }
    println!();
    println!("Examples:");
    for example in HELP_EXAMPLES {
        println!("  {example}");
    }
    Ok(())
}

fn handle_doctor(ctx: &Context) -> Result<(), TermuxDevError> {
    warn_if_not_termux();

    let checks: Vec<ToolCheck> = DOCTOR_TOOLS
        .iter()
        .map(|tool| {
            let path = which::which(tool).ok();
            ToolCheck {
                name: tool.to_string(),
                available: path.is_some(),
                path,
            }
        })
        .collect();

    if ctx.json {
        return output(json!({"checks": checks, "termux": running_in_termux()}),
        );
    }

    println!("Termux Dev Doctor");
    println!("-----------------");
    for check in &checks {
        match &check.path {
            Some(path) => println!(
                "{} {} detected at {}",
                style("✔").green(),
                check.name,
                path.display()
            ),
            None => println!("{} {} not found", style("✖").red(), check.name),
        }
    }
    println!();
    println!("Next steps:");
    println!("  • Run `termux-dev setup` to install core Termux tooling.");
    println!("  • Run `termux-dev browser:install` to provision Chromium + X11.");
    Ok(())
}

fn handle_setup<R: CommandRunner>(
    ctx: &Context,
    store: &SettingsStore,
    runner: &R,
) -> Result<(), TermuxDevError> {
    warn_if_not_termux();
    // Fail on a malformed settings file before touching any packages.
    let before = store.read()?;
    debug!(created_at = %before.created_at, "starting base toolchain setup");

    run_package_steps(ctx, runner, SETUP_STEPS)?;

    let settings = store.update(|mut settings| {
        settings.last_setup_at = Some(Utc::now());
        settings
    })?;

    if ctx.json {
        return output(json!({"action": "setup", "settings": settings}));
    }
    println!("{} Core developer toolchain is ready.", style("✔").green());
    println!("   Continue with `termux-dev browser:install` to enable the GUI browser.");
    Ok(())
}

fn handle_browser_install<R: CommandRunner>(
    ctx: &Context,
    store: &SettingsStore,
    runner: &R,
) -> Result<(), TermuxDevError> {
    warn_if_not_termux();
    store.read()?;

    run_package_steps(ctx, runner, BROWSER_INSTALL_STEPS)?;

    let script = ctx.launch_script_path();
    write_launch_script(&script)?;
    let settings = store.update(|mut settings| {
        settings.x11_repo_enabled = true;
        settings.browser_package = Some(BROWSER_PACKAGE.to_string());
        settings
    })?;

    if ctx.json {
        return output(json!({
                "action": "browser:install",
                "launch_script": script,
                "settings": settings,
            }),
        );
    }
    println!();
    println!("{} Browser stack installed.", style("✔").green());
    println!("   Launch it with: {}", script.display());
    println!("   or run `termux-dev browser:start` for the default launch flow.");
    Ok(())
}

fn handle_browser_start<R: CommandRunner>(
    ctx: &Context,
    store: &SettingsStore,
    runner: &R,
    extra_args: &[String],
) -> Result<(), TermuxDevError> {
    warn_if_not_termux();
    store.ensure()?;

    // Unlike browser:install, an existing script is left as-is here.
    let script = ctx.launch_script_path();
    let generated = if script.exists() {
        debug!(path = %script.display(), "reusing existing launch script");
        false
    } else {
        write_launch_script(&script)?;
        true
    };

    progress(ctx, "Bootstrapping desktop-class Chromium…");
    let mut args = vec![script.to_string_lossy().to_string()];
    args.extend(extra_args.iter().cloned());
    run_checked(runner, "bash", &args)?;

    if ctx.json {
        return output(json!({
                "action": "browser:start",
                "launch_script": script,
                "generated": generated,
                "args": extra_args,
            }),
        );
    }
    Ok(())
}

fn handle_browser_status<R: CommandRunner>(ctx: &Context, runner: &R) -> Result<(), TermuxDevError> {
    let services: Vec<ServiceStatus> = STATUS_SERVICES
        .iter()
        .map(|name| {
            let processes = find_processes(runner, name);
            ServiceStatus {
                name: name.to_string(),
                running: !processes.is_empty(),
                processes,
            }
        })
        .collect();

    if ctx.json {
        return output(json!({"services": services}));
    }

    println!("Termux Browser Status");
    println!("---------------------");
    for service in &services {
        if service.processes.is_empty() {
            println!("{} {} not running", style("✖").red(), service.name);
            continue;
        }
        for process in &service.processes {
            println!(
                "{} {} running - {} {}",
                style("✔").green(),
                service.name,
                process.pid,
                process.command_line
            );
        }
    }
    println!();
    println!("Use `termux-dev browser:start` to launch or relaunch the browser session.");
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<(), TermuxDevError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn write_atomic_text_file(
    path: &Path,
    content: &str,
    mode: Option<u32>,
) -> Result<(), TermuxDevError> {
    ensure_parent(path)?;
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let pid = std::process::id();
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let tmp_path = parent.join(format!(
        ".{}.tmp.{}.{}",
        path.file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "termux-dev".to_string()),
        pid,
        ts
    ));

    fs::write(&tmp_path, content)?;
    #[cfg(unix)]
    if let Some(mode) = mode {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp_path, fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn write_atomic_text_file_preserving_mode(
    path: &Path,
    content: &str,
    default_mode: u32,
) -> Result<(), TermuxDevError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(path)
            .map(|m| m.permissions().mode() & 0o7777)
            .unwrap_or(default_mode);
        return write_atomic_text_file(path, content, Some(mode));
    }
    #[cfg(not(unix))]
    {
        let _ = default_mode;
        write_atomic_text_file(path, content, None)
    }
}

fn output(payload: serde_json::Value) -> Result<(), TermuxDevError> {
    print_json(&JsonResult {
        ok: true,
        result: Some(payload),
        error: None,
        error_details: None,
    })
}

fn print_json<T: Serialize>(payload: &T) -> Result<(), TermuxDevError> {
    let text = serde_json::to_string_pretty(payload)?;
    println!("{}", text);
    Ok(())
}
