//! Doctor command - verify system requirements and configuration.

use crate::cli::preflight::version_arg;
use crate::cli::Output;
use crate::config::Settings;
use console::style;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Print a group of checks under a heading and collect them.
fn section(title: &str, group: Vec<CheckResult>, all: &mut Vec<CheckResult>) {
    println!("{}", style(title).bold());
    for check in &group {
        check.print();
    }
    println!();
    all.extend(group);
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Skriv Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    section(
        "External Tools",
        vec![
            check_tool("yt-dlp", install_hint_ytdlp()),
            check_tool("ffmpeg", install_hint_ffmpeg()),
            check_tool("ffprobe", install_hint_ffmpeg()),
        ],
        &mut checks,
    );

    section(
        "API Configuration",
        vec![check_openai_api_key(std::env::var("OPENAI_API_KEY").ok())],
        &mut checks,
    );

    section("Telegram", check_telegram(settings), &mut checks);

    section(
        "Directories",
        vec![check_temp_dir(settings), check_config_file()],
        &mut checks,
    );

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before running the bot.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Skriv is ready to use.");
    }

    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str, hint: &str) -> CheckResult {
    match Command::new(name).arg(version_arg(name)).output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();

            CheckResult::ok(name, &truncate(&version, 50))
        }
        Ok(_) => CheckResult::error(name, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error(name, "not found", hint)
        }
        Err(e) => CheckResult::error(name, &format!("error: {}", e), hint),
    }
}

/// Check if OpenAI API key is configured.
fn check_openai_api_key(key: Option<String>) -> CheckResult {
    match key {
        Some(key) if key.starts_with("sk-") && key.len() > 20 => {
            CheckResult::ok("OPENAI_API_KEY", &format!("configured ({})", mask(&key)))
        }
        Some(key) if key.is_empty() => CheckResult::error(
            "OPENAI_API_KEY",
            "empty",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
        Some(_) => CheckResult::warning(
            "OPENAI_API_KEY",
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        None => CheckResult::error(
            "OPENAI_API_KEY",
            "not set",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
    }
}

/// Check the bot token, the allow-list and the support chat.
fn check_telegram(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    match settings.bot_token() {
        Ok(token) => results.push(CheckResult::ok("Bot token", &format!("configured ({})", mask(token)))),
        Err(_) => results.push(CheckResult::error(
            "Bot token",
            "not set",
            "Set telegram.bot_token or export TELEGRAM_BOT_TOKEN",
        )),
    }

    let allowed = &settings.telegram.allowed_user_ids;
    if allowed.is_empty() {
        results.push(CheckResult::warning(
            "Allowed users",
            "none (every user will be refused)",
            "Set telegram.allowed_user_ids or export ALLOWED_USER_IDS=1,2,3",
        ));
    } else {
        results.push(CheckResult::ok("Allowed users", &format!("{} user(s)", allowed.len())));
    }

    match settings.telegram.support_chat_id {
        Some(id) => results.push(CheckResult::ok("Support chat", &id.to_string())),
        None => results.push(CheckResult::warning(
            "Support chat",
            "not set (cost reports are only logged)",
            "Set telegram.support_chat_id or export SUPPORT_CHAT_ID",
        )),
    }

    results
}

/// Check the scratch directory for job files.
fn check_temp_dir(settings: &Settings) -> CheckResult {
    let temp_dir = settings.temp_dir();
    if temp_dir.exists() {
        CheckResult::ok("Temp directory", &format!("{}", temp_dir.display()))
    } else {
        CheckResult::warning(
            "Temp directory",
            &format!("{} (will be created)", temp_dir.display()),
            "Directory will be created on first use",
        )
    }
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            &format!("Create {} to override them", config_path.display()),
        )
    }
}

/// Show the first and last few characters of a secret.
fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 11 {
        return "****".to_string();
    }
    let head: String = chars[..7].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Platform-specific install hint for yt-dlp.
fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}

/// Platform-specific install hint for ffmpeg.
fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}
