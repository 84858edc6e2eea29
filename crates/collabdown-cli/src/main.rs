use anyhow::{Context, Result};
use collabdown_config::{Config, CursorBiasSetting};
use collabdown_engine::sync::{CursorBias, SessionOptions};
use std::{env, fmt::Write, path::PathBuf, process};

mod script;

use script::{ReplayOptions, Report, Script, replay};

/// Seed for a room when the config names no document
const THREE_LAWS: &str = include_str!("three_laws.md");

fn replay_options(config: &Config) -> Result<ReplayOptions> {
    let seed_text = config
        .read_initial_text()?
        .unwrap_or_else(|| THREE_LAWS.to_string());
    let cursor_bias = match config.cursor_bias {
        CursorBiasSetting::Stay => CursorBias::Stay,
        CursorBiasSetting::Advance => CursorBias::Advance,
    };

    Ok(ReplayOptions {
        seed_text,
        session: SessionOptions::default()
            .with_cursor_bias(cursor_bias)
            .with_max_apply_failures(config.max_apply_failures),
        preview: config.preview,
    })
}

fn render_report(report: &Report) -> String {
    let mut out = String::new();

    for participant in &report.participants {
        let _ = writeln!(
            out,
            "== {} ({:?}, sent {}, applied {}, failed {})",
            participant.name,
            participant.status,
            participant.stats.sent,
            participant.stats.applied,
            participant.stats.apply_failures
        );
        out.push_str(&participant.text);
        if !participant.text.ends_with('\n') {
            out.push('\n');
        }
        for (id, position) in &participant.cursors {
            let _ = writeln!(out, "   cursor {id} at {position}");
        }
    }

    if let Some(html) = &report.preview {
        out.push_str("== preview\n");
        out.push_str(html);
    }

    if report.converged() {
        let _ = writeln!(
            out,
            "== converged: {} participants share {} characters",
            report.participants.len(),
            report.relay_text.chars().count()
        );
    } else {
        let diverged: Vec<String> = report.diverged().iter().map(|id| id.to_string()).collect();
        let _ = writeln!(
            out,
            "== diverged: {} out of step with the relay ({} failed events)",
            diverged.join(", "),
            report.failures
        );
    }
    out
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().collect();
    let (script_path, config) = match args.len() {
        2 => match Config::load() {
            Ok(config) => (PathBuf::from(&args[1]), config.unwrap_or_default()),
            Err(e) => {
                eprintln!("Error: Failed to load config file: {e}");
                process::exit(1);
            }
        },
        3 => {
            let config_path = PathBuf::from(&args[2]);
            let config = Config::load_from_path(&config_path)?
                .with_context(|| format!("No config file at {}", config_path.display()))?;
            (PathBuf::from(&args[1]), config)
        }
        _ => {
            eprintln!("Usage: {} <script.toml> [config.toml]", args[0]);
            eprintln!(
                "Without a config argument, {} is used when present",
                Config::config_path().display()
            );
            process::exit(1);
        }
    };

    let content = std::fs::read_to_string(&script_path)
        .with_context(|| format!("Failed to read script {}", script_path.display()))?;
    let script = Script::parse(&content)?;
    let report = replay(&script, &replay_options(&config)?)?;

    print!("{}", render_report(&report));
    if !report.converged() {
        process::exit(1);
    }
    Ok(())
}
