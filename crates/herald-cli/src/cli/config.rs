//! `herald check-config` and `herald init`.

use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Result};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use dialoguer::Confirm;
use herald_infra::config::{config_path, write_template};
use herald_types::config::HeraldConfig;
use herald_types::secret::Redacted;

/// One displayed setting. `required` settings are checked against
/// [`HeraldConfig::validate`].
struct Setting {
    key: &'static str,
    value: String,
    required: bool,
}

fn secret(value: Option<&Redacted>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.masked(),
        _ => String::new(),
    }
}

fn settings(config: &HeraldConfig) -> Vec<Setting> {
    let setting = |key, value: String, required| Setting {
        key,
        value,
        required,
    };
    vec![
        setting("gateway.client_id", config.gateway.client_id.clone(), true),
        setting(
            "gateway.client_secret",
            secret(config.gateway.client_secret.as_ref()),
            true,
        ),
        setting(
            "gateway.app_key",
            secret(Some(&Redacted::new(config.gateway.app_key.clone()))),
            true,
        ),
        setting("gateway.token_url", config.gateway.token_url.clone(), false),
        setting("gateway.api_url", config.gateway.api_url.clone(), false),
        setting(
            "smtp.server",
            format!("{}:{}", config.smtp.host, config.smtp.port),
            false,
        ),
        setting("smtp.username", config.smtp.username.clone(), true),
        setting("smtp.password", secret(config.smtp.password.as_ref()), true),
        setting("smtp.from", config.smtp.from.clone(), true),
        setting(
            "delivery.email_recipients",
            config.delivery.email_recipients.join(", "),
            true,
        ),
        setting(
            "webex.access_token",
            secret(config.webex.access_token.as_ref()),
            true,
        ),
        setting("webex.room_id", config.webex.room_id.clone(), true),
        setting("webex.mentions", config.webex.mentions.join(", "), false),
    ]
}

pub fn check_config(config: &HeraldConfig, data_dir: &Path, json: bool) -> ExitCode {
    let missing = config.validate();
    let rows = settings(config);

    if json {
        let values: serde_json::Map<String, serde_json::Value> = rows
            .iter()
            .map(|s| (s.key.to_string(), serde_json::Value::String(s.value.clone())))
            .collect();
        let report = serde_json::json!({
            "config_file": config_path(data_dir).display().to_string(),
            "valid": missing.is_empty(),
            "missing": missing,
            "settings": values,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&report).unwrap_or_else(|_| report.to_string())
        );
    } else {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("Setting").fg(Color::Cyan),
                Cell::new("Value").fg(Color::Cyan),
                Cell::new("Status").fg(Color::Cyan),
            ]);

        for row in &rows {
            let status = if missing.contains(&row.key) {
                Cell::new("missing").fg(Color::Red)
            } else if row.required {
                Cell::new("ok").fg(Color::Green)
            } else {
                Cell::new("-").fg(Color::DarkGrey)
            };
            let value = if row.value.is_empty() {
                Cell::new("(not set)").fg(Color::DarkGrey)
            } else {
                Cell::new(&row.value)
            };
            table.add_row(vec![Cell::new(row.key), value, status]);
        }

        println!(
            "  {} {}\n",
            style("Config file:").bold(),
            config_path(data_dir).display()
        );
        println!("{table}");
        if missing.is_empty() {
            println!("\n  {} All configuration is valid", style("*").green().bold());
        } else {
            println!(
                "\n  {} {} setting(s) missing. Set them in config.toml, .env or HERALD_* variables.",
                style("x").red().bold(),
                missing.len()
            );
        }
    }

    if missing.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

pub async fn init(data_dir: &Path, force: bool, json: bool) -> Result<()> {
    let path = config_path(data_dir);
    if path.exists() && !force {
        let confirmed = !json
            && std::io::stdin().is_terminal()
            && Confirm::new()
                .with_prompt(format!("{} already exists. Overwrite?", path.display()))
                .default(false)
                .interact()?;
        if !confirmed {
            bail!("{} already exists (use --force to overwrite)", path.display());
        }
    }

    let written = write_template(data_dir).await?;

    if json {
        let result = serde_json::json!({ "config_file": written.display().to_string() });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "  {} Wrote {}",
            style("*").green().bold(),
            style(written.display()).cyan()
        );
        println!("  Fill in the credentials, then run {}", style("herald check-config").cyan());
    }
    Ok(())
}
