//! Access token CLI commands: get, refresh, set, fingerprint.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Password;

use larkit_types::token::AccessToken;

use crate::state::ConcreteTokenManager;

/// Show a token as its first characters plus its length.
pub fn mask_token(value: &str) -> String {
    let prefix: String = value.chars().take(4).collect();
    format!("{prefix}... ({} chars)", value.chars().count())
}

/// Print the live token, issuing (or re-issuing with `force`) upstream.
pub async fn get_token(manager: &ConcreteTokenManager, force: bool, json: bool) -> Result<()> {
    let token = manager.get_token(force).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&token_json(manager, &token))?);
        return Ok(());
    }

    println!();
    print_token_table(manager, &token);
    println!();
    Ok(())
}

/// Seed the cache with an externally obtained token.
///
/// ```bash
/// # Secure prompt
/// larkit token set
///
/// # Script/automation mode
/// larkit token set --value ACCESS_TOKEN --ttl 7200
/// ```
pub async fn set_token(
    manager: &ConcreteTokenManager,
    value: Option<&str>,
    ttl: Option<u64>,
    json: bool,
) -> Result<()> {
    let value = match value {
        Some(v) => v.to_string(),
        None => Password::new()
            .with_prompt(format!("Enter {}", style("access token").bold()))
            .interact()?,
    };
    if value.trim().is_empty() {
        anyhow::bail!("token value must not be empty");
    }

    let token = manager.set_token(&value, ttl).await?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "set": true,
                "cache_key": manager.cache_key(),
                "masked": mask_token(token.value()),
                "expires_at": token.expires_at().to_rfc3339(),
            })
        );
    } else {
        println!(
            "  {} Token stored ({}), expires {}",
            style("ok").green().bold(),
            mask_token(token.value()),
            style(token.expires_at().format("%Y-%m-%d %H:%M:%S UTC")).dim()
        );
    }
    Ok(())
}

/// Print the credential fingerprint and the cache key derived from it.
pub fn show_fingerprint(manager: &ConcreteTokenManager, json: bool) {
    let fingerprint = manager.fingerprint();
    let cache_key = manager.cache_key();

    if json {
        println!(
            "{}",
            serde_json::json!({"fingerprint": fingerprint, "cache_key": cache_key})
        );
        return;
    }

    if manager.credentials().is_empty() {
        println!(
            "  {} No credentials configured. Add them under {}",
            style("i").blue().bold(),
            style("[credentials.values]").yellow()
        );
    }
    println!("  Fingerprint: {}", style(&fingerprint).cyan());
    println!("  Cache key:   {}", style(&cache_key).dim());
}

fn token_json(manager: &ConcreteTokenManager, token: &AccessToken) -> serde_json::Value {
    serde_json::json!({
        "access_token": token.value(),
        "issued_at": token.issued_at().to_rfc3339(),
        "expires_at": token.expires_at().to_rfc3339(),
        "lifetime_secs": token.lifetime_secs(),
        "cache_key": manager.cache_key(),
    })
}

fn print_token_table(manager: &ConcreteTokenManager, token: &AccessToken) {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Field").fg(Color::White),
        Cell::new("Value").fg(Color::White),
    ]);
    table.add_row(vec![
        Cell::new("Token"),
        Cell::new(token.value()).fg(Color::Cyan),
    ]);
    table.add_row(vec![
        Cell::new("Issued"),
        Cell::new(token.issued_at().format("%Y-%m-%d %H:%M:%S UTC")),
    ]);
    table.add_row(vec![
        Cell::new("Expires"),
        Cell::new(token.expires_at().format("%Y-%m-%d %H:%M:%S UTC")),
    ]);
    table.add_row(vec![
        Cell::new("Cache key"),
        Cell::new(manager.cache_key()).fg(Color::DarkGrey),
    ]);

    println!("{table}");
}
