//! Consent Probe
//!
//! Reads a raw `Cookie` header and reports which consent requirements it
//! satisfies, using the same resolver a page would.
//!
//! # Usage
//!
//! ```bash
//! # Granted categories only
//! consent_probe --cookie 'cc-settings={"categories":["analytics"]}'
//!
//! # Check requirement sets (comma-separated, repeatable)
//! consent_probe --cookie "$COOKIE" --require analytics --require analytics,ads
//!
//! # Cookie from stdin, JSON output
//! echo "$COOKIE" | consent_probe --format json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use cookie_consent_resolver::{ConsentResolver, MemoryDocument, RequiredCategories, ResolverConfig};
use serde_json::json;
use std::cell::Cell;
use std::io::{self, Read};
use std::rc::Rc;

#[derive(Parser)]
#[command(name = "consent_probe")]
#[command(version)]
#[command(about = "Check which consent requirements a cookie header satisfies")]
struct Cli {
    /// Raw cookie header (reads stdin if not provided)
    #[arg(long, short)]
    cookie: Option<String>,

    /// Consent cookie name (default: $CONSENT_COOKIE_NAME or cc-settings)
    #[arg(long, short)]
    name: Option<String>,

    /// Required categories, comma-separated; an empty value requires nothing
    #[arg(long, short)]
    require: Vec<String>,

    /// Output format
    #[arg(long, short = 'o', default_value = "text", value_enum)]
    format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

fn parse_requirement(raw: &str) -> RequiredCategories {
    RequiredCategories::new(
        raw.split(',')
            .map(str::trim)
            .filter(|category| !category.is_empty()),
    )
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ResolverConfig::from_env()?;
    if let Some(name) = cli.name {
        config = config.with_cookie_name(name);
        config.validate()?;
    }

    let cookie = match cli.cookie {
        Some(cookie) => cookie,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read cookie header from stdin")?;
            buffer.trim().to_string()
        }
    };

    let document = Rc::new(MemoryDocument::new().with_raw_cookie(cookie));
    let mut resolver = ConsentResolver::from_config(&config, document);

    let mut checks = Vec::new();
    for raw in &cli.require {
        let required = parse_requirement(raw);
        let fired = Rc::new(Cell::new(false));
        let flag = Rc::clone(&fired);
        resolver.resolve(required.clone(), move || flag.set(true));
        checks.push((required, fired.get()));
    }

    match cli.format {
        OutputFormat::Json => {
            let checks: Vec<_> = checks
                .iter()
                .map(|(required, satisfied)| {
                    json!({
                        "required": required.as_slice(),
                        "satisfied": satisfied,
                    })
                })
                .collect();
            let report = json!({
                "cookie": config.cookie_name,
                "granted": resolver.categories(),
                "checks": checks,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!("cookie:  {}", config.cookie_name);
            println!("granted: [{}]", resolver.categories().join(", "));
            for (required, satisfied) in &checks {
                let verdict = if *satisfied { "fires" } else { "blocked" };
                let label = required.to_string();
                println!("  {label:<30} {verdict}");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_requirement_splits_and_trims() {
        assert_eq!(
            parse_requirement(" analytics , ads ").as_slice(),
            ["analytics", "ads"]
        );
        assert!(parse_requirement("").is_empty());
    }
}
