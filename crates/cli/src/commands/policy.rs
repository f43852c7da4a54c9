use anyhow::Context;
use colored::*;
use core_logic::{EngineConfig, RuleStore};
use std::fs;
use std::path::Path;
use tracing::info;

pub fn engine_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    EngineConfig::from_toml(&content).context("Invalid engine config")
}

pub fn check(file_path: &Path, config: EngineConfig) -> anyhow::Result<()> {
    println!("{} {}", "Checking policy:".bold(), file_path.display());

    let document = app_utils::load_path(file_path)?;
    println!("  {} Policy name: {}", "✓".green(), document.name());
    println!("  {} Version: {}", "✓".green(), document.version());
    println!("  {} Types: {}", "✓".green(), document.types().len());

    let registry = app_utils::offline_registry(&document)?;
    let policy =
        core_logic::Policy::with_config(registry, config).context("Invalid engine config")?;
    let report = policy
        .load(document.into_rules())
        .context("Policy rejected")?;
    info!(
        path = %file_path.display(),
        version = report.version,
        rules = report.rules,
        warnings = report.warnings.len(),
        "policy checked"
    );

    println!("  {} Rules: {}", "✓".green(), report.rules);
    println!("  {} Predicates: {}", "✓".green(), report.predicates);

    for warning in &report.warnings {
        println!("  {} {}", "⚠".yellow(), warning);
    }

    println!();
    if report.warnings.is_empty() {
        println!("{} Policy is valid!", "✓".green().bold());
    } else {
        println!(
            "{} Policy is valid with {} warning(s)",
            "⚠".yellow().bold(),
            report.warnings.len()
        );
    }

    Ok(())
}

pub fn rules(file_path: &Path) -> anyhow::Result<()> {
    let document = app_utils::load_path(file_path)?;
    let store = RuleStore::new(document.rules().iter().cloned());

    println!(
        "{} {} (version {})",
        "Policy:".bold(),
        document.name(),
        document.version()
    );
    for (name, arity) in store.signatures() {
        let rules = store.find_rules(name, arity);
        println!();
        println!("{}/{} ({} rule(s))", name.cyan().bold(), arity, rules.len());
        for rule in rules {
            println!("  {}", rule);
        }
    }

    Ok(())
}
