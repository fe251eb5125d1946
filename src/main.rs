use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use uuid::Uuid;

use sitzungsverwaltung::api_client::ApiClient;
use sitzungsverwaltung::config::{CONFIG_KEYS, CliConfig, ResolvedApiUrl};
use sitzungsverwaltung::domain::{Sitzung, Top};
use sitzungsverwaltung::release::{self, MATRIX, MatrixEntry};
use sitzungsverwaltung::{output, tui, update};

/// Sitzungsverwaltung: browse Sitzungen and their TOPs from a TOP manager.
///
/// Without a subcommand the interactive terminal UI starts.
#[derive(Parser, Debug)]
#[command(
    name = "sitzungsverwaltung",
    version,
    about,
    after_help = "Examples:\n  sitzungsverwaltung\n  sitzungsverwaltung --api-url https://tops.example.org sitzungen\n  sitzungsverwaltung tops 6f1c8a43-6d6c-4c40-9d58-2b0fb6e3a7a1 --json\n  sitzungsverwaltung config set api_url http://localhost:8080\n  sitzungsverwaltung release artifact\n  sitzungsverwaltung update --check"
)]
struct Cli {
    /// Base URL of the TOP manager API (overrides env and config file).
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Print extra detail (resolved URLs, config sources) to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the interactive terminal UI (default).
    Tui,

    /// List all Sitzungen.
    Sitzungen {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// List the TOPs of one Sitzung, ordered by weight.
    Tops {
        /// Id of the Sitzung.
        sitzung_id: Uuid,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show or change the config file.
    Config {
        #[command(subcommand)]
        config_command: ConfigCommand,
    },

    /// Release matrix and artifact naming.
    Release {
        #[command(subcommand)]
        release_command: ReleaseCommand,
    },

    /// Update to the latest release.
    Update {
        /// Only report whether an update is available.
        #[arg(long)]
        check: bool,
        /// Install without asking for confirmation.
        #[arg(long, short)]
        yes: bool,
        /// `.../releases/latest` URL of the release feed.
        #[arg(long)]
        releases_url: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print config values and where the effective API URL comes from.
    Show,
    /// Set a config key (api_url, releases_url, auto_update).
    Set { key: String, value: String },
    /// Remove a config key.
    Unset { key: String },
}

#[derive(Subcommand, Debug)]
enum ReleaseCommand {
    /// Print the release build matrix.
    Matrix {
        #[arg(long)]
        json: bool,
    },
    /// Print the artifact name for a target triple (default: this build).
    Artifact {
        #[arg(long)]
        target: Option<String>,
    },
    /// Exit 0 if REF publishes a release (a `refs/tags/...` ref), else 1.
    CheckRef {
        #[arg(value_name = "REF")]
        git_ref: String,
    },
}

// ---------------------------------------------------------------------------
// Subcommand dispatch
// ---------------------------------------------------------------------------

fn api_client(cli_api_url: Option<&str>) -> Result<ApiClient> {
    let config = CliConfig::load()?;
    let resolved = config.resolve_api_url(cli_api_url);
    report_api_url(&resolved);
    Ok(ApiClient::new(&resolved.url))
}

fn report_api_url(resolved: &ResolvedApiUrl) {
    output::detail(&format!(
        "API URL {} (from {})",
        resolved.url,
        resolved.source.as_str()
    ));
    if resolved.is_insecure_remote {
        output::note(&format!(
            "{} does not use HTTPS; traffic is not encrypted",
            resolved.url
        ));
    }
}

fn run_sitzungen(cli_api_url: Option<&str>, json: bool) -> Result<()> {
    let sitzungen = api_client(cli_api_url)?.list_sitzungen()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&sitzungen)?);
    } else if sitzungen.is_empty() {
        output::note("No Sitzungen found");
    } else {
        print!("{}", format_sitzungen(&sitzungen));
    }
    Ok(())
}

fn run_tops(cli_api_url: Option<&str>, sitzung_id: Uuid, json: bool) -> Result<()> {
    let tops = api_client(cli_api_url)?.list_tops(sitzung_id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&tops)?);
    } else if tops.is_empty() {
        output::note(&format!("Sitzung {sitzung_id} has no TOPs"));
    } else {
        print!("{}", format_tops(&tops));
    }
    Ok(())
}

fn run_config(cli_api_url: Option<&str>, command: ConfigCommand) -> Result<()> {
    let mut config = CliConfig::load()?;
    match command {
        ConfigCommand::Show => {
            let path = CliConfig::config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(unavailable: $HOME is not set)".to_string());
            println!("config file: {path}");
            print!("{}", format_config(&config));
            let resolved = config.resolve_api_url(cli_api_url);
            println!(
                "effective api_url: {} (from {})",
                resolved.url,
                resolved.source.as_str()
            );
        }
        ConfigCommand::Set { key, value } => {
            config.set(&key, &value)?;
            config.save()?;
            output::success("Saved", &format!("{key} = {}", value.trim()));
        }
        ConfigCommand::Unset { key } => {
            config.unset(&key)?;
            config.save()?;
            output::success("Removed", &key);
        }
    }
    Ok(())
}

/// Returns `false` when `check-ref` is given a ref that publishes nothing.
fn run_release(command: ReleaseCommand) -> Result<bool> {
    match command {
        ReleaseCommand::Matrix { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&MATRIX)?);
            } else {
                print!("{}", format_matrix(&MATRIX));
            }
        }
        ReleaseCommand::Artifact { target } => {
            let target = target.as_deref().unwrap_or(release::build_target());
            let name = release::artifact_name_for_target(target).with_context(|| {
                format!("target '{target}' is not part of the release build matrix")
            })?;
            println!("{name}");
            output::detail(&format!("built at {}", release::built_binary_path(target)));
        }
        ReleaseCommand::CheckRef { git_ref } => match release::tag_name(&git_ref) {
            Some(tag) => println!("{tag}"),
            None => {
                output::note(&format!("{git_ref} is not a tag ref; nothing is published"));
                return Ok(false);
            }
        },
    }
    Ok(true)
}

fn run_update(releases_url: Option<&str>, check: bool, yes: bool) -> Result<()> {
    let config = CliConfig::load()
        .context("Failed to load config. Check ~/.sitzungsverwaltung/config.toml for syntax errors.")?;
    let (url, source) = config.resolve_releases_url(releases_url).context(
        "No release feed configured. Pass --releases-url or run \
         `sitzungsverwaltung config set releases_url <URL>`.",
    )?;
    output::detail(&format!("release feed {url} (from {})", source.as_str()));
    update::run_update(&url, check, yes, config.auto_update_enabled())?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

fn format_sitzungen(sitzungen: &[Sitzung]) -> String {
    sitzungen
        .iter()
        .map(|s| format!("{}  {}  {}\n", s.id, s.display_datum(), s.name))
        .collect()
}

fn format_tops(tops: &[Top]) -> String {
    let width = tops
        .iter()
        .map(|t| t.weight.to_string().len())
        .max()
        .unwrap_or(1);
    tops.iter()
        .map(|t| {
            let summary = t.summary(60);
            if summary.is_empty() {
                format!("{:>width$}. {}\n", t.weight, t.name)
            } else {
                format!("{:>width$}. {} ({summary})\n", t.weight, t.name)
            }
        })
        .collect()
}

fn format_matrix(entries: &[MatrixEntry]) -> String {
    let target_width = entries.iter().map(|e| e.target.len()).max().unwrap_or(0);
    let os_width = entries.iter().map(|e| e.os.len()).max().unwrap_or(0);
    let mut out: String = entries
        .iter()
        .map(|e| {
            format!(
                "{:<os_width$}  {:<target_width$}  {}\n",
                e.os, e.target, e.bin
            )
        })
        .collect();
    out.push_str(&format!(
        "toolchain: {}, fail-fast: {}\n",
        release::TOOLCHAIN,
        release::FAIL_FAST
    ));
    out
}

fn format_config(config: &CliConfig) -> String {
    CONFIG_KEYS
        .iter()
        .map(|key| {
            let value = match *key {
                "api_url" => config.api_url.clone(),
                "releases_url" => config.releases_url.clone(),
                "auto_update" => config.auto_update.map(|b| b.to_string()),
                _ => None,
            };
            format!("{key} = {}\n", value.as_deref().unwrap_or("(unset)"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn run(cli: Cli) -> Result<ExitCode> {
    output::set_verbose(cli.verbose);
    let api_url = cli.api_url.as_deref();

    match cli.command.unwrap_or(Command::Tui) {
        Command::Tui => tui::run(api_client(api_url)?)?,
        Command::Sitzungen { json } => run_sitzungen(api_url, json)?,
        Command::Tops { sitzung_id, json } => run_tops(api_url, sitzung_id, json)?,
        Command::Config { config_command } => run_config(api_url, config_command)?,
        Command::Release { release_command } => {
            if !run_release(release_command)? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Update {
            check,
            yes,
            releases_url,
        } => run_update(releases_url.as_deref(), check, yes)?,
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            output::fail("error:", &format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_tui() {
        let cli = Cli::try_parse_from(["sitzungsverwaltung"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn global_api_url_after_subcommand() {
        let cli = Cli::try_parse_from([
            "sitzungsverwaltung",
            "sitzungen",
            "--json",
            "--api-url",
            "http://tops.local",
        ])
        .unwrap();
        assert_eq!(cli.api_url.as_deref(), Some("http://tops.local"));
        assert!(matches!(cli.command, Some(Command::Sitzungen { json: true })));
    }

    #[test]
    fn tops_requires_valid_uuid() {
        assert!(Cli::try_parse_from(["sitzungsverwaltung", "tops", "not-a-uuid"]).is_err());
        let cli = Cli::try_parse_from([
            "sitzungsverwaltung",
            "tops",
            "6f1c8a43-6d6c-4c40-9d58-2b0fb6e3a7a1",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Command::Tops { json: false, .. })));
    }

    #[test]
    fn release_check_ref_only_passes_tags() {
        let tag = run_release(ReleaseCommand::CheckRef {
            git_ref: "refs/tags/v1.0.0".to_string(),
        })
        .unwrap();
        assert!(tag);

        let branch = run_release(ReleaseCommand::CheckRef {
            git_ref: "refs/heads/main".to_string(),
        })
        .unwrap();
        assert!(!branch);
    }

    #[test]
    fn release_artifact_rejects_unknown_target() {
        let err = run_release(ReleaseCommand::Artifact {
            target: Some("wasm32-unknown-unknown".to_string()),
        })
        .unwrap_err();
        assert!(err.to_string().contains("not part of the release build matrix"));
    }

    #[test]
    fn format_sitzungen_lines() {
        let s = Sitzung {
            name: "Plenum".to_string(),
            datum: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(18, 30, 0)
                .unwrap(),
            id: Uuid::nil(),
        };
        assert_eq!(
            format_sitzungen(&[s]),
            "00000000-0000-0000-0000-000000000000  01.03.2024 18:30  Plenum\n"
        );
    }

    #[test]
    fn format_tops_aligns_weights() {
        let tops = vec![
            Top {
                name: "Begruessung".to_string(),
                id: Uuid::nil(),
                inhalt: String::new(),
                weight: 1,
            },
            Top {
                name: "Verschiedenes".to_string(),
                id: Uuid::nil(),
                inhalt: "Alles andere\nund mehr".to_string(),
                weight: 10,
            },
        ];
        assert_eq!(
            format_tops(&tops),
            " 1. Begruessung\n10. Verschiedenes (Alles andere…)\n"
        );
    }

    #[test]
    fn format_matrix_lists_every_leg() {
        let text = format_matrix(&MATRIX);
        for entry in &MATRIX {
            assert!(text.contains(entry.bin));
            assert!(text.contains(entry.target));
        }
        assert!(text.ends_with("toolchain: stable, fail-fast: false\n"));
    }

    #[test]
    fn format_config_marks_unset_keys() {
        let config = CliConfig {
            api_url: Some("https://tops.example.org".to_string()),
            ..Default::default()
        };
        assert_eq!(
            format_config(&config),
            "api_url = https://tops.example.org\nreleases_url = (unset)\nauto_update = (unset)\n"
        );
    }
}
