//! Self-update from the release feed.
//!
//! Discovers the latest release tag by reading the redirect issued by a
//! `.../releases/latest` page, compares it with the compiled-in version and,
//! if newer, downloads this platform's artifact and swaps it in for the
//! running binary. Artifacts are the bare binaries published by the release
//! workflow, so no archive handling is needed.
//!
//! Tests inject a local HTTP server URL via `check_latest_version_from_url()`.

use anyhow::{Context, Result, bail};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::output;
use crate::release::{self, MATRIX};

/// User-Agent header sent with release feed requests.
const USER_AGENT: &str = concat!("sitzungsverwaltung/", env!("CARGO_PKG_VERSION"));

/// HTTP request timeout for version checks.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP request timeout for artifact downloads.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

// ---------------------------------------------------------------------------
// Data model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestRelease {
    /// The git tag for this release (e.g., "v0.3.0").
    pub tag_name: String,
    pub assets: Vec<ReleaseAsset>,
}

/// A single downloadable asset attached to a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    /// Filename of the asset (e.g., "sitzungsverwaltung-linux-amd64").
    pub name: String,
    pub browser_download_url: String,
}

// ---------------------------------------------------------------------------
// Version helpers
// ---------------------------------------------------------------------------

/// Returns the compiled-in package version.
pub fn current_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Strips an optional leading `v` or `V` from a version tag.
pub fn normalize_version_tag(tag: &str) -> &str {
    let trimmed = tag.trim();
    trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed)
}

/// Compares two version strings using semver.
///
/// `Ordering::Less` means `local < remote`, i.e. an update is available.
pub fn compare_versions(local: &str, remote: &str) -> Result<Ordering> {
    let local_ver = semver::Version::parse(normalize_version_tag(local))
        .with_context(|| format!("Failed to parse local version '{local}' as semver"))?;
    let remote_ver = semver::Version::parse(normalize_version_tag(remote))
        .with_context(|| format!("Failed to parse remote version '{remote}' as semver"))?;

    Ok(local_ver.cmp(&remote_ver))
}

// ---------------------------------------------------------------------------
// Release discovery via HTTP redirect
// ---------------------------------------------------------------------------

/// Fetches the latest release from a `.../releases/latest` URL.
///
/// The URL should answer with a 3xx redirect whose `Location` header ends
/// with the version tag. Download URLs for all matrix artifacts are derived
/// from the tag without further requests.
pub fn check_latest_version_from_url(url: &str) -> Result<LatestRelease> {
    let tag = discover_latest_tag(url, REQUEST_TIMEOUT)?;
    let repo_base = repo_base_from_releases_url(url);
    Ok(build_release_from_tag(&tag, repo_base))
}

fn discover_latest_tag(url: &str, timeout: Duration) -> Result<String> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("Failed to build HTTP client")?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime for HTTP request")?;

    runtime.block_on(async move {
        let response = client
            .get(url)
            .send()
            .await
            .context("Failed to connect to release server")?;

        let status = response.status();
        if !status.is_redirection() {
            bail!(
                "Release server returned HTTP {status}, expected a redirect to the latest release"
            );
        }

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .ok_or_else(|| anyhow::anyhow!("Redirect response missing Location header"))?
            .to_str()
            .context("Location header is not valid UTF-8")?;

        // e.g. https://github.com/OWNER/REPO/releases/tag/v0.4.1
        let tag = location
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!("Could not extract version tag from redirect URL: {location}")
            })?;

        Ok(tag.to_string())
    })
}

/// One asset per matrix leg at `{repo_base}/releases/download/{tag}/{bin}`.
pub fn build_release_from_tag(tag: &str, repo_base_url: &str) -> LatestRelease {
    let download_base = format!("{repo_base_url}/releases/download/{tag}");
    let assets = MATRIX
        .iter()
        .map(|entry| ReleaseAsset {
            name: entry.bin.to_string(),
            browser_download_url: format!("{download_base}/{}", entry.bin),
        })
        .collect();

    LatestRelease {
        tag_name: tag.to_string(),
        assets,
    }
}

/// Strips a `/releases/latest` suffix (and trailing slashes) to get the
/// repository base URL. Other URLs are returned unchanged.
fn repo_base_from_releases_url(url: &str) -> &str {
    let url = url.trim_end_matches('/');
    url.strip_suffix("/releases/latest").unwrap_or(url)
}

// ---------------------------------------------------------------------------
// Artifact selection
// ---------------------------------------------------------------------------

/// Selects the release asset published for `target`.
pub fn pick_artifact_for_target(assets: &[ReleaseAsset], target: &str) -> Result<ReleaseAsset> {
    let expected = release::artifact_name_for_target(target).ok_or_else(|| {
        anyhow::anyhow!("Target '{target}' is not built by the release workflow")
    })?;
    assets
        .iter()
        .find(|a| a.name == expected)
        .cloned()
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No release asset found for target '{target}' (expected '{expected}'). \
                 Available assets: [{}]",
                assets
                    .iter()
                    .map(|a| a.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })
}

// ---------------------------------------------------------------------------
// Download and replace
// ---------------------------------------------------------------------------

/// Downloads a URL to `dest_dir/filename` and returns the file path.
pub fn download_to_file(url: &str, dest_dir: &Path, filename: &str) -> Result<PathBuf> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime for HTTP request")?;

    let bytes = runtime.block_on(async move {
        let response =
            client.get(url).send().await.with_context(|| {
                format!("Failed to connect to download server for '{filename}'")
            })?;

        let status = response.status();
        if !status.is_success() {
            bail!("Download of '{filename}' failed: HTTP {status} from {url}");
        }

        response
            .bytes()
            .await
            .with_context(|| format!("Failed to read response body for '{filename}'"))
    })?;

    if bytes.is_empty() {
        bail!("Download of '{filename}' returned an empty file");
    }

    let dest_path = dest_dir.join(filename);
    std::fs::write(&dest_path, &bytes)
        .with_context(|| format!("Failed to write '{filename}' to {}", dest_path.display()))?;

    Ok(dest_path)
}

/// Marks a downloaded binary as executable. No-op on Windows.
pub fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).with_context(
            || format!("Failed to set executable permissions on {}", path.display()),
        )?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Replaces the currently running binary with `replacement_path`.
pub fn self_replace_binary(replacement_path: &Path) -> Result<()> {
    if !replacement_path.exists() {
        bail!(
            "Replacement binary does not exist: {}",
            replacement_path.display()
        );
    }

    self_replace::self_replace(replacement_path).with_context(|| {
        format!(
            "Failed to replace the running binary. \
             This may be a permissions issue; try running with elevated privileges.\n\
             Replacement file: {}",
            replacement_path.display()
        )
    })?;

    Ok(())
}

/// Asks the user to confirm the update.
///
/// Precedence (highest wins): `yes` flag, `auto_update` from config, then an
/// interactive [y/N] prompt.
pub fn confirm_update(
    local_version: &str,
    remote_version: &str,
    yes: bool,
    auto_update: bool,
) -> Result<bool> {
    if yes || auto_update {
        return Ok(true);
    }

    let prompt = format!("Update sitzungsverwaltung v{local_version} → v{remote_version}?");
    let result = dialoguer::Confirm::new()
        .with_prompt(&prompt)
        .default(false)
        .interact_opt()
        .context("Failed to read user input for update confirmation")?;

    // None: Ctrl-C or interrupted input
    Ok(result.unwrap_or(false))
}

// ---------------------------------------------------------------------------
// Orchestration
// ---------------------------------------------------------------------------

/// What `run_update` ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    UpToDate { latest: String },
    /// `asset` is `None` when this build's target is not a release target.
    Available {
        latest: String,
        asset: Option<ReleaseAsset>,
    },
    Cancelled,
    Installed { latest: String },
}

/// Checks the release feed and, unless `check` is set, installs a newer
/// release over the running binary.
pub fn run_update(
    releases_url: &str,
    check: bool,
    yes: bool,
    auto_update: bool,
) -> Result<UpdateOutcome> {
    let local = current_version();

    output::action("Checking", releases_url);
    let latest_release =
        check_latest_version_from_url(releases_url).context("Failed to check for latest release")?;
    let latest = normalize_version_tag(&latest_release.tag_name).to_string();

    let ordering = compare_versions(local, &latest_release.tag_name)
        .context("Failed to compare local and remote versions")?;
    if ordering != Ordering::Less {
        println!("sitzungsverwaltung v{local} is up to date (latest: v{latest})");
        return Ok(UpdateOutcome::UpToDate { latest });
    }

    let target = release::build_target();
    let asset = pick_artifact_for_target(&latest_release.assets, target);

    if check {
        println!("Update available: v{local} → v{latest}");
        let asset = match asset {
            Ok(asset) => {
                println!("Download: {}", asset.browser_download_url);
                Some(asset)
            }
            Err(e) => {
                output::note(&format!("{e}"));
                None
            }
        };
        return Ok(UpdateOutcome::Available { latest, asset });
    }

    let asset = asset?;
    output::detail(&format!("asset: {}", asset.browser_download_url));

    if !confirm_update(local, &latest, yes, auto_update)? {
        println!("Update cancelled.");
        return Ok(UpdateOutcome::Cancelled);
    }

    let tmp_dir = tempfile::tempdir().context("Failed to create temporary directory")?;
    output::action("Downloading", &asset.name);
    let new_binary = download_to_file(&asset.browser_download_url, tmp_dir.path(), &asset.name)
        .context("Failed to download release artifact")?;
    make_executable(&new_binary)?;
    self_replace_binary(&new_binary)?;

    output::success("Updated", &format!("sitzungsverwaltung v{local} → v{latest}"));
    Ok(UpdateOutcome::Installed { latest })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
