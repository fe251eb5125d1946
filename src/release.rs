//! Release build matrix and artifact naming.
//!
//! Mirrors `.github/workflows/release.yml`: every push builds the binary for
//! six targets, renames the output to a per-platform artifact name, and tag
//! pushes attach those artifacts to a release. Keeping the matrix here lets
//! `update` find the right asset and lets tests check the workflow file.

use serde::Serialize;

/// Name of the binary produced by `cargo build`.
pub const BIN_NAME: &str = "sitzungsverwaltung";

/// Toolchain channel used by every matrix leg.
pub const TOOLCHAIN: &str = "stable";

/// Matrix legs run independently; one failure does not cancel the others.
pub const FAIL_FAST: bool = false;

/// Prefix a ref must have for the publish step to run.
pub const TAG_REF_PREFIX: &str = "refs/tags/";

/// One leg of the release build matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatrixEntry {
    /// CI runner image.
    pub os: &'static str,
    /// Rust target triple.
    pub target: &'static str,
    /// Canonical artifact filename.
    pub bin: &'static str,
}

impl MatrixEntry {
    pub fn is_windows(&self) -> bool {
        is_windows_target(self.target)
    }

    /// Where the build step leaves the stripped release binary.
    pub fn built_binary_path(&self) -> String {
        built_binary_path(self.target)
    }
}

pub static MATRIX: [MatrixEntry; 6] = [
    MatrixEntry {
        os: "ubuntu-latest",
        target: "x86_64-unknown-linux-gnu",
        bin: "sitzungsverwaltung-linux-amd64",
    },
    MatrixEntry {
        os: "ubuntu-latest",
        target: "aarch64-unknown-linux-gnu",
        bin: "sitzungsverwaltung-linux-aarch64",
    },
    MatrixEntry {
        os: "windows-latest",
        target: "x86_64-pc-windows-msvc",
        bin: "sitzungsverwaltung-amd64.exe",
    },
    MatrixEntry {
        os: "windows-latest",
        target: "aarch64-pc-windows-msvc",
        bin: "sitzungsverwaltung-aarch64.exe",
    },
    MatrixEntry {
        os: "macOS-latest",
        target: "x86_64-apple-darwin",
        bin: "sitzungsverwaltung-darwin-amd64",
    },
    MatrixEntry {
        os: "macOS-latest",
        target: "aarch64-apple-darwin",
        bin: "sitzungsverwaltung-darwin-aarch64",
    },
];

pub fn entry_for_target(target: &str) -> Option<&'static MatrixEntry> {
    MATRIX.iter().find(|e| e.target == target.trim())
}

/// Release artifact filename for a target triple, if it is a release target.
pub fn artifact_name_for_target(target: &str) -> Option<&'static str> {
    entry_for_target(target).map(|e| e.bin)
}

pub fn is_windows_target(target: &str) -> bool {
    target.contains("windows")
}

/// `target/<triple>/release/sitzungsverwaltung`, with `.exe` on Windows.
pub fn built_binary_path(target: &str) -> String {
    let ext = if is_windows_target(target) { ".exe" } else { "" };
    format!("target/{target}/release/{BIN_NAME}{ext}")
}

/// Tag name of a `refs/tags/...` ref. Branch refs and bare prefixes give `None`.
pub fn tag_name(git_ref: &str) -> Option<&str> {
    git_ref
        .trim()
        .strip_prefix(TAG_REF_PREFIX)
        .filter(|tag| !tag.is_empty())
}

/// Whether a push of `git_ref` publishes a release.
pub fn is_release_ref(git_ref: &str) -> bool {
    tag_name(git_ref).is_some()
}

/// Compile-time target triple, exported by `build.rs`.
pub fn build_target() -> &'static str {
    env!("TARGET")
}

/// Artifact name for the running binary's own target.
pub fn current_artifact_name() -> Option<&'static str> {
    artifact_name_for_target(build_target())
}
