// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Local version discovery
//!
//! The installed build is described by a `PatchVersion=W.X.Y.Z` line in the
//! server's metadata file. It is read once at startup; the version cannot
//! change while the process is running, so there is no re-read or retry.

use crate::error::ResolveError;
use regex::Regex;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

static PATCH_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"PatchVersion=(\d+\.\d+\.\d+\.\d+)").expect("PatchVersion pattern is valid")
});

/// Installed version, four dot-separated non-negative integers.
///
/// Treated as an opaque token: it is only ever echoed back to the
/// version check endpoint, never compared numerically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalVersion(String);

impl LocalVersion {
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        let well_formed = parts.len() == 4
            && parts
                .iter()
                .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));

        well_formed.then(|| Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocalVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Version the remote service requires, as reported by a stale check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredVersion(pub u64);

impl fmt::Display for RequiredVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read the installed version from the metadata file at `path`.
pub fn resolve_local_version(path: &Path) -> Result<LocalVersion, ResolveError> {
    if !path.exists() {
        return Err(ResolveError::SourceNotFound(path.to_path_buf()));
    }

    let contents = std::fs::read_to_string(path).map_err(|source| ResolveError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    PATCH_VERSION
        .captures(&contents)
        .and_then(|caps| caps.get(1))
        .and_then(|m| LocalVersion::parse(m.as_str()))
        .ok_or_else(|| ResolveError::PatternNotMatched(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const STEAM_INF: &str = "ClientVersion=2000512\n\
                             ServerVersion=2000512\n\
                             PatchVersion=1.40.5.2\n\
                             ProductName=cs2\n\
                             appID=730\n";

    #[test]
    fn test_parse_local_version() {
        assert_eq!(LocalVersion::parse("1.2.3.4").unwrap().as_str(), "1.2.3.4");
        assert_eq!(
            LocalVersion::parse("1.40.5.2").unwrap().to_string(),
            "1.40.5.2"
        );
    }

    #[test]
    fn test_parse_local_version_invalid() {
        assert!(LocalVersion::parse("1.2.3").is_none());
        assert!(LocalVersion::parse("1.2.3.4.5").is_none());
        assert!(LocalVersion::parse("1.2..4").is_none());
        assert!(LocalVersion::parse("1.2.3.x").is_none());
        assert!(LocalVersion::parse("-1.2.3.4").is_none());
        assert!(LocalVersion::parse("").is_none());
    }

    #[test]
    fn test_resolve_from_steam_inf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("steam.inf");
        std::fs::write(&path, STEAM_INF).unwrap();

        let version = resolve_local_version(&path).unwrap();
        assert_eq!(version.as_str(), "1.40.5.2");
    }

    #[test]
    fn test_resolve_single_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("steam.inf");
        std::fs::write(&path, "PatchVersion=1.2.3.4").unwrap();

        assert_eq!(resolve_local_version(&path).unwrap().as_str(), "1.2.3.4");
    }

    #[test]
    fn test_resolve_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("steam.inf");

        assert!(matches!(
            resolve_local_version(&path),
            Err(ResolveError::SourceNotFound(p)) if p == path
        ));
    }

    #[test]
    fn test_resolve_without_patch_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("steam.inf");
        std::fs::write(&path, "ClientVersion=2000512\nPatchVersion=1.40.5\n").unwrap();

        assert!(matches!(
            resolve_local_version(&path),
            Err(ResolveError::PatternNotMatched(_))
        ));
    }

    #[test]
    fn test_resolve_directory_is_io_error() {
        let dir = TempDir::new().unwrap();

        assert!(matches!(
            resolve_local_version(dir.path()),
            Err(ResolveError::Io { .. })
        ));
    }

    #[test]
    fn test_required_version_display() {
        assert_eq!(RequiredVersion(14_023).to_string(), "14023");
    }
}
