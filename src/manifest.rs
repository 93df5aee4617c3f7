// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ManifestError;

const MANIFEST_FILENAME: &str = "manifest.json";

/// Record of the pages a build has written to an output directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteManifest {
    /// Backend the pages were generated from
    pub api_url: String,
    /// Pages keyed by episode identity
    pub pages: BTreeMap<String, PageEntry>,
}

/// One pre-rendered page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEntry {
    /// Path relative to the output directory
    pub path: String,
    pub title: String,
    /// RFC 3339 timestamp
    pub generated_at: String,
    pub revalidate_seconds: u64,
    pub content_hash: String,
}

impl PageEntry {
    /// Whether the page is still within its revalidation interval at `now`
    ///
    /// Entries with an unreadable timestamp are treated as stale.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let Ok(generated_at) = DateTime::parse_from_rfc3339(&self.generated_at) else {
            return false;
        };
        let Ok(revalidate_seconds) = i64::try_from(self.revalidate_seconds) else {
            return true;
        };
        let Some(revalidate) = TimeDelta::try_seconds(revalidate_seconds) else {
            return true;
        };

        now.signed_duration_since(generated_at) < revalidate
    }
}

/// Write the manifest to the output directory
pub fn write_manifest(manifest: &SiteManifest, output_dir: &Path) -> Result<(), ManifestError> {
    let path = output_dir.join(MANIFEST_FILENAME);

    let json = serde_json::to_string_pretty(manifest)?;
    std::fs::write(&path, json).map_err(|e| ManifestError::WriteFailed { path, source: e })
}

/// Read the manifest from the output directory, if one has been written
pub fn read_manifest(output_dir: &Path) -> Result<Option<SiteManifest>, ManifestError> {
    let path = output_dir.join(MANIFEST_FILENAME);

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ManifestError::ReadFailed { path, source: e }),
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| ManifestError::JsonParseFailed { path, source: e })
}
