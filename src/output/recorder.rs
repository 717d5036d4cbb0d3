//! Mapping and log recorder
//!
//! Collects everything the downstream tooling consumes:
//! - the archive-relative path -> source URL table
//! - the visited URL log, in visitation order
//! - the repository references found on the code host
//!
//! Nothing is written until `flush`, which runs once at the end of a crawl.

use crate::config::OutputConfig;
use crate::ArchiveError;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Archive-relative path -> source URL, one writer per key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    entries: BTreeMap<String, String>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a mapping; a key that is already present is a collision
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The key was new
    /// * `Err(ArchiveError::MappingCollision)` - The key was already mapped;
    ///   the table is left unchanged
    pub fn insert(&mut self, path: String, url: String) -> Result<(), ArchiveError> {
        match self.entries.entry(path) {
            Entry::Vacant(slot) => {
                slot.insert(url);
                Ok(())
            }
            Entry::Occupied(slot) => Err(ArchiveError::MappingCollision {
                path: slot.key().clone(),
                existing: slot.get().clone(),
                attempted: url,
            }),
        }
    }

    /// Drops a claimed key whose content never made it to disk
    pub fn release(&mut self, path: &str) -> Option<String> {
        self.entries.remove(path)
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Pretty-printed JSON object, keys sorted
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.entries)
    }
}

/// Session sink for mappings, the visited log and repository references
#[derive(Debug, Default)]
pub struct Recorder {
    mappings: MappingTable,
    visited: Vec<String>,
    repositories: BTreeSet<String>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `path` for `url`
    ///
    /// Must be called before anything is written under `path`, so that a
    /// collision aborts while the first writer's content is still intact.
    pub fn record_mapping(&mut self, path: String, url: String) -> Result<(), ArchiveError> {
        tracing::trace!("Mapping {} -> {}", path, url);
        self.mappings.insert(path, url)
    }

    /// Gives back a claim whose download failed
    pub fn release_mapping(&mut self, path: &str) {
        if let Some(url) = self.mappings.release(path) {
            tracing::trace!("Released {} ({})", path, url);
        }
    }

    pub fn record_visited(&mut self, url: &str) {
        self.visited.push(url.to_string());
    }

    /// Adds a repository reference; returns false if it was already known
    pub fn record_repository(&mut self, root: String) -> bool {
        self.repositories.insert(root)
    }

    pub fn mappings(&self) -> &MappingTable {
        &self.mappings
    }

    pub fn visited(&self) -> &[String] {
        &self.visited
    }

    pub fn repositories(&self) -> &BTreeSet<String> {
        &self.repositories
    }

    /// Writes the three run artifacts
    ///
    /// * visited log - newline-delimited canonical URLs
    /// * mappings - JSON object of archive path -> URL
    /// * repositories - newline-delimited repository roots
    pub fn flush(&self, output: &OutputConfig) -> Result<(), ArchiveError> {
        write_artifact(Path::new(&output.visited_path), &self.visited.join("\n"))?;
        write_artifact(Path::new(&output.mappings_path), &self.mappings.to_json()?)?;

        let repos: Vec<&str> = self.repositories.iter().map(String::as_str).collect();
        write_artifact(Path::new(&output.repos_path), &repos.join("\n"))?;

        tracing::info!(
            "Wrote {} visited URLs, {} mappings, {} repositories",
            self.visited.len(),
            self.mappings.len(),
            self.repositories.len()
        );
        Ok(())
    }
}

fn write_artifact(path: &Path, content: &str) -> Result<(), ArchiveError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}
