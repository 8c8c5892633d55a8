//! Compose file sanity checks

use crate::error::{KeelError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// The subset of a compose file Keel looks at
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComposeFile {
    #[serde(default)]
    pub services: BTreeMap<String, ServiceEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceEntry {
    #[serde(default)]
    pub profiles: Vec<String>,
}

impl ComposeFile {
    /// Parse compose file from path
    pub fn parse_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            KeelError::ComposeParse(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse_str(&content)
    }

    /// Parse compose file from string
    pub fn parse_str(content: &str) -> Result<Self> {
        let file: ComposeFile = serde_yaml::from_str(content)
            .map_err(|e| KeelError::ComposeParse(format!("Failed to parse YAML: {}", e)))?;
        if file.services.is_empty() {
            return Err(KeelError::ComposeParse("no services defined".to_string()));
        }
        Ok(file)
    }

    /// Whether bringing this file up under `profile` starts anything.
    ///
    /// Services without a `profiles` key always start, so a file that never
    /// mentions profiles accepts any profile name.
    pub fn supports_profile(&self, profile: &str) -> bool {
        let mut declares_profiles = false;
        for service in self.services.values() {
            if service.profiles.iter().any(|p| p == profile) {
                return true;
            }
            declares_profiles |= !service.profiles.is_empty();
        }
        !declares_profiles
    }

    /// Services started under `profile`
    pub fn services_for(&self, profile: Option<&str>) -> Vec<&str> {
        self.services
            .iter()
            .filter(|(_, s)| {
                s.profiles.is_empty() || profile.is_some_and(|p| s.profiles.iter().any(|sp| sp == p))
            })
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
