use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::filters::{parse_city, City};

/// Maps each supported city to the CSV file holding its trip records.
#[derive(Debug, Clone)]
pub struct Catalog {
    chicago: PathBuf,
    new_york_city: PathBuf,
    washington: PathBuf,
}

/// On-disk catalog override.
///
/// ```yaml
/// cities:
///   chicago: data/chicago.csv
///   new york city: data/new_york_city.csv
///   washington: data/washington.csv
/// ```
#[derive(Debug, Deserialize)]
struct CatalogFile {
    cities: BTreeMap<String, PathBuf>,
}

impl Catalog {
    /// Default layout: one conventionally named CSV per city inside `data_dir`.
    pub fn with_data_dir(data_dir: &Path) -> Self {
        Self {
            chicago: data_dir.join("chicago.csv"),
            new_york_city: data_dir.join("new_york_city.csv"),
            washington: data_dir.join("washington.csv"),
        }
    }

    /// Load a catalog override from a YAML file. Every city must be mapped;
    /// relative paths resolve against the file's directory.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog file {}", path.display()))?;
        let file: CatalogFile = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse catalog file {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));

        let mut sources: BTreeMap<City, PathBuf> = BTreeMap::new();
        for (name, source) in file.cities {
            let city = parse_city(&name)
                .map_err(|message| anyhow!("bad city '{}' in {}: {}", name, path.display(), message))?;
            let resolved = if source.is_absolute() {
                source
            } else {
                base.join(source)
            };
            sources.insert(city, resolved);
        }

        let mut take = |city: City| {
            sources
                .remove(&city)
                .ok_or_else(|| anyhow!("catalog file {} has no entry for '{}'", path.display(), city))
        };
        let catalog = Self {
            chicago: take(City::Chicago)?,
            new_york_city: take(City::NewYorkCity)?,
            washington: take(City::Washington)?,
        };
        info!("Loaded city catalog from {}", path.display());
        Ok(catalog)
    }

    /// Replace the source file for one city.
    pub fn with_source(mut self, city: City, path: impl Into<PathBuf>) -> Self {
        match city {
            City::Chicago => self.chicago = path.into(),
            City::NewYorkCity => self.new_york_city = path.into(),
            City::Washington => self.washington = path.into(),
        }
        self
    }

    pub fn path_for(&self, city: City) -> &Path {
        match city {
            City::Chicago => &self.chicago,
            City::NewYorkCity => &self.new_york_city,
            City::Washington => &self.washington,
        }
    }
}
