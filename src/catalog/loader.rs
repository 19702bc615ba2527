use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::{debug, error, info, warn};

use crate::catalog::types::{CatalogState, Catalogs, CatalogsFile, OptionEntry, RawOptionEntry};
use crate::selection::SelectionField;
use crate::state::AppState;

fn normalize_entries(field: SelectionField, raw_entries: Vec<RawOptionEntry>) -> Vec<OptionEntry> {
    let mut seen_values = HashSet::new();
    let mut entries = Vec::with_capacity(raw_entries.len());

    for raw in raw_entries {
        let label = raw.label.trim().to_string();
        if label.is_empty() {
            warn!("Skipping {} option with empty label", field.key());
            continue;
        }
        let value = raw.value.trim().to_string();
        if !seen_values.insert(value.clone()) {
            debug!("Skipping duplicate {} option '{}'", field.key(), value);
            continue;
        }
        let tags = raw
            .tags
            .into_iter()
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
            .collect::<Vec<_>>();
        entries.push(OptionEntry {
            value,
            label,
            tags,
            gender: raw.gender,
        });
    }

    entries
}

pub fn parse_catalogs(raw: &str) -> Result<Catalogs> {
    let file: CatalogsFile = serde_yaml::from_str(raw)
        .map_err(|err| anyhow!("Failed to parse option catalogs: {}", err))?;

    let mut entries = HashMap::new();
    for (field, raw_entries) in file.into_field_lists() {
        let normalized = normalize_entries(field, raw_entries);
        if normalized.is_empty() {
            warn!("Option catalog '{}' is empty", field.key());
        }
        entries.insert(field, normalized);
    }

    Ok(Catalogs::new(entries))
}

pub async fn load_catalogs_from_path(path: &Path) -> Result<Catalogs> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|err| {
        anyhow!(
            "Failed to read option catalogs at '{}': {}",
            path.display(),
            err
        )
    })?;
    parse_catalogs(&raw)
}

/// Loads the catalogs on a background task and publishes the result into the
/// shared state. Until it finishes the state stays `NotLoaded`.
pub fn spawn_catalog_load(state: AppState, path: &Path) {
    let path = path.to_path_buf();
    tokio::spawn(async move {
        match load_catalogs_from_path(&path).await {
            Ok(catalogs) => {
                info!(
                    "Loaded {} option(s) from {}",
                    catalogs.option_count(),
                    path.display()
                );
                *state.catalogs.write() = CatalogState::Loaded(Arc::new(catalogs));
            }
            Err(err) => {
                error!("Option catalogs unavailable: {err}");
                *state.catalogs.write() = CatalogState::Failed(err.to_string());
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::GarmentGender;

    const SHIPPED_CATALOGS: &str = include_str!("../../data/catalogs.yaml");

    #[test]
    fn shipped_catalogs_parse_with_defaults_first() {
        let catalogs = parse_catalogs(SHIPPED_CATALOGS).expect("shipped catalogs parse");
        assert_eq!(catalogs.default_value(SelectionField::PhotoSubject), "single");
        assert_eq!(catalogs.default_value(SelectionField::Preset), "");
        assert_eq!(catalogs.default_value(SelectionField::Clothing), "");
        for field in SelectionField::catalogued() {
            assert!(
                !catalogs.options(field).is_empty(),
                "catalog {} should not be empty",
                field.key()
            );
        }
        assert!(catalogs.contains(SelectionField::Gender, "female"));
    }

    #[test]
    fn normalizes_tags_and_drops_unlabelled_or_duplicate_entries() {
        let raw = r#"
backgrounds:
  - { value: "", label: "Keep" }
  - { value: " a quiet beach ", label: "Beach", tags: [" Outdoor ", "", "BEACH"] }
  - { value: "a quiet beach", label: "Beach again" }
  - { value: "nowhere", label: "   " }
clothing:
  - { value: "a hoodie", label: "Hoodie" }
  - { value: "a gown", label: "Gown", gender: female }
"#;
        let catalogs = parse_catalogs(raw).expect("valid yaml");
        let backgrounds = catalogs.options(SelectionField::Background);
        assert_eq!(backgrounds.len(), 2);
        assert_eq!(backgrounds[1].value, "a quiet beach");
        assert_eq!(backgrounds[1].tags, vec!["outdoor", "beach"]);

        let clothing = catalogs.options(SelectionField::Clothing);
        assert_eq!(clothing[0].garment_gender(), GarmentGender::Unisex);
        assert_eq!(clothing[1].garment_gender(), GarmentGender::Female);

        assert!(catalogs.options(SelectionField::Lighting).is_empty());
        assert_eq!(catalogs.default_value(SelectionField::Lighting), "");
    }

    #[test]
    fn rejects_malformed_yaml() {
        assert!(parse_catalogs("presets: [ { value: 1").is_err());
    }
}
