use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::selection::SelectionField;

/// Who a clothing entry is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GarmentGender {
    Male,
    Female,
    Unisex,
    Child,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawOptionEntry {
    #[serde(default)]
    pub value: String,
    pub label: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub gender: Option<GarmentGender>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CatalogsFile {
    #[serde(default)]
    pub presets: Vec<RawOptionEntry>,
    #[serde(default)]
    pub photo_subject: Vec<RawOptionEntry>,
    #[serde(default)]
    pub age_group: Vec<RawOptionEntry>,
    #[serde(default)]
    pub gender: Vec<RawOptionEntry>,
    #[serde(default)]
    pub facial_expressions: Vec<RawOptionEntry>,
    #[serde(default)]
    pub hair_styles: Vec<RawOptionEntry>,
    #[serde(default)]
    pub makeup: Vec<RawOptionEntry>,
    #[serde(default)]
    pub accessories: Vec<RawOptionEntry>,
    #[serde(default)]
    pub framing: Vec<RawOptionEntry>,
    #[serde(default)]
    pub clothing: Vec<RawOptionEntry>,
    #[serde(default)]
    pub backgrounds: Vec<RawOptionEntry>,
    #[serde(default)]
    pub props_objects: Vec<RawOptionEntry>,
    #[serde(default)]
    pub lighting: Vec<RawOptionEntry>,
    #[serde(default)]
    pub cameras: Vec<RawOptionEntry>,
    #[serde(default)]
    pub styles: Vec<RawOptionEntry>,
}

impl CatalogsFile {
    pub fn into_field_lists(self) -> Vec<(SelectionField, Vec<RawOptionEntry>)> {
        vec![
            (SelectionField::Preset, self.presets),
            (SelectionField::PhotoSubject, self.photo_subject),
            (SelectionField::AgeGroup, self.age_group),
            (SelectionField::Gender, self.gender),
            (SelectionField::FacialExpression, self.facial_expressions),
            (SelectionField::HairStyle, self.hair_styles),
            (SelectionField::Makeup, self.makeup),
            (SelectionField::Accessory, self.accessories),
            (SelectionField::Framing, self.framing),
            (SelectionField::Clothing, self.clothing),
            (SelectionField::Background, self.backgrounds),
            (SelectionField::PropObject, self.props_objects),
            (SelectionField::Lighting, self.lighting),
            (SelectionField::Camera, self.cameras),
            (SelectionField::Style, self.styles),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionEntry {
    pub value: String,
    pub label: String,
    pub tags: Vec<String>,
    pub gender: Option<GarmentGender>,
}

impl OptionEntry {
    pub fn garment_gender(&self) -> GarmentGender {
        self.gender.unwrap_or(GarmentGender::Unisex)
    }

    pub fn shares_tag_with(&self, other: &OptionEntry) -> bool {
        self.tags.iter().any(|tag| other.tags.contains(tag))
    }
}

/// Read-only option lists, one per catalogued selection field.
#[derive(Debug, Clone, Default)]
pub struct Catalogs {
    entries: HashMap<SelectionField, Vec<OptionEntry>>,
}

impl Catalogs {
    pub fn new(entries: HashMap<SelectionField, Vec<OptionEntry>>) -> Self {
        Catalogs { entries }
    }

    pub fn options(&self, field: SelectionField) -> &[OptionEntry] {
        self.entries
            .get(&field)
            .map(|entries| entries.as_slice())
            .unwrap_or(&[])
    }

    /// The position-0 value, or an empty string when the field has no catalog.
    pub fn default_value(&self, field: SelectionField) -> &str {
        self.options(field)
            .first()
            .map(|entry| entry.value.as_str())
            .unwrap_or("")
    }

    pub fn find(&self, field: SelectionField, value: &str) -> Option<&OptionEntry> {
        self.options(field).iter().find(|entry| entry.value == value)
    }

    pub fn contains(&self, field: SelectionField, value: &str) -> bool {
        self.find(field, value).is_some()
    }

    pub fn label_for(&self, field: SelectionField, value: &str) -> Option<&str> {
        self.find(field, value).map(|entry| entry.label.as_str())
    }

    pub fn option_count(&self) -> usize {
        self.entries.values().map(|entries| entries.len()).sum()
    }
}

/// Availability of the option catalogs. Everything that needs catalog data
/// checks this first instead of probing for empty lists.
#[derive(Debug, Clone, Default)]
pub enum CatalogState {
    #[default]
    NotLoaded,
    Loaded(Arc<Catalogs>),
    Failed(String),
}

impl CatalogState {
    pub fn ready(&self) -> Option<Arc<Catalogs>> {
        match self {
            CatalogState::Loaded(catalogs) => Some(Arc::clone(catalogs)),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            CatalogState::NotLoaded => "loading".to_string(),
            CatalogState::Loaded(catalogs) => {
                format!("loaded ({} options)", catalogs.option_count())
            }
            CatalogState::Failed(reason) => format!("failed: {reason}"),
        }
    }
}
