//! Compatibility rules between selections.
//!
//! Clothing follows age group and gender; props follow the tags of the chosen
//! background. The position-0 entry of a catalog is always available.

use crate::catalog::types::{Catalogs, GarmentGender, OptionEntry};
use crate::selection::{SelectionField, SelectionRecord};

const CHILD_AGE_GROUP: &str = "child";
const MALE_GENDER: &str = "male";
const FEMALE_GENDER: &str = "female";

fn clothing_allowed(entry: &OptionEntry, record: &SelectionRecord) -> bool {
    let garment = entry.garment_gender();
    if record.age_group == CHILD_AGE_GROUP {
        return matches!(garment, GarmentGender::Child | GarmentGender::Unisex);
    }
    match record.gender.as_str() {
        MALE_GENDER => matches!(garment, GarmentGender::Male | GarmentGender::Unisex),
        FEMALE_GENDER => matches!(garment, GarmentGender::Female | GarmentGender::Unisex),
        _ => garment != GarmentGender::Child,
    }
}

fn prop_allowed(entry: &OptionEntry, background: Option<&OptionEntry>) -> bool {
    let Some(background) = background else {
        return true;
    };
    if background.tags.is_empty() || entry.tags.is_empty() {
        return true;
    }
    entry.shares_tag_with(background)
}

/// Options of `field` that fit the rest of `record`, paired with their index
/// in the full catalog.
pub fn available_options<'a>(
    catalogs: &'a Catalogs,
    record: &SelectionRecord,
    field: SelectionField,
) -> Vec<(usize, &'a OptionEntry)> {
    let options = catalogs.options(field);
    let background = catalogs.find(SelectionField::Background, &record.background);

    options
        .iter()
        .enumerate()
        .filter(|(index, entry)| {
            if *index == 0 {
                return true;
            }
            match field {
                SelectionField::Clothing => clothing_allowed(entry, record),
                SelectionField::PropObject => prop_allowed(entry, background),
                _ => true,
            }
        })
        .collect()
}

pub fn is_available(
    catalogs: &Catalogs,
    record: &SelectionRecord,
    field: SelectionField,
    value: &str,
) -> bool {
    available_options(catalogs, record, field)
        .iter()
        .any(|(_, entry)| entry.value == value)
}

/// Resets clothing and prop selections that no longer fit after another
/// field changed. Values missing from the catalog are left alone.
pub fn reconcile(catalogs: &Catalogs, record: SelectionRecord) -> SelectionRecord {
    let mut record = record;
    for field in [SelectionField::Clothing, SelectionField::PropObject] {
        let current = record.value(field);
        if catalogs.contains(field, &current) && !is_available(catalogs, &record, field, &current)
        {
            record = record.with_field(field, catalogs.default_value(field));
        }
    }
    record
}

/// Applies one selection change and keeps dependent fields consistent.
pub fn apply_selection(
    catalogs: &Catalogs,
    record: &SelectionRecord,
    field: SelectionField,
    value: &str,
) -> SelectionRecord {
    reconcile(catalogs, record.with_field(field, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::loader::parse_catalogs;

    fn sample_catalogs() -> Catalogs {
        parse_catalogs(
            r#"
clothing:
  - { value: "", label: "Keep", gender: unisex }
  - { value: "a suit", label: "Suit", gender: male }
  - { value: "a gown", label: "Gown", gender: female }
  - { value: "a turtleneck", label: "Turtleneck" }
  - { value: "a school uniform", label: "Uniform", gender: child }
backgrounds:
  - { value: "", label: "Keep" }
  - { value: "a beach", label: "Beach", tags: [beach, outdoor] }
  - { value: "a studio", label: "Studio", tags: [studio] }
  - { value: "a void", label: "Void" }
propsObjects:
  - { value: "", label: "None" }
  - { value: "a surfboard", label: "Surfboard", tags: [beach] }
  - { value: "an armchair", label: "Armchair", tags: [studio] }
  - { value: "flowers", label: "Flowers" }
"#,
        )
        .expect("sample catalogs parse")
    }

    fn values(options: Vec<(usize, &OptionEntry)>) -> Vec<String> {
        options
            .into_iter()
            .map(|(_, entry)| entry.value.clone())
            .collect()
    }

    #[test]
    fn clothing_follows_gender_for_adults() {
        let catalogs = sample_catalogs();
        let record = SelectionRecord::default().with_field(SelectionField::Gender, "female");
        assert_eq!(
            values(available_options(&catalogs, &record, SelectionField::Clothing)),
            vec!["", "a gown", "a turtleneck"]
        );

        let unset = SelectionRecord::default();
        assert_eq!(
            values(available_options(&catalogs, &unset, SelectionField::Clothing)),
            vec!["", "a suit", "a gown", "a turtleneck"]
        );
    }

    #[test]
    fn children_only_see_child_and_unisex_clothing() {
        let catalogs = sample_catalogs();
        let record = SelectionRecord::default()
            .with_field(SelectionField::AgeGroup, "child")
            .with_field(SelectionField::Gender, "male");
        let options = available_options(&catalogs, &record, SelectionField::Clothing);
        assert_eq!(values(options.clone()), vec!["", "a turtleneck", "a school uniform"]);
        assert_eq!(options[2].0, 4);
    }

    #[test]
    fn props_follow_background_tags() {
        let catalogs = sample_catalogs();
        let beach = SelectionRecord::default().with_field(SelectionField::Background, "a beach");
        assert_eq!(
            values(available_options(&catalogs, &beach, SelectionField::PropObject)),
            vec!["", "a surfboard", "flowers"]
        );

        let untagged = SelectionRecord::default().with_field(SelectionField::Background, "a void");
        assert_eq!(
            available_options(&catalogs, &untagged, SelectionField::PropObject).len(),
            4
        );
    }

    #[test]
    fn changing_gender_resets_incompatible_clothing() {
        let catalogs = sample_catalogs();
        let record = SelectionRecord::default()
            .with_field(SelectionField::Clothing, "a suit")
            .with_field(SelectionField::PropObject, "an armchair");
        let next = apply_selection(&catalogs, &record, SelectionField::Gender, "female");
        assert_eq!(next.clothing, "");
        assert_eq!(next.prop_object, "an armchair");

        let moved = apply_selection(&catalogs, &next, SelectionField::Background, "a beach");
        assert_eq!(moved.prop_object, "");
    }

    #[test]
    fn compatible_selections_survive_reconcile() {
        let catalogs = sample_catalogs();
        let record = SelectionRecord::default().with_field(SelectionField::Clothing, "a turtleneck");
        let next = apply_selection(&catalogs, &record, SelectionField::AgeGroup, "child");
        assert_eq!(next.clothing, "a turtleneck");
    }
}
