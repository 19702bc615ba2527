use crate::catalog::Catalogs;
use crate::selection::field::SelectionField;

pub const DEFAULT_INTENSITY: u8 = 75;
pub const MAX_INTENSITY: u8 = 100;

const GROUP_SUBJECT_VALUE: &str = "group";
const SINGLE_SUBJECT_VALUE: &str = "single";

/// Whether the photo shows one person or several.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectMode {
    Single,
    Group,
}

/// The user's current choices across all prompt-building categories.
///
/// Empty strings mean "no selection". Values are never validated here; the
/// settings decoder and the option pickers are the places that consult the
/// catalogs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRecord {
    pub preset: String,
    pub custom_prompt: String,
    pub enhancement_intensity: u8,
    pub photo_subject: String,
    pub age_group: String,
    pub gender: String,
    pub facial_expression: String,
    pub hair_style: String,
    pub makeup: String,
    pub accessory: String,
    pub framing: String,
    pub clothing: String,
    pub background: String,
    pub prop_object: String,
    pub lighting: String,
    pub camera: String,
    pub style: String,
}

impl Default for SelectionRecord {
    fn default() -> Self {
        SelectionRecord {
            preset: String::new(),
            custom_prompt: String::new(),
            enhancement_intensity: DEFAULT_INTENSITY,
            photo_subject: SINGLE_SUBJECT_VALUE.to_string(),
            age_group: String::new(),
            gender: String::new(),
            facial_expression: String::new(),
            hair_style: String::new(),
            makeup: String::new(),
            accessory: String::new(),
            framing: String::new(),
            clothing: String::new(),
            background: String::new(),
            prop_object: String::new(),
            lighting: String::new(),
            camera: String::new(),
            style: String::new(),
        }
    }
}

impl SelectionRecord {
    /// A record holding every catalog's position-0 entry.
    pub fn from_catalog_defaults(catalogs: &Catalogs) -> Self {
        let mut record = SelectionRecord::default();
        for field in SelectionField::catalogued() {
            if let Some(slot) = record.text_slot_mut(field) {
                *slot = catalogs.default_value(field).to_string();
            }
        }
        record
    }

    pub fn value(&self, field: SelectionField) -> String {
        match field {
            SelectionField::EnhancementIntensity => self.enhancement_intensity.to_string(),
            other => self.text(other).unwrap_or_default().to_string(),
        }
    }

    pub fn text(&self, field: SelectionField) -> Option<&str> {
        let value = match field {
            SelectionField::Preset => &self.preset,
            SelectionField::CustomPrompt => &self.custom_prompt,
            SelectionField::EnhancementIntensity => return None,
            SelectionField::PhotoSubject => &self.photo_subject,
            SelectionField::AgeGroup => &self.age_group,
            SelectionField::Gender => &self.gender,
            SelectionField::FacialExpression => &self.facial_expression,
            SelectionField::HairStyle => &self.hair_style,
            SelectionField::Makeup => &self.makeup,
            SelectionField::Accessory => &self.accessory,
            SelectionField::Framing => &self.framing,
            SelectionField::Clothing => &self.clothing,
            SelectionField::Background => &self.background,
            SelectionField::PropObject => &self.prop_object,
            SelectionField::Lighting => &self.lighting,
            SelectionField::Camera => &self.camera,
            SelectionField::Style => &self.style,
        };
        Some(value.as_str())
    }

    fn text_slot_mut(&mut self, field: SelectionField) -> Option<&mut String> {
        let slot = match field {
            SelectionField::Preset => &mut self.preset,
            SelectionField::CustomPrompt => &mut self.custom_prompt,
            SelectionField::EnhancementIntensity => return None,
            SelectionField::PhotoSubject => &mut self.photo_subject,
            SelectionField::AgeGroup => &mut self.age_group,
            SelectionField::Gender => &mut self.gender,
            SelectionField::FacialExpression => &mut self.facial_expression,
            SelectionField::HairStyle => &mut self.hair_style,
            SelectionField::Makeup => &mut self.makeup,
            SelectionField::Accessory => &mut self.accessory,
            SelectionField::Framing => &mut self.framing,
            SelectionField::Clothing => &mut self.clothing,
            SelectionField::Background => &mut self.background,
            SelectionField::PropObject => &mut self.prop_object,
            SelectionField::Lighting => &mut self.lighting,
            SelectionField::Camera => &mut self.camera,
            SelectionField::Style => &mut self.style,
        };
        Some(slot)
    }

    /// Returns a copy of the record with one field replaced.
    ///
    /// Intensity values go through [`parse_intensity`], so any string is
    /// accepted for every field.
    pub fn with_field(&self, field: SelectionField, value: &str) -> Self {
        let mut next = self.clone();
        match next.text_slot_mut(field) {
            Some(slot) => *slot = value.to_string(),
            None => next.enhancement_intensity = parse_intensity(value),
        }
        next
    }

    pub fn with_intensity(&self, intensity: u8) -> Self {
        let mut next = self.clone();
        next.enhancement_intensity = intensity.min(MAX_INTENSITY);
        next
    }

    pub fn subject_mode(&self) -> SubjectMode {
        if self.photo_subject == GROUP_SUBJECT_VALUE {
            SubjectMode::Group
        } else {
            SubjectMode::Single
        }
    }
}

/// Parses an intensity the way a lenient integer parser would: leading
/// whitespace and sign, then the leading run of digits. Out-of-range values
/// clamp to `[0, 100]`; input without digits yields the default.
pub fn parse_intensity(raw: &str) -> u8 {
    let trimmed = raw.trim();
    let (negative, digits_part) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits: String = digits_part
        .chars()
        .take_while(|ch| ch.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return DEFAULT_INTENSITY;
    }
    if negative {
        return 0;
    }

    match digits.parse::<u64>() {
        Ok(value) => value.min(MAX_INTENSITY as u64) as u8,
        Err(_) => MAX_INTENSITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_single_subject_and_75_percent() {
        let record = SelectionRecord::default();
        assert_eq!(record.enhancement_intensity, 75);
        assert_eq!(record.subject_mode(), SubjectMode::Single);
        assert!(record.custom_prompt.is_empty());
    }

    #[test]
    fn with_field_leaves_original_untouched() {
        let record = SelectionRecord::default();
        let next = record.with_field(SelectionField::Lighting, "neon nightlife glow");
        assert_eq!(record.lighting, "");
        assert_eq!(next.lighting, "neon nightlife glow");
        assert_eq!(next.value(SelectionField::Lighting), "neon nightlife glow");
    }

    #[test]
    fn intensity_field_is_parsed_and_clamped() {
        let record = SelectionRecord::default();
        assert_eq!(
            record
                .with_field(SelectionField::EnhancementIntensity, "60")
                .enhancement_intensity,
            60
        );
        assert_eq!(record.with_intensity(240).enhancement_intensity, 100);
        assert_eq!(
            record.with_field(SelectionField::EnhancementIntensity, "42").value(
                SelectionField::EnhancementIntensity
            ),
            "42"
        );
    }

    #[test]
    fn intensity_parser_clamps_and_defaults() {
        assert_eq!(parse_intensity("-5"), 0);
        assert_eq!(parse_intensity("150"), 100);
        assert_eq!(parse_intensity("abc"), 75);
        assert_eq!(parse_intensity(""), 75);
        assert_eq!(parse_intensity(" 60 "), 60);
        assert_eq!(parse_intensity("60.9"), 60);
        assert_eq!(parse_intensity("+30"), 30);
        assert_eq!(parse_intensity("99999999999999999999999"), 100);
    }

    #[test]
    fn group_value_switches_subject_mode() {
        let record = SelectionRecord::default().with_field(SelectionField::PhotoSubject, "group");
        assert_eq!(record.subject_mode(), SubjectMode::Group);
    }
}
