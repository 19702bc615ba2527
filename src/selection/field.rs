/// One prompt-building category of a selection record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionField {
    Preset,
    CustomPrompt,
    EnhancementIntensity,
    PhotoSubject,
    AgeGroup,
    Gender,
    FacialExpression,
    HairStyle,
    Makeup,
    Accessory,
    Framing,
    Clothing,
    Background,
    PropObject,
    Lighting,
    Camera,
    Style,
}

impl SelectionField {
    /// Every field, in settings-token order.
    pub const ALL: [SelectionField; 17] = [
        SelectionField::Preset,
        SelectionField::CustomPrompt,
        SelectionField::EnhancementIntensity,
        SelectionField::PhotoSubject,
        SelectionField::AgeGroup,
        SelectionField::Gender,
        SelectionField::FacialExpression,
        SelectionField::HairStyle,
        SelectionField::Makeup,
        SelectionField::Accessory,
        SelectionField::Framing,
        SelectionField::Clothing,
        SelectionField::Background,
        SelectionField::PropObject,
        SelectionField::Lighting,
        SelectionField::Camera,
        SelectionField::Style,
    ];

    pub fn key(self) -> &'static str {
        match self {
            SelectionField::Preset => "preset",
            SelectionField::CustomPrompt => "customPrompt",
            SelectionField::EnhancementIntensity => "enhancementIntensity",
            SelectionField::PhotoSubject => "photoSubject",
            SelectionField::AgeGroup => "ageGroup",
            SelectionField::Gender => "gender",
            SelectionField::FacialExpression => "facialExpression",
            SelectionField::HairStyle => "hairStyle",
            SelectionField::Makeup => "makeup",
            SelectionField::Accessory => "accessory",
            SelectionField::Framing => "framing",
            SelectionField::Clothing => "clothing",
            SelectionField::Background => "background",
            SelectionField::PropObject => "propObject",
            SelectionField::Lighting => "lighting",
            SelectionField::Camera => "camera",
            SelectionField::Style => "style",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }

    pub fn label(self) -> &'static str {
        match self {
            SelectionField::Preset => "Preset",
            SelectionField::CustomPrompt => "Custom edits",
            SelectionField::EnhancementIntensity => "Intensity",
            SelectionField::PhotoSubject => "Subject",
            SelectionField::AgeGroup => "Age group",
            SelectionField::Gender => "Gender",
            SelectionField::FacialExpression => "Expression",
            SelectionField::HairStyle => "Hair style",
            SelectionField::Makeup => "Makeup",
            SelectionField::Accessory => "Accessory",
            SelectionField::Framing => "Framing",
            SelectionField::Clothing => "Clothing",
            SelectionField::Background => "Background",
            SelectionField::PropObject => "Prop",
            SelectionField::Lighting => "Lighting",
            SelectionField::Camera => "Camera",
            SelectionField::Style => "Style",
        }
    }

    /// Whether values of this field come from an option catalog.
    pub fn is_catalogued(self) -> bool {
        !matches!(
            self,
            SelectionField::CustomPrompt | SelectionField::EnhancementIntensity
        )
    }

    pub fn catalogued() -> impl Iterator<Item = SelectionField> {
        Self::ALL.into_iter().filter(|field| field.is_catalogued())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip_through_lookup() {
        for field in SelectionField::ALL {
            assert_eq!(SelectionField::from_key(field.key()), Some(field));
        }
        assert_eq!(SelectionField::from_key("unknown"), None);
    }

    #[test]
    fn free_form_fields_are_not_catalogued() {
        assert!(!SelectionField::CustomPrompt.is_catalogued());
        assert!(!SelectionField::EnhancementIntensity.is_catalogued());
        assert_eq!(SelectionField::catalogued().count(), 15);
    }
}
