use tracing::debug;

use crate::selection::{SelectionRecord, SubjectMode};

const SINGLE_SUBJECT_BASE: &str = "Enhance this portrait photo while preserving the person's identity and facial features accurately at all times.";
const GROUP_SUBJECT_BASE: &str = "Enhance this group photo while preserving the distinct identity and facial features of each person in it accurately at all times.";

fn base_sentence(mode: SubjectMode) -> &'static str {
    match mode {
        SubjectMode::Single => SINGLE_SUBJECT_BASE,
        SubjectMode::Group => GROUP_SUBJECT_BASE,
    }
}

fn subject_sentence(age_group: &str, gender: &str) -> Option<String> {
    let description = match (age_group, gender) {
        ("child", "male") => "a young boy",
        ("child", "female") => "a young girl",
        ("child", _) => "a child",
        ("adult", "male") => "an adult man",
        ("adult", "female") => "an adult woman",
        ("adult", _) => "an adult",
        (_, "male") => "a man",
        (_, "female") => "a woman",
        _ => return None,
    };
    Some(format!("Subject is {description}."))
}

fn push_segment(segments: &mut Vec<String>, value: &str, render: impl Fn(&str) -> String) {
    if !value.is_empty() {
        segments.push(render(value));
    }
}

/// Builds the ordered prompt segments. Empty fields contribute nothing, and
/// the order never depends on which fields are populated.
pub fn compose_segments(record: &SelectionRecord, mode: SubjectMode) -> Vec<String> {
    let mut segments = vec![
        base_sentence(mode).to_string(),
        format!(
            "Apply enhancements with an intensity level of {}%.",
            record.enhancement_intensity
        ),
    ];

    push_segment(&mut segments, &record.preset, |value| value.to_string());
    if mode == SubjectMode::Single {
        if let Some(sentence) = subject_sentence(&record.age_group, &record.gender) {
            segments.push(sentence);
        }
    }
    push_segment(&mut segments, &record.framing, |value| format!("Frame the shot as a {value}."));
    push_segment(&mut segments, &record.facial_expression, |value| {
        format!("The facial expression should be {value}.")
    });
    push_segment(&mut segments, &record.clothing, |value| format!("Dress the subject in {value}."));
    push_segment(&mut segments, &record.accessory, |value| format!("Add {value}."));
    push_segment(&mut segments, &record.hair_style, |value| format!("Style the hair as {value}."));
    push_segment(&mut segments, &record.makeup, |value| format!("Apply {value}."));
    push_segment(&mut segments, &record.background, |value| {
        format!("Replace the background with {value}.")
    });
    push_segment(&mut segments, &record.prop_object, |value| format!("Include {value} in the scene."));
    push_segment(&mut segments, &record.lighting, |value| format!("Light the scene with {value}."));
    push_segment(&mut segments, &record.camera, |value| format!("Render the photo as if {value}."));
    push_segment(&mut segments, &record.style, |value| format!("Style notes: {value}."));

    let custom = record.custom_prompt.trim();
    if !custom.is_empty() {
        segments.push(format!(
            "Additional specific details and modifications: \"{custom}\"."
        ));
    }

    segments
}

pub fn compose_prompt(record: &SelectionRecord, mode: SubjectMode) -> String {
    let prompt = compose_segments(record, mode).join(" ");
    debug!(target: "prompt.composer", chars = prompt.len(), prompt = %prompt);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::SelectionField;

    fn populated_record() -> SelectionRecord {
        SelectionRecord::default()
            .with_field(SelectionField::Preset, "Classic studio portrait.")
            .with_field(SelectionField::AgeGroup, "adult")
            .with_field(SelectionField::Gender, "male")
            .with_field(SelectionField::Framing, "half body shot")
            .with_field(SelectionField::FacialExpression, "a warm, natural smile")
            .with_field(SelectionField::Clothing, "a navy suit")
            .with_field(SelectionField::Accessory, "a wristwatch")
            .with_field(SelectionField::HairStyle, "neatly combed back")
            .with_field(SelectionField::Makeup, "natural, minimal makeup")
            .with_field(SelectionField::Background, "a white studio backdrop")
            .with_field(SelectionField::PropObject, "a velvet armchair")
            .with_field(SelectionField::Lighting, "soft window light")
            .with_field(SelectionField::Camera, "shot on an 85mm lens")
            .with_field(SelectionField::Style, "editorial")
            .with_field(SelectionField::CustomPrompt, "remove the scratch")
    }

    #[test]
    fn empty_selection_yields_base_and_intensity_only() {
        let segments = compose_segments(&SelectionRecord::default(), SubjectMode::Single);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], SINGLE_SUBJECT_BASE);
        assert_eq!(
            segments[1],
            "Apply enhancements with an intensity level of 75%."
        );
    }

    #[test]
    fn composes_the_documented_example() {
        let record = SelectionRecord::default()
            .with_field(SelectionField::PhotoSubject, "single")
            .with_field(SelectionField::AgeGroup, "adult")
            .with_field(SelectionField::Gender, "female")
            .with_field(SelectionField::CustomPrompt, "add vintage filter")
            .with_intensity(60);

        let prompt = compose_prompt(&record, record.subject_mode());
        let expected = format!(
            "{} Apply enhancements with an intensity level of 60%. Subject is an adult woman. Additional specific details and modifications: \"add vintage filter\".",
            SINGLE_SUBJECT_BASE
        );
        assert_eq!(prompt, expected);
    }

    #[test]
    fn group_mode_uses_group_base_and_drops_subject_sentence() {
        let record = populated_record();
        let segments = compose_segments(&record, SubjectMode::Group);
        assert_eq!(segments[0], GROUP_SUBJECT_BASE);
        assert!(!segments.iter().any(|segment| segment.starts_with("Subject is")));
        assert_eq!(segments.len(), 15);
    }

    #[test]
    fn subject_sentence_covers_age_and_gender_branches() {
        assert_eq!(subject_sentence("child", "female").as_deref(), Some("Subject is a young girl."));
        assert_eq!(subject_sentence("child", "").as_deref(), Some("Subject is a child."));
        assert_eq!(subject_sentence("adult", "").as_deref(), Some("Subject is an adult."));
        assert_eq!(subject_sentence("", "male").as_deref(), Some("Subject is a man."));
        assert_eq!(subject_sentence("", ""), None);
    }

    #[test]
    fn removing_fields_never_reorders_remaining_segments() {
        let full = compose_segments(&populated_record(), SubjectMode::Single);
        assert_eq!(full.len(), 16);

        for field in SelectionField::ALL {
            if matches!(
                field,
                SelectionField::EnhancementIntensity
                    | SelectionField::PhotoSubject
                    | SelectionField::AgeGroup
                    | SelectionField::Gender
            ) {
                continue;
            }
            let reduced_record = populated_record().with_field(field, "");
            let reduced = compose_segments(&reduced_record, SubjectMode::Single);
            let mut cursor = full.iter();
            for segment in &reduced {
                assert!(
                    cursor.any(|candidate| candidate == segment),
                    "segment {segment:?} out of order after clearing {}",
                    field.key()
                );
            }
        }
    }

    #[test]
    fn custom_text_is_trimmed_and_blank_text_skipped() {
        let record = SelectionRecord::default().with_field(SelectionField::CustomPrompt, "   ");
        assert_eq!(compose_segments(&record, SubjectMode::Single).len(), 2);

        let record = SelectionRecord::default().with_field(SelectionField::CustomPrompt, "  sharpen  ");
        let segments = compose_segments(&record, SubjectMode::Single);
        assert_eq!(
            segments.last().map(String::as_str),
            Some("Additional specific details and modifications: \"sharpen\".")
        );
    }
}
