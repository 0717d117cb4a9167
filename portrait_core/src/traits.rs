//! Collaborator traits consumed by the generation core.

use crate::types::{ProfileIdentity, ProfileRecord, default_image_filename};

/// Supplies generation identities from the CRUD layer's records.
pub trait ProfileSource: Send + Sync {
    type Record;

    fn identity_of(&self, record: &Self::Record) -> ProfileIdentity;
}

/// Default projection of a `ProfileRecord` onto a `ProfileIdentity`.
///
/// Blank optional strings are normalised to `None` so prompt construction
/// never sees an empty attribute.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordProjection;

impl ProfileSource for RecordProjection {
    type Record = ProfileRecord;

    fn identity_of(&self, record: &ProfileRecord) -> ProfileIdentity {
        ProfileIdentity {
            id: record.id.clone(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            age: record.age,
            ethnicity: non_blank(record.ethnicity.as_deref()),
            gender: record.gender,
            bio: non_blank(record.bio.as_deref()),
            personality_type: non_blank(record.personality_type.as_deref()),
            image_filename: non_blank(record.image_filename.as_deref())
                .unwrap_or_else(|| default_image_filename(&record.id))
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Gender;

    fn record() -> ProfileRecord {
        ProfileRecord {
            id: "p7".to_string(),
            first_name: "Ken".to_string(),
            last_name: "Sato".to_string(),
            email: Some("ken@example.com".to_string()),
            age: Some(41),
            ethnicity: Some("Japanese".to_string()),
            gender: Some(Gender::Male),
            bio: Some("   ".to_string()),
            personality_type: Some(" INTJ ".to_string()),
            image_filename: None,
            created_at: None,
            updated_at: None
        }
    }

    #[test]
    fn test_projection_copies_generation_fields() {
        let identity = RecordProjection.identity_of(&record());

        assert_eq!(identity.id, "p7");
        assert_eq!(identity.age, Some(41));
        assert_eq!(identity.ethnicity.as_deref(), Some("Japanese"));
        assert_eq!(identity.gender, Some(Gender::Male));
        assert_eq!(identity.personality_type.as_deref(), Some("INTJ"));
    }

    #[test]
    fn test_projection_normalises_blank_bio_and_filename() {
        let identity = RecordProjection.identity_of(&record());
        assert!(identity.bio.is_none());
        assert_eq!(identity.image_filename, "p7.jpg");

        let mut explicit = record();
        explicit.image_filename = Some("ken-portrait.jpg".to_string());
        assert_eq!(
            RecordProjection.identity_of(&explicit).image_filename,
            "ken-portrait.jpg"
        );
    }
}
