use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use strum::{Display, EnumString};

pub const DEFAULT_IMAGE_EXTENSION: &str = "jpg";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Gender {
    Male,
    Female,
    NonBinary,
    Other
}

impl Gender {
    /// Neutral descriptive noun used in prompts.
    pub fn descriptor(self) -> &'static str {
        match self {
            Gender::Male => "man",
            Gender::Female => "woman",
            Gender::NonBinary | Gender::Other => "person"
        }
    }
}

/// Immutable subset of a profile used for image generation.
///
/// Owned by the caller. The generation core only borrows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileIdentity {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub ethnicity: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub personality_type: Option<String>,
    pub image_filename: String
}

impl ProfileIdentity {
    pub fn new(id: impl Into<String>, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            image_filename: default_image_filename(&id),
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            age: None,
            ethnicity: None,
            gender: None,
            bio: None,
            personality_type: None
        }
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_ethnicity(mut self, ethnicity: impl Into<String>) -> Self {
        self.ethnicity = Some(ethnicity.into());
        self
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = Some(bio.into());
        self
    }

    pub fn with_personality(mut self, personality_type: impl Into<String>) -> Self {
        self.personality_type = Some(personality_type.into());
        self
    }

    pub fn with_image_filename(mut self, filename: impl Into<String>) -> Self {
        self.image_filename = filename.into();
        self
    }

    /// First and last name joined, skipping empty parts.
    pub fn full_name(&self) -> String {
        [self.first_name.trim(), self.last_name.trim()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// True when the filename is a single, non-empty path component.
    pub fn has_usable_filename(&self) -> bool {
        let name = self.image_filename.trim();
        if name.is_empty() || name == "." || name == ".." {
            return false;
        }
        Path::new(name)
            .file_name()
            .is_some_and(|component| component == name)
    }
}

pub(crate) fn default_image_filename(id: &str) -> String {
    format!("{id}.{DEFAULT_IMAGE_EXTENSION}")
}

/// Profile as stored by the CRUD layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub ethnicity: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub personality_type: Option<String>,
    #[serde(default)]
    pub image_filename: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>
}
