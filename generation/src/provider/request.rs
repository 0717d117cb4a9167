use config::{ProviderConfig, parse_image_size};
use errors::{PortraitError, PortraitResult};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32
}

impl ImageSize {
    pub const SQUARE_1024: ImageSize = ImageSize {
        width: 1024,
        height: 1024
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn from_config(config: &ProviderConfig) -> PortraitResult<Self> {
        config
            .dimensions()
            .map(|(width, height)| Self::new(width, height))
            .ok_or_else(|| invalid_size(&config.image_size))
    }
}

impl Default for ImageSize {
    fn default() -> Self {
        Self::SQUARE_1024
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for ImageSize {
    type Err = PortraitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_image_size(s)
            .map(|(width, height)| Self::new(width, height))
            .ok_or_else(|| invalid_size(s))
    }
}

fn invalid_size(value: &str) -> PortraitError {
    PortraitError::configuration(format!("Invalid image size '{value}', expected WIDTHxHEIGHT"))
}

/// One images API call. Built fresh for every attempt and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: String,
    pub size: ImageSize
}

impl GenerationRequest {
    /// Images requested per call.
    pub const IMAGE_COUNT: u8 = 1;

    /// The only response format the clients decode.
    pub const RESPONSE_FORMAT: &'static str = "b64_json";

    pub fn new(prompt: impl Into<String>, model: impl Into<String>, size: ImageSize) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            size
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_size_parsing() {
        assert_eq!("1024x1536".parse::<ImageSize>().unwrap(), ImageSize::new(1024, 1536));
        assert_eq!(" 512X512 ".parse::<ImageSize>().unwrap().to_string(), "512x512");
        assert!("1024".parse::<ImageSize>().is_err());
        assert!("0x1024".parse::<ImageSize>().is_err());
        assert!("axb".parse::<ImageSize>().is_err());
    }

    #[test]
    fn test_image_size_from_default_config() {
        let size = ImageSize::from_config(&ProviderConfig::default()).unwrap();
        assert_eq!(size, ImageSize::SQUARE_1024);
    }

    #[test]
    fn test_image_size_from_invalid_config() {
        let config = ProviderConfig {
            image_size: "huge".to_string(),
            ..ProviderConfig::default()
        };
        let err = ImageSize::from_config(&config).unwrap_err();
        assert!(matches!(err, PortraitError::Configuration { ref message } if message.contains("huge")));
    }
}
