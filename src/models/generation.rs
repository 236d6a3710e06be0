use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use super::image::ImageData;
use crate::error::{Result, StudioError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StyleOption {
    #[default]
    Photorealistic,
    Anime,
    Vintage,
    Cyberpunk,
    Fantasy,
}

impl StyleOption {
    pub const ALL: [StyleOption; 5] = [
        StyleOption::Photorealistic,
        StyleOption::Anime,
        StyleOption::Vintage,
        StyleOption::Cyberpunk,
        StyleOption::Fantasy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StyleOption::Photorealistic => "Photorealistic",
            StyleOption::Anime => "Anime",
            StyleOption::Vintage => "Vintage",
            StyleOption::Cyberpunk => "Cyberpunk",
            StyleOption::Fantasy => "Fantasy",
        }
    }
}

impl fmt::Display for StyleOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StyleOption {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self> {
        StyleOption::ALL
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StudioError::InvalidRequest(format!("Unknown style: {}", s)))
    }
}

/// One logical generation request. Cloning is cheap; the image is shared.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub style: StyleOption,
    pub image: Arc<ImageData>,
}

impl GenerationRequest {
    /// Builds a request after applying the studio's input checks: a non-blank
    /// prompt and an acceptable reference image.
    pub fn new(prompt: impl Into<String>, style: StyleOption, image: ImageData) -> Result<Self> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(StudioError::InvalidRequest(
                "Please provide an image and a prompt.".into(),
            ));
        }
        image.validate()?;

        Ok(Self {
            prompt,
            style,
            image: Arc::new(image),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Generation {
    pub id: String,
    pub image_url: String,
    pub prompt: String,
    pub style: StyleOption,
    pub created_at: DateTime<Utc>,
}

impl Generation {
    pub fn new(image_url: impl Into<String>, prompt: impl Into<String>, style: StyleOption) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            image_url: image_url.into(),
            prompt: prompt.into(),
            style,
            created_at: Utc::now(),
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png() -> ImageData {
        ImageData::new("ref.png", "image/png", vec![0x89, 0x50, 0x4e, 0x47])
    }

    #[test]
    fn test_style_parsing_is_case_insensitive() {
        assert_eq!("vintage".parse::<StyleOption>().unwrap(), StyleOption::Vintage);
        assert_eq!(" CYBERPUNK ".parse::<StyleOption>().unwrap(), StyleOption::Cyberpunk);
        assert!("Watercolor".parse::<StyleOption>().is_err());
    }

    #[test]
    fn test_request_requires_prompt() {
        assert!(GenerationRequest::new("   ", StyleOption::Anime, png()).is_err());
        let request = GenerationRequest::new("red scarf", StyleOption::Vintage, png()).unwrap();
        assert_eq!(request.prompt, "red scarf");
        assert_eq!(request.style, StyleOption::Vintage);
    }

    #[test]
    fn test_generation_serializes_camel_case() {
        let generation = Generation::new("https://picsum.photos/seed/1/512", "elf", StyleOption::Fantasy);
        let value = serde_json::to_value(&generation).unwrap();
        assert_eq!(value["imageUrl"], "https://picsum.photos/seed/1/512");
        assert_eq!(value["style"], "Fantasy");
        assert!(value.get("createdAt").is_some());
    }
}
