use crate::error::{Error, Result};
use std::path::PathBuf;

pub const DEFAULT_SYNCER: &str = "./image-syncer";
pub const DEFAULT_AUTH: &str = "./auth.yml";
pub const DEFAULT_IMAGES_FILE: &str = "./images.yml";
pub const DEFAULT_PROC: u32 = 10;
pub const DEFAULT_TARGETS_FILE: &str = "dockerhub-image.yml";
pub const DEFAULT_SOURCES_FILE: &str = "images-init.yml";

/// Everything the sync driver needs to know about where images go and how to run the syncer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub registry: String,
    pub namespace: String,
    pub syncer: PathBuf,
    pub auth: PathBuf,
    /// Job configuration, rewritten for every architecture group
    pub images_file: PathBuf,
    pub proc: u32,
    pub targets_file: PathBuf,
    pub sources_file: PathBuf,
}

impl Config {
    /// Build a config with the conventional file locations
    ///
    /// Fails when the registry or namespace is missing or blank.
    pub fn new(registry: Option<String>, namespace: Option<String>) -> Result<Self> {
        let (Some(registry), Some(namespace)) = (non_blank(registry), non_blank(namespace)) else {
            return Err(Error::Config(
                "Environment variables TARGET_REGISTRY and TARGET_NAMESPACE must be set."
                    .to_string(),
            ));
        };

        Ok(Self {
            registry,
            namespace,
            syncer: PathBuf::from(DEFAULT_SYNCER),
            auth: PathBuf::from(DEFAULT_AUTH),
            images_file: PathBuf::from(DEFAULT_IMAGES_FILE),
            proc: DEFAULT_PROC,
            targets_file: PathBuf::from(DEFAULT_TARGETS_FILE),
            sources_file: PathBuf::from(DEFAULT_SOURCES_FILE),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
