//! Extraction orchestrator
//!
//! One call per address: pick the profile, fetch and decode the page, run the
//! profile's parser over it and hand back the metadata.

use tracing::debug;

use crate::domain::metadata::Metadata;
use crate::infrastructure::address_resolver::AddressResolver;
use crate::infrastructure::errors::SkimmingError;
use crate::infrastructure::parsing::MetadataParser;
use crate::infrastructure::profile_store::ProfileStore;
use crate::infrastructure::transport::Transport;

pub struct Skimmer<T> {
    profiles: ProfileStore,
    resolver: AddressResolver<T>,
}

impl<T: Transport> Skimmer<T> {
    pub fn new(profiles: ProfileStore, resolver: AddressResolver<T>) -> Self {
        Self { profiles, resolver }
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    /// Extract the metadata behind `address`.
    pub async fn extract(&self, address: &str) -> Result<Metadata, SkimmingError> {
        let profile = self
            .profiles
            .find(address)
            .ok_or(SkimmingError::NoMatchingProfile)?;
        debug!("Profile detected: «{}».", profile.name());
        let mut parser = MetadataParser::new(profile.parser_config());

        let resolution = self.resolver.resolve(address).await?;
        if resolution.contents.is_empty() {
            return Err(SkimmingError::NoContents);
        }

        parser.feed(&resolution.contents);
        parser.close();
        let metadata = parser.metadata();
        if metadata.is_empty() {
            return Err(SkimmingError::NoMetadataFound);
        }
        Ok(metadata)
    }
}
