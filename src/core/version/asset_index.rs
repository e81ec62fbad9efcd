use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde::Deserialize;

use super::version_file::PRIORITY_ASSET;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::install::ArtifactDescriptor;

pub const RESOURCES_URL: &str = "https://resources.download.minecraft.net";

/// Top-level asset index JSON structure.
#[derive(Debug, Deserialize)]
pub struct AssetIndex {
    pub objects: HashMap<String, AssetObject>,
}

#[derive(Debug, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

impl AssetIndex {
    pub fn parse(text: &str) -> LauncherResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// One artifact per distinct object hash, stored content-addressed as
    /// `assets/objects/<first two hex>/<hash>`.
    pub fn object_artifacts(&self) -> LauncherResult<Vec<ArtifactDescriptor>> {
        let mut unique: BTreeMap<&str, u64> = BTreeMap::new();
        for (name, obj) in &self.objects {
            if obj.hash.len() < 2 || !obj.hash.is_ascii() {
                return Err(LauncherError::Resolution(format!(
                    "Asset '{}' has malformed hash '{}'",
                    name, obj.hash
                )));
            }
            unique.insert(obj.hash.as_str(), obj.size);
        }

        Ok(unique
            .into_iter()
            .map(|(hash, size)| {
                let prefix = &hash[..2];
                ArtifactDescriptor::file(
                    format!("{}/{}/{}", RESOURCES_URL, prefix, hash),
                    PathBuf::from("assets").join("objects").join(prefix).join(hash),
                )
                .with_digest(Some(hash.to_string()))
                .with_size(Some(size))
                .with_priority(PRIORITY_ASSET)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_hashes_are_fetched_once() {
        let index = AssetIndex::parse(
            r#"{"objects": {
                "minecraft/sounds/a.ogg": {"hash": "aabbccddeeff00112233445566778899aabbccdd", "size": 5},
                "minecraft/sounds/b.ogg": {"hash": "aabbccddeeff00112233445566778899aabbccdd", "size": 5},
                "icons/icon.png": {"hash": "0123456789abcdef0123456789abcdef01234567", "size": 7}
            }}"#,
        )
        .unwrap();

        let artifacts = index.object_artifacts().unwrap();
        assert_eq!(artifacts.len(), 2);
        assert_eq!(
            artifacts[0].url,
            "https://resources.download.minecraft.net/01/0123456789abcdef0123456789abcdef01234567"
        );
        assert_eq!(
            artifacts[1].relative_path,
            PathBuf::from("assets/objects/aa/aabbccddeeff00112233445566778899aabbccdd")
        );
        assert_eq!(artifacts[1].priority, PRIORITY_ASSET);
    }

    #[test]
    fn malformed_hash_is_a_resolution_error() {
        let index = AssetIndex::parse(r#"{"objects": {"x": {"hash": "a", "size": 1}}}"#).unwrap();
        assert!(matches!(
            index.object_artifacts(),
            Err(LauncherError::Resolution(_))
        ));
    }
}
