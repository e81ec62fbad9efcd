pub mod asset_index;
pub mod manifest;
pub mod version_file;

pub use asset_index::{AssetIndex, AssetObject, RESOURCES_URL};
pub use manifest::{VersionEntry, VersionManifest, VERSION_MANIFEST_URL};
pub use version_file::{LibraryEntry, VersionJson};
