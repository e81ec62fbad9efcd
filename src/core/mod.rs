// ─── Installer Core ───
// Artifact acquisition and instance installation backend.
//
// Architecture:
//   core/
//     downloader/ — Fetchers, priority queue, worker pool, atomic commit
//     integrity   — Streaming md5/sha1/sha256 verification
//     install/    — Requests, version resolution, orchestrator stages
//     instance/   — Manifest model, layout normalization, queries
//     version/    — Mojang manifest + version JSON + asset index
//     maven/      — Coordinate parsing
//     loaders/    — Vanilla, Fabric, Quilt, Forge, NeoForge strategies
//     state/      — Settings and application wiring

pub mod downloader;
pub mod error;
pub mod http;
pub mod install;
pub mod instance;
pub mod integrity;
pub mod loaders;
pub mod maven;
pub mod state;
pub mod version;
