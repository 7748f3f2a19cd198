//! Stitching collaborator
//!
//! The service never joins segments itself; it drives an engine through a
//! fixed call sequence:
//! - `StitchEngine::build` with the resolved playlist
//! - `StitchedVod::load` (may fetch every asset)
//! - one of the render/lookup calls
//!
//! `ConcatEngine` is the engine the binary ships with. Tests substitute
//! their own implementations.

pub mod concat;
pub mod m3u8;

use async_trait::async_trait;

use crate::error::Result;
use crate::feed::PlaylistEntry;

pub use concat::ConcatEngine;

/// Rewrites a video rendition (identified by its bandwidth token) to the URI
/// the multivariant manifest should reference.
pub type VideoUriFn<'a> = &'a (dyn Fn(&str) -> String + Send + Sync);

/// Rewrites an audio rendition (group id, language) to a URI.
pub type AudioUriFn<'a> = &'a (dyn Fn(&str, &str) -> String + Send + Sync);

/// Factory for stitched presentations.
pub trait StitchEngine: Send + Sync {
    /// Construct a presentation from assets in stitching order.
    fn build(&self, playlist: Vec<PlaylistEntry>) -> Result<Box<dyn StitchedVod>>;
}

/// One stitched presentation built from a playlist.
#[async_trait]
pub trait StitchedVod: Send + Sync {
    /// Index/probe the underlying assets. Must be called before rendering.
    async fn load(&mut self) -> Result<()>;

    /// Render the multivariant manifest, calling the rewrite functions once
    /// per rendition to produce child manifest URIs.
    fn render_multivariant(
        &self,
        video_uri: VideoUriFn<'_>,
        audio_uri: AudioUriFn<'_>,
    ) -> Result<String>;

    /// Media manifest text of the video rendition with this bandwidth token.
    fn video_variant(&self, bandwidth: &str) -> Option<String>;

    /// Media manifest text of the audio rendition (group id, language).
    fn audio_variant(&self, group_id: &str, language: &str) -> Option<String>;
}
