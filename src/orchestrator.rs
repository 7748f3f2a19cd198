//! Manifest orchestration
//!
//! Drives one request through the pipeline:
//! feed fetch → feed parse → engine build → load → render.
//! Every stage runs inside the request's span, and the whole pipeline is
//! bounded by the configured request timeout.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, Instrument};

use crate::error::{Result, V2vError};
use crate::feed::{FeedResolver, PlaylistEntry};
use crate::request::{audiotrack_splits, ManifestTarget, RequestContext, VariantSelector};
use crate::stitch::StitchEngine;

/// Child manifest URI for a video rendition, relative to the multivariant manifest.
pub fn video_variant_uri(bandwidth: &str, encoded_feed: &str) -> String {
    format!("media.m3u8?bw={}&mrss={}", bandwidth, encoded_feed)
}

/// Child manifest URI for an audio rendition, relative to the multivariant manifest.
pub fn audio_variant_uri(group_id: &str, language: &str, encoded_feed: &str) -> String {
    format!(
        "media.m3u8?audiotrack={}-{}&mrss={}",
        group_id, language, encoded_feed
    )
}

/// Resolves feeds and renders stitched manifests.
#[derive(Clone)]
pub struct ManifestOrchestrator {
    resolver: FeedResolver,
    engine: Arc<dyn StitchEngine>,
    timeout: Duration,
}

impl ManifestOrchestrator {
    pub fn new(resolver: FeedResolver, engine: Arc<dyn StitchEngine>, timeout: Duration) -> Self {
        Self {
            resolver,
            engine,
            timeout,
        }
    }

    /// Run the full pipeline for a manifest request.
    ///
    /// On timeout the in-flight fetch or engine call is dropped.
    pub async fn handle(&self, ctx: &RequestContext) -> Result<String> {
        let pipeline = async {
            debug!("Creating playlist from MRSS");
            let playlist = self.resolver.resolve(&ctx.feed.uri).await?;
            self.render(playlist, ctx).await
        };

        match tokio::time::timeout(self.timeout, pipeline)
            .instrument(ctx.span.clone())
            .await
        {
            Ok(result) => result,
            Err(_) => Err(V2vError::Timeout(self.timeout)),
        }
    }

    /// Build, load and render the stitched presentation for `playlist`.
    pub async fn render(&self, playlist: Vec<PlaylistEntry>, ctx: &RequestContext) -> Result<String> {
        let mut vod = self.engine.build(playlist)?;

        let started = Instant::now();
        debug!("Loading stitched VOD...");
        vod.load().await?;
        debug!("...Loaded stitched VOD in {}ms", started.elapsed().as_millis());

        match &ctx.target {
            ManifestTarget::Multivariant => {
                debug!("Generating multivariant playlist");
                let encoded = ctx.feed.encoded.as_str();
                let video_uri = |bandwidth: &str| video_variant_uri(bandwidth, encoded);
                let audio_uri =
                    |group_id: &str, language: &str| audio_variant_uri(group_id, language, encoded);
                vod.render_multivariant(&video_uri, &audio_uri)
            }
            ManifestTarget::Media(VariantSelector::Audio { group_id, language }) => {
                debug!("Generating media playlist for (groupId:{})(lang:{})", group_id, language);
                // `aac-en-US` may have been advertised as group `aac`, language `en-US`.
                let audiotrack = format!("{}-{}", group_id, language);
                audiotrack_splits(&audiotrack)
                    .into_iter()
                    .find_map(|(group_id, language)| vod.audio_variant(group_id, language))
                    .ok_or_else(|| V2vError::VariantNotFound(format!("audiotrack={}", audiotrack)))
            }
            ManifestTarget::Media(VariantSelector::Video { bandwidth }) => {
                debug!("Generating media playlist for (bw:{})", bandwidth);
                vod.video_variant(bandwidth)
                    .ok_or_else(|| V2vError::VariantNotFound(format!("bw={}", bandwidth)))
            }
        }
    }
}
