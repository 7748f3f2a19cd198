//! Concatenating stitch engine
//!
//! Joins HLS VOD assets back to back:
//! - The first asset's variants define the bandwidth ladder
//! - For every rung, each asset contributes its nearest-bandwidth variant
//! - Audio renditions of the first asset are matched by language in the
//!   other assets (falling back to the asset's first audio rendition)
//! - Assets are separated by `#EXT-X-DISCONTINUITY`
//!
//! Encryption keys and byte ranges are not carried over.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info};
use url::Url;

use super::m3u8::{
    parse_media, parse_multivariant, AudioRendition, MediaPlaylist, MultivariantPlaylist,
    VariantStream,
};
use super::{AudioUriFn, StitchEngine, StitchedVod, VideoUriFn};
use crate::error::{Result, V2vError};
use crate::feed::PlaylistEntry;

/// Engine producing [`ConcatVod`] presentations.
#[derive(Clone)]
pub struct ConcatEngine {
    client: reqwest::Client,
}

impl ConcatEngine {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl StitchEngine for ConcatEngine {
    fn build(&self, playlist: Vec<PlaylistEntry>) -> Result<Box<dyn StitchedVod>> {
        if playlist.is_empty() {
            return Err(V2vError::Stitch("playlist has no entries".to_string()));
        }
        Ok(Box::new(ConcatVod {
            client: self.client.clone(),
            playlist,
            video: Vec::new(),
            audio: Vec::new(),
        }))
    }
}

/// Video rendition of the stitched presentation
#[derive(Debug, Clone)]
struct StitchedVideo {
    bandwidth: u64,
    resolution: Option<String>,
    codecs: Option<String>,
    audio_group: Option<String>,
    manifest: String,
}

/// Audio rendition of the stitched presentation
#[derive(Debug, Clone)]
struct StitchedAudio {
    group_id: String,
    language: String,
    name: String,
    is_default: bool,
    manifest: String,
}

/// Assets joined back to back in playlist order.
pub struct ConcatVod {
    client: reqwest::Client,
    playlist: Vec<PlaylistEntry>,
    video: Vec<StitchedVideo>,
    audio: Vec<StitchedAudio>,
}

impl ConcatVod {
    async fn fetch(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| V2vError::Stitch(format!("failed to fetch {}: {}", url, e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(V2vError::Stitch(format!(
                "failed to fetch {}: {}",
                url, status
            )));
        }
        response
            .text()
            .await
            .map_err(|e| V2vError::Stitch(format!("failed to read {}: {}", url, e)))
    }

    /// Fetch a media playlist once per load, however many rungs use it.
    async fn media(
        &self,
        cache: &mut HashMap<Url, MediaPlaylist>,
        url: &Url,
    ) -> Result<MediaPlaylist> {
        if let Some(playlist) = cache.get(url) {
            return Ok(playlist.clone());
        }
        let playlist = parse_media(&self.fetch(url).await?, url)?;
        cache.insert(url.clone(), playlist.clone());
        Ok(playlist)
    }
}

fn nearest_variant(assets: &MultivariantPlaylist, bandwidth: u64) -> &VariantStream {
    assets
        .variants
        .iter()
        .min_by_key(|v| v.bandwidth.abs_diff(bandwidth))
        .unwrap_or(&assets.variants[0])
}

fn matching_audio<'a>(
    asset: &'a MultivariantPlaylist,
    language: Option<&str>,
) -> Option<&'a AudioRendition> {
    asset
        .audio
        .iter()
        .find(|a| a.language.as_deref() == language)
        .or_else(|| asset.audio.first())
}

/// Render concatenated media playlists as one VOD media playlist.
fn render_media(parts: &[MediaPlaylist]) -> String {
    let mut output = String::new();

    let target_duration = parts
        .iter()
        .flat_map(|p| p.segments.iter())
        .map(|s| s.duration_secs.ceil() as u64)
        .max()
        .unwrap_or(1);
    let has_map = parts
        .iter()
        .flat_map(|p| p.segments.iter())
        .any(|s| s.map.is_some());

    output.push_str("#EXTM3U\n");
    output.push_str(&format!("#EXT-X-VERSION:{}\n", if has_map { 6 } else { 3 }));
    output.push_str(&format!("#EXT-X-TARGETDURATION:{}\n", target_duration));
    output.push_str("#EXT-X-MEDIA-SEQUENCE:0\n");
    output.push_str("#EXT-X-PLAYLIST-TYPE:VOD\n");

    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            output.push_str("#EXT-X-DISCONTINUITY\n");
        }
        let mut current_map: Option<&Url> = None;
        for segment in &part.segments {
            if let Some(map) = &segment.map {
                if current_map != Some(map) {
                    output.push_str(&format!("#EXT-X-MAP:URI=\"{}\"\n", map));
                    current_map = Some(map);
                }
            }
            output.push_str(&format!("#EXTINF:{:.3},\n", segment.duration_secs));
            output.push_str(&format!("{}\n", segment.uri));
        }
    }

    output.push_str("#EXT-X-ENDLIST\n");
    output
}

#[async_trait]
impl StitchedVod for ConcatVod {
    async fn load(&mut self) -> Result<()> {
        let mut assets = Vec::with_capacity(self.playlist.len());
        for entry in &self.playlist {
            let started = Instant::now();
            let text = self.fetch(&entry.uri).await?;
            let asset = parse_multivariant(&text, &entry.uri)?;
            debug!(
                id = %entry.id,
                variants = asset.variants.len(),
                audio = asset.audio.len(),
                "Loaded asset in {}ms",
                started.elapsed().as_millis()
            );
            assets.push(asset);
        }

        let mut ladder: Vec<&VariantStream> = assets[0].variants.iter().collect();
        ladder.sort_by_key(|v| v.bandwidth);
        ladder.dedup_by_key(|v| v.bandwidth);

        let mut cache = HashMap::new();
        let mut video = Vec::with_capacity(ladder.len());
        for rung in ladder {
            let mut parts = Vec::with_capacity(assets.len());
            for asset in &assets {
                let variant = nearest_variant(asset, rung.bandwidth);
                parts.push(self.media(&mut cache, &variant.uri).await?);
            }
            video.push(StitchedVideo {
                bandwidth: rung.bandwidth,
                resolution: rung.attributes.get("RESOLUTION").map(str::to_string),
                codecs: rung.attributes.get("CODECS").map(str::to_string),
                audio_group: rung.attributes.get("AUDIO").map(str::to_string),
                manifest: render_media(&parts),
            });
        }

        let mut audio = Vec::with_capacity(assets[0].audio.len());
        for rendition in &assets[0].audio {
            let language = rendition.language.as_deref();
            let mut parts = Vec::with_capacity(assets.len());
            for (entry, asset) in self.playlist.iter().zip(&assets) {
                let matched = matching_audio(asset, language).ok_or_else(|| {
                    V2vError::Stitch(format!("asset {} has no audio rendition", entry.id))
                })?;
                parts.push(self.media(&mut cache, &matched.uri).await?);
            }
            audio.push(StitchedAudio {
                group_id: rendition.group_id.clone(),
                language: language.unwrap_or("und").to_string(),
                name: rendition
                    .name
                    .clone()
                    .unwrap_or_else(|| language.unwrap_or("und").to_string()),
                is_default: rendition.is_default,
                manifest: render_media(&parts),
            });
        }

        info!(
            assets = assets.len(),
            video = video.len(),
            audio = audio.len(),
            "Stitched presentation ready"
        );
        self.video = video;
        self.audio = audio;
        Ok(())
    }

    fn render_multivariant(
        &self,
        video_uri: VideoUriFn<'_>,
        audio_uri: AudioUriFn<'_>,
    ) -> Result<String> {
        if self.video.is_empty() {
            return Err(V2vError::Stitch(
                "presentation has no video renditions; was it loaded?".to_string(),
            ));
        }

        let mut output = String::new();
        output.push_str("#EXTM3U\n");
        output.push_str("#EXT-X-VERSION:3\n");
        output.push_str("#EXT-X-INDEPENDENT-SEGMENTS\n");

        for track in &self.audio {
            output.push_str(&format!(
                "#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"{}\",LANGUAGE=\"{}\",NAME=\"{}\",DEFAULT={},AUTOSELECT=YES,URI=\"{}\"\n",
                track.group_id,
                track.language,
                track.name,
                if track.is_default { "YES" } else { "NO" },
                audio_uri(&track.group_id, &track.language)
            ));
        }

        for variant in &self.video {
            let mut attrs = format!("BANDWIDTH={}", variant.bandwidth);
            if let Some(resolution) = &variant.resolution {
                attrs.push_str(&format!(",RESOLUTION={}", resolution));
            }
            if let Some(codecs) = &variant.codecs {
                attrs.push_str(&format!(",CODECS=\"{}\"", codecs));
            }
            if let Some(group) = &variant.audio_group {
                if self.audio.iter().any(|a| &a.group_id == group) {
                    attrs.push_str(&format!(",AUDIO=\"{}\"", group));
                }
            }
            output.push_str(&format!("#EXT-X-STREAM-INF:{}\n", attrs));
            output.push_str(&format!("{}\n", video_uri(&variant.bandwidth.to_string())));
        }

        Ok(output)
    }

    fn video_variant(&self, bandwidth: &str) -> Option<String> {
        self.video
            .iter()
            .find(|v| v.bandwidth.to_string() == bandwidth)
            .map(|v| v.manifest.clone())
    }

    fn audio_variant(&self, group_id: &str, language: &str) -> Option<String> {
        self.audio
            .iter()
            .find(|a| a.group_id == group_id && a.language == language)
            .map(|a| a.manifest.clone())
    }
}
