//! Minimal HLS playlist reader
//!
//! Understands just enough of RFC 8216 to concatenate VOD assets:
//! `EXT-X-STREAM-INF` and audio `EXT-X-MEDIA` in multivariant playlists,
//! `EXTINF` and `EXT-X-MAP` in media playlists. All URIs are resolved
//! against the playlist's own URL.

use url::Url;

use crate::error::{Result, V2vError};

// helper.
macro_rules! regex {
    ($re:literal $(,)?) => {{
        static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
        RE.get_or_init(|| regex::Regex::new($re).unwrap())
    }};
}

/// Parsed attribute list, in source order. Quoted values are unquoted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn parse(list: &str) -> Self {
        let pairs = regex!(r#"([A-Z0-9-]+)=("[^"]*"|[^,]*)"#)
            .captures_iter(list)
            .map(|caps| {
                let value = caps[2].trim_matches('"').to_string();
                (caps[1].to_string(), value)
            })
            .collect();
        Attributes(pairs)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// `#EXT-X-STREAM-INF` entry
#[derive(Debug, Clone)]
pub struct VariantStream {
    pub bandwidth: u64,
    pub attributes: Attributes,
    pub uri: Url,
}

/// Audio `#EXT-X-MEDIA` entry
#[derive(Debug, Clone)]
pub struct AudioRendition {
    pub group_id: String,
    pub language: Option<String>,
    pub name: Option<String>,
    pub is_default: bool,
    pub uri: Url,
}

#[derive(Debug, Clone, Default)]
pub struct MultivariantPlaylist {
    pub variants: Vec<VariantStream>,
    pub audio: Vec<AudioRendition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub duration_secs: f64,
    pub uri: Url,
    /// Initialization section in effect for this segment
    pub map: Option<Url>,
}

#[derive(Debug, Clone, Default)]
pub struct MediaPlaylist {
    pub segments: Vec<Segment>,
}

fn invalid(base: &Url, msg: impl std::fmt::Display) -> V2vError {
    V2vError::Stitch(format!("{}: {}", base, msg))
}

fn check_header(text: &str, base: &Url) -> Result<()> {
    if text.trim_start().starts_with("#EXTM3U") {
        Ok(())
    } else {
        Err(invalid(base, "not an HLS playlist (missing #EXTM3U)"))
    }
}

fn resolve(base: &Url, reference: &str) -> Result<Url> {
    base.join(reference)
        .map_err(|e| invalid(base, format!("bad URI {:?}: {}", reference, e)))
}

/// Parse a multivariant playlist.
pub fn parse_multivariant(text: &str, base: &Url) -> Result<MultivariantPlaylist> {
    check_header(text, base)?;

    let mut playlist = MultivariantPlaylist::default();
    let mut pending: Option<Attributes> = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(list) = line.strip_prefix("#EXT-X-STREAM-INF:") {
            pending = Some(Attributes::parse(list));
        } else if let Some(list) = line.strip_prefix("#EXT-X-MEDIA:") {
            let attrs = Attributes::parse(list);
            if attrs.get("TYPE") != Some("AUDIO") {
                continue;
            }
            // Renditions without a URI are muxed into the video variant.
            let (Some(group_id), Some(uri)) = (attrs.get("GROUP-ID"), attrs.get("URI")) else {
                continue;
            };
            playlist.audio.push(AudioRendition {
                group_id: group_id.to_string(),
                language: attrs.get("LANGUAGE").map(str::to_string),
                name: attrs.get("NAME").map(str::to_string),
                is_default: attrs.get("DEFAULT") == Some("YES"),
                uri: resolve(base, uri)?,
            });
        } else if line.starts_with("#EXTINF") {
            return Err(invalid(base, "expected a multivariant playlist, got a media playlist"));
        } else if !line.starts_with('#') {
            if let Some(attributes) = pending.take() {
                let bandwidth = attributes
                    .get("BANDWIDTH")
                    .and_then(|b| b.parse().ok())
                    .ok_or_else(|| invalid(base, "EXT-X-STREAM-INF without BANDWIDTH"))?;
                playlist.variants.push(VariantStream {
                    bandwidth,
                    attributes,
                    uri: resolve(base, line)?,
                });
            }
        }
    }

    if playlist.variants.is_empty() {
        return Err(invalid(base, "no variant streams"));
    }
    Ok(playlist)
}

/// Parse a media playlist.
pub fn parse_media(text: &str, base: &Url) -> Result<MediaPlaylist> {
    check_header(text, base)?;

    let mut playlist = MediaPlaylist::default();
    let mut map: Option<Url> = None;
    let mut duration: Option<f64> = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(info) = line.strip_prefix("#EXTINF:") {
            let value = info.split(',').next().unwrap_or("");
            duration = Some(
                value
                    .trim()
                    .parse()
                    .map_err(|_| invalid(base, format!("bad EXTINF duration {:?}", value)))?,
            );
        } else if let Some(list) = line.strip_prefix("#EXT-X-MAP:") {
            let attrs = Attributes::parse(list);
            let uri = attrs
                .get("URI")
                .ok_or_else(|| invalid(base, "EXT-X-MAP without URI"))?;
            map = Some(resolve(base, uri)?);
        } else if line.starts_with("#EXT-X-STREAM-INF") {
            return Err(invalid(base, "expected a media playlist, got a multivariant playlist"));
        } else if !line.starts_with('#') {
            let duration_secs = duration
                .take()
                .ok_or_else(|| invalid(base, format!("segment {:?} without EXTINF", line)))?;
            playlist.segments.push(Segment {
                duration_secs,
                uri: resolve(base, line)?,
                map: map.clone(),
            });
        }
    }

    Ok(playlist)
}
