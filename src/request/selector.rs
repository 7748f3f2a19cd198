//! Query string handling
//!
//! Extracts the feed reference (`mrss`) and the rendition selector
//! (`audiotrack` or `bw`) from a manifest request. Values are decoded through
//! axum's `Query`; the `mrss` value is additionally kept exactly as received
//! so it can be re-embedded in child manifest URIs.

use axum::extract::Query;
use axum::http::Uri;
use serde::Deserialize;
use std::fmt;
use url::Url;

use crate::error::{Result, V2vError};

// helper.
macro_rules! regex {
    ($re:literal $(,)?) => {{
        static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
        RE.get_or_init(|| regex::Regex::new($re).unwrap())
    }};
}

/// Decoded query parameters of a manifest request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestParams {
    pub mrss: Option<String>,
    pub bw: Option<String>,
    pub audiotrack: Option<String>,
}

impl ManifestParams {
    pub fn from_uri(uri: &Uri) -> Result<Self> {
        let Query(params) = Query::<ManifestParams>::try_from_uri(uri)
            .map_err(|e| V2vError::InvalidQuery(e.body_text()))?;
        Ok(params)
    }
}

/// Empty values count as absent.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Value of `key` as it appeared on the wire (still percent-encoded).
pub fn raw_param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query
        .split('&')
        .find_map(|pair| match pair.split_once('=') {
            Some((k, v)) if k == key => Some(v),
            _ => None,
        })
}

/// The feed a manifest request refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRef {
    /// `mrss` exactly as supplied by the client
    pub encoded: String,
    /// Decoded, validated feed location
    pub uri: Url,
}

impl FeedRef {
    pub fn from_params(params: &ManifestParams, raw_query: Option<&str>) -> Result<Self> {
        let decoded = present(&params.mrss).ok_or(V2vError::MissingFeedUri)?;
        let uri = Url::parse(decoded)
            .map_err(|e| V2vError::InvalidFeedUri(format!("{:?}: {}", decoded, e)))?;
        if !matches!(uri.scheme(), "http" | "https") {
            return Err(V2vError::InvalidFeedUri(format!(
                "{:?}: unsupported scheme '{}'",
                decoded,
                uri.scheme()
            )));
        }

        // A percent-encoded key ("%6Drss") leaves no raw value to reuse.
        let encoded = raw_query
            .and_then(|query| raw_param(query, "mrss"))
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| url::form_urlencoded::byte_serialize(decoded.as_bytes()).collect());

        Ok(Self { encoded, uri })
    }
}

/// Requested rendition of a media manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantSelector {
    /// Video track, bandwidth token carried opaquely
    Video { bandwidth: String },
    /// Audio track
    Audio { group_id: String, language: String },
}

impl VariantSelector {
    /// Parse an `audiotrack` value of the form `<groupId>-<language>`.
    ///
    /// The group id takes everything up to the last hyphen, so `audio-aac-en`
    /// is group `audio-aac`, language `en`. See [`audiotrack_splits`] for the
    /// other readings.
    pub fn parse_audiotrack(value: &str) -> Result<Self> {
        let caps = regex!(r"^(\S+)-(\S+)$")
            .captures(value)
            .ok_or_else(|| V2vError::MalformedSelector(value.to_string()))?;
        Ok(VariantSelector::Audio {
            group_id: caps[1].to_string(),
            language: caps[2].to_string(),
        })
    }

    /// Derive the selector from query parameters: `audiotrack` first, then
    /// `bw`. `None` when neither is present.
    pub fn from_params(params: &ManifestParams) -> Result<Option<Self>> {
        if let Some(audiotrack) = present(&params.audiotrack) {
            return Self::parse_audiotrack(audiotrack).map(Some);
        }
        Ok(present(&params.bw).map(|bandwidth| VariantSelector::Video {
            bandwidth: bandwidth.to_string(),
        }))
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            VariantSelector::Video { .. } => "video",
            VariantSelector::Audio { .. } => "audio",
        }
    }
}

/// Every `(groupId, language)` reading of an `audiotrack` value, last hyphen
/// first. Group ids and BCP-47 tags (`en-US`) may both contain hyphens.
pub fn audiotrack_splits(value: &str) -> Vec<(&str, &str)> {
    value
        .rmatch_indices('-')
        .map(|(i, _)| (&value[..i], &value[i + 1..]))
        .filter(|(group_id, language)| !group_id.is_empty() && !language.is_empty())
        .collect()
}

impl fmt::Display for VariantSelector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VariantSelector::Video { bandwidth } => write!(f, "bw={}", bandwidth),
            VariantSelector::Audio { group_id, language } => {
                write!(f, "audiotrack={}-{}", group_id, language)
            }
        }
    }
}
