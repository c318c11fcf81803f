//! Configuration types for the Kindred engagement core.
//!
//! `KindredConfig` represents the `config.toml` sections controlling
//! segment tracking, segment cleanup, and fact cache validity. All fields
//! have defaults matching long-running production tuning; none of the
//! values carries a derivation, they are hand-tuned.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the engagement core.
///
/// Loaded from `{data_dir}/config.toml`. Every section and field is
/// optional in the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KindredConfig {
    #[serde(default)]
    pub engagement: EngagementConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
    #[serde(default)]
    pub fact_cache: FactCacheConfig,
}

/// Segment tracking and threshold tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementConfig {
    /// Total segment message count at which an impression rebuild fires.
    #[serde(default = "default_engagement_threshold")]
    pub engagement_threshold: u32,
    /// Largest between-message gap (exclusive count) a segment absorbs
    /// before a new segment is started.
    #[serde(default = "default_gap_tolerance")]
    pub gap_tolerance: u32,
    /// How many messages before the anchor a new segment backdates to.
    #[serde(default = "default_segment_lookback")]
    pub segment_lookback: u32,
    /// How many messages past a closed segment's last message its end time
    /// extends to.
    #[serde(default = "default_segment_lookahead")]
    pub segment_lookahead: u32,
}

fn default_engagement_threshold() -> u32 {
    45
}

fn default_gap_tolerance() -> u32 {
    10
}

fn default_segment_lookback() -> u32 {
    5
}

fn default_segment_lookahead() -> u32 {
    5
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            engagement_threshold: default_engagement_threshold(),
            gap_tolerance: default_gap_tolerance(),
            segment_lookback: default_segment_lookback(),
            segment_lookahead: default_segment_lookahead(),
        }
    }
}

/// Periodic pruning of stale or excess segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Master switch; disabled cleanup makes `maybe_cleanup` a no-op.
    #[serde(default = "default_enable_cleanup")]
    pub enable_cleanup: bool,
    /// Minimum hours between cleanup runs.
    #[serde(default = "default_cleanup_interval_hours")]
    pub cleanup_interval_hours: u32,
    /// Segments whose end time is older than this are dropped.
    #[serde(default = "default_max_segment_age_days")]
    pub max_segment_age_days: u32,
    /// Hard cap on segments kept per person (newest by end time win).
    #[serde(default = "default_max_segments_per_person")]
    pub max_segments_per_person: usize,
}

fn default_enable_cleanup() -> bool {
    true
}

fn default_cleanup_interval_hours() -> u32 {
    1
}

fn default_max_segment_age_days() -> u32 {
    7
}

fn default_max_segments_per_person() -> usize {
    10
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enable_cleanup: default_enable_cleanup(),
            cleanup_interval_hours: default_cleanup_interval_hours(),
            max_segment_age_days: default_max_segment_age_days(),
            max_segments_per_person: default_max_segments_per_person(),
        }
    }
}

/// Fact cache validity, in processing cycles (see `FactCache::decay`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactCacheConfig {
    /// Validity of an entry served from the durable store.
    #[serde(default = "default_durable_hit_ttl")]
    pub durable_hit_ttl: i32,
    /// Validity of an entry produced by a fresh extraction (successful or
    /// empty-handed).
    #[serde(default = "default_extraction_ttl")]
    pub extraction_ttl: i32,
    /// Validity of the "total stranger" marker recorded when no long-term
    /// knowledge exists at all.
    #[serde(default = "default_no_background_ttl")]
    pub no_background_ttl: i32,
}

fn default_durable_hit_ttl() -> i32 {
    2
}

fn default_extraction_ttl() -> i32 {
    3
}

fn default_no_background_ttl() -> i32 {
    2
}

impl Default for FactCacheConfig {
    fn default() -> Self {
        Self {
            durable_hit_ttl: default_durable_hit_ttl(),
            extraction_ttl: default_extraction_ttl(),
            no_background_ttl: default_no_background_ttl(),
        }
    }
}
