//! GPS track replay.

use anyhow::Context;
use roadlore_geo::{FeedLocationSource, Position};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// One recorded reading. `delay_ms` is the wait before it is emitted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrackPoint {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

impl TrackPoint {
    pub fn position(&self) -> Position {
        let position = Position::new(self.lat, self.lng);
        match self.heading {
            Some(heading) => position.with_heading(heading),
            None => position,
        }
    }

    pub fn delay(&self, default: Duration) -> Duration {
        self.delay_ms.map(Duration::from_millis).unwrap_or(default)
    }
}

pub fn parse_track(text: &str) -> anyhow::Result<Vec<TrackPoint>> {
    let points: Vec<TrackPoint> = serde_json::from_str(text).context("track must be a JSON array")?;
    anyhow::ensure!(!points.is_empty(), "track is empty");
    Ok(points)
}

pub async fn load_track(path: &Path) -> anyhow::Result<Vec<TrackPoint>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading track {}", path.display()))?;
    parse_track(&text).with_context(|| format!("parsing track {}", path.display()))
}

/// Wait until something listens to `feed`, so the first reading is not lost.
pub async fn wait_for_listener(feed: &FeedLocationSource, limit: Duration) -> bool {
    let poll = Duration::from_millis(10);
    let mut waited = Duration::ZERO;
    while feed.subscriber_count() == 0 {
        if waited >= limit {
            return false;
        }
        tokio::time::sleep(poll).await;
        waited += poll;
    }
    true
}
