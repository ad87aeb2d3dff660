use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::cycle::ImageOrder;
use crate::properties::SessionProperties;
use crate::scan::ScanOptions;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Folders to import reference images from.
    pub image_folders: Vec<PathBuf>,
    pub include_subfolders: bool,
    /// Show images in random order instead of path order.
    pub shuffle: bool,
    /// Optional deterministic seed for the shuffle.
    pub shuffle_seed: Option<u64>,
    /// Wall-clock time between two ticks.
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,
    /// Session time counted per tick, as a multiple of `tick-interval`.
    pub speed_multiplier: f64,
    pub session: SessionProperties,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(!self.tick_interval.is_zero(), "tick-interval must be positive");
        ensure!(
            self.speed_multiplier.is_finite() && self.speed_multiplier > 0.0,
            "speed-multiplier must be positive"
        );
        ensure!(
            self.checked_session_step().is_some(),
            "speed-multiplier {} is too large for tick-interval {}",
            self.speed_multiplier,
            humantime::format_duration(self.tick_interval)
        );
        self.session
            .validate()
            .context("invalid session configuration")?;
        Ok(self)
    }

    pub fn image_order(&self) -> ImageOrder {
        match (self.shuffle, self.shuffle_seed) {
            (false, _) => ImageOrder::Sequential,
            (true, Some(seed)) => ImageOrder::Seeded(seed),
            (true, None) => ImageOrder::Shuffled,
        }
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            recursive: self.include_subfolders,
            ..ScanOptions::default()
        }
    }

    /// Session time that passes on every tick, saturating at [`Duration::MAX`].
    pub fn session_step(&self) -> Duration {
        self.checked_session_step().unwrap_or(Duration::MAX)
    }

    fn checked_session_step(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.tick_interval.as_secs_f64() * self.speed_multiplier).ok()
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            image_folders: Vec::new(),
            include_subfolders: true,
            shuffle: true,
            shuffle_seed: None,
            tick_interval: Duration::from_secs(1),
            speed_multiplier: 1.0,
            session: SessionProperties::default(),
        }
    }
}
