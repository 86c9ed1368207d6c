// FormatSelector - fixed quality presets
//
// Maps the menu labels "1".."4" to yt-dlp format selectors. Each capped
// preset prefers separate best video+audio streams at or below the cap and
// falls back to the best single file at or below it.

use std::fmt;

/// Quality preset offered in the quality menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityPreset {
    Best,
    High,
    Medium,
    Low,
}

/// Label → preset table, in menu order
pub const VIDEO_QUALITIES: [(&str, QualityPreset); 4] = [
    ("1", QualityPreset::Best),
    ("2", QualityPreset::High),
    ("3", QualityPreset::Medium),
    ("4", QualityPreset::Low),
];

impl QualityPreset {
    pub const ALL: [QualityPreset; 4] = [Self::Best, Self::High, Self::Medium, Self::Low];

    /// Look up a preset by its menu label
    pub fn from_label(label: &str) -> Option<Self> {
        VIDEO_QUALITIES
            .iter()
            .find(|(l, _)| *l == label.trim())
            .map(|(_, preset)| *preset)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Best => "1",
            Self::High => "2",
            Self::Medium => "3",
            Self::Low => "4",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Best => "Best quality available",
            Self::High => "High quality (1080p)",
            Self::Medium => "Medium quality (720p)",
            Self::Low => "Low quality (480p)",
        }
    }

    /// Vertical resolution cap, `None` for uncapped
    pub fn max_height(&self) -> Option<u32> {
        match self {
            Self::Best => None,
            Self::High => Some(1080),
            Self::Medium => Some(720),
            Self::Low => Some(480),
        }
    }

    /// yt-dlp format spec for this preset
    pub fn format_selector(&self) -> &'static str {
        match self {
            Self::Best => "bestvideo+bestaudio/best",
            Self::High => "bestvideo[height<=1080]+bestaudio/best[height<=1080]",
            Self::Medium => "bestvideo[height<=720]+bestaudio/best[height<=720]",
            Self::Low => "bestvideo[height<=480]+bestaudio/best[height<=480]",
        }
    }

    /// All menu labels, in order
    pub fn labels() -> Vec<&'static str> {
        VIDEO_QUALITIES.iter().map(|(label, _)| *label).collect()
    }
}

impl fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}
