//! Extraction options and configuration.

/// Options for extracting a document layout.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Error handling mode
    pub error_mode: ErrorMode,

    /// Whether to extract pages in parallel
    pub parallel: bool,

    /// Pixels per point for the raster handed to the layout model
    pub raster_scale: f32,

    /// Maximum nesting of form XObjects followed by the interpreter
    pub max_form_depth: usize,

    /// Header/footer filter and block merging thresholds
    pub merge: MergeConfig,

    /// Layout-model zone handling
    pub zones: ZoneConfig,

    /// Math formula heuristic
    pub math: MathConfig,
}

impl ExtractOptions {
    /// Create new extract options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Fail on the first malformed page instead of emitting it empty.
    pub fn strict(mut self) -> Self {
        self.error_mode = ErrorMode::Strict;
        self
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    pub fn with_raster_scale(mut self, scale: f32) -> Self {
        self.raster_scale = scale;
        self
    }

    pub fn with_max_form_depth(mut self, depth: usize) -> Self {
        self.max_form_depth = depth;
        self
    }

    pub fn with_merge(mut self, merge: MergeConfig) -> Self {
        self.merge = merge;
        self
    }

    pub fn with_zones(mut self, zones: ZoneConfig) -> Self {
        self.zones = zones;
        self
    }

    pub fn with_math(mut self, math: MathConfig) -> Self {
        self.math = math;
        self
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Lenient,
            parallel: true,
            raster_scale: 2.0,
            max_form_depth: 8,
            merge: MergeConfig::default(),
            zones: ZoneConfig::default(),
            math: MathConfig::default(),
        }
    }
}

/// Error handling mode during extraction and rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail on any error
    Strict,
    /// Log, skip the offending page or block, and continue
    #[default]
    Lenient,
}

/// Thresholds for the header/footer filter and the vertical merge pass.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeConfig {
    /// Blocks starting above this fraction of the page height are dropped
    pub header_band: f32,
    /// Blocks ending below `1 - footer_band` of the page height are dropped
    pub footer_band: f32,
    /// Smallest accepted gap between consecutive blocks (negative = overlap)
    pub min_vertical_gap: f32,
    /// Gap at which blocks are no longer merged (exclusive)
    pub max_vertical_gap: f32,
    /// Largest left-edge difference still considered the same column (exclusive)
    pub max_x_offset: f32,
    /// Merged text must stay below this many characters
    pub max_chars: usize,
}

impl MergeConfig {
    pub fn with_bands(mut self, header: f32, footer: f32) -> Self {
        self.header_band = header;
        self.footer_band = footer;
        self
    }

    pub fn with_vertical_gap(mut self, min: f32, max: f32) -> Self {
        self.min_vertical_gap = min;
        self.max_vertical_gap = max;
        self
    }

    pub fn with_max_x_offset(mut self, offset: f32) -> Self {
        self.max_x_offset = offset;
        self
    }

    pub fn with_max_chars(mut self, max: usize) -> Self {
        self.max_chars = max;
        self
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            header_band: 0.05,
            footer_band: 0.05,
            min_vertical_gap: -5.0,
            max_vertical_gap: 15.0,
            max_x_offset: 15.0,
            max_chars: 500,
        }
    }
}

/// How layout-model boxes turn into protected zones.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneConfig {
    /// Labels that become protected zones (compared case-insensitively)
    pub protected_labels: Vec<String>,
    /// Boxes scoring below this are ignored
    pub min_score: f32,
    /// A block is protected when more than this share of its area lies in a zone
    pub block_overlap: f32,
}

impl ZoneConfig {
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protected_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_min_score(mut self, score: f32) -> Self {
        self.min_score = score;
        self
    }

    pub fn with_block_overlap(mut self, ratio: f32) -> Self {
        self.block_overlap = ratio;
        self
    }

    /// True when boxes with this label are protected.
    pub fn is_protected_label(&self, label: &str) -> bool {
        self.protected_labels
            .iter()
            .any(|l| l.eq_ignore_ascii_case(label))
    }
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            protected_labels: vec!["Table".into(), "Figure".into(), "Picture".into()],
            min_score: 0.0,
            block_overlap: 0.5,
        }
    }
}

/// Math formula heuristic switches.
#[derive(Debug, Clone, PartialEq)]
pub struct MathConfig {
    /// Run the heuristic at all
    pub enabled: bool,
    /// Text longer than this is never treated as a formula
    pub long_text_chars: usize,
}

impl MathConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_long_text_chars(mut self, chars: usize) -> Self {
        self.long_text_chars = chars;
        self
    }
}

impl Default for MathConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            long_text_chars: 100,
        }
    }
}
