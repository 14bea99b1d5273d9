use serde::{Deserialize, Serialize};

/// Detection and normalization knobs shared by every sheet.
///
/// Key notes:
///   - `scale` and `dilation_passes` together decide which gaps are bridged: the automatic path
///     assumes the gap between distinct sprites exceeds `2 * dilation_passes` mask cells
///     (`2 * dilation_passes * scale` pixels). Narrower gaps merge sprites into one component.
///   - `min_component_width/height` are full-image pixels, compared after rescaling.
///   - The per-family row count lives on the layout entry (`LayoutEntry::Auto`), not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlicerConfig {
    /// Mask downsample factor (nearest-neighbour), >= 1.
    #[serde(default = "default_scale")]
    pub scale: u32,
    /// A mask cell is set when the sampled alpha is strictly greater than this.
    #[serde(default = "default_alpha_threshold")]
    pub alpha_threshold: u8,
    /// 4-connected dilation passes applied to the mask before labeling.
    #[serde(default = "default_dilation_passes")]
    pub dilation_passes: u32,
    /// Components must be wider than this (pixels) to survive the noise filter.
    #[serde(default = "default_min_component")]
    pub min_component_width: u32,
    /// Components must be taller than this (pixels) to survive the noise filter.
    #[serde(default = "default_min_component")]
    pub min_component_height: u32,
    /// Pixels added around each rough box before refining against full-resolution alpha.
    #[serde(default = "default_refinement_padding")]
    pub refinement_padding: u32,
    /// Side of the square output canvas.
    #[serde(default = "default_canvas_size")]
    pub canvas_size: u32,
}

impl Default for SlicerConfig {
    fn default() -> Self {
        Self {
            scale: default_scale(),
            alpha_threshold: default_alpha_threshold(),
            dilation_passes: default_dilation_passes(),
            min_component_width: default_min_component(),
            min_component_height: default_min_component(),
            refinement_padding: default_refinement_padding(),
            canvas_size: default_canvas_size(),
        }
    }
}

impl SlicerConfig {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if `scale` or `canvas_size` is zero.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::SlicerError;

        if self.scale == 0 {
            return Err(SlicerError::InvalidConfig(
                "scale must be >= 1 (mask downsample factor)".into(),
            ));
        }
        if self.canvas_size == 0 {
            return Err(SlicerError::InvalidConfig(
                "canvas_size must be >= 1".into(),
            ));
        }
        Ok(())
    }

    /// Minimum component width in mask cells, as handed to the labeler.
    ///
    /// `cells > min / scale` is the same test as `cells * scale > min` for integers.
    pub fn min_component_cells(&self) -> (u32, u32) {
        let s = self.scale.max(1);
        (self.min_component_width / s, self.min_component_height / s)
    }

    /// Create a fluent builder for `SlicerConfig`.
    pub fn builder() -> SlicerConfigBuilder {
        SlicerConfigBuilder::new()
    }
}

fn default_scale() -> u32 {
    2
}
fn default_alpha_threshold() -> u8 {
    10
}
fn default_dilation_passes() -> u32 {
    3
}
fn default_min_component() -> u32 {
    20
}
fn default_refinement_padding() -> u32 {
    5
}
fn default_canvas_size() -> u32 {
    256
}

/// Builder for `SlicerConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct SlicerConfigBuilder {
    cfg: SlicerConfig,
}

impl SlicerConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: SlicerConfig::default(),
        }
    }
    pub fn scale(mut self, v: u32) -> Self {
        self.cfg.scale = v;
        self
    }
    pub fn alpha_threshold(mut self, v: u8) -> Self {
        self.cfg.alpha_threshold = v;
        self
    }
    pub fn dilation_passes(mut self, v: u32) -> Self {
        self.cfg.dilation_passes = v;
        self
    }
    pub fn min_component(mut self, w: u32, h: u32) -> Self {
        self.cfg.min_component_width = w;
        self.cfg.min_component_height = h;
        self
    }
    pub fn refinement_padding(mut self, v: u32) -> Self {
        self.cfg.refinement_padding = v;
        self
    }
    pub fn canvas_size(mut self, v: u32) -> Self {
        self.cfg.canvas_size = v;
        self
    }
    pub fn build(self) -> SlicerConfig {
        self.cfg
    }
}
