use crate::error::RenderError;

/// Millimetres per device pixel at the 72 dpi reference resolution.
pub const REFERENCE_PIXEL_UNIT_MM: f64 = 25.4 / 72.0;

/// Lighten/darken amount used for groove, ridge, inset and outset borders.
pub const DEFAULT_SHADE_FACTOR: f32 = 0.4;

#[derive(Debug, Clone, PartialEq)]
pub struct RasterConfig {
    scale_factor: f64,
    pixel_unit_to_millimeter: f64,
    antialiasing: bool,
    quality_rendering: bool,
    page_frame: bool,
    shade_factor: f32,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            pixel_unit_to_millimeter: REFERENCE_PIXEL_UNIT_MM,
            antialiasing: true,
            quality_rendering: true,
            page_frame: true,
            shade_factor: DEFAULT_SHADE_FACTOR,
        }
    }
}

impl RasterConfig {
    pub fn builder() -> RasterConfigBuilder {
        RasterConfigBuilder::new()
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn pixel_unit_to_millimeter(&self) -> f64 {
        self.pixel_unit_to_millimeter
    }

    pub fn antialiasing(&self) -> bool {
        self.antialiasing
    }

    pub fn quality_rendering(&self) -> bool {
        self.quality_rendering
    }

    pub fn page_frame(&self) -> bool {
        self.page_frame
    }

    pub fn shade_factor(&self) -> f32 {
        self.shade_factor
    }

    /// Device pixels per point along each axis.
    pub fn device_scale(&self) -> f64 {
        self.scale_factor * (REFERENCE_PIXEL_UNIT_MM / self.pixel_unit_to_millimeter)
    }

    /// Applies `AREAPAINT_SCALE`, `AREAPAINT_ANTIALIAS` and
    /// `AREAPAINT_PAGE_FRAME` on top of `self`.
    pub fn from_env(self) -> Result<RasterConfig, RenderError> {
        let mut builder = RasterConfigBuilder::from_config(self);
        if let Ok(raw) = std::env::var("AREAPAINT_SCALE") {
            let value = raw.trim().parse::<f64>().map_err(|_| {
                RenderError::InvalidConfiguration(format!("AREAPAINT_SCALE={raw:?} is not a number"))
            })?;
            builder = builder.scale_factor(value);
        }
        if let Some(enabled) = env_flag("AREAPAINT_ANTIALIAS") {
            builder = builder.antialiasing(enabled);
        }
        if let Some(enabled) = env_flag("AREAPAINT_PAGE_FRAME") {
            builder = builder.page_frame(enabled);
        }
        builder.build()
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false"))
}

#[derive(Debug, Clone)]
pub struct RasterConfigBuilder {
    config: RasterConfig,
}

impl Default for RasterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RasterConfig::default(),
        }
    }

    fn from_config(config: RasterConfig) -> Self {
        Self { config }
    }

    /// User zoom, in `(0, 1]`.
    pub fn scale_factor(mut self, value: f64) -> Self {
        self.config.scale_factor = value;
        self
    }

    /// Size of one target device pixel in millimetres.
    pub fn pixel_unit_to_millimeter(mut self, value: f64) -> Self {
        self.config.pixel_unit_to_millimeter = value;
        self
    }

    pub fn target_resolution_dpi(self, dpi: f64) -> Self {
        self.pixel_unit_to_millimeter(25.4 / dpi)
    }

    pub fn antialiasing(mut self, enabled: bool) -> Self {
        self.config.antialiasing = enabled;
        self
    }

    pub fn quality_rendering(mut self, enabled: bool) -> Self {
        self.config.quality_rendering = enabled;
        self
    }

    // White page with a black drop-shadow frame around the nominal page area.
    pub fn page_frame(mut self, enabled: bool) -> Self {
        self.config.page_frame = enabled;
        self
    }

    pub fn shade_factor(mut self, value: f32) -> Self {
        self.config.shade_factor = value;
        self
    }

    pub fn build(self) -> Result<RasterConfig, RenderError> {
        let config = self.config;
        if !config.scale_factor.is_finite()
            || config.scale_factor <= 0.0
            || config.scale_factor > 1.0
        {
            return Err(RenderError::InvalidConfiguration(format!(
                "scale_factor must be in (0, 1], got {}",
                config.scale_factor
            )));
        }
        if !config.pixel_unit_to_millimeter.is_finite() || config.pixel_unit_to_millimeter <= 0.0 {
            return Err(RenderError::InvalidConfiguration(format!(
                "pixel_unit_to_millimeter must be > 0, got {}",
                config.pixel_unit_to_millimeter
            )));
        }
        if !config.shade_factor.is_finite() || !(0.0..=1.0).contains(&config.shade_factor) {
            return Err(RenderError::InvalidConfiguration(format!(
                "shade_factor must be in [0, 1], got {}",
                config.shade_factor
            )));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_render_at_reference_resolution() {
        let config = RasterConfig::builder().build().unwrap();
        assert!((config.device_scale() - 1.0).abs() < 1e-12);
        assert!(config.antialiasing());
        assert!(config.page_frame());
        assert_eq!(config.shade_factor(), DEFAULT_SHADE_FACTOR);
    }

    #[test]
    fn scale_factor_outside_unit_interval_is_rejected() {
        for bad in [0.0, -0.5, 1.5, f64::NAN] {
            let err = RasterConfig::builder().scale_factor(bad).build().unwrap_err();
            assert!(matches!(err, RenderError::InvalidConfiguration(_)));
        }
        assert!(RasterConfig::builder().scale_factor(1.0).build().is_ok());
    }

    #[test]
    fn target_resolution_changes_device_scale() {
        let config = RasterConfig::builder()
            .target_resolution_dpi(144.0)
            .scale_factor(0.5)
            .build()
            .unwrap();
        assert!((config.device_scale() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn non_positive_pixel_unit_is_rejected() {
        let err = RasterConfig::builder()
            .pixel_unit_to_millimeter(0.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidConfiguration(_)));
    }

    #[test]
    fn shade_factor_is_bounded() {
        assert!(RasterConfig::builder().shade_factor(0.6).build().is_ok());
        assert!(RasterConfig::builder().shade_factor(1.2).build().is_err());
    }

    // Only this test touches the AREAPAINT_* variables, so it owns the
    // process environment for its duration.
    #[test]
    fn environment_overrides_apply_on_top_of_config() {
        let vars = ["AREAPAINT_SCALE", "AREAPAINT_ANTIALIAS", "AREAPAINT_PAGE_FRAME"];
        let set = |name: &str, value: &str| unsafe { std::env::set_var(name, value) };
        let unset_all = || {
            for name in vars {
                unsafe { std::env::remove_var(name) };
            }
        };
        let base = || RasterConfig::builder().build().unwrap();

        unset_all();
        let config = base().from_env().unwrap();
        assert_eq!(config.scale_factor(), 1.0);
        assert!(config.antialiasing());
        assert!(config.page_frame());

        set("AREAPAINT_SCALE", " 0.5 ");
        set("AREAPAINT_ANTIALIAS", "0");
        set("AREAPAINT_PAGE_FRAME", "FALSE");
        let config = base().from_env().unwrap();
        assert_eq!(config.scale_factor(), 0.5);
        assert!(!config.antialiasing());
        assert!(!config.page_frame());

        set("AREAPAINT_ANTIALIAS", "yes");
        set("AREAPAINT_PAGE_FRAME", "");
        let config = RasterConfig::builder()
            .antialiasing(false)
            .build()
            .unwrap()
            .from_env()
            .unwrap();
        assert!(config.antialiasing());
        assert!(!config.page_frame());

        set("AREAPAINT_SCALE", "half");
        let err = base().from_env().unwrap_err();
        assert!(matches!(err, RenderError::InvalidConfiguration(ref msg) if msg.contains("AREAPAINT_SCALE")));

        set("AREAPAINT_SCALE", "2.0");
        assert!(matches!(
            base().from_env(),
            Err(RenderError::InvalidConfiguration(_))
        ));

        unset_all();
    }
}
