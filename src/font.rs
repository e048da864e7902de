use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tiny_skia::PathBuilder;
use ttf_parser::{GlyphId, OutlineBuilder};

use crate::error::{RenderError, Result};

#[derive(Debug)]
pub struct RegisteredFont {
    pub name: String,
    data: Arc<Vec<u8>>,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
}

impl RegisteredFont {
    pub fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    /// Ascent above the baseline for `size`, in points.
    pub fn ascender(&self, size: f32) -> f32 {
        self.ascender as f32 * size / self.units_per_em.max(1) as f32
    }

    /// Descent below the baseline for `size`, in points (positive).
    pub fn descender(&self, size: f32) -> f32 {
        -(self.descender as f32) * size / self.units_per_em.max(1) as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphPlacement {
    pub glyph_id: u16,
    pub origin_x: f32,
    pub origin_y: f32,
    pub scale: f32,
}

/// Font programs known to the renderer, keyed by every name they answer to.
#[derive(Debug, Default)]
pub struct FontRegistry {
    fonts: Vec<RegisteredFont>,
    lookup: HashMap<String, usize>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Registers every `.ttf`/`.otf` file in `path`; returns how many loaded.
    pub fn register_dir(&mut self, path: impl AsRef<Path>) -> usize {
        let Ok(entries) = fs::read_dir(path.as_ref()) else {
            return 0;
        };
        let mut loaded = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            match self.register_file(&path) {
                Ok(_) => loaded += 1,
                Err(err) => log::debug!("skipping font {}: {err}", path.display()),
            }
        }
        loaded
    }

    pub fn register_file(&mut self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|v| v.to_str())
            .map(|v| v.to_ascii_lowercase());
        if !matches!(ext.as_deref(), Some("ttf") | Some("otf")) {
            return Err(RenderError::Font(format!(
                "unsupported font file {}",
                path.display()
            )));
        }
        let data = fs::read(path)?;
        let stem = path.file_stem().and_then(|v| v.to_str());
        self.register_bytes(data, stem)
    }

    /// Registers a font program. `alias` is an extra lookup name.
    pub fn register_bytes(&mut self, data: Vec<u8>, alias: Option<&str>) -> Result<String> {
        let source = alias.unwrap_or("EmbeddedFont");
        let face = ttf_parser::Face::parse(&data, 0)
            .map_err(|err| RenderError::Font(format!("invalid font data for {source}: {err}")))?;

        let (name, mut aliases) = font_names(&face);
        let name = name.unwrap_or_else(|| source.to_string());
        if let Some(alias) = alias {
            aliases.push(alias.to_string());
        }
        let units_per_em = face.units_per_em();
        let ascender = face.ascender();
        let descender = face.descender();
        drop(face);

        let index = self.fonts.len();
        self.fonts.push(RegisteredFont {
            name: name.clone(),
            data: Arc::new(data),
            units_per_em,
            ascender,
            descender,
        });
        for alias in std::iter::once(name.clone()).chain(aliases) {
            let key = normalize_name(&alias);
            if key.is_empty() || self.lookup.contains_key(&key) {
                continue;
            }
            self.lookup.insert(key, index);
        }
        Ok(name)
    }

    pub fn resolve(&self, name: &str) -> Option<&RegisteredFont> {
        let key = normalize_name(name);
        self.lookup
            .get(&key)
            .and_then(|index| self.fonts.get(*index))
    }

    /// Baseline offset from the top of a line box, in points.
    pub fn ascender(&self, name: &str, size: f32) -> Option<f32> {
        self.resolve(name).map(|font| font.ascender(size))
    }

    /// Glyph origins for `text` starting at the baseline point `(x, y)`.
    pub fn layout(&self, name: &str, size: f32, text: &str, x: f32, y: f32) -> Vec<GlyphPlacement> {
        let Some(font) = self.resolve(name) else {
            return Vec::new();
        };
        let Ok(face) = ttf_parser::Face::parse(font.data(), 0) else {
            return Vec::new();
        };
        let units_per_em = face.units_per_em().max(1) as f32;
        let scale = size / units_per_em;

        let mut out = Vec::new();
        let mut pen_x = 0.0f32;
        for ch in text.chars() {
            let gid = face.glyph_index(ch).map(|id| id.0).unwrap_or(0);
            if gid == 0 {
                pen_x += size * 0.5;
                continue;
            }
            out.push(GlyphPlacement {
                glyph_id: gid,
                origin_x: x + pen_x,
                origin_y: y,
                scale,
            });
            let advance_units = face.glyph_hor_advance(GlyphId(gid)).unwrap_or(0) as f32;
            let mut adv = advance_units * scale;
            if adv <= 0.0 {
                adv = size * 0.5;
            }
            pen_x += adv;
        }
        out
    }

    /// Outlines of `text` as one path per glyph, in y-down page space.
    pub fn glyph_paths(
        &self,
        name: &str,
        size: f32,
        text: &str,
        x: f32,
        y: f32,
    ) -> Vec<tiny_skia::Path> {
        let Some(font) = self.resolve(name) else {
            return Vec::new();
        };
        let Ok(face) = ttf_parser::Face::parse(font.data(), 0) else {
            return Vec::new();
        };
        self.layout(name, size, text, x, y)
            .into_iter()
            .filter_map(|placement| {
                let mut builder =
                    GlyphPathBuilder::new(placement.origin_x, placement.origin_y, placement.scale);
                face.outline_glyph(GlyphId(placement.glyph_id), &mut builder)?;
                builder.finish()
            })
            .collect()
    }
}

// Font units are y-up; page space is y-down.
struct GlyphPathBuilder {
    builder: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn new(origin_x: f32, origin_y: f32, scale: f32) -> Self {
        Self {
            builder: PathBuilder::new(),
            origin_x,
            origin_y,
            scale,
        }
    }

    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.origin_y - y * self.scale)
    }

    fn finish(self) -> Option<tiny_skia::Path> {
        self.builder.finish()
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

fn font_names(face: &ttf_parser::Face<'_>) -> (Option<String>, Vec<String>) {
    use ttf_parser::name::name_id;

    let mut family = None;
    let mut full = None;
    let mut post = None;

    for entry in face.names() {
        let Some(name) = entry.to_string() else {
            continue;
        };
        match entry.name_id {
            name_id::TYPOGRAPHIC_FAMILY | name_id::FAMILY => {
                if family.is_none() {
                    family = Some(name);
                }
            }
            name_id::FULL_NAME => {
                if full.is_none() {
                    full = Some(name);
                }
            }
            name_id::POST_SCRIPT_NAME => {
                if post.is_none() {
                    post = Some(name);
                }
            }
            _ => {}
        }
    }

    let primary = post.clone().or_else(|| full.clone()).or_else(|| family.clone());
    let aliases = [family, full, post]
        .into_iter()
        .flatten()
        .filter(|candidate| Some(candidate) != primary.as_ref())
        .collect();
    (primary, aliases)
}

fn normalize_name(name: &str) -> String {
    name.trim()
        .trim_matches('"')
        .trim_matches('\'')
        .to_ascii_lowercase()
}
