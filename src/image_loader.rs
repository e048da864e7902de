use std::collections::HashMap;
use std::fmt;
use std::path::Path as FsPath;
use std::sync::{Arc, Mutex};

use base64::Engine;
use tiny_skia::Pixmap;

use crate::area::AreaContent;
use crate::types::Pt;

/// What an image reference resolved to.
#[derive(Clone)]
pub enum LoadedImage {
    /// Decoded, premultiplied RGBA pixels.
    Bitmap(Arc<Pixmap>),
    /// Vector/XML content painted by this engine into the image bounds.
    /// `width`/`height` are its intrinsic size.
    Delegated {
        content: Arc<dyn AreaContent>,
        width: Pt,
        height: Pt,
    },
    Unsupported {
        mime: String,
    },
    Missing,
}

impl fmt::Debug for LoadedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadedImage::Bitmap(pixmap) => f
                .debug_tuple("Bitmap")
                .field(&(pixmap.width(), pixmap.height()))
                .finish(),
            LoadedImage::Delegated { width, height, .. } => f
                .debug_struct("Delegated")
                .field("width", width)
                .field("height", height)
                .finish(),
            LoadedImage::Unsupported { mime } => {
                f.debug_struct("Unsupported").field("mime", mime).finish()
            }
            LoadedImage::Missing => f.write_str("Missing"),
        }
    }
}

/// Image loading service consulted by `draw_image`.
pub trait ImageLoader: Send + Sync {
    fn load(&self, url: &str) -> LoadedImage;

    /// Drops anything retained from earlier loads.
    fn clear(&self) {}
}

/// Loads `data:` URIs and file paths, decoding PNG and JPEG.
#[derive(Default)]
pub struct DefaultImageLoader {
    cache: Mutex<HashMap<String, LoadedImage>>,
}

impl DefaultImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of URLs currently cached.
    pub fn cached(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }
}

impl ImageLoader for DefaultImageLoader {
    fn load(&self, url: &str) -> LoadedImage {
        if let Ok(cache) = self.cache.lock() {
            if let Some(hit) = cache.get(url) {
                return hit.clone();
            }
        }
        let loaded = load_uncached(url);
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(url.to_string(), loaded.clone());
        }
        loaded
    }

    fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }
}

fn load_uncached(url: &str) -> LoadedImage {
    let (bytes, mime) = if let Some((mime, data)) = parse_data_uri(url) {
        (data, Some(mime))
    } else {
        match std::fs::read(FsPath::new(url)) {
            Ok(bytes) => (bytes, None),
            Err(err) => {
                log::debug!("image {url} not readable: {err}");
                return LoadedImage::Missing;
            }
        }
    };
    if let Some(mime) = mime.as_deref() {
        if is_vector_mime(mime) {
            return LoadedImage::Unsupported {
                mime: mime.to_string(),
            };
        }
    }
    if sniff_eps(&bytes) {
        return LoadedImage::Unsupported {
            mime: "image/eps".to_string(),
        };
    }
    match decode_image_to_pixmap(&bytes, mime.as_deref()) {
        Some(pixmap) => LoadedImage::Bitmap(Arc::new(pixmap)),
        None => LoadedImage::Unsupported {
            mime: mime.unwrap_or_else(|| "application/octet-stream".to_string()),
        },
    }
}

fn is_vector_mime(mime: &str) -> bool {
    matches!(
        mime,
        "image/svg+xml" | "text/xml" | "application/xml" | "image/eps" | "application/postscript"
    )
}

fn sniff_eps(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%!PS") || bytes.starts_with(&[0xC5, 0xD0, 0xD3, 0xC6])
}

pub(crate) fn decode_image_to_pixmap(data: &[u8], mime: Option<&str>) -> Option<Pixmap> {
    let guessed_format = match mime {
        Some(mime) if mime.contains("png") => Some(image::ImageFormat::Png),
        Some(mime) if mime.contains("jpeg") || mime.contains("jpg") => {
            Some(image::ImageFormat::Jpeg)
        }
        Some(_) => None,
        None => image::guess_format(data).ok(),
    };

    let decoded = match guessed_format {
        Some(fmt) => image::load_from_memory_with_format(data, fmt).ok()?,
        None => image::load_from_memory(data).ok()?,
    };
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut pixmap = Pixmap::new(width, height)?;
    for (src_px, dst_px) in rgba
        .as_raw()
        .chunks_exact(4)
        .zip(pixmap.data_mut().chunks_exact_mut(4))
    {
        let a = src_px[3];
        dst_px[0] = premul_u8(src_px[0], a);
        dst_px[1] = premul_u8(src_px[1], a);
        dst_px[2] = premul_u8(src_px[2], a);
        dst_px[3] = a;
    }
    Some(pixmap)
}

fn premul_u8(channel: u8, alpha: u8) -> u8 {
    let prod = (channel as u16) * (alpha as u16) + 127;
    ((prod + (prod >> 8)) >> 8) as u8
}

fn parse_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header
        .split(';')
        .next()
        .filter(|v| !v.is_empty())
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = if header.contains(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .ok()?
    } else {
        payload.as_bytes().to_vec()
    };
    Some((mime, data))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::RgbaImage;

    pub(crate) fn png_data_uri(pixels: &[[u8; 4]], width: u32, height: u32) -> String {
        let mut src = RgbaImage::new(width, height);
        for (idx, px) in pixels.iter().enumerate() {
            let idx = idx as u32;
            src.put_pixel(idx % width, idx / width, image::Rgba(*px));
        }
        let mut bytes = Vec::new();
        src.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        )
    }

    #[test]
    fn parse_data_uri_base64_decodes_payload() {
        let (mime, data) = parse_data_uri("data:text/plain;base64,SGVsbG8=").unwrap();
        assert_eq!(mime, "text/plain");
        assert_eq!(data, b"Hello");
        assert!(parse_data_uri("file.png").is_none());
    }

    #[test]
    fn png_data_uri_decodes_premultiplied() {
        let uri = png_data_uri(&[[255, 0, 0, 128]], 1, 1);
        let LoadedImage::Bitmap(pixmap) = DefaultImageLoader::new().load(&uri) else {
            panic!("expected bitmap");
        };
        assert_eq!((pixmap.width(), pixmap.height()), (1, 1));
        let px = pixmap.pixel(0, 0).unwrap();
        assert_eq!(px.alpha(), 128);
        assert_eq!(px.red(), 128);
    }

    #[test]
    fn clear_empties_the_cache() {
        let loader = DefaultImageLoader::new();
        loader.load(&png_data_uri(&[[0, 0, 0, 255]], 1, 1));
        loader.load(&png_data_uri(&[[255, 255, 255, 255]], 1, 1));
        assert_eq!(loader.cached(), 2);
        loader.clear();
        assert_eq!(loader.cached(), 0);
    }

    #[test]
    fn svg_and_eps_are_reported_unsupported() {
        let loader = DefaultImageLoader::new();
        match loader.load("data:image/svg+xml,<svg/>") {
            LoadedImage::Unsupported { mime } => assert_eq!(mime, "image/svg+xml"),
            other => panic!("unexpected {other:?}"),
        }
        match loader.load("data:application/octet-stream,%!PS-Adobe-3.0 EPSF-3.0") {
            LoadedImage::Unsupported { mime } => assert_eq!(mime, "image/eps"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_reported_missing() {
        let loader = DefaultImageLoader::new();
        assert!(matches!(
            loader.load("no-such-image-for-areapaint.png"),
            LoadedImage::Missing
        ));
    }

    #[test]
    fn garbage_bytes_are_unsupported() {
        let loader = DefaultImageLoader::new();
        assert!(matches!(
            loader.load("data:image/png;base64,AAAA"),
            LoadedImage::Unsupported { .. }
        ));
    }
}
