use crate::types::{Pt, Size};
use image::GenericImageView;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

pub const HEADER_IMAGE_FILE: &str = "header.png";
pub const FOOTER_IMAGE_FILE: &str = "footer.png";
pub const DISCLAIMER_FILE: &str = "disclaimer.txt";
pub const VERSION_FILE: &str = "version.txt";

pub const DEFAULT_DISCLAIMER: &str = "DISCLAIMER: Materials, products, and services are provided under our standard terms and conditions.";
pub const DEFAULT_VERSION: &str = "1.0";

/// A decoded-enough raster asset: the raw bytes travel to the PDF writer
/// verbatim, only the pixel dimensions are probed up front. The resource id
/// is derived from the content digest, so identical art dedupes and the
/// output stays byte-stable run to run.
#[derive(Debug, Clone)]
pub struct RasterAsset {
    bytes: Vec<u8>,
    width_px: u32,
    height_px: u32,
    resource_id: String,
}

impl RasterAsset {
    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        let decoded = image::load_from_memory(&bytes).ok()?;
        let (width_px, height_px) = decoded.dimensions();
        if width_px == 0 || height_px == 0 {
            return None;
        }
        let digest = Sha256::digest(&bytes);
        let mut resource_id = String::with_capacity(20);
        resource_id.push_str("img-");
        for byte in digest.iter().take(8) {
            resource_id.push_str(&format!("{:02x}", byte));
        }
        Some(Self {
            bytes,
            width_px,
            height_px,
            resource_id,
        })
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Natural size, treating one pixel as one point.
    pub fn natural_size(&self) -> Size {
        Size {
            width: Pt::from_milli_i64(self.width_px as i64 * 1000),
            height: Pt::from_milli_i64(self.height_px as i64 * 1000),
        }
    }

    /// Scale down (never up) to fit `max_width`, preserving aspect ratio,
    /// then clamp the height to `max_height` the same way. `max_height` is
    /// how the page geometry guarantees a decoration band can never swallow
    /// the content frame.
    pub fn scaled_size(&self, max_width: Pt, max_height: Pt) -> Size {
        let natural = self.natural_size();
        let mut size = if natural.width <= max_width {
            natural
        } else {
            Size {
                width: max_width,
                height: max_width.mul_ratio(self.height_px as i32, self.width_px as i32),
            }
        };
        if size.height > max_height {
            size = Size {
                width: size.width.mul_div(max_height, size.height),
                height: max_height,
            };
        }
        size
    }
}

/// Reserved band height contributed by an optional image: zero when absent.
pub fn scaled_height(asset: Option<&RasterAsset>, max_width: Pt, max_height: Pt) -> Pt {
    asset
        .map(|asset| asset.scaled_size(max_width, max_height).height)
        .unwrap_or(Pt::ZERO)
}

/// The optional decoration inputs: header/footer art plus disclaimer and
/// version text. Each loads independently and degrades to absent or to a
/// documented default; a missing or corrupt asset never fails a generation.
#[derive(Debug, Clone)]
pub struct PageAssets {
    pub header: Option<RasterAsset>,
    pub footer: Option<RasterAsset>,
    pub disclaimer: String,
    pub version: String,
}

impl Default for PageAssets {
    fn default() -> Self {
        Self {
            header: None,
            footer: None,
            disclaimer: DEFAULT_DISCLAIMER.to_string(),
            version: DEFAULT_VERSION.to_string(),
        }
    }
}

impl PageAssets {
    /// Load the four well-known files from `dir`. Failures are logged and
    /// swallowed; they are the expected state for optional assets.
    pub fn load(dir: &Path) -> Self {
        Self {
            header: load_image(dir, HEADER_IMAGE_FILE),
            footer: load_image(dir, FOOTER_IMAGE_FILE),
            disclaimer: load_text(dir, DISCLAIMER_FILE, DEFAULT_DISCLAIMER),
            version: load_text(dir, VERSION_FILE, DEFAULT_VERSION),
        }
    }

    /// Resource id -> raw bytes for every image the decoration can draw.
    pub(crate) fn image_resources(&self) -> BTreeMap<String, Vec<u8>> {
        let mut resources = BTreeMap::new();
        for asset in [self.header.as_ref(), self.footer.as_ref()].into_iter().flatten() {
            resources.insert(asset.resource_id().to_string(), asset.bytes().to_vec());
        }
        resources
    }
}

fn load_image(dir: &Path, name: &str) -> Option<RasterAsset> {
    let path = dir.join(name);
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "image asset unavailable");
            return None;
        }
    };
    let asset = RasterAsset::from_bytes(bytes);
    if asset.is_none() {
        tracing::debug!(path = %path.display(), "image asset undecodable, omitting");
    }
    asset
}

fn load_text(dir: &Path, name: &str, default: &str) -> String {
    let path = dir.join(name);
    match std::fs::read_to_string(&path) {
        Ok(text) => text.trim().to_string(),
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "text asset unavailable, using default");
            default.to_string()
        }
    }
}
