//! Final artifacts from composed SVG.
//!
//! SVG is written as composed. PNG is rasterized with resvg at the
//! configured density and PDF is converted from the same usvg tree, so all
//! three formats share one font database.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use usvg::fontdb;

use poster_common::{OutputFormat, PosterError, PosterResult};

use crate::canvas::POINTS_PER_INCH;
use crate::png;

/// Fonts available to text rendering. Loaded once, shared by every render.
#[derive(Clone)]
pub struct FontContext {
    db: Arc<fontdb::Database>,
    family: String,
}

impl FontContext {
    /// System fonts plus every font file under `font_dir`.
    pub fn load(family: &str, font_dir: Option<&Path>) -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        if let Some(dir) = font_dir {
            if dir.is_dir() {
                db.load_fonts_dir(dir);
            } else {
                warn!(dir = %dir.display(), "Font directory not found, using system fonts");
            }
        }
        Self::from_database(db, family)
    }

    /// No fonts at all; text is dropped from rasters. For tests.
    pub fn empty() -> Self {
        Self::from_database(fontdb::Database::new(), "sans-serif")
    }

    fn from_database(mut db: fontdb::Database, family: &str) -> Self {
        let available = db
            .faces()
            .any(|face| face.families.iter().any(|(name, _)| name == family));
        if available {
            db.set_sans_serif_family(family);
        }
        debug!(faces = db.len(), family, available, "Font database ready");
        Self {
            db: Arc::new(db),
            family: family.to_string(),
        }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    fn parse(&self, svg: &str) -> PosterResult<usvg::Tree> {
        let mut opt = usvg::Options::default();
        opt.font_family = self.family.clone();
        opt.fontdb = Arc::clone(&self.db);
        usvg::Tree::from_str(svg, &opt)
            .map_err(|e| PosterError::RenderError(format!("SVG parse failed: {}", e)))
    }

    /// Rasterize at `dpi` and encode as PNG with density metadata.
    pub fn rasterize(&self, svg: &str, dpi: u32) -> PosterResult<Vec<u8>> {
        let tree = self.parse(svg)?;
        let scale = dpi as f32 / POINTS_PER_INCH as f32;
        let size = tree.size();
        let width = (size.width() * scale).round() as u32;
        let height = (size.height() * scale).round() as u32;

        let mut pixmap = tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
            PosterError::RenderError(format!("cannot allocate {}x{} pixmap", width, height))
        })?;
        let transform = tiny_skia::Transform::from_scale(scale, scale);
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        png::encode_pixmap(&pixmap, Some(dpi)).map_err(PosterError::RenderError)
    }

    /// Vector PDF with one page the size of the poster.
    pub fn to_pdf(&self, svg: &str) -> PosterResult<Vec<u8>> {
        let tree = self.parse(svg)?;
        Ok(svg2pdf::to_pdf(
            &tree,
            svg2pdf::ConversionOptions::default(),
            svg2pdf::PageOptions::default(),
        ))
    }

    /// Encode composed SVG in `format`.
    pub fn encode(&self, svg: &str, format: OutputFormat, dpi: u32) -> PosterResult<Vec<u8>> {
        match format {
            OutputFormat::Svg => Ok(svg.as_bytes().to_vec()),
            OutputFormat::Png => self.rasterize(svg, dpi),
            OutputFormat::Pdf => self.to_pdf(svg),
        }
    }
}

impl std::fmt::Debug for FontContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontContext")
            .field("family", &self.family)
            .field("faces", &self.db.len())
            .finish()
    }
}

/// Write bytes, creating parent directories.
pub async fn write_artifact(path: &Path, bytes: &[u8]) -> PosterResult<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    info!(path = %path.display(), bytes = bytes.len(), "Poster saved");
    Ok(path.to_path_buf())
}
