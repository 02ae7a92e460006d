//! Render surfaces: fixed-width raster targets for the two preview roles

use crate::error::{PreviewError, Result};
use crate::filters::FilterId;
use crate::image_state::{ImageRole, LogicalImage};
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};

/// Default display width of both surfaces
pub const DEFAULT_SURFACE_WIDTH: u32 = 400;

/// Largest height a surface may take, matching common canvas limits
pub const MAX_SURFACE_DIMENSION: u32 = 32_767;

/// Height of a surface of `surface_width` showing a `source_width` x `source_height` image
///
/// Rounded to the nearest pixel, never below one.
#[must_use]
pub fn scaled_height(source_width: u32, source_height: u32, surface_width: u32) -> u32 {
    if source_width == 0 {
        return 1;
    }
    let height = f64::from(source_height) * (f64::from(surface_width) / f64::from(source_width));
    (height.round() as u32).max(1)
}

/// [`scaled_height`], rejecting images whose surface would exceed [`MAX_SURFACE_DIMENSION`]
///
/// # Errors
/// `DecodeFailed` naming the source and derived dimensions.
pub fn checked_height(source_width: u32, source_height: u32, surface_width: u32) -> Result<u32> {
    let height = scaled_height(source_width, source_height, surface_width);
    if height > MAX_SURFACE_DIMENSION {
        return Err(PreviewError::decode(format!(
            "{}x{} image needs a {}x{} surface, limit is {}",
            source_width, source_height, surface_width, height, MAX_SURFACE_DIMENSION
        )));
    }
    Ok(height)
}

/// Filter actually drawn on the surface for `role`; the original is never filtered
#[must_use]
pub fn filter_for(role: ImageRole, filter: FilterId) -> FilterId {
    match role {
        ImageRole::Original => FilterId::None,
        ImageRole::Transformed => filter,
    }
}

/// A raster drawing target
#[derive(Debug, Clone)]
pub struct Surface {
    role: ImageRole,
    width: u32,
    pixels: RgbaImage,
    filter: FilterId,
}

impl Surface {
    #[must_use]
    pub fn new(role: ImageRole, width: u32) -> Self {
        Self {
            role,
            width: width.max(1),
            pixels: RgbaImage::new(0, 0),
            filter: FilterId::None,
        }
    }

    /// Resize to the derived height, clear, draw `image` scaled to fill, apply `filter`
    ///
    /// Deterministic: the same image and filter always give identical pixels.
    /// Heights beyond [`MAX_SURFACE_DIMENSION`] are clamped.
    pub fn render(&mut self, image: &LogicalImage, filter: FilterId) {
        let height =
            scaled_height(image.width(), image.height(), self.width).min(MAX_SURFACE_DIMENSION);
        let mut pixels = scale_to(image.image(), self.width, height);
        filter.chain().apply(&mut pixels);
        tracing::trace!(
            role = %self.role,
            width = self.width,
            height,
            filter = %filter,
            "Surface rendered"
        );
        self.pixels = pixels;
        self.filter = filter;
    }

    /// Draw `image` onto a fresh surface on the blocking pool
    ///
    /// # Errors
    /// `Internal` if the render task panics.
    pub async fn render_detached(
        role: ImageRole,
        width: u32,
        image: LogicalImage,
        filter: FilterId,
    ) -> Result<Self> {
        let span = tracing::Span::current();
        tokio::task::spawn_blocking(move || {
            let _entered = span.entered();
            let mut surface = Self::new(role, width);
            surface.render(&image, filter);
            surface
        })
        .await
        .map_err(|e| PreviewError::internal(format!("render task failed: {}", e)))
    }

    /// Replace the content with `background` beneath `foreground`, both at the current size
    ///
    /// Each layer goes through `filter` before it is drawn. Returns `false` (and
    /// leaves the surface alone) when nothing has been drawn yet.
    pub fn composite(
        &mut self,
        background: &DynamicImage,
        foreground: &LogicalImage,
        filter: FilterId,
    ) -> bool {
        if !self.is_drawn() {
            return false;
        }
        let (width, height) = self.pixels.dimensions();
        let chain = filter.chain();

        let mut canvas = scale_to(background, width, height);
        chain.apply(&mut canvas);
        let mut top = scale_to(foreground.image(), width, height);
        chain.apply(&mut top);
        imageops::overlay(&mut canvas, &top, 0, 0);

        self.pixels = canvas;
        self.filter = filter;
        true
    }

    #[must_use]
    pub fn role(&self) -> ImageRole {
        self.role
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Current height; zero until the first draw
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    #[must_use]
    pub fn is_drawn(&self) -> bool {
        self.pixels.height() > 0
    }

    /// Filter applied at the last draw
    #[must_use]
    pub fn filter(&self) -> FilterId {
        self.filter
    }

    #[must_use]
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Snapshot of the current content
    #[must_use]
    pub fn to_rgba(&self) -> RgbaImage {
        self.pixels.clone()
    }
}

fn scale_to(image: &DynamicImage, width: u32, height: u32) -> RgbaImage {
    if image.width() == width && image.height() == height {
        return image.to_rgba8();
    }
    imageops::resize(image, width, height, FilterType::Triangle)
}

/// The original and transformed surfaces
#[derive(Debug, Clone)]
pub struct SurfacePair {
    original: Surface,
    transformed: Surface,
}

impl SurfacePair {
    #[must_use]
    pub fn new(width: u32) -> Self {
        Self {
            original: Surface::new(ImageRole::Original, width),
            transformed: Surface::new(ImageRole::Transformed, width),
        }
    }

    #[must_use]
    pub fn get(&self, role: ImageRole) -> &Surface {
        match role {
            ImageRole::Original => &self.original,
            ImageRole::Transformed => &self.transformed,
        }
    }

    pub fn get_mut(&mut self, role: ImageRole) -> &mut Surface {
        match role {
            ImageRole::Original => &mut self.original,
            ImageRole::Transformed => &mut self.transformed,
        }
    }

    /// Install a surface rendered elsewhere in the slot for its role
    pub fn replace(&mut self, surface: Surface) {
        let role = surface.role();
        *self.get_mut(role) = surface;
    }

    /// Draw `image` on the surface for `role`
    ///
    /// The original surface is never filtered. No image means nothing is drawn
    /// and `false` is returned.
    pub fn render_role(
        &mut self,
        role: ImageRole,
        image: Option<&LogicalImage>,
        filter: FilterId,
    ) -> bool {
        let Some(image) = image else {
            return false;
        };
        self.get_mut(role).render(image, filter_for(role, filter));
        true
    }
}

impl Default for SurfacePair {
    fn default() -> Self {
        Self::new(DEFAULT_SURFACE_WIDTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> LogicalImage {
        LogicalImage::from_image(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba(color),
        )))
        .unwrap()
    }

    #[test]
    fn test_scaled_height() {
        assert_eq!(scaled_height(300, 200, 400), 267);
        assert_eq!(scaled_height(400, 400, 400), 400);
        assert_eq!(scaled_height(800, 600, 400), 300);
        assert_eq!(scaled_height(4000, 1, 400), 1);
        assert_eq!(scaled_height(0, 10, 400), 1);
    }

    #[test]
    fn test_checked_height_rejects_oversized_surfaces() {
        assert_eq!(checked_height(300, 200, 400).unwrap(), 267);
        assert_eq!(checked_height(400, MAX_SURFACE_DIMENSION, 400).unwrap(), MAX_SURFACE_DIMENSION);

        let err = checked_height(1, 100_000, 400).unwrap_err();
        assert!(matches!(err, PreviewError::DecodeFailed(_)));
        assert!(err.to_string().contains("1x100000"));
    }

    #[test]
    fn test_render_clamps_height() {
        let mut surface = Surface::new(ImageRole::Original, 4);
        surface.render(&solid(1, 10_000, [10, 20, 30, 255]), FilterId::None);
        assert_eq!(surface.height(), MAX_SURFACE_DIMENSION);
    }

    #[tokio::test]
    async fn test_render_detached_matches_inline_render() {
        let image = solid(30, 20, [120, 80, 40, 255]);
        let detached =
            Surface::render_detached(ImageRole::Transformed, 400, image.clone(), FilterId::Lark)
                .await
                .unwrap();

        let mut inline = Surface::new(ImageRole::Transformed, 400);
        inline.render(&image, FilterId::Lark);
        assert_eq!(detached.to_rgba(), inline.to_rgba());
        assert_eq!(detached.filter(), FilterId::Lark);

        let mut pair = SurfacePair::default();
        pair.replace(detached);
        assert_eq!(pair.get(ImageRole::Transformed).height(), 267);
        assert!(!pair.get(ImageRole::Original).is_drawn());
    }

    #[test]
    fn test_render_sizes_surface_from_aspect_ratio() {
        let mut surface = Surface::new(ImageRole::Original, 400);
        assert!(!surface.is_drawn());

        surface.render(&solid(300, 200, [10, 20, 30, 255]), FilterId::None);
        assert_eq!((surface.width(), surface.height()), (400, 267));

        surface.render(&solid(100, 300, [10, 20, 30, 255]), FilterId::None);
        assert_eq!(surface.height(), 1200);
    }

    #[test]
    fn test_render_is_idempotent() {
        let image = LogicalImage::from_image(DynamicImage::ImageRgba8(RgbaImage::from_fn(
            37,
            23,
            |x, y| Rgba([(x * 7) as u8, (y * 11) as u8, 90, 255]),
        )))
        .unwrap();
        let mut surface = Surface::new(ImageRole::Transformed, 400);
        surface.render(&image, FilterId::Juno);
        let first = surface.to_rgba();
        surface.render(&image, FilterId::Juno);
        assert_eq!(first, surface.to_rgba());
        assert_eq!(surface.filter(), FilterId::Juno);
    }

    #[test]
    fn test_original_role_is_never_filtered() {
        let mut pair = SurfacePair::default();
        let image = solid(4, 4, [200, 50, 50, 255]);
        assert!(pair.render_role(ImageRole::Original, Some(&image), FilterId::Moon));
        assert_eq!(pair.get(ImageRole::Original).filter(), FilterId::None);
        assert_eq!(pair.get(ImageRole::Original).pixels().get_pixel(0, 0).0, [200, 50, 50, 255]);
    }

    #[test]
    fn test_missing_image_is_a_no_op() {
        let mut pair = SurfacePair::default();
        assert!(!pair.render_role(ImageRole::Transformed, None, FilterId::None));
        assert!(!pair.get(ImageRole::Transformed).is_drawn());
    }

    #[test]
    fn test_composite_places_foreground_over_background() {
        let mut surface = Surface::new(ImageRole::Transformed, 400);
        let mut fg = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0]));
        for x in 0..2 {
            for y in 0..4 {
                fg.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            }
        }
        let foreground = LogicalImage::from_image(DynamicImage::ImageRgba8(fg)).unwrap();
        surface.render(&foreground, FilterId::None);

        let background = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([0, 0, 255, 255])));
        assert!(surface.composite(&background, &foreground, FilterId::None));

        assert_eq!(surface.height(), 400);
        assert_eq!(surface.pixels().get_pixel(10, 200).0, [255, 0, 0, 255]);
        assert_eq!(surface.pixels().get_pixel(390, 200).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_composite_requires_prior_draw() {
        let mut surface = Surface::new(ImageRole::Transformed, 400);
        let background = DynamicImage::new_rgba8(4, 4);
        assert!(!surface.composite(&background, &solid(4, 4, [1, 1, 1, 255]), FilterId::None));
        assert!(!surface.is_drawn());
    }
}
