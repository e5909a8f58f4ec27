//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, WebP) | `image` crate (pure Rust decoders) |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` with configured quality |
//! | Encode → PNG, GIF, WebP | `DynamicImage::write_to` (lossless / fixed settings) |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::ThumbnailParams;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    open_sniffed(path)?.decode().map_err(|e| {
        BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
    })
}

/// Open a reader whose format comes from the file content, not its extension.
fn open_sniffed(path: &Path) -> Result<ImageReader<BufReader<File>>, BackendError> {
    Ok(ImageReader::open(path)?.with_guessed_format()?)
}

/// Save a DynamicImage to the given path, inferring format from extension.
fn save_image(img: &DynamicImage, path: &Path, quality: u32) -> Result<(), BackendError> {
    let format = ImageFormat::from_path(path).map_err(|_| {
        BackendError::ProcessingFailed(format!("Unsupported output format: {}", path.display()))
    })?;

    match format {
        ImageFormat::Jpeg => save_jpeg(img, path, quality),
        ImageFormat::Png | ImageFormat::Gif | ImageFormat::WebP => {
            let file = std::fs::File::create(path).map_err(BackendError::Io)?;
            let mut writer = BufWriter::new(file);
            img.write_to(&mut writer, format).map_err(|e| {
                BackendError::ProcessingFailed(format!("{format:?} encode failed: {e}"))
            })
        }
        other => Err(BackendError::ProcessingFailed(format!(
            "Unsupported output format: {other:?}"
        ))),
    }
}

/// Encode and save as JPEG. JPEG has no alpha channel, so it is dropped.
fn save_jpeg(img: &DynamicImage, path: &Path, quality: u32) -> Result<(), BackendError> {
    let file = std::fs::File::create(path).map_err(BackendError::Io)?;
    let writer = BufWriter::new(file);
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(writer, quality as u8);
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    rgb.write_with_encoder(encoder)
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = open_sniffed(path)?.into_dimensions().map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;

        let resized = if (img.width(), img.height()) == (params.width, params.height) {
            img
        } else {
            img.resize_exact(params.width, params.height, FilterType::Lanczos3)
        };

        save_image(&resized, &params.output, params.quality.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::Quality;
    use image::{ImageEncoder, RgbImage, RgbaImage};

    /// Create a small valid JPEG file with the given dimensions.
    fn create_test_jpeg(path: &Path, width: u32, height: u32) {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let file = std::fs::File::create(path).unwrap();
        let writer = BufWriter::new(file);
        image::codecs::jpeg::JpegEncoder::new(writer)
            .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .unwrap();
    }

    /// Create a small PNG with an alpha channel.
    fn create_test_png(path: &Path, width: u32, height: u32) {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([(x % 256) as u8, (y % 256) as u8, 64, 200])
        });
        img.save(path).unwrap();
    }

    fn params(source: &Path, output: &Path, width: u32, height: u32) -> ThumbnailParams {
        ThumbnailParams {
            source: source.to_path_buf(),
            output: output.to_path_buf(),
            width,
            height,
            quality: Quality::new(85),
        }
    }

    #[test]
    fn identify_synthetic_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.jpg");
        create_test_jpeg(&path, 200, 150);

        let backend = RustBackend::new();
        let dims = backend.identify(&path).unwrap();
        assert_eq!(dims.width, 200);
        assert_eq!(dims.height, 150);
    }

    #[test]
    fn mislabeled_png_is_identified_and_resized() {
        let tmp = tempfile::TempDir::new().unwrap();
        let png = tmp.path().join("real.png");
        create_test_png(&png, 120, 60);
        let source = tmp.path().join("mislabeled.jpg");
        std::fs::rename(&png, &source).unwrap();

        let backend = RustBackend::new();
        let dims = backend.identify(&source).unwrap();
        assert_eq!((dims.width, dims.height), (120, 60));

        let output = tmp.path().join("thumb.jpg");
        backend.thumbnail(&params(&source, &output, 60, 30)).unwrap();
        assert_eq!(image::image_dimensions(&output).unwrap(), (60, 30));
    }

    #[test]
    fn identify_nonexistent_file_errors() {
        let backend = RustBackend::new();
        let result = backend.identify(Path::new("/nonexistent/image.jpg"));
        assert!(result.is_err());
    }

    #[test]
    fn thumbnail_jpeg_stays_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 800, 600);

        let output = tmp.path().join("thumb.jpg");
        let backend = RustBackend::new();
        backend
            .thumbnail(&params(&source, &output, 400, 300))
            .unwrap();

        assert_eq!(image::image_dimensions(&output).unwrap(), (400, 300));
        assert_eq!(
            ImageReader::open(&output)
                .unwrap()
                .with_guessed_format()
                .unwrap()
                .format(),
            Some(ImageFormat::Jpeg)
        );
    }

    #[test]
    fn thumbnail_png_keeps_format() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.png");
        create_test_png(&source, 300, 600);

        let output = tmp.path().join("thumb.png");
        let backend = RustBackend::new();
        backend
            .thumbnail(&params(&source, &output, 200, 400))
            .unwrap();

        assert_eq!(image::image_dimensions(&output).unwrap(), (200, 400));
        let decoded = image::open(&output).unwrap();
        assert!(decoded.color().has_alpha());
    }

    #[test]
    fn thumbnail_same_size_copies_pixels() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("small.png");
        create_test_png(&source, 40, 30);

        let output = tmp.path().join("thumb.png");
        RustBackend::new()
            .thumbnail(&params(&source, &output, 40, 30))
            .unwrap();

        assert_eq!(image::image_dimensions(&output).unwrap(), (40, 30));
    }

    #[test]
    fn thumbnail_undecodable_source_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("fake.jpg");
        std::fs::write(&source, b"definitely not a jpeg").unwrap();

        let output = tmp.path().join("thumb.jpg");
        let result = RustBackend::new().thumbnail(&params(&source, &output, 10, 10));
        assert!(matches!(result, Err(BackendError::ProcessingFailed(_))));
        assert!(!output.exists());
    }

    #[test]
    fn thumbnail_unsupported_output_format_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 100, 100);

        let output = tmp.path().join("thumb.bmp");
        let result = RustBackend::new().thumbnail(&params(&source, &output, 50, 50));
        assert!(result.is_err());
    }
}
