//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Fit an image inside a `max_edge` × `max_edge` box, preserving aspect ratio.
///
/// Images that already fit keep their size (no upscaling). Neither output
/// edge is ever rounded down to zero.
///
/// # Arguments
/// * `original` - Source dimensions (width, height)
/// * `max_edge` - Edge of the bounding box in pixels
///
/// # Returns
/// * `(width, height)` - Thumbnail dimensions
///
/// # Examples
/// ```
/// # use coin_archive::imaging::calculate_fit_dimensions;
/// // 1600x1200 landscape into a 400 box → 400x300
/// assert_eq!(calculate_fit_dimensions((1600, 1200), 400), (400, 300));
///
/// // Small images are left alone
/// assert_eq!(calculate_fit_dimensions((300, 200), 400), (300, 200));
/// ```
pub fn calculate_fit_dimensions(original: (u32, u32), max_edge: u32) -> (u32, u32) {
    let (w, h) = original;
    if w <= max_edge && h <= max_edge {
        return (w, h);
    }

    if w >= h {
        // Landscape or square: width hits the box first
        let scaled_h = (h as f64 * max_edge as f64 / w as f64).round() as u32;
        (max_edge, scaled_h.max(1))
    } else {
        // Portrait: height hits the box first
        let scaled_w = (w as f64 * max_edge as f64 / h as f64).round() as u32;
        (scaled_w.max(1), max_edge)
    }
}
