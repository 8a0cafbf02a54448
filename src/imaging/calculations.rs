//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate dimensions that fit `original` inside a `max_w × max_h` box.
///
/// Preserves the aspect ratio and never upscales: an image already inside
/// the box keeps its size. Neither output edge is ever zero.
///
/// # Examples
/// ```
/// # use media_prep::imaging::fit_within;
/// // 4000x3000 landscape into a 480 box → 480x360
/// assert_eq!(fit_within((4000, 3000), (480, 480)), (480, 360));
///
/// // Already small enough → unchanged
/// assert_eq!(fit_within((300, 200), (480, 480)), (300, 200));
/// ```
pub fn fit_within(original: (u32, u32), max: (u32, u32)) -> (u32, u32) {
    let (w, h) = original;
    let (max_w, max_h) = max;

    if w == 0 || h == 0 || (w <= max_w && h <= max_h) {
        return (w, h);
    }

    let scale = f64::min(max_w as f64 / w as f64, max_h as f64 / h as f64);
    let out_w = ((w as f64 * scale).round() as u32).clamp(1, max_w.max(1));
    let out_h = ((h as f64 * scale).round() as u32).clamp(1, max_h.max(1));
    (out_w, out_h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landscape_is_bounded_by_width() {
        assert_eq!(fit_within((4000, 3000), (480, 480)), (480, 360));
    }

    #[test]
    fn portrait_is_bounded_by_height() {
        assert_eq!(fit_within((3000, 4000), (480, 480)), (360, 480));
    }

    #[test]
    fn square_fills_box() {
        assert_eq!(fit_within((1000, 1000), (480, 480)), (480, 480));
    }

    #[test]
    fn never_upscales() {
        assert_eq!(fit_within((200, 100), (480, 480)), (200, 100));
        assert_eq!(fit_within((480, 480), (480, 480)), (480, 480));
    }

    #[test]
    fn rectangular_box() {
        // 1600x900 into 400x400 → width-bound
        assert_eq!(fit_within((1600, 900), (400, 400)), (400, 225));
        // 1600x900 into 800x200 → height-bound
        assert_eq!(fit_within((1600, 900), (800, 200)), (356, 200));
    }

    #[test]
    fn extreme_panorama_keeps_nonzero_height() {
        assert_eq!(fit_within((100_000, 10), (480, 480)), (480, 1));
    }

    #[test]
    fn degenerate_input_passes_through() {
        assert_eq!(fit_within((0, 0), (480, 480)), (0, 0));
    }
}
