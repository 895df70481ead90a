//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.
//! Every result is clamped to at least one pixel so degenerate sources
//! (1px wide strips, 1px tall lines) still produce a usable geometry.

/// A rectangle in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Calculate the centered region of the source that has the target's aspect
/// ratio (cover, then crop).
///
/// Cropping before resampling means the resize never has to materialize an
/// oversized intermediate: a 1×4000 strip filled to 1920×1080 would otherwise
/// be scaled to 1920×7680000 first.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `target` - Target area dimensions (width, height)
pub fn calculate_cover_crop(source: (u32, u32), target: (u32, u32)) -> CropRect {
    let (src_w, src_h) = (source.0.max(1), source.1.max(1));
    let (tgt_w, tgt_h) = (target.0.max(1), target.1.max(1));

    // Compare src_w/src_h against tgt_w/tgt_h without floating point.
    let src_cross = src_w as u64 * tgt_h as u64;
    let tgt_cross = tgt_w as u64 * src_h as u64;

    if src_cross > tgt_cross {
        // Source is wider: keep full height, trim the sides
        let w = ((src_h as f64 * tgt_w as f64 / tgt_h as f64).round() as u32).clamp(1, src_w);
        CropRect {
            x: (src_w - w) / 2,
            y: 0,
            width: w,
            height: src_h,
        }
    } else {
        // Source is taller (or same aspect): keep full width, trim top and bottom
        let h = ((src_w as f64 * tgt_h as f64 / tgt_w as f64).round() as u32).clamp(1, src_h);
        CropRect {
            x: 0,
            y: (src_h - h) / 2,
            width: src_w,
            height: h,
        }
    }
}

/// Calculate dimensions that fit entirely inside the target while preserving
/// the source aspect ratio. One dimension matches the target exactly, the
/// other is at most the target.
///
/// Upscales small sources: the foreground always spans the frame on one axis.
pub fn calculate_fit_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = (source.0.max(1), source.1.max(1));
    let (tgt_w, tgt_h) = (target.0.max(1), target.1.max(1));

    let src_cross = src_w as u64 * tgt_h as u64;
    let tgt_cross = tgt_w as u64 * src_h as u64;

    if src_cross >= tgt_cross {
        // Width-bound
        let h = (tgt_w as f64 * src_h as f64 / src_w as f64).round() as u32;
        (tgt_w, h.clamp(1, tgt_h))
    } else {
        // Height-bound
        let w = (tgt_h as f64 * src_w as f64 / src_h as f64).round() as u32;
        (w.clamp(1, tgt_w), tgt_h)
    }
}

/// Offset that centers `inner` inside `outer`. Odd remainders round toward
/// the top-left.
pub fn center_offset(inner: (u32, u32), outer: (u32, u32)) -> (u32, u32) {
    (
        outer.0.saturating_sub(inner.0) / 2,
        outer.1.saturating_sub(inner.1) / 2,
    )
}
