//! Dimension resolver: output pixel size from source size and requested size.

/// Compute output dimensions.
///
/// A target axis of 0 means "unset". With `lock_aspect` the result fits inside the
/// requested box; without it each set axis is taken as given. Results are rounded and
/// never below 1.
pub fn resolve(
    source_width: u32,
    source_height: u32,
    target_width: u32,
    target_height: u32,
    lock_aspect: bool,
) -> (u32, u32) {
    if target_width == 0 && target_height == 0 {
        return (source_width.max(1), source_height.max(1));
    }

    let pick = |target: u32, source: u32| if target > 0 { target } else { source };

    // Without a usable source aspect the axes can only be taken independently.
    if !lock_aspect || source_width == 0 || source_height == 0 {
        return (
            pick(target_width, source_width).max(1),
            pick(target_height, source_height).max(1),
        );
    }

    let source_aspect = source_width as f64 / source_height as f64;

    let (width, height) = match (target_width, target_height) {
        (w, h) if w > 0 && h > 0 => {
            let target_aspect = w as f64 / h as f64;
            if source_aspect > target_aspect {
                (w, round_px(w as f64 / source_aspect))
            } else {
                (round_px(h as f64 * source_aspect), h)
            }
        }
        (w, _) if w > 0 => (w, round_px(w as f64 / source_aspect)),
        (_, h) => (round_px(h as f64 * source_aspect), h),
    };

    (width.max(1), height.max(1))
}

/// Round down to even values (minimum 2), as 4:2:0 video encoders require.
pub fn even_dimensions(width: u32, height: u32) -> (u32, u32) {
    ((width & !1).max(2), (height & !1).max(2))
}

fn round_px(value: f64) -> u32 {
    value.round().clamp(0.0, u32::MAX as f64) as u32
}
