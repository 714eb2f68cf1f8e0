// src/codecs/scale.rs
//
// Nearest-neighbour resize for packed pixel layouts. Format changes are not
// supported; planar layouts pass through only at matching dimensions.

use bytes::Bytes;

use crate::core::error::{RecorderError, RecorderResult};
use crate::frame::{PixelFormat, VideoPayload};

type Geometry = (u32, u32, PixelFormat);

fn describe(g: Geometry) -> String {
    format!("{}@{}x{}", g.2, g.0, g.1)
}

pub fn needs_conversion(from: Geometry, to: Geometry) -> bool {
    from != to
}

pub fn check_conversion(from: Geometry, to: Geometry) -> RecorderResult<()> {
    check_at(from, to, 0)
}

fn check_at(from: Geometry, to: Geometry, frame: u64) -> RecorderResult<()> {
    if !needs_conversion(from, to) {
        return Ok(());
    }
    if from.2 != to.2 || from.2.packed_bytes_per_pixel().is_none() {
        return Err(RecorderError::Conversion {
            from: describe(from),
            to: describe(to),
            frame,
        });
    }
    Ok(())
}

/// Bring `input` to the target geometry. `frame` is the running video frame
/// count, used for error reporting.
pub fn convert(input: &VideoPayload, to: Geometry, frame: u64) -> RecorderResult<Bytes> {
    let from = (input.width, input.height, input.pixel_format);
    check_at(from, to, frame)?;

    let expected = input.pixel_format.frame_size(input.width, input.height);
    if input.data.len() < expected {
        return Err(RecorderError::Conversion {
            from: format!("{} ({} bytes)", describe(from), input.data.len()),
            to: describe(to),
            frame,
        });
    }
    if !needs_conversion(from, to) {
        return Ok(input.data.clone());
    }

    let bpp = input.pixel_format.packed_bytes_per_pixel().unwrap_or(1);
    let (src_w, src_h) = (input.width as usize, input.height as usize);
    let (dst_w, dst_h) = (to.0 as usize, to.1 as usize);
    let mut out = Vec::with_capacity(dst_w * dst_h * bpp);

    for y in 0..dst_h {
        let sy = y * src_h / dst_h;
        for x in 0..dst_w {
            let sx = x * src_w / dst_w;
            let idx = (sy * src_w + sx) * bpp;
            out.extend_from_slice(&input.data[idx..idx + bpp]);
        }
    }

    Ok(Bytes::from(out))
}
