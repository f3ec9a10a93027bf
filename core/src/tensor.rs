//! Conversion of decoded images into planar float input tensors.
//!
//! Output is laid out as three contiguous row-major planes: red, then
//! green, then blue, each value an 8-bit channel value in `[0, 255]`.

use image::{GenericImageView, Rgba};
use ndarray::Array3;

use crate::error::{MxError, Result};

/// Visit every pixel as `(plane offset, [r, g, b])`, where the plane offset
/// is `y * width + x` relative to the view's origin.
fn for_each_rgb<I, F>(src: &I, mut f: F)
where
    I: GenericImageView<Pixel = Rgba<u8>>,
    F: FnMut(usize, [u8; 3]),
{
    let width = src.width() as usize;
    for (x, y, pixel) in src.pixels() {
        let [r, g, b, _] = pixel.0;
        f(y as usize * width + x as usize, [r, g, b]);
    }
}

fn plane_len<I: GenericImageView>(src: &I) -> usize {
    let (w, h) = src.dimensions();
    w as usize * h as usize
}

/// Convert an image into a flat `3 * H * W` CHW tensor.
///
/// A zero-area image yields an empty tensor. Sub-images are passed by
/// dereferencing the view, as in `image_to_tensor(&*img.view(x, y, w, h))`;
/// offsets are then relative to the view's origin.
///
/// Images with wider channels, such as a 16-bit [`image::DynamicImage`],
/// are narrowed by the `image` crate's rounding conversion, so `0x01ff`
/// becomes 2 rather than its high byte.
pub fn image_to_tensor<I>(src: &I) -> Result<Vec<f32>>
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    let plane = plane_len(src);
    let mut out = vec![0.0f32; 3 * plane];
    for_each_rgb(src, |i, rgb| {
        for (c, &v) in rgb.iter().enumerate() {
            out[c * plane + i] = f32::from(v);
        }
    });
    Ok(out)
}

/// Convert an image into a flat CHW tensor, subtracting `mean` element-wise.
///
/// The result has `mean.len()` elements. `mean` is expected to hold
/// `3 * H * W` values in the same layout; positions outside it are left
/// unwritten, and positions past `3 * H * W` stay zero.
pub fn image_to_tensor_with_mean<I>(src: &I, mean: &[f32]) -> Result<Vec<f32>>
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    let plane = plane_len(src);
    if mean.is_empty() {
        return Err(MxError::validation("mean image is empty"));
    }
    let mut out = vec![0.0f32; mean.len()];
    for_each_rgb(src, |i, rgb| {
        for (c, &v) in rgb.iter().enumerate() {
            let idx = c * plane + i;
            if let Some(&m) = mean.get(idx) {
                out[idx] = f32::from(v) - m;
            }
        }
    });
    Ok(out)
}

/// Convert an image into a `(3, H, W)` array.
pub fn image_to_array<I>(src: &I) -> Result<Array3<f32>>
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    let (w, h) = src.dimensions();
    let data = image_to_tensor(src)?;
    Array3::from_shape_vec((3, h as usize, w as usize), data)
        .map_err(|e| MxError::tensor(format!("Array shape error: {}", e)))
}
