use std::path::Path;

use eyre::{Result, WrapErr};
use glam::Vec3;
use image::{Rgba, Rgba32FImage};

/// Loads an 8-bit, HDR or OpenEXR image as linear float RGBA.
pub fn load_image(path: &Path, flip: bool) -> Result<Rgba32FImage> {
    let is_exr = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("exr"));

    let mut image = if is_exr {
        load_exr(path)?
    } else {
        image::open(path)
            .wrap_err_with(|| format!("Couldn't open image '{}'", path.display()))?
            .into_rgba32f()
    };

    if flip {
        image::imageops::flip_vertical_in_place(&mut image);
    }

    Ok(image)
}

fn load_exr(path: &Path) -> Result<Rgba32FImage> {
    let image = exr::prelude::read_first_rgba_layer_from_file(
        path,
        |resolution, _| Rgba32FImage::new(resolution.width() as u32, resolution.height() as u32),
        |image: &mut Rgba32FImage, pos, (r, g, b, a): (f32, f32, f32, f32)| {
            image.put_pixel(pos.x() as u32, pos.y() as u32, Rgba([r, g, b, a]))
        },
    )
    .wrap_err_with(|| format!("Couldn't read OpenEXR image '{}'", path.display()))?;

    Ok(image.layer_data.channel_data.pixels)
}

/// Single opaque pixel.
pub fn constant_image(color: Vec3) -> Rgba32FImage {
    Rgba32FImage::from_pixel(1, 1, Rgba([color.x, color.y, color.z, 1.]))
}

/// `size` x `size` image of alternating `check` x `check` tiles, starting with `c0`.
pub fn checker_image(size: u32, check: u32, c0: Vec3, c1: Vec3) -> Rgba32FImage {
    let check = check.max(1);
    Rgba32FImage::from_fn(size, size, |x, y| {
        let c = if (x / check + y / check) % 2 == 0 { c0 } else { c1 };
        Rgba([c.x, c.y, c.z, 1.])
    })
}

/// Multiplies the color channels, alpha is kept.
pub fn scale_image(image: &Rgba32FImage, factor: f32) -> Rgba32FImage {
    let mut scaled = image.clone();
    for px in scaled.pixels_mut() {
        for c in &mut px.0[..3] {
            *c *= factor;
        }
    }
    scaled
}

/// `a * amount + b * (1 - amount)`, see [`combine_tiled`] for mismatched sizes.
pub fn blend_images(a: &Rgba32FImage, b: &Rgba32FImage, amount: f32) -> Rgba32FImage {
    combine_tiled(a, b, |pa, pb| {
        Rgba(std::array::from_fn(|i| pa[i] * amount + pb[i] * (1. - amount)))
    })
}

pub fn multiply_images(a: &Rgba32FImage, b: &Rgba32FImage) -> Rgba32FImage {
    combine_tiled(a, b, |pa, pb| Rgba(std::array::from_fn(|i| pa[i] * pb[i])))
}

/// Combines two images pixel by pixel over the larger of their extents.
///
/// Each image is repeated (tiled) to cover the result.
fn combine_tiled(
    a: &Rgba32FImage,
    b: &Rgba32FImage,
    f: impl Fn([f32; 4], [f32; 4]) -> Rgba<f32>,
) -> Rgba32FImage {
    if a.width() == 0 || a.height() == 0 {
        return b.clone();
    }
    if b.width() == 0 || b.height() == 0 {
        return a.clone();
    }

    let width = a.width().max(b.width());
    let height = a.height().max(b.height());

    Rgba32FImage::from_fn(width, height, |x, y| {
        let pa = a.get_pixel(x % a.width(), y % a.height()).0;
        let pb = b.get_pixel(x % b.width(), y % b.height()).0;
        f(pa, pb)
    })
}

#[cfg(test)]
mod test_super {
    use glam::vec3;

    use super::*;

    #[test]
    fn test_checker() {
        let img = checker_image(4, 2, Vec3::ZERO, Vec3::ONE);
        assert_eq!(img.get_pixel(0, 0).0, [0., 0., 0., 1.]);
        assert_eq!(img.get_pixel(1, 1).0, [0., 0., 0., 1.]);
        assert_eq!(img.get_pixel(2, 0).0, [1., 1., 1., 1.]);
        assert_eq!(img.get_pixel(2, 2).0, [0., 0., 0., 1.]);
    }

    #[test]
    fn test_blend_tiles_smaller_image() {
        let a = checker_image(2, 1, Vec3::ZERO, Vec3::ONE);
        let b = constant_image(vec3(1., 0., 0.));

        let blended = blend_images(&a, &b, 0.5);
        assert_eq!(blended.dimensions(), (2, 2));
        assert_eq!(blended.get_pixel(0, 0).0, [0.5, 0., 0., 1.]);
        assert_eq!(blended.get_pixel(1, 0).0, [1., 0.5, 0.5, 1.]);
    }

    #[test]
    fn test_multiply_and_scale() {
        let a = constant_image(vec3(0.5, 2., 1.));
        let b = constant_image(vec3(0.5, 0.5, 0.));
        assert_eq!(multiply_images(&a, &b).get_pixel(0, 0).0, [0.25, 1., 0., 1.]);
        assert_eq!(scale_image(&a, 2.).get_pixel(0, 0).0, [1., 4., 2., 1.]);
    }

    #[test]
    fn test_load_missing_image() {
        assert!(load_image(Path::new("/nonexistent/image.png"), true).is_err());
    }
}
