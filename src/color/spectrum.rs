use std::path::Path;

use eyre::{eyre, Result, WrapErr};
use glam::{vec3, Vec2, Vec3};

use super::color_space::ColorSpace;

pub const LAMBDA_MIN: f32 = 360.;
pub const LAMBDA_MAX: f32 = 830.;

/// CIE 1931 2° color matching functions.
///
/// Multi-lobe gaussian fit from: Simple Analytic Approximations to the CIE XYZ Color Matching Functions
/// Chris Wyman, Peter-Pike Sloan, and Peter Shirley
pub fn cie_xyz(lambda: f32) -> Vec3 {
    fn g(x: f32, mu: f32, sigma_lo: f32, sigma_hi: f32) -> f32 {
        let sigma = if x < mu { sigma_lo } else { sigma_hi };
        let t = (x - mu) / sigma;
        (-0.5 * t * t).exp()
    }

    let x = 1.056 * g(lambda, 599.8, 37.9, 31.0) + 0.362 * g(lambda, 442.0, 16.0, 26.7)
        - 0.065 * g(lambda, 501.1, 20.4, 26.2);
    let y = 0.821 * g(lambda, 568.8, 46.9, 40.5) + 0.286 * g(lambda, 530.9, 16.3, 31.1);
    let z = 1.217 * g(lambda, 437.0, 11.8, 36.0) + 0.681 * g(lambda, 459.0, 26.0, 13.8);

    vec3(x, y, z)
}

/// Converts (wavelength in nm, value) samples to linear sRGB.
///
/// The spectrum is interpolated linearly and held constant past its first and last sample.
/// A constant spectrum of 1 has a luminance of 1.
pub fn spectrum_to_rgb(samples: &[Vec2]) -> Vec3 {
    if samples.is_empty() {
        return Vec3::ZERO;
    }

    let mut samples = samples.to_vec();
    samples.sort_by(|a, b| a.x.total_cmp(&b.x));

    let mut xyz = Vec3::ZERO;
    let mut y_integral = 0.;

    let mut lambda = LAMBDA_MIN;
    while lambda <= LAMBDA_MAX {
        let cmf = cie_xyz(lambda);
        xyz += cmf * interpolate(&samples, lambda);
        y_integral += cmf.y;
        lambda += 1.;
    }

    ColorSpace::Srgb.from_xyz(xyz / y_integral)
}

fn interpolate(samples: &[Vec2], lambda: f32) -> f32 {
    let i = samples.partition_point(|s| s.x <= lambda);
    match (i.checked_sub(1).map(|j| samples[j]), samples.get(i)) {
        (Some(a), Some(b)) => {
            let t = (lambda - a.x) / (b.x - a.x);
            a.y * (1. - t) + b.y * t
        }
        (Some(a), None) => a.y,
        (None, Some(b)) => b.y,
        (None, None) => 0.,
    }
}

/// Planck's law, `lambda` in nm.
fn planck(lambda: f64, temperature: f64) -> f64 {
    const C: f64 = 299792458.;
    const H: f64 = 6.62606957e-34;
    const KB: f64 = 1.3806488e-23;

    let l = lambda * 1e-9;
    (2. * H * C * C) / (l.powi(5) * (((H * C) / (l * KB * temperature)).exp() - 1.))
}

/// Color of a blackbody emitter normalized to a peak of 1, then multiplied by `scale`.
pub fn blackbody_to_rgb(temperature: f32, scale: f32) -> Vec3 {
    if temperature <= 0. {
        return Vec3::ZERO;
    }

    let temperature = temperature as f64;
    // Wien's displacement law
    let lambda_max = 2.8977721e-3 / temperature * 1e9;
    let peak = planck(lambda_max, temperature);

    let samples: Vec<Vec2> = (LAMBDA_MIN as u32..=LAMBDA_MAX as u32)
        .map(|lambda| {
            let value = planck(lambda as f64, temperature) / peak;
            Vec2::new(lambda as f32, value as f32)
        })
        .collect();

    spectrum_to_rgb(&samples) * scale
}

/// Reads a text file of (wavelength, value) pairs, `#` starts a comment.
pub fn load_spectrum_file(path: &Path) -> Result<Vec<Vec2>> {
    let txt = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Couldn't read spectrum file '{}'", path.display()))?;

    let values = txt
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default())
        .flat_map(str::split_whitespace)
        .map(|v| {
            v.parse::<f32>()
                .map_err(|_| eyre!("Invalid number '{}' in '{}'", v, path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    if values.len() % 2 != 0 {
        return Err(eyre!(
            "Spectrum file '{}' has an odd number of values",
            path.display()
        ));
    }

    Ok(values
        .chunks_exact(2)
        .map(|c| Vec2::new(c[0], c[1]))
        .collect())
}
