// ============================================================
// Layer 4 - Augmentation Stage
// ============================================================
// Random perturbations applied to training images only, never to
// validation or inference inputs. Each step is drawn independently
// with its own activation probability:
//
//   step                  default           p
//   brightness/contrast   ±0.2 / ±0.2       0.5
//   gaussian noise        variance 10..50   0.3
//   rotation              ±5°               0.3
//   elastic warp          alpha 1, sigma 50 0.2
//
// Works on the u8 [0,255] grayscale image produced by
// ImageNormalizer::load and returns an image of the same size, so
// the tensor shape and [0,1] range contract is untouched once the
// result is rescaled.
//
// Randomness comes from the caller's Rng: pass a seeded StdRng for
// reproducible runs, thread_rng() otherwise.
//
// Reference: rand crate documentation
//            imageproc::geometric_transformations

use burn::config::Config;
use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{rotate_about_center, warp_with, Interpolation};
use rand::Rng;

/// Fill for pixels uncovered by rotation or warping (paper white)
const BACKGROUND: Luma<u8> = Luma([255]);

#[derive(Config, Debug)]
pub struct AugmentConfig {
    #[config(default = 0.2)]
    pub brightness_limit: f32,
    #[config(default = 0.2)]
    pub contrast_limit: f32,
    #[config(default = 0.5)]
    pub brightness_contrast_p: f64,

    #[config(default = 10.0)]
    pub noise_var_min: f32,
    #[config(default = 50.0)]
    pub noise_var_max: f32,
    #[config(default = 0.3)]
    pub noise_p: f64,

    /// Maximum absolute rotation in degrees
    #[config(default = 5.0)]
    pub rotate_limit: f32,
    #[config(default = 0.3)]
    pub rotate_p: f64,

    /// Maximum displacement in pixels at each control point
    #[config(default = 1.0)]
    pub elastic_alpha: f32,
    /// Spacing of the displacement control grid in pixels
    #[config(default = 50.0)]
    pub elastic_sigma: f32,
    #[config(default = 0.2)]
    pub elastic_p: f64,
}

impl AugmentConfig {
    pub fn init(&self) -> Augmenter {
        Augmenter { config: self.clone() }
    }
}

#[derive(Debug, Clone)]
pub struct Augmenter {
    config: AugmentConfig,
}

impl Augmenter {
    /// Apply the composed perturbations. Output has the input's dimensions.
    pub fn apply<R: Rng>(&self, img: GrayImage, rng: &mut R) -> GrayImage {
        let cfg     = &self.config;
        let mut img = img;

        if rng.gen_bool(cfg.brightness_contrast_p) {
            img = self.brightness_contrast(img, rng);
        }
        if rng.gen_bool(cfg.noise_p) {
            img = self.gaussian_noise(img, rng);
        }
        if rng.gen_bool(cfg.rotate_p) {
            img = self.rotate(&img, rng);
        }
        if rng.gen_bool(cfg.elastic_p) {
            img = self.elastic(&img, rng);
        }

        img
    }

    fn brightness_contrast<R: Rng>(&self, mut img: GrayImage, rng: &mut R) -> GrayImage {
        let alpha = 1.0 + symmetric(rng, self.config.contrast_limit);
        let beta  = symmetric(rng, self.config.brightness_limit) * 255.0;

        for p in img.pixels_mut() {
            p.0[0] = clamp_u8(p.0[0] as f32 * alpha + beta);
        }
        img
    }

    fn gaussian_noise<R: Rng>(&self, mut img: GrayImage, rng: &mut R) -> GrayImage {
        let (lo, hi) = (self.config.noise_var_min, self.config.noise_var_max);
        let variance = if hi > lo { rng.gen_range(lo..hi) } else { lo };
        let sigma    = variance.max(0.0).sqrt();

        for p in img.pixels_mut() {
            p.0[0] = clamp_u8(p.0[0] as f32 + standard_normal(rng) * sigma);
        }
        img
    }

    fn rotate<R: Rng>(&self, img: &GrayImage, rng: &mut R) -> GrayImage {
        let degrees = symmetric(rng, self.config.rotate_limit);
        rotate_about_center(img, degrees.to_radians(), Interpolation::Bilinear, BACKGROUND)
    }

    fn elastic<R: Rng>(&self, img: &GrayImage, rng: &mut R) -> GrayImage {
        let grid = DisplacementGrid::random(
            img.width(),
            img.height(),
            self.config.elastic_sigma,
            self.config.elastic_alpha,
            rng,
        );
        warp_with(
            img,
            |x, y| {
                let (dx, dy) = grid.sample(x, y);
                (x + dx, y + dy)
            },
            Interpolation::Bilinear,
            BACKGROUND,
        )
    }
}

// ─── Elastic displacement field ───────────────────────────────────────────────
// Random displacements on a coarse control grid, bilinearly
// interpolated in between, give a smooth warp without a full-size
// Gaussian filter pass.
struct DisplacementGrid {
    cols:    usize,
    rows:    usize,
    spacing: f32,
    dx:      Vec<f32>,
    dy:      Vec<f32>,
}

impl DisplacementGrid {
    fn random<R: Rng>(width: u32, height: u32, spacing: f32, alpha: f32, rng: &mut R) -> Self {
        let spacing = spacing.max(1.0);
        let cols    = (width as f32 / spacing).ceil() as usize + 2;
        let rows    = (height as f32 / spacing).ceil() as usize + 2;

        let dx = (0..cols * rows).map(|_| symmetric(rng, alpha)).collect();
        let dy = (0..cols * rows).map(|_| symmetric(rng, alpha)).collect();

        Self { cols, rows, spacing, dx, dy }
    }

    fn sample(&self, x: f32, y: f32) -> (f32, f32) {
        let gx = (x / self.spacing).clamp(0.0, (self.cols - 2) as f32);
        let gy = (y / self.spacing).clamp(0.0, (self.rows - 2) as f32);
        let (c0, r0) = (gx.floor() as usize, gy.floor() as usize);
        let (fx, fy) = (gx - c0 as f32, gy - r0 as f32);

        let lerp = |field: &[f32]| {
            let at  = |r: usize, c: usize| field[r * self.cols + c];
            let top = at(r0, c0) * (1.0 - fx) + at(r0, c0 + 1) * fx;
            let bot = at(r0 + 1, c0) * (1.0 - fx) + at(r0 + 1, c0 + 1) * fx;
            top * (1.0 - fy) + bot * fy
        };

        (lerp(&self.dx), lerp(&self.dy))
    }
}

/// Uniform draw from [-limit, limit]
fn symmetric<R: Rng>(rng: &mut R, limit: f32) -> f32 {
    if limit <= 0.0 {
        return 0.0;
    }
    rng.gen_range(-limit..=limit)
}

/// Box-Muller transform
fn standard_normal<R: Rng>(rng: &mut R) -> f32 {
    let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
    let u2: f32 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
}

fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
