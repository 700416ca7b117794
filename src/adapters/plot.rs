use crate::adapters::font::{self, draw_text, text_height, text_width};
use crate::utils::error::{ClassifierError, Result};
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

pub const PLOT_WIDTH: u32 = 1200;
pub const PLOT_HEIGHT: u32 = 600;

const MARGIN_LEFT: i64 = 100;
const MARGIN_RIGHT: i64 = 30;
const MARGIN_TOP: i64 = 60;
const MARGIN_BOTTOM: i64 = 80;
const TICKS: usize = 6;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([0, 0, 0]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);
const LINE: Rgb<u8> = Rgb([31, 119, 180]);

/// 資料座標到像素座標的線性映射
#[derive(Debug, Clone, Copy)]
struct Axis {
    min: f64,
    max: f64,
    pixel_start: f64,
    pixel_end: f64,
}

impl Axis {
    fn to_pixel(&self, v: f64) -> f64 {
        self.pixel_start + (v - self.min) / (self.max - self.min) * (self.pixel_end - self.pixel_start)
    }

    fn ticks(&self) -> impl Iterator<Item = f64> + '_ {
        (0..TICKS).map(move |i| self.min + (self.max - self.min) * i as f64 / (TICKS - 1) as f64)
    }
}

fn finite_range(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn padded_range(values: &[f64], pad_fraction: f64) -> (f64, f64) {
    match finite_range(values) {
        Some((lo, hi)) if hi > lo => {
            let pad = (hi - lo) * pad_fraction;
            (lo - pad, hi + pad)
        }
        Some((v, _)) => (v - 0.5, v + 0.5),
        None => (0.0, 1.0),
    }
}

fn draw_line(img: &mut RgbImage, (x0, y0): (i64, i64), (x1, y1): (i64, i64), color: Rgb<u8>) {
    // Bresenham
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let (mut x, mut y) = (x0, y0);
    let mut err = dx + dy;

    loop {
        font::put(img, x, y, color);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Line plot of normalized flux against wavelength, PNG encoded.
/// Non-finite samples break the line instead of being drawn.
pub fn render_spectrum_png(wavelength: &[f64], flux: &[f64], spectral_type: &str) -> Result<Vec<u8>> {
    if wavelength.len() != flux.len() {
        return Err(ClassifierError::processing(format!(
            "cannot plot {} wavelengths against {} flux values",
            wavelength.len(),
            flux.len()
        )));
    }

    let mut img = RgbImage::from_pixel(PLOT_WIDTH, PLOT_HEIGHT, BACKGROUND);
    let left = MARGIN_LEFT;
    let right = PLOT_WIDTH as i64 - MARGIN_RIGHT;
    let top = MARGIN_TOP;
    let bottom = PLOT_HEIGHT as i64 - MARGIN_BOTTOM;

    let (x_min, x_max) = padded_range(wavelength, 0.0);
    let (y_min, y_max) = padded_range(flux, 0.05);
    let x_axis = Axis { min: x_min, max: x_max, pixel_start: left as f64, pixel_end: right as f64 };
    let y_axis = Axis { min: y_min, max: y_max, pixel_start: bottom as f64, pixel_end: top as f64 };

    // 格線與刻度
    for tick in x_axis.ticks() {
        let px = x_axis.to_pixel(tick).round() as i64;
        draw_line(&mut img, (px, top), (px, bottom), GRID);
        draw_line(&mut img, (px, bottom), (px, bottom + 6), AXIS);
        let label = format!("{:.0}", tick);
        let w = text_width(&label, 2) as i64;
        draw_text(&mut img, px - w / 2, bottom + 12, &label, 2, AXIS);
    }
    for tick in y_axis.ticks() {
        let py = y_axis.to_pixel(tick).round() as i64;
        draw_line(&mut img, (left, py), (right, py), GRID);
        draw_line(&mut img, (left - 6, py), (left, py), AXIS);
        let label = format!("{:.2}", tick);
        let w = text_width(&label, 2) as i64;
        let h = text_height(2) as i64;
        draw_text(&mut img, left - 12 - w, py - h / 2, &label, 2, AXIS);
    }

    // 座標軸框
    draw_line(&mut img, (left, top), (right, top), AXIS);
    draw_line(&mut img, (left, bottom), (right, bottom), AXIS);
    draw_line(&mut img, (left, top), (left, bottom), AXIS);
    draw_line(&mut img, (right, top), (right, bottom), AXIS);

    let mut previous: Option<(i64, i64)> = None;
    for (&w, &f) in wavelength.iter().zip(flux) {
        if !w.is_finite() || !f.is_finite() {
            previous = None;
            continue;
        }
        let point = (
            x_axis.to_pixel(w).round() as i64,
            y_axis.to_pixel(f).round() as i64,
        );
        match previous {
            Some(p) => draw_line(&mut img, p, point, LINE),
            None => font::put(&mut img, point.0, point.1, LINE),
        }
        previous = Some(point);
    }

    let title = format!("SPECTRUM - TYPE {}", spectral_type);
    let title_w = text_width(&title, 3) as i64;
    draw_text(&mut img, (PLOT_WIDTH as i64 - title_w) / 2, 18, &title, 3, AXIS);

    let x_label = "WAVELENGTH (A)";
    let x_label_w = text_width(x_label, 2) as i64;
    draw_text(&mut img, (left + right - x_label_w) / 2, bottom + 46, x_label, 2, AXIS);
    draw_text(&mut img, 10, top - 24, "NORMALIZED FLUX", 2, AXIS);

    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}
