use crate::types::{BoundaryFeature, CaseRecord};
use anyhow::{anyhow, Context, Result};
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::{Coord, LineString, Point, Rect};
use image::{ImageBuffer, Rgba, RgbaImage};
use rayon::prelude::*;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::fs;
use std::path::Path;

/// Fixed display options for the demo figure.
///
/// These pin down the map's presentation: a white-to-blue
/// gradient saturating at 150 cases, thin white boundary lines, and a
/// slightly translucent fill. They are not configurable at runtime.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Color domain; counts at or above the top saturate at the high
    /// color.
    pub color_domain: (f64, f64),
    /// Gradient color at the domain minimum.
    pub gradient_low: Rgba<u8>,
    /// Gradient color at the domain maximum.
    pub gradient_high: Rgba<u8>,
    /// Fill for boundary features with no matching case record.
    pub unmatched_fill: Rgba<u8>,
    pub stroke_color: Rgba<u8>,
    /// Fill opacity over the background.
    pub fill_opacity: f64,
    pub background: Rgba<u8>,
    /// Raster width in pixels; height follows the fitted aspect ratio.
    pub width: u32,
    pub title: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            color_domain: (0.0, 150.0),
            gradient_low: Rgba([247, 251, 255, 255]),
            gradient_high: Rgba([8, 48, 107, 255]),
            unmatched_fill: Rgba([229, 229, 229, 255]),
            stroke_color: Rgba([255, 255, 255, 255]),
            fill_opacity: 0.9,
            background: Rgba([255, 255, 255, 255]),
            width: 1024,
            title: "Confirmed COVID-19 Cases in Orange County (By City)".to_string(),
        }
    }
}

/// Web Mercator fit of a lon/lat rectangle onto the raster viewport.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    min_x: f64,
    min_y: f64,
    scale: f64,
    pub width: u32,
    pub height: u32,
}

// Ceiling on the fitted raster height; keeps a degenerate (zero-width)
// bounding rect from demanding an absurd allocation.
const MAX_HEIGHT: u32 = 8192;

fn mercator_x(lon: f64) -> f64 {
    (lon + 180.0) / 360.0
}

fn mercator_y(lat: f64) -> f64 {
    let lat_rad = lat.to_radians();
    (1.0 - (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() / PI) / 2.0
}

impl Projection {
    fn fit(bounds: Rect<f64>, width: u32) -> Self {
        let min_x = mercator_x(bounds.min().x);
        let max_x = mercator_x(bounds.max().x);
        // North edge maps to the top of the raster.
        let min_y = mercator_y(bounds.max().y);
        let max_y = mercator_y(bounds.min().y);

        let span_x = (max_x - min_x).max(f64::EPSILON);
        let span_y = (max_y - min_y).max(f64::EPSILON);
        let scale = width as f64 / span_x;
        let height = ((span_y * scale).round() as u32).clamp(1, MAX_HEIGHT);

        Self {
            min_x,
            min_y,
            scale,
            width,
            height,
        }
    }

    /// Lon/lat to fractional pixel coordinates, origin top-left.
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        (
            (mercator_x(lon) - self.min_x) * self.scale,
            (mercator_y(lat) - self.min_y) * self.scale,
        )
    }

    /// Pixel coordinates back to lon/lat, for hover lookups.
    pub fn unproject(&self, px: f64, py: f64) -> (f64, f64) {
        let lon = (px / self.scale + self.min_x) * 360.0 - 180.0;
        let my = py / self.scale + self.min_y;
        let lat = (PI * (1.0 - 2.0 * my)).sinh().atan().to_degrees();
        (lon, lat)
    }
}

/// The rendered choropleth artifact.
pub struct Figure {
    pub image: RgbaImage,
    pub projection: Projection,
    pub title: String,
}

impl Figure {
    pub fn save_png(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
        }
        self.image
            .save(path)
            .with_context(|| format!("Failed to write figure: {:?}", path))?;
        Ok(())
    }
}

/// Fill color for a matched feature: the gradient color for `count`,
/// clamped to the domain, composited over the background at the
/// configured opacity.
pub fn fill_color(count: u32, options: &RenderOptions) -> Rgba<u8> {
    let (low, high) = options.color_domain;
    let t = ((count as f64 - low) / (high - low)).clamp(0.0, 1.0);
    let graded = lerp(options.gradient_low, options.gradient_high, t);
    blend(graded, options.background, options.fill_opacity)
}

fn lerp(a: Rgba<u8>, b: Rgba<u8>, t: f64) -> Rgba<u8> {
    let channel = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    Rgba([
        channel(a[0], b[0]),
        channel(a[1], b[1]),
        channel(a[2], b[2]),
        255,
    ])
}

fn blend(top: Rgba<u8>, bottom: Rgba<u8>, opacity: f64) -> Rgba<u8> {
    let channel = |t: u8, b: u8| (t as f64 * opacity + b as f64 * (1.0 - opacity)).round() as u8;
    Rgba([
        channel(top[0], bottom[0]),
        channel(top[1], bottom[1]),
        channel(top[2], bottom[2]),
        255,
    ])
}

/// Joins case records to boundary features by exact id equality and
/// rasterizes the choropleth.
///
/// The viewport auto-fits the matched features only; unmatched features
/// still draw (in the neutral fill) wherever their geometry intersects
/// the fitted viewport, and unmatched records are silently ignored.
/// Output is deterministic for identical inputs and options.
pub fn render(
    boundaries: &[BoundaryFeature],
    records: &[CaseRecord],
    options: &RenderOptions,
) -> Result<Figure> {
    let counts: HashMap<&str, u32> = records.iter().map(|r| (r.id.as_str(), r.count)).collect();

    let bounds = matched_bounds(boundaries, &counts)
        .ok_or_else(|| anyhow!("No case record matches any boundary feature; cannot fit the view"))?;
    let projection = Projection::fit(pad(bounds, 0.02), options.width);

    println!(
        "Rendering {}x{} figure for {} features...",
        projection.width,
        projection.height,
        boundaries.len()
    );

    let mut image: RgbaImage =
        ImageBuffer::from_pixel(projection.width, projection.height, options.background);

    // Rasterize features in parallel, then composite in source order so
    // the output stays deterministic.
    let fills: Vec<Vec<(u32, u32)>> = boundaries
        .par_iter()
        .map(|feature| fill_feature(feature, &projection))
        .collect();

    for (feature, pixels) in boundaries.iter().zip(fills) {
        let color = match counts.get(feature.id.as_str()) {
            Some(&count) => fill_color(count, options),
            None => blend(options.unmatched_fill, options.background, options.fill_opacity),
        };
        for (px, py) in pixels {
            image.put_pixel(px, py, color);
        }
    }

    for feature in boundaries {
        stroke_feature(&mut image, feature, &projection, options.stroke_color);
    }

    Ok(Figure {
        image,
        projection,
        title: options.title.clone(),
    })
}

fn matched_bounds(
    boundaries: &[BoundaryFeature],
    counts: &HashMap<&str, u32>,
) -> Option<Rect<f64>> {
    let mut bounds: Option<Rect<f64>> = None;

    for feature in boundaries {
        if !counts.contains_key(feature.id.as_str()) {
            continue;
        }
        let Some(rect) = feature.geometry.bounding_rect() else {
            continue;
        };
        bounds = Some(match bounds {
            Some(b) => Rect::new(
                Coord {
                    x: b.min().x.min(rect.min().x),
                    y: b.min().y.min(rect.min().y),
                },
                Coord {
                    x: b.max().x.max(rect.max().x),
                    y: b.max().y.max(rect.max().y),
                },
            ),
            None => rect,
        });
    }

    bounds
}

fn pad(bounds: Rect<f64>, fraction: f64) -> Rect<f64> {
    let dx = (bounds.max().x - bounds.min().x) * fraction;
    let dy = (bounds.max().y - bounds.min().y) * fraction;
    Rect::new(
        Coord {
            x: bounds.min().x - dx,
            y: bounds.min().y - dy,
        },
        Coord {
            x: bounds.max().x + dx,
            y: bounds.max().y + dy,
        },
    )
}

/// Pixels inside the feature, found by point-in-polygon tests over the
/// feature's pixel bounding box clipped to the viewport.
fn fill_feature(feature: &BoundaryFeature, projection: &Projection) -> Vec<(u32, u32)> {
    let Some(rect) = feature.geometry.bounding_rect() else {
        return Vec::new();
    };

    let (x0, y0) = projection.project(rect.min().x, rect.max().y);
    let (x1, y1) = projection.project(rect.max().x, rect.min().y);
    if x1 < 0.0 || y1 < 0.0 {
        return Vec::new();
    }
    let px0 = x0.floor().max(0.0) as u32;
    let py0 = y0.floor().max(0.0) as u32;
    if px0 >= projection.width || py0 >= projection.height {
        return Vec::new();
    }
    let px1 = (x1.ceil() as u32).min(projection.width - 1);
    let py1 = (y1.ceil() as u32).min(projection.height - 1);

    let mut pixels = Vec::new();
    for py in py0..=py1 {
        for px in px0..=px1 {
            let (lon, lat) = projection.unproject(px as f64 + 0.5, py as f64 + 0.5);
            if feature.geometry.contains(&Point::new(lon, lat)) {
                pixels.push((px, py));
            }
        }
    }
    pixels
}

fn stroke_feature(
    image: &mut RgbaImage,
    feature: &BoundaryFeature,
    projection: &Projection,
    color: Rgba<u8>,
) {
    for polygon in feature.geometry.iter() {
        stroke_ring(image, polygon.exterior(), projection, color);
        for interior in polygon.interiors() {
            stroke_ring(image, interior, projection, color);
        }
    }
}

fn stroke_ring(
    image: &mut RgbaImage,
    ring: &LineString<f64>,
    projection: &Projection,
    color: Rgba<u8>,
) {
    for line in ring.lines() {
        let (x0, y0) = projection.project(line.start.x, line.start.y);
        let (x1, y1) = projection.project(line.end.x, line.end.y);
        let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let x = x0 + (x1 - x0) * t;
            let y = y0 + (y1 - y0) * t;
            if x >= 0.0 && y >= 0.0 && (x as u32) < image.width() && (y as u32) < image.height() {
                image.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}
