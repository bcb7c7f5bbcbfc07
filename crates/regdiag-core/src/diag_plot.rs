use crate::data::{FeatureMatrix, TargetVector};
use crate::regression::fitresult::FitResult;
use crate::regression::regerror::{RegResult, RegressionError};
use crate::stats::min_max;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use plotters::coord::Shift;
use plotters::element::DashedPathElement;
use plotters::prelude::*;
use std::io::Cursor;
use std::ops::Range;

pub const PLOT_WIDTH: u32 = 1800;
pub const PLOT_HEIGHT: u32 = 1500;
pub const HISTOGRAM_BINS: usize = 20;
pub const PNG_MIME: &str = "image/png";

const FONT: &str = "sans-serif";
const POINT_COLOR: RGBColor = RGBColor(31, 119, 180);

#[derive(Debug, Clone, PartialEq)]
pub struct Bins {
    /// `counts.len() + 1` bin edges, ascending.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

/// Equal width bins over `[min, max]` of the finite values, last bin closed
/// on the right. A single distinct value gets a unit wide range around it.
pub fn histogram(values: &[f64], bins: usize) -> Option<Bins> {
    if bins == 0 {
        return None;
    }
    let (lo, hi) = min_max(values)?;
    let (lo, hi) = if lo == hi { (lo - 0.5, hi + 0.5) } else { (lo, hi) };
    let width = (hi - lo) / bins as f64;

    let edges = (0..=bins).map(|i| lo + width * i as f64).collect();
    let mut counts = vec![0; bins];
    for &v in values.iter().filter(|v| v.is_finite()) {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    Some(Bins { edges, counts })
}

/// Whether the font family used for captions and labels can be loaded.
pub fn font_available() -> bool {
    (FONT, 12).into_font().box_size("Feature").is_ok()
}

pub fn to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Four diagnostics panels as a `data:image/png;base64,...` string.
pub fn render(x: &FeatureMatrix, y: &TargetVector, fit: &FitResult) -> RegResult<String> {
    check_inputs(x, y, fit)?;
    let png = render_png(y.as_slice(), fit)?;
    Ok(to_data_uri(PNG_MIME, &png))
}

pub fn render_png(y: &[f64], fit: &FitResult) -> RegResult<Vec<u8>> {
    if !font_available() {
        return Err(RegressionError::RenderError(format!("no usable '{FONT}' font")));
    }
    let mut buf = vec![0u8; (PLOT_WIDTH * PLOT_HEIGHT * 3) as usize];
    draw_panels(&mut buf, y, fit)?;

    let img = image::RgbImage::from_raw(PLOT_WIDTH, PLOT_HEIGHT, buf).ok_or_else(|| {
        RegressionError::RenderError("pixel buffer does not match image size".into())
    })?;
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)?;
    Ok(png)
}

fn check_inputs(x: &FeatureMatrix, y: &TargetVector, fit: &FitResult) -> RegResult<()> {
    let m = fit.n_samples;
    let shapes_ok = x.nrows() == m
        && x.ncols() == fit.n_features
        && y.len() == m
        && fit.predictions.len() == m
        && fit.residuals.len() == m
        && fit.coefficients.len() == fit.n_features;
    if !shapes_ok {
        return Err(RegressionError::RenderError(format!(
            "data ({}x{}, {} targets) does not match fit result ({} samples, {} features)",
            x.nrows(),
            x.ncols(),
            y.len(),
            m,
            fit.n_features
        )));
    }
    Ok(())
}

fn draw_panels(buf: &mut [u8], y: &[f64], fit: &FitResult) -> RegResult<()> {
    let root = BitMapBackend::with_buffer(buf, (PLOT_WIDTH, PLOT_HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled("Multiple Linear Regression Analysis", (FONT, 40))?;

    let panels = root.split_evenly((2, 2));
    actual_vs_predicted(&panels[0], y, fit)?;
    residuals_vs_predicted(&panels[1], fit)?;
    residual_histogram(&panels[2], fit)?;
    coefficient_bars(&panels[3], fit)?;

    root.present()?;
    Ok(())
}

/// 5% margin on both sides, or a unit margin when all values are equal.
fn padded_range(values: &[f64]) -> Range<f64> {
    match min_max(values) {
        Some((lo, hi)) if hi > lo => {
            let pad = (hi - lo) * 0.05;
            (lo - pad)..(hi + pad)
        },
        Some((v, _)) => (v - 1.0)..(v + 1.0),
        None => -1.0..1.0,
    }
}

fn actual_vs_predicted<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    y: &[f64],
    fit: &FitResult,
) -> RegResult<()> {
    let all: Vec<f64> = y.iter().chain(&fit.predictions).copied().collect();
    let range = padded_range(&all);

    let mut chart = ChartBuilder::on(area)
        .caption(format!("Actual vs Predicted (R² = {:.3})", fit.r_squared), (FONT, 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(range.clone(), range)?;
    chart.configure_mesh().x_desc("Actual Values").y_desc("Predicted Values").draw()?;

    chart.draw_series(
        y.iter()
            .zip(&fit.predictions)
            .map(|(&a, &p)| Circle::new((a, p), 4, POINT_COLOR.mix(0.7).filled())),
    )?;

    if let Some((lo, hi)) = min_max(y) {
        chart.draw_series(std::iter::once(DashedPathElement::new(
            vec![(lo, lo), (hi, hi)],
            10,
            6,
            RED.stroke_width(2),
        )))?;
    }
    Ok(())
}

fn residuals_vs_predicted<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    fit: &FitResult,
) -> RegResult<()> {
    let x_range = padded_range(&fit.predictions);
    let mut with_zero = fit.residuals.clone();
    with_zero.push(0.0);
    let y_range = padded_range(&with_zero);

    let mut chart = ChartBuilder::on(area)
        .caption("Residuals vs Predicted", (FONT, 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range.clone(), y_range)?;
    chart.configure_mesh().x_desc("Predicted Values").y_desc("Residuals").draw()?;

    chart.draw_series(
        fit.predictions
            .iter()
            .zip(&fit.residuals)
            .map(|(&p, &r)| Circle::new((p, r), 4, POINT_COLOR.mix(0.7).filled())),
    )?;
    chart.draw_series(std::iter::once(DashedPathElement::new(
        vec![(x_range.start, 0.0), (x_range.end, 0.0)],
        10,
        6,
        RED.stroke_width(2),
    )))?;
    Ok(())
}

fn residual_histogram<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    fit: &FitResult,
) -> RegResult<()> {
    let hist = histogram(&fit.residuals, HISTOGRAM_BINS).ok_or_else(|| {
        RegressionError::RenderError("no finite residuals to draw a histogram of".into())
    })?;
    let max_count = hist.counts.iter().copied().max().unwrap_or(0).max(1) as f64;
    let x_range = hist.edges[0]..hist.edges[HISTOGRAM_BINS];

    let mut chart = ChartBuilder::on(area)
        .caption("Distribution of Residuals", (FONT, 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, 0.0..max_count * 1.1)?;
    chart.configure_mesh().disable_x_mesh().x_desc("Residuals").y_desc("Frequency").draw()?;

    let bars: Vec<[(f64, f64); 2]> = hist
        .counts
        .iter()
        .enumerate()
        .map(|(i, &c)| [(hist.edges[i], 0.0), (hist.edges[i + 1], c as f64)])
        .collect();
    chart.draw_series(bars.iter().map(|&c| Rectangle::new(c, POINT_COLOR.mix(0.7).filled())))?;
    chart.draw_series(bars.iter().map(|&c| Rectangle::new(c, BLACK.stroke_width(1))))?;
    Ok(())
}

fn coefficient_bars<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    fit: &FitResult,
) -> RegResult<()> {
    let n = fit.coefficients.len();
    if n == 0 {
        area.titled("Feature Coefficients (none)", (FONT, 28))?;
        return Ok(());
    }
    let mut with_zero = fit.coefficients.clone();
    with_zero.push(0.0);
    let y_range = padded_range(&with_zero);

    // inclusive range, n segments
    let mut chart = ChartBuilder::on(area)
        .caption("Feature Coefficients", (FONT, 28))
        .margin(20)
        .x_label_area_size(110)
        .y_label_area_size(70)
        .build_cartesian_2d((0..n - 1).into_segmented(), y_range)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n + 1)
        .x_label_formatter(&|v: &SegmentValue<usize>| match v {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => format!("Feature {}", i + 1),
            SegmentValue::Last => String::new(),
        })
        .x_label_style((FONT, 18).into_font().transform(FontTransform::Rotate90))
        .x_desc("Features")
        .y_desc("Coefficient Value")
        .draw()?;

    let next = |i: usize| if i + 1 < n { SegmentValue::Exact(i + 1) } else { SegmentValue::Last };
    chart.draw_series(fit.coefficients.iter().enumerate().map(|(i, &c)| {
        let mut bar = Rectangle::new(
            [(SegmentValue::Exact(i), 0.0), (next(i), c)],
            POINT_COLOR.mix(0.8).filled(),
        );
        bar.set_margin(0, 0, 12, 12);
        bar
    }))?;
    Ok(())
}
