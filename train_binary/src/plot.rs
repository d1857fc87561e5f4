use anyhow::{Context, Result, anyhow};
use plotters::prelude::*;
use std::path::Path;
use training::RangeFinderResult;

/// Renders raw and smoothed loss against `log10(learning rate)` as an SVG.
pub fn plot_lr(result: &RangeFinderResult, output_path: &Path) -> Result<()> {
    let actual = finite_points(&result.log_rates, &result.losses);
    let smoothed = finite_points(&result.log_rates, &result.smoothed_losses);
    if actual.is_empty() && smoothed.is_empty() {
        return Err(anyhow!("Range finder result has no finite losses to plot"));
    }

    let (x_min, x_max) = padded_range(actual.iter().chain(&smoothed).map(|&(x, _)| x));
    let (y_min, y_max) = padded_range(actual.iter().chain(&smoothed).map(|&(_, y)| y));

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create graphs directory")?;
    }
    let root = SVGBackend::new(output_path, (1024, 768)).into_drawing_area();
    root.fill(&WHITE).context("Failed to fill drawing area")?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Learning rate range test", ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .context("Failed to build chart")?;

    chart
        .configure_mesh()
        .x_labels(10)
        .y_labels(10)
        .x_label_formatter(&|x: &f64| format!("{x:.1}"))
        .y_label_formatter(&|y: &f64| format!("{y:.3}"))
        .x_desc("log10(learning rate)")
        .y_desc("Loss")
        .draw()
        .context("Failed to draw mesh")?;

    chart
        .draw_series(LineSeries::new(actual, &BLUE))
        .context("Failed to draw loss line")?
        .label("actual loss")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

    chart
        .draw_series(LineSeries::new(smoothed, &RED))
        .context("Failed to draw smoothed loss line")?
        .label("smoothed loss")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .margin(10)
        .draw()
        .context("Failed to draw legend")?;

    root.present().context("Failed to write graph")?;
    Ok(())
}

fn finite_points(xs: &[f64], ys: &[f64]) -> Vec<(f64, f64)> {
    xs.iter()
        .zip(ys)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(&x, &y)| (x, y))
        .collect()
}

/// Bounds of `values` widened by 5%, or by 0.5 when they collapse to a point.
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let pad = if max > min { (max - min) * 0.05 } else { 0.5 };
    (min - pad, max + pad)
}
