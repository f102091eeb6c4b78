//! SVG line charts: one line per country, plus `×` markers for projected values.
//!
//! - Distinct series colors (Microsoft Office palette)
//! - Large magnitudes are scaled to thousands/millions/… on the Y axis
//! - Legend inside the plotting area, upper left

use crate::models::LongRecord;
use crate::projection::ProjectionReport;
use anyhow::{Result, anyhow};
use plotters::prelude::*;
use plotters::style::FontFamily;
use plotters_svg::SVGBackend;
use std::collections::BTreeMap;
use std::path::Path;

/// Microsoft Office (2013+) chart series palette.
const OFFICE10: [RGBColor; 10] = [
    RGBColor(68, 114, 196),  // blue      (#4472C4)
    RGBColor(237, 125, 49),  // orange    (#ED7D31)
    RGBColor(165, 165, 165), // gray      (#A5A5A5)
    RGBColor(255, 192, 0),   // gold      (#FFC000)
    RGBColor(91, 155, 213),  // light blue(#5B9BD5)
    RGBColor(112, 173, 71),  // green     (#70AD47)
    RGBColor(38, 68, 120),   // dark blue (#264478)
    RGBColor(158, 72, 14),   // dark org. (#9E480E)
    RGBColor(99, 99, 99),    // dark gray (#636363)
    RGBColor(153, 115, 0),   // brownish  (#997300)
];

#[inline]
fn office_color(idx: usize) -> RGBColor {
    OFFICE10[idx % OFFICE10.len()]
}

/// Pick a single Y-axis scale and its human label based on the overall magnitude.
/// Returns (scale, label), e.g. (1e6, "millions").
pub fn choose_axis_scale(max_abs: f64) -> (f64, &'static str) {
    if max_abs >= 1.0e12 {
        (1.0e12, "trillions")
    } else if max_abs >= 1.0e9 {
        (1.0e9, "billions")
    } else if max_abs >= 1.0e6 {
        (1.0e6, "millions")
    } else if max_abs >= 1.0e3 {
        (1.0e3, "thousands")
    } else {
        (1.0, "")
    }
}

/// A projected value drawn as a marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub country_code: String,
    pub year: i32,
    pub value: f64,
}

/// Markers for the stage-1 (predictor) projections of a report.
pub fn predictor_markers(report: &ProjectionReport) -> Vec<Marker> {
    report
        .rows
        .iter()
        .map(|r| Marker {
            country_code: r.country_code.clone(),
            year: report.target_year,
            value: r.predictor_at_target,
        })
        .collect()
}

/// Markers for the defined stage-2 (response) projections of a report.
pub fn response_markers(report: &ProjectionReport) -> Vec<Marker> {
    report
        .rows
        .iter()
        .filter_map(|r| {
            Some(Marker {
                country_code: r.country_code.clone(),
                year: report.target_year,
                value: r.response_at_target()?,
            })
        })
        .collect()
}

/// Draw `rows` (grouped by country) and `markers` to an SVG file.
pub fn plot_series<P: AsRef<Path>>(
    rows: &[LongRecord],
    markers: &[Marker],
    title: &str,
    y_label: &str,
    out_path: P,
    width: u32,
    height: u32,
) -> Result<()> {
    if rows.is_empty() {
        return Err(anyhow!("no data to plot"));
    }

    let years = rows
        .iter()
        .map(|r| r.year)
        .chain(markers.iter().map(|m| m.year));
    let (mut min_year, mut max_year) = years.fold((i32::MAX, i32::MIN), |(lo, hi), y| {
        (lo.min(y), hi.max(y))
    });
    if min_year == max_year {
        min_year -= 1;
        max_year += 1;
    }

    let values = rows
        .iter()
        .map(|r| r.value)
        .chain(markers.iter().map(|m| m.value));
    let (mut min_val, mut max_val) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if (max_val - min_val).abs() < f64::EPSILON {
        min_val -= 1.0;
        max_val += 1.0;
    }

    let (yscale, scale_word) = choose_axis_scale(min_val.abs().max(max_val.abs()));
    let y_desc = if scale_word.is_empty() {
        y_label.to_string()
    } else {
        format!("{y_label} ({scale_word})")
    };

    let mut groups: BTreeMap<&str, (&str, Vec<(f64, f64)>)> = BTreeMap::new();
    for r in rows {
        groups
            .entry(r.country_code.as_str())
            .or_insert_with(|| (r.country_name.as_str(), Vec::new()))
            .1
            .push((r.year as f64, r.value / yscale));
    }
    for (_, series) in groups.values_mut() {
        series.sort_by(|a, b| a.0.total_cmp(&b.0));
    }

    let out_path = out_path.as_ref();
    let root = SVGBackend::new(out_path, (width, height)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| anyhow!("{:?}", e))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(16)
        .caption(title, (FontFamily::SansSerif, 22))
        .set_label_area_size(LabelAreaPosition::Left, 70)
        .set_label_area_size(LabelAreaPosition::Bottom, 44)
        .build_cartesian_2d(
            (min_year as f64)..(max_year as f64),
            (min_val / yscale)..(max_val / yscale),
        )
        .map_err(|e| anyhow!("{:?}", e))?;

    let x_label_fmt = |x: &f64| (x.round() as i32).to_string();
    let y_label_fmt = |v: &f64| {
        let a = v.abs();
        let prec = if a >= 100.0 {
            0
        } else if a >= 10.0 {
            1
        } else {
            2
        };
        format!("{:.*}", prec, *v)
    };

    chart
        .configure_mesh()
        .x_desc("Year")
        .y_desc(y_desc)
        .x_labels(((max_year - min_year + 1) as usize).min(12))
        .y_labels(10)
        .x_label_formatter(&x_label_fmt)
        .y_label_formatter(&y_label_fmt)
        .label_style((FontFamily::SansSerif, 12))
        .axis_desc_style((FontFamily::SansSerif, 14))
        .draw()
        .map_err(|e| anyhow!("{:?}", e))?;

    for (idx, (_code, (name, series))) in groups.iter().enumerate() {
        let color = office_color(idx);
        chart
            .draw_series(LineSeries::new(series.clone(), color.stroke_width(2)))
            .map_err(|e| anyhow!("{:?}", e))?
            .label(*name)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    if !markers.is_empty() {
        chart
            .draw_series(markers.iter().map(|m| {
                Cross::new(
                    (m.year as f64, m.value / yscale),
                    6,
                    BLACK.stroke_width(2),
                )
            }))
            .map_err(|e| anyhow!("{:?}", e))?
            .label("Projection")
            .legend(|(x, y)| Cross::new((x + 10, y), 5, BLACK.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.85))
        .label_font((FontFamily::SansSerif, 12))
        .draw()
        .map_err(|e| anyhow!("{:?}", e))?;

    root.present().map_err(|e| anyhow!("{:?}", e))?;
    log::debug!("wrote chart {}", out_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_scale_thresholds() {
        assert_eq!(choose_axis_scale(999.0), (1.0, ""));
        assert_eq!(choose_axis_scale(12_000.0), (1.0e3, "thousands"));
        assert_eq!(choose_axis_scale(3.5e9), (1.0e9, "billions"));
    }

    #[test]
    fn writes_svg_with_legend_and_markers() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("series.svg");
        let rows: Vec<LongRecord> = (0..4)
            .map(|i| LongRecord {
                country_name: "Chile".into(),
                country_code: "CHL".into(),
                year: 2005 + i,
                value: 20.0 + i as f64,
            })
            .collect();
        let markers = [Marker {
            country_code: "CHL".into(),
            year: 2030,
            value: 48.0,
        }];
        plot_series(&rows, &markers, "Renewables", "share", &out, 640, 400).unwrap();
        let svg = std::fs::read_to_string(&out).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Chile"));
        assert!(svg.contains("Projection"));
        assert!(plot_series(&[], &[], "t", "y", &out, 10, 10).is_err());
    }
}
