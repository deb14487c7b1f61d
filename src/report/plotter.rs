//! Chart rendering for summary CSVs.
//!
//! Wealth summaries get one dual-axis chart; class summaries get a gini
//! chart and a class-count chart. Images are PNGs named after the label.

use crate::analysis::read_summary;
use crate::models::{ClassSummary, Schema, Summary, WealthSummary};
use anyhow::{anyhow, Context, Result};
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use std::error::Error;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const TAB_BLUE: RGBColor = RGBColor(31, 119, 180);
const TAB_RED: RGBColor = RGBColor(214, 39, 40);
const TAB_GREEN: RGBColor = RGBColor(44, 160, 44);
const TAB_ORANGE: RGBColor = RGBColor(255, 127, 14);

/// Where and how large to draw.
#[derive(Debug, Clone)]
pub struct PlotSettings {
    pub output_dir: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl Default for PlotSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("plots"),
            width: 1024,
            height: 768,
        }
    }
}

impl PlotSettings {
    /// Image path for a label and chart purpose (`None` for the main chart).
    pub fn image_path(&self, label: &str, purpose: Option<&str>) -> PathBuf {
        let name = match purpose {
            Some(p) => format!("{}_{}_plot.png", label, p),
            None => format!("{}_plot.png", label),
        };
        self.output_dir.join(name)
    }
}

/// Read a summary CSV and render its charts. Returns the saved paths.
///
/// `on_saved` is called with each image as soon as it is on disk, so a
/// later chart failing does not hide the ones already written.
pub fn plot_summary(
    summary_path: &Path,
    label: &str,
    schema: Schema,
    settings: &PlotSettings,
    on_saved: &mut dyn FnMut(&Path),
) -> Result<Vec<PathBuf>> {
    let summary = read_summary(summary_path, schema)?;
    render_summary(&summary, label, settings, on_saved)
}

/// Render charts for an in-memory summary.
pub fn render_summary(
    summary: &Summary,
    label: &str,
    settings: &PlotSettings,
    on_saved: &mut dyn FnMut(&Path),
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(&settings.output_dir).with_context(|| {
        format!(
            "Failed to create plot directory: {}",
            settings.output_dir.display()
        )
    })?;

    if summary.is_empty() {
        warn!("{}: summary has no rows, charts will be blank", label);
    } else {
        let ticks = summary.ticks();
        debug!(
            "{}: plotting {} buckets, ticks {}..={}",
            label,
            ticks.len(),
            ticks[0],
            ticks[ticks.len() - 1]
        );
    }

    let saved = match summary {
        Summary::Wealth(rows) => {
            let path = settings.image_path(label, None);
            draw(&path, |p| draw_wealth_chart(p, rows, label, settings))?;
            on_saved(&path);
            vec![path]
        }
        Summary::Class(rows) => {
            let gini_path = settings.image_path(label, Some("gini"));
            draw(&gini_path, |p| draw_gini_chart(p, rows, label, settings))?;
            on_saved(&gini_path);

            let class_path = settings.image_path(label, Some("class"));
            draw(&class_path, |p| draw_class_chart(p, rows, label, settings))?;
            on_saved(&class_path);

            vec![gini_path, class_path]
        }
    };

    Ok(saved)
}

fn draw<F>(path: &Path, render: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<(), Box<dyn Error>>,
{
    debug!("Rendering {}", path.display());
    render(path).map_err(|e| anyhow!("Failed to render {}: {}", path.display(), e))
}

/// X range covering every tick; a unit range when there is nothing to show.
fn tick_range(ticks: impl Iterator<Item = u64>) -> Range<f64> {
    let (lo, hi) = ticks.fold((u64::MAX, 0u64), |(lo, hi), t| (lo.min(t), hi.max(t)));
    if lo > hi {
        return 0.0..1.0;
    }
    if lo == hi {
        return lo as f64..(hi + 1) as f64;
    }
    lo as f64..hi as f64
}

/// Y range over the finite values, padded by 5% on both sides.
fn value_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi {
        return 0.0..1.0;
    }
    if lo == hi {
        let pad = if lo == 0.0 { 1.0 } else { lo.abs() * 0.05 };
        return (lo - pad)..(hi + pad);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad)..(hi + pad)
}

fn legend_line(color: RGBColor) -> impl Fn((i32, i32)) -> PathElement<(i32, i32)> {
    move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
}

fn draw_wealth_chart(
    path: &Path,
    rows: &[WealthSummary],
    label: &str,
    settings: &PlotSettings,
) -> Result<(), Box<dyn Error>> {
    let x_range = tick_range(rows.iter().map(|r| r.tick));
    let wealth_range = value_range(
        rows.iter()
            .flat_map(|r| [r.total_wealth, r.avg_wealth]),
    );
    let gini_range = value_range(rows.iter().map(|r| r.gini));

    let root = BitMapBackend::new(path, (settings.width, settings.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Wealth and Gini over Time: {}", label),
            ("sans-serif", 22),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .right_y_label_area_size(70)
        .build_cartesian_2d(x_range.clone(), wealth_range)?
        .set_secondary_coord(x_range, gini_range);

    chart
        .configure_mesh()
        .x_desc("Tick")
        .y_desc("Total Wealth / Avg Wealth")
        .y_label_style(("sans-serif", 14).into_font().color(&TAB_BLUE))
        .draw()?;

    chart
        .configure_secondary_axes()
        .y_desc("Gini Coefficient")
        .label_style(("sans-serif", 14).into_font().color(&TAB_RED))
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            rows.iter().map(|r| (r.tick as f64, r.total_wealth)),
            TAB_BLUE.stroke_width(2),
        ))?
        .label("Total Wealth")
        .legend(legend_line(TAB_BLUE));

    chart
        .draw_series(DashedLineSeries::new(
            rows.iter().map(|r| (r.tick as f64, r.avg_wealth)),
            10,
            6,
            TAB_BLUE.stroke_width(2),
        ))?
        .label("Avg Wealth")
        .legend(legend_line(TAB_BLUE));

    chart
        .draw_secondary_series(DashedLineSeries::new(
            rows.iter().map(|r| (r.tick as f64, r.gini)),
            14,
            4,
            TAB_RED.stroke_width(2),
        ))?
        .label("Gini")
        .legend(legend_line(TAB_RED));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_gini_chart(
    path: &Path,
    rows: &[ClassSummary],
    label: &str,
    settings: &PlotSettings,
) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, (settings.width, settings.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Gini over Time: {}", label), ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(
            tick_range(rows.iter().map(|r| r.tick)),
            value_range(rows.iter().map(|r| r.gini)),
        )?;

    chart
        .configure_mesh()
        .x_desc("Tick")
        .y_desc("Gini Coefficient")
        .draw()?;

    chart.draw_series(LineSeries::new(
        rows.iter().map(|r| (r.tick as f64, r.gini)),
        TAB_RED.stroke_width(2),
    ))?;

    root.present()?;
    Ok(())
}

fn draw_class_chart(
    path: &Path,
    rows: &[ClassSummary],
    label: &str,
    settings: &PlotSettings,
) -> Result<(), Box<dyn Error>> {
    let series: [(&str, RGBColor, fn(&ClassSummary) -> i64); 3] = [
        ("Lower Class", TAB_RED, |r| r.num_lower_class),
        ("Middle Class", TAB_ORANGE, |r| r.num_middle_class),
        ("Upper Class", TAB_GREEN, |r| r.num_upper_class),
    ];

    let y_range = value_range(
        rows.iter()
            .flat_map(|r| series.iter().map(move |(_, _, get)| get(r) as f64)),
    );

    let root = BitMapBackend::new(path, (settings.width, settings.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Class Distribution over Time: {}", label),
            ("sans-serif", 22),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(tick_range(rows.iter().map(|r| r.tick)), y_range)?;

    chart
        .configure_mesh()
        .x_desc("Tick")
        .y_desc("Number of People")
        .draw()?;

    for (name, color, get) in series {
        chart
            .draw_series(LineSeries::new(
                rows.iter().map(|r| (r.tick as f64, get(r) as f64)),
                color.stroke_width(2),
            ))?
            .label(name)
            .legend(legend_line(color));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G'];

    fn settings_in(dir: &TempDir) -> PlotSettings {
        PlotSettings {
            output_dir: dir.path().join("plots"),
            width: 320,
            height: 240,
        }
    }

    fn wealth_rows() -> Vec<WealthSummary> {
        (0..5)
            .map(|i| WealthSummary {
                tick: i * 100,
                total_wealth: 1000.0 + i as f64 * 10.0,
                min_wealth: 1.0,
                max_wealth: 90.0,
                avg_wealth: 10.0 + i as f64,
                gini: 0.4 + i as f64 * 0.01,
            })
            .collect()
    }

    fn class_rows() -> Vec<ClassSummary> {
        (0..5)
            .map(|i| ClassSummary {
                tick: i * 100,
                total_wealth: 500.0,
                gini: 0.3,
                num_lower_class: 50 + i as i64,
                num_middle_class: 30,
                num_upper_class: 20 - i as i64,
            })
            .collect()
    }

    #[test]
    fn test_image_path_naming() {
        let settings = PlotSettings::default();
        assert_eq!(
            settings.image_path("Default", None),
            PathBuf::from("plots/Default_plot.png")
        );
        assert_eq!(
            settings.image_path("Default", Some("class")),
            PathBuf::from("plots/Default_class_plot.png")
        );
    }

    #[test]
    fn test_tick_range_degenerate() {
        assert_eq!(tick_range(std::iter::empty()), 0.0..1.0);
        assert_eq!(tick_range([7u64].into_iter()), 7.0..8.0);
        assert_eq!(tick_range([9u64, 2, 5].into_iter()), 2.0..9.0);
    }

    #[test]
    fn test_value_range_padding() {
        assert_eq!(value_range(std::iter::empty()), 0.0..1.0);
        assert_eq!(value_range([0.0].into_iter()), -1.0..1.0);

        let r = value_range([0.0, 10.0, f64::NAN].into_iter());
        assert!((r.start + 0.5).abs() < 1e-12);
        assert!((r.end - 10.5).abs() < 1e-12);
    }

    #[test]
    fn test_wealth_plot_written_and_overwritten() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(&dir);
        let summary = Summary::Wealth(wealth_rows());

        let saved = render_summary(&summary, "Default", &settings, &mut |_| {}).unwrap();
        assert_eq!(saved, vec![settings.output_dir.join("Default_plot.png")]);

        let bytes = std::fs::read(&saved[0]).unwrap();
        assert!(bytes.starts_with(PNG_MAGIC));

        let again = render_summary(&summary, "Default", &settings, &mut |_| {}).unwrap();
        assert_eq!(again, saved);
        assert!(saved[0].exists());
    }

    #[test]
    fn test_class_plots_written() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(&dir);
        let summary = Summary::Class(class_rows());

        let saved = render_summary(&summary, "Inheritance", &settings, &mut |_| {}).unwrap();
        assert_eq!(
            saved,
            vec![
                settings.output_dir.join("Inheritance_gini_plot.png"),
                settings.output_dir.join("Inheritance_class_plot.png"),
            ]
        );
        for path in &saved {
            assert!(std::fs::read(path).unwrap().starts_with(PNG_MAGIC));
        }
    }

    #[test]
    fn test_written_chart_announced_when_later_chart_fails() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(&dir);
        // A directory in the way makes the second chart unwritable.
        std::fs::create_dir_all(settings.image_path("Inheritance", Some("class"))).unwrap();

        let mut announced = Vec::new();
        let result = render_summary(
            &Summary::Class(class_rows()),
            "Inheritance",
            &settings,
            &mut |p| announced.push(p.to_path_buf()),
        );

        assert!(result.is_err());
        assert_eq!(
            announced,
            vec![settings.output_dir.join("Inheritance_gini_plot.png")]
        );
        assert!(announced[0].exists());
    }

    #[test]
    fn test_empty_summary_still_plots() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(&dir);

        let saved =
            render_summary(&Summary::Wealth(Vec::new()), "Empty", &settings, &mut |_| {}).unwrap();
        assert!(saved[0].exists());
    }

    #[test]
    fn test_plot_summary_from_csv() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(&dir);
        let csv_path = dir.path().join("RandomSpawn_Processed.csv");
        std::fs::write(
            &csv_path,
            "tick,totalWealth,minWealth,maxWealth,avgWealth,gini\n\
             0,1000.00,1.00,90.00,10.00,0.4000\n\
             100,1010.00,1.00,91.00,10.10,0.4100\n",
        )
        .unwrap();

        let mut announced = Vec::new();
        let saved = plot_summary(&csv_path, "RandomSpawn", Schema::Wealth, &settings, &mut |p| {
            announced.push(p.to_path_buf())
        })
        .unwrap();
        assert_eq!(announced, saved);
        assert_eq!(saved.len(), 1);
        assert!(saved[0].ends_with("RandomSpawn_plot.png"));
        assert!(saved[0].exists());
    }
}
