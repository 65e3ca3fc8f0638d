//! Self-contained SVG charts: box plots, scatter plots, daily line charts and
//! bar charts. Every chart shares one frame (background, title, axes, grid)
//! and only draws its marks inside the plot area.

use crate::stats::BoxStats;
use chrono::NaiveDate;

const WIDTH: f32 = 800.0;
const HEIGHT: f32 = 500.0;
const MARGIN_LEFT: f32 = 80.0;
const MARGIN_RIGHT: f32 = 30.0;
const MARGIN_TOP: f32 = 60.0;
const MARGIN_BOTTOM: f32 = 80.0;
const Y_TICKS: usize = 5;
const X_TICKS: usize = 6;
const MAX_LABEL_CHARS: usize = 14;

const PLOT_LEFT: f32 = MARGIN_LEFT;
const PLOT_RIGHT: f32 = WIDTH - MARGIN_RIGHT;
const PLOT_TOP: f32 = MARGIN_TOP;
const PLOT_BOTTOM: f32 = HEIGHT - MARGIN_BOTTOM;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Theme {
    Dark,
    #[default]
    Light,
}

pub struct ThemeColors {
    pub bg: &'static str,
    pub text: &'static str,
    pub axis: &'static str,
    pub grid: &'static str,
    pub series: [&'static str; 4],
}

impl Theme {
    pub fn colors(self) -> ThemeColors {
        match self {
            Theme::Dark => ThemeColors {
                bg: "#161b22",
                text: "#c9d1d9",
                axis: "#8b949e",
                grid: "#30363d",
                series: ["#58a6ff", "#ffa657", "#3fb950", "#f85149"],
            },
            Theme::Light => ThemeColors {
                bg: "#ffffff",
                text: "#24292f",
                axis: "#57606a",
                grid: "#d0d7de",
                series: ["#0366d6", "#d73a49", "#28a745", "#6f42c1"],
            },
        }
    }
}

/// One named daily series of a line chart.
#[derive(Debug, Clone)]
pub struct Series {
    pub name: String,
    pub points: Vec<(NaiveDate, f64)>,
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn truncate_label(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_CHARS {
        return label.to_string();
    }
    let head: String = label.chars().take(MAX_LABEL_CHARS - 1).collect();
    format!("{head}…")
}

fn format_tick(v: f64) -> String {
    if v.fract().abs() < 1e-9 {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}

/// Linear map from a data range onto a pixel range.
#[derive(Debug, Clone, Copy)]
struct Scale {
    lo: f64,
    hi: f64,
    from: f32,
    to: f32,
}

impl Scale {
    /// Padded range covering `min..=max`; starts at zero for non-negative data.
    fn covering(min: f64, max: f64, from: f32, to: f32) -> Self {
        let (mut lo, hi) = if min == max {
            (min - 1.0, max + 1.0)
        } else {
            let pad = (max - min) * 0.05;
            (min - pad, max + pad)
        };
        if min >= 0.0 {
            lo = lo.max(0.0);
        }
        Self { lo, hi, from, to }
    }

    fn map(&self, v: f64) -> f32 {
        let t = (v - self.lo) / (self.hi - self.lo);
        self.from + (self.to - self.from) * t as f32
    }

    fn ticks(&self, count: usize) -> impl Iterator<Item = f64> + '_ {
        let step = (self.hi - self.lo) / count as f64;
        (0..=count).map(move |i| self.lo + step * i as f64)
    }
}

fn min_max(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values.into_iter().fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

fn y_grid(y: &Scale, colors: &ThemeColors) -> String {
    let mut out = String::new();
    for v in y.ticks(Y_TICKS) {
        let py = y.map(v);
        out.push_str(&format!(
            r#"<line x1="{PLOT_LEFT}" y1="{py}" x2="{PLOT_RIGHT}" y2="{py}" stroke="{grid}" stroke-width="1"/>
<text x="{x}" y="{ty}" text-anchor="end" fill="{text}">{label}</text>
"#,
            grid = colors.grid,
            x = PLOT_LEFT - 8.0,
            ty = py + 4.0,
            text = colors.text,
            label = format_tick(v),
        ));
    }
    out
}

fn x_label_at(px: f32, label: &str, colors: &ThemeColors) -> String {
    format!(
        r#"<text x="{px}" y="{y}" text-anchor="middle" fill="{text}">{label}</text>
"#,
        y = PLOT_BOTTOM + 20.0,
        text = colors.text,
        label = escape_xml(label),
    )
}

fn legend(names: &[&str], colors: &ThemeColors) -> String {
    let mut out = String::new();
    for (i, name) in names.iter().enumerate() {
        let x = PLOT_LEFT + 10.0 + (i as f32) * 160.0;
        let y = PLOT_TOP + 14.0;
        out.push_str(&format!(
            r#"<rect x="{x}" y="{ry}" width="12" height="12" fill="{fill}"/>
<text x="{tx}" y="{y}" fill="{text}">{name}</text>
"#,
            ry = y - 10.0,
            fill = colors.series[i % colors.series.len()],
            tx = x + 18.0,
            text = colors.text,
            name = escape_xml(&truncate_label(name)),
        ));
    }
    out
}

fn no_data(colors: &ThemeColors) -> String {
    format!(
        r#"<text x="{x}" y="{y}" text-anchor="middle" fill="{text}">No data</text>
"#,
        x = (PLOT_LEFT + PLOT_RIGHT) / 2.0,
        y = (PLOT_TOP + PLOT_BOTTOM) / 2.0,
        text = colors.text,
    )
}

/// Wraps chart marks in the shared SVG document.
fn frame(theme: Theme, title: &str, x_label: &str, y_label: &str, marks: &str) -> String {
    let colors = theme.colors();
    format!(
        r#"<?xml version='1.0' encoding='UTF-8'?>
<svg xmlns="http://www.w3.org/2000/svg"
     width="{WIDTH}px" height="{HEIGHT}px"
     font-family="Helvetica,Arial,sans-serif"
     font-size="12px">

<rect width="{WIDTH}px" height="{HEIGHT}px" fill="{bg}" rx="8"/>

<text x="{title_x}" y="30" text-anchor="middle" font-size="18px" fill="{text}">{title}</text>

<!-- MARKS -->
{marks}
<!-- AXES -->
<line x1="{PLOT_LEFT}" y1="{PLOT_TOP}" x2="{PLOT_LEFT}" y2="{PLOT_BOTTOM}" stroke="{axis}" stroke-width="1.5"/>
<line x1="{PLOT_LEFT}" y1="{PLOT_BOTTOM}" x2="{PLOT_RIGHT}" y2="{PLOT_BOTTOM}" stroke="{axis}" stroke-width="1.5"/>

<text x="{title_x}" y="{x_label_y}" text-anchor="middle" font-size="14px" fill="{text}">{x_label}</text>
<text x="20" y="{y_label_y}" text-anchor="middle" font-size="14px" fill="{text}" transform="rotate(-90 20 {y_label_y})">{y_label}</text>

</svg>
"#,
        bg = colors.bg,
        text = colors.text,
        axis = colors.axis,
        title_x = WIDTH / 2.0,
        title = escape_xml(title),
        x_label_y = HEIGHT - 20.0,
        x_label = escape_xml(x_label),
        y_label_y = (PLOT_TOP + PLOT_BOTTOM) / 2.0,
        y_label = escape_xml(y_label),
    )
}

/// One box per group; the group label shows the sample size.
pub fn box_plot(theme: Theme, title: &str, y_label: &str, groups: &[(String, Vec<f64>)]) -> String {
    let colors = theme.colors();
    let boxes: Vec<(&str, usize, Option<BoxStats>)> = groups
        .iter()
        .map(|(name, values)| (name.as_str(), values.len(), BoxStats::from_values(values)))
        .collect();

    let Some((min, max)) = min_max(
        boxes
            .iter()
            .filter_map(|(_, _, b)| b.as_ref())
            .flat_map(|b| [b.min, b.max]),
    ) else {
        return frame(theme, title, "", y_label, &no_data(&colors));
    };

    let y = Scale::covering(min, max, PLOT_BOTTOM, PLOT_TOP);
    let slot = (PLOT_RIGHT - PLOT_LEFT) / boxes.len() as f32;
    let box_w = slot * 0.5;
    let mut marks = y_grid(&y, &colors);

    for (i, (name, n, stats)) in boxes.iter().enumerate() {
        let cx = PLOT_LEFT + slot * (i as f32 + 0.5);
        marks.push_str(&x_label_at(cx, &format!("{} (n={n})", truncate_label(name)), &colors));

        let Some(b) = stats else { continue };
        let fill = colors.series[i % colors.series.len()];
        let left = cx - box_w / 2.0;
        let top = y.map(b.q3);
        let height = (y.map(b.q1) - top).max(1.0);

        marks.push_str(&format!(
            r#"<line x1="{cx}" y1="{wt}" x2="{cx}" y2="{wb}" stroke="{axis}" stroke-width="1.5"/>
<line x1="{cl}" y1="{wt}" x2="{cr}" y2="{wt}" stroke="{axis}" stroke-width="1.5"/>
<line x1="{cl}" y1="{wb}" x2="{cr}" y2="{wb}" stroke="{axis}" stroke-width="1.5"/>
<rect x="{left}" y="{top}" width="{box_w}" height="{height}" fill="{fill}" fill-opacity="0.6" stroke="{axis}"/>
<line x1="{left}" y1="{my}" x2="{right}" y2="{my}" stroke="{text}" stroke-width="2"/>
"#,
            wt = y.map(b.upper_whisker),
            wb = y.map(b.lower_whisker),
            cl = cx - box_w / 4.0,
            cr = cx + box_w / 4.0,
            axis = colors.axis,
            right = left + box_w,
            my = y.map(b.median),
            text = colors.text,
        ));

        for outlier in &b.outliers {
            marks.push_str(&format!(
                r#"<circle cx="{cx}" cy="{cy}" r="3" fill="none" stroke="{fill}"/>
"#,
                cy = y.map(*outlier),
            ));
        }
    }

    frame(theme, title, "", y_label, &marks)
}

pub fn scatter_plot(
    theme: Theme,
    title: &str,
    x_label: &str,
    y_label: &str,
    points: &[(f64, f64)],
) -> String {
    let colors = theme.colors();
    let (Some((x_min, x_max)), Some((y_min, y_max))) = (
        min_max(points.iter().map(|p| p.0)),
        min_max(points.iter().map(|p| p.1)),
    ) else {
        return frame(theme, title, x_label, y_label, &no_data(&colors));
    };

    let x = Scale::covering(x_min, x_max, PLOT_LEFT, PLOT_RIGHT);
    let y = Scale::covering(y_min, y_max, PLOT_BOTTOM, PLOT_TOP);
    let mut marks = y_grid(&y, &colors);

    for v in x.ticks(X_TICKS - 1) {
        marks.push_str(&x_label_at(x.map(v), &format_tick(v), &colors));
    }
    for (px, py) in points {
        marks.push_str(&format!(
            r#"<circle cx="{cx}" cy="{cy}" r="4" fill="{fill}" fill-opacity="0.7"/>
"#,
            cx = x.map(*px),
            cy = y.map(*py),
            fill = colors.series[0],
        ));
    }

    frame(theme, title, x_label, y_label, &marks)
}

/// Daily series drawn on a shared date axis.
pub fn line_chart(theme: Theme, title: &str, y_label: &str, series: &[Series]) -> String {
    let colors = theme.colors();
    let all = || series.iter().flat_map(|s| s.points.iter());
    let (Some(first), Some(last), Some((_, y_max))) = (
        all().map(|p| p.0).min(),
        all().map(|p| p.0).max(),
        min_max(all().map(|p| p.1)),
    ) else {
        return frame(theme, title, "Date", y_label, &no_data(&colors));
    };

    let span = (last - first).num_days() as f64;
    let x = Scale {
        lo: 0.0,
        hi: span.max(1.0),
        from: PLOT_LEFT,
        to: PLOT_RIGHT,
    };
    let y = Scale::covering(0.0, y_max, PLOT_BOTTOM, PLOT_TOP);
    let mut marks = y_grid(&y, &colors);

    let tick_count = (span as usize).clamp(1, X_TICKS - 1);
    for i in 0..=tick_count {
        let offset = (span * i as f64 / tick_count as f64).round();
        let date = first + chrono::Duration::days(offset as i64);
        marks.push_str(&x_label_at(x.map(offset), &date.format("%Y-%m-%d").to_string(), &colors));
    }

    for (i, s) in series.iter().enumerate() {
        let stroke = colors.series[i % colors.series.len()];
        let coords: Vec<String> = s
            .points
            .iter()
            .map(|(d, v)| {
                let offset = (*d - first).num_days() as f64;
                format!("{},{}", x.map(offset), y.map(*v))
            })
            .collect();
        marks.push_str(&format!(
            r#"<polyline points="{points}" fill="none" stroke="{stroke}" stroke-width="2"/>
"#,
            points = coords.join(" "),
        ));
    }

    if series.len() > 1 {
        let names: Vec<&str> = series.iter().map(|s| s.name.as_str()).collect();
        marks.push_str(&legend(&names, &colors));
    }

    frame(theme, title, "Date", y_label, &marks)
}

pub fn bar_chart(theme: Theme, title: &str, y_label: &str, bars: &[(String, f64)]) -> String {
    let colors = theme.colors();
    let Some((_, max)) = min_max(bars.iter().map(|b| b.1)) else {
        return frame(theme, title, "", y_label, &no_data(&colors));
    };

    let y = Scale::covering(0.0, max, PLOT_BOTTOM, PLOT_TOP);
    let slot = (PLOT_RIGHT - PLOT_LEFT) / bars.len() as f32;
    let bar_w = slot * 0.7;
    let mut marks = y_grid(&y, &colors);

    for (i, (name, value)) in bars.iter().enumerate() {
        let cx = PLOT_LEFT + slot * (i as f32 + 0.5);
        let top = y.map(*value);
        marks.push_str(&format!(
            r#"<rect x="{x}" y="{top}" width="{bar_w}" height="{h}" fill="{fill}"/>
<text x="{cx}" y="{ty}" text-anchor="middle" fill="{text}">{label}</text>
"#,
            x = cx - bar_w / 2.0,
            h = (PLOT_BOTTOM - top).max(0.0),
            fill = colors.series[0],
            ty = top - 4.0,
            text = colors.text,
            label = format_tick(*value),
        ));
        marks.push_str(&x_label_at(cx, &truncate_label(name), &colors));
    }

    frame(theme, title, "", y_label, &marks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(svg: &str, needle: &str) -> usize {
        svg.matches(needle).count()
    }

    #[test]
    fn box_plot_draws_one_box_per_non_empty_group() {
        let svg = box_plot(
            Theme::Light,
            "Commits",
            "Commits",
            &[
                ("open".to_string(), vec![1.0, 2.0, 3.0]),
                ("closed".to_string(), vec![2.0, 4.0, 40.0, 3.0, 3.0]),
                ("draft".to_string(), vec![]),
            ],
        );

        assert!(svg.starts_with("<?xml"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(count(&svg, "fill-opacity=\"0.6\""), 2);
        assert!(svg.contains("open (n=3)"));
        assert!(svg.contains("draft (n=0)"));
        assert_eq!(count(&svg, "<circle"), 1);
    }

    #[test]
    fn box_labels_keep_the_sample_size_when_names_are_long() {
        let svg = box_plot(
            Theme::Light,
            "Changed files",
            "Files",
            &[
                ("CONTRIBUTOR".to_string(), vec![1.0, 2.0]),
                ("FIRST_TIME_CONTRIBUTOR".to_string(), vec![3.0]),
            ],
        );

        assert!(svg.contains("CONTRIBUTOR (n=2)"));
        assert!(svg.contains("FIRST_TIME_CO… (n=1)"));
    }

    #[test]
    fn empty_inputs_render_no_data() {
        for svg in [
            box_plot(Theme::Dark, "t", "y", &[]),
            scatter_plot(Theme::Dark, "t", "x", "y", &[]),
            line_chart(Theme::Dark, "t", "y", &[]),
            bar_chart(Theme::Dark, "t", "y", &[]),
        ] {
            assert!(svg.contains("No data"));
            assert!(svg.contains("#161b22"));
        }
    }

    #[test]
    fn scatter_plot_places_every_point() {
        let svg = scatter_plot(
            Theme::Light,
            "Additions vs Deletions",
            "Additions",
            "Deletions",
            &[(1.0, 2.0), (10.0, 0.0), (5.0, 5.0)],
        );

        assert_eq!(count(&svg, "<circle"), 3);
        assert!(svg.contains("Additions vs Deletions"));
    }

    #[test]
    fn line_chart_has_a_polyline_per_series_and_a_legend() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        let svg = line_chart(
            Theme::Light,
            "PRs per day",
            "PRs",
            &[
                Series {
                    name: "Opened".to_string(),
                    points: vec![(day(1), 1.0), (day(2), 0.0), (day(3), 2.0)],
                },
                Series {
                    name: "Closed".to_string(),
                    points: vec![(day(2), 1.0)],
                },
            ],
        );

        assert_eq!(count(&svg, "<polyline"), 2);
        assert!(svg.contains("Opened"));
        assert!(svg.contains("2024-01-01"));
        assert!(svg.contains("2024-01-03"));
    }

    #[test]
    fn bar_labels_are_escaped_and_truncated() {
        let svg = bar_chart(
            Theme::Light,
            "Users",
            "Users",
            &[
                ("a<b>&c".to_string(), 3.0),
                ("a-very-long-repository-name".to_string(), 1.0),
            ],
        );

        assert!(svg.contains("a&lt;b&gt;&amp;c"));
        assert!(svg.contains("a-very-long-r…"));
        assert!(!svg.contains("a-very-long-repository-name"));
    }
}
