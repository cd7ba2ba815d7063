//! Plotly rendering of a [`MonthlyFigure`]: one `Plot` per page, panels on a subplot
//! grid, each with a scatter trace of the readings and a box trace built from the
//! panel's per-hour [`BoxStats`].

use crate::visualize::box_stats::BoxStats;
use crate::visualize::monthly::{FigurePage, MonthPanel, MonthlyFigure, HOURS_PER_DAY};
use plotly::common::{Mode, Title};
use plotly::layout::{Axis, GridPattern, LayoutGrid, RowOrder};
use plotly::{BoxPlot, Layout, Plot, Scatter};

const PANEL_HEIGHT_PX: usize = 380;
const FIGURE_WIDTH_PX: usize = 1600;

impl MonthlyFigure {
    /// One plot per page.
    pub fn to_plots(&self) -> Vec<Plot> {
        let page_count = self.pages.len();
        self.pages
            .iter()
            .enumerate()
            .map(|(index, page)| self.page_plot(page, index, page_count))
            .collect()
    }

    /// Standalone HTML document per page.
    pub fn to_html_pages(&self) -> Vec<String> {
        self.to_plots().iter().map(Plot::to_html).collect()
    }

    fn page_plot(&self, page: &FigurePage, index: usize, page_count: usize) -> Plot {
        let mut plot = Plot::new();

        for (slot, panel) in page.panels.iter().enumerate() {
            let (x_ref, y_ref) = axis_refs(slot);
            let hours: Vec<f64> = panel.points.iter().map(|(h, _)| f64::from(*h)).collect();
            let values: Vec<f64> = panel.points.iter().map(|(_, v)| *v).collect();

            let scatter = Scatter::new(hours, values)
                .mode(Mode::Markers)
                .opacity(0.5)
                .name(self.column.as_str())
                .show_legend(false)
                .x_axis(x_ref.as_str())
                .y_axis(y_ref.as_str());
            plot.add_trace(scatter);

            if !panel.boxes.is_empty() {
                plot.add_trace(
                    box_trace(panel)
                        .name(panel.label().as_str())
                        .show_legend(false)
                        .x_axis(x_ref.as_str())
                        .y_axis(y_ref.as_str()),
                );
            }
        }

        let title = if page_count > 1 {
            format!("{} ({}/{})", self.title, index + 1, page_count)
        } else {
            self.title.clone()
        };

        let rows = self.layout.rows();
        let mut layout = Layout::new()
            .title(Title::from(title.as_str()))
            .height(PANEL_HEIGHT_PX * rows)
            .width(FIGURE_WIDTH_PX)
            .grid(
                LayoutGrid::new()
                    .rows(rows)
                    .columns(self.layout.columns())
                    .pattern(GridPattern::Independent)
                    .row_order(RowOrder::TopToBottom),
            );

        for slot in 0..self.layout.panels_per_page() {
            let panel = page.panels.get(slot);
            let x_title = match panel {
                Some(panel) => format!("{} · Hour of Day", panel.label()),
                None => String::new(),
            };
            let x_axis = Axis::new()
                .title(Title::from(x_title.as_str()))
                .range(vec![-0.5, f64::from(HOURS_PER_DAY) - 0.5])
                .tick_values((0..HOURS_PER_DAY).map(f64::from).collect())
                .show_grid(true)
                .visible(panel.is_some());
            let y_axis = Axis::new()
                .title(Title::from(self.column.as_str()))
                .range(vec![self.y_range.0, self.y_range.1])
                .show_grid(true)
                .visible(panel.is_some());
            layout = set_axes(layout, slot, x_axis, y_axis);
        }

        plot.set_layout(layout);
        plot
    }
}

/// Box trace drawn from the panel's own per-hour statistics, so plotly does not
/// recompute quartiles from the points.
fn box_trace(panel: &MonthPanel) -> Box<BoxPlot<f64, f64>> {
    let stat = |pick: fn(&BoxStats) -> f64| -> Vec<f64> {
        panel.boxes.iter().map(|b| pick(&b.stats)).collect()
    };
    BoxPlot::new(Vec::new())
        .x(panel.boxes.iter().map(|b| f64::from(b.hour)).collect())
        .q1(stat(|s| s.q1))
        .median(stat(|s| s.median))
        .q3(stat(|s| s.q3))
        .lower_fence(stat(|s| s.whisker_low))
        .upper_fence(stat(|s| s.whisker_high))
}

/// Plotly axis ids of grid slot `slot` (0-based): `x`/`y`, then `x2`/`y2`, ...
fn axis_refs(slot: usize) -> (String, String) {
    if slot == 0 {
        ("x".to_string(), "y".to_string())
    } else {
        (format!("x{}", slot + 1), format!("y{}", slot + 1))
    }
}

fn set_axes(layout: Layout, slot: usize, x: Axis, y: Axis) -> Layout {
    match slot {
        0 => layout.x_axis(x).y_axis(y),
        1 => layout.x_axis2(x).y_axis2(y),
        2 => layout.x_axis3(x).y_axis3(y),
        3 => layout.x_axis4(x).y_axis4(y),
        4 => layout.x_axis5(x).y_axis5(y),
        5 => layout.x_axis6(x).y_axis6(y),
        6 => layout.x_axis7(x).y_axis7(y),
        7 => layout.x_axis8(x).y_axis8(y),
        // GridLayout never exceeds eight panels.
        _ => layout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::month::Month;
    use crate::visualize::monthly::{FigurePage, GridLayout, HourBox, MonthPanel};

    fn figure(months: &[Month]) -> MonthlyFigure {
        let panels: Vec<MonthPanel> = months
            .iter()
            .map(|month| MonthPanel {
                month: *month,
                points: vec![(3, 410.0), (4, 455.5)],
                boxes: Vec::new(),
            })
            .collect();
        let layout = GridLayout::default();
        MonthlyFigure {
            title: "Monthly 내부CO2 Data Plots".to_string(),
            column: "내부CO2".to_string(),
            y_range: (400.0, 460.0),
            layout,
            pages: panels
                .chunks(layout.panels_per_page())
                .map(|c| FigurePage { panels: c.to_vec() })
                .collect(),
            dropped_months: Vec::new(),
        }
    }

    #[test]
    fn test_axis_refs() {
        assert_eq!(axis_refs(0), ("x".to_string(), "y".to_string()));
        assert_eq!(axis_refs(5), ("x6".to_string(), "y6".to_string()));
    }

    #[test]
    fn test_one_plot_per_page() {
        let months: Vec<Month> = (1..=7).map(|m| Month(2021, m)).collect();
        let figure = figure(&months);
        assert_eq!(figure.to_plots().len(), 2);
    }

    #[test]
    fn test_html_mentions_panels_and_title() {
        let html = figure(&[Month(2021, 3), Month(2021, 4)]).to_html_pages();
        assert_eq!(html.len(), 1);
        assert!(html[0].contains("2021-03"));
        assert!(html[0].contains("2021-04"));
        assert!(html[0].contains("Monthly"));
    }

    #[test]
    fn test_boxes_use_panel_statistics() {
        let stats = BoxStats::from_values(&[400.0, 410.0, 420.0, 430.0, 900.0]).unwrap();
        let panel = MonthPanel {
            month: Month(2021, 3),
            points: vec![(3, 400.0), (3, 410.0), (3, 420.0), (3, 430.0), (3, 900.0)],
            boxes: vec![HourBox {
                hour: 3,
                stats: stats.clone(),
            }],
        };

        let json = serde_json::to_value(box_trace(&panel)).unwrap();

        assert_eq!(json["x"], serde_json::json!([3.0]));
        assert_eq!(json["q1"], serde_json::json!([stats.q1]));
        assert_eq!(json["median"], serde_json::json!([stats.median]));
        assert_eq!(json["q3"], serde_json::json!([stats.q3]));
        assert_eq!(json["upperfence"], serde_json::json!([stats.whisker_high]));
        assert_eq!(json["lowerfence"], serde_json::json!([stats.whisker_low]));
        // 900 lies beyond the upper whisker.
        assert!(stats.whisker_high < 900.0);
    }
}
