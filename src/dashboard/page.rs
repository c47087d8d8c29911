use super::charts::{feature_counts, feature_distribution_figure, top_states_figure};
use super::{DashboardData, DashboardView};
use crate::domain::{FinancialAssistanceRecord, TourismRecord};
use crate::error::Result;
use askama::Template;
use serde_json::Value;

pub const PAGE_TITLE: &str = "Tourism Data Analytics";

/// Colour stops of a light-to-dark blue sequential scale.
const GRADIENT: [(f64, [u8; 3]); 3] = [
    (0.0, [0xff, 0xf7, 0xfb]),
    (0.5, [0x74, 0xa9, 0xcf]),
    (1.0, [0x02, 0x38, 0x58]),
];

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardPage {
    pub title: String,
    pub notice: Option<Notice>,
    pub tables: Vec<DataTable>,
    pub charts: Option<Charts>,
}

/// Error banner shown instead of data.
pub struct Notice {
    pub message: String,
    pub hint: String,
}

pub struct DataTable {
    pub id: String,
    pub heading: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

pub struct Cell {
    pub text: String,
    pub sort_key: String,
    pub style: String,
}

pub struct Charts {
    pub features_json: String,
    pub top_states_json: String,
}

impl DashboardPage {
    pub fn from_view(view: &DashboardView) -> Self {
        let mut page = Self {
            title: PAGE_TITLE.to_string(),
            notice: None,
            tables: Vec::new(),
            charts: None,
        };
        match view {
            DashboardView::Ready(data) => {
                page.tables = vec![financial_table(&data.financial), tourism_table(&data.tourism)];
                page.charts = Some(charts(data));
            }
            DashboardView::ConfigurationError(message) => {
                page.notice = Some(Notice {
                    message: format!("Configuration Error: {message}"),
                    hint: "Please make sure you have created a .env.local file with all required Snowflake credentials."
                        .to_string(),
                });
            }
            DashboardView::ConnectionError(message) => {
                page.notice = Some(Notice {
                    message: format!("Error connecting to Snowflake: {message}"),
                    hint: "Please check your Snowflake credentials and make sure the database is accessible."
                        .to_string(),
                });
            }
        }
        page
    }

    pub fn to_html(&self) -> Result<String> {
        Ok(self.render()?)
    }
}

fn charts(data: &DashboardData) -> Charts {
    Charts {
        features_json: script_json(&feature_distribution_figure(feature_counts(&data.tourism))),
        top_states_json: script_json(&top_states_figure(&data.tourism)),
    }
}

/// JSON safe to embed inside a `<script>` element.
fn script_json(value: &Value) -> String {
    value.to_string().replace("</", "<\\/")
}

fn financial_table(records: &[FinancialAssistanceRecord]) -> DataTable {
    let amounts = Range::of(records.iter().map(|r| Some(r.amount_lakhs)));
    DataTable {
        id: "financial".to_string(),
        heading: "Financial Assistance Overview".to_string(),
        columns: ["STATE_UT", "FINANCIAL_YEAR", "NO_OF_ORGS", "AMOUNT_RS_IN_LAKHS"]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        rows: records
            .iter()
            .map(|r| {
                vec![
                    Cell::text(&r.state_or_territory),
                    Cell::text(&r.fiscal_year),
                    Cell::number(Some(r.org_count as f64), None),
                    Cell::number(Some(r.amount_lakhs), Some(amounts)),
                ]
            })
            .collect(),
    }
}

fn tourism_table(records: &[TourismRecord]) -> DataTable {
    let domestic = Range::of(records.iter().map(|r| r.domestic_visits_millions));
    let foreign = Range::of(records.iter().map(|r| r.foreign_visits_millions));
    DataTable {
        id: "tourism".to_string(),
        heading: "Tourism Data Overview".to_string(),
        columns: [
            "STATE",
            "DOMESTIC_TOURIST_VISITS_MILLION",
            "FOREIGN_TOURIST_VISITS_MILLION",
            "HAS_ART",
            "HAS_CULTURE",
            "HAS_TOURISM",
        ]
        .iter()
        .map(|c| c.to_string())
        .collect(),
        rows: records
            .iter()
            .map(|r| {
                vec![
                    Cell::text(&r.state),
                    Cell::number(r.domestic_visits_millions, Some(domestic)),
                    Cell::number(r.foreign_visits_millions, Some(foreign)),
                    Cell::flag(r.has_art),
                    Cell::flag(r.has_culture),
                    Cell::flag(r.has_tourism),
                ]
            })
            .collect(),
    }
}

impl Cell {
    fn text(value: &str) -> Self {
        Self {
            text: value.to_string(),
            sort_key: value.to_string(),
            style: String::new(),
        }
    }

    fn number(value: Option<f64>, shade: Option<Range>) -> Self {
        match value {
            Some(v) => Self {
                text: v.to_string(),
                sort_key: v.to_string(),
                style: shade.map(|range| gradient_style(range.position(v))).unwrap_or_default(),
            },
            None => Self::missing(),
        }
    }

    fn flag(value: Option<bool>) -> Self {
        match value {
            Some(b) => Self::text(if b { "true" } else { "false" }),
            None => Self::missing(),
        }
    }

    fn missing() -> Self {
        Self {
            text: "None".to_string(),
            sort_key: String::new(),
            style: String::new(),
        }
    }
}

/// Min and max of a column, ignoring NULLs.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Range {
    min: f64,
    max: f64,
}

impl Range {
    fn of(values: impl Iterator<Item = Option<f64>>) -> Self {
        let mut range = Self { min: f64::INFINITY, max: f64::NEG_INFINITY };
        for v in values.flatten() {
            range.min = range.min.min(v);
            range.max = range.max.max(v);
        }
        range
    }

    /// 0.0 at the minimum, 1.0 at the maximum; a flat column sits at 0.
    fn position(self, value: f64) -> f64 {
        let span = self.max - self.min;
        if !span.is_finite() || span <= 0.0 {
            return 0.0;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }
}

fn gradient_style(t: f64) -> String {
    let [r, g, b] = gradient_color(t);
    // Perceived brightness decides the text colour.
    let luminance = (0.2126 * r as f64 + 0.7152 * g as f64 + 0.0722 * b as f64) / 255.0;
    let text = if luminance < 0.5 { "#f1f1f1" } else { "#000000" };
    format!("background-color: #{r:02x}{g:02x}{b:02x}; color: {text}")
}

fn gradient_color(t: f64) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    for pair in GRADIENT.windows(2) {
        let (start, from) = pair[0];
        let (end, to) = pair[1];
        if t <= end {
            let local = (t - start) / (end - start);
            let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * local).round() as u8;
            return [mix(from[0], to[0]), mix(from[1], to[1]), mix(from[2], to[2])];
        }
    }
    GRADIENT[GRADIENT.len() - 1].1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> DashboardData {
        DashboardData {
            financial: vec![
                FinancialAssistanceRecord {
                    state_or_territory: "Goa".to_string(),
                    fiscal_year: "2020-21".to_string(),
                    org_count: 3,
                    amount_lakhs: 12.5,
                    created_at: None,
                },
                FinancialAssistanceRecord {
                    state_or_territory: "Kerala".to_string(),
                    fiscal_year: "2020-21".to_string(),
                    org_count: 7,
                    amount_lakhs: 40.0,
                    created_at: None,
                },
            ],
            tourism: vec![TourismRecord {
                state: "Rajasthan </script>".to_string(),
                domestic_visits_millions: Some(52.3),
                foreign_visits_millions: None,
                has_art: Some(true),
                has_culture: Some(true),
                has_tourism: None,
                created_at: None,
            }],
        }
    }

    #[test]
    fn test_gradient_endpoints() {
        assert_eq!(gradient_color(0.0), [0xff, 0xf7, 0xfb]);
        assert_eq!(gradient_color(1.0), [0x02, 0x38, 0x58]);
        assert!(gradient_style(1.0).ends_with("color: #f1f1f1"));
        assert!(gradient_style(0.0).ends_with("color: #000000"));
    }

    #[test]
    fn test_range_handles_flat_and_empty_columns() {
        let flat = Range::of([Some(2.0), Some(2.0)].into_iter());
        assert_eq!(flat.position(2.0), 0.0);
        let empty = Range::of([None, None].into_iter());
        assert_eq!(empty.position(1.0), 0.0);
        let spread = Range::of([Some(10.0), None, Some(20.0)].into_iter());
        assert_eq!(spread.position(15.0), 0.5);
    }

    #[test]
    fn test_ready_page_renders_tables_and_charts() {
        let html = DashboardPage::from_view(&DashboardView::Ready(sample_data()))
            .to_html()
            .unwrap();
        assert!(html.contains("Financial Assistance Overview"));
        assert!(html.contains("Tourism Data Overview"));
        assert!(html.contains("Distribution of Cultural Features"));
        assert!(html.contains("Top 10 States by Tourist Visits"));
        assert!(html.contains("AMOUNT_RS_IN_LAKHS"));
        // Financial table, then tourism table, then the charts.
        let financial = html.find("Financial Assistance Overview").unwrap();
        let tourism = html.find("Tourism Data Overview").unwrap();
        let charts = html.find("id=\"features-chart\"").unwrap();
        assert!(financial < tourism && tourism < charts);
        // Largest amount gets the darkest shade.
        assert!(html.contains("background-color: #023858"));
        // State names are escaped in the table and cannot close the chart script.
        assert!(html.contains("Rajasthan &lt;"));
        assert!(!html.contains("Rajasthan </script>"));
    }

    #[test]
    fn test_configuration_error_page() {
        let view = DashboardView::ConfigurationError(
            "Missing required environment variables: SNOWFLAKE_USER".to_string(),
        );
        let html = DashboardPage::from_view(&view).to_html().unwrap();
        assert!(html.contains("Configuration Error: Missing required environment variables: SNOWFLAKE_USER"));
        assert!(html.contains(".env.local"));
        assert!(!html.contains("Financial Assistance Overview"));
    }

    #[test]
    fn test_connection_error_page() {
        let view = DashboardView::ConnectionError("timed out".to_string());
        let html = DashboardPage::from_view(&view).to_html().unwrap();
        assert!(html.contains("Error connecting to Snowflake: timed out"));
    }
}
