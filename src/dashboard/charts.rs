//! Plotly figure specs for the two dashboard charts.

use crate::domain::TourismRecord;
use serde_json::{json, Value};
use std::cmp::Ordering;

const FONT_COLOR: &str = "#1E3A8A";
pub const TOP_STATES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureCounts {
    pub art: usize,
    pub culture: usize,
    pub tourism: usize,
}

/// Number of rows flagged true for each feature; NULL counts as false.
pub fn feature_counts(records: &[TourismRecord]) -> FeatureCounts {
    let count = |flag: fn(&TourismRecord) -> Option<bool>| {
        records.iter().filter(|r| flag(r).unwrap_or(false)).count()
    };
    FeatureCounts {
        art: count(|r| r.has_art),
        culture: count(|r| r.has_culture),
        tourism: count(|r| r.has_tourism),
    }
}

/// Rows with the most domestic visits, missing values last, input order kept on ties.
pub fn top_by_domestic_visits(records: &[TourismRecord], n: usize) -> Vec<&TourismRecord> {
    let mut sorted: Vec<&TourismRecord> = records.iter().collect();
    sorted.sort_by(|a, b| match (a.domestic_visits_millions, b.domestic_visits_millions) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    sorted.truncate(n);
    sorted
}

fn base_layout(title: &str) -> Value {
    json!({
        "title": { "text": title },
        "plot_bgcolor": "white",
        "paper_bgcolor": "white",
        "font": { "color": FONT_COLOR },
    })
}

/// Donut chart of the three feature counts.
pub fn feature_distribution_figure(counts: FeatureCounts) -> Value {
    json!({
        "data": [{
            "type": "pie",
            "labels": ["Art", "Culture", "Tourism"],
            "values": [counts.art, counts.culture, counts.tourism],
            "hole": 0.4,
        }],
        "layout": base_layout("Distribution of Cultural Features"),
    })
}

/// Grouped bars of domestic and foreign visits for the top states.
pub fn top_states_figure(records: &[TourismRecord]) -> Value {
    let top = top_by_domestic_visits(records, TOP_STATES);
    let states: Vec<&str> = top.iter().map(|r| r.state.as_str()).collect();
    let domestic: Vec<Option<f64>> = top.iter().map(|r| r.domestic_visits_millions).collect();
    let foreign: Vec<Option<f64>> = top.iter().map(|r| r.foreign_visits_millions).collect();

    let mut layout = base_layout("Top 10 States by Tourist Visits");
    layout["barmode"] = json!("group");
    layout["xaxis"] = json!({ "title": { "text": "State" } });
    layout["yaxis"] = json!({ "title": { "text": "Number of Tourists (Millions)" } });
    layout["legend"] = json!({ "title": { "text": "Tourist Type" } });

    json!({
        "data": [
            { "type": "bar", "name": "Domestic", "x": states, "y": domestic },
            { "type": "bar", "name": "Foreign", "x": states, "y": foreign },
        ],
        "layout": layout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(state: &str, domestic: Option<f64>, flags: [Option<bool>; 3]) -> TourismRecord {
        TourismRecord {
            state: state.to_string(),
            domestic_visits_millions: domestic,
            foreign_visits_millions: domestic.map(|d| d / 100.0),
            has_art: flags[0],
            has_culture: flags[1],
            has_tourism: flags[2],
            created_at: None,
        }
    }

    #[test]
    fn test_feature_counts_treat_null_as_false() {
        let records = vec![
            record("Goa", Some(8.5), [Some(true), Some(true), Some(false)]),
            record("Bihar", Some(45.2), [None, Some(true), Some(true)]),
            record("Delhi", None, [Some(true), None, None]),
        ];
        assert_eq!(
            feature_counts(&records),
            FeatureCounts { art: 2, culture: 2, tourism: 1 }
        );
    }

    #[test]
    fn test_top_states_limits_and_orders() {
        let mut records: Vec<TourismRecord> = (0..12)
            .map(|i| record(&format!("S{i}"), Some(i as f64), [None; 3]))
            .collect();
        records.push(record("Unknown", None, [None; 3]));

        let top = top_by_domestic_visits(&records, TOP_STATES);
        assert_eq!(top.len(), 10);
        assert_eq!(top[0].state, "S11");
        assert_eq!(top[9].state, "S2");
        assert!(top.iter().all(|r| r.state != "Unknown"));
    }

    #[test]
    fn test_bar_figure_groups_two_series() {
        let records = vec![
            record("Uttar Pradesh", Some(65.4), [None; 3]),
            record("Ladakh", None, [None; 3]),
        ];
        let fig = top_states_figure(&records);
        assert_eq!(fig["layout"]["barmode"], "group");
        assert_eq!(fig["data"].as_array().unwrap().len(), 2);
        assert_eq!(fig["data"][0]["x"], json!(["Uttar Pradesh", "Ladakh"]));
        assert_eq!(fig["data"][0]["y"][1], Value::Null);
    }

    #[test]
    fn test_pie_figure_is_a_donut() {
        let fig = feature_distribution_figure(FeatureCounts { art: 3, culture: 2, tourism: 1 });
        assert_eq!(fig["data"][0]["hole"], 0.4);
        assert_eq!(fig["data"][0]["values"], json!([3, 2, 1]));
    }
}
