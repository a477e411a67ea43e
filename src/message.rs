//! Per-granularity message templates.
//!
//! Templates are compiled by askama, so a malformed template or a missing
//! slot fails the build rather than a dispatch.

use crate::types::{Granularity, Period};
use askama::Template;
use chrono::NaiveDate;

const DAY_FORMAT: &str = "%Y/%m/%d";
const MONTH_FORMAT: &str = "%Y年%m月";

#[derive(Template)]
#[template(
    source = "[hateburank-daily:{{ category }}] {{ start_date }} の日間はてなブックマークランキング {{ url }}",
    ext = "txt"
)]
struct DailyTemplate<'a> {
    category: &'a str,
    start_date: &'a str,
    url: &'a str,
}

#[derive(Template)]
#[template(
    source = "[hateburank-weekly:{{ category }}] {{ start_date }}-{{ end_date }} の週間はてなブックマークランキング {{ url }}",
    ext = "txt"
)]
struct WeeklyTemplate<'a> {
    category: &'a str,
    start_date: &'a str,
    end_date: &'a str,
    url: &'a str,
}

#[derive(Template)]
#[template(
    source = "[hateburank-monthly:{{ category }}] {{ start_date }} の月間はてなブックマークランキング {{ url }}",
    ext = "txt"
)]
struct MonthlyTemplate<'a> {
    category: &'a str,
    start_date: &'a str,
    url: &'a str,
}

/// Renders the message announcing `period`.
pub fn format_message(period: &Period) -> Result<String, askama::Error> {
    let category = period.category.slug();
    let url = period.canonical_url.as_str();
    let window = &period.window;

    match window.granularity {
        Granularity::Daily => DailyTemplate {
            category,
            start_date: &day(window.start),
            url,
        }
        .render(),
        Granularity::Weekly => WeeklyTemplate {
            category,
            start_date: &day(window.start),
            // weekly windows always carry an end; fall back to start + 6
            end_date: &day(window.end.unwrap_or(window.start + chrono::Days::new(6))),
            url,
        }
        .render(),
        Granularity::Monthly => MonthlyTemplate {
            category,
            start_date: &window.start.format(MONTH_FORMAT).to_string(),
            url,
        }
        .render(),
    }
}

fn day(date: NaiveDate) -> String {
    date.format(DAY_FORMAT).to_string()
}
