// Month calendar composed from exams, results, holidays and events
use chrono::{Datelike, NaiveDate};

use crate::error::{AppError, AppResult};
use crate::models::{CalendarEntryType, CalendarEvent, ContentItem, ContentType};
use crate::modules::seo::parse_timestamp;

/// First and last day of a month (1-12) as `YYYY-MM-DD`
pub fn month_bounds(year: i32, month: u32) -> AppResult<(String, String)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid month {}-{}", year, month)))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let last = next
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| AppError::BadRequest(format!("Invalid month {}-{}", year, month)))?;
    Ok((
        first.format("%Y-%m-%d").to_string(),
        last.format("%Y-%m-%d").to_string(),
    ))
}

fn in_month(value: &str, year: i32, month: u32) -> bool {
    parse_timestamp(value).is_some_and(|d| d.year() == year && d.month() == month)
}

fn style(content_type: ContentType, item: &ContentItem) -> Option<(CalendarEntryType, &'static str, &'static str)> {
    match content_type {
        ContentType::Exams => Some((CalendarEntryType::Exam, "#3b82f6", "/education-jobs/exams/")),
        ContentType::Results => Some((CalendarEntryType::Result, "#22c55e", "/education-jobs/results/")),
        ContentType::Holidays => {
            let color = if item.str_field("type") == Some("national") {
                "#ef4444"
            } else {
                "#f59e0b"
            };
            Some((CalendarEntryType::Holiday, color, "/religion-culture/holidays/"))
        }
        ContentType::Events => Some((CalendarEntryType::Event, "#a855f7", "/food-lifestyle/events/")),
        _ => None,
    }
}

fn entry(content_type: ContentType, item: &ContentItem, year: i32, month: u32) -> Option<CalendarEvent> {
    let (entry_type, color, link_base) = style(content_type, item)?;
    let date = item.str_field(content_type.date_field()?)?;
    if !in_month(date, year, month) {
        return None;
    }

    // Holidays are categorized by their kind, everything else by category
    let category = match content_type {
        ContentType::Holidays => item.str_field("type"),
        _ => item.str_field("category"),
    };
    let status = match content_type {
        ContentType::Events => item.str_field("status").map(str::to_string),
        _ => None,
    };
    let end_date = match content_type {
        ContentType::Holidays | ContentType::Events => item.str_field("endDate").map(str::to_string),
        _ => None,
    };

    Some(CalendarEvent {
        id: item.id.clone(),
        title: item.display_title().to_string(),
        title_hindi: item.display_title_hindi().to_string(),
        date: date.to_string(),
        end_date,
        entry_type,
        category: category.map(str::to_string),
        color: color.to_string(),
        link: format!("{}{}", link_base, item.slug),
        status,
    })
}

/// Entries of `(type, items)` groups falling in the month, sorted by date
pub fn compose_calendar(
    year: i32,
    month: u32,
    groups: &[(ContentType, Vec<ContentItem>)],
) -> Vec<CalendarEvent> {
    let mut calendar: Vec<CalendarEvent> = groups
        .iter()
        .flat_map(|(content_type, items)| {
            items
                .iter()
                .filter_map(move |item| entry(*content_type, item, year, month))
        })
        .collect();
    // stable: same-day entries keep exam/result/holiday/event order
    calendar.sort_by_key(|e| parse_timestamp(&e.date));
    calendar
}
