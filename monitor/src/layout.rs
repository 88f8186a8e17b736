//! Calendar layout of aggregated activity.
//!
//! The layout is one row per month, from the month of the first recorded day
//! (or a year before today when there is nothing recorded) through the month
//! containing today. Each row starts with placeholder cells so that day 1
//! lines up with its weekday (Monday first), followed by one cell per day.
//!
//! ```text
//! Jan 2024  . . . . 1 2 3 4 5 6 7 ...      (Jan 1 2024 is a Monday: 0 placeholders)
//! Feb 2024  . . . 1 2 3 4 5 6 7 ...        (Feb 1 2024 is a Thursday: 3 placeholders)
//! ```
//!
//! A day with activity gets an intensity tier from its total count and is
//! filled either with its single project's colour or with horizontal bands,
//! one per project, stacked top to bottom by descending count, each as tall
//! as the project's share of the day.
//!
//! The output is plain data (colours are typed [`Hsl`] values); turning it
//! into markup is [`crate::render`]'s job.

use std::cmp::Reverse;

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

use crate::aggregate::{ActivityByDay, DayBucket};
use crate::color::{ColorAssigner, Hsl};
use crate::types::ProjectKey;

/// Minimum daily total for the `high` tier.
pub const HIGH_THRESHOLD: u32 = 10;

/// Minimum daily total for the `mid` tier.
pub const MID_THRESHOLD: u32 = 3;

/// Days covered before today when the log is empty.
pub const DEFAULT_LOOKBACK_DAYS: u64 = 365;

/// How busy a day was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    /// Fewer than 3 occurrences.
    Low,
    /// 3 to 9 occurrences.
    Mid,
    /// 10 or more occurrences.
    High,
}

impl Intensity {
    /// Tier for a daily total; `None` for zero.
    #[must_use]
    pub fn from_total(total: u32) -> Option<Self> {
        match total {
            0 => None,
            t if t >= HIGH_THRESHOLD => Some(Self::High),
            t if t >= MID_THRESHOLD => Some(Self::Mid),
            _ => Some(Self::Low),
        }
    }

    /// Lowercase tier name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Mid => "mid",
            Self::High => "high",
        }
    }
}

/// One project's slice of a multi-project day.
///
/// `start` and `end` are fractions of the cell height measured from the top.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Band {
    /// Project the band belongs to.
    pub project: ProjectKey,
    /// Occurrences of the project on this day.
    pub count: u32,
    /// Top edge, as a fraction of the cell height.
    pub start: f64,
    /// Bottom edge, as a fraction of the cell height.
    pub end: f64,
    /// Fill colour.
    pub color: Hsl,
}

impl Band {
    /// Fraction of the cell this band covers.
    #[must_use]
    pub fn share(&self) -> f64 {
        self.end - self.start
    }
}

/// How an active day is painted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DayFill {
    /// A single project: one flat colour.
    Solid { project: ProjectKey, color: Hsl },
    /// Several projects: proportional bands, top to bottom.
    Banded { bands: Vec<Band> },
}

/// A day with at least one recorded occurrence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveDay {
    /// Calendar day.
    pub date: NaiveDate,
    /// Tier derived from `total`.
    pub intensity: Intensity,
    /// Occurrences across all projects.
    pub total: u32,
    /// Projects by descending count, ties in first-appearance order.
    pub projects: Vec<(ProjectKey, u32)>,
    /// How the cell is painted.
    pub fill: DayFill,
    /// `YYYY-MM-DD: project: count, project: count`
    pub tooltip: String,
}

/// One cell of a month row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DayCell {
    /// Leading padding before day 1.
    Placeholder,
    /// A day with no recorded activity.
    Empty { date: NaiveDate },
    /// A day with activity.
    Active(ActiveDay),
}

impl DayCell {
    /// The calendar date of the cell, if it is a day.
    #[must_use]
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Placeholder => None,
            Self::Empty { date } => Some(*date),
            Self::Active(day) => Some(day.date),
        }
    }
}

/// A calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthRow {
    /// Calendar year.
    pub year: i32,
    /// Month, `1..=12`.
    pub month: u32,
    /// e.g. `Jan 2024`
    pub label: String,
    /// Leading placeholders, then one cell per day.
    pub cells: Vec<DayCell>,
}

impl MonthRow {
    /// Number of leading placeholder cells.
    #[must_use]
    pub fn leading_placeholders(&self) -> usize {
        self.cells
            .iter()
            .take_while(|c| matches!(c, DayCell::Placeholder))
            .count()
    }

    /// Cells that are actual days.
    pub fn days(&self) -> impl Iterator<Item = &DayCell> {
        self.cells
            .iter()
            .filter(|c| !matches!(c, DayCell::Placeholder))
    }
}

/// A legend swatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    /// Project name.
    pub project: ProjectKey,
    /// Base colour of the project.
    pub color: Hsl,
}

/// The complete report structure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarLayout {
    /// The day the layout was computed against.
    pub today: NaiveDate,
    /// Month rows in chronological order.
    pub months: Vec<MonthRow>,
    /// Projects in first-appearance order.
    pub legend: Vec<LegendEntry>,
}

impl CalendarLayout {
    /// Looks up the cell for `date`.
    #[must_use]
    pub fn cell(&self, date: NaiveDate) -> Option<&DayCell> {
        self.months
            .iter()
            .find(|m| m.year == date.year() && m.month == date.month())
            .and_then(|m| m.days().find(|c| c.date() == Some(date)))
    }
}

/// Lays out `activity` as month rows ending at `today`'s month.
///
/// Pure and deterministic: the same inputs always produce the same layout.
#[must_use]
pub fn layout(activity: &ActivityByDay, today: NaiveDate) -> CalendarLayout {
    let colors = ColorAssigner::new(activity.projects_in_order());

    let first = activity.first_day().unwrap_or_else(|| {
        today
            .checked_sub_days(Days::new(DEFAULT_LOOKBACK_DAYS))
            .unwrap_or(NaiveDate::MIN)
    });

    let months = month_range(first, today)
        .map(|(year, month)| month_row(year, month, activity, &colors))
        .collect();

    let legend = colors
        .projects()
        .iter()
        .map(|project| LegendEntry {
            project: project.clone(),
            color: colors.base(project),
        })
        .collect();

    CalendarLayout {
        today,
        months,
        legend,
    }
}

/// `(year, month)` pairs from `from`'s month through `to`'s month inclusive.
fn month_range(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = (i32, u32)> {
    let end = (to.year(), to.month());
    std::iter::successors(Some((from.year(), from.month())), |&(y, m)| {
        Some(if m == 12 { (y + 1, 1) } else { (y, m + 1) })
    })
    .take_while(move |&ym| ym <= end)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };

    match (
        NaiveDate::from_ymd_opt(year, month, 1),
        NaiveDate::from_ymd_opt(next_year, next_month, 1),
    ) {
        (Some(first), Some(next)) => next.signed_duration_since(first).num_days() as u32,
        // Only reachable at the very end of chrono's range
        _ => 31,
    }
}

fn month_row(year: i32, month: u32, activity: &ActivityByDay, colors: &ColorAssigner) -> MonthRow {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return MonthRow {
            year,
            month,
            label: format!("{year}-{month:02}"),
            cells: Vec::new(),
        };
    };

    let leading = first.weekday().num_days_from_monday() as usize;
    let ndays = days_in_month(year, month);

    let mut cells = Vec::with_capacity(leading + ndays as usize);
    cells.extend(std::iter::repeat_with(|| DayCell::Placeholder).take(leading));

    cells.extend(
        first
            .iter_days()
            .take(ndays as usize)
            .map(|date| day_cell(date, activity.day(date), colors)),
    );

    MonthRow {
        year,
        month,
        label: first.format("%b %Y").to_string(),
        cells,
    }
}

fn day_cell(date: NaiveDate, bucket: Option<&DayBucket>, colors: &ColorAssigner) -> DayCell {
    let Some(bucket) = bucket else {
        return DayCell::Empty { date };
    };

    let total = bucket.total();
    let Some(intensity) = Intensity::from_total(total) else {
        return DayCell::Empty { date };
    };

    let mut projects: Vec<(ProjectKey, u32)> = bucket
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(p, c)| (p.to_string(), c))
        .collect();
    projects.sort_by_key(|(p, c)| (Reverse(*c), colors.index_of(p).unwrap_or(usize::MAX)));

    let color_for = |project: &str| match intensity {
        Intensity::High => colors.high(project),
        Intensity::Low | Intensity::Mid => colors.base(project),
    };

    let fill = match projects.as_slice() {
        [(project, _)] => DayFill::Solid {
            project: project.clone(),
            color: color_for(project.as_str()),
        },
        _ => {
            let mut before = 0_u32;
            let bands = projects
                .iter()
                .map(|(project, count)| {
                    let start = f64::from(before) / f64::from(total);
                    before += count;
                    Band {
                        project: project.clone(),
                        count: *count,
                        start,
                        end: f64::from(before) / f64::from(total),
                        color: color_for(project.as_str()),
                    }
                })
                .collect();
            DayFill::Banded { bands }
        }
    };

    let tooltip = format!(
        "{date}: {}",
        projects
            .iter()
            .map(|(p, c)| format!("{p}: {c}"))
            .collect::<Vec<_>>()
            .join(", ")
    );

    DayCell::Active(ActiveDay {
        date,
        intensity,
        total,
        projects,
        fill,
        tooltip,
    })
}
