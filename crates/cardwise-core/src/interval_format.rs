//! Human-readable interval labels
//!
//! Bucketing is fixed across locales: days below 30, months from 30, years
//! from 365. Months are counted as 30 days and years as 365 days; only the
//! wording changes per locale.

use serde::{Deserialize, Serialize};

/// Label language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Locale {
    /// English
    #[default]
    En,
    /// Brazilian Portuguese
    PtBr,
}

impl Locale {
    /// BCP 47 tag
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::PtBr => "pt-BR",
        }
    }

    fn words(&self) -> &'static Words {
        match self {
            Locale::En => &EN,
            Locale::PtBr => &PT_BR,
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "en" | "en-us" | "en-gb" => Ok(Locale::En),
            "pt" | "pt-br" => Ok(Locale::PtBr),
            _ => Err(format!("Unsupported locale: {}", s)),
        }
    }
}

struct Words {
    today: &'static str,
    day: &'static str,
    days: &'static str,
    month: &'static str,
    months: &'static str,
    year: &'static str,
    years: &'static str,
}

const EN: Words = Words {
    today: "today",
    day: "day",
    days: "days",
    month: "month",
    months: "months",
    year: "year",
    years: "years",
};

const PT_BR: Words = Words {
    today: "hoje",
    day: "dia",
    days: "dias",
    month: "mês",
    months: "meses",
    year: "ano",
    years: "anos",
};

/// Format a day count in English
pub fn format_interval(days: u32) -> String {
    format_interval_in(days, Locale::En)
}

/// Format a day count in `locale`
pub fn format_interval_in(days: u32, locale: Locale) -> String {
    let words = locale.words();
    match days {
        0 => words.today.to_string(),
        1 => format!("1 {}", words.day),
        2..=29 => format!("{} {}", days, words.days),
        30..=364 => counted(rounded_div(days, 30), words.month, words.months),
        _ => counted(rounded_div(days, 365), words.year, words.years),
    }
}

fn counted(n: u32, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("1 {}", singular)
    } else {
        format!("{} {}", n, plural)
    }
}

/// Integer division rounding half up, without overflow near `u32::MAX`
fn rounded_div(value: u32, divisor: u32) -> u32 {
    value / divisor + u32::from(value % divisor >= divisor - divisor / 2)
}
