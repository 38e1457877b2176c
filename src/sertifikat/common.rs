//! Common utilities for certificate generation.
//!
//! Shared helpers for certificate numbering, date formatting, and filenames.

use chrono::{Datelike, Local};
use rand::distr::Alphanumeric;
use rand::Rng;

/// Month names in Indonesian, indexed by `month0`.
const MONTHS_ID: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// Roman numerals for months 1..=12, used on printed certificate numbers.
const MONTHS_ROMAN: [&str; 12] = [
    "I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X", "XI", "XII",
];

/// Format current date in Indonesian format (e.g., "30 Desember 2025").
pub fn format_indonesian_date() -> String {
    let now = Local::now().date_naive();
    let day = now.day();
    let month = MONTHS_ID[(now.month0() as usize).min(MONTHS_ID.len() - 1)];
    let year = now.year();

    format!("{day} {month} {year}")
}

/// Format a month/year pair with a Roman-numeral month, e.g. "III/2026".
///
/// Months outside 1..=12 are clamped into range.
pub fn format_month_year_roman(month: u32, year: i32) -> String {
    let idx = (month.clamp(1, 12) - 1) as usize;
    format!("{}/{}", MONTHS_ROMAN[idx], year)
}

/// Generate a certificate number of the form `PREFIX-YYYYMM-XXXXXX`.
///
/// The suffix is 6 random uppercase alphanumerics. Numbers are
/// period-sortable and human-recognizable but not guaranteed globally
/// unique; callers that need hard uniqueness must check against the
/// persisted results.
pub fn generate_nomor_sertifikat(prefix: &str) -> String {
    let now = Local::now().date_naive();
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect();

    format!("{}-{:04}{:02}-{}", prefix, now.year(), now.month(), suffix)
}

/// Sanitize a string for use in filenames.
pub fn sanitize_for_filename(name: &str, fallback: &str) -> String {
    let cleaned = sanitize_filename::sanitize(name);
    let mut result = String::new();
    let mut last_dash = false;

    for ch in cleaned.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            result.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if ch.is_whitespace() || ch == '-' || ch == '_' || ch == '.' {
            if !last_dash && !result.is_empty() {
                result.push('-');
                last_dash = true;
            }
        }
    }

    if result.is_empty() {
        return fallback.to_string();
    }

    result.trim_matches('-').to_string()
}
