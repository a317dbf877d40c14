//! Display helpers for bill dates and statuses.

use chrono::{Datelike, NaiveDate};
use shared::domain::{BillStatus, BILL_DATE_FORMAT};

// Three-letter French month abbreviations, capitalized.
const MONTHS: [&str; 12] = [
    "Jan", "Fév", "Mar", "Avr", "Mai", "Jui", "Jui", "Aoû", "Sep", "Oct", "Nov", "Déc",
];

/// `2004-04-04` renders as `4 Avr. 04`.
pub fn format_date(date: NaiveDate) -> String {
    let month = MONTHS[date.month0() as usize];
    format!("{} {}. {:02}", date.day(), month, date.year().rem_euclid(100))
}

/// Formats an ISO date, keeping the raw value when it does not parse.
pub fn display_date(raw: &str) -> String {
    NaiveDate::parse_from_str(raw, BILL_DATE_FORMAT)
        .map(format_date)
        .unwrap_or_else(|_| raw.to_string())
}

pub fn format_status(status: BillStatus) -> &'static str {
    match status {
        BillStatus::Pending => "En attente",
        BillStatus::Accepted => "Accepté",
        BillStatus::Refused => "Refused",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_short_french_date() {
        let date = NaiveDate::from_ymd_opt(2004, 4, 4).expect("date");
        assert_eq!(format_date(date), "4 Avr. 04");

        let date = NaiveDate::from_ymd_opt(2021, 12, 25).expect("date");
        assert_eq!(format_date(date), "25 Déc. 21");
    }

    #[test]
    fn unparseable_dates_are_displayed_verbatim() {
        assert_eq!(display_date("not-a-date"), "not-a-date");
        assert_eq!(display_date("2002-02-02"), "2 Fév. 02");
    }

    #[test]
    fn status_labels() {
        assert_eq!(format_status(BillStatus::Pending), "En attente");
        assert_eq!(format_status(BillStatus::Accepted), "Accepté");
        assert_eq!(format_status(BillStatus::Refused), "Refused");
    }
}
