pub mod achievements;
pub mod categories;
pub mod images;
pub mod milestones;
pub mod tags;

use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::{ServiceError, ServiceResult};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// The list-endpoint payload shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, total: i64, page: i64, page_size: i64) -> Self {
        let total_pages = if page_size > 0 {
            (total + page_size - 1) / page_size
        } else {
            0
        };
        Self {
            data,
            total,
            page,
            page_size,
            total_pages,
        }
    }
}

/// Parses a client-supplied date string (RFC 3339, or a plain `YYYY-MM-DD`
/// taken as UTC midnight) into unix seconds. `label` names the field in the
/// error message, e.g. "start date" -> "Invalid start date format".
pub(crate) fn parse_date(raw: &str, label: &str) -> ServiceResult<i64> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc().timestamp());
    }
    Err(ServiceError::validation(format!("Invalid {label} format")))
}

pub(crate) fn page_window(page: Option<i64>, page_size: Option<i64>) -> (i64, i64, i64) {
    let page = page.unwrap_or(DEFAULT_PAGE).max(1);
    let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
    let offset = (page - 1) * page_size;
    (page, page_size, offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(Paginated::<i32>::new(vec![], 0, 1, 10).total_pages, 0);
        assert_eq!(Paginated::<i32>::new(vec![], 10, 1, 10).total_pages, 1);
        assert_eq!(Paginated::<i32>::new(vec![], 11, 1, 10).total_pages, 2);
        assert_eq!(Paginated::<i32>::new(vec![], 25, 2, 10).total_pages, 3);
    }

    #[test]
    fn paginated_wire_shape() {
        let json = serde_json::to_value(Paginated::new(vec![1, 2], 12, 2, 2)).unwrap();
        assert_eq!(json["total"], 12);
        assert_eq!(json["page"], 2);
        assert_eq!(json["pageSize"], 2);
        assert_eq!(json["totalPages"], 6);
    }

    #[test]
    fn parses_plain_and_rfc3339_dates() {
        assert_eq!(parse_date("1970-01-02", "start date").unwrap(), 86400);
        assert_eq!(
            parse_date("1970-01-02T00:00:00Z", "start date").unwrap(),
            86400
        );
        let err = parse_date("02/01/1970", "start date").unwrap_err();
        assert_eq!(err.to_string(), "Invalid start date format");
        let err = parse_date("not-a-date", "end date").unwrap_err();
        assert_eq!(err.to_string(), "Invalid end date format");
    }

    #[test]
    fn page_window_defaults_and_offsets() {
        assert_eq!(page_window(None, None), (1, 10, 0));
        assert_eq!(page_window(Some(3), Some(5)), (3, 5, 10));
        assert_eq!(page_window(Some(0), Some(0)), (1, 1, 0));
    }
}
