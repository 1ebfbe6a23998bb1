use std::fmt;

use serde_json::json;

use crate::LogRecord;

/// `2009-01-03T18:15:05.007Z WARN satsigner_wallet::reconcile: message`
pub(crate) fn text_line(record: &LogRecord, timestamps: bool) -> String {
    if timestamps {
        format!(
            "{} {} {}: {}",
            UtcMillis(record.ts_ms),
            record.level,
            record.target,
            record.msg
        )
    } else {
        format!("{} {}: {}", record.level, record.target, record.msg)
    }
}

pub(crate) fn json_line(record: &LogRecord) -> String {
    json!({
        "ts_ms": record.ts_ms,
        "level": record.level.as_str(),
        "target": record.target,
        "file": record.file,
        "line": record.line,
        "msg": record.msg,
    })
    .to_string()
}

struct UtcMillis(u64);

impl fmt::Display for UtcMillis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0 / 1_000;
        let millis = self.0 % 1_000;
        let (year, month, day) = civil_from_days((secs / 86_400) as i64);
        let secs_of_day = secs % 86_400;
        write!(
            f,
            "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}.{millis:03}Z",
            secs_of_day / 3_600,
            secs_of_day % 3_600 / 60,
            secs_of_day % 60,
        )
    }
}

// Days since 1970-01-01 to a proleptic Gregorian date (Hinnant).
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let shifted = days + 719_468;
    let era = shifted.div_euclid(146_097);
    let day_of_era = shifted.rem_euclid(146_097);
    let year_of_era = (day_of_era - day_of_era / 1_460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let month_index = (5 * day_of_year + 2) / 153;
    let day = day_of_year - (153 * month_index + 2) / 5 + 1;
    let month = if month_index < 10 {
        month_index + 3
    } else {
        month_index - 9
    };
    let year = year_of_era + era * 400 + i64::from(month <= 2);
    (year, month as u32, day as u32)
}
