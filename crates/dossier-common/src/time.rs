use chrono::{DateTime, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Milliseconds since the Unix epoch, as used in job ids.
pub fn unix_millis(dt: &DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::unix_millis;

    #[test]
    fn unix_millis_of_known_instant() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(unix_millis(&dt), 1_704_164_645_000);
    }
}
