use time::macros::{format_description, offset};
use time::{Duration, OffsetDateTime, Time};

/// Snapshot identity: wall-clock minute in KST, `YYYYMMDD_HHMM_KST`.
pub fn snapshot_id(now_utc: OffsetDateTime) -> String {
    let kst = now_utc.to_offset(offset!(+9));
    let fmt = format_description!("[year][month][day]_[hour][minute]");
    format!("{}_KST", kst.format(&fmt).unwrap_or_default())
}

/// Next run instant: the first UTC slot strictly later than `now` today, or
/// the first slot tomorrow.
pub fn next_update_at(now_utc: OffsetDateTime, slots: &[(u8, u8)]) -> OffsetDateTime {
    let mut slots = slots.to_vec();
    slots.sort_unstable();
    if slots.is_empty() {
        return now_utc + Duration::hours(6);
    }

    let today = now_utc.date();
    for (hour, minute) in &slots {
        if let Ok(at) = Time::from_hms(*hour, *minute, 0) {
            let candidate = today.with_time(at).assume_utc();
            if candidate > now_utc {
                return candidate;
            }
        }
    }

    let (hour, minute) = slots[0];
    let tomorrow = today.next_day().unwrap_or(today);
    let at = Time::from_hms(hour, minute, 0).unwrap_or(Time::MIDNIGHT);
    tomorrow.with_time(at).assume_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn snapshot_id_is_kst_stamped() {
        // 2026-08-01 23:30 UTC is 2026-08-02 08:30 KST.
        let id = snapshot_id(datetime!(2026-08-01 23:30 UTC));
        assert_eq!(id, "20260802_0830_KST");
    }

    #[test]
    fn next_slot_later_today() {
        let slots = [(0, 17), (9, 17)];
        let at = next_update_at(datetime!(2026-08-01 05:00 UTC), &slots);
        assert_eq!(at, datetime!(2026-08-01 09:17 UTC));
    }

    #[test]
    fn wraps_to_first_slot_tomorrow() {
        let slots = [(0, 17), (9, 17)];
        let at = next_update_at(datetime!(2026-08-01 10:00 UTC), &slots);
        assert_eq!(at, datetime!(2026-08-02 00:17 UTC));
    }

    #[test]
    fn exact_slot_time_is_not_reused() {
        let slots = [(0, 17), (9, 17)];
        let at = next_update_at(datetime!(2026-08-01 09:17 UTC), &slots);
        assert_eq!(at, datetime!(2026-08-02 00:17 UTC));
    }
}
