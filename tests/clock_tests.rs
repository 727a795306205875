use chronolog::efficient_clock::{millisecond_suffix, millisecond_table, MILLISECOND_SLOTS};
use chronolog::{ManualClock, TimestampCache};
use chrono::{DateTime, Duration, FixedOffset, TimeZone};
use std::sync::{Arc, Barrier};
use std::thread;

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, ms: i64) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(y, mo, d, h, mi, s)
        .unwrap()
        + Duration::milliseconds(ms)
}

fn manual_cache(start: DateTime<FixedOffset>) -> (Arc<ManualClock>, TimestampCache) {
    let clock = Arc::new(ManualClock::new(start));
    let cache = TimestampCache::new(clock.clone());
    (clock, cache)
}

fn joined((prefix, suffix): (Arc<Vec<u8>>, &'static [u8])) -> String {
    let mut bytes = prefix.to_vec();
    bytes.extend_from_slice(suffix);
    String::from_utf8(bytes).unwrap()
}

#[test]
fn test_millisecond_table() {
    let table = millisecond_table();
    assert_eq!(table.len(), MILLISECOND_SLOTS);
    assert_eq!(table.len(), 1024);
    assert_eq!(table[0], b".000]");
    assert_eq!(table[7], b".007]");
    assert_eq!(table[42], b".042]");
    assert_eq!(table[999], b".999]");

    for (i, entry) in table.iter().enumerate() {
        assert_eq!(entry.as_slice(), format!(".{:03}]", i).as_bytes());
    }

    // Indexing wraps around the table size.
    assert_eq!(millisecond_suffix(1024 + 7), b".007]");
}

#[test]
fn test_initial_state() {
    let start = at(2024, 3, 10, 8, 15, 30, 250);
    let (_clock, cache) = manual_cache(start);

    assert_eq!(cache.now(), start);
    assert_eq!(cache.date(), "2024-03-10");
    assert_eq!(cache.date_yesterday(), "2024-03-09");
    assert_eq!(cache.prefix(), b"[2024/03/10 08:15:30");
}

#[test]
fn test_format_layout() {
    let (_clock, cache) = manual_cache(at(2024, 3, 10, 8, 15, 30, 250));
    assert_eq!(joined(cache.format()), "[2024/03/10 08:15:30.250]");
}

#[test]
fn test_format_same_second_reuses_prefix() {
    let (clock, cache) = manual_cache(at(2024, 3, 10, 8, 15, 30, 100));

    let (first, first_ms) = cache.format();
    clock.advance(Duration::milliseconds(500));
    let (second, second_ms) = cache.format();

    assert_eq!(first, second, "Same second should yield identical prefix bytes");
    assert!(Arc::ptr_eq(&first, &second), "Cached prefix should be reused");
    assert_eq!(first_ms, b".100]");
    assert_eq!(second_ms, b".600]");
}

#[test]
fn test_format_new_second_renders_new_prefix() {
    let (clock, cache) = manual_cache(at(2024, 3, 10, 8, 15, 30, 900));

    let (first, _) = cache.format();
    clock.advance(Duration::milliseconds(200));
    let (second, ms) = cache.format();

    assert_ne!(first, second);
    assert_eq!(second.as_slice(), b"[2024/03/10 08:15:31");
    assert_eq!(ms, b".100]");

    // The new prefix is now the cached one.
    let (third, _) = cache.format();
    assert!(Arc::ptr_eq(&second, &third));
}

#[test]
fn test_format_is_independent_of_refresh() {
    let (clock, cache) = manual_cache(at(2024, 3, 10, 8, 15, 30, 0));
    clock.advance(Duration::seconds(5));

    // The calendar state is stale until refreshed; the fast path is not.
    assert_eq!(cache.prefix(), b"[2024/03/10 08:15:30");
    assert_eq!(cache.format().0.as_slice(), b"[2024/03/10 08:15:35");

    cache.refresh();
    assert_eq!(cache.prefix(), b"[2024/03/10 08:15:35");
    assert_eq!(cache.now(), at(2024, 3, 10, 8, 15, 35, 0));
}

#[test]
fn test_date_yesterday_moves_only_at_day_boundary() {
    let (clock, cache) = manual_cache(at(2024, 1, 1, 23, 59, 58, 0));
    assert_eq!(cache.date(), "2024-01-01");
    assert_eq!(cache.date_yesterday(), "2023-12-31");

    clock.set(at(2024, 1, 1, 23, 59, 59, 999));
    cache.refresh();
    assert_eq!(cache.date(), "2024-01-01");
    assert_eq!(cache.date_yesterday(), "2023-12-31", "No day change yet");

    // Clock crossed midnight, but nothing observed it yet.
    clock.set(at(2024, 1, 2, 0, 0, 0, 0));
    assert_eq!(cache.date_yesterday(), "2023-12-31");

    cache.refresh();
    assert_eq!(cache.date(), "2024-01-02");
    assert_eq!(cache.date_yesterday(), "2024-01-01");

    clock.advance(Duration::hours(1));
    cache.refresh();
    assert_eq!(cache.date_yesterday(), "2024-01-01");
}

#[test]
fn test_date_yesterday_is_previous_cached_date_after_gap() {
    let (clock, cache) = manual_cache(at(2024, 5, 1, 12, 0, 0, 0));

    // Several days pass between refreshes: yesterday is what was cached, not
    // the calendar day before today.
    clock.set(at(2024, 5, 4, 12, 0, 0, 0));
    cache.refresh();
    assert_eq!(cache.date(), "2024-05-04");
    assert_eq!(cache.date_yesterday(), "2024-05-01");
}

#[test]
fn test_concurrent_format_racing_on_new_second() {
    let (clock, cache) = manual_cache(at(2024, 6, 30, 10, 0, 0, 0));
    let cache = Arc::new(cache);
    clock.set(at(2024, 6, 30, 10, 0, 1, 0));

    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..1000).map(|_| cache.format().0).collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        for prefix in handle.join().unwrap() {
            assert_eq!(prefix.as_slice(), b"[2024/06/30 10:00:01");
        }
    }
}

#[test]
fn test_system_clock_format_shape() {
    let cache = TimestampCache::system();
    for _ in 0..1000 {
        let stamp = joined(cache.format());
        let bytes = stamp.as_bytes();
        assert_eq!(bytes.len(), "[YYYY/MM/DD hh:mm:ss.mmm]".len(), "{stamp}");
        assert_eq!(bytes[0], b'[');
        assert_eq!(bytes[5], b'/');
        assert_eq!(bytes[20], b'.');
        assert_eq!(bytes[24], b']');
    }
}

#[test]
fn test_refresher_runs_and_stops() {
    let clock = Arc::new(ManualClock::new(at(2024, 2, 28, 23, 59, 59, 0)));
    let cache = Arc::new(TimestampCache::new(clock.clone()));
    let refresher = cache
        .spawn_refresher(std::time::Duration::from_millis(10))
        .unwrap();

    clock.set(at(2024, 2, 29, 0, 0, 1, 0));
    let mut refreshed = false;
    for _ in 0..200 {
        if cache.date() == "2024-02-29" {
            refreshed = true;
            break;
        }
        thread::sleep(std::time::Duration::from_millis(10));
    }
    assert!(refreshed, "Refresher should pick up the new date");
    assert_eq!(cache.date_yesterday(), "2024-02-28");

    refresher.stop();

    clock.set(at(2024, 3, 1, 0, 0, 1, 0));
    thread::sleep(std::time::Duration::from_millis(50));
    assert_eq!(cache.date(), "2024-02-29", "Stopped refresher must not update");
}
