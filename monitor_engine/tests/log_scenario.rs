use monitor_engine::{ConsoleLog, Typeface};
use monitor_feed::{feed, FeedEvent, Severity};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn two_messages_arrive_in_order_and_stay_visible() {
    let typeface = Typeface::fallback();
    let (handle, receiver) = feed();
    handle
        .push_log("STT", "USER: hello", Severity::from_label("INFO"))
        .expect("push");
    handle
        .push_log("LLM", "TARS: hi there", Severity::from_label("SYSTEM"))
        .expect("push");

    let mut log = ConsoleLog::new();
    log.set_viewport(&typeface, 400, 2, 14.0);
    for event in receiver.drain() {
        if let FeedEvent::Log(entry) = event {
            log.push(entry, &typeface);
        }
    }

    let window: Vec<(&str, Severity)> = log
        .window()
        .iter()
        .map(|line| (line.text.as_str(), line.severity))
        .collect();
    assert_eq!(
        window,
        vec![
            ("STT: USER: hello", Severity::Info),
            ("LLM: TARS: hi there", Severity::System),
        ]
    );
    assert_eq!(log.scroll_offset(), 0);
}

#[test]
fn line_count_grows_and_offset_stays_in_range() {
    let typeface = Typeface::fallback();
    let mut rng = StdRng::seed_from_u64(17);
    let mut log = ConsoleLog::new();
    log.set_viewport(&typeface, 180, 6, 12.0);

    let mut previous_total = 0;
    for index in 0..300 {
        let words = rng.gen_range(1..25);
        let text: Vec<String> = (0..words)
            .map(|_| "x".repeat(rng.gen_range(1..30)))
            .collect();
        log.push(
            monitor_feed::LogEntry::new("SRC", text.join(" "), Severity::Info),
            &typeface,
        );
        if index % 7 == 0 {
            log.scroll_lines(rng.gen_range(-12..12));
        }

        let total = log.total_lines();
        assert!(total >= previous_total, "line count shrank at entry {index}");
        previous_total = total;
        assert!(log.scroll_offset() <= total.saturating_sub(log.visible_lines()));
        assert!(log.window().len() <= log.visible_lines());
    }
}
