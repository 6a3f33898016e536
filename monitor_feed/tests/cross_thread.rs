use std::thread;

use monitor_feed::{feed, CameraFrame, FeedEvent, Severity};

#[test]
fn per_producer_order_survives_concurrent_pushes() {
    let (handle, receiver) = feed();
    let producers: Vec<_> = ["STT", "LLM", "TTS"]
        .into_iter()
        .map(|source| {
            let handle = handle.clone();
            thread::spawn(move || {
                for index in 0..200 {
                    handle
                        .push_log(source, index.to_string(), Severity::Info)
                        .expect("receiver alive");
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().expect("producer thread");
    }

    let events = receiver.drain();
    assert_eq!(events.len(), 600);
    for source in ["STT", "LLM", "TTS"] {
        let sequence: Vec<u32> = events
            .iter()
            .filter_map(|event| match event {
                FeedEvent::Log(entry) if entry.source == source => entry.text.parse().ok(),
                _ => None,
            })
            .collect();
        let expected: Vec<u32> = (0..200).collect();
        assert_eq!(sequence, expected, "{source} lines arrived out of order");
    }

    let seqs: Vec<u64> = events
        .iter()
        .filter_map(|event| match event {
            FeedEvent::Log(entry) => Some(entry.seq),
            _ => None,
        })
        .collect();
    assert!(seqs.windows(2).all(|pair| pair[0] < pair[1]), "sequence numbers out of order");
    assert_eq!(seqs.first(), Some(&1));
    assert_eq!(seqs.last(), Some(&600));
}

#[test]
fn spectrum_reader_only_sees_latest_frame() {
    let (handle, receiver) = feed();
    let writer = thread::spawn(move || {
        for step in 0..50 {
            handle.publish_spectrum(vec![step as f32; 4], 22_500);
        }
        handle
    });
    let handle = writer.join().expect("writer thread");
    let frame = receiver.latest_spectrum().expect("published frame");
    assert_eq!(frame.bins, vec![49.0; 4]);
    assert_eq!(receiver.spectrum_generation(), 50);

    handle.clear_spectrum();
    assert!(receiver.latest_spectrum().is_none());
}

#[test]
fn camera_frames_reach_the_single_claim() {
    let (handle, receiver) = feed();
    let claim = receiver.claim_camera().expect("first claim");
    assert!(receiver.claim_camera().is_err());
    assert!(claim.frame().is_none());

    let frame = CameraFrame::new(1, 1, vec![10, 20, 30, 255]).expect("frame");
    thread::spawn(move || handle.publish_camera_frame(frame))
        .join()
        .expect("camera thread");

    let latest = claim.frame().expect("camera frame");
    assert_eq!(latest.pixels(), &[10, 20, 30, 255]);
}
