use api_client::ApiClient;
use gallery::{FilterParams, Gallery, GalleryProgress};
use serial_test::serial;
use tokio::sync::mpsc;
use tokio::time::{advance, pause, Duration};

fn mock_gallery(tx: mpsc::UnboundedSender<GalleryProgress>) -> Gallery {
    let client = ApiClient::new(String::new(), String::new());
    Gallery::new(client, FilterParams::for_event("1"), 30).with_progress(tx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<GalleryProgress>) -> Vec<GalleryProgress> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn poll_count(events: &[GalleryProgress]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, GalleryProgress::DetectionPolled { .. }))
        .count()
}

#[tokio::test(flavor = "current_thread")]
#[serial]
async fn test_polling_loop_ticks_on_interval() {
    std::env::set_var("MOCK_API_CLIENT", "1");
    let (tx, mut rx) = mpsc::unbounded_channel();
    let gallery = mock_gallery(tx);
    gallery.load_page(0).await.unwrap();

    pause();
    let (handle, shutdown) = gallery.start_polling(Duration::from_secs(10));
    // immediate poll plus two interval ticks
    advance(Duration::from_secs(25)).await;
    let _ = shutdown.send(());
    handle.await.unwrap();

    let events = drain(&mut rx);
    assert!(
        poll_count(&events) >= 2,
        "expected repeated polls, got {:?}",
        events
    );
    std::env::remove_var("MOCK_API_CLIENT");
}

#[tokio::test(flavor = "current_thread")]
#[serial]
async fn test_shutdown_stops_future_polls() {
    std::env::set_var("MOCK_API_CLIENT", "1");
    let (tx, mut rx) = mpsc::unbounded_channel();
    let gallery = mock_gallery(tx);
    gallery.load_page(0).await.unwrap();

    pause();
    let (handle, shutdown) = gallery.start_polling(Duration::from_secs(10));
    advance(Duration::from_secs(1)).await;
    let _ = shutdown.send(());
    handle.await.unwrap();

    let before = poll_count(&drain(&mut rx));
    advance(Duration::from_secs(60)).await;
    let after = poll_count(&drain(&mut rx));
    assert!(before >= 1);
    assert_eq!(after, 0, "no poll may fire after shutdown");
    std::env::remove_var("MOCK_API_CLIENT");
}

#[tokio::test(flavor = "current_thread")]
#[serial]
async fn test_dropping_the_shutdown_sender_stops_the_loop() {
    std::env::set_var("MOCK_API_CLIENT", "1");
    let (tx, mut rx) = mpsc::unbounded_channel();
    let gallery = mock_gallery(tx);
    gallery.load_page(0).await.unwrap();

    pause();
    let (handle, shutdown) = gallery.start_polling(Duration::from_secs(10));
    drop(shutdown);
    handle.await.unwrap();

    let _ = drain(&mut rx);
    advance(Duration::from_secs(60)).await;
    assert_eq!(poll_count(&drain(&mut rx)), 0);
    std::env::remove_var("MOCK_API_CLIENT");
}
