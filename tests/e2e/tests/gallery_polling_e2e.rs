use api_client::ApiClient;
use gallery::{Detection, FilterParams, Gallery};
use tokio::time::{sleep, Duration};

#[tokio::main]
async fn main() {
    let server = mocks::backend();
    mocks::expect_photo_page(&server, "ev1", 0, &["1", "2"], 2);
    mocks::expect_detection_flip(&server, "1");
    mocks::expect_detection(&server, "2", true);
    mocks::expect_photo_page_for_folder(&server, "ev1", "fo2", &["9"], 1);
    mocks::expect_detection(&server, "9", false);

    let client = ApiClient::new(mocks::base_url(&server), "test-key".into());
    let mut gallery = Gallery::new(client, FilterParams::for_event("ev1"), 30);
    gallery.load_page(0).await.expect("load page 0");

    // first cycle: photo 1 still scanning, photo 2 done
    assert!(gallery.refresh_detection().await);
    let first = gallery.snapshot().await;
    assert!(first.detection_of("1").needs_overlay());
    assert_eq!(first.detection_of("2"), Detection::Detected);

    // second cycle clears the overlay for photo 1 only
    assert!(gallery.refresh_detection().await);
    let second = gallery.snapshot().await;
    assert_eq!(second.detection_of("1"), Detection::Detected);
    assert_eq!(second.detection_of("2"), Detection::Detected);

    // background polling keeps the map fresh until shut down
    let (handle, shutdown) = gallery.start_polling(Duration::from_millis(20));
    sleep(Duration::from_millis(60)).await;
    let _ = shutdown.send(());
    handle.await.expect("poller join");
    assert_eq!(gallery.snapshot().await.detection.len(), 2);

    // switching to a folder drops the old page, map and poll results
    gallery
        .set_filter(FilterParams::for_event("ev1").with_folder("fo2"))
        .await;
    let cleared = gallery.snapshot().await;
    assert!(cleared.photos.is_empty());
    assert!(cleared.detection.is_empty());

    gallery.load_page(0).await.expect("load folder page");
    assert!(gallery.refresh_detection().await);
    let folder_view = gallery.snapshot().await;
    assert_eq!(folder_view.photos.len(), 1);
    assert_eq!(folder_view.detection.len(), 1);
    assert!(folder_view.detection_of("9").needs_overlay());
    assert_eq!(folder_view.detection_of("1"), Detection::Unknown);
}
