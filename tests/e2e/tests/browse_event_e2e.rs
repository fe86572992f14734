use api_client::ApiClient;
use gallery::{FilterParams, Gallery};
use serde_json::json;

#[tokio::main]
async fn main() {
    let server = mocks::backend();
    mocks::expect_events(&server, json!([mocks::event_body("ev1", "Summer Wedding")]));
    mocks::expect_folders(
        &server,
        "ev1",
        json!([mocks::folder_body("f1", "Main Hall")]),
    );
    mocks::expect_photo_page_for_folder(&server, "ev1", "f1", &["1", "2"], 2);
    mocks::expect_detection(&server, "1", true);
    mocks::expect_detection(&server, "2", false);

    let client = ApiClient::new(mocks::base_url(&server), "test-key".into());

    // the navigation path: events -> folders -> folder gallery
    let events = client.list_events().await.expect("list events");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name, "Summer Wedding");

    let folders = client.list_folders(&events[0].id).await.expect("folders");
    assert_eq!(folders[0].name, "Main Hall");

    let filter = FilterParams::for_event(events[0].id.clone()).with_folder(folders[0].id.clone());
    let gallery = Gallery::new(client, filter, 30);
    gallery.load_page(0).await.expect("load folder gallery");
    assert!(gallery.refresh_detection().await);

    let snapshot = gallery.snapshot().await;
    assert_eq!(snapshot.photos.len(), 2);
    assert_eq!(snapshot.page.total_count, 2);
    assert!(!snapshot.detection_of("1").needs_overlay());
    assert!(snapshot.detection_of("2").needs_overlay());

    // opening the viewer does not disturb paging or polling state
    gallery.select_photo(snapshot.photos[0].clone()).await;
    assert!(gallery.selected_photo().await.is_some());
    gallery.close_photo().await;
    assert!(gallery.selected_photo().await.is_none());
}
