use api_client::ApiClient;
use gallery::{FilterParams, Gallery};

fn ids(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{}{}", prefix, i)).collect()
}

fn refs(ids: &[String]) -> Vec<&str> {
    ids.iter().map(String::as_str).collect()
}

#[tokio::main]
async fn main() {
    let server = mocks::backend();

    // 65 photos at 30 per page: two full pages and a final page of 5
    let page0 = ids("a", 30);
    let page1 = ids("b", 30);
    let page2 = ids("c", 5);
    mocks::expect_photo_page(&server, "ev1", 0, &refs(&page0), 65);
    mocks::expect_photo_page(&server, "ev1", 30, &refs(&page1), 65);
    mocks::expect_photo_page(&server, "ev1", 60, &refs(&page2), 65);

    let client = ApiClient::new(mocks::base_url(&server), "test-key".into());
    let gallery = Gallery::new(client.clone(), FilterParams::for_event("ev1"), 30);

    gallery.load_page(0).await.expect("load page 0");
    let start = gallery.snapshot().await;
    assert_eq!(start.photos.len(), 30);
    assert!(!start.page.has_previous());
    assert!(start.page.has_next());
    assert!(!gallery.previous_page().await.expect("previous on page 0"));

    assert!(gallery.next_page().await.expect("next to page 1"));
    assert_eq!(gallery.page().await.page_index, 1);

    gallery.jump_to_last().await.expect("jump to last");
    let last = gallery.snapshot().await;
    assert_eq!(last.page.page_index, 2);
    assert_eq!(last.photos.len(), 5);
    assert!(!last.page.has_next());
    assert!(!gallery.next_page().await.expect("next on last page"));

    assert!(gallery.previous_page().await.expect("previous from last"));
    assert_eq!(gallery.page().await.page_index, 1);

    // an event with no photos stays on page 0 with both directions disabled
    mocks::expect_photo_page(&server, "ev2", 0, &[], 0);
    let empty = Gallery::new(client, FilterParams::for_event("ev2"), 30);
    empty.load_page(0).await.expect("load empty event");
    empty.jump_to_last().await.expect("jump on empty event");
    let state = empty.snapshot().await;
    assert_eq!(state.page.page_index, 0);
    assert!(state.photos.is_empty());
    assert!(!state.page.has_next());
    assert!(!state.page.has_previous());
    assert!(!empty.refresh_detection().await);
}
