use httptest::{matchers::*, responders::*, Expectation, Server};
use serde_json::json;

/// Create an empty mock server for EventPicz backend endpoints.
pub fn backend() -> Server {
    Server::run()
}

/// Base URL suitable for `ApiClient::new`.
pub fn base_url(server: &Server) -> String {
    format!("http://{}", server.addr())
}

pub fn photo_body(id: &str) -> serde_json::Value {
    json!({
        "_id": id,
        "url": format!("https://cdn.example.com/{}.jpg", id)
    })
}

pub fn photo_page_body(ids: &[&str], total_count: u64) -> serde_json::Value {
    json!({
        "data": ids.iter().map(|id| photo_body(id)).collect::<Vec<_>>(),
        "totalCount": total_count
    })
}

/// Expect listing requests for one page, identified by its `skip` offset.
pub fn expect_photo_page(
    server: &Server,
    event_id: &str,
    skip: u64,
    ids: &[&str],
    total_count: u64,
) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/api/photos/event"),
            request::query(url_decoded(contains((
                eq("eventNumber".to_string()),
                eq(event_id.to_string())
            )))),
            request::query(url_decoded(contains((
                eq("skip".to_string()),
                eq(skip.to_string())
            )))),
        ])
        .times(0..)
        .respond_with(json_encoded(photo_page_body(ids, total_count))),
    );
}

/// Expect listing requests carrying a `folderId` filter.
pub fn expect_photo_page_for_folder(
    server: &Server,
    event_id: &str,
    folder_id: &str,
    ids: &[&str],
    total_count: u64,
) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/api/photos/event"),
            request::query(url_decoded(contains((
                eq("eventNumber".to_string()),
                eq(event_id.to_string())
            )))),
            request::query(url_decoded(contains((
                eq("folderId".to_string()),
                eq(folder_id.to_string())
            )))),
        ])
        .times(0..)
        .respond_with(json_encoded(photo_page_body(ids, total_count))),
    );
}

/// Every listing request fails with a server error.
pub fn expect_listing_failure(server: &Server) {
    server.expect(
        Expectation::matching(request::method_path("GET", "/api/photos/event"))
            .times(0..)
            .respond_with(status_code(500)),
    );
}

/// Listing requests for one `skip` offset fail with a server error.
pub fn expect_listing_failure_at(server: &Server, skip: u64) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/api/photos/event"),
            request::query(url_decoded(contains((
                eq("skip".to_string()),
                eq(skip.to_string())
            )))),
        ])
        .times(0..)
        .respond_with(status_code(500)),
    );
}

pub fn expect_detection(server: &Server, photo_id: &str, detected: bool) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/api/photos/detection"),
            request::query(url_decoded(contains((
                eq("photoId".to_string()),
                eq(photo_id.to_string())
            )))),
        ])
        .times(0..)
        .respond_with(json_encoded(json!({ "isDetected": detected }))),
    );
}

/// Detection requests for this photo fail; the poller must fold the failure
/// into an unknown status without hurting the rest of the batch.
pub fn expect_detection_failure(server: &Server, photo_id: &str) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/api/photos/detection"),
            request::query(url_decoded(contains((
                eq("photoId".to_string()),
                eq(photo_id.to_string())
            )))),
        ])
        .times(0..)
        .respond_with(status_code(500)),
    );
}

/// Detection responses alternate starting with a pending scan, so the first
/// poll cycle sees `false` and the second sees `true`.
pub fn expect_detection_flip(server: &Server, photo_id: &str) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/api/photos/detection"),
            request::query(url_decoded(contains((
                eq("photoId".to_string()),
                eq(photo_id.to_string())
            )))),
        ])
        .times(0..)
        .respond_with(cycle![
            json_encoded(json!({ "isDetected": false })),
            json_encoded(json!({ "isDetected": true })),
        ]),
    );
}

pub fn event_body(id: &str, name: &str) -> serde_json::Value {
    json!({
        "_id": id,
        "name": name,
        "description": "mock event",
        "date": "2024-06-01",
        "folders": [folder_body("f1", "Main Hall")]
    })
}

pub fn folder_body(id: &str, name: &str) -> serde_json::Value {
    json!({
        "_id": id,
        "name": name,
        "description": "mock folder",
        "date": "2024-06-01"
    })
}

pub fn expect_events(server: &Server, events: serde_json::Value) {
    server.expect(
        Expectation::matching(request::method_path("GET", "/events/all"))
            .times(0..)
            .respond_with(json_encoded(events)),
    );
}

pub fn expect_folders(server: &Server, event_id: &str, folders: serde_json::Value) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/folders/all"),
            request::query(url_decoded(contains((
                eq("eventId".to_string()),
                eq(event_id.to_string())
            )))),
        ])
        .times(0..)
        .respond_with(json_encoded(folders)),
    );
}
