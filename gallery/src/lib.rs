//! Gallery paging and detection polling for EventPicz.
//!
//! One page of an event's photos is held in memory at a time. After a page
//! loads, the per-photo face-detection status is polled on a fixed interval
//! until the photo set is superseded or the poller is shut down. Commits are
//! guarded by a generation counter so a poll that raced a page or filter
//! change can never write stale results.

use api_client::{ApiClient, Photo};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

pub const DEFAULT_PAGE_SIZE: u64 = 30;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("API Client Error: {0}")]
    ApiClientError(String),
    #[error("Other Error: {0}")]
    Other(String),
}

/// Query parameters selecting which photos the gallery shows. Any change
/// invalidates the loaded page, the detection map and in-flight polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterParams {
    pub event_id: String,
    pub folder_id: Option<String>,
    pub match_person_id: Option<String>,
}

impl FilterParams {
    pub fn for_event(event_id: impl Into<String>) -> Self {
        FilterParams {
            event_id: event_id.into(),
            folder_id: None,
            match_person_id: None,
        }
    }

    pub fn with_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }

    pub fn with_match_person(mut self, match_person_id: impl Into<String>) -> Self {
        self.match_person_id = Some(match_person_id.into());
        self
    }
}

/// Per-photo face-detection state. `Pending` is the server saying "not yet";
/// `Unknown` means the last status request failed or never ran. Both keep the
/// scanning overlay up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    Detected,
    Pending,
    Unknown,
}

impl Detection {
    pub fn is_detected(self) -> bool {
        matches!(self, Detection::Detected)
    }

    pub fn needs_overlay(self) -> bool {
        !self.is_detected()
    }
}

pub type DetectionStatusMap = HashMap<String, Detection>;

#[derive(Debug, Clone, Copy)]
pub struct PageState {
    pub page_index: u64,
    pub page_size: u64,
    pub total_count: u64,
}

impl PageState {
    pub fn new(page_size: u64) -> Self {
        PageState {
            page_index: 0,
            page_size,
            total_count: 0,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.page_index > 0
    }

    pub fn has_next(&self) -> bool {
        (self.page_index + 1) * self.page_size < self.total_count
    }

    /// Index of the last page; an empty gallery stays on page 0.
    pub fn last_page_index(&self) -> u64 {
        if self.total_count == 0 {
            0
        } else {
            (self.total_count + self.page_size - 1) / self.page_size - 1
        }
    }

    pub fn skip(&self) -> u64 {
        self.page_index * self.page_size
    }
}

#[derive(Debug, Clone)]
pub enum GalleryProgress {
    PageLoaded {
        page_index: u64,
        photos: usize,
        total_count: u64,
    },
    DetectionPolled {
        detected: usize,
        pending: usize,
        unknown: usize,
    },
    StalePollDiscarded {
        generation: u64,
    },
}

#[derive(Debug)]
struct GalleryState {
    photos: Vec<Photo>,
    page: PageState,
    detection: DetectionStatusMap,
    selected: Option<Photo>,
    fetching: bool,
    generation: u64,
}

/// Read-only copy of the gallery state for rendering.
#[derive(Debug, Clone)]
pub struct GallerySnapshot {
    pub photos: Vec<Photo>,
    pub page: PageState,
    pub detection: DetectionStatusMap,
    pub selected: Option<Photo>,
    pub fetching: bool,
}

impl GallerySnapshot {
    /// Detection state for one listed photo; photos the poller has not
    /// resolved yet count as `Unknown`.
    pub fn detection_of(&self, photo_id: &str) -> Detection {
        self.detection
            .get(photo_id)
            .copied()
            .unwrap_or(Detection::Unknown)
    }
}

#[derive(Clone)]
pub struct Gallery {
    api_client: ApiClient,
    filter: FilterParams,
    state: Arc<Mutex<GalleryState>>,
    progress: Option<mpsc::UnboundedSender<GalleryProgress>>,
}

impl Gallery {
    pub fn new(api_client: ApiClient, filter: FilterParams, page_size: u64) -> Self {
        Gallery {
            api_client,
            filter,
            state: Arc::new(Mutex::new(GalleryState {
                photos: Vec::new(),
                page: PageState::new(page_size),
                detection: DetectionStatusMap::new(),
                selected: None,
                fetching: false,
                generation: 0,
            })),
            progress: None,
        }
    }

    /// Report page loads, poll summaries and stale-poll discards on `tx`.
    pub fn with_progress(mut self, tx: mpsc::UnboundedSender<GalleryProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn filter(&self) -> &FilterParams {
        &self.filter
    }

    /// Replace the filter and drop everything tied to the old one: photos,
    /// detection map, page position. Shut the poller down first; any poll
    /// already in flight is discarded by the generation bump.
    pub async fn set_filter(&mut self, filter: FilterParams) {
        if filter == self.filter {
            return;
        }
        self.filter = filter;
        let mut state = self.state.lock().await;
        state.generation += 1;
        state.photos.clear();
        state.detection.clear();
        state.page.page_index = 0;
        state.page.total_count = 0;
        state.fetching = false;
    }

    pub async fn snapshot(&self) -> GallerySnapshot {
        let state = self.state.lock().await;
        GallerySnapshot {
            photos: state.photos.clone(),
            page: state.page,
            detection: state.detection.clone(),
            selected: state.selected.clone(),
            fetching: state.fetching,
        }
    }

    pub async fn page(&self) -> PageState {
        self.state.lock().await.page
    }

    pub async fn photo_count(&self) -> usize {
        self.state.lock().await.photos.len()
    }

    /// Fetch one page and replace the photo list wholesale. A no-op without
    /// an event id. On failure the previous page is retained, the error is
    /// logged and the fetching flag cleared so pagination stays usable.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn load_page(&self, page_index: u64) -> Result<(), GalleryError> {
        if self.filter.event_id.is_empty() {
            tracing::debug!("no event selected, skipping photo fetch");
            return Ok(());
        }

        let (generation, skip, limit) = {
            let mut state = self.state.lock().await;
            state.fetching = true;
            // supersede the previous photo set and any poll against it
            state.generation += 1;
            (
                state.generation,
                page_index * state.page.page_size,
                state.page.page_size,
            )
        };

        let result = self
            .api_client
            .list_event_photos(
                &self.filter.event_id,
                self.filter.folder_id.as_deref(),
                self.filter.match_person_id.as_deref(),
                skip,
                limit,
            )
            .await;

        let mut state = self.state.lock().await;
        state.fetching = false;
        match result {
            Ok(page) => {
                if state.generation != generation {
                    tracing::debug!(generation, "discarding superseded page fetch");
                    return Ok(());
                }
                state.page.page_index = page_index;
                state.page.total_count = page.total_count;
                state.photos = page.data;
                state.detection.clear();
                if let Some(tx) = &self.progress {
                    let _ = tx.send(GalleryProgress::PageLoaded {
                        page_index,
                        photos: state.photos.len(),
                        total_count: state.page.total_count,
                    });
                }
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, page_index, "failed to fetch photos");
                Err(GalleryError::ApiClientError(e.to_string()))
            }
        }
    }

    /// One detection request per photo, all in flight at once. A failing
    /// request resolves that photo to `Unknown` instead of failing the batch,
    /// so one bad photo cannot block status for the rest.
    pub async fn poll_detection_status(&self, photos: &[Photo]) -> DetectionStatusMap {
        let requests = photos.iter().map(|photo| {
            let client = self.api_client.clone();
            let event_id = self.filter.event_id.clone();
            let id = photo.id.clone();
            async move {
                let status = match client.detection_status(&id, &event_id).await {
                    Ok(true) => Detection::Detected,
                    Ok(false) => Detection::Pending,
                    Err(e) => {
                        tracing::warn!(photo = %id, error = %e, "detection status request failed");
                        Detection::Unknown
                    }
                };
                (id, status)
            }
        });
        join_all(requests).await.into_iter().collect()
    }

    /// Poll the loaded photo set and commit the merged map in one atomic
    /// update. Returns false when nothing was committed: no photos loaded, or
    /// the set was superseded while requests were in flight.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn refresh_detection(&self) -> bool {
        let (generation, photos) = {
            let state = self.state.lock().await;
            (state.generation, state.photos.clone())
        };
        if photos.is_empty() {
            return false;
        }

        let map = self.poll_detection_status(&photos).await;
        self.commit_detection(generation, map).await
    }

    /// Replace the detection map, unless `generation` no longer matches the
    /// current photo set (a page or filter change won the race).
    async fn commit_detection(&self, generation: u64, map: DetectionStatusMap) -> bool {
        let mut state = self.state.lock().await;
        if state.generation != generation {
            tracing::debug!(generation, "discarding stale detection poll");
            if let Some(tx) = &self.progress {
                let _ = tx.send(GalleryProgress::StalePollDiscarded { generation });
            }
            return false;
        }

        let detected = map.values().filter(|s| s.is_detected()).count();
        let pending = map
            .values()
            .filter(|s| matches!(s, Detection::Pending))
            .count();
        let unknown = map.len() - detected - pending;
        state.detection = map;
        if let Some(tx) = &self.progress {
            let _ = tx.send(GalleryProgress::DetectionPolled {
                detected,
                pending,
                unknown,
            });
        }
        true
    }

    /// Move one page back. Returns false when already on the first page.
    pub async fn previous_page(&self) -> Result<bool, GalleryError> {
        let target = {
            let state = self.state.lock().await;
            if !state.page.has_previous() {
                return Ok(false);
            }
            state.page.page_index - 1
        };
        self.load_page(target).await?;
        Ok(true)
    }

    /// Move one page forward. Returns false when on the last page or while a
    /// fetch is still outstanding.
    pub async fn next_page(&self) -> Result<bool, GalleryError> {
        let target = {
            let state = self.state.lock().await;
            if state.fetching || !state.page.has_next() {
                return Ok(false);
            }
            state.page.page_index + 1
        };
        self.load_page(target).await?;
        Ok(true)
    }

    pub async fn jump_to_last(&self) -> Result<(), GalleryError> {
        let target = {
            let state = self.state.lock().await;
            state.page.last_page_index()
        };
        self.load_page(target).await
    }

    /// Open a photo in the viewer. Independent of fetch and poll state.
    pub async fn select_photo(&self, photo: Photo) {
        self.state.lock().await.selected = Some(photo);
    }

    pub async fn close_photo(&self) {
        self.state.lock().await.selected = None;
    }

    pub async fn selected_photo(&self) -> Option<Photo> {
        self.state.lock().await.selected.clone()
    }

    /// Run one immediate detection poll, then repeat at `interval` until the
    /// returned sender fires or is dropped. Send the shutdown before changing
    /// filter or page so a pending tick cannot race the new photo set; a tick
    /// that already fired is discarded by the generation guard at commit.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub fn start_polling(&self, interval: Duration) -> (JoinHandle<()>, oneshot::Sender<()>) {
        let gallery = self.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        break;
                    }
                    _ = async {
                        gallery.refresh_detection().await;
                        sleep(interval).await;
                    } => {}
                }
            }
        });
        (handle, shutdown_tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_client::ApiClient;
    use serial_test::serial;

    fn page(page_index: u64, page_size: u64, total_count: u64) -> PageState {
        PageState {
            page_index,
            page_size,
            total_count,
        }
    }

    #[test]
    fn test_next_enabled_only_below_total() {
        assert!(page(0, 30, 65).has_next());
        assert!(page(1, 30, 65).has_next());
        assert!(!page(2, 30, 65).has_next());
        assert!(!page(0, 30, 30).has_next());
        assert!(!page(0, 30, 0).has_next());
    }

    #[test]
    fn test_previous_enabled_only_after_first_page() {
        assert!(!page(0, 30, 65).has_previous());
        assert!(page(1, 30, 65).has_previous());
    }

    #[test]
    fn test_last_page_index() {
        assert_eq!(page(0, 30, 65).last_page_index(), 2);
        assert_eq!(page(0, 30, 60).last_page_index(), 1);
        assert_eq!(page(0, 30, 30).last_page_index(), 0);
        assert_eq!(page(0, 30, 1).last_page_index(), 0);
        assert_eq!(page(0, 30, 0).last_page_index(), 0);
    }

    #[test]
    fn test_jump_to_last_is_terminal() {
        let mut p = page(0, 30, 65);
        p.page_index = p.last_page_index();
        assert!(!p.has_next());
        assert!(p.has_previous());
    }

    #[test]
    fn test_empty_gallery_disables_both_directions() {
        let mut p = page(0, 30, 0);
        p.page_index = p.last_page_index();
        assert_eq!(p.page_index, 0);
        assert!(!p.has_next());
        assert!(!p.has_previous());
    }

    #[test]
    fn test_skip_tracks_page_index() {
        assert_eq!(page(0, 30, 65).skip(), 0);
        assert_eq!(page(2, 30, 65).skip(), 60);
    }

    #[test]
    fn test_pending_and_unknown_keep_overlay() {
        assert!(!Detection::Detected.needs_overlay());
        assert!(Detection::Pending.needs_overlay());
        assert!(Detection::Unknown.needs_overlay());
    }

    #[test]
    fn test_snapshot_defaults_missing_photos_to_unknown() {
        let snapshot = GallerySnapshot {
            photos: Vec::new(),
            page: PageState::new(30),
            detection: DetectionStatusMap::new(),
            selected: None,
            fetching: false,
        };
        assert_eq!(snapshot.detection_of("nope"), Detection::Unknown);
    }

    fn mock_gallery(filter: FilterParams) -> Gallery {
        Gallery::new(ApiClient::new(String::new(), String::new()), filter, 30)
    }

    #[tokio::test]
    #[serial]
    async fn test_load_page_requires_event_id() {
        std::env::set_var("MOCK_API_CLIENT", "1");
        let gallery = mock_gallery(FilterParams::for_event(""));
        gallery.load_page(0).await.unwrap();
        assert_eq!(gallery.photo_count().await, 0);
        std::env::remove_var("MOCK_API_CLIENT");
    }

    #[tokio::test]
    #[serial]
    async fn test_stale_poll_commit_is_discarded() {
        std::env::set_var("MOCK_API_CLIENT", "1");
        let gallery = mock_gallery(FilterParams::for_event("1"));
        gallery.load_page(0).await.unwrap();

        let (generation, photos) = {
            let state = gallery.state.lock().await;
            (state.generation, state.photos.clone())
        };
        assert!(!photos.is_empty());
        let map = gallery.poll_detection_status(&photos).await;

        // a reload supersedes the snapshot before the poll commits
        gallery.load_page(0).await.unwrap();
        assert!(!gallery.commit_detection(generation, map).await);
        assert!(gallery.snapshot().await.detection.is_empty());
        std::env::remove_var("MOCK_API_CLIENT");
    }

    #[tokio::test]
    #[serial]
    async fn test_filter_change_discards_in_flight_poll() {
        std::env::set_var("MOCK_API_CLIENT", "1");
        let mut gallery = mock_gallery(FilterParams::for_event("1"));
        gallery.load_page(0).await.unwrap();

        let (generation, photos) = {
            let state = gallery.state.lock().await;
            (state.generation, state.photos.clone())
        };
        let map = gallery.poll_detection_status(&photos).await;

        gallery
            .set_filter(FilterParams::for_event("1").with_folder("f1"))
            .await;
        assert!(!gallery.commit_detection(generation, map).await);

        let snapshot = gallery.snapshot().await;
        assert!(snapshot.detection.is_empty());
        assert!(snapshot.photos.is_empty());
        std::env::remove_var("MOCK_API_CLIENT");
    }

    #[tokio::test]
    #[serial]
    async fn test_selection_is_independent_of_polling() {
        std::env::set_var("MOCK_API_CLIENT", "1");
        let gallery = mock_gallery(FilterParams::for_event("1"));
        gallery.load_page(0).await.unwrap();

        let photo = gallery.snapshot().await.photos[0].clone();
        gallery.select_photo(photo.clone()).await;
        assert_eq!(gallery.selected_photo().await, Some(photo));

        gallery.refresh_detection().await;
        assert!(gallery.selected_photo().await.is_some());

        gallery.close_photo().await;
        assert_eq!(gallery.selected_photo().await, None);
        std::env::remove_var("MOCK_API_CLIENT");
    }
}
