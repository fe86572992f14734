//! API client module for the EventPicz backend.

use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// One photo reference as returned by the listing endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Photo {
    #[serde(rename = "_id")]
    pub id: String,
    pub url: String,
}

/// A page of photos plus the authoritative total for the active filter.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PhotoPage {
    pub data: Vec<Photo>,
    pub total_count: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub date: Option<String>,
    pub event_picture: Option<String>,
    pub folders: Option<Vec<Folder>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub date: Option<String>,
    pub folder_picture: Option<String>,
}

/// Payload for `/events/create` and `/events/update`.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_picture: Option<String>,
}

/// Payload for `/folders/create`.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FolderPayload {
    pub name: String,
    pub description: String,
    pub date: String,
    pub event_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_picture: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SocialMedia {
    #[serde(default)]
    pub whatsapp: String,
    #[serde(default)]
    pub facebook: String,
    #[serde(default)]
    pub instagram: String,
    #[serde(default)]
    pub youtube: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub website: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    #[serde(default)]
    pub social_media: SocialMedia,
    #[serde(default)]
    pub contact_info: ContactInfo,
    #[serde(default)]
    pub extra_details: String,
    #[serde(default)]
    pub background_photo_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectionResponse {
    is_detected: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    photo_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelfieResponse {
    match_person_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateEventResponse {
    event: Event,
}

#[derive(Debug, Deserialize)]
struct CreateFolderResponse {
    folder: Folder,
}

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("Request Error: {0}")]
    RequestError(String),
    #[error("Backend Error: {0}")]
    BackendError(String),
    #[error("Other Error: {0}")]
    Other(String),
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl ApiClient {
    /// Base URL and API key come from process configuration; every request
    /// carries the key in an `x-api-key` header.
    pub fn new(base_url: String, api_key: String) -> Self {
        ApiClient {
            client: reqwest::Client::new(),
            api_key,
            base_url,
        }
    }

    /// List one page of an event's photos. `skip`/`limit` drive pagination;
    /// the optional filters are appended only when present and non-empty.
    pub async fn list_event_photos(
        &self,
        event_id: &str,
        folder_id: Option<&str>,
        match_person_id: Option<&str>,
        skip: u64,
        limit: u64,
    ) -> Result<PhotoPage, ApiClientError> {
        if mock::enabled() {
            return Ok(mock::photo_page(skip, limit));
        }
        let mut url = format!(
            "{}/api/photos/event?eventNumber={}",
            self.base_url, event_id
        );
        if let Some(folder) = folder_id.filter(|f| !f.is_empty()) {
            url.push_str(&format!("&folderId={}", folder));
        }
        if let Some(person) = match_person_id.filter(|p| !p.is_empty()) {
            url.push_str(&format!("&matchPersonId={}", person));
        }
        url.push_str(&format!("&skip={}&limit={}", skip, limit));

        let response = self
            .client
            .get(&url)
            .header("x-api-key", self.api_key.as_str())
            .send()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiClientError::BackendError(error_text));
        }

        response
            .json::<PhotoPage>()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))
    }

    /// Whether server-side face detection has completed for one photo.
    pub async fn detection_status(
        &self,
        photo_id: &str,
        event_id: &str,
    ) -> Result<bool, ApiClientError> {
        if mock::enabled() {
            return Ok(mock::detection(photo_id));
        }
        let url = format!(
            "{}/api/photos/detection?photoId={}&eventId={}",
            self.base_url, photo_id, event_id
        );

        let response = self
            .client
            .get(&url)
            .header("x-api-key", self.api_key.as_str())
            .send()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiClientError::BackendError(error_text));
        }

        let status = response
            .json::<DetectionResponse>()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))?;
        Ok(status.is_detected)
    }

    /// Upload a batch of photos into an event folder. The backend expects
    /// repeated `photos` parts plus `eventId` and `folderId` fields.
    pub async fn upload_photos(
        &self,
        paths: &[std::path::PathBuf],
        event_id: &str,
        folder_id: &str,
    ) -> Result<(), ApiClientError> {
        if mock::enabled() {
            return Ok(());
        }
        let mut form = Form::new()
            .text("eventId", event_id.to_string())
            .text("folderId", folder_id.to_string());
        for path in paths {
            form = form.part("photos", file_part(path).await?);
        }

        let url = format!("{}/api/photos", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.as_str())
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiClientError::BackendError(error_text));
        }
        Ok(())
    }

    /// Upload a single file (event/folder cover, profile background) and
    /// return the stored photo URL.
    pub async fn upload_photo(&self, path: &Path) -> Result<String, ApiClientError> {
        if mock::enabled() {
            return Ok(mock::photo_url());
        }
        let form = Form::new().part("file", file_part(path).await?);

        let url = format!("{}/api/photos/upload", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.as_str())
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiClientError::BackendError(error_text));
        }

        let uploaded = response
            .json::<UploadResponse>()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))?;
        Ok(uploaded.photo_url)
    }

    /// Upload a selfie for face matching. `Some(id)` identifies the matched
    /// person; `None` means the scan finished without a match.
    pub async fn upload_selfie(
        &self,
        path: &Path,
        event_id: &str,
    ) -> Result<Option<String>, ApiClientError> {
        if mock::enabled() {
            return Ok(Some(mock::MATCH_PERSON_ID.to_string()));
        }
        let form = Form::new()
            .part("file", file_part(path).await?)
            .text("eventId", event_id.to_string());

        let url = format!("{}/api/photos/selfie", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.as_str())
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiClientError::BackendError(error_text));
        }

        let matched = response
            .json::<SelfieResponse>()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))?;
        Ok(matched.match_person_id)
    }

    pub async fn list_events(&self) -> Result<Vec<Event>, ApiClientError> {
        if mock::enabled() {
            return Ok(mock::events());
        }
        let url = format!("{}/events/all", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("x-api-key", self.api_key.as_str())
            .send()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiClientError::BackendError(error_text));
        }

        response
            .json::<Vec<Event>>()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))
    }

    pub async fn create_event(&self, payload: &EventPayload) -> Result<Event, ApiClientError> {
        if mock::enabled() {
            return Ok(mock::created_event(payload));
        }
        let url = format!("{}/events/create", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.as_str())
            .header(CONTENT_TYPE, "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiClientError::BackendError(error_text));
        }

        let created = response
            .json::<CreateEventResponse>()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))?;
        Ok(created.event)
    }

    pub async fn update_event(&self, payload: &EventPayload) -> Result<(), ApiClientError> {
        if payload.id.is_none() {
            return Err(ApiClientError::Other(
                "Event id is required for update".into(),
            ));
        }
        if mock::enabled() {
            return Ok(());
        }
        let url = format!("{}/events/update", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.as_str())
            .header(CONTENT_TYPE, "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiClientError::BackendError(error_text));
        }
        Ok(())
    }

    pub async fn list_folders(&self, event_id: &str) -> Result<Vec<Folder>, ApiClientError> {
        if mock::enabled() {
            return Ok(mock::folders());
        }
        let url = format!("{}/folders/all?eventId={}", self.base_url, event_id);
        let response = self
            .client
            .get(&url)
            .header("x-api-key", self.api_key.as_str())
            .send()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiClientError::BackendError(error_text));
        }

        response
            .json::<Vec<Folder>>()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))
    }

    pub async fn create_folder(&self, payload: &FolderPayload) -> Result<Folder, ApiClientError> {
        if mock::enabled() {
            return Ok(mock::created_folder(payload));
        }
        let url = format!("{}/folders/create", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.as_str())
            .header(CONTENT_TYPE, "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiClientError::BackendError(error_text));
        }

        let created = response
            .json::<CreateFolderResponse>()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))?;
        Ok(created.folder)
    }

    pub async fn user_details(&self, user_id: &str) -> Result<UserDetails, ApiClientError> {
        if mock::enabled() {
            return Ok(mock::user());
        }
        let url = format!("{}/users/details?id={}", self.base_url, user_id);
        let response = self
            .client
            .get(&url)
            .header("x-api-key", self.api_key.as_str())
            .send()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiClientError::BackendError(error_text));
        }

        response
            .json::<UserDetails>()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))
    }

    pub async fn update_user(
        &self,
        user_id: &str,
        details: &UserDetails,
    ) -> Result<(), ApiClientError> {
        #[derive(Serialize)]
        struct UserUpdateRequest<'a> {
            id: &'a str,
            #[serde(flatten)]
            details: &'a UserDetails,
        }

        if mock::enabled() {
            return Ok(());
        }
        let url = format!("{}/users/update", self.base_url);
        let body = UserUpdateRequest {
            id: user_id,
            details,
        };
        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.as_str())
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiClientError::BackendError(error_text));
        }
        Ok(())
    }
}

async fn file_part(path: &Path) -> Result<Part, ApiClientError> {
    let file_name = path
        .file_name()
        .and_then(|f| f.to_str())
        .ok_or_else(|| ApiClientError::Other("Invalid file name".into()))?
        .to_string();

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ApiClientError::Other(e.to_string()))?;

    Ok(Part::bytes(bytes).file_name(file_name))
}

/// Canned in-process responses, enabled with `MOCK_API_CLIENT=1`. Keeps CLI
/// and smoke tests off the network entirely.
mod mock {
    use super::*;

    pub const MATCH_PERSON_ID: &str = "person-1";

    pub fn enabled() -> bool {
        std::env::var("MOCK_API_CLIENT")
            .map(|v| v == "1")
            .unwrap_or(false)
    }

    fn photo(id: &str) -> Photo {
        Photo {
            id: id.to_string(),
            url: format!("https://photos.example.com/{}.jpg", id),
        }
    }

    pub fn photo_page(skip: u64, limit: u64) -> PhotoPage {
        let all = vec![photo("1"), photo("2")];
        let data = all
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect();
        PhotoPage {
            data,
            total_count: 2,
        }
    }

    pub fn detection(photo_id: &str) -> bool {
        photo_id == "1"
    }

    pub fn photo_url() -> String {
        "https://photos.example.com/uploads/mock.jpg".to_string()
    }

    pub fn folders() -> Vec<Folder> {
        vec![Folder {
            id: "f1".to_string(),
            name: "Main Hall".to_string(),
            description: Some("Mock folder".to_string()),
            date: Some("2024-06-01".to_string()),
            folder_picture: None,
        }]
    }

    pub fn events() -> Vec<Event> {
        vec![Event {
            id: "1".to_string(),
            name: "Sample Event".to_string(),
            description: Some("Mock event".to_string()),
            date: Some("2024-06-01".to_string()),
            event_picture: None,
            folders: Some(folders()),
        }]
    }

    pub fn created_event(payload: &EventPayload) -> Event {
        Event {
            id: payload.id.clone().unwrap_or_else(|| "1".to_string()),
            name: payload.name.clone(),
            description: Some(payload.description.clone()),
            date: Some(payload.date.clone()),
            event_picture: payload.event_picture.clone(),
            folders: None,
        }
    }

    pub fn created_folder(payload: &FolderPayload) -> Folder {
        Folder {
            id: "f1".to_string(),
            name: payload.name.clone(),
            description: Some(payload.description.clone()),
            date: Some(payload.date.clone()),
            folder_picture: payload.folder_picture.clone(),
        }
    }

    pub fn user() -> UserDetails {
        UserDetails {
            social_media: SocialMedia {
                instagram: "https://instagram.com/sample".to_string(),
                ..SocialMedia::default()
            },
            contact_info: ContactInfo {
                email: "sample@example.com".to_string(),
                ..ContactInfo::default()
            },
            extra_details: "Mock profile".to_string(),
            background_photo_url: String::new(),
        }
    }
}
