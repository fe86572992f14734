//! Main application entry point for EventPicz.

mod config;

use api_client::{ApiClient, Event, EventPayload, Folder, FolderPayload, UserDetails};
use clap::{Parser, Subcommand};
use config::{AppConfig, AppConfigOverrides};
use gallery::{FilterParams, Gallery, GalleryError, GalleryProgress, GallerySnapshot};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing_appender::rolling;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

// Limits enforced before any upload request is issued.
const MAX_UPLOAD_FILES: usize = 200;
const MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Rendering theme, resolved once from configuration and passed down to the
/// print helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Theme {
    Light,
    Dark,
}

impl Theme {
    fn from_name(name: &str) -> Self {
        match name {
            "light" => Theme::Light,
            _ => Theme::Dark,
        }
    }

    fn heading(self, text: &str) -> String {
        match self {
            Theme::Dark => format!("\x1b[1;36m{}\x1b[0m", text),
            Theme::Light => format!("\x1b[1m{}\x1b[0m", text),
        }
    }

    fn dim(self, text: &str) -> String {
        match self {
            Theme::Dark => format!("\x1b[2m{}\x1b[0m", text),
            Theme::Light => text.to_string(),
        }
    }
}

#[derive(Parser)]
#[command(
    name = "eventpicz",
    author,
    version,
    about = "EventPicz event photo client"
)]
struct Cli {
    /// Override log level (e.g. info, debug)
    #[arg(long)]
    log_level: Option<String>,
    /// Override backend base URL
    #[arg(long)]
    base_url: Option<String>,
    /// Override backend API key
    #[arg(long)]
    api_key: Option<String>,
    /// Override gallery page size
    #[arg(long)]
    page_size: Option<u64>,
    /// Override detection poll interval in seconds
    #[arg(long)]
    poll_interval_secs: Option<u64>,
    /// Color theme (light or dark)
    #[arg(long)]
    theme: Option<String>,
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all events
    Events,
    /// Create a new event
    CreateEvent {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        /// Event date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        /// Cover picture uploaded before the event is created
        #[arg(long)]
        picture: Option<PathBuf>,
    },
    /// Update an existing event
    UpdateEvent {
        /// ID of the event to update
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        /// Event date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        /// Replacement cover picture
        #[arg(long)]
        picture: Option<PathBuf>,
    },
    /// List an event's folders
    Folders {
        /// Event ID
        #[arg(long)]
        event: String,
    },
    /// Create a folder inside an event
    CreateFolder {
        /// Event ID
        #[arg(long)]
        event: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        /// Folder date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        /// Folder picture uploaded before the folder is created
        #[arg(long)]
        picture: Option<PathBuf>,
    },
    /// Upload a batch of photos into an event folder
    UploadPhotos {
        /// Event ID
        #[arg(long)]
        event: String,
        /// Folder ID
        #[arg(long)]
        folder: String,
        /// Photo files (up to 200, each below 100 MiB)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Upload a selfie and look for matching photos
    UploadSelfie {
        /// Event ID
        #[arg(long)]
        event: String,
        /// Selfie image file
        file: PathBuf,
    },
    /// Browse an event gallery page by page
    Gallery {
        /// Event ID
        #[arg(long)]
        event: String,
        /// Restrict to one folder
        #[arg(long)]
        folder: Option<String>,
        /// Restrict to photos matching a person
        #[arg(long)]
        match_person: Option<String>,
        /// Page to open (0-based)
        #[arg(long, default_value_t = 0)]
        page: u64,
        /// Open the last page instead
        #[arg(long)]
        last: bool,
        /// Keep polling detection status until interrupted
        #[arg(long)]
        watch: bool,
    },
    /// Show a user profile
    Profile {
        /// User ID
        #[arg(long)]
        id: String,
    },
    /// Persist the effective configuration (file values plus overrides)
    SaveConfig,
    /// Update a user profile
    UpdateProfile {
        /// User ID
        #[arg(long)]
        id: String,
        #[arg(long)]
        whatsapp: Option<String>,
        #[arg(long)]
        facebook: Option<String>,
        #[arg(long)]
        instagram: Option<String>,
        #[arg(long)]
        youtube: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        website: Option<String>,
        #[arg(long)]
        extra_details: Option<String>,
        /// Background photo uploaded before the profile is saved
        #[arg(long)]
        background: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let overrides = AppConfigOverrides {
        log_level: cli.log_level.clone(),
        base_url: cli.base_url.clone(),
        api_key: cli.api_key.clone(),
        page_size: cli.page_size,
        poll_interval_secs: cli.poll_interval_secs,
        theme: cli.theme.clone(),
    };
    let cfg = AppConfig::load_from(cli.config.clone()).apply_overrides(&overrides);
    std::fs::create_dir_all(&cfg.data_path)?;
    let file_appender = rolling::daily(&cfg.data_path, "eventpicz.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(cfg.log_level.clone()))
        .with_writer(std::io::stdout.and(file_writer))
        .init();

    let client = ApiClient::new(cfg.base_url.clone(), cfg.api_key.clone());
    let theme = Theme::from_name(&cfg.theme);

    match cli.command {
        Commands::Events => {
            let events = client.list_events().await?;
            print_events(&events, theme);
        }
        Commands::CreateEvent {
            name,
            description,
            date,
            picture,
        } => {
            let date = parse_date(&date)?;
            let event_picture = match picture {
                Some(path) => Some(client.upload_photo(&path).await?),
                None => None,
            };
            let event = client
                .create_event(&EventPayload {
                    id: None,
                    name,
                    description,
                    date,
                    event_picture,
                })
                .await?;
            println!("Event created: {} (id: {})", event.name, event.id);
        }
        Commands::UpdateEvent {
            id,
            name,
            description,
            date,
            picture,
        } => {
            let date = parse_date(&date)?;
            let event_picture = match picture {
                Some(path) => Some(client.upload_photo(&path).await?),
                None => None,
            };
            client
                .update_event(&EventPayload {
                    id: Some(id.clone()),
                    name,
                    description,
                    date,
                    event_picture,
                })
                .await?;
            println!("Event updated: {}", id);
        }
        Commands::Folders { event } => {
            let folders = client.list_folders(&event).await?;
            print_folders(&folders, theme);
        }
        Commands::CreateFolder {
            event,
            name,
            description,
            date,
            picture,
        } => {
            let date = parse_date(&date)?;
            let folder_picture = match picture {
                Some(path) => Some(client.upload_photo(&path).await?),
                None => None,
            };
            let folder = client
                .create_folder(&FolderPayload {
                    name,
                    description,
                    date,
                    event_id: event,
                    folder_picture,
                })
                .await?;
            println!("Folder created: {} (id: {})", folder.name, folder.id);
        }
        Commands::UploadPhotos {
            event,
            folder,
            files,
        } => {
            validate_upload_batch(&files)?;
            client.upload_photos(&files, &event, &folder).await?;
            println!("Uploaded {} photo(s)", files.len());
        }
        Commands::UploadSelfie { event, file } => {
            match client.upload_selfie(&file, &event).await? {
                Some(person) => {
                    println!("Match found: {}", person);
                    println!(
                        "Browse with: eventpicz gallery --event {} --match-person {}",
                        event, person
                    );
                }
                None => println!("Selfie uploaded successfully, but no matches found."),
            }
        }
        Commands::Gallery {
            event,
            folder,
            match_person,
            page,
            last,
            watch,
        } => {
            let mut filter = FilterParams::for_event(event);
            if let Some(f) = folder {
                filter = filter.with_folder(f);
            }
            if let Some(p) = match_person {
                filter = filter.with_match_person(p);
            }
            run_gallery(client, &cfg, theme, filter, page, last, watch).await?;
        }
        Commands::Profile { id } => {
            let details = client.user_details(&id).await?;
            print_profile(&details, theme);
        }
        Commands::SaveConfig => {
            cfg.save_to(cli.config.clone())?;
            println!("Configuration saved");
        }
        Commands::UpdateProfile {
            id,
            whatsapp,
            facebook,
            instagram,
            youtube,
            phone,
            email,
            website,
            extra_details,
            background,
        } => {
            let mut details = client.user_details(&id).await?;
            if let Some(v) = whatsapp {
                details.social_media.whatsapp = v;
            }
            if let Some(v) = facebook {
                details.social_media.facebook = v;
            }
            if let Some(v) = instagram {
                details.social_media.instagram = v;
            }
            if let Some(v) = youtube {
                details.social_media.youtube = v;
            }
            if let Some(v) = phone {
                details.contact_info.phone_number = v;
            }
            if let Some(v) = email {
                details.contact_info.email = v;
            }
            if let Some(v) = website {
                details.contact_info.website = v;
            }
            if let Some(v) = extra_details {
                details.extra_details = v;
            }
            if let Some(path) = background {
                details.background_photo_url = client.upload_photo(&path).await?;
            }
            client.update_user(&id, &details).await?;
            println!("Profile updated: {}", id);
        }
    }

    Ok(())
}

async fn run_gallery(
    client: ApiClient,
    cfg: &AppConfig,
    theme: Theme,
    filter: FilterParams,
    page: u64,
    last: bool,
    watch: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !watch {
        let gallery = Gallery::new(client, filter, cfg.page_size);
        open_page(&gallery, page, last).await?;
        gallery.refresh_detection().await;
        render_gallery(&gallery.snapshot().await, theme);
        return Ok(());
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let gallery = Gallery::new(client, filter, cfg.page_size).with_progress(tx);
    open_page(&gallery, page, last).await?;
    gallery.refresh_detection().await;
    render_gallery(&gallery.snapshot().await, theme);

    let printer = tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            match progress {
                GalleryProgress::PageLoaded {
                    page_index,
                    photos,
                    total_count,
                } => println!(
                    "Loaded page {} ({} of {} photos)",
                    page_index, photos, total_count
                ),
                GalleryProgress::DetectionPolled {
                    detected,
                    pending,
                    unknown,
                } => println!(
                    "Scan status: {} ready, {} scanning",
                    detected,
                    pending + unknown
                ),
                GalleryProgress::StalePollDiscarded { .. } => {}
            }
        }
    });

    let (handle, shutdown) = gallery.start_polling(Duration::from_secs(cfg.poll_interval_secs));
    println!(
        "Watching detection status every {}s, press Ctrl-C to stop",
        cfg.poll_interval_secs
    );
    tokio::signal::ctrl_c().await?;
    let _ = shutdown.send(());
    handle.await?;
    printer.abort();

    render_gallery(&gallery.snapshot().await, theme);
    Ok(())
}

async fn open_page(gallery: &Gallery, page: u64, last: bool) -> Result<(), GalleryError> {
    if last {
        // the total is only known after a fetch
        gallery.load_page(0).await?;
        gallery.jump_to_last().await
    } else {
        gallery.load_page(page).await
    }
}

fn render_gallery(snapshot: &GallerySnapshot, theme: Theme) {
    let page = snapshot.page;
    println!("{}", theme.heading("Gallery"));
    println!(
        "Showing {} - {} of {} photos",
        page.skip() + 1,
        page.skip() + snapshot.photos.len() as u64,
        page.total_count
    );
    for photo in &snapshot.photos {
        if snapshot.detection_of(&photo.id).needs_overlay() {
            println!("  {} {} [scanning]", photo.id, photo.url);
        } else {
            println!("  {} {}", photo.id, photo.url);
        }
    }
    let mut nav = Vec::new();
    if page.has_previous() {
        nav.push("previous");
    }
    if page.has_next() {
        nav.push("next");
    }
    if nav.is_empty() {
        println!("{}", theme.dim("(single page)"));
    } else {
        println!("{}", theme.dim(&format!("more: {}", nav.join(", "))));
    }
}

fn print_events(events: &[Event], theme: Theme) {
    println!("{}", theme.heading("Events"));
    if events.is_empty() {
        println!("No events found");
        return;
    }
    for event in events {
        println!("{} (id: {})", event.name, event.id);
        if let Some(description) = &event.description {
            println!("  {}", description);
        }
        if let Some(date) = &event.date {
            println!("  {}", theme.dim(&format_date(date)));
        }
        if let Some(folders) = &event.folders {
            for folder in folders {
                println!("  - {} (id: {})", folder.name, folder.id);
            }
        }
    }
}

fn print_folders(folders: &[Folder], theme: Theme) {
    println!("{}", theme.heading("Folders"));
    if folders.is_empty() {
        println!("No folders found");
        return;
    }
    for folder in folders {
        println!("{} (id: {})", folder.name, folder.id);
        if let Some(description) = &folder.description {
            println!("  {}", description);
        }
        if let Some(date) = &folder.date {
            println!("  {}", theme.dim(&format_date(date)));
        }
    }
}

fn print_profile(details: &UserDetails, theme: Theme) {
    println!("{}", theme.heading("Profile"));
    let social = &details.social_media;
    for (label, value) in [
        ("whatsapp", &social.whatsapp),
        ("facebook", &social.facebook),
        ("instagram", &social.instagram),
        ("youtube", &social.youtube),
    ] {
        if !value.is_empty() {
            println!("  {}: {}", label, value);
        }
    }
    let contact = &details.contact_info;
    for (label, value) in [
        ("phone", &contact.phone_number),
        ("email", &contact.email),
        ("website", &contact.website),
    ] {
        if !value.is_empty() {
            println!("  {}: {}", label, value);
        }
    }
    if !details.extra_details.is_empty() {
        println!("  {}", details.extra_details);
    }
    if !details.background_photo_url.is_empty() {
        println!("  {}", theme.dim(&details.background_photo_url));
    }
}

fn parse_date(raw: &str) -> Result<String, Box<dyn std::error::Error>> {
    let date = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{}': {}", raw, e))?;
    Ok(date.format("%Y-%m-%d").to_string())
}

fn format_date(raw: &str) -> String {
    if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%Y-%m-%d").to_string();
    }
    if let Ok(stamp) = chrono::DateTime::parse_from_rfc3339(raw) {
        return stamp.date_naive().format("%Y-%m-%d").to_string();
    }
    raw.to_string()
}

fn validate_upload_batch(files: &[PathBuf]) -> Result<(), Box<dyn std::error::Error>> {
    if files.len() > MAX_UPLOAD_FILES {
        return Err(format!(
            "You can only upload a maximum of {} files",
            MAX_UPLOAD_FILES
        )
        .into());
    }
    for file in files {
        let size = std::fs::metadata(file)
            .map_err(|e| format!("cannot read {}: {}", file.display(), e))?
            .len();
        if size > MAX_UPLOAD_BYTES {
            return Err(format!("{} exceeds the 100 MB size limit", file.display()).into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_accepts_iso_dates() {
        assert_eq!(parse_date("2024-06-01").unwrap(), "2024-06-01");
        assert!(parse_date("06/01/2024").is_err());
        assert!(parse_date("not-a-date").is_err());
    }

    #[test]
    fn test_format_date_handles_timestamps() {
        assert_eq!(format_date("2024-06-01"), "2024-06-01");
        assert_eq!(format_date("2024-06-01T10:30:00+00:00"), "2024-06-01");
        assert_eq!(format_date("whenever"), "whenever");
    }

    #[test]
    fn test_upload_batch_size_limit() {
        let files: Vec<PathBuf> = (0..=MAX_UPLOAD_FILES)
            .map(|i| PathBuf::from(format!("{}.jpg", i)))
            .collect();
        let err = validate_upload_batch(&files).unwrap_err();
        assert!(err.to_string().contains("maximum of 200 files"));
    }

    #[test]
    fn test_upload_batch_missing_file() {
        let files = vec![PathBuf::from("definitely-not-here.jpg")];
        assert!(validate_upload_batch(&files).is_err());
    }
}
