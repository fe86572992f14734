use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub base_url: String,
    pub api_key: String,
    pub page_size: u64,
    pub poll_interval_secs: u64,
    pub theme: String,
    pub data_path: PathBuf,
}

pub struct AppConfigOverrides {
    pub log_level: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub page_size: Option<u64>,
    pub poll_interval_secs: Option<u64>,
    pub theme: Option<String>,
}

impl AppConfig {
    pub fn load_from(path: Option<PathBuf>) -> Self {
        let mut builder = config::Config::builder();
        let path = match path {
            Some(p) => p,
            None => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".eventpicz")
                .join("config"),
        };
        builder = builder.add_source(config::File::from(path).required(false));
        let cfg = builder.build().unwrap_or_default();

        let log_level = cfg
            .get_string("log_level")
            .unwrap_or_else(|_| "info".to_string());
        let base_url = std::env::var("EVENTPICZ_BASE_URL").unwrap_or_else(|_| {
            cfg.get_string("base_url")
                .unwrap_or_else(|_| "http://localhost:4000".to_string())
        });
        let api_key = std::env::var("EVENTPICZ_API_KEY")
            .unwrap_or_else(|_| cfg.get_string("api_key").unwrap_or_default());
        let page_size = cfg
            .get_int("page_size")
            .unwrap_or(gallery::DEFAULT_PAGE_SIZE as i64) as u64;
        let poll_interval_secs = cfg
            .get_int("poll_interval_secs")
            .unwrap_or(gallery::DEFAULT_POLL_INTERVAL.as_secs() as i64)
            as u64;
        let theme = cfg
            .get_string("theme")
            .unwrap_or_else(|_| "dark".to_string());
        let data_path = cfg
            .get_string("data_path")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".eventpicz")
            });

        Self {
            log_level,
            base_url,
            api_key,
            page_size,
            poll_interval_secs,
            theme,
            data_path,
        }
    }

    pub fn apply_overrides(mut self, ov: &AppConfigOverrides) -> Self {
        if let Some(l) = &ov.log_level {
            self.log_level = l.clone();
        }
        if let Some(u) = &ov.base_url {
            self.base_url = u.clone();
        }
        if let Some(k) = &ov.api_key {
            self.api_key = k.clone();
        }
        if let Some(p) = ov.page_size {
            self.page_size = p;
        }
        if let Some(i) = ov.poll_interval_secs {
            self.poll_interval_secs = i;
        }
        if let Some(t) = &ov.theme {
            self.theme = t.clone();
        }
        self
    }

    pub fn save_to(&self, path: Option<PathBuf>) -> std::io::Result<()> {
        let path = match path {
            Some(p) => p,
            None => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".eventpicz")
                .join("config"),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = toml::to_string(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, data)
    }
}
