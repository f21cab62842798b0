use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AltidConfig {
    pub backend: BackendConfig,
    pub camera: CameraConfig,
    pub workflow: WorkflowConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BackendConfig {
    /// Base URL of the verification backend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Overall timeout for a single request, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Timeout for establishing a connection, in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CameraConfig {
    /// Camera device index (e.g., 0 for /dev/video0)
    #[serde(default = "default_camera_index")]
    pub index: u32,

    /// Requested stream resolution (width, height)
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Requested stream frames per second
    #[serde(default = "default_camera_fps")]
    pub fps: u32,

    /// Rate at which frames are pushed to the preview sink
    #[serde(default = "default_preview_fps")]
    pub preview_fps: u32,

    /// JPEG quality used when rasterizing uncompressed frames (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WorkflowConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Log every published workflow event at debug level
    #[serde(default = "default_debug_events")]
    pub debug_events: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Emit every surfaced failure on the `altid::failures` target
    #[serde(default = "default_log_failed_attempts")]
    pub log_failed_attempts: bool,

    /// File receiving the failure audit log
    #[serde(default = "default_failure_log")]
    pub failure_log: String,
}

impl AltidConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("altid.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("backend.base_url", default_base_url())?
            .set_default("backend.request_timeout_seconds", default_request_timeout())?
            .set_default("backend.connect_timeout_seconds", default_connect_timeout())?
            .set_default("camera.index", default_camera_index())?
            .set_default(
                "camera.resolution",
                vec![default_camera_resolution().0, default_camera_resolution().1],
            )?
            .set_default("camera.fps", default_camera_fps())?
            .set_default("camera.preview_fps", default_preview_fps())?
            .set_default("camera.jpeg_quality", default_jpeg_quality() as u64)?
            .set_default(
                "workflow.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .set_default("workflow.debug_events", default_debug_events())?
            .set_default("logging.log_failed_attempts", default_log_failed_attempts())?
            .set_default("logging.failure_log", default_failure_log())?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables, e.g. ALTID__BACKEND__BASE_URL
            .add_source(Environment::with_prefix("ALTID").prefix_separator("__").separator("__"))
            .build()?;

        let config: AltidConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = url::Url::parse(&self.backend.base_url).map_err(|e| {
            ConfigError::Message(format!(
                "Backend base_url '{}' is not a valid URL: {}",
                self.backend.base_url, e
            ))
        })?;

        if !matches!(base.scheme(), "http" | "https") {
            return Err(ConfigError::Message(format!(
                "Backend base_url must use http or https, got '{}'",
                base.scheme()
            )));
        }

        if self.backend.request_timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "Backend request_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.backend.connect_timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "Backend connect_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.fps == 0 || self.camera.preview_fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps and preview_fps must be greater than 0".to_string(),
            ));
        }

        if !(1..=100).contains(&self.camera.jpeg_quality) {
            return Err(ConfigError::Message(
                "Camera jpeg_quality must be between 1 and 100".to_string(),
            ));
        }

        if self.workflow.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        if self.logging.log_failed_attempts && self.logging.failure_log.trim().is_empty() {
            return Err(ConfigError::Message(
                "Logging failure_log must be set when log_failed_attempts is enabled".to_string(),
            ));
        }

        Ok(())
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_seconds: default_request_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: default_camera_index(),
            resolution: default_camera_resolution(),
            fps: default_camera_fps(),
            preview_fps: default_preview_fps(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

impl Default for AltidConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            camera: CameraConfig::default(),
            workflow: WorkflowConfig {
                event_bus_capacity: default_event_bus_capacity(),
                debug_events: default_debug_events(),
            },
            logging: LoggingConfig {
                log_failed_attempts: default_log_failed_attempts(),
                failure_log: default_failure_log(),
            },
        }
    }
}

// Default value functions
fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}
fn default_request_timeout() -> u64 {
    30
}
fn default_connect_timeout() -> u64 {
    5
}

fn default_camera_index() -> u32 {
    0
}
fn default_camera_resolution() -> (u32, u32) {
    (1280, 720)
}
fn default_camera_fps() -> u32 {
    30
}
fn default_preview_fps() -> u32 {
    10
}
fn default_jpeg_quality() -> u8 {
    90
}

fn default_event_bus_capacity() -> usize {
    64
}
fn default_debug_events() -> bool {
    false
}

fn default_log_failed_attempts() -> bool {
    true
}
fn default_failure_log() -> String {
    "verification_failures.log".to_string()
}
