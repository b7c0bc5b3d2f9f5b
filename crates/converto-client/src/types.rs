//! Request and response types for the Converto backend API.
//!
//! Field names follow the backend's wire format: auth and task records use
//! PascalCase, processing requests use snake_case.

use std::fmt;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Health
// ─────────────────────────────────────────────────────────────────────────────

/// Health check response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth
// ─────────────────────────────────────────────────────────────────────────────

/// Email/password login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Account creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Account returned after sign-up.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegisteredUser {
    #[serde(rename = "UserID")]
    pub user_id: i64,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Response from `auth/check-email/{email}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CheckEmailResponse {
    pub exists: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// User
// ─────────────────────────────────────────────────────────────────────────────

/// Per-account settings stored by the backend. Unset fields are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserPreferences {
    #[serde(default)]
    pub default_output_folder: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Processing
// ─────────────────────────────────────────────────────────────────────────────

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "tiff", "bmp"];
const MEDIA_EXTENSIONS: &[&str] = &[
    "mp4", "webm", "mov", "avi", "mkv", "mp3", "wav", "flac", "aac", "ogg", "m4a",
];

/// Backend converter family, chosen from the input file type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConvertCategory {
    Image,
    VideoAudio,
    /// Office documents; the backend renders them to PDF-family formats.
    Pdf,
}

impl ConvertCategory {
    /// Category for an input path, by extension. Unknown types go to `Pdf`.
    pub fn for_input(path: &str) -> Self {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Self::Image
        } else if MEDIA_EXTENSIONS.contains(&ext.as_str()) {
            Self::VideoAudio
        } else {
            Self::Pdf
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::VideoAudio => "video_audio",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ConvertCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file to convert and the format it should become.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertJob {
    /// Path as the backend sees it.
    pub input_path: String,
    /// Target extension, with or without the leading dot.
    pub output_format: String,
}

impl ConvertJob {
    pub fn new(input_path: impl Into<String>, output_format: impl Into<String>) -> Self {
        Self {
            input_path: input_path.into(),
            output_format: output_format.into(),
        }
    }

    /// Lowercased target format without a leading dot.
    pub fn normalized_format(&self) -> String {
        self.output_format.trim_start_matches('.').to_ascii_lowercase()
    }

    pub fn category(&self) -> ConvertCategory {
        ConvertCategory::for_input(&self.input_path)
    }
}

/// Body of `convert_to/{category}`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ConvertRequest {
    pub input_paths: Vec<String>,
    pub output_format: String,
}

/// Body of `compress/image`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ImageCompressRequest<'a> {
    pub input_paths: &'a [String],
    pub quality: u8,
}

/// Body of `compress/audio`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct AudioCompressRequest<'a> {
    pub input_paths: &'a [String],
    pub bitrate: &'a str,
}

/// Body of `compress/video`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct VideoCompressRequest<'a> {
    pub input_paths: &'a [String],
    pub quality: &'a str,
}

/// Body of `remove_background`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct PathsRequest<'a> {
    pub input_paths: &'a [String],
}

/// Default image quality (percent).
pub const DEFAULT_IMAGE_QUALITY: u8 = 70;
/// Default audio bitrate.
pub const DEFAULT_AUDIO_BITRATE: &str = "64k";
/// Default video quality preset.
pub const DEFAULT_VIDEO_QUALITY: &str = "low";

/// A binary result from the backend.
#[derive(Clone, PartialEq, Eq)]
pub struct Download {
    /// File name from `Content-Disposition`, if the backend sent one.
    pub file_name: Option<String>,
    pub data: Vec<u8>,
}

impl Download {
    /// Whether the data is a zip holding several results.
    pub fn is_zip(&self) -> bool {
        converto_archive::is_zip_signature(&self.data)
    }
}

impl fmt::Debug for Download {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Download")
            .field("file_name", &self.file_name)
            .field("len", &self.data.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tasks
// ─────────────────────────────────────────────────────────────────────────────

/// Which backend service ran a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ServiceType {
    Conversion,
    Compression,
    BackgroundRemoval,
    Other(i32),
}

impl ServiceType {
    pub fn from_id(id: i32) -> Self {
        match id {
            1 => Self::Conversion,
            2 => Self::Compression,
            3 => Self::BackgroundRemoval,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conversion => write!(f, "Conversion"),
            Self::Compression => write!(f, "Compression"),
            Self::BackgroundRemoval => write!(f, "Background Removal"),
            Self::Other(id) => write!(f, "Service {}", id),
        }
    }
}

/// One processing task from `task/task_by_user`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskRecord {
    #[serde(rename = "ServiceTypeID")]
    pub service_type_id: i32,
    pub original_file_size: i64,
    #[serde(default)]
    pub original_file_path: Option<String>,
    #[serde(default)]
    pub output_file_size: Option<i64>,
    #[serde(default)]
    pub output_file_path: Option<String>,
    /// Whether the task succeeded.
    pub task_status: bool,
    /// Processing time in seconds.
    pub task_time: f64,
    pub created_at: NaiveDateTime,
}

impl TaskRecord {
    pub fn service(&self) -> ServiceType {
        ServiceType::from_id(self.service_type_id)
    }

    /// Bytes saved by a successful task; zero when the output grew or is unknown.
    pub fn bytes_saved(&self) -> u64 {
        match self.output_file_size {
            Some(out) if self.task_status => {
                self.original_file_size.saturating_sub(out).max(0) as u64
            }
            _ => 0,
        }
    }
}

/// Dashboard aggregate over a user's tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskOverview {
    pub total_tasks: usize,
    pub succeeded: usize,
    /// Tasks per service, ordered by service.
    pub per_service: Vec<(ServiceType, usize)>,
    pub bytes_saved: u64,
    /// Mean processing time in seconds, zero with no tasks.
    pub avg_processing_secs: f64,
}

impl TaskOverview {
    pub fn from_records(records: &[TaskRecord]) -> Self {
        let mut per_service: Vec<(ServiceType, usize)> = Vec::new();
        for record in records {
            let service = record.service();
            match per_service.iter_mut().find(|(s, _)| *s == service) {
                Some((_, count)) => *count += 1,
                None => per_service.push((service, 1)),
            }
        }
        per_service.sort_by_key(|(s, _)| *s);

        let total_time: f64 = records.iter().map(|r| r.task_time).sum();
        Self {
            total_tasks: records.len(),
            succeeded: records.iter().filter(|r| r.task_status).count(),
            per_service,
            bytes_saved: records
                .iter()
                .map(TaskRecord::bytes_saved)
                .fold(0, u64::saturating_add),
            avg_processing_secs: if records.is_empty() {
                0.0
            } else {
                total_time / records.len() as f64
            },
        }
    }

    /// Success rate in percent, zero with no tasks.
    pub fn success_rate(&self) -> f64 {
        if self.total_tasks == 0 {
            0.0
        } else {
            self.succeeded as f64 * 100.0 / self.total_tasks as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(service: i32, status: bool, original: i64, output: Option<i64>, time: f64) -> TaskRecord {
        TaskRecord {
            service_type_id: service,
            original_file_size: original,
            original_file_path: None,
            output_file_size: output,
            output_file_path: None,
            task_status: status,
            task_time: time,
            created_at: NaiveDateTime::default(),
        }
    }

    #[test]
    fn test_category_for_input() {
        assert_eq!(ConvertCategory::for_input("/a/photo.JPG"), ConvertCategory::Image);
        assert_eq!(ConvertCategory::for_input("clip.mkv"), ConvertCategory::VideoAudio);
        assert_eq!(ConvertCategory::for_input("song.m4a"), ConvertCategory::VideoAudio);
        assert_eq!(ConvertCategory::for_input("report.docx"), ConvertCategory::Pdf);
        assert_eq!(ConvertCategory::for_input("no_extension"), ConvertCategory::Pdf);
        assert_eq!(ConvertCategory::VideoAudio.to_string(), "video_audio");
    }

    #[test]
    fn test_job_normalized_format() {
        assert_eq!(ConvertJob::new("a.png", ".WEBP").normalized_format(), "webp");
        assert_eq!(ConvertJob::new("a.png", "jpg").normalized_format(), "jpg");
    }

    #[test]
    fn test_task_record_wire_format() {
        let json = r#"{
            "ServiceTypeID": 2,
            "OriginalFileSize": 1000,
            "OriginalFilePath": "/in/a.png",
            "OutputFileSize": 400,
            "OutputFilePath": "/out/a.png",
            "TaskStatus": true,
            "TaskTime": 1.5,
            "CreatedAt": "2025-11-03T10:15:00"
        }"#;
        let record: TaskRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.service(), ServiceType::Compression);
        assert_eq!(record.bytes_saved(), 600);
        assert_eq!(record.created_at.to_string(), "2025-11-03 10:15:00");
    }

    #[test]
    fn test_bytes_saved_edge_cases() {
        assert_eq!(record(1, false, 1000, Some(10), 0.0).bytes_saved(), 0);
        assert_eq!(record(1, true, 100, Some(300), 0.0).bytes_saved(), 0);
        assert_eq!(record(1, true, 100, None, 0.0).bytes_saved(), 0);
        // Garbled sizes from the server must not overflow.
        assert_eq!(record(1, true, i64::MIN, Some(1), 0.0).bytes_saved(), 0);
        assert_eq!(
            record(1, true, i64::MAX, Some(-1), 0.0).bytes_saved(),
            i64::MAX as u64
        );
        let overview = TaskOverview::from_records(&[
            record(1, true, i64::MAX, Some(-1), 0.0),
            record(1, true, i64::MAX, Some(-1), 0.0),
            record(1, true, i64::MAX, Some(-1), 0.0),
        ]);
        assert_eq!(overview.bytes_saved, u64::MAX);
    }

    #[test]
    fn test_overview() {
        let records = vec![
            record(2, true, 1000, Some(400), 2.0),
            record(1, true, 500, Some(500), 1.0),
            record(2, false, 800, None, 3.0),
            record(3, true, 300, Some(100), 2.0),
        ];
        let overview = TaskOverview::from_records(&records);
        assert_eq!(overview.total_tasks, 4);
        assert_eq!(overview.succeeded, 3);
        assert_eq!(overview.success_rate(), 75.0);
        assert_eq!(overview.bytes_saved, 800);
        assert_eq!(overview.avg_processing_secs, 2.0);
        assert_eq!(
            overview.per_service,
            vec![
                (ServiceType::Conversion, 1),
                (ServiceType::Compression, 2),
                (ServiceType::BackgroundRemoval, 1),
            ]
        );
    }

    #[test]
    fn test_overview_empty() {
        let overview = TaskOverview::from_records(&[]);
        assert_eq!(overview.total_tasks, 0);
        assert_eq!(overview.success_rate(), 0.0);
        assert_eq!(overview.avg_processing_secs, 0.0);
    }

    #[test]
    fn test_login_request_wire_format() {
        let body = serde_json::to_value(LoginRequest {
            email: "a@b.c".into(),
            password: "pw".into(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"Email": "a@b.c", "Password": "pw"}));
    }
}
