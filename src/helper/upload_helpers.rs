use actix_multipart::{Multipart, MultipartError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures_util::StreamExt;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::models::FileType;

pub const MAX_COVER_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const MAX_MEDIA_BYTES: usize = 50 * 1024 * 1024;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a", "aac", "flac", "wma", "opus"];
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "webm", "mov", "avi", "mkv", "flv", "wmv", "m4v", "mpeg", "mpg", "3gp",
];

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Upload error: {0}")]
    Multipart(#[from] MultipartError),
    #[error("File is too large. Maximum size is {0}MB.")]
    TooLarge(usize),
    #[error("Please upload an image file")]
    NotAnImage,
    #[error("Unsupported file type: '{0}'. Please upload an audio or video file.")]
    UnsupportedMedia(String),
    #[error("Invalid UTF-8 in form field.")]
    InvalidUtf8,
    #[error("No file was uploaded.")]
    NoFile,
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Text fields plus at most one file from a multipart body.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

impl MultipartForm {
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }
}

/// Drains the payload. Any part with a filename is the file; the rest are text fields.
pub async fn read_multipart(mut payload: Multipart, max_file_bytes: usize) -> Result<MultipartForm, UploadError> {
    let mut form = MultipartForm::default();

    while let Some(item) = payload.next().await {
        let mut field = item?;
        let disposition = field.content_disposition();
        let name = disposition.get_name().unwrap_or_default().to_string();
        let file_name = disposition.get_filename().map(str::to_string);
        let content_type = field.content_type().map(|mime| mime.to_string());

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            data.extend_from_slice(&chunk);
            if file_name.is_some() && data.len() > max_file_bytes {
                return Err(UploadError::TooLarge(max_file_bytes / (1024 * 1024)));
            }
        }

        match file_name {
            // Browsers send an empty file part when nothing was picked.
            Some(file_name) if !file_name.is_empty() && !data.is_empty() => {
                form.file = Some(UploadedFile { file_name, content_type, bytes: data });
            }
            Some(_) => {}
            None => {
                let value = String::from_utf8(data).map_err(|_| UploadError::InvalidUtf8)?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}

pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// "2.30 MB"
pub fn format_megabytes(bytes: usize) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

/// Cover images stay inline in the post as a data URL.
pub fn cover_image_data_url(file: &UploadedFile) -> Result<String, UploadError> {
    let mime = file.content_type.as_deref().unwrap_or_default();
    if !mime.starts_with("image/") {
        return Err(UploadError::NotAnImage);
    }
    if file.bytes.len() > MAX_COVER_IMAGE_BYTES {
        return Err(UploadError::TooLarge(MAX_COVER_IMAGE_BYTES / (1024 * 1024)));
    }
    Ok(to_data_url(mime, &file.bytes))
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaUpload {
    pub data_url: String,
    pub file_type: FileType,
    pub file_size: String,
    pub file_name: String,
}

pub fn media_type_for(file_name: &str) -> Option<FileType> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)?;
    if AUDIO_EXTENSIONS.contains(&extension.as_str()) {
        Some(FileType::Audio)
    } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        Some(FileType::Video)
    } else {
        None
    }
}

/// Lecture audio/video, classified by extension.
pub fn lecture_media(file: &UploadedFile) -> Result<MediaUpload, UploadError> {
    let file_type = media_type_for(&file.file_name)
        .ok_or_else(|| UploadError::UnsupportedMedia(file.file_name.clone()))?;
    if file.bytes.len() > MAX_MEDIA_BYTES {
        return Err(UploadError::TooLarge(MAX_MEDIA_BYTES / (1024 * 1024)));
    }
    let mime = file
        .content_type
        .as_deref()
        .filter(|mime| !mime.is_empty())
        .unwrap_or("application/octet-stream");

    Ok(MediaUpload {
        data_url: to_data_url(mime, &file.bytes),
        file_type,
        file_size: format_megabytes(file.bytes.len()),
        file_name: file.file_name.clone(),
    })
}
