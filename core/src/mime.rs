//! Multipart/form-data builder.
//!
//! Parts are recorded when the caller adds them and rendered by the
//! transport when the transfer starts. File parts are read at that point,
//! not when they are added, so a file may still be written between
//! `add_file` and `send`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{Error, Result};

/// Content of a single form part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartContent {
    Data(String),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimePart {
    pub name: String,
    pub content: PartContent,
}

/// Ordered list of form parts making up a multipart body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MimeForm {
    parts: Vec<MimePart>,
}

impl MimeForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_field(&mut self, name: &str, value: &str) -> Result<()> {
        check_part_name(name)?;
        self.parts.push(MimePart {
            name: name.to_string(),
            content: PartContent::Data(value.to_string()),
        });
        Ok(())
    }

    pub fn add_file(&mut self, name: &str, path: impl AsRef<Path>) -> Result<()> {
        check_part_name(name)?;
        let path = path.as_ref();
        fs::metadata(path).map_err(|e| {
            Error::Mime(format!("cannot access file part {}: {e}", path.display()))
        })?;
        self.parts.push(MimePart {
            name: name.to_string(),
            content: PartContent::File(path.to_path_buf()),
        });
        Ok(())
    }

    pub fn parts(&self) -> &[MimePart] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// `Content-Type` header value for a body encoded with `boundary`.
    pub fn content_type(boundary: &str) -> String {
        format!("multipart/form-data; boundary={boundary}")
    }

    /// Render the form body. Fails if a file part can no longer be read.
    pub fn encode(&self, boundary: &str) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        for part in &self.parts {
            out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            match &part.content {
                PartContent::Data(value) => {
                    out.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                            part.name
                        )
                        .as_bytes(),
                    );
                    out.extend_from_slice(value.as_bytes());
                }
                PartContent::File(path) => {
                    let filename = path
                        .file_name()
                        .map(|f| f.to_string_lossy().replace('"', "%22"))
                        .unwrap_or_default();
                    out.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{filename}\"\r\n\
                             Content-Type: application/octet-stream\r\n\r\n",
                            part.name
                        )
                        .as_bytes(),
                    );
                    out.extend_from_slice(&fs::read(path)?);
                }
            }
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        Ok(out)
    }
}

/// Fresh random boundary for one encoded body.
pub fn new_boundary() -> String {
    format!("------------------------{}", Uuid::new_v4().simple())
}

fn check_part_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Mime("form part name is empty".to_string()));
    }
    if name.contains(['"', '\r', '\n']) {
        return Err(Error::Mime(format!("invalid form part name: {name:?}")));
    }
    Ok(())
}
