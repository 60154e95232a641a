//! Tagged-section feature container.
//!
//! A container file is a magic header followed by a flat sequence of records,
//! each `[tag_len u8][tag][body_len varint][body]`. Sections are replaced by
//! appending a new record under the same tag; readers resolve a tag to the
//! last record carrying it. This gives cheap append/replace semantics without
//! rewriting the file, at the cost of dead space after a replace.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use geodex_common::{Result, error::Error, verify_arg};

use crate::varint;

const CONTAINER_MAGIC: &[u8; 4] = b"GDXC";

/// Section tag under which the serialized feature collection is stored.
pub const FEATURES_TAG: &str = "dat";

/// Section tag under which the built search index is stored.
pub const SEARCH_INDEX_TAG: &str = "sdx";

#[derive(Debug, Clone)]
struct SectionEntry {
    tag: String,
    offset: u64,
    len: u64,
}

/// An open container with its section directory resolved.
///
/// The directory is rebuilt on open by scanning record frames; the file
/// itself is reopened per operation so that a long-lived `Container` never
/// pins a read handle across an append.
#[derive(Debug)]
pub struct Container {
    path: PathBuf,
    sections: Vec<SectionEntry>,
}

impl Container {
    /// Creates an empty container file at `path`, truncating any existing one.
    pub fn create(path: impl AsRef<Path>) -> Result<Container> {
        let path = path.as_ref();
        let mut file = File::create(path)
            .map_err(|e| Error::io(format!("create container {}", path.display()), e))?;
        file.write_all(CONTAINER_MAGIC)
            .map_err(|e| Error::io("container magic", e))?;
        Ok(Container {
            path: path.to_path_buf(),
            sections: Vec::new(),
        })
    }

    /// Opens an existing container and scans its section directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Container> {
        let path = path.as_ref();
        let mut file = File::open(path)
            .map_err(|e| Error::io(format!("open container {}", path.display()), e))?;
        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)
            .map_err(|e| Error::io("container magic", e))?;
        if &magic != CONTAINER_MAGIC {
            return Err(Error::invalid_format(
                path.display().to_string(),
                "not a geodex container",
            ));
        }

        let file_len = file
            .metadata()
            .map_err(|e| Error::io("container metadata", e))?
            .len();
        let mut sections = Vec::new();
        let mut pos = CONTAINER_MAGIC.len() as u64;
        while pos < file_len {
            file.seek(SeekFrom::Start(pos))
                .map_err(|e| Error::io("container seek", e))?;
            let mut tag_len = [0u8; 1];
            file.read_exact(&mut tag_len)
                .map_err(|e| Error::io("container record", e))?;
            let mut tag = vec![0u8; tag_len[0] as usize];
            file.read_exact(&mut tag)
                .map_err(|e| Error::io("container record", e))?;
            let tag = String::from_utf8(tag)
                .map_err(|_| Error::invalid_format("container", "section tag is not UTF-8"))?;
            let body_len = varint::read_u64(&mut file)?;
            let body_offset = file
                .stream_position()
                .map_err(|e| Error::io("container seek", e))?;
            // body_len is untrusted file data; the sum may wrap.
            let body_end = body_offset
                .checked_add(body_len)
                .filter(|&end| end <= file_len)
                .ok_or_else(|| {
                    Error::invalid_format(
                        "container",
                        format!("section '{tag}' body extends past end of file"),
                    )
                })?;
            sections.push(SectionEntry {
                tag,
                offset: body_offset,
                len: body_len,
            });
            pos = body_end;
        }

        Ok(Container {
            path: path.to_path_buf(),
            sections,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn resolve(&self, tag: &str) -> Option<&SectionEntry> {
        // Last record wins: replaced sections stay in the file as dead space.
        self.sections.iter().rev().find(|s| s.tag == tag)
    }

    /// Whether a section with the given tag is present.
    pub fn section_exists(&self, tag: &str) -> bool {
        self.resolve(tag).is_some()
    }

    /// Reads the current body of the section with the given tag.
    pub fn read_section(&self, tag: &str) -> Result<Vec<u8>> {
        let entry = self.resolve(tag).ok_or_else(|| {
            Error::invalid_arg("tag", format!("section '{tag}' not found in container"))
        })?;
        let mut file = File::open(&self.path)
            .map_err(|e| Error::io(format!("open container {}", self.path.display()), e))?;
        file.seek(SeekFrom::Start(entry.offset))
            .map_err(|e| Error::io("container seek", e))?;
        let mut body = vec![0u8; entry.len as usize];
        file.read_exact(&mut body)
            .map_err(|e| Error::io(format!("read section '{tag}'"), e))?;
        Ok(body)
    }

    /// Appends a section record, replacing any earlier record with this tag
    /// from the readers' point of view.
    pub fn append_section(&mut self, tag: &str, body: &[u8]) -> Result<()> {
        verify_arg!(tag, !tag.is_empty() && tag.len() <= u8::MAX as usize);
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::io(format!("append to container {}", self.path.display()), e))?;
        file.write_all(&[tag.len() as u8])
            .map_err(|e| Error::io("container record", e))?;
        file.write_all(tag.as_bytes())
            .map_err(|e| Error::io("container record", e))?;
        varint::write_u64(&mut file, body.len() as u64)?;
        file.write_all(body)
            .map_err(|e| Error::io(format!("write section '{tag}'"), e))?;
        file.flush().map_err(|e| Error::io("container flush", e))?;

        let body_offset = file
            .stream_position()
            .map_err(|e| Error::io("container seek", e))?
            - body.len() as u64;
        self.sections.push(SectionEntry {
            tag: tag.to_string(),
            offset: body_offset,
            len: body.len() as u64,
        });
        Ok(())
    }
}
