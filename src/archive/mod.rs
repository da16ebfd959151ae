//! GOB / GOO container reader.
//!
//! Binary layout:
//! ```text
//! [4 bytes]   magic "GOB "
//! [4 bytes]   version (0x14)
//! [4 bytes]   index offset (0x0C, where the entry count lives)
//! [4 bytes]   entry count
//! [count × 136 bytes]  Table of contents:
//!     offset(4): absolute file offset of the payload
//!     length(4): payload size
//!     path(128): NUL-padded, single-byte encoded, backslash separated
//! ```
//!
//! The first record's (offset, length) pair occupies bytes 16..24, so the
//! fixed header plus that pair reads as a 24-byte block and every path string
//! starts at `24 + i * 136`.

use std::io::Cursor;
use std::path::Path;

use binrw::BinRead;
use serde::Serialize;

use crate::error::{DecodeError, DecodeResult};
use crate::text::decode_latin1;

pub const GOB_MAGIC: &[u8; 4] = b"GOB ";
pub const GOB_HEADER_SIZE: usize = 16;
pub const GOB_RECORD_SIZE: usize = 136;
pub const GOB_PATH_LEN: usize = 128;

#[derive(BinRead, Debug, Clone, Copy)]
#[br(little)]
pub struct ArchiveHeader {
    pub magic: [u8; 4],
    pub version: u32,
    pub index_offset: u32,
    pub entry_count: u32,
}

#[derive(BinRead, Debug)]
#[br(little)]
struct TocRecord {
    offset: u32,
    length: u32,
    #[br(map = |raw: [u8; GOB_PATH_LEN]| {
        let end = raw.iter().position(|&b| b == 0).unwrap_or(GOB_PATH_LEN);
        decode_latin1(&raw[..end])
    })]
    path: String,
}

/// One named payload inside the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
    /// Full legacy path, e.g. `3do\kyle.3do`
    pub logical_path: String,
    pub offset: u32,
    pub length: u32,
}

impl ArchiveEntry {
    /// Final path component of the logical path.
    pub fn file_name(&self) -> &str {
        file_name(&self.logical_path)
    }
}

/// Strip any directory prefix (legacy backslash or forward slash).
pub fn file_name(path: &str) -> &str {
    path.rsplit(['\\', '/']).next().unwrap_or(path)
}

/// An opened container: the raw bytes plus the decoded table of contents.
#[derive(Debug)]
pub struct Archive {
    data: Vec<u8>,
    header: ArchiveHeader,
    entries: Vec<ArchiveEntry>,
}

impl Archive {
    /// Decode the table of contents of an in-memory container.
    pub fn open(data: Vec<u8>) -> DecodeResult<Self> {
        if data.len() < GOB_HEADER_SIZE {
            return Err(DecodeError::corrupt_archive(format!(
                "{} bytes is smaller than the {}-byte header",
                data.len(),
                GOB_HEADER_SIZE
            )));
        }

        let mut cursor = Cursor::new(data.as_slice());
        let header = ArchiveHeader::read(&mut cursor)
            .map_err(|e| DecodeError::corrupt_archive(format!("header: {e}")))?;

        if &header.magic != GOB_MAGIC {
            tracing::debug!(magic = ?header.magic, "unexpected archive magic");
        }

        let count = header.entry_count as usize;
        let toc_end = count
            .checked_mul(GOB_RECORD_SIZE)
            .and_then(|n| n.checked_add(GOB_HEADER_SIZE))
            .ok_or_else(|| DecodeError::corrupt_archive("entry count overflows"))?;
        if toc_end > data.len() {
            return Err(DecodeError::corrupt_archive(format!(
                "header declares {count} entries ({toc_end} bytes of index) but archive is {} bytes",
                data.len()
            )));
        }

        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            let record = TocRecord::read(&mut cursor)
                .map_err(|e| DecodeError::corrupt_archive(format!("record {i}: {e}")))?;

            let end = record.offset as u64 + record.length as u64;
            if end > data.len() as u64 {
                return Err(DecodeError::corrupt_archive(format!(
                    "entry '{}' spans {}..{} past end of archive ({} bytes)",
                    record.path,
                    record.offset,
                    end,
                    data.len()
                )));
            }

            entries.push(ArchiveEntry {
                logical_path: record.path,
                offset: record.offset,
                length: record.length,
            });
        }

        tracing::debug!(entries = entries.len(), "opened archive");

        Ok(Self {
            data,
            header,
            entries,
        })
    }

    /// Read a container from disk and decode its table of contents.
    pub fn open_file(path: &Path) -> DecodeResult<Self> {
        let data = std::fs::read(path)?;
        Self::open(data)
    }

    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// (full path, size) pairs in table-of-contents order.
    pub fn list_entries(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.entries
            .iter()
            .map(|e| (e.logical_path.as_str(), e.length))
    }

    /// Entries whose file name ends with `.ext` (case-insensitive), e.g. all `.jkl` levels.
    pub fn entries_with_extension<'a>(
        &'a self,
        ext: &'a str,
    ) -> impl Iterator<Item = &'a ArchiveEntry> + 'a {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        self.entries.iter().filter(move |e| {
            e.file_name()
                .rsplit_once('.')
                .is_some_and(|(_, found)| found.to_ascii_lowercase() == ext)
        })
    }

    /// Find an entry by file name; any directory prefix on either side is ignored.
    pub fn find(&self, path: &str) -> Option<&ArchiveEntry> {
        let wanted = file_name(path);
        self.entries.iter().find(|e| e.file_name() == wanted)
    }

    /// Find an entry by its exact full path.
    pub fn find_full_path(&self, path: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|e| e.logical_path == path)
    }

    /// Payload of the entry whose file name matches `path` (case-sensitive).
    pub fn extract(&self, path: &str) -> DecodeResult<&[u8]> {
        let entry = self.find(path).ok_or_else(|| DecodeError::EntryNotFound {
            path: path.to_string(),
        })?;
        Ok(self.slice(entry))
    }

    /// Payload of the entry whose full path matches `path` exactly.
    pub fn extract_full_path(&self, path: &str) -> DecodeResult<&[u8]> {
        let entry = self
            .find_full_path(path)
            .ok_or_else(|| DecodeError::EntryNotFound {
                path: path.to_string(),
            })?;
        Ok(self.slice(entry))
    }

    fn slice(&self, entry: &ArchiveEntry) -> &[u8] {
        // Bounds were validated in `open`.
        let start = entry.offset as usize;
        &self.data[start..start + entry.length as usize]
    }
}
