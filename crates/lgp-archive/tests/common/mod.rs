//! In-memory LGP archive builder for tests.
//!
//! Lays archives out the way the game's packer does: header, TOC, optional
//! lookup prefix and conflict table, then data records. Files sharing a name
//! are put into a conflict group automatically.

#![allow(dead_code)]

use std::collections::HashMap;

pub const TYPICAL_LOOKUP_PREFIX: usize = 3600;

struct PendingFile {
    subdirectory: String,
    name: String,
    payload: Vec<u8>,
}

pub struct ArchiveBuilder {
    creator: [u8; 12],
    files: Vec<PendingFile>,
    reverse_toc: bool,
    lookup_prefix: usize,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self {
            creator: *b"\0\0SQUARESOFT",
            files: Vec::new(),
            reverse_toc: false,
            lookup_prefix: TYPICAL_LOOKUP_PREFIX,
        }
    }

    pub fn creator(mut self, tag: &[u8; 12]) -> Self {
        self.creator = *tag;
        self
    }

    pub fn file(self, name: &str, payload: &[u8]) -> Self {
        self.file_in("", name, payload)
    }

    pub fn file_in(mut self, subdirectory: &str, name: &str, payload: &[u8]) -> Self {
        self.files.push(PendingFile {
            subdirectory: subdirectory.to_string(),
            name: name.to_string(),
            payload: payload.to_vec(),
        });
        self
    }

    /// List files in the TOC in the reverse of their data order.
    pub fn reverse_toc(mut self) -> Self {
        self.reverse_toc = true;
        self
    }

    /// Size of the opaque region in front of the conflict table.
    pub fn lookup_prefix(mut self, len: usize) -> Self {
        self.lookup_prefix = len;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let count = self.files.len();

        // toc_order[position] = file index
        let mut toc_order: Vec<usize> = (0..count).collect();
        if self.reverse_toc {
            toc_order.reverse();
        }
        let mut toc_position = vec![0usize; count];
        for (position, &file) in toc_order.iter().enumerate() {
            toc_position[file] = position;
        }

        // Group files sharing a name, in order of first appearance.
        let mut by_name: HashMap<&str, usize> = HashMap::new();
        let mut buckets: Vec<Vec<usize>> = Vec::new();
        for (i, file) in self.files.iter().enumerate() {
            let slot = *by_name.entry(file.name.as_str()).or_insert_with(|| {
                buckets.push(Vec::new());
                buckets.len() - 1
            });
            buckets[slot].push(i);
        }
        let groups: Vec<Vec<usize>> = buckets.into_iter().filter(|b| b.len() > 1).collect();

        let mut conflict_of = vec![0u16; count];
        for (g, group) in groups.iter().enumerate() {
            for &file in group {
                conflict_of[file] = (g + 1) as u16;
            }
        }

        let mut region = Vec::new();
        if !groups.is_empty() {
            region.resize(self.lookup_prefix, 0);
            region.extend_from_slice(&(groups.len() as u16).to_le_bytes());
            for group in &groups {
                region.extend_from_slice(&(group.len() as u16).to_le_bytes());
                for &file in group {
                    region.extend(padded(&self.files[file].subdirectory, 128));
                    region.extend_from_slice(&(toc_position[file] as u16).to_le_bytes());
                }
            }
        }

        let data_start = 16 + count * 27 + region.len();
        let mut offsets = Vec::with_capacity(count);
        let mut records = Vec::new();
        for file in &self.files {
            offsets.push((data_start + records.len()) as u32);
            records.extend(padded(&file.name, 20));
            records.extend_from_slice(&(file.payload.len() as u32).to_le_bytes());
            records.extend_from_slice(&file.payload);
        }

        let mut out = Vec::with_capacity(data_start + records.len());
        out.extend_from_slice(&self.creator);
        out.extend_from_slice(&(count as u32).to_le_bytes());
        for &file in &toc_order {
            out.extend(padded(&self.files[file].name, 20));
            out.extend_from_slice(&offsets[file].to_le_bytes());
            out.push(14);
            out.extend_from_slice(&conflict_of[file].to_le_bytes());
        }
        out.extend(region);
        out.extend(records);
        out
    }
}

/// `text` as a NUL-padded field of `len` bytes.
pub fn padded(text: &str, len: usize) -> Vec<u8> {
    let mut field = text.as_bytes().to_vec();
    field.resize(len, 0);
    field
}
