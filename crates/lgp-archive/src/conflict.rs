//! Conflict table parsing.
//!
//! Archives may hold several files with the same name in different
//! subdirectories. Each such TOC entry carries a nonzero, 1-based conflict
//! group number, and the conflict table lists, per group, which TOC position
//! lives in which subdirectory:
//!
//! ```text
//! u16 group_count
//! group_count x {
//!     u16 member_count
//!     member_count x { [u8; 128] subdirectory, u16 toc_index }
//! }
//! ```
//!
//! The table sits between the end of the TOC and the first data record,
//! behind a lookup table used by the game for random access. That lookup
//! table is skipped without being read; its length is whatever is left of
//! the region once the conflict table is accounted for.

use std::collections::HashMap;

use lgp_common::{text_field, ByteCursor};
use tracing::debug;

use crate::format::{RawConflictMember, TYPICAL_LOOKUP_PREFIX};
use crate::ConflictTableError;

/// One member of a conflict group.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ConflictEntry {
    /// Subdirectory, `/`-separated, without leading or trailing separators.
    pub subdirectory: String,
    /// TOC position of the entry stored in that subdirectory.
    pub toc_index: u16,
}

/// Parsed conflict table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictTable {
    groups: Vec<Vec<ConflictEntry>>,
    prefix_len: usize,
    table_len: usize,
    by_toc_index: HashMap<u16, String>,
}

impl ConflictTable {
    /// Parse the region between the end of the TOC and the first data record.
    ///
    /// The usual 3600-byte lookup prefix is tried first. Otherwise the
    /// shortest prefix whose non-empty table ends exactly at the region's end
    /// wins. That search is capped at [`SCAN_STEPS_PER_BYTE`] group and member
    /// reads per region byte.
    pub fn parse(region: &[u8]) -> Result<Self, ConflictTableError> {
        let budget = region
            .len()
            .saturating_mul(SCAN_STEPS_PER_BYTE)
            .max(MIN_SCAN_STEPS);
        Self::parse_with_budget(region, budget)
    }

    pub(crate) fn parse_with_budget(
        region: &[u8],
        budget: usize,
    ) -> Result<Self, ConflictTableError> {
        if region.len() < 2 {
            return Err(ConflictTableError::RegionTruncated {
                needed: 2,
                available: region.len(),
            });
        }

        // A single attempt is linear in the region, so it runs unmetered.
        let mut unmetered = usize::MAX;
        let typical_detail = match parse_at(region, TYPICAL_LOOKUP_PREFIX, &mut unmetered) {
            Ok(groups) => {
                debug!(prefix = TYPICAL_LOOKUP_PREFIX, "conflict table at usual offset");
                return Ok(Self::from_groups(groups, TYPICAL_LOOKUP_PREFIX, region.len()));
            }
            Err(Miss::NoFit(detail)) => detail,
            Err(Miss::OutOfSteps) => String::new(),
        };

        // Any region ending in two zero bytes "fits" an empty table, so only
        // non-empty tables are accepted away from the usual offset.
        let mut steps = budget;
        for prefix in 0..=region.len() - 2 {
            if prefix == TYPICAL_LOOKUP_PREFIX {
                continue;
            }
            match parse_at(region, prefix, &mut steps) {
                Ok(groups) if !groups.is_empty() => {
                    debug!(prefix, region = region.len(), "conflict table at derived offset");
                    return Ok(Self::from_groups(groups, prefix, region.len()));
                }
                Ok(_) | Err(Miss::NoFit(_)) => {}
                Err(Miss::OutOfSteps) => {
                    return Err(ConflictTableError::SearchExhausted {
                        region_len: region.len(),
                        steps: budget,
                    });
                }
            }
        }

        Err(ConflictTableError::NoExactFit {
            region_len: region.len(),
            typical_prefix: TYPICAL_LOOKUP_PREFIX,
            detail: typical_detail,
        })
    }

    fn from_groups(groups: Vec<Vec<ConflictEntry>>, prefix_len: usize, region_len: usize) -> Self {
        let mut by_toc_index = HashMap::new();
        for member in groups.iter().flatten() {
            by_toc_index.insert(member.toc_index, member.subdirectory.clone());
        }

        Self {
            groups,
            prefix_len,
            table_len: region_len - prefix_len,
            by_toc_index,
        }
    }

    /// Conflict groups in table order; group `n` is conflict index `n + 1`.
    #[inline]
    pub fn groups(&self) -> &[Vec<ConflictEntry>] {
        &self.groups
    }

    /// Length of the skipped lookup prefix.
    #[inline]
    pub fn prefix_len(&self) -> usize {
        self.prefix_len
    }

    /// Length of the conflict table proper.
    #[inline]
    pub fn table_len(&self) -> usize {
        self.table_len
    }

    /// Total number of members across all groups.
    pub fn len(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(Vec::is_empty)
    }

    /// Subdirectory recorded for a TOC index, from any group.
    ///
    /// When several members name the same TOC index, the last one in table
    /// order wins.
    pub fn get(&self, toc_index: u16) -> Option<&str> {
        self.by_toc_index.get(&toc_index).map(String::as_str)
    }

    /// Flat `toc_index -> subdirectory` map.
    pub fn subdirectories(&self) -> &HashMap<u16, String> {
        &self.by_toc_index
    }

    /// Resolve the subdirectory of the TOC entry at `toc_index` whose
    /// conflict group is `conflict_index`.
    ///
    /// Looks in the entry's own group first, then in the flat map by TOC
    /// position, then by the conflict index itself. Returns `None` for
    /// unique names and for conflicts the table does not cover.
    pub fn resolve(&self, conflict_index: u16, toc_index: usize) -> Option<&str> {
        if conflict_index == 0 {
            return None;
        }

        let position = u16::try_from(toc_index).ok();
        let in_group = self
            .groups
            .get(usize::from(conflict_index) - 1)
            .and_then(|group| {
                group
                    .iter()
                    .find(|m| Some(m.toc_index) == position)
                    .map(|m| m.subdirectory.as_str())
            });

        in_group
            .or_else(|| position.and_then(|p| self.get(p)))
            .or_else(|| self.get(conflict_index))
    }
}

/// Group and member reads allowed per region byte when searching for the prefix.
pub const SCAN_STEPS_PER_BYTE: usize = 4;

/// Floor for the search budget, so small regions are always searched fully.
const MIN_SCAN_STEPS: usize = 1 << 16;

enum Miss {
    NoFit(String),
    OutOfSteps,
}

/// Parse the table assuming a lookup prefix of `prefix` bytes.
///
/// Succeeds only if the table ends exactly at the end of `region`. Every
/// group and member read costs one of `steps`.
fn parse_at(
    region: &[u8],
    prefix: usize,
    steps: &mut usize,
) -> Result<Vec<Vec<ConflictEntry>>, Miss> {
    if prefix > region.len() {
        return Err(Miss::NoFit(format!("region is only {} bytes", region.len())));
    }

    let mut cursor = ByteCursor::new_at(region, prefix);
    let group_count = cursor.read_u16().map_err(|e| Miss::NoFit(e.to_string()))?;

    let mut groups = Vec::new();
    for _ in 0..group_count {
        spend(steps, 1)?;
        let member_count = cursor.read_u16().map_err(|e| Miss::NoFit(e.to_string()))?;
        let needed = usize::from(member_count) * RawConflictMember::SIZE;
        if needed > cursor.remaining() {
            return Err(Miss::NoFit(format!(
                "group declares {member_count} members ({needed} bytes), only {} available",
                cursor.remaining()
            )));
        }

        spend(steps, usize::from(member_count))?;
        let mut members = Vec::with_capacity(usize::from(member_count));
        for _ in 0..member_count {
            let raw: RawConflictMember = cursor
                .read_struct()
                .map_err(|e| Miss::NoFit(e.to_string()))?;
            members.push(ConflictEntry {
                subdirectory: normalize_subdirectory(&raw.subdirectory),
                toc_index: raw.toc_index.get(),
            });
        }
        groups.push(members);
    }

    if !cursor.is_empty() {
        return Err(Miss::NoFit(format!(
            "table ends {} bytes before the first file",
            cursor.remaining()
        )));
    }

    Ok(groups)
}

#[inline]
fn spend(steps: &mut usize, cost: usize) -> Result<(), Miss> {
    *steps = steps.checked_sub(cost).ok_or(Miss::OutOfSteps)?;
    Ok(())
}

fn normalize_subdirectory(field: &[u8]) -> String {
    text_field(field)
        .replace('\\', "/")
        .trim_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(subdir: &str, toc_index: u16) -> Vec<u8> {
        let mut bytes = vec![0u8; 130];
        bytes[..subdir.len()].copy_from_slice(subdir.as_bytes());
        bytes[128..].copy_from_slice(&toc_index.to_le_bytes());
        bytes
    }

    fn table(groups: &[&[(&str, u16)]]) -> Vec<u8> {
        let mut bytes = (groups.len() as u16).to_le_bytes().to_vec();
        for group in groups {
            bytes.extend_from_slice(&(group.len() as u16).to_le_bytes());
            for (subdir, index) in group.iter() {
                bytes.extend(member(subdir, *index));
            }
        }
        bytes
    }

    #[test]
    fn test_parse_typical_prefix() {
        let mut region = vec![0xAA; TYPICAL_LOOKUP_PREFIX];
        region.extend(table(&[&[("field", 0), ("world\\sub", 3)]]));

        let parsed = ConflictTable::parse(&region).unwrap();
        assert_eq!(parsed.prefix_len(), TYPICAL_LOOKUP_PREFIX);
        assert_eq!(parsed.table_len(), 2 + 2 + 2 * 130);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.get(0), Some("field"));
        assert_eq!(parsed.get(3), Some("world/sub"));
    }

    #[test]
    fn test_parse_derived_prefix() {
        let mut region = vec![0u8; 40];
        region.extend(table(&[&[("a", 1)], &[("b", 2), ("c", 4)]]));

        let parsed = ConflictTable::parse(&region).unwrap();
        assert_eq!(parsed.prefix_len(), 40);
        assert_eq!(parsed.groups().len(), 2);
        assert_eq!(parsed.groups()[1][1].subdirectory, "c");
    }

    #[test]
    fn test_parse_no_prefix() {
        let region = table(&[&[("only", 7)]]);
        let parsed = ConflictTable::parse(&region).unwrap();
        assert_eq!(parsed.prefix_len(), 0);
        assert_eq!(parsed.get(7), Some("only"));
    }

    #[test]
    fn test_declared_counts_exceed_region() {
        // Claims 5 groups but holds one member.
        let mut region = 5u16.to_le_bytes().to_vec();
        region.extend_from_slice(&1u16.to_le_bytes());
        region.extend(member("x", 0));
        region[0] = 0xFF;

        let err = ConflictTable::parse(&region).unwrap_err();
        assert!(matches!(err, ConflictTableError::NoExactFit { .. }));
    }

    #[test]
    fn test_region_too_short() {
        assert_eq!(
            ConflictTable::parse(&[0]).unwrap_err(),
            ConflictTableError::RegionTruncated {
                needed: 2,
                available: 1,
            }
        );
    }

    #[test]
    fn test_resolve_by_group_and_position() {
        let region = table(&[&[("one", 0), ("two", 1)], &[("three", 5)]]);
        let parsed = ConflictTable::parse(&region).unwrap();

        assert_eq!(parsed.resolve(1, 0), Some("one"));
        assert_eq!(parsed.resolve(1, 1), Some("two"));
        assert_eq!(parsed.resolve(2, 5), Some("three"));
        assert_eq!(parsed.resolve(0, 0), None);
    }

    #[test]
    fn test_scan_gives_up_on_corrupt_region() {
        // Every candidate prefix declares 257 groups of 257 members.
        let region = vec![0x01; 60_000];

        let err = ConflictTable::parse(&region).unwrap_err();
        assert_eq!(
            err,
            ConflictTableError::SearchExhausted {
                region_len: 60_000,
                steps: 60_000 * SCAN_STEPS_PER_BYTE,
            }
        );
    }

    #[test]
    fn test_scan_budget_is_enforced() {
        let mut region = vec![0u8; 40];
        region.extend(table(&[&[("a", 1)], &[("b", 2), ("c", 4)]]));

        // The miss at 39 reads one group header, the fit at 40 costs five.
        assert!(matches!(
            ConflictTable::parse_with_budget(&region, 5),
            Err(ConflictTableError::SearchExhausted { steps: 5, .. })
        ));
        assert_eq!(ConflictTable::parse_with_budget(&region, 6).unwrap().prefix_len(), 40);
    }

    #[test]
    fn test_duplicate_toc_index_last_wins() {
        let region = table(&[&[("first", 3)], &[("second", 3)]]);
        let parsed = ConflictTable::parse(&region).unwrap();

        assert_eq!(parsed.get(3), Some("second"));
        assert_eq!(parsed.resolve(1, 3), Some("first"));
    }

    #[test]
    fn test_resolve_by_conflict_index() {
        let region = table(&[&[("sub", 1)]]);
        let parsed = ConflictTable::parse(&region).unwrap();

        // Entry at position 0 whose conflict index names the member's toc_index.
        assert_eq!(parsed.resolve(1, 0), Some("sub"));
        assert_eq!(parsed.resolve(9, 4), None);
    }
}
