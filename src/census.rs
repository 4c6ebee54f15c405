// Object census
//
// Counting and lookup helpers over an object space: per-type counts, growth
// between calls, newly appeared objects and objects nothing refers to.

use crate::object::{type_matches, Inspect, ObjectId, ObjectSpace};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::io::{self, Write};

/// Number of tracked objects whose type matches `typename`
///
/// A name containing a `.` is compared with the module-qualified type name.
pub fn count(space: &dyn ObjectSpace, typename: &str) -> usize {
    space
        .tracked()
        .into_iter()
        .filter_map(|id| space.get(id))
        .filter(|obj| type_matches(*obj, typename))
        .count()
}

/// Instance count per type name
pub fn typestats(space: &dyn ObjectSpace, shortnames: bool) -> BTreeMap<String, usize> {
    let mut stats = BTreeMap::new();
    for id in space.tracked() {
        if let Some(obj) = space.get(id) {
            *stats.entry(obj.display_type_name(shortnames)).or_insert(0) += 1;
        }
    }
    stats
}

/// Type names with the most instances, most frequent first
///
/// Ties are broken by name. `None` returns every type.
pub fn most_common_types(
    space: &dyn ObjectSpace,
    limit: Option<usize>,
    shortnames: bool,
) -> Vec<(String, usize)> {
    let mut stats: Vec<(String, usize)> = typestats(space, shortnames).into_iter().collect();
    stats.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    if let Some(limit) = limit {
        stats.truncate(limit);
    }
    stats
}

/// Write the most common types as an aligned table
pub fn show_most_common_types(
    space: &dyn ObjectSpace,
    limit: Option<usize>,
    shortnames: bool,
    out: &mut dyn Write,
) -> io::Result<()> {
    let stats = most_common_types(space, limit, shortnames);
    let width = stats.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, count) in stats {
        writeln!(out, "{:<width$} {}", name, count, width = width)?;
    }
    Ok(())
}

/// Highest instance count seen so far per type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeakStats {
    peaks: HashMap<String, usize>,
}

impl PeakStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn peak(&self, name: &str) -> usize {
        self.peaks.get(name).copied().unwrap_or(0)
    }
}

/// One row of a growth report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrowthRecord {
    pub name: String,
    /// Previous peak
    pub old_count: usize,
    pub new_count: usize,
}

impl GrowthRecord {
    pub fn delta(&self) -> usize {
        self.new_count - self.old_count
    }
}

/// Types whose count rose above their previous peak
///
/// Updates `peaks` in place. Largest increases come first, ties by name.
pub fn growth(
    space: &dyn ObjectSpace,
    peaks: &mut PeakStats,
    limit: Option<usize>,
    shortnames: bool,
) -> Vec<GrowthRecord> {
    let mut records = Vec::new();
    for (name, count) in typestats(space, shortnames) {
        let old = peaks.peak(&name);
        if count > old {
            records.push(GrowthRecord {
                name: name.clone(),
                old_count: old,
                new_count: count,
            });
            peaks.peaks.insert(name, count);
        }
    }
    records.sort_by(|a, b| b.delta().cmp(&a.delta()).then_with(|| a.name.cmp(&b.name)));
    if let Some(limit) = limit {
        records.truncate(limit);
    }
    records
}

/// Write a growth report as `name count +delta` rows
pub fn show_growth(
    space: &dyn ObjectSpace,
    peaks: &mut PeakStats,
    limit: Option<usize>,
    shortnames: bool,
    out: &mut dyn Write,
) -> io::Result<()> {
    let records = growth(space, peaks, limit, shortnames);
    let width = records.iter().map(|r| r.name.len()).max().unwrap_or(0);
    for r in records {
        writeln!(
            out,
            "{:<width$}{:>9} {:>+9}",
            r.name,
            r.new_count,
            r.delta() as i64,
            width = width
        )?;
    }
    Ok(())
}

/// Ids seen per type at the last `get_new_ids` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdSnapshot {
    ids: BTreeMap<String, BTreeSet<ObjectId>>,
}

impl IdSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ids recorded for `name`
    pub fn len_of(&self, name: &str) -> usize {
        self.ids.get(name).map_or(0, BTreeSet::len)
    }
}

/// Per-type change since the previous snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdsRow {
    pub name: String,
    pub old: usize,
    pub current: usize,
    pub new: usize,
    pub delta: i64,
}

/// Objects that appeared since the last call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewIds {
    /// New ids per type name
    pub ids: BTreeMap<String, BTreeSet<ObjectId>>,
    /// Types with new objects, most new first, at most `limit` of them
    pub rows: Vec<NewIdsRow>,
}

impl NewIds {
    /// Render `rows` as a table with a header
    pub fn write_table(&self, out: &mut dyn Write) -> io::Result<()> {
        let width = self
            .rows
            .iter()
            .map(|r| r.name.len())
            .chain(std::iter::once("Type".len()))
            .max()
            .unwrap_or(0);
        let rule = "=".repeat(width + 52);
        writeln!(out, "{}", rule)?;
        writeln!(
            out,
            "{:<width$}{:>13}{:>13}{:>13}{:>13}",
            "Type",
            "Old_ids",
            "Current_ids",
            "New_ids",
            "Count_Deltas",
            width = width
        )?;
        writeln!(out, "{}", rule)?;
        for r in &self.rows {
            writeln!(
                out,
                "{:<width$}{:>13}{:>13}{:>+13}{:>+13}",
                r.name,
                r.old,
                r.current,
                r.new as i64,
                r.delta,
                width = width
            )?;
        }
        writeln!(out, "{}", rule)
    }
}

/// Find objects created since the previous call
///
/// Compares the space against `snapshot` and, unless `skip_update` is set,
/// replaces the snapshot with the current state.
pub fn get_new_ids(
    space: &dyn ObjectSpace,
    snapshot: &mut IdSnapshot,
    skip_update: bool,
    limit: Option<usize>,
    shortnames: bool,
) -> NewIds {
    let mut current: BTreeMap<String, BTreeSet<ObjectId>> = BTreeMap::new();
    for id in space.tracked() {
        if let Some(obj) = space.get(id) {
            current
                .entry(obj.display_type_name(shortnames))
                .or_default()
                .insert(id);
        }
    }

    let empty = BTreeSet::new();
    let mut result = NewIds::default();
    for (name, ids) in &current {
        let old = snapshot.ids.get(name).unwrap_or(&empty);
        let new: BTreeSet<ObjectId> = ids.difference(old).copied().collect();
        if new.is_empty() {
            continue;
        }
        result.rows.push(NewIdsRow {
            name: name.clone(),
            old: old.len(),
            current: ids.len(),
            new: new.len(),
            delta: ids.len() as i64 - old.len() as i64,
        });
        result.ids.insert(name.clone(), new);
    }
    result
        .rows
        .sort_by(|a, b| b.new.cmp(&a.new).then_with(|| a.name.cmp(&b.name)));
    if let Some(limit) = limit {
        result.rows.truncate(limit);
    }

    tracing::debug!(types = result.ids.len(), "new object ids collected");
    if !skip_update {
        snapshot.ids = current;
    }
    result
}

/// Tracked objects of the given type
pub fn by_type(space: &dyn ObjectSpace, typename: &str) -> Vec<ObjectId> {
    space
        .tracked()
        .into_iter()
        .filter(|id| space.get(*id).map_or(false, |obj| type_matches(obj, typename)))
        .collect()
}

/// Object with the given identity, if tracked
pub fn at(space: &dyn ObjectSpace, id: ObjectId) -> Option<&dyn Inspect> {
    space.get(id)
}

/// The subset of `ids` that are tracked, in the order given
pub fn at_addrs(space: &dyn ObjectSpace, ids: &[ObjectId]) -> Vec<ObjectId> {
    ids.iter().copied().filter(|id| space.contains(*id)).collect()
}

/// Tracked objects that no tracked object refers to
pub fn get_leaking_objects(space: &dyn ObjectSpace) -> Vec<ObjectId> {
    let tracked = space.tracked();
    let referenced: HashSet<ObjectId> = tracked
        .iter()
        .flat_map(|id| space.referents(*id))
        .collect();
    tracked
        .into_iter()
        .filter(|id| !referenced.contains(id))
        .collect()
}
