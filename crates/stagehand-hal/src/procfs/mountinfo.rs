//! Parsing helpers for `/proc/self/mountinfo` (and similar mountinfo files).

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInfo {
    pub mount_point: PathBuf,
    pub source: Option<String>,
}

pub fn parse_mountinfo(content: &str) -> Vec<MountInfo> {
    content
        .lines()
        .filter_map(|line| {
            // <id> <parent> <maj:min> <root> <mount point> <opts...> - <fstype> <source> <superopts>
            let (pre, post) = match line.split_once(" - ") {
                Some((pre, post)) => (pre, Some(post)),
                None => (line, None),
            };
            let pre_fields: Vec<&str> = pre.split_whitespace().collect();
            if pre_fields.len() < 5 {
                return None;
            }
            let source = post
                .and_then(|post| post.split_whitespace().nth(1))
                .map(String::from);
            Some(MountInfo {
                mount_point: PathBuf::from(unescape_mount_path(pre_fields[4])),
                source,
            })
        })
        .collect()
}

pub fn is_mounted_from_info(path: &Path, entries: &[MountInfo]) -> bool {
    let target = normalize_path(path);
    entries
        .iter()
        .any(|entry| normalize_path(&entry.mount_point) == target)
}

/// Mount points at or below `target`, deepest first, so they can be
/// unmounted in order.
pub fn mounts_under(target: &Path, entries: &[MountInfo]) -> Vec<PathBuf> {
    let mut under: Vec<PathBuf> = entries
        .iter()
        .map(|e| e.mount_point.clone())
        .filter(|mp| mp == target || mp.starts_with(target))
        .collect();
    under.sort();
    under.dedup();
    under.sort_by_key(|p| std::cmp::Reverse(p.components().count()));
    under
}

/// Mount points whose source is `dev_path` itself or one of its partitions
/// (`sda` -> `sda1`, `nvme0n1` -> `nvme0n1p1`).
pub fn mounted_under_device(entries: &[MountInfo], dev_path: &Path) -> Vec<PathBuf> {
    let disk = dev_path.to_string_lossy();
    let mut mounts: Vec<PathBuf> = entries
        .iter()
        .filter(|e| {
            e.source
                .as_deref()
                .is_some_and(|s| is_disk_or_partition(s, &disk))
        })
        .map(|e| e.mount_point.clone())
        .collect();
    mounts.sort();
    mounts.dedup();
    mounts
}

fn is_disk_or_partition(source: &str, disk: &str) -> bool {
    let Some(suffix) = source.strip_prefix(disk) else {
        return false;
    };
    if suffix.is_empty() {
        return true;
    }
    // Disks whose name ends in a digit number their partitions `pN`.
    let digits = if crate::path::needs_partition_infix(disk) {
        match suffix.strip_prefix('p') {
            Some(rest) => rest,
            None => return false,
        }
    } else {
        suffix
    };
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

pub fn unescape_mount_path(raw: &str) -> String {
    raw.replace("\\040", " ")
        .replace("\\011", "\t")
        .replace("\\012", "\n")
        .replace("\\134", "\\")
}

fn normalize_path(path: &Path) -> String {
    let s = path.to_string_lossy();
    if s.len() > 1 && s.ends_with('/') {
        s.trim_end_matches('/').to_string()
    } else {
        s.to_string()
    }
}
