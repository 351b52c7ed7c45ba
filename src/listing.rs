//! Directory listing parser
//!
//! Turns the text returned by a remote `ls` into ordered entries. Unix long
//! format and the MS-DOS/IIS format are understood.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One directory entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// File name (not full path)
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    /// Size in bytes (0 for directories in DOS listings)
    pub size: u64,
    /// Modification time as printed by the server
    pub modified: Option<String>,
    /// Permission string, e.g. `rwxr-xr-x`
    pub permissions: Option<String>,
    pub owner: Option<String>,
    pub group: Option<String>,
    /// Symlink target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    File,
    Directory,
    Symlink,
    Unknown,
}

impl FileType {
    fn from_unix_flag(flag: &str) -> Self {
        match flag {
            "-" => FileType::File,
            "d" => FileType::Directory,
            "l" => FileType::Symlink,
            _ => FileType::Unknown,
        }
    }
}

static UNIX_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^([-dlbcps])([-rwxsStT]{9})\S*\s+\d+\s+(\S+)\s+(\S+)\s+(\d+)\s+([A-Za-z]{3}\s+\d{1,2}\s+(?:\d{1,2}:\d{2}|\d{4}))\s+(.+)$",
    )
    .unwrap()
});

// Some servers omit the group column
static UNIX_LINE_NO_GROUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^([-dlbcps])([-rwxsStT]{9})\S*\s+\d+\s+(\S+)\s+(\d+)\s+([A-Za-z]{3}\s+\d{1,2}\s+(?:\d{1,2}:\d{2}|\d{4}))\s+(.+)$",
    )
    .unwrap()
});

static DOS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2}-\d{2}-\d{2,4})\s+(\d{1,2}:\d{2}\s*(?:[AaPp][Mm])?)\s+(<DIR>|\d+)\s+(.+)$")
        .unwrap()
});

/// Parse a full listing, preserving server order.
///
/// `total` lines, blank lines and the `.`/`..` entries are skipped, as are
/// lines in neither format.
pub fn parse_listing(text: &str) -> Vec<FileEntry> {
    text.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty() && !line.starts_with("total "))
        .filter_map(|line| {
            let entry = parse_line(line);
            if entry.is_none() {
                debug!("Skipping unparseable listing line: {:?}", line);
            }
            entry
        })
        .filter(|entry| entry.name != "." && entry.name != "..")
        .collect()
}

/// Parse a single listing line
pub fn parse_line(line: &str) -> Option<FileEntry> {
    parse_unix(line).or_else(|| parse_dos(line))
}

fn parse_unix(line: &str) -> Option<FileEntry> {
    let (flag, perms, owner, group, size, modified, name) =
        if let Some(caps) = UNIX_LINE.captures(line) {
            (
                caps.get(1)?.as_str(),
                caps.get(2)?.as_str(),
                caps.get(3)?.as_str(),
                Some(caps.get(4)?.as_str()),
                caps.get(5)?.as_str(),
                caps.get(6)?.as_str(),
                caps.get(7)?.as_str(),
            )
        } else {
            let caps = UNIX_LINE_NO_GROUP.captures(line)?;
            (
                caps.get(1)?.as_str(),
                caps.get(2)?.as_str(),
                caps.get(3)?.as_str(),
                None,
                caps.get(4)?.as_str(),
                caps.get(5)?.as_str(),
                caps.get(6)?.as_str(),
            )
        };

    let file_type = FileType::from_unix_flag(flag);
    let (name, target) = match (file_type, name.split_once(" -> ")) {
        (FileType::Symlink, Some((name, target))) => (name, Some(target.to_string())),
        _ => (name, None),
    };

    Some(FileEntry {
        name: name.to_string(),
        file_type,
        size: size.parse().ok()?,
        modified: Some(squeeze_spaces(modified)),
        permissions: Some(perms.to_string()),
        owner: Some(owner.to_string()),
        group: group.map(str::to_string),
        target,
    })
}

fn parse_dos(line: &str) -> Option<FileEntry> {
    let caps = DOS_LINE.captures(line)?;
    let date = caps.get(1)?.as_str();
    let time = caps.get(2)?.as_str();
    let size_or_dir = caps.get(3)?.as_str();

    let (file_type, size) = if size_or_dir == "<DIR>" {
        (FileType::Directory, 0)
    } else {
        (FileType::File, size_or_dir.parse().ok()?)
    };

    Some(FileEntry {
        name: caps.get(4)?.as_str().to_string(),
        file_type,
        size,
        modified: Some(format!("{} {}", date, time.replace(' ', ""))),
        permissions: None,
        owner: None,
        group: None,
        target: None,
    })
}

fn squeeze_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
