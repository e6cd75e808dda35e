use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

/// Draw the folder tree under `root`, folders first, then files, each group
/// sorted case-insensitively. Subfolders that cannot be listed are marked
/// instead of aborting the whole map.
pub fn folder_map(root: &Path) -> io::Result<String> {
    let mut out = format!("📂 {}\n", root.display());
    let entries = sorted_entries(root)?;
    draw(&entries, "", &mut out);
    Ok(out)
}

struct Entry {
    name: String,
    children: Option<io::Result<Vec<Entry>>>,
}

fn sorted_entries(dir: &Path) -> io::Result<Vec<Entry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let children = if entry.file_type()?.is_dir() {
            Some(sorted_entries(&entry.path()))
        } else {
            None
        };
        entries.push(Entry { name, children });
    }
    entries.sort_by_cached_key(|e| (e.children.is_none(), e.name.to_lowercase()));
    Ok(entries)
}

fn draw(entries: &[Entry], prefix: &str, out: &mut String) {
    for (i, entry) in entries.iter().enumerate() {
        let last = i + 1 == entries.len();
        let connector = if last { LAST_BRANCH } else { BRANCH };
        match &entry.children {
            None => {
                let _ = writeln!(out, "{prefix}{connector}📄 {}", entry.name);
            }
            Some(Err(_)) => {
                let _ = writeln!(out, "{prefix}{connector}📁 {} (Permission Denied)", entry.name);
            }
            Some(Ok(children)) => {
                let _ = writeln!(out, "{prefix}{connector}📁 {}", entry.name);
                let nested = format!("{prefix}{}", if last { SPACE } else { PIPE });
                draw(children, &nested, out);
            }
        }
    }
}
