use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Mutually exclusive allow/block lists loaded once at init. When an
/// allow-list is present it takes precedence and the block-list (if any
/// was also supplied) is ignored — overlapping presence is otherwise
/// undefined, so this crate simply never evaluates the block-list once an
/// allow-list exists.
pub enum FilterList {
    AllowOnly(HashSet<String>),
    BlockOnly(HashSet<String>),
    None,
}

impl FilterList {
    pub fn load(allow_path: Option<&Path>, block_path: Option<&Path>) -> std::io::Result<FilterList> {
        if let Some(path) = allow_path {
            return Ok(FilterList::AllowOnly(read_token_set(path)?));
        }
        if let Some(path) = block_path {
            return Ok(FilterList::BlockOnly(read_token_set(path)?));
        }
        Ok(FilterList::None)
    }

    /// Whether `comm` is allowed to generate an `appOpen` pipeline run.
    /// `appClose` events bypass filtering entirely and never call this.
    pub fn permits(&self, comm: &str) -> bool {
        match self {
            FilterList::AllowOnly(allow) => allow.contains(comm),
            FilterList::BlockOnly(block) => !block.contains(comm),
            FilterList::None => true,
        }
    }
}

fn read_token_set(path: &Path) -> std::io::Result<HashSet<String>> {
    let contents = fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .flat_map(|line| line.split(','))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_list(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn no_files_permits_everything() {
        let filters = FilterList::load(None, None).unwrap();
        assert!(filters.permits("anything"));
    }

    #[test]
    fn allow_list_only_permits_listed_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let allow = write_list(&dir, "allow.txt", "firefox, code\nbash\n");
        let filters = FilterList::load(Some(&allow), None).unwrap();
        assert!(filters.permits("firefox"));
        assert!(filters.permits("bash"));
        assert!(!filters.permits("steam"));
    }

    #[test]
    fn block_list_denies_listed_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let block = write_list(&dir, "block.txt", "steam,wine\n");
        let filters = FilterList::load(None, Some(&block)).unwrap();
        assert!(!filters.permits("steam"));
        assert!(filters.permits("firefox"));
    }

    #[test]
    fn allow_list_precedence_ignores_block_list() {
        let dir = tempfile::tempdir().unwrap();
        let allow = write_list(&dir, "allow.txt", "firefox\n");
        let block = write_list(&dir, "block.txt", "firefox\n");
        let filters = FilterList::load(Some(&allow), Some(&block)).unwrap();
        assert!(filters.permits("firefox"));
    }
}
