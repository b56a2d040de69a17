//! Deterministic classification of write targets into test and source paths.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Which side of the TDD split a path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathKind {
    Test,
    Src,
    Other,
}

/// Rule set used to classify write targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathRules {
    /// Raw substring match: contains `test` ⇒ test; contains `src` (and not
    /// `test`) ⇒ src.
    ///
    /// Known false positives: `src/test-utils.ts` is a test path, and so is
    /// anything with `test` inside an unrelated token (`latest.rs`).
    Substring,
    /// Leading directory match against explicit folder lists. Paths under
    /// `root` are matched relative to it; other relative paths are taken as
    /// already root-relative.
    Folders {
        root: PathBuf,
        src_dirs: Vec<String>,
        test_dirs: Vec<String>,
    },
}

impl PathRules {
    pub fn classify(&self, path: &str) -> PathKind {
        match self {
            PathRules::Substring => classify_substring(path),
            PathRules::Folders {
                root,
                src_dirs,
                test_dirs,
            } => {
                let path = Path::new(path);
                let relative = path.strip_prefix(root).unwrap_or(path);
                classify_folders(relative, src_dirs, test_dirs)
            }
        }
    }
}

fn classify_substring(path: &str) -> PathKind {
    if path.contains("test") {
        PathKind::Test
    } else if path.contains("src") {
        PathKind::Src
    } else {
        PathKind::Other
    }
}

fn classify_folders(path: &Path, src_dirs: &[String], test_dirs: &[String]) -> PathKind {
    let mut components = path
        .components()
        .filter(|component| !matches!(component, Component::CurDir | Component::RootDir));

    let Some(Component::Normal(first)) = components.next() else {
        return PathKind::Other;
    };
    let Some(first) = first.to_str() else {
        return PathKind::Other;
    };
    if test_dirs.iter().any(|dir| dir == first) {
        PathKind::Test
    } else if src_dirs.iter().any(|dir| dir == first) {
        PathKind::Src
    } else {
        PathKind::Other
    }
}
