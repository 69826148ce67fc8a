//! Local file sources and portion planning.

pub mod file;
pub mod portion;

use std::path::{Path, PathBuf};

use file::FileSource;
use globset::GlobBuilder;
use portion::{FilePortionSource, Portion};
use tracing::debug;
use udx_error::{Result, UdxError};

use super::Source;
use crate::config::params::NamedParams;

const VALID_PARAMS: &[&str] = &["file", "offsets", "nodes"];

const GLOB_CHARS: [char; 3] = ['*', '?', '['];

/// Parameters accepted by the file sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceParams {
    pub file: PathBuf,
    /// Portion start offsets, in the order given.
    pub offsets: Option<Vec<u64>>,
    /// Nodes to run on. Defaults to the current node.
    pub nodes: Option<Vec<String>>,
}

impl SourceParams {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        SourceParams {
            file: file.into(),
            offsets: None,
            nodes: None,
        }
    }

    pub fn with_offsets(mut self, offsets: impl IntoIterator<Item = u64>) -> Self {
        self.offsets = Some(offsets.into_iter().collect());
        self
    }

    pub fn with_nodes<S: Into<String>>(mut self, nodes: impl IntoIterator<Item = S>) -> Self {
        self.nodes = Some(nodes.into_iter().map(Into::into).collect());
        self
    }

    pub fn try_from_params(params: &NamedParams) -> Result<Self> {
        if let Some(name) = params.names().find(|n| !VALID_PARAMS.contains(n)) {
            return Err(UdxError::config(format!("Unknown parameter '{name}' for file source"))
                .with_field("valid", VALID_PARAMS.join(",")));
        }

        let file = params.require_string("file")?;
        let offsets = match params.get_list("offsets")? {
            Some(list) => Some(
                list.iter()
                    .map(|s| {
                        s.parse::<u64>().map_err(|e| {
                            UdxError::config("Invalid offset")
                                .with_field("offset", s)
                                .with_source(e)
                        })
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            None => None,
        };

        Ok(SourceParams {
            file: PathBuf::from(file),
            offsets,
            nodes: params.get_list("nodes")?,
        })
    }

    /// Nodes that will actually run a source.
    ///
    /// Never more nodes than portions, since extra nodes would have nothing
    /// to read.
    fn execution_nodes(&self, current_node: &str) -> Vec<String> {
        let mut nodes = match &self.nodes {
            Some(nodes) if !nodes.is_empty() => nodes.clone(),
            _ => vec![current_node.to_string()],
        };
        if let Some(offsets) = self.distinct_offsets() {
            nodes.truncate(offsets.len().max(1));
        }
        nodes
    }

    /// Offsets sorted with duplicates removed.
    fn distinct_offsets(&self) -> Option<Vec<u64>> {
        let mut offsets = self.offsets.clone()?;
        offsets.sort_unstable();
        offsets.dedup();
        Some(offsets)
    }
}

/// Plan the portions of a file that `current_node` is responsible for.
///
/// Without offsets the whole file is one portion owned by every execution
/// node. With offsets, sorted offsets are assigned round-robin to the
/// execution nodes. The last portion extends to the end of the file.
pub fn plan_portions(params: &SourceParams, file_size: u64, current_node: &str) -> Result<Vec<Portion>> {
    let nodes = params.execution_nodes(current_node);
    let node_idx = match nodes.iter().position(|n| n == current_node) {
        Some(idx) => idx,
        None => return Ok(Vec::new()),
    };

    let offsets = match params.distinct_offsets() {
        Some(offsets) if !offsets.is_empty() => offsets,
        _ => {
            return Ok(vec![Portion {
                offset: 0,
                size: file_size,
                is_first: true,
            }]);
        }
    };

    if let Some(&last) = offsets.last() {
        if last > file_size {
            return Err(UdxError::config("Offset beyond end of file")
                .with_field("offset", last)
                .with_field("file_size", file_size));
        }
    }

    let portions = offsets
        .iter()
        .enumerate()
        .filter(|(idx, _)| idx % nodes.len() == node_idx)
        .map(|(idx, &offset)| {
            let end = offsets.get(idx + 1).copied().unwrap_or(file_size);
            Portion {
                offset,
                size: end - offset,
                is_first: idx == 0,
            }
        })
        .collect();

    Ok(portions)
}

fn is_glob(path: &Path) -> bool {
    path.to_string_lossy().contains(GLOB_CHARS)
}

/// Expand a glob in the final path component into the matching files,
/// sorted by path.
///
/// Paths without glob characters are returned as is.
pub fn expand_files(pattern: &Path) -> Result<Vec<PathBuf>> {
    if !is_glob(pattern) {
        return Ok(vec![pattern.to_path_buf()]);
    }

    let dir = match pattern.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    if is_glob(dir) {
        return Err(UdxError::config("Only the file name may contain a glob")
            .with_field("path", pattern.display()));
    }
    let name = pattern
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| UdxError::config("Glob is missing a file name").with_field("path", pattern.display()))?;

    let matcher = GlobBuilder::new(&name)
        .literal_separator(true)
        .build()
        .map_err(|e| {
            UdxError::config("Invalid glob")
                .with_field("path", pattern.display())
                .with_source(e)
        })?
        .compile_matcher();

    let list_err = |e: std::io::Error| {
        UdxError::resource("Failed to list directory")
            .with_field("dir", dir.display())
            .with_source(e)
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(list_err)? {
        let entry = entry.map_err(list_err)?;
        if entry.file_type().map_err(list_err)?.is_file() && matcher.is_match(entry.file_name()) {
            files.push(entry.path());
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(UdxError::resource("No files match glob").with_field("path", pattern.display()));
    }
    debug!(path = %pattern.display(), matches = files.len(), "expanded glob");

    Ok(files)
}

/// Create the sources `current_node` should run.
///
/// Without offsets every file matching `file` gets its own whole-file
/// source. Portions need a single concrete file.
pub fn create_sources(params: &SourceParams, current_node: &str) -> Result<Vec<Box<dyn Source>>> {
    if params.offsets.is_none() {
        let runs_here = params
            .execution_nodes(current_node)
            .iter()
            .any(|n| n == current_node);
        if !runs_here {
            return Ok(Vec::new());
        }
        return Ok(expand_files(&params.file)?
            .into_iter()
            .map(|path| Box::new(FileSource::new(path)) as Box<dyn Source>)
            .collect());
    }

    if is_glob(&params.file) {
        return Err(UdxError::config("File portions can't be combined with a glob")
            .with_field("path", params.file.display()));
    }

    let file_size = std::fs::metadata(&params.file)
        .map_err(|e| {
            UdxError::resource("Failed to stat file")
                .with_field("path", params.file.display())
                .with_source(e)
        })?
        .len();

    let portions = plan_portions(params, file_size, current_node)?;
    debug!(
        path = %params.file.display(),
        node = current_node,
        portions = portions.len(),
        "planned file portions"
    );

    Ok(portions
        .into_iter()
        .map(|p| Box::new(FilePortionSource::new(params.file.clone(), p)) as Box<dyn Source>)
        .collect())
}

#[cfg(test)]
mod tests {
    use udx_error::ErrorKind;

    use super::*;

    #[test]
    fn whole_file_without_offsets() {
        let params = SourceParams::new("f");
        let portions = plan_portions(&params, 100, "n1").unwrap();
        assert_eq!(
            vec![Portion {
                offset: 0,
                size: 100,
                is_first: true
            }],
            portions
        );
    }

    #[test]
    fn round_robin_across_nodes() {
        let params = SourceParams::new("f")
            .with_offsets([60, 0, 30, 90])
            .with_nodes(["n1", "n2"]);

        let n1 = plan_portions(&params, 100, "n1").unwrap();
        let n2 = plan_portions(&params, 100, "n2").unwrap();

        assert_eq!(
            vec![
                Portion {
                    offset: 0,
                    size: 30,
                    is_first: true
                },
                Portion {
                    offset: 60,
                    size: 30,
                    is_first: false
                },
            ],
            n1
        );
        assert_eq!(
            vec![
                Portion {
                    offset: 30,
                    size: 30,
                    is_first: false
                },
                Portion {
                    offset: 90,
                    size: 10,
                    is_first: false
                },
            ],
            n2
        );
    }

    #[test]
    fn more_nodes_than_portions() {
        let params = SourceParams::new("f")
            .with_offsets([0])
            .with_nodes(["n1", "n2", "n3"]);
        assert_eq!(1, plan_portions(&params, 10, "n1").unwrap().len());
        assert!(plan_portions(&params, 10, "n2").unwrap().is_empty());
    }

    #[test]
    fn duplicate_offsets_do_not_count_as_portions() {
        let params = SourceParams::new("f")
            .with_offsets([5, 0, 5, 0])
            .with_nodes(["n1", "n2", "n3"]);
        assert_eq!(vec!["n1", "n2"], params.execution_nodes("n1"));

        assert_eq!(
            vec![Portion {
                offset: 5,
                size: 5,
                is_first: false
            }],
            plan_portions(&params, 10, "n2").unwrap()
        );
        assert!(plan_portions(&params, 10, "n3").unwrap().is_empty());
    }

    #[test]
    fn node_not_targeted() {
        let params = SourceParams::new("f").with_nodes(["n1"]);
        assert!(plan_portions(&params, 10, "n9").unwrap().is_empty());
    }

    #[test]
    fn offset_beyond_file() {
        let params = SourceParams::new("f").with_offsets([0, 200]);
        let err = plan_portions(&params, 100, "n1").unwrap_err();
        assert_eq!(ErrorKind::Config, err.kind());
    }

    #[test]
    fn from_named_params() {
        let params = NamedParams::new()
            .with("file", "/tmp/data.txt")
            .with("offsets", "0,10, 20")
            .with("nodes", "a,b");
        let params = SourceParams::try_from_params(&params).unwrap();
        assert_eq!(Some(vec![0, 10, 20]), params.offsets);
        assert_eq!(Some(vec!["a".to_string(), "b".to_string()]), params.nodes);

        let bad = NamedParams::new().with("file", "x").with("offsets", "0,ten");
        let err = SourceParams::try_from_params(&bad).unwrap_err();
        assert_eq!(Some("ten"), err.get_field("offset"));

        let missing = NamedParams::new().with("offsets", "0");
        SourceParams::try_from_params(&missing).unwrap_err();

        let unknown = NamedParams::new().with("file", "x").with("colour", "red");
        SourceParams::try_from_params(&unknown).unwrap_err();
    }

    #[test]
    fn glob_expands_sorted_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.txt", "a.txt", "c.csv"] {
            std::fs::write(dir.path().join(name), "1").unwrap();
        }
        std::fs::create_dir(dir.path().join("d.txt")).unwrap();

        let files = expand_files(&dir.path().join("*.txt")).unwrap();
        assert_eq!(vec![dir.path().join("a.txt"), dir.path().join("b.txt")], files);

        let plain = dir.path().join("c.csv");
        assert_eq!(vec![plain.clone()], expand_files(&plain).unwrap());

        let err = expand_files(&dir.path().join("*.json")).unwrap_err();
        assert_eq!(ErrorKind::Resource, err.kind());
    }

    #[test]
    fn glob_with_offsets() {
        let params = SourceParams::new("/tmp/*.txt").with_offsets([0]);
        let err = create_sources(&params, "n1").err().unwrap();
        assert_eq!(ErrorKind::Config, err.kind());
    }
}
