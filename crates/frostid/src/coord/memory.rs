//! In-memory coordination tree for tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{CoordError, CoordResult, Coordinator, NodeMode, NodeVersion};

#[derive(Default)]
struct Node {
    data: Vec<u8>,
    version: NodeVersion,
    next_sequence: i64,
}

#[derive(Default)]
struct Tree {
    nodes: BTreeMap<String, Node>,
}

/// A shared node tree with the same semantics the worker-identity logic
/// relies on from the real service: atomic sequential suffixes and
/// version-checked conditional writes. Clones share the tree, standing in
/// for separate sessions against one ensemble.
#[derive(Clone, Default)]
pub(crate) struct MemoryCoordinator {
    tree: Arc<Mutex<Tree>>,
}

impl MemoryCoordinator {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

fn parent_of(path: &str) -> Option<&str> {
    let (parent, _) = path.rsplit_once('/')?;
    if parent.is_empty() { None } else { Some(parent) }
}

impl Coordinator for MemoryCoordinator {
    fn exists(&self, path: &str) -> CoordResult<bool> {
        Ok(self.tree.lock().nodes.contains_key(path))
    }

    fn create(&self, path: &str, data: &[u8], mode: NodeMode) -> CoordResult<String> {
        let mut tree = self.tree.lock();
        let full_path = match mode {
            NodeMode::Persistent => {
                if tree.nodes.contains_key(path) {
                    return Err(CoordError::Backend {
                        reason: format!("node {path} already exists"),
                    });
                }
                path.to_string()
            }
            NodeMode::EphemeralSequential => {
                let parent = parent_of(path).ok_or_else(|| CoordError::Malformed {
                    path: path.to_string(),
                    reason: "sequential node needs a parent".to_string(),
                })?;
                let parent = tree.nodes.get_mut(parent).ok_or(CoordError::NotFound {
                    path: path.to_string(),
                })?;
                let sequence = parent.next_sequence;
                parent.next_sequence += 1;
                // The real service zero-pads suffixes to ten digits.
                format!("{path}{sequence:010}")
            }
        };
        if let Some(parent) = parent_of(&full_path) {
            if !tree.nodes.contains_key(parent) {
                return Err(CoordError::NotFound {
                    path: parent.to_string(),
                });
            }
        }
        tree.nodes.insert(
            full_path.clone(),
            Node {
                data: data.to_vec(),
                version: 0,
                next_sequence: 0,
            },
        );
        Ok(full_path)
    }

    fn children(&self, path: &str) -> CoordResult<Vec<String>> {
        let tree = self.tree.lock();
        if !tree.nodes.contains_key(path) {
            return Err(CoordError::NotFound {
                path: path.to_string(),
            });
        }
        let prefix = format!("{path}/");
        Ok(tree
            .nodes
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter(|rest| !rest.contains('/'))
            .map(str::to_string)
            .collect())
    }

    fn get(&self, path: &str) -> CoordResult<(Vec<u8>, NodeVersion)> {
        let tree = self.tree.lock();
        let node = tree.nodes.get(path).ok_or_else(|| CoordError::NotFound {
            path: path.to_string(),
        })?;
        Ok((node.data.clone(), node.version))
    }

    fn set(&self, path: &str, data: &[u8], version: NodeVersion) -> CoordResult<()> {
        let mut tree = self.tree.lock();
        let node = tree.nodes.get_mut(path).ok_or_else(|| CoordError::NotFound {
            path: path.to_string(),
        })?;
        if node.version != version {
            return Err(CoordError::VersionConflict {
                path: path.to_string(),
            });
        }
        node.data = data.to_vec();
        node.version += 1;
        Ok(())
    }
}
