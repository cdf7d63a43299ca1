//! Prefix tree of requested field paths.
//!
//! Requested paths are merged so that shared prefixes resolve once, and the
//! flattened order (parents before children) becomes the column order of the
//! compiled query.

/// A node of the path tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldPath {
    /// Last segment.
    pub name: String,
    /// Full dotted path from the root.
    pub path: String,
    /// Child segments in insertion order, unique by name.
    pub children: Vec<FieldPath>,
}

/// Merged set of dotted field paths.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldPathTree {
    root: FieldPath,
}

impl FieldPath {
    fn child_mut(&mut self, name: &str) -> &mut FieldPath {
        let index = match self.children.iter().position(|c| c.name == name) {
            Some(index) => index,
            None => {
                let path = if self.path.is_empty() {
                    name.to_string()
                } else {
                    format!("{}.{}", self.path, name)
                };
                self.children.push(FieldPath {
                    name: name.to_string(),
                    path,
                    children: Vec::new(),
                });
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }

    /// Find a descendant by full dotted path.
    pub fn find(&self, path: &str) -> Option<&FieldPath> {
        let mut node = self;
        for segment in segments(path) {
            node = node.children.iter().find(|c| c.name == segment)?;
        }
        Some(node)
    }

    fn collect(&self, out: &mut Vec<String>) {
        for child in &self.children {
            out.push(child.path.clone());
            child.collect(out);
        }
    }
}

/// Non-blank, trimmed segments of a dotted path.
fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').map(str::trim).filter(|s| !s.is_empty())
}

impl FieldPathTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from dotted paths.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = Self::new();
        for path in paths {
            tree.insert(path.as_ref());
        }
        tree
    }

    /// Insert one dotted path. Blank segments are ignored.
    pub fn insert(&mut self, path: &str) {
        let mut node = &mut self.root;
        for segment in segments(path) {
            node = node.child_mut(segment);
        }
    }

    /// Top-level nodes.
    pub fn children(&self) -> &[FieldPath] {
        &self.root.children
    }

    /// Find a node by full dotted path.
    pub fn find(&self, path: &str) -> Option<&FieldPath> {
        self.root.find(path)
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    /// All paths depth-first, each parent before its children, no duplicates.
    pub fn flatten(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.root.collect(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_parent_first() {
        let tree = FieldPathTree::from_paths(["phones.number", "firstName", "phones.type"]);
        assert_eq!(
            tree.flatten(),
            vec!["phones", "phones.number", "phones.type", "firstName"]
        );
    }

    #[test]
    fn test_duplicates_and_blanks() {
        let tree = FieldPathTree::from_paths([
            "manager.firstName",
            "manager. firstName",
            "manager..lastName",
            "",
            " . ",
            "manager",
        ]);
        assert_eq!(
            tree.flatten(),
            vec!["manager", "manager.firstName", "manager.lastName"]
        );
    }

    #[test]
    fn test_intermediate_prefixes() {
        let tree = FieldPathTree::from_paths(["a.b.c"]);
        assert_eq!(tree.flatten(), vec!["a", "a.b", "a.b.c"]);

        let node = tree.find("a.b").unwrap();
        assert_eq!(node.name, "b");
        assert_eq!(node.children.len(), 1);
        assert!(tree.find("a.x").is_none());
    }

    #[test]
    fn test_empty_tree() {
        let tree = FieldPathTree::from_paths(Vec::<String>::new());
        assert!(tree.is_empty());
        assert!(tree.flatten().is_empty());
    }
}
