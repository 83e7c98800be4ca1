//! Arena-backed document tree.
//!
//! Nodes live in a vector and refer to each other by [`BlockId`]. Each node
//! stores the index of its parent; structural edits update the child list and
//! the parent links together, so a node always has exactly one parent or is
//! detached. Detached nodes stay in the arena until [`Xdom::compact`] drops
//! them; compacting renumbers every node.

use crate::block::{Block, BlockKind, MetaData, Parameters};
use crate::error::XdomError;
use crate::syntax::Syntax;

/// Handle to a node in an [`Xdom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u32);

impl BlockId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct Node {
    kind: BlockKind,
    parameters: Parameters,
    parent: Option<BlockId>,
    children: Vec<BlockId>,
}

/// A parsed document.
#[derive(Debug, Clone)]
pub struct Xdom {
    nodes: Vec<Node>,
    root: BlockId,
    syntax: Option<Syntax>,
}

impl Xdom {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: BlockKind::Document,
                parameters: Parameters::new(),
                parent: None,
                children: Vec::new(),
            }],
            root: BlockId(0),
            syntax: None,
        }
    }

    /// Creates a document whose root holds `blocks`.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        let mut xdom = Self::new();
        let root = xdom.root;
        for block in blocks {
            let id = xdom.alloc(block, Some(root));
            xdom.nodes[root.index()].children.push(id);
        }
        xdom
    }

    /// Root node.
    pub fn root(&self) -> BlockId {
        self.root
    }

    /// Syntax the document was parsed from, if known.
    pub fn syntax(&self) -> Option<&Syntax> {
        self.syntax.as_ref()
    }

    /// Records the source syntax.
    pub fn set_syntax(&mut self, syntax: Syntax) {
        self.syntax = Some(syntax);
    }

    /// Builder-style [`set_syntax`](Self::set_syntax).
    pub fn with_syntax(mut self, syntax: Syntax) -> Self {
        self.syntax = Some(syntax);
        self
    }

    fn alloc(&mut self, block: Block, parent: Option<BlockId>) -> BlockId {
        let id = BlockId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind: block.kind,
            parameters: block.parameters,
            parent,
            children: Vec::with_capacity(block.children.len()),
        });
        for child in block.children {
            let child_id = self.alloc(child, Some(id));
            self.nodes[id.index()].children.push(child_id);
        }
        id
    }

    fn node(&self, id: BlockId) -> Result<&Node, XdomError> {
        self.nodes.get(id.index()).ok_or(XdomError::UnknownBlock(id))
    }

    /// Whether `id` names a node of this tree, attached or not.
    pub fn contains(&self, id: BlockId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Node kind.
    ///
    /// # Panics
    ///
    /// Panics on an id from another tree; see [`try_kind`](Self::try_kind).
    pub fn kind(&self, id: BlockId) -> &BlockKind {
        &self.nodes[id.index()].kind
    }

    /// Node kind, or [`XdomError::UnknownBlock`] for an id from another tree.
    pub fn try_kind(&self, id: BlockId) -> Result<&BlockKind, XdomError> {
        self.node(id).map(|node| &node.kind)
    }

    /// Mutable node kind. Panics on an id from another tree.
    pub fn kind_mut(&mut self, id: BlockId) -> &mut BlockKind {
        &mut self.nodes[id.index()].kind
    }

    /// Node parameters. Panics on an id from another tree.
    pub fn parameters(&self, id: BlockId) -> &Parameters {
        &self.nodes[id.index()].parameters
    }

    /// Mutable node parameters. Panics on an id from another tree.
    pub fn parameters_mut(&mut self, id: BlockId) -> &mut Parameters {
        &mut self.nodes[id.index()].parameters
    }

    /// One parameter value; `None` also for an id from another tree.
    pub fn parameter(&self, id: BlockId, name: &str) -> Option<&str> {
        self.node(id)
            .ok()?
            .parameters
            .get(name)
            .map(String::as_str)
    }

    /// Ordered children. Panics on an id from another tree.
    pub fn children(&self, id: BlockId) -> &[BlockId] {
        &self.nodes[id.index()].children
    }

    /// Ordered children, or [`XdomError::UnknownBlock`].
    pub fn try_children(&self, id: BlockId) -> Result<&[BlockId], XdomError> {
        self.node(id).map(|node| node.children.as_slice())
    }

    /// Parent, or `None` for the root and detached nodes.
    pub fn parent(&self, id: BlockId) -> Option<BlockId> {
        self.nodes.get(id.index()).and_then(|node| node.parent)
    }

    /// Whether the node is reachable from the root.
    pub fn is_attached(&self, id: BlockId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, id: BlockId) -> Ancestors<'_> {
        Ancestors {
            xdom: self,
            next: self.parent(id),
        }
    }

    /// Pre-order traversal of the subtree rooted at `id`, `id` included.
    pub fn descendants(&self, id: BlockId) -> Descendants<'_> {
        Descendants {
            xdom: self,
            stack: vec![id],
        }
    }

    /// Metadata in effect at `id`: the entries of every enclosing
    /// `MetaData` block, nearest first.
    pub fn metadata(&self, id: BlockId) -> MetaData {
        let mut merged = MetaData::new();
        let own = std::iter::once(id).chain(self.ancestors(id));
        for ancestor in own {
            if let BlockKind::MetaData(metadata) = self.kind(ancestor) {
                merged.inherit(metadata);
            }
        }
        merged
    }

    fn position(&self, id: BlockId) -> Result<(BlockId, usize), XdomError> {
        if id == self.root {
            return Err(XdomError::RootMutation);
        }
        let parent = self.node(id)?.parent.ok_or(XdomError::Detached(id))?;
        let index = self.nodes[parent.index()]
            .children
            .iter()
            .position(|child| *child == id)
            .ok_or(XdomError::Detached(id))?;
        Ok((parent, index))
    }

    /// Appends a block as the last child of `parent`.
    pub fn append(&mut self, parent: BlockId, block: Block) -> Result<BlockId, XdomError> {
        self.node(parent)?;
        let id = self.alloc(block, Some(parent));
        self.nodes[parent.index()].children.push(id);
        Ok(id)
    }

    /// Inserts a block at `index` among the children of `parent`.
    pub fn insert(
        &mut self,
        parent: BlockId,
        index: usize,
        block: Block,
    ) -> Result<BlockId, XdomError> {
        self.node(parent)?;
        let id = self.alloc(block, Some(parent));
        let children = &mut self.nodes[parent.index()].children;
        let index = index.min(children.len());
        children.insert(index, id);
        Ok(id)
    }

    /// Replaces `id` with `blocks`, spliced at the same position.
    ///
    /// Returns the ids of the inserted blocks. The replaced subtree is
    /// detached.
    pub fn replace(&mut self, id: BlockId, blocks: Vec<Block>) -> Result<Vec<BlockId>, XdomError> {
        let (parent, index) = self.position(id)?;
        let inserted: Vec<BlockId> = blocks
            .into_iter()
            .map(|block| self.alloc(block, Some(parent)))
            .collect();
        self.nodes[parent.index()]
            .children
            .splice(index..=index, inserted.iter().copied());
        self.nodes[id.index()].parent = None;
        Ok(inserted)
    }

    /// Detaches `id` from its parent.
    pub fn remove(&mut self, id: BlockId) -> Result<(), XdomError> {
        self.replace(id, Vec::new()).map(|_| ())
    }

    /// Copies the subtree rooted at `id` into a detached block. Panics on an
    /// id from another tree.
    pub fn to_block(&self, id: BlockId) -> Block {
        let node = &self.nodes[id.index()];
        Block {
            kind: node.kind.clone(),
            parameters: node.parameters.clone(),
            children: node
                .children
                .iter()
                .map(|child| self.to_block(*child))
                .collect(),
        }
    }

    /// Copies the root's children into detached blocks.
    pub fn to_blocks(&self) -> Vec<Block> {
        self.children(self.root)
            .iter()
            .map(|child| self.to_block(*child))
            .collect()
    }

    /// Number of nodes reachable from the root.
    pub fn len(&self) -> usize {
        self.descendants(self.root).count()
    }

    /// Check if the root has no children
    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    /// Number of nodes held by the arena, detached ones included.
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    /// Drops detached nodes from the arena and returns how many went.
    ///
    /// Every [`BlockId`] handed out before the call is invalidated.
    pub fn compact(&mut self) -> usize {
        let live = self.len();
        let dropped = self.nodes.len() - live;
        if dropped == 0 {
            return 0;
        }
        let mut compacted = Xdom::from_blocks(self.to_blocks());
        compacted.nodes[compacted.root.index()].parameters =
            std::mem::take(&mut self.nodes[self.root.index()].parameters);
        compacted.syntax = self.syntax.take();
        *self = compacted;
        dropped
    }
}

impl Default for Xdom {
    fn default() -> Self {
        Self::new()
    }
}

/// Structural equality of the reachable trees.
impl PartialEq for Xdom {
    fn eq(&self, other: &Self) -> bool {
        self.to_block(self.root) == other.to_block(other.root)
    }
}

/// Iterator over ancestors.
pub struct Ancestors<'a> {
    xdom: &'a Xdom,
    next: Option<BlockId>,
}

impl Iterator for Ancestors<'_> {
    type Item = BlockId;

    fn next(&mut self) -> Option<BlockId> {
        let current = self.next?;
        self.next = self.xdom.parent(current);
        Some(current)
    }
}

/// Pre-order iterator.
pub struct Descendants<'a> {
    xdom: &'a Xdom,
    stack: Vec<BlockId>,
}

impl Iterator for Descendants<'_> {
    type Item = BlockId;

    fn next(&mut self) -> Option<BlockId> {
        let current = self.stack.pop()?;
        if let Ok(children) = self.xdom.try_children(current) {
            self.stack.extend(children.iter().rev().copied());
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::MacroCall;

    fn sample() -> Xdom {
        Xdom::from_blocks(vec![
            Block::paragraph(Block::text("one two")),
            Block::macro_call(MacroCall::new("toc", false), Parameters::new()),
            Block::paragraph(Block::text("three")),
        ])
    }

    #[test]
    fn test_parent_links() {
        let xdom = sample();
        let root = xdom.root();
        for &child in xdom.children(root) {
            assert_eq!(xdom.parent(child), Some(root));
            for &grandchild in xdom.children(child) {
                assert_eq!(xdom.parent(grandchild), Some(child));
            }
        }
        assert_eq!(xdom.parent(root), None);
    }

    #[test]
    fn test_preorder() {
        let xdom = sample();
        let kinds: Vec<_> = xdom
            .descendants(xdom.root())
            .map(|id| xdom.kind(id).name())
            .collect();
        assert_eq!(
            kinds,
            vec![
                "document",
                "paragraph",
                "word",
                "space",
                "word",
                "macro",
                "paragraph",
                "word"
            ]
        );
    }

    #[test]
    fn test_replace_splices_in_place() {
        let mut xdom = sample();
        let macro_id = xdom.children(xdom.root())[1];
        let inserted = xdom
            .replace(
                macro_id,
                vec![
                    Block::paragraph(Block::text("a")),
                    Block::paragraph(Block::text("b")),
                ],
            )
            .unwrap();

        assert_eq!(inserted.len(), 2);
        assert_eq!(xdom.children(xdom.root()).len(), 4);
        assert_eq!(&xdom.children(xdom.root())[1..3], inserted.as_slice());
        assert!(!xdom.is_attached(macro_id));
        assert!(inserted.iter().all(|id| xdom.is_attached(*id)));
        assert_eq!(xdom.to_block(xdom.children(xdom.root())[3]).plain_text(), "three");
    }

    #[test]
    fn test_replace_root_is_rejected() {
        let mut xdom = sample();
        let root = xdom.root();
        assert_eq!(xdom.replace(root, vec![]), Err(XdomError::RootMutation));
    }

    #[test]
    fn test_replace_detached_is_rejected() {
        let mut xdom = sample();
        let first = xdom.children(xdom.root())[0];
        xdom.remove(first).unwrap();
        assert_eq!(xdom.remove(first), Err(XdomError::Detached(first)));
    }

    #[test]
    fn test_metadata_inheritance() {
        let xdom = Xdom::from_blocks(vec![Block::metadata(
            MetaData::new().with(MetaData::SOURCE, "A"),
            vec![Block::metadata(
                MetaData::new().with(MetaData::SOURCE, "B"),
                vec![Block::paragraph(Block::text("x"))],
            )],
        )]);
        let word = xdom
            .descendants(xdom.root())
            .find(|id| matches!(xdom.kind(*id), BlockKind::Word(_)))
            .unwrap();
        assert_eq!(xdom.metadata(word).get(MetaData::SOURCE), Some("B"));
        let sources: Vec<_> = xdom
            .ancestors(word)
            .filter_map(|id| match xdom.kind(id) {
                BlockKind::MetaData(m) => m.get(MetaData::SOURCE).map(str::to_string),
                _ => None,
            })
            .collect();
        assert_eq!(sources, vec!["B", "A"]);
    }

    #[test]
    fn test_structural_equality_ignores_arena_layout() {
        let mut edited = sample();
        let macro_id = edited.children(edited.root())[1];
        edited.remove(macro_id).unwrap();
        let fresh = Xdom::from_blocks(vec![
            Block::paragraph(Block::text("one two")),
            Block::paragraph(Block::text("three")),
        ]);
        assert_eq!(edited, fresh);
        assert_eq!(edited.to_blocks().len(), 2);
    }

    #[test]
    fn test_foreign_ids_are_reported() {
        let small = Xdom::new();
        let big = sample();
        let foreign = big.children(big.root())[2];

        assert!(!small.contains(foreign));
        assert_eq!(small.try_kind(foreign), Err(XdomError::UnknownBlock(foreign)));
        assert_eq!(small.try_children(foreign), Err(XdomError::UnknownBlock(foreign)));
        assert_eq!(small.parameter(foreign, "class"), None);
        assert_eq!(small.parent(foreign), None);
        assert!(!small.is_attached(foreign));
        assert_eq!(small.descendants(foreign).count(), 1);
        assert!(small.clone().remove(foreign).is_err());
    }

    #[test]
    fn test_compact_drops_detached_nodes() {
        let mut xdom = sample().with_syntax(Syntax::XWIKI_2_1);
        let root = xdom.root();
        xdom.parameters_mut(root).insert("class".to_string(), "page".to_string());
        for _ in 0..10 {
            let macro_id = xdom.children(root)[1];
            xdom.replace(
                macro_id,
                vec![Block::macro_call(MacroCall::new("toc", false), Parameters::new())],
            )
            .unwrap();
        }
        assert_eq!(xdom.arena_len(), xdom.len() + 10);

        let before = xdom.to_blocks();
        assert_eq!(xdom.compact(), 10);
        assert_eq!(xdom.arena_len(), xdom.len());
        assert_eq!(xdom.to_blocks(), before);
        assert_eq!(xdom.parameter(xdom.root(), "class"), Some("page"));
        assert_eq!(xdom.syntax(), Some(&Syntax::XWIKI_2_1));
        assert_eq!(xdom.compact(), 0);
    }
}
