//! Concrete syntax tree consumed by the tree walker.
//!
//! The host normally owns parsing and hands the engine a tree; `SyntaxTree`
//! is the shape the engine expects. `SyntaxTree::parse` builds one from
//! markdown-weaver offset events for hosts (and tests) without their own
//! incremental parser.

use std::ops::Range;

use markdown_weaver::{CodeBlockKind, Event, Options, Parser, Tag};
use smol_str::SmolStr;

/// Index of a node inside its tree.
pub type NodeId = usize;

/// Node kinds the engine decorates. Everything else is `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Heading { level: u8 },
    BlockQuote,
    CodeBlock { fenced: bool, info: SmolStr },
    List { ordered: bool },
    Item,
    TaskMarker { checked: bool },
    Emphasis,
    Strong,
    Strikethrough,
    InlineCode,
    Link { dest: SmolStr },
    Image { dest: SmolStr },
    Rule,
    Table,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    /// Source byte range, delimiters included.
    pub range: Range<usize>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Nodes stored in document pre-order; index 0 is the document root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    nodes: Vec<SyntaxNode>,
    /// Inline code and code block ranges, sorted and merged.
    code: Vec<Range<usize>>,
    /// Node starts never decrease in pre-order, so range queries can
    /// binary search.
    sorted: bool,
}

/// Parser options matching the constructs the walker understands.
pub fn default_md_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
}

impl SyntaxTree {
    /// Parse `source` into a tree.
    pub fn parse(source: &str) -> Self {
        let parser = Parser::new_ext(source, default_md_options()).into_offset_iter();
        Self::from_events(source.len(), parser)
    }

    /// Build a tree from any offset-annotated event stream.
    pub fn from_events<'a, I>(len: usize, events: I) -> Self
    where
        I: Iterator<Item = (Event<'a>, Range<usize>)>,
    {
        let mut tree = Self {
            nodes: vec![SyntaxNode {
                kind: NodeKind::Document,
                range: 0..len,
                parent: None,
                children: Vec::new(),
            }],
            code: Vec::new(),
            sorted: true,
        };
        let mut stack: Vec<NodeId> = vec![0];

        for (event, range) in events {
            match event {
                Event::Start(tag) => {
                    let kind = classify_tag(&tag);
                    let id = tree.push(kind, range, stack.last().copied());
                    stack.push(id);
                }
                Event::End(_) => {
                    // Never pop the root, even on an unbalanced stream.
                    if stack.len() > 1 {
                        stack.pop();
                    }
                }
                Event::Code(_) => {
                    tree.push(NodeKind::InlineCode, range, stack.last().copied());
                }
                Event::Rule => {
                    tree.push(NodeKind::Rule, range, stack.last().copied());
                }
                Event::TaskListMarker(checked) => {
                    tree.push(
                        NodeKind::TaskMarker { checked },
                        range,
                        stack.last().copied(),
                    );
                }
                _ => {}
            }
        }

        tree.sorted = tree
            .nodes
            .windows(2)
            .all(|pair| pair[0].range.start <= pair[1].range.start);
        tree.code = merge_ranges(
            tree.nodes
                .iter()
                .filter(|n| matches!(n.kind, NodeKind::InlineCode | NodeKind::CodeBlock { .. }))
                .map(|n| n.range.clone())
                .collect(),
        );

        tracing::trace!(
            target: "weaver::live_preview::tree",
            nodes = tree.nodes.len(),
            code = tree.code.len(),
            sorted = tree.sorted,
            "built syntax tree"
        );
        tree
    }

    fn push(&mut self, kind: NodeKind, range: Range<usize>, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(SyntaxNode {
            kind,
            range,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent].children.push(id);
        }
        id
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// All nodes in document order with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SyntaxNode)> {
        self.nodes.iter().enumerate()
    }

    /// Ancestors of a node, nearest first, excluding the node itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.nodes[id].parent, move |&p| self.nodes[p].parent)
    }

    /// Descendants of a node in document order, excluding the node itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[id].children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next].children.iter().rev().copied());
        }
        out
    }

    /// Nesting depth of a node among nodes of the same kind: 1 for a node
    /// with no same-kind ancestor, clamped to `max`.
    pub fn nesting_depth(&self, id: NodeId, max: u8) -> u8 {
        let kind = std::mem::discriminant(&self.nodes[id].kind);
        let same = self
            .ancestors(id)
            .filter(|&a| std::mem::discriminant(&self.nodes[a].kind) == kind)
            .count();
        (same + 1).min(max.max(1) as usize) as u8
    }

    /// Byte ranges of inline code spans and code blocks, sorted and
    /// disjoint. Scanner passes skip matches that start inside these.
    pub fn code_ranges(&self) -> &[Range<usize>] {
        &self.code
    }

    /// Nodes touching any of `ranges`, in document order. Touching at a
    /// boundary counts. Cost follows the number of nodes inside the ranges
    /// plus the depth of the nodes enclosing them.
    pub fn touching(&self, ranges: &[Range<usize>]) -> Vec<NodeId> {
        let touches = |node: &SyntaxNode, r: &Range<usize>| {
            node.range.start <= r.end && node.range.end >= r.start
        };
        if !self.sorted {
            return self
                .iter()
                .filter(|(_, node)| ranges.iter().any(|r| touches(node, r)))
                .map(|(id, _)| id)
                .collect();
        }

        let mut ids = Vec::new();
        for r in ranges {
            let first = self.nodes.partition_point(|n| n.range.start < r.start);
            let last = self.nodes.partition_point(|n| n.range.start <= r.end);
            // Anything opened before the range and still open inside it
            // encloses the last node that starts before the range.
            if let Some(before) = first.checked_sub(1) {
                ids.extend(
                    std::iter::once(before)
                        .chain(self.ancestors(before))
                        .filter(|&id| touches(&self.nodes[id], r)),
                );
            }
            ids.extend(first..last.max(first));
        }
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

fn classify_tag(tag: &Tag<'_>) -> NodeKind {
    match tag {
        Tag::Heading { level, .. } => NodeKind::Heading {
            level: *level as u8,
        },
        Tag::BlockQuote(_) => NodeKind::BlockQuote,
        Tag::CodeBlock(CodeBlockKind::Fenced(info)) => NodeKind::CodeBlock {
            fenced: true,
            info: SmolStr::new(info.as_ref()),
        },
        Tag::CodeBlock(CodeBlockKind::Indented) => NodeKind::CodeBlock {
            fenced: false,
            info: SmolStr::default(),
        },
        Tag::List(start) => NodeKind::List {
            ordered: start.is_some(),
        },
        Tag::Item => NodeKind::Item,
        Tag::Emphasis => NodeKind::Emphasis,
        Tag::Strong => NodeKind::Strong,
        Tag::Strikethrough => NodeKind::Strikethrough,
        Tag::Link { dest_url, .. } => NodeKind::Link {
            dest: SmolStr::new(dest_url.as_ref()),
        },
        Tag::Image { dest_url, .. } => NodeKind::Image {
            dest: SmolStr::new(dest_url.as_ref()),
        },
        Tag::Table(_) => NodeKind::Table,
        _ => NodeKind::Other,
    }
}

/// Whether a byte offset falls inside any of the sorted, disjoint ranges.
pub fn in_ranges(ranges: &[Range<usize>], offset: usize) -> bool {
    let upper = ranges.partition_point(|r| r.start <= offset);
    upper > 0 && ranges[upper - 1].contains(&offset)
}

/// Sort ranges and merge the ones that overlap, ready for [`in_ranges`].
pub fn merge_ranges(mut ranges: Vec<Range<usize>>) -> Vec<Range<usize>> {
    ranges.retain(|r| !r.is_empty());
    ranges.sort_by_key(|r| r.start);
    let mut merged: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tree: &SyntaxTree) -> Vec<NodeKind> {
        tree.iter().map(|(_, n)| n.kind.clone()).collect()
    }

    #[test]
    fn test_parse_inline_nodes() {
        let src = "Buy **milk** and `eggs`";
        let tree = SyntaxTree::parse(src);
        let strong = tree
            .iter()
            .find(|(_, n)| n.kind == NodeKind::Strong)
            .map(|(_, n)| n.range.clone())
            .unwrap();
        assert_eq!(&src[strong], "**milk**");

        let code = tree
            .iter()
            .find(|(_, n)| n.kind == NodeKind::InlineCode)
            .map(|(_, n)| n.range.clone())
            .unwrap();
        assert_eq!(&src[code], "`eggs`");
    }

    #[test]
    fn test_heading_and_fence() {
        let tree = SyntaxTree::parse("### Title\n\n```rust\nfn main() {}\n```\n");
        let kinds = kinds(&tree);
        assert!(kinds.contains(&NodeKind::Heading { level: 3 }));
        assert!(kinds.contains(&NodeKind::CodeBlock {
            fenced: true,
            info: "rust".into()
        }));
    }

    #[test]
    fn test_nesting_depth() {
        let src = "- a\n  - b\n    - c\n";
        let tree = SyntaxTree::parse(src);
        let depths: Vec<u8> = tree
            .iter()
            .filter(|(_, n)| n.kind == NodeKind::Item)
            .map(|(id, _)| tree.nesting_depth(id, 4))
            .collect();
        assert_eq!(depths, vec![1, 2, 3]);

        let clamped: Vec<u8> = tree
            .iter()
            .filter(|(_, n)| n.kind == NodeKind::Item)
            .map(|(id, _)| tree.nesting_depth(id, 2))
            .collect();
        assert_eq!(clamped, vec![1, 2, 2]);
    }

    #[test]
    fn test_task_marker_node() {
        let tree = SyntaxTree::parse("- [x] done\n");
        assert!(kinds(&tree).contains(&NodeKind::TaskMarker { checked: true }));
    }

    #[test]
    fn test_code_ranges() {
        let src = "a `b` c\n\n```\nx\n```\n";
        let tree = SyntaxTree::parse(src);
        let ranges = tree.code_ranges();
        assert_eq!(ranges.len(), 2);
        assert_eq!(&src[ranges[0].clone()], "`b`");
        assert!(in_ranges(&ranges, 3));
        assert!(!in_ranges(&ranges, 6));
        assert!(in_ranges(&ranges, 10));
    }

    #[test]
    fn test_merge_ranges() {
        let merged = merge_ranges(vec![10..20, 0..5, 15..25, 3..4, 30..30]);
        assert_eq!(merged, vec![0..5, 10..25]);
        assert!(in_ranges(&merged, 24));
        assert!(!in_ranges(&merged, 25));
        assert!(!in_ranges(&merged, 7));
    }

    #[test]
    fn test_touching_finds_enclosing_nodes() {
        let src = "> quote one\n> **two** here\n> three\n\nafter *x*\n";
        let tree = SyntaxTree::parse(src);
        let start = src.find("two").unwrap();
        let ids = tree.touching(&[start..start + 3]);
        let kinds: Vec<&NodeKind> = ids.iter().map(|&id| &tree.node(id).kind).collect();
        assert!(kinds.contains(&&NodeKind::Document));
        assert!(kinds.contains(&&NodeKind::BlockQuote));
        assert!(kinds.contains(&&NodeKind::Strong));
        assert!(!kinds.contains(&&NodeKind::Emphasis));

        // Same answer as checking every node.
        let everything: Vec<NodeId> = tree
            .iter()
            .filter(|(_, n)| n.range.start <= start + 3 && n.range.end >= start)
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, everything);
    }
}
