//! Parse tree nodes, kept in a flat arena so the "parent back-reference
//! used only for walking, non-owning" requirement falls out naturally: a
//! parent is just another node's index, not an owning pointer.

use allstar_core::Token;

pub type NodeId = u32;

#[derive(Debug)]
pub struct RuleNode {
    pub rule_index: u32,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub start: Option<Token>,
    pub stop: Option<Token>,
    sealed: bool,
}

#[derive(Debug)]
pub struct TerminalNode {
    pub parent: Option<NodeId>,
    pub symbol: Token,
}

#[derive(Debug)]
pub struct ErrorNode {
    pub parent: Option<NodeId>,
    pub symbol: Token,
}

#[derive(Debug)]
pub enum ParseTreeNode {
    Rule(RuleNode),
    Terminal(TerminalNode),
    Error(ErrorNode),
}

impl ParseTreeNode {
    pub fn parent(&self) -> Option<NodeId> {
        match self {
            ParseTreeNode::Rule(r) => r.parent,
            ParseTreeNode::Terminal(t) => t.parent,
            ParseTreeNode::Error(e) => e.parent,
        }
    }
}

/// Owns every node created during one parse. Rule contexts are created on
/// rule entry, children are appended by `consume` as tokens and sub-rules
/// are matched, and a rule context is sealed on rule exit — after which its
/// child list is final.
#[derive(Default)]
pub struct ParseTree {
    nodes: Vec<ParseTreeNode>,
}

impl ParseTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> &ParseTreeNode {
        &self.nodes[id as usize]
    }

    pub fn enter_rule(&mut self, parent: Option<NodeId>, rule_index: u32) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(ParseTreeNode::Rule(RuleNode {
            rule_index,
            parent,
            children: Vec::new(),
            start: None,
            stop: None,
            sealed: false,
        }));
        if let Some(p) = parent {
            self.add_child(p, id);
        }
        id
    }

    pub fn exit_rule(&mut self, id: NodeId, stop: Option<Token>) {
        if let ParseTreeNode::Rule(r) = &mut self.nodes[id as usize] {
            r.stop = stop;
            r.sealed = true;
        }
    }

    pub fn add_terminal(&mut self, parent: NodeId, symbol: Token) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(ParseTreeNode::Terminal(TerminalNode {
            parent: Some(parent),
            symbol,
        }));
        self.add_child(parent, id);
        id
    }

    pub fn add_error(&mut self, parent: NodeId, symbol: Token) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(ParseTreeNode::Error(ErrorNode {
            parent: Some(parent),
            symbol,
        }));
        self.add_child(parent, id);
        id
    }

    fn add_child(&mut self, parent: NodeId, child: NodeId) {
        if let ParseTreeNode::Rule(r) = &mut self.nodes[parent as usize] {
            assert!(!r.sealed, "cannot add a child to a sealed rule context");
            r.children.push(child);
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.nodes[id as usize] {
            ParseTreeNode::Rule(r) => &r.children,
            _ => &[],
        }
    }

    /// Pre-order walk, calling `visit` with each node id before its children.
    pub fn walk(&self, root: NodeId, visit: &mut impl FnMut(NodeId, &ParseTreeNode)) {
        visit(root, self.node(root));
        for &child in self.children(root) {
            self.walk(child, visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(token_type: i32) -> Token {
        Token {
            token_type,
            channel: 0,
            start: 0,
            stop: 0,
            line: 1,
            column: 0,
            token_index: 0,
            text: None,
            source: None,
        }
    }

    #[test]
    fn rule_context_collects_children_in_order() {
        let mut tree = ParseTree::new();
        let root = tree.enter_rule(None, 0);
        tree.add_terminal(root, token(1));
        tree.add_terminal(root, token(2));
        tree.exit_rule(root, Some(token(2)));
        assert_eq!(tree.children(root).len(), 2);
    }

    #[test]
    #[should_panic(expected = "sealed")]
    fn adding_child_after_exit_panics() {
        let mut tree = ParseTree::new();
        let root = tree.enter_rule(None, 0);
        tree.exit_rule(root, None);
        tree.add_terminal(root, token(1));
    }

    #[test]
    fn walk_visits_preorder() {
        let mut tree = ParseTree::new();
        let root = tree.enter_rule(None, 0);
        let child = tree.enter_rule(Some(root), 1);
        tree.add_terminal(child, token(5));
        tree.exit_rule(child, None);
        tree.exit_rule(root, None);

        let mut order = Vec::new();
        tree.walk(root, &mut |id, _node| order.push(id));
        assert_eq!(order, vec![root, child, child + 1]);
    }

    #[test]
    fn error_node_records_offending_symbol() {
        let mut tree = ParseTree::new();
        let root = tree.enter_rule(None, 0);
        let err = tree.add_error(root, token(99));
        match tree.node(err) {
            ParseTreeNode::Error(e) => assert_eq!(e.symbol.token_type, 99),
            _ => panic!("expected error node"),
        }
    }
}
