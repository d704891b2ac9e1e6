//! Diagnostic outline of a query AST.

use std::fmt::Write;

/// A node of the query AST.
pub trait QueryAstNode {
    /// A short description of the node.
    fn name(&self) -> String;
    fn children(&self) -> Vec<&dyn QueryAstNode>;
}

/// Render an indented outline of the tree rooted at `node`.
pub fn print_tree(node: &dyn QueryAstNode) -> String {
    let mut out = String::new();
    print_node(node, 0, &mut out);
    out
}

fn print_node(node: &dyn QueryAstNode, depth: usize, out: &mut String) {
    // Writing to a String cannot fail.
    let _ = writeln!(out, "{}{}", "    ".repeat(depth), node.name());
    for child in node.children() {
        print_node(child, depth + 1, out);
    }
}
