//! Small helpers over tree-sitter syntax trees.
//!
//! All traversal here is iterative (a single `TreeCursor`), so very deep
//! files cannot overflow the stack.

use tree_sitter::Node;

/// Node kinds that carry a name we track for usage purposes.
pub const IDENTIFIER_KINDS: &[&str] = &[
    "identifier",
    "type_identifier",
    "property_identifier",
    "shorthand_property_identifier",
    "shorthand_property_identifier_pattern",
];

/// JSX node kinds that mark a function body as rendering UI.
pub const JSX_KINDS: &[&str] = &["jsx_element", "jsx_self_closing_element"];

/// Node kinds that bind a closure when used as a variable initializer.
pub const CLOSURE_KINDS: &[&str] = &[
    "arrow_function",
    "function_expression",
    "function",
    "generator_function",
];

/// Returns true if the node kind is identifier-shaped.
pub fn is_identifier_kind(kind: &str) -> bool {
    IDENTIFIER_KINDS.contains(&kind)
}

/// What the walker should do after visiting a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkControl {
    Continue,
    SkipChildren,
}

/// Visits `root` and its descendants in pre-order.
pub fn walk_preorder<'t, F>(root: Node<'t>, mut visit: F)
where
    F: FnMut(Node<'t>) -> WalkControl,
{
    let mut cursor = root.walk();
    let mut descend = true;
    loop {
        if descend && visit(cursor.node()) == WalkControl::Continue && cursor.goto_first_child() {
            continue;
        }
        if cursor.goto_next_sibling() {
            descend = true;
            continue;
        }
        if !cursor.goto_parent() {
            break;
        }
        descend = false;
    }
}

/// Calls `f` with the text of every identifier-shaped token under `root`.
pub fn for_each_identifier<'s, F>(root: Node<'_>, source: &'s str, mut f: F)
where
    F: FnMut(&'s str, Node<'_>),
{
    walk_preorder(root, |node| {
        if is_identifier_kind(node.kind()) {
            if let Some(text) = node_text(&node, source) {
                f(text, node);
            }
        }
        WalkControl::Continue
    });
}

/// Returns true if any node under `root` has one of the given kinds.
pub fn contains_kind(root: Node<'_>, kinds: &[&str]) -> bool {
    let mut found = false;
    walk_preorder(root, |node| {
        if found {
            return WalkControl::SkipChildren;
        }
        if kinds.contains(&node.kind()) {
            found = true;
            return WalkControl::SkipChildren;
        }
        WalkControl::Continue
    });
    found
}

/// Extract the text content of a node.
pub fn node_text<'a>(node: &Node<'_>, source: &'a str) -> Option<&'a str> {
    source.get(node.start_byte()..node.end_byte())
}

/// Extract string value (removes quotes).
pub fn string_value(node: &Node<'_>, source: &str) -> Option<String> {
    let text = node_text(node, source)?;
    let trimmed = text
        .trim_start_matches(['"', '\'', '`'])
        .trim_end_matches(['"', '\'', '`']);
    Some(trimmed.to_string())
}

/// 1-based line of the node's first byte.
pub fn start_line(node: &Node<'_>) -> usize {
    node.start_position().row + 1
}

/// 1-based line of the node's last byte.
pub fn end_line(node: &Node<'_>) -> usize {
    node.end_position().row + 1
}

/// Returns true if the node has an anonymous child token of the given kind
/// (e.g. the `default` keyword of an export statement).
pub fn has_token(node: &Node<'_>, kind: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|child| child.kind() == kind);
    found
}

/// Strips wrappers that do not change what an initializer evaluates to:
/// parentheses and TypeScript `as` / `satisfies` / `!` expressions.
pub fn unwrap_expression(mut node: Node<'_>) -> Node<'_> {
    loop {
        match node.kind() {
            "parenthesized_expression" | "as_expression" | "satisfies_expression"
            | "non_null_expression" => match node.named_child(0) {
                Some(inner) => node = inner,
                None => return node,
            },
            _ => return node,
        }
    }
}

/// Returns true if an initializer binds a closure, directly or wrapped in a
/// call such as `memo(() => ...)` or `forwardRef(function (props, ref) {...})`.
pub fn is_closure_initializer(node: Node<'_>) -> bool {
    let node = unwrap_expression(node);
    if CLOSURE_KINDS.contains(&node.kind()) {
        return true;
    }
    if node.kind() != "call_expression" {
        return false;
    }
    let Some(args) = node.child_by_field_name("arguments") else {
        return false;
    };
    let mut cursor = args.walk();
    let wrapped = args
        .named_children(&mut cursor)
        .any(|arg| CLOSURE_KINDS.contains(&unwrap_expression(arg).kind()));
    wrapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    fn parse(source: &str) -> tree_sitter::Tree {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_javascript::LANGUAGE.into())
            .unwrap();
        parser.parse(source, None).unwrap()
    }

    #[test]
    fn test_walk_visits_every_node_once() {
        let source = "const a = b + c;";
        let tree = parse(source);
        let mut count = 0;
        walk_preorder(tree.root_node(), |_| {
            count += 1;
            WalkControl::Continue
        });
        let mut expected = 0;
        let mut stack = vec![tree.root_node()];
        while let Some(node) = stack.pop() {
            expected += 1;
            let mut cursor = node.walk();
            stack.extend(node.children(&mut cursor));
        }
        assert_eq!(count, expected);
    }

    #[test]
    fn test_skip_children() {
        let source = "import { a } from 'x'; const b = a;";
        let tree = parse(source);
        let mut names = Vec::new();
        walk_preorder(tree.root_node(), |node| {
            if node.kind() == "import_statement" {
                return WalkControl::SkipChildren;
            }
            if node.kind() == "identifier" {
                names.push(node_text(&node, source).unwrap().to_string());
            }
            WalkControl::Continue
        });
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_for_each_identifier_includes_properties() {
        let source = "obj.method({ short });";
        let tree = parse(source);
        let mut names = Vec::new();
        for_each_identifier(tree.root_node(), source, |name, _| names.push(name));
        assert_eq!(names, vec!["obj", "method", "short"]);
    }

    #[test]
    fn test_closure_initializers() {
        let source = "const a = () => 1; const b = memo(function () {}); const c = 5;";
        let tree = parse(source);
        let root = tree.root_node();
        let mut results = Vec::new();
        walk_preorder(root, |node| {
            if node.kind() == "variable_declarator" {
                let value = node.child_by_field_name("value").unwrap();
                results.push(is_closure_initializer(value));
            }
            WalkControl::Continue
        });
        assert_eq!(results, vec![true, true, false]);
    }

    #[test]
    fn test_contains_jsx() {
        let source = "function A() { return <div><B /></div>; }";
        let tree = parse(source);
        assert!(contains_kind(tree.root_node(), JSX_KINDS));

        let plain = parse("function a() { return 1; }");
        assert!(!contains_kind(plain.root_node(), JSX_KINDS));
    }
}
