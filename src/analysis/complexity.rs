//! Cyclomatic complexity.

use tree_sitter::Node;

use crate::program::syntax::{walk_preorder, WalkControl};

/// Node kinds that each add one decision point.
const BRANCH_KINDS: &[&str] = &[
    "if_statement",
    "ternary_expression",
    "for_statement",
    "for_in_statement",
    "while_statement",
    "do_statement",
    "switch_case",
    "catch_clause",
];

/// Short-circuit operators, in plain and assigning form.
const LOGICAL_OPERATORS: &[&str] = &["&&", "||", "??", "&&=", "||=", "??="];

/// McCabe-style complexity of everything under `node`.
///
/// Starts at 1 and adds one per conditional, loop, `case` label, `catch`
/// clause and short-circuit operator anywhere in the subtree. Nested
/// functions are counted into their parent rather than split out.
pub fn calculate_complexity(node: Node<'_>) -> usize {
    let mut complexity = 1;
    walk_preorder(node, |n| {
        let kind = n.kind();
        if BRANCH_KINDS.contains(&kind) || is_logical_operation(&n) {
            complexity += 1;
        }
        WalkControl::Continue
    });
    complexity
}

fn is_logical_operation(node: &Node<'_>) -> bool {
    match node.kind() {
        "binary_expression" | "augmented_assignment_expression" => node
            .child_by_field_name("operator")
            .is_some_and(|op| LOGICAL_OPERATORS.contains(&op.kind())),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    fn complexity_of(source: &str) -> usize {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_javascript::LANGUAGE.into())
            .unwrap();
        let tree = parser.parse(source, None).unwrap();
        calculate_complexity(tree.root_node())
    }

    #[test]
    fn test_straight_line_code_is_one() {
        assert_eq!(complexity_of("function f(a) { return a + 1; }"), 1);
    }

    #[test]
    fn test_branches_and_loops() {
        let source = r#"
function f(items) {
    for (const item of items) {
        if (item.ok) {
            continue;
        } else if (item.skip) {
            break;
        }
    }
    while (items.length) { items.pop(); }
    do { } while (false);
    return items.length ? 1 : 0;
}
"#;
        // for-of, if, else-if, while, do, ternary
        assert_eq!(complexity_of(source), 7);
    }

    #[test]
    fn test_switch_cases_count_each_label() {
        let source = r#"
function f(x) {
    switch (x) {
        case 1: return 'a';
        case 2: return 'b';
        case 3: return 'c';
        default: return 'z';
    }
}
"#;
        assert!(complexity_of(source) >= 1 + 3);
        assert_eq!(complexity_of(source), 4);
    }

    #[test]
    fn test_logical_operators_and_catch() {
        let source = r#"
function f(a, b) {
    try {
        a = a || b;
        b ??= a && b;
    } catch (e) {
        return null;
    }
    return a ?? b;
}
"#;
        // ||, ??=, &&, catch, ??
        assert_eq!(complexity_of(source), 6);
    }

    #[test]
    fn test_adding_a_branch_never_decreases() {
        let before = complexity_of("function f(a) { return a; }");
        let after = complexity_of("function f(a) { if (a) { return 1; } return a; }");
        assert!(after > before);
    }

    #[test]
    fn test_nested_functions_accumulate() {
        let source = "function outer(a) { if (a) {} const inner = () => { if (a) {} }; }";
        assert_eq!(complexity_of(source), 3);
    }
}
