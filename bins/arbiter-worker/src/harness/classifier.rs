/// Structure classification for harness synthesis
///
/// **Core Responsibility:** decide which pointer-based structures the harness
/// must build from array inputs, per parameter, and whether the entry point
/// mutates its first argument instead of returning a value.
///
/// Resolution per parameter, first match wins:
/// 1. the declared type annotation
/// 2. a parameter-name convention backed by a global structure signal
/// 3. the single global signal, when the entry point has one parameter

use super::entry::EntryPoint;
use serde::Serialize;

/// Kind of value a harness must construct for one parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    #[default]
    Plain,
    LinkedList,
    /// A list of linked lists, e.g. the input of a k-way merge
    LinkedListArray,
    Tree,
    Graph,
}

/// Helper types the user already defines and the harness must not redefine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserDefinitions {
    pub list_node: bool,
    pub tree_node: bool,
    pub graph_node: bool,
    pub interval: bool,
}

/// Classification result consumed by the renderers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructureRequirement {
    pub uses_linked_list: bool,
    pub uses_tree: bool,
    pub uses_graph: bool,
    pub uses_interval: bool,
    /// The signature declares an in-place mutation of the first argument
    pub is_in_place_modification: bool,
    /// Only the entry-point name suggests in-place mutation; the harness
    /// reports the first argument when the call returns nothing
    pub may_modify_in_place: bool,
    /// One entry per formatted input, in parameter order
    pub param_kinds: Vec<ParamKind>,
    pub user_defined: UserDefinitions,
}

impl StructureRequirement {
    pub fn kind_of(&self, index: usize) -> ParamKind {
        self.param_kinds.get(index).copied().unwrap_or_default()
    }

    pub fn needs_helpers(&self) -> bool {
        self.uses_linked_list || self.uses_tree || self.uses_graph || self.uses_interval
    }
}

/// Entry points that often mutate their first argument in place
///
/// Only consulted when the entry point declares no return type. Some names
/// (`merge`, `rotate`) also belong to problems that return a new value.
pub const IN_PLACE_ENTRY_POINTS: &[&str] = &[
    "sortColors", "rotate", "solveSudoku", "moveZeroes", "reverseString", "setZeroes",
    "nextPermutation", "merge", "wiggleSort", "gameOfLife", "flatten", "reorderList",
    "duplicateZeros", "recoverTree",
];

const LIST_PARAM_NAMES: &[&str] = &["head", "l1", "l2", "list1", "list2", "heada", "headb", "list"];
const LIST_ARRAY_PARAM_NAMES: &[&str] = &["lists"];
const TREE_PARAM_NAMES: &[&str] = &["root", "root1", "root2", "subroot", "tree", "t1", "t2"];
const GRAPH_PARAM_NAMES: &[&str] = &["node", "graph_node", "start"];
const MATRIX_PARAM_NAMES: &[&str] = &["matrix", "grid", "board", "mat", "image"];

/// True when `word` appears in `text` delimited by non-identifier characters
pub fn contains_word(text: &str, word: &str) -> bool {
    let is_ident = |c: char| c.is_alphanumeric() || c == '_';
    text.match_indices(word).any(|(at, _)| {
        let before = text[..at].chars().next_back();
        let after = text[at + word.len()..].chars().next();
        !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
    })
}

pub(super) fn defines_class(code: &str, name: &str) -> bool {
    code.lines().any(|line| {
        let trimmed = line.trim_start();
        // Commented-out scaffolding does not count
        let Some(rest) = trimmed
            .strip_prefix("class ")
            .or_else(|| trimmed.strip_prefix("function "))
        else {
            return false;
        };
        let declared: String = rest.chars().take_while(|c| c.is_alphanumeric() || *c == '_').collect();
        declared == name
    })
}

fn annotation_kind(annotation: &str) -> ParamKind {
    let is_collection = ["List[", "list[", "[]", "Array<", "Sequence["]
        .iter()
        .any(|m| annotation.contains(m));
    if contains_word(annotation, "ListNode") {
        if is_collection {
            ParamKind::LinkedListArray
        } else {
            ParamKind::LinkedList
        }
    } else if contains_word(annotation, "TreeNode") {
        ParamKind::Tree
    } else if (contains_word(annotation, "Node") || contains_word(annotation, "_Node")) && !is_collection {
        ParamKind::Graph
    } else {
        ParamKind::Plain
    }
}

/// Classify the structures an entry point needs
pub fn classify(user_code: &str, entry: &EntryPoint, arity: usize) -> StructureRequirement {
    let user_defined = UserDefinitions {
        list_node: defines_class(user_code, "ListNode"),
        tree_node: defines_class(user_code, "TreeNode"),
        graph_node: defines_class(user_code, "Node"),
        interval: defines_class(user_code, "Interval"),
    };

    let entry_lower = entry.name.to_lowercase();
    let names: Vec<String> = entry.params.iter().map(|p| p.name.to_lowercase()).collect();

    let matrix_shaped = names.iter().any(|n| MATRIX_PARAM_NAMES.contains(&n.as_str()));
    let interval_shaped = contains_word(user_code, "Interval")
        || names.iter().any(|n| n == "intervals" || n == "newinterval");

    let list_signal = contains_word(user_code, "ListNode");
    let tree_signal = contains_word(user_code, "TreeNode");
    // `Node` alone, never the tail of ListNode/TreeNode/TrieNode
    let graph_signal = contains_word(user_code, "Node")
        || contains_word(user_code, "_Node")
        || (entry_lower.contains("clone") && names.iter().any(|n| n == "node"));
    let list_name_signal = (entry_lower.contains("merge") || entry_lower.contains("reverse"))
        && names.iter().any(|n| LIST_PARAM_NAMES.contains(&n.as_str()));

    let uses_linked_list = (list_signal || list_name_signal) && !matrix_shaped && !interval_shaped;
    let uses_tree = tree_signal;
    let uses_graph = graph_signal;
    let uses_interval = contains_word(user_code, "Interval");

    let mut param_kinds: Vec<ParamKind> = (0..arity)
        .map(|i| {
            let Some(param) = entry.params.get(i) else {
                return ParamKind::Plain;
            };
            if let Some(annotation) = &param.annotation {
                return annotation_kind(annotation);
            }
            let name = param.name.to_lowercase();
            if uses_linked_list && LIST_PARAM_NAMES.contains(&name.as_str()) {
                ParamKind::LinkedList
            } else if uses_linked_list && LIST_ARRAY_PARAM_NAMES.contains(&name.as_str()) {
                ParamKind::LinkedListArray
            } else if uses_tree && TREE_PARAM_NAMES.contains(&name.as_str()) {
                ParamKind::Tree
            } else if uses_graph && GRAPH_PARAM_NAMES.contains(&name.as_str()) {
                ParamKind::Graph
            } else {
                ParamKind::Plain
            }
        })
        .collect();

    // Single unannotated parameter: fall back to the global signal, by priority
    let unannotated = entry.params.first().map(|p| p.annotation.is_none()).unwrap_or(true);
    if arity == 1 && unannotated && param_kinds[0] == ParamKind::Plain && !matrix_shaped {
        param_kinds[0] = if uses_tree {
            ParamKind::Tree
        } else if uses_linked_list {
            ParamKind::LinkedList
        } else if uses_graph && (!user_defined.graph_node || entry_lower.contains("clone")) {
            // A user-defined `Node` is usually a private helper, not the input
            ParamKind::Graph
        } else {
            ParamKind::Plain
        };
    }

    let requirement = StructureRequirement {
        uses_linked_list: uses_linked_list
            || param_kinds
                .iter()
                .any(|k| matches!(k, ParamKind::LinkedList | ParamKind::LinkedListArray)),
        uses_tree: uses_tree || param_kinds.contains(&ParamKind::Tree),
        uses_graph: uses_graph || param_kinds.contains(&ParamKind::Graph),
        uses_interval,
        is_in_place_modification: declares_in_place(entry),
        may_modify_in_place: !declares_in_place(entry) && in_place_by_name(entry),
        param_kinds,
        user_defined,
    };

    tracing::debug!(
        entry_point = %entry.name,
        kinds = ?requirement.param_kinds,
        in_place = requirement.is_in_place_modification,
        maybe_in_place = requirement.may_modify_in_place,
        "Classified structures"
    );

    requirement
}

/// True when the signature itself says the first argument is mutated
pub fn declares_in_place(entry: &EntryPoint) -> bool {
    if entry.doc.to_lowercase().contains("do not return anything") {
        return true;
    }
    matches!(
        entry.return_annotation.as_deref().map(str::trim),
        Some("None") | Some("void") | Some("undefined")
    )
}

/// True when an entry point without a return type has an in-place name
pub fn in_place_by_name(entry: &EntryPoint) -> bool {
    entry.return_annotation.is_none() && IN_PLACE_ENTRY_POINTS.contains(&entry.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::entry::find_entry_point;
    use arbiter_common::types::Language;

    fn classify_python(code: &str, arity: usize) -> StructureRequirement {
        let entry = find_entry_point(code, Language::Python, None);
        classify(code, &entry, arity)
    }

    #[test]
    fn test_plain_array_problem() {
        let code = "class Solution:\n    def twoSum(self, nums: List[int], target: int) -> List[int]:\n        return []\n";
        let req = classify_python(code, 2);
        assert_eq!(req.param_kinds, vec![ParamKind::Plain, ParamKind::Plain]);
        assert!(!req.needs_helpers());
        assert!(!req.is_in_place_modification);
    }

    #[test]
    fn test_linked_list_by_annotation() {
        let code = "class Solution:\n    def mergeTwoLists(self, list1: Optional[ListNode], list2: Optional[ListNode]) -> Optional[ListNode]:\n        return list1\n";
        let req = classify_python(code, 2);
        assert_eq!(req.param_kinds, vec![ParamKind::LinkedList, ParamKind::LinkedList]);
        assert!(req.uses_linked_list);
        assert!(!req.uses_tree);
        assert!(!req.uses_graph);
    }

    #[test]
    fn test_list_of_linked_lists() {
        let code = "class Solution:\n    def mergeKLists(self, lists: List[Optional[ListNode]]) -> Optional[ListNode]:\n        return None\n";
        let req = classify_python(code, 1);
        assert_eq!(req.param_kinds, vec![ParamKind::LinkedListArray]);
    }

    #[test]
    fn test_mixed_list_and_tree() {
        let code = "class Solution:\n    def sortedListToBST(self, head: Optional[ListNode]) -> Optional[TreeNode]:\n        return None\n";
        let req = classify_python(code, 1);
        assert_eq!(req.param_kinds, vec![ParamKind::LinkedList]);
        assert!(req.uses_linked_list);
        assert!(req.uses_tree);
    }

    #[test]
    fn test_tree_by_name_convention() {
        let code = "# class TreeNode:\n#     def __init__(self, val=0):\n\nclass Solution:\n    def maxDepth(self, root):\n        return 0\n";
        let req = classify_python(code, 1);
        assert_eq!(req.param_kinds, vec![ParamKind::Tree]);
        assert!(!req.user_defined.tree_node);
    }

    #[test]
    fn test_single_param_falls_back_to_global_signal() {
        let code = "class Solution:\n    def countNodes(self, x):\n        # walks TreeNode children\n        return 0\n";
        let req = classify_python(code, 1);
        assert_eq!(req.param_kinds, vec![ParamKind::Tree]);
    }

    #[test]
    fn test_graph_node_not_confused_with_list_node() {
        let code = "class Solution:\n    def cloneGraph(self, node: Optional['Node']) -> Optional['Node']:\n        return node\n";
        let req = classify_python(code, 1);
        assert_eq!(req.param_kinds, vec![ParamKind::Graph]);
        assert!(!req.uses_linked_list);

        let code = "class Solution:\n    def reverseList(self, head: Optional[ListNode]) -> Optional[ListNode]:\n        return head\n";
        let req = classify_python(code, 1);
        assert!(!req.uses_graph);
    }

    #[test]
    fn test_merge_on_intervals_is_not_linked_list() {
        let code = "class Solution:\n    def merge(self, intervals):\n        return intervals\n";
        let req = classify_python(code, 1);
        assert!(!req.uses_linked_list);
        assert_eq!(req.param_kinds, vec![ParamKind::Plain]);
    }

    #[test]
    fn test_reverse_name_heuristic_without_types() {
        let code = "class Solution:\n    def reverseList(self, head):\n        return head\n";
        let req = classify_python(code, 1);
        assert!(req.uses_linked_list);
        assert_eq!(req.param_kinds, vec![ParamKind::LinkedList]);
    }

    #[test]
    fn test_user_defined_helpers_detected() {
        let code = "class ListNode:\n    def __init__(self, val=0, next=None):\n        self.val = val\n        self.next = next\n\nclass Solution:\n    def middleNode(self, head: ListNode) -> ListNode:\n        return head\n";
        let req = classify_python(code, 1);
        assert!(req.user_defined.list_node);
        assert!(!req.user_defined.tree_node);
    }

    #[test]
    fn test_in_place_signature_first() {
        let code = "class Solution:\n    def rotate(self, matrix: List[List[int]]) -> None:\n        pass\n";
        assert!(classify_python(code, 1).is_in_place_modification);

        let code = "class Solution:\n    def rotate(self, nums: List[int], k: int) -> List[int]:\n        return nums\n";
        assert!(!classify_python(code, 2).is_in_place_modification);

        let code = "class Solution:\n    def sortColors(self, nums):\n        nums.sort()\n";
        let req = classify_python(code, 1);
        assert!(!req.is_in_place_modification);
        assert!(req.may_modify_in_place);

        let code = "class Solution:\n    def shuffle(self, nums):\n        \"\"\"\n        Do not return anything, modify nums in-place instead.\n        \"\"\"\n        pass\n";
        assert!(classify_python(code, 1).is_in_place_modification);
    }

    #[test]
    fn test_unannotated_merge_is_only_possibly_in_place() {
        let code = "class Solution:\n    def merge(self, intervals):\n        out = []\n        for iv in sorted(intervals):\n            out.append(iv)\n        return out\n";
        let req = classify_python(code, 1);
        assert!(!req.is_in_place_modification);
        assert!(req.may_modify_in_place);

        let code = "class Solution:\n    def merge(self, nums1: List[int], m: int, nums2: List[int], n: int) -> None:\n        pass\n";
        let req = classify_python(code, 4);
        assert!(req.is_in_place_modification);
        assert!(!req.may_modify_in_place);

        let code = "class Solution:\n    def merge(self, intervals: List[List[int]]) -> List[List[int]]:\n        return intervals\n";
        let req = classify_python(code, 1);
        assert!(!req.is_in_place_modification);
        assert!(!req.may_modify_in_place);
    }

    #[test]
    fn test_js_underscore_node_template_is_graph() {
        let code = r#"/**
 * // Definition for a _Node.
 * function _Node(val, neighbors) {
 *    this.val = val === undefined ? 0 : val;
 *    this.neighbors = neighbors === undefined ? [] : neighbors;
 * };
 */

/**
 * @param {_Node} node
 * @return {_Node}
 */
var cloneGraph = function(node) {
    return node;
};
"#;
        let entry = find_entry_point(code, Language::JavaScript, None);
        let req = classify(code, &entry, 1);
        assert_eq!(req.param_kinds, vec![ParamKind::Graph]);
        assert!(req.uses_graph);
        assert!(!req.user_defined.graph_node);
        assert!(!defines_class(code, "_Node"));
    }

    #[test]
    fn test_matrix_problem_stays_plain() {
        let code = "class Solution:\n    def numIslands(self, grid):\n        return 0\n";
        let req = classify_python(code, 1);
        assert_eq!(req.param_kinds, vec![ParamKind::Plain]);
    }

    #[test]
    fn test_contains_word() {
        assert!(contains_word("x: Node = None", "Node"));
        assert!(!contains_word("x: ListNode", "Node"));
        assert!(!contains_word("TrieNode()", "Node"));
        assert!(contains_word("Optional['Node']", "Node"));
    }
}
