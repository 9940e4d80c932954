// Python harness rendering.
// Layout: imports, helper types, converters, serializer, user code, main block.

use super::classifier::{ParamKind, StructureRequirement};
use super::entry::{self, EntryPoint};
use serde_json::Value;

const IMPORTS: &str = r#"import json
import sys
import copy
import math
import heapq
import bisect
import itertools
import functools
import collections
from typing import *
from collections import deque, defaultdict, Counter, OrderedDict
"#;

const LIST_NODE: &str = r#"
class ListNode:
    def __init__(self, val=0, next=None):
        self.val = val
        self.next = next
"#;

const TREE_NODE: &str = r#"
class TreeNode:
    def __init__(self, val=0, left=None, right=None):
        self.val = val
        self.left = left
        self.right = right
"#;

const GRAPH_NODE: &str = r#"
class Node:
    def __init__(self, val=0, neighbors=None):
        self.val = val
        self.neighbors = neighbors if neighbors is not None else []
"#;

const INTERVAL: &str = r#"
class Interval:
    def __init__(self, start=0, end=0):
        self.start = start
        self.end = end
"#;

const LIST_CONVERTER: &str = r#"
def array_to_linked_list(values):
    dummy = ListNode(0)
    current = dummy
    for value in values or []:
        current.next = ListNode(value)
        current = current.next
    return dummy.next
"#;

const TREE_CONVERTER: &str = r#"
def array_to_tree(values):
    if not values or values[0] is None:
        return None
    root = TreeNode(values[0])
    queue = deque([root])
    i = 1
    while queue and i < len(values):
        node = queue.popleft()
        if i < len(values) and values[i] is not None:
            node.left = TreeNode(values[i])
            queue.append(node.left)
        i += 1
        if i < len(values) and values[i] is not None:
            node.right = TreeNode(values[i])
            queue.append(node.right)
        i += 1
    return root
"#;

const GRAPH_CONVERTER: &str = r#"
def adjacency_to_graph(adjacency):
    if not adjacency:
        return None
    nodes = [Node(i + 1) for i in range(len(adjacency))]
    for i, neighbors in enumerate(adjacency):
        nodes[i].neighbors = [nodes[j - 1] for j in neighbors]
    return nodes[0]
"#;

// Duck-typed so user-defined node classes serialize too
const SERIALIZER: &str = r#"
def _arbiter_serialize(value):
    if value is None or isinstance(value, (bool, int, float, str)):
        return value
    if hasattr(value, "neighbors") and hasattr(value, "val"):
        seen = {}
        queue = deque([value])
        while queue:
            node = queue.popleft()
            if node.val in seen:
                continue
            seen[node.val] = node
            queue.extend(node.neighbors)
        return [[n.val for n in seen[k].neighbors] for k in sorted(seen)]
    if hasattr(value, "left") and hasattr(value, "right") and hasattr(value, "val"):
        out = []
        queue = deque([value])
        while queue:
            node = queue.popleft()
            if node is None:
                out.append(None)
                continue
            out.append(_arbiter_serialize(node.val))
            queue.append(node.left)
            queue.append(node.right)
        while out and out[-1] is None:
            out.pop()
        return out
    if hasattr(value, "next") and hasattr(value, "val"):
        out = []
        visited = set()
        while value is not None and id(value) not in visited:
            visited.add(id(value))
            out.append(_arbiter_serialize(value.val))
            value = value.next
        return out
    if hasattr(value, "start") and hasattr(value, "end"):
        return [value.start, value.end]
    if isinstance(value, dict):
        return {str(k): _arbiter_serialize(v) for k, v in value.items()}
    if isinstance(value, (set, frozenset)):
        items = [_arbiter_serialize(v) for v in value]
        try:
            return sorted(items)
        except TypeError:
            return items
    if isinstance(value, (list, tuple, deque)):
        return [_arbiter_serialize(v) for v in value]
    return str(value)
"#;

fn converter(kind: ParamKind) -> Option<&'static str> {
    match kind {
        ParamKind::Plain => None,
        ParamKind::LinkedList => Some("array_to_linked_list"),
        ParamKind::Tree => Some("array_to_tree"),
        ParamKind::Graph => Some("adjacency_to_graph"),
        ParamKind::LinkedListArray => Some("array_to_linked_list"),
    }
}

/// Delegating container for solutions written as bare functions
fn container_wrapper(user_code: &str) -> String {
    let mut wrapper = String::from("\n\nclass Solution:\n");
    let functions = entry::python_top_level_functions(user_code);
    if functions.is_empty() {
        wrapper.push_str("    pass\n");
    }
    for name in functions {
        wrapper.push_str(&format!(
            "    def {name}(self, *args, **kwargs):\n        return {name}(*args, **kwargs)\n"
        ));
    }
    wrapper
}

pub(super) fn render(
    user_code: &str,
    entry: &EntryPoint,
    requirement: &StructureRequirement,
    inputs: &[Value],
) -> (String, Vec<String>) {
    let mut notes = Vec::new();
    let mut source = String::new();

    // __future__ imports must stay the first statements in the file
    let (future, body): (Vec<&str>, Vec<&str>) = user_code
        .lines()
        .partition(|l| l.trim_start().starts_with("from __future__"));
    for line in &future {
        source.push_str(line.trim());
        source.push('\n');
    }
    source.push_str(IMPORTS);

    let defined = requirement.user_defined;
    if requirement.uses_linked_list {
        if !defined.list_node {
            source.push_str(LIST_NODE);
        }
        source.push_str(LIST_CONVERTER);
        notes.push("linked-list helpers injected".to_string());
    }
    if requirement.uses_tree {
        if !defined.tree_node {
            source.push_str(TREE_NODE);
        }
        source.push_str(TREE_CONVERTER);
        notes.push("tree helpers injected".to_string());
    }
    if requirement.uses_graph {
        if !defined.graph_node {
            source.push_str(GRAPH_NODE);
        }
        source.push_str(GRAPH_CONVERTER);
        notes.push("graph helpers injected".to_string());
    }
    if requirement.uses_interval && !defined.interval {
        source.push_str(INTERVAL);
    }
    source.push_str(SERIALIZER);

    source.push('\n');
    source.push_str(&body.join("\n"));
    source.push('\n');

    if !entry::python_defines_container(user_code) {
        source.push_str(&container_wrapper(user_code));
        notes.push("added delegating Solution container".to_string());
    }

    let payload = Value::String(Value::Array(inputs.to_vec()).to_string());
    source.push_str("\n\nif __name__ == \"__main__\":\n");
    source.push_str(&format!("    _inputs = json.loads({payload})\n"));
    source.push_str("    _args = [\n");
    for (i, _) in inputs.iter().enumerate() {
        let arg = match (requirement.kind_of(i), converter(requirement.kind_of(i))) {
            (ParamKind::LinkedListArray, Some(f)) => format!("[{f}(v) for v in (_inputs[{i}] or [])]"),
            (_, Some(f)) => format!("{f}(_inputs[{i}])"),
            (_, None) => format!("_inputs[{i}]"),
        };
        source.push_str(&format!("        {arg},\n"));
    }
    source.push_str("    ]\n");

    let mutates = !inputs.is_empty()
        && (requirement.is_in_place_modification || requirement.may_modify_in_place);
    if mutates {
        source.push_str("    _args[0] = copy.deepcopy(_args[0])\n");
    }
    source.push_str(&format!("    _result = Solution().{}(*_args)\n", entry.name));

    if mutates && requirement.is_in_place_modification {
        source.push_str("    _result = _args[0]\n");
        notes.push("in-place: printing first argument after the call".to_string());
    } else if mutates {
        source.push_str("    if _result is None:\n        _result = _args[0]\n");
        notes.push("possibly in-place: printing first argument if the call returns None".to_string());
    }
    source.push_str("    print(json.dumps(_arbiter_serialize(_result)))\n");

    (source, notes)
}
