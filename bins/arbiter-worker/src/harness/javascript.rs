// JavaScript harness rendering, mirroring the Python layout.

use super::classifier::{contains_word, defines_class, ParamKind, StructureRequirement};
use super::entry::EntryPoint;
use serde_json::Value;

const LIST_NODE: &str = r#"
function ListNode(val, next) {
    this.val = (val === undefined ? 0 : val);
    this.next = (next === undefined ? null : next);
}
"#;

const TREE_NODE: &str = r#"
function TreeNode(val, left, right) {
    this.val = (val === undefined ? 0 : val);
    this.left = (left === undefined ? null : left);
    this.right = (right === undefined ? null : right);
}
"#;

const GRAPH_NODE: &str = r#"
function Node(val, neighbors) {
    this.val = (val === undefined ? 0 : val);
    this.neighbors = (neighbors === undefined ? [] : neighbors);
}
"#;

const LIST_CONVERTER: &str = r#"
function arrayToLinkedList(values) {
    const dummy = new ListNode(0);
    let current = dummy;
    for (const value of values || []) {
        current.next = new ListNode(value);
        current = current.next;
    }
    return dummy.next;
}
"#;

const TREE_CONVERTER: &str = r#"
function arrayToTree(values) {
    if (!values || values.length === 0 || values[0] === null) return null;
    const root = new TreeNode(values[0]);
    const queue = [root];
    let i = 1;
    while (queue.length > 0 && i < values.length) {
        const node = queue.shift();
        if (i < values.length && values[i] !== null) {
            node.left = new TreeNode(values[i]);
            queue.push(node.left);
        }
        i++;
        if (i < values.length && values[i] !== null) {
            node.right = new TreeNode(values[i]);
            queue.push(node.right);
        }
        i++;
    }
    return root;
}
"#;

const GRAPH_CONVERTER: &str = r#"
function adjacencyToGraph(adjacency) {
    if (!adjacency || adjacency.length === 0) return null;
    const nodes = adjacency.map((_, i) => new Node(i + 1));
    adjacency.forEach((neighbors, i) => {
        nodes[i].neighbors = neighbors.map((j) => nodes[j - 1]);
    });
    return nodes[0];
}
"#;

const SERIALIZER: &str = r#"
function __arbiterSerialize(value) {
    if (value === undefined || value === null) return null;
    if (typeof value !== "object") return value;
    if ("neighbors" in value && "val" in value) {
        const seen = new Map();
        const queue = [value];
        while (queue.length > 0) {
            const node = queue.shift();
            if (seen.has(node.val)) continue;
            seen.set(node.val, node);
            queue.push(...node.neighbors);
        }
        return [...seen.keys()].sort((a, b) => a - b).map((k) => seen.get(k).neighbors.map((n) => n.val));
    }
    if ("left" in value && "right" in value && "val" in value) {
        const out = [];
        const queue = [value];
        while (queue.length > 0) {
            const node = queue.shift();
            if (!node) { out.push(null); continue; }
            out.push(__arbiterSerialize(node.val));
            queue.push(node.left, node.right);
        }
        while (out.length > 0 && out[out.length - 1] === null) out.pop();
        return out;
    }
    if ("next" in value && "val" in value) {
        const out = [];
        const visited = new Set();
        let node = value;
        while (node && !visited.has(node)) {
            visited.add(node);
            out.push(__arbiterSerialize(node.val));
            node = node.next;
        }
        return out;
    }
    if (value instanceof Set) return [...value].map(__arbiterSerialize);
    if (value instanceof Map) return Object.fromEntries([...value].map(([k, v]) => [String(k), __arbiterSerialize(v)]));
    if (Array.isArray(value)) return value.map(__arbiterSerialize);
    return Object.fromEntries(Object.entries(value).map(([k, v]) => [k, __arbiterSerialize(v)]));
}
"#;

fn converter(kind: ParamKind) -> Option<&'static str> {
    match kind {
        ParamKind::Plain => None,
        ParamKind::LinkedList | ParamKind::LinkedListArray => Some("arrayToLinkedList"),
        ParamKind::Tree => Some("arrayToTree"),
        ParamKind::Graph => Some("adjacencyToGraph"),
    }
}

pub(super) fn render(
    user_code: &str,
    entry: &EntryPoint,
    requirement: &StructureRequirement,
    inputs: &[Value],
) -> (String, Vec<String>) {
    let mut notes = Vec::new();
    let mut source = String::from("\"use strict\";\n");

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
        if contains_word(user_code, "_Node") && !defines_class(user_code, "_Node") {
            source.push_str("\nconst _Node = Node;\n");
            notes.push("aliased _Node to the graph helper".to_string());
        }
    }
    source.push_str(SERIALIZER);

    source.push('\n');
    source.push_str(user_code.trim_end());
    source.push_str("\n\n");

    let payload = Value::String(Value::Array(inputs.to_vec()).to_string());
    source.push_str(&format!("const __arbiterInputs = JSON.parse({payload});\n"));
    source.push_str("const __arbiterArgs = [\n");
    for i in 0..inputs.len() {
        let kind = requirement.kind_of(i);
        let arg = match (kind, converter(kind)) {
            (ParamKind::LinkedListArray, Some(f)) => format!("(__arbiterInputs[{i}] || []).map({f})"),
            (_, Some(f)) => format!("{f}(__arbiterInputs[{i}])"),
            (_, None) => format!("__arbiterInputs[{i}]"),
        };
        source.push_str(&format!("    {arg},\n"));
    }
    source.push_str("];\n");

    let callee = if entry.in_container() {
        format!("new Solution().{}", entry.name)
    } else {
        entry.name.clone()
    };
    source.push_str(&format!("let __arbiterResult = {callee}(...__arbiterArgs);\n"));

    if !inputs.is_empty() {
        if requirement.is_in_place_modification {
            source.push_str("__arbiterResult = __arbiterArgs[0];\n");
            notes.push("in-place: printing first argument after the call".to_string());
        } else if requirement.may_modify_in_place {
            source.push_str("if (__arbiterResult === undefined) __arbiterResult = __arbiterArgs[0];\n");
            notes.push("possibly in-place: printing first argument if the call returns undefined".to_string());
        }
    }
    source.push_str("console.log(JSON.stringify(__arbiterSerialize(__arbiterResult)));\n");

    (source, notes)
}
