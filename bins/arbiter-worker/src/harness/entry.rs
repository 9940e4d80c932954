// Entry-point discovery in user source text.
// A line scanner, not a parser: it looks for the canonical container first,
// then known names, then a fixed default.

use arbiter_common::types::Language;

/// Name used when nothing in the source identifies an entry point
pub const DEFAULT_ENTRY_POINT: &str = "solve";

/// Canonical container class for method-style solutions
pub const CONTAINER: &str = "Solution";

/// Entry-point names of common problems, consulted when the container has no
/// usable method
pub const KNOWN_ENTRY_POINTS: &[&str] = &[
    "twoSum", "addTwoNumbers", "lengthOfLongestSubstring", "findMedianSortedArrays",
    "longestPalindrome", "myAtoi", "isPalindrome", "isMatch", "maxArea", "intToRoman",
    "romanToInt", "longestCommonPrefix", "threeSum", "threeSumClosest", "letterCombinations",
    "fourSum", "removeNthFromEnd", "isValid", "mergeTwoLists", "generateParenthesis",
    "mergeKLists", "swapPairs", "reverseKGroup", "removeDuplicates", "removeElement", "strStr",
    "search", "searchRange", "searchInsert", "isValidSudoku", "solveSudoku", "combinationSum",
    "firstMissingPositive", "trap", "multiply", "jump", "permute", "permuteUnique", "rotate",
    "groupAnagrams", "myPow", "solveNQueens", "maxSubArray", "spiralOrder", "canJump", "merge",
    "insert", "lengthOfLastWord", "uniquePaths", "minPathSum", "plusOne", "addBinary", "mySqrt",
    "climbStairs", "simplifyPath", "minDistance", "setZeroes", "searchMatrix", "sortColors",
    "minWindow", "subsets", "exist", "deleteDuplicates", "largestRectangleArea",
    "inorderTraversal", "isValidBST", "isSameTree", "isSymmetric", "levelOrder", "maxDepth",
    "buildTree", "sortedArrayToBST", "isBalanced", "minDepth", "hasPathSum", "flatten",
    "maxProfit", "maxPathSum", "longestConsecutive", "cloneGraph", "singleNumber", "wordBreak",
    "hasCycle", "reorderList", "evalRPN", "reverseWords", "maxProduct", "findMin",
    "majorityElement", "rob", "numIslands", "reverseList", "canFinish", "findKthLargest",
    "containsDuplicate", "invertTree", "kthSmallest", "lowestCommonAncestor",
    "productExceptSelf", "maxSlidingWindow", "isAnagram", "missingNumber", "moveZeroes",
    "findDuplicate", "lengthOfLIS", "coinChange", "topKFrequent", "gameOfLife",
    "nextPermutation", "wiggleSort", "reverseString", "fib", "diameterOfBinaryTree",
    "subarraySum", "dailyTemperatures", "findAnagrams", "characterReplacement",
    "longestCommonSubsequence", "middleNode", "getIntersectionNode", "isHappy",
];

/// One declared parameter of the entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureParam {
    pub name: String,
    /// Type annotation (Python hint or JSDoc type), if declared
    pub annotation: Option<String>,
}

/// How the entry point was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySource {
    Container,
    Declared,
    KnownName,
    TopLevel,
    Default,
}

/// The callable the harness will invoke
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub name: String,
    pub source: EntrySource,
    /// Declared parameters, `self` excluded
    pub params: Vec<SignatureParam>,
    /// Declared return type, if any
    pub return_annotation: Option<String>,
    /// Docstring or doc comment text attached to the entry point
    pub doc: String,
}

impl EntryPoint {
    /// True when the entry point is a method of the canonical container
    pub fn in_container(&self) -> bool {
        self.source == EntrySource::Container
    }

    fn bare(name: &str, source: EntrySource) -> Self {
        Self {
            name: name.to_string(),
            source,
            params: Vec::new(),
            return_annotation: None,
            doc: String::new(),
        }
    }
}

/// Locate the entry point in user code
pub fn find_entry_point(code: &str, language: Language, declared: Option<&str>) -> EntryPoint {
    match language {
        Language::JavaScript => find_js(code, declared),
        _ => find_python(code, declared),
    }
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        && !name.chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// Text between the `(` at `open` and its matching `)`, plus the index after it
fn balanced_parens(text: &str, open: usize) -> Option<(&str, usize)> {
    let mut depth = 0usize;
    for (offset, c) in text[open..].char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let close = open + offset;
                    return Some((&text[open + 1..close], close + 1));
                }
            }
            _ => {}
        }
    }
    None
}

fn split_params(list: &str) -> Vec<String> {
    crate::literal::split_top_level(list, ',')
}

// ---------------------------------------------------------------- python

/// Python function definitions as (indent, name, byte offset of `def`)
fn python_defs(code: &str) -> Vec<(usize, String, usize)> {
    let mut defs = Vec::new();
    let mut offset = 0;
    for line in code.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let rest = trimmed
            .strip_prefix("async def ")
            .or_else(|| trimmed.strip_prefix("def "));
        if let Some(rest) = rest {
            let name: String = rest
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            if is_identifier(&name) {
                defs.push((indentation(line), name, offset + (line.len() - trimmed.len())));
            }
        }
        offset += line.len();
    }
    defs
}

/// Byte range of the `class Solution` body, by indentation
fn python_container(code: &str) -> Option<(usize, usize, usize)> {
    let mut offset = 0;
    let mut start: Option<(usize, usize)> = None;
    for line in code.split_inclusive('\n') {
        let trimmed = line.trim_start();
        match start {
            None => {
                if let Some(rest) = trimmed.strip_prefix("class ") {
                    let name: String = rest.chars().take_while(|c| c.is_alphanumeric() || *c == '_').collect();
                    if name == CONTAINER {
                        start = Some((offset, indentation(line)));
                    }
                }
            }
            Some((begin, indent)) => {
                if !trimmed.is_empty() && !trimmed.starts_with('#') && indentation(line) <= indent {
                    return Some((begin, offset, indent));
                }
            }
        }
        offset += line.len();
    }
    start.map(|(begin, indent)| (begin, code.len(), indent))
}

/// True when the code defines `class Solution`
pub fn python_defines_container(code: &str) -> bool {
    python_container(code).is_some()
}

/// Top-level function names, private helpers excluded
pub fn python_top_level_functions(code: &str) -> Vec<String> {
    python_defs(code)
        .into_iter()
        .filter(|(indent, name, _)| *indent == 0 && !name.starts_with('_'))
        .map(|(_, name, _)| name)
        .collect()
}

fn find_python(code: &str, declared: Option<&str>) -> EntryPoint {
    let defs = python_defs(code);

    if let Some((begin, end, class_indent)) = python_container(code) {
        let method = defs.iter().find(|(indent, name, at)| {
            *at > begin && *at < end && *indent > class_indent && !name.starts_with("__")
        });
        if let Some((_, name, at)) = method {
            return python_signature(code, name, *at, EntrySource::Container);
        }
    }

    if let Some(name) = declared.filter(|n| is_identifier(n)) {
        if let Some((_, _, at)) = defs.iter().find(|(_, n, _)| n == name) {
            return python_signature(code, name, *at, EntrySource::Declared);
        }
    }

    for known in KNOWN_ENTRY_POINTS {
        if let Some((_, name, at)) = defs.iter().find(|(_, n, _)| n == known) {
            return python_signature(code, name, *at, EntrySource::KnownName);
        }
    }

    if let Some((_, name, at)) = defs
        .iter()
        .find(|(indent, name, _)| *indent == 0 && !name.starts_with('_'))
    {
        return python_signature(code, name, *at, EntrySource::TopLevel);
    }

    EntryPoint::bare(declared.unwrap_or(DEFAULT_ENTRY_POINT), EntrySource::Default)
}

fn python_signature(code: &str, name: &str, def_at: usize, source: EntrySource) -> EntryPoint {
    let mut entry = EntryPoint::bare(name, source);
    let Some(open) = code[def_at..].find('(').map(|i| def_at + i) else {
        return entry;
    };
    let Some((list, after)) = balanced_parens(code, open) else {
        return entry;
    };

    entry.params = split_params(list)
        .into_iter()
        .filter_map(|raw| {
            let raw = raw.trim_start_matches('*');
            let (name_part, annotation) = match raw.split_once(':') {
                Some((n, a)) => (n, Some(a)),
                None => (raw, None),
            };
            let name = name_part.split('=').next().unwrap_or_default().trim().to_string();
            if name.is_empty() || name == "self" || name == "cls" || name == "/" {
                return None;
            }
            let annotation = annotation
                .map(|a| a.split('=').next().unwrap_or_default().trim().to_string())
                .filter(|a| !a.is_empty());
            Some(SignatureParam { name, annotation })
        })
        .collect();

    let tail = &code[after..];
    let header_end = tail.find(':').unwrap_or(0);
    let header = &tail[..header_end];
    entry.return_annotation = header
        .split_once("->")
        .map(|(_, ret)| ret.trim().to_string())
        .filter(|r| !r.is_empty());

    let body = tail.get(header_end + 1..).unwrap_or_default().trim_start();
    if let Some(rest) = body.strip_prefix("\"\"\"").or_else(|| body.strip_prefix("'''")) {
        let close = rest.find("\"\"\"").or_else(|| rest.find("'''")).unwrap_or(rest.len());
        entry.doc = rest[..close].trim().to_string();
    }

    entry
}

// ------------------------------------------------------------ javascript

fn js_function_defs(code: &str) -> Vec<(String, usize)> {
    let mut defs = Vec::new();
    let mut offset = 0;
    for line in code.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let lead = line.len() - trimmed.len();
        if let Some(rest) = trimmed.strip_prefix("function ") {
            let name: String = rest.chars().take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '$').collect();
            if is_identifier(&name) {
                defs.push((name, offset + lead));
            }
        } else {
            for keyword in ["var ", "let ", "const "] {
                if let Some(rest) = trimmed.strip_prefix(keyword) {
                    if let Some((name, value)) = rest.split_once('=') {
                        let name = name.trim();
                        let value = value.trim_start();
                        let is_function = value.starts_with("function")
                            || value.starts_with("async")
                            || value.starts_with('(') && value.contains("=>");
                        if is_identifier(name) && is_function {
                            defs.push((name.to_string(), offset + lead));
                        }
                    }
                }
            }
        }
        offset += line.len();
    }
    defs
}

const JS_STATEMENT_KEYWORDS: &[&str] = &["if", "for", "while", "switch", "return", "super", "catch"];

fn js_container_method(code: &str) -> Option<(String, usize)> {
    let class_at = code.find(&format!("class {}", CONTAINER))?;
    let open = class_at + code[class_at..].find('{')?;
    let (body, _) = balanced_parens(code, open)?;
    let body_start = open + 1;

    // Members live at brace depth 0 of the class body; anything deeper is a
    // method or constructor body
    let mut offset = 0;
    let mut depth = 0usize;
    for line in body.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if depth == 0 {
            let member = trimmed.trim_start_matches("static ").trim_start_matches("async ");
            let name: String = member
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '$')
                .collect();
            let after = member[name.len()..].trim_start();
            if is_identifier(&name)
                && name != "constructor"
                && !JS_STATEMENT_KEYWORDS.contains(&name.as_str())
                && after.starts_with('(')
            {
                return Some((name, body_start + offset + (line.len() - trimmed.len())));
            }
        }
        for c in line.chars() {
            match c {
                '{' => depth += 1,
                '}' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        offset += line.len();
    }
    None
}

fn find_js(code: &str, declared: Option<&str>) -> EntryPoint {
    if let Some((name, at)) = js_container_method(code) {
        return js_signature(code, &name, at, EntrySource::Container);
    }

    let defs = js_function_defs(code);
    if let Some(name) = declared.filter(|n| is_identifier(n)) {
        if let Some((_, at)) = defs.iter().find(|(n, _)| n == name) {
            return js_signature(code, name, *at, EntrySource::Declared);
        }
    }
    for known in KNOWN_ENTRY_POINTS {
        if let Some((name, at)) = defs.iter().find(|(n, _)| n == known) {
            return js_signature(code, name, *at, EntrySource::KnownName);
        }
    }
    if let Some((name, at)) = defs.first() {
        return js_signature(code, name, *at, EntrySource::TopLevel);
    }

    EntryPoint::bare(declared.unwrap_or(DEFAULT_ENTRY_POINT), EntrySource::Default)
}

/// JSDoc block ending right before `at`
fn jsdoc_before(code: &str, at: usize) -> &str {
    let before = code[..at].trim_end();
    if !before.ends_with("*/") {
        return "";
    }
    match before.rfind("/**") {
        Some(start) => &before[start..],
        None => "",
    }
}

fn jsdoc_tag<'a>(doc: &'a str, tag: &str, param: Option<&str>) -> Option<&'a str> {
    doc.lines().find_map(|line| {
        let rest = line.trim().trim_start_matches('*').trim().strip_prefix(tag)?;
        let rest = rest.trim_start();
        let open = rest.strip_prefix('{')?;
        let close = open.find('}')?;
        let ty = &open[..close];
        match param {
            Some(name) => {
                let declared = open[close + 1..].split_whitespace().next()?;
                (declared == name).then_some(ty)
            }
            None => Some(ty),
        }
    })
}

fn js_signature(code: &str, name: &str, at: usize, source: EntrySource) -> EntryPoint {
    let mut entry = EntryPoint::bare(name, source);
    let doc = jsdoc_before(code, at);
    entry.doc = doc.to_string();

    let Some(open) = code[at..].find('(').map(|i| at + i) else {
        return entry;
    };
    let Some((list, _)) = balanced_parens(code, open) else {
        return entry;
    };

    entry.params = split_params(list)
        .into_iter()
        .map(|raw| {
            let name = raw.trim_start_matches("...").split('=').next().unwrap_or_default().trim().to_string();
            let annotation = jsdoc_tag(doc, "@param", Some(&name)).map(str::to_string);
            SignatureParam { name, annotation }
        })
        .filter(|p| is_identifier(&p.name))
        .collect();
    entry.return_annotation = jsdoc_tag(doc, "@return", None)
        .or_else(|| jsdoc_tag(doc, "@returns", None))
        .map(str::to_string);

    entry
}
