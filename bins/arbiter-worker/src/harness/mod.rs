/// Harness synthesis
///
/// **Core Responsibility:** wrap a user's solution into a standalone program
/// that builds the arguments of one test case, calls the entry point and
/// prints the result as a single line of JSON on stdout.
///
/// Python and JavaScript get a full harness. Other languages are expected to
/// read nothing and print their own output, so their source is submitted
/// verbatim.

pub mod classifier;
pub mod entry;
mod javascript;
mod python;

use arbiter_common::types::{Language, ProblemMetadata};
use classifier::StructureRequirement;
use entry::EntryPoint;
use serde_json::Value;
use tracing::debug;

pub use classifier::{classify, ParamKind};
pub use entry::find_entry_point;

/// A program ready for submission to the judge
#[derive(Debug, Clone)]
pub struct SynthesizedProgram {
    pub source: String,
    pub entry_point: String,
    /// Human-readable notes on repairs and injected helpers
    pub notes: Vec<String>,
}

/// Per-submission harness state
///
/// Entry-point discovery and classification happen once; `render` is then
/// called for each test case.
#[derive(Debug, Clone)]
pub struct Harness {
    language: Language,
    user_code: String,
    entry: EntryPoint,
    requirement: StructureRequirement,
}

impl Harness {
    pub fn prepare(user_code: &str, problem: &ProblemMetadata, language: Language) -> Self {
        let entry = find_entry_point(user_code, language, problem.function_name.as_deref());
        let arity = match problem.parameter_map.arity() {
            0 => entry.params.len(),
            n => n,
        };
        let requirement = classify(user_code, &entry, arity);

        debug!(
            language = %language,
            entry_point = %entry.name,
            source = ?entry.source,
            arity,
            helpers = requirement.needs_helpers(),
            "Prepared harness"
        );

        Self {
            language,
            user_code: user_code.to_string(),
            entry,
            requirement,
        }
    }

    pub fn entry_point(&self) -> &EntryPoint {
        &self.entry
    }

    pub fn requirement(&self) -> &StructureRequirement {
        &self.requirement
    }

    /// Render the program for one test case
    pub fn render(&self, formatted_inputs: &[Value]) -> SynthesizedProgram {
        let (source, notes) = match self.language {
            Language::Python => python::render(
                &self.user_code,
                &self.entry,
                &self.requirement,
                formatted_inputs,
            ),
            Language::JavaScript => javascript::render(
                &self.user_code,
                &self.entry,
                &self.requirement,
                formatted_inputs,
            ),
            other => (
                self.user_code.clone(),
                vec![format!("no harness for {other}; submitted verbatim")],
            ),
        };

        SynthesizedProgram {
            source,
            entry_point: self.entry.name.clone(),
            notes,
        }
    }
}

/// One-shot synthesis for a single test case
pub fn synthesize(
    user_code: &str,
    formatted_inputs: &[Value],
    problem: &ProblemMetadata,
    language: Language,
) -> SynthesizedProgram {
    Harness::prepare(user_code, problem, language).render(formatted_inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_common::types::ParameterMap;
    use serde_json::json;

    fn problem(params: &[&str]) -> ProblemMetadata {
        ProblemMetadata {
            title: "Test".to_string(),
            parameter_map: ParameterMap::new(params.iter().copied()),
            ..Default::default()
        }
    }

    #[test]
    fn test_synthesize_python_two_sum() {
        let code = "class Solution:\n    def twoSum(self, nums, target):\n        return [0, 1]\n";
        let program = synthesize(
            code,
            &[json!([2, 7, 11, 15]), json!(9)],
            &problem(&["nums", "target", "output"]),
            Language::Python,
        );
        assert_eq!(program.entry_point, "twoSum");
        assert!(program.source.contains("Solution().twoSum(*_args)"));
        assert!(program.source.contains("json.loads("));
    }

    #[test]
    fn test_declared_function_name_preferred_over_table() {
        let code = "def search(a):\n    return a\n\ndef answer(nums):\n    return search(nums)\n";
        let mut p = problem(&["nums"]);
        p.function_name = Some("answer".to_string());
        let harness = Harness::prepare(code, &p, Language::Python);
        assert_eq!(harness.entry_point().name, "answer");
    }

    #[test]
    fn test_arity_falls_back_to_signature() {
        let code = "class Solution:\n    def mergeTwoLists(self, list1: Optional[ListNode], list2: Optional[ListNode]) -> Optional[ListNode]:\n        return list1\n";
        let harness = Harness::prepare(code, &problem(&[]), Language::Python);
        assert_eq!(harness.requirement().param_kinds.len(), 2);
        assert_eq!(harness.requirement().kind_of(1), ParamKind::LinkedList);
    }

    #[test]
    fn test_other_languages_submitted_verbatim() {
        let code = "#include <iostream>\nint main() { std::cout << 42; }\n";
        let program = synthesize(code, &[json!(1)], &problem(&["n"]), Language::Cpp);
        assert_eq!(program.source, code);
        assert!(program.notes[0].contains("verbatim"));
    }

    #[test]
    fn test_render_reuses_classification() {
        let code = "class Solution:\n    def maxDepth(self, root: Optional[TreeNode]) -> int:\n        return 0\n";
        let harness = Harness::prepare(code, &problem(&["root"]), Language::Python);
        let a = harness.render(&[json!([1, 2])]);
        let b = harness.render(&[json!([3])]);
        assert!(a.source.contains("array_to_tree(_inputs[0])"));
        assert!(b.source.contains("array_to_tree(_inputs[0])"));
        assert_ne!(a.source, b.source);
    }
}
