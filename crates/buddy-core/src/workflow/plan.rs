//! Pipeline artefacts: project plan, task plan and their parsers

use crate::error::{BuddyError, BuddyResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

/// First `{` to last `}` across lines
static JSON_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// Whole-reply Markdown fence with optional language tag
static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*```[^\n]*\n(.*?)\n?```\s*$").unwrap());

static TODO_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(todo|to-do|tasks?|list)\b").unwrap());
static CALCULATOR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(calculator|calc|math)\b").unwrap());
static PORTFOLIO_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(portfolio|personal|showcase)\b").unwrap());

/// One file the plan calls for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedFile {
    pub path: String,
    #[serde(default)]
    pub purpose: String,
}

/// Planner output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectPlan {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub techstack: String,
    #[serde(default)]
    pub features: Vec<String>,
    pub files: Vec<PlannedFile>,
}

/// Architect output for a single file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplementationTask {
    pub filepath: String,
    pub task_description: String,
}

/// Architect output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPlan {
    pub implementation_steps: Vec<ImplementationTask>,
}

/// Project types with a built-in plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectTemplate {
    TodoApp,
    Calculator,
    Portfolio,
}

impl ProjectTemplate {
    /// Recognise a project type from the caller's prompt
    pub fn detect(prompt: &str) -> Option<Self> {
        if TODO_PATTERN.is_match(prompt) {
            Some(Self::TodoApp)
        } else if CALCULATOR_PATTERN.is_match(prompt) {
            Some(Self::Calculator)
        } else if PORTFOLIO_PATTERN.is_match(prompt) {
            Some(Self::Portfolio)
        } else {
            None
        }
    }

    /// The built-in plan
    pub fn plan(&self) -> ProjectPlan {
        let (name, description, features, purposes) = match self {
            Self::TodoApp => (
                "Modern Todo App",
                "A sleek todo application with local storage",
                vec![
                    "Add tasks",
                    "Mark complete",
                    "Delete tasks",
                    "Local storage",
                    "Responsive design",
                ],
                [
                    "Main HTML structure",
                    "Styling and layout",
                    "JavaScript functionality",
                ],
            ),
            Self::Calculator => (
                "Modern Calculator",
                "A colorful calculator with advanced operations",
                vec![
                    "Basic math operations",
                    "Colorful design",
                    "Keyboard support",
                    "History display",
                ],
                ["Calculator interface", "Modern styling", "Calculator logic"],
            ),
            Self::Portfolio => (
                "Creative Portfolio",
                "A personal portfolio website with modern design",
                vec![
                    "Hero section",
                    "Projects showcase",
                    "About section",
                    "Contact form",
                    "Animations",
                ],
                [
                    "Main portfolio structure",
                    "Creative styling and animations",
                    "Interactive features",
                ],
            ),
        };

        ProjectPlan {
            name: name.to_string(),
            description: description.to_string(),
            techstack: "HTML, CSS, JavaScript".to_string(),
            features: features.into_iter().map(String::from).collect(),
            files: ["index.html", "style.css", "script.js"]
                .into_iter()
                .zip(purposes)
                .map(|(path, purpose)| PlannedFile {
                    path: path.to_string(),
                    purpose: purpose.to_string(),
                })
                .collect(),
        }
    }
}

/// Extract the first JSON object embedded in a model reply
pub fn extract_json_block(reply: &str) -> Option<&str> {
    JSON_BLOCK.find(reply).map(|m| m.as_str())
}

/// Parse a model reply into a plan with at least one file
pub fn parse_plan(reply: &str) -> BuddyResult<ProjectPlan> {
    let block = extract_json_block(reply)
        .ok_or_else(|| BuddyError::malformed("planner", "reply contains no JSON object"))?;
    let plan: ProjectPlan = serde_json::from_str(block)
        .map_err(|e| BuddyError::malformed("planner", format!("invalid plan JSON: {}", e)))?;

    if plan.files.is_empty() {
        return Err(BuddyError::malformed("planner", "plan lists no files"));
    }
    if plan.files.iter().any(|f| f.path.trim().is_empty()) {
        return Err(BuddyError::malformed("planner", "plan has a file without a path"));
    }
    Ok(plan)
}

/// Parse a `{path: description}` object; anything unparsable yields an empty map
pub fn parse_task_descriptions(reply: &str) -> HashMap<String, String> {
    extract_json_block(reply)
        .and_then(|block| serde_json::from_str::<HashMap<String, serde_json::Value>>(block).ok())
        .map(|map| {
            map.into_iter()
                .filter_map(|(path, value)| {
                    value
                        .as_str()
                        .map(str::trim)
                        .filter(|d| !d.is_empty())
                        .map(|d| (path, d.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Task description used when the model did not describe a file
pub fn fallback_task_description(file: &PlannedFile) -> String {
    let extension = file.path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("html") | Some("htm") => format!(
            "Create {} with modern HTML structure, semantic elements, and proper meta tags.",
            file.path
        ),
        Some("css") => format!(
            "Create {} with modern CSS, responsive design, and attractive styling.",
            file.path
        ),
        Some("js") => format!(
            "Create {} with clean JavaScript, proper event handling, and modern ES6+ features.",
            file.path
        ),
        _ => format!("Create {} implementing {}", file.path, file.purpose),
    }
}

/// Build a task plan with one task per planned file, in plan order
pub fn build_task_plan(plan: &ProjectPlan, described: &HashMap<String, String>) -> TaskPlan {
    TaskPlan {
        implementation_steps: plan
            .files
            .iter()
            .map(|file| ImplementationTask {
                filepath: file.path.clone(),
                task_description: described
                    .get(&file.path)
                    .cloned()
                    .unwrap_or_else(|| fallback_task_description(file)),
            })
            .collect(),
    }
}

/// Remove a Markdown code fence wrapping the whole reply
pub fn strip_code_fences(reply: &str) -> String {
    match CODE_FENCE.captures(reply).and_then(|c| c.get(1)) {
        Some(body) => body.as_str().to_string(),
        None => reply.trim().to_string(),
    }
}

/// Directory-name-safe form of a project name
pub fn slugify(name: &str) -> String {
    let slug = name
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "project".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_templates() {
        assert_eq!(
            ProjectTemplate::detect("Build a todo app"),
            Some(ProjectTemplate::TodoApp)
        );
        assert_eq!(
            ProjectTemplate::detect("a colourful CALCULATOR"),
            Some(ProjectTemplate::Calculator)
        );
        assert_eq!(
            ProjectTemplate::detect("my personal site"),
            Some(ProjectTemplate::Portfolio)
        );
        assert_eq!(ProjectTemplate::detect("a weather dashboard"), None);
        // substrings do not count
        assert_eq!(ProjectTemplate::detect("a blacklist editor"), None);
    }

    #[test]
    fn test_template_plan_shape() {
        let plan = ProjectTemplate::TodoApp.plan();
        assert_eq!(plan.name, "Modern Todo App");
        let paths: Vec<_> = plan.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["index.html", "style.css", "script.js"]);
    }

    #[test]
    fn test_parse_plan_from_chatty_reply() {
        let reply = r#"Sure! Here is the plan:
```json
{
  "name": "Weather",
  "description": "Shows the weather",
  "techstack": "HTML, CSS, JavaScript",
  "features": ["forecast"],
  "files": [{"path": "index.html", "purpose": "Main structure"}]
}
```
Let me know!"#;
        let plan = parse_plan(reply).unwrap();
        assert_eq!(plan.name, "Weather");
        assert_eq!(plan.files.len(), 1);
    }

    #[test]
    fn test_parse_plan_rejects_garbage() {
        assert!(matches!(
            parse_plan("no json here"),
            Err(BuddyError::MalformedOutput { .. })
        ));
        assert!(parse_plan(r#"{"name": "x", "files": []}"#).is_err());
        assert!(parse_plan(r#"{"name": "x"}"#).is_err());
    }

    #[test]
    fn test_task_plan_falls_back_by_extension() {
        let plan = ProjectTemplate::Calculator.plan();
        let mut described = HashMap::new();
        described.insert("index.html".to_string(), "Build the keypad".to_string());

        let tasks = build_task_plan(&plan, &described);
        assert_eq!(tasks.implementation_steps.len(), 3);
        assert_eq!(tasks.implementation_steps[0].task_description, "Build the keypad");
        assert!(tasks.implementation_steps[1]
            .task_description
            .contains("responsive design"));
        assert!(tasks.implementation_steps[2].task_description.contains("ES6+"));

        let other = PlannedFile {
            path: "README.md".into(),
            purpose: "docs".into(),
        };
        assert_eq!(
            fallback_task_description(&other),
            "Create README.md implementing docs"
        );
    }

    #[test]
    fn test_parse_task_descriptions_tolerates_noise() {
        let parsed = parse_task_descriptions(r#"ok {"a.js": "do a", "b.js": 3, "c.js": " "}"#);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed["a.js"], "do a");
        assert!(parse_task_descriptions("nothing").is_empty());
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(
            strip_code_fences("```html\n<p>hi</p>\n```"),
            "<p>hi</p>"
        );
        assert_eq!(strip_code_fences("  body { }  "), "body { }");
        // inner fences are content
        let doc = "# Title\n```sh\nls\n```\nmore";
        assert_eq!(strip_code_fences(doc), doc);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Modern Todo App"), "modern-todo-app");
        assert_eq!(slugify("  C++ / Rust!! "), "c-rust");
        assert_eq!(slugify("???"), "project");
    }
}
