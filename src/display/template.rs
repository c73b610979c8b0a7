//! Template validation display formatting

use crate::template::TemplateIssue;

/// Format validation issues as a numbered list
pub fn format_template_issues(issues: &[TemplateIssue]) -> String {
    if issues.is_empty() {
        return "Template is valid.".to_string();
    }

    let mut output = format!("Found {} issue(s):\n", issues.len());
    for (i, issue) in issues.iter().enumerate() {
        output.push_str(&format!("  {}. {}\n", i + 1, issue));
    }
    output.truncate(output.trim_end().len());
    output
}
