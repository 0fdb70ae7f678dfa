//! Human-readable output: the dry-run plan and the end-of-run summary.

use std::fmt::Write as _;

use crate::model::{RunReport, TargetPlan};
use crate::statements::{PasswordText, statements};

/// Every planned operation per name, with the SQL it would run.
/// Passwords are always masked.
#[must_use]
pub fn render_plan(plans: &[TargetPlan]) -> String {
    let mut out = String::new();
    for plan in plans {
        if plan.operations.is_empty() {
            let _ = writeln!(out, "[dry-run] {}: up to date, nothing to do", plan.name);
            continue;
        }
        let _ = writeln!(
            out,
            "[dry-run] {}: {} operation(s)",
            plan.name,
            plan.operations.len()
        );
        for op in &plan.operations {
            let _ = writeln!(out, "  {op}");
            for sql in statements(op, PasswordText::Masked) {
                let _ = writeln!(out, "    would run: {sql}");
            }
        }
    }
    out
}

/// One line per name followed by a totals line.
#[must_use]
pub fn render_summary(report: &RunReport) -> String {
    let mut out = String::new();
    for result in &report.results {
        match &result.error {
            None if report.dry_run => {
                let _ = writeln!(out, "{}: ok ({} planned)", result.name, result.applied.len());
            }
            None => {
                let _ = writeln!(out, "{}: ok ({} applied)", result.name, result.applied.len());
            }
            Some(err) => {
                let _ = writeln!(out, "{}: FAILED: {err}", result.name);
            }
        }
    }
    let failed = report.failures().len();
    let _ = writeln!(
        out,
        "{} database(s), {} ok, {failed} failed",
        report.results.len(),
        report.results.len() - failed
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExecutionResult, OperationKind, PlannedOperation};

    #[test]
    fn plan_masks_passwords_and_marks_converged_names() {
        let plans = vec![
            TargetPlan {
                name: "n8n".into(),
                operations: vec![
                    PlannedOperation::new(OperationKind::CreateRole, "n8n"),
                    PlannedOperation::new(OperationKind::AlterRolePassword, "n8n"),
                ],
            },
            TargetPlan {
                name: "done".into(),
                operations: Vec::new(),
            },
        ];
        let text = render_plan(&plans);
        assert!(text.contains("[dry-run] n8n: 2 operation(s)"));
        assert!(text.contains("  CreateRole(n8n)"));
        assert!(text.contains(r#"would run: ALTER ROLE "n8n" WITH LOGIN PASSWORD *****"#));
        assert!(text.contains("[dry-run] done: up to date"));
    }

    #[test]
    fn summary_lists_every_failure() {
        let report = RunReport {
            dry_run: false,
            results: vec![
                ExecutionResult::succeeded(
                    "a",
                    vec![PlannedOperation::new(OperationKind::CreateRole, "a")],
                ),
                ExecutionResult::failed("b", Vec::new(), "CreateRole(b) failed: boom"),
            ],
        };
        let text = render_summary(&report);
        assert!(text.contains("a: ok (1 applied)"));
        assert!(text.contains("b: FAILED: CreateRole(b) failed: boom"));
        assert!(text.ends_with("2 database(s), 1 ok, 1 failed\n"));
    }
}
