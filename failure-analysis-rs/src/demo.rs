// failure-analysis-rs/src/demo.rs
//
// Deterministic responder used when no provider credential is configured, or
// when the provider rejects the credential.
//
// A description is lower-cased and matched against keyword rules in priority
// order; the first rule with a keyword present as a substring picks the
// template. Everything except the three template fields is shared.

use std::collections::BTreeMap;

use crate::types::{FailureAnalysis, RECOVERY_DAYS};

/// Template-specific part of a canned analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub name: &'static str,
    pub root_cause: &'static str,
    pub pattern: &'static str,
    pub truth: &'static str,
}

pub const PASSIVE_LEARNING: Template = Template {
    name: "exam",
    root_cause: "Passive learning without active recall. You consumed content but didn't test your understanding under pressure.",
    pattern: "Cramming → False confidence → Performance anxiety → Failure",
    truth: "Watching videos isn't studying. You need to solve problems yourself, time yourself, and fail in practice before the real test.",
};

pub const INSUFFICIENT_MOCK_PRACTICE: Template = Template {
    name: "interview",
    root_cause: "Insufficient mock practice and overconfidence from solving problems in isolation.",
    pattern: "LeetCode in comfort → Avoiding system design → No mock interviews → Freezing under pressure",
    truth: "You prepared for the wrong thing. Interviews test communication and problem-solving under pressure, not just coding ability.",
};

pub const POOR_PLANNING: Template = Template {
    name: "project",
    root_cause: "Poor planning and underestimating complexity. Started coding before understanding requirements.",
    pattern: "Jumping to code → Scope creep → Deadline pressure → Rushed work → Failure",
    truth: "You confused activity with progress. Planning and breaking down problems saves more time than it costs.",
};

pub const EFFORT_VS_EFFECTIVENESS: Template = Template {
    name: "generic",
    root_cause: "Gap between perceived effort and actual effective work. You did things that felt productive but didn't address core weaknesses.",
    pattern: "Surface-level preparation → Avoiding difficult practice → Overconfidence → Reality check → Failure",
    truth: "Effort without direction is just busywork. You need to identify your weakest points and attack them directly.",
};

/// Keyword rules, highest priority first. Anything unmatched gets
/// [`EFFORT_VS_EFFECTIVENESS`].
pub const RULES: &[(&[&str], Template)] = &[
    (&["exam", "test", "quiz"], PASSIVE_LEARNING),
    (&["interview", "interviewed", "interviewing"], INSUFFICIENT_MOCK_PRACTICE),
    (&["project", "assignment", "deadline"], POOR_PLANNING),
];

const SECONDARY_CAUSES: [&str; 3] = [
    "Insufficient practice under realistic conditions",
    "Avoiding difficult or uncomfortable practice scenarios",
    "Overestimating readiness based on passive learning",
];

const CORRECTIVE_ACTIONS: [&str; 5] = [
    "Identify the 3 weakest areas and practice them daily",
    "Create realistic practice scenarios that mirror the actual challenge",
    "Track metrics: time spent, accuracy, consistency",
    "Get external feedback before the next attempt",
    "Build a recovery timeline with specific milestones",
];

const RECOVERY_PLAN: [&str; 7] = [
    "Honest self-assessment: List exactly what went wrong and why",
    "Identify 3 core weaknesses and find resources to address them",
    "Create a structured practice schedule with daily goals",
    "Start practicing the hardest problems/scenarios first",
    "Get feedback from someone who succeeded in this area",
    "Simulate the actual conditions and test yourself",
    "Review progress, adjust plan, commit to long-term improvement",
];

const LONG_TERM_WARNING: &str = "If you don't change your approach fundamentally, you'll repeat this cycle. Stop doing what feels comfortable and start doing what's actually effective.";

/// Pick the template for a description.
pub fn classify(description: &str) -> Template {
    let lowered = description.to_lowercase();
    RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(_, template)| *template)
        .unwrap_or(EFFORT_VS_EFFECTIVENESS)
}

/// Build the canned analysis for a description and its numeric signals.
pub fn generate_demo_response(
    description: &str,
    effort: u8,
    prep_hours: u64,
    confidence: u8,
) -> FailureAnalysis {
    let template = classify(description);

    let seven_day_recovery_plan: BTreeMap<String, String> = RECOVERY_DAYS
        .iter()
        .zip(RECOVERY_PLAN.iter())
        .map(|(day, task)| (day.to_string(), task.to_string()))
        .collect();

    FailureAnalysis {
        primary_root_cause: template.root_cause.to_string(),
        secondary_causes: SECONDARY_CAUSES.iter().map(|s| s.to_string()).collect(),
        repeated_behavior_pattern: template.pattern.to_string(),
        false_beliefs_or_assumptions: vec![
            format!("Effort level {}/10 was sufficient", effort),
            format!("{} hours of preparation was enough", prep_hours),
            format!("Confidence level {}/10 reflected actual ability", confidence),
        ],
        harsh_truth: template.truth.to_string(),
        corrective_actions: CORRECTIVE_ACTIONS.iter().map(|s| s.to_string()).collect(),
        seven_day_recovery_plan,
        long_term_warning: LONG_TERM_WARNING.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exam_keywords_pick_passive_learning() {
        for description in [
            "I failed my final EXAM after months of study",
            "Bombed the chemistry quiz this morning",
            "The driving test went terribly wrong",
        ] {
            for (effort, hours, confidence) in [(0, 0, 0), (10, 500, 10), (3, 12, 7)] {
                let analysis = generate_demo_response(description, effort, hours, confidence);
                assert_eq!(analysis.primary_root_cause, PASSIVE_LEARNING.root_cause);
            }
        }
    }

    #[test]
    fn test_rule_priority() {
        assert_eq!(classify("Failed the interview exam for the internship"), PASSIVE_LEARNING);
        assert_eq!(classify("The interview was about my capstone project"), INSUFFICIENT_MOCK_PRACTICE);
        assert_eq!(classify("Missed the deadline on my side project"), POOR_PLANNING);
        assert_eq!(classify("My startup ran out of money and shut down"), EFFORT_VS_EFFECTIVENESS);
        assert_eq!(classify("Bombed the quiz").name, "exam");
        assert_eq!(classify("the bakery closed").name, "generic");
    }

    #[test]
    fn test_substring_matching() {
        // "contest" contains "test"
        assert_eq!(classify("I lost the coding contest in the first round"), PASSIVE_LEARNING);
        // "projected" contains "project"
        assert_eq!(classify("Sales came in well below what I projected"), POOR_PLANNING);
    }

    #[test]
    fn test_recovery_plan_has_seven_ordered_days() {
        let analysis = generate_demo_response("anything at all really, no keywords", 5, 0, 5);
        let keys: Vec<&str> = analysis
            .seven_day_recovery_plan
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, RECOVERY_DAYS);
        assert!(analysis.check_recovery_plan().is_ok());
    }

    #[test]
    fn test_numeric_signals_are_interpolated() {
        let analysis = generate_demo_response("I failed my final exam", 7, 40, 9);
        assert_eq!(
            analysis.false_beliefs_or_assumptions,
            vec![
                "Effort level 7/10 was sufficient".to_string(),
                "40 hours of preparation was enough".to_string(),
                "Confidence level 9/10 reflected actual ability".to_string(),
            ]
        );
    }

    #[test]
    fn test_shared_sections_do_not_depend_on_template() {
        let exam = generate_demo_response("failed the exam", 5, 0, 5);
        let generic = generate_demo_response("the bakery closed", 5, 0, 5);
        assert_eq!(exam.secondary_causes, generic.secondary_causes);
        assert_eq!(exam.corrective_actions, generic.corrective_actions);
        assert_eq!(exam.seven_day_recovery_plan, generic.seven_day_recovery_plan);
        assert_eq!(exam.long_term_warning, generic.long_term_warning);
        assert_ne!(exam.harsh_truth, generic.harsh_truth);
    }

    #[test]
    fn test_idempotent_output() {
        let a = generate_demo_response("I was interviewed for a staff role and froze", 6, 20, 8);
        let b = generate_demo_response("I was interviewed for a staff role and froze", 6, 20, 8);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_empty_description_falls_through() {
        let analysis = generate_demo_response("", 5, 0, 5);
        assert_eq!(analysis.primary_root_cause, EFFORT_VS_EFFECTIVENESS.root_cause);
    }
}
