//! Analysis documents returned by the engine, versioned.
//!
//! The engine has shipped three response shapes over time. Each has its own type and
//! an explicit migration to the next one: `Basic -> Legacy -> Report`. Only `Report`
//! (the current shape) is stored or served.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

const CURRENT_MARKERS: &[&str] = &[
    "job_description_validity",
    "resume_eligibility",
    "score_out_of_100",
    "chance_of_selection_percentage",
];
const LEGACY_MARKERS: &[&str] = &["overallScore", "matchPercentage", "keywordMatch", "skillsAnalysis"];

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Analysis document is not a JSON object")]
    NotAnObject,

    #[error("Unrecognised analysis document (keys: {0})")]
    UnknownFormat(String),

    #[error("Analysis document does not match its detected schema: {0}")]
    Shape(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Current,
    Legacy,
    Basic,
}

impl SourceFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceFormat::Current => "current",
            SourceFormat::Legacy => "legacy",
            SourceFormat::Basic => "basic",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Current report
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Report {
    pub job_description_validity: String,
    pub resume_validity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<String>,
    pub resume_eligibility: String,
    pub score_out_of_100: f64,
    pub short_conclusion: String,
    pub chance_of_selection_percentage: f64,
    pub resume_improvement_priority: Vec<String>,
    pub overall_fit_summary: String,
    pub resume_analysis_report: Option<DetailedReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
}

impl Report {
    /// Integer score clamped to 0..=100, as stored in the `score` column.
    pub fn score(&self) -> i32 {
        self.score_out_of_100.round().clamp(0.0, 100.0) as i32
    }

    pub fn position(&self) -> Option<&str> {
        self.job_title.as_deref().or_else(|| {
            self.resume_analysis_report
                .as_ref()
                .map(|r| r.candidate_information.position_applied.as_str())
                .filter(|p| !p.is_empty())
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailedReport {
    pub candidate_information: CandidateInformation,
    pub strengths_analysis: StrengthsAnalysis,
    pub weaknesses_analysis: WeaknessesAnalysis,
    pub section_wise_detailed_feedback: SectionWiseFeedback,
    pub improvement_recommendations: ImprovementRecommendations,
    pub soft_skills_enhancement_suggestions: SoftSkillsSuggestions,
    pub final_assessment: FinalAssessment,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateInformation {
    pub name: String,
    pub position_applied: String,
    pub experience_level: String,
    pub current_status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrengthsAnalysis {
    pub technical_skills: Vec<String>,
    pub project_portfolio: Vec<String>,
    pub educational_background: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaknessesAnalysis {
    pub critical_gaps_against_job_description: Vec<String>,
    pub technical_deficiencies: Vec<String>,
    pub resume_presentation_issues: Vec<String>,
    pub soft_skills_gaps: Vec<String>,
    pub missing_essential_elements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionFeedback {
    pub current_state: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissingSections {
    pub certifications: String,
    pub experience: String,
    pub achievements: String,
    pub soft_skills: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionWiseFeedback {
    pub contact_information: SectionFeedback,
    pub profile_summary: SectionFeedback,
    pub education: SectionFeedback,
    pub skills: SectionFeedback,
    pub projects: SectionFeedback,
    pub missing_sections: MissingSections,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImprovementRecommendations {
    pub immediate_resume_additions: Vec<String>,
    pub immediate_priority_actions: Vec<String>,
    pub short_term_development_goals: Vec<String>,
    pub medium_term_objectives: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoftSkillsSuggestions {
    pub communication_skills: Vec<String>,
    pub teamwork_and_collaboration: Vec<String>,
    pub leadership_and_initiative: Vec<String>,
    pub problem_solving_approach: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinalAssessment {
    pub eligibility_status: String,
    pub hiring_recommendation: String,
    pub key_interview_areas: Vec<String>,
    pub onboarding_requirements: Vec<String>,
    pub long_term_potential: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Legacy (camelCase) result
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LegacyResult {
    pub overall_score: f64,
    pub match_percentage: f64,
    pub job_title: Option<String>,
    pub industry: Option<String>,
    pub keyword_match: KeywordMatch,
    pub skills_analysis: SkillsAnalysis,
    pub experience_analysis: Option<ExperienceAnalysis>,
    pub resume_quality: ResumeQuality,
    pub detailed_feedback: DetailedFeedback,
    pub improvement_plan: ImprovementPlan,
    pub overall_recommendation: String,
    pub ai_insights: Vec<String>,
    pub candidate_strengths: Vec<String>,
    pub development_areas: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordMatch {
    pub matched: Vec<String>,
    pub missing: Vec<String>,
    pub percentage: f64,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillCategory {
    pub required: Vec<String>,
    pub present: Vec<String>,
    pub missing: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillsAnalysis {
    pub technical: SkillCategory,
    pub soft: SkillCategory,
    pub industry: SkillCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExperienceAnalysis {
    pub years_required: f64,
    pub years_found: f64,
    pub relevant: bool,
    pub experience_gaps: Vec<String>,
    pub strength_areas: Vec<String>,
    pub improvement_areas: Vec<String>,
}

impl Default for ExperienceAnalysis {
    fn default() -> Self {
        Self {
            years_required: 0.0,
            years_found: 0.0,
            relevant: true,
            experience_gaps: Vec::new(),
            strength_areas: Vec::new(),
            improvement_areas: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualitySubsection {
    pub score: f64,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StructureQuality {
    pub score: f64,
    pub missing_sections: Vec<String>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeQuality {
    pub formatting: QualitySubsection,
    pub content: QualitySubsection,
    pub structure: StructureQuality,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackGroup {
    pub category: String,
    pub points: Vec<String>,
    pub impact: String,
    pub solutions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DetailedFeedback {
    pub strengths: Vec<FeedbackGroup>,
    pub weaknesses: Vec<FeedbackGroup>,
    pub quick_wins: Vec<String>,
    pub industry_insights: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlanItem {
    pub priority: String,
    pub actions: Vec<String>,
    pub estimated_impact: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImprovementPlan {
    pub immediate: Vec<PlanItem>,
    pub short_term: Vec<PlanItem>,
    pub long_term: Vec<PlanItem>,
}

// ────────────────────────────────────────────────────────────────────────────
// Basic result (first engine release)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicResult {
    pub score: f64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
    pub keyword_match: KeywordMatch,
    pub overall_recommendation: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Detection and migration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisDocument {
    Current(Box<Report>),
    Legacy(Box<LegacyResult>),
    Basic(BasicResult),
}

fn has_any(obj: &Map<String, Value>, keys: &[&str]) -> bool {
    keys.iter().any(|k| obj.contains_key(*k))
}

fn is_basic(obj: &Map<String, Value>) -> bool {
    obj.contains_key("score") && (obj.contains_key("strengths") || obj.contains_key("weaknesses"))
}

fn is_recognised(obj: &Map<String, Value>) -> bool {
    has_any(obj, CURRENT_MARKERS) || has_any(obj, LEGACY_MARKERS) || is_basic(obj)
}

impl AnalysisDocument {
    /// Classifies an engine response. An `{"success": .., "analysis": {..}}` envelope is
    /// unwrapped first.
    pub fn detect(value: Value) -> Result<Self, SchemaError> {
        let Value::Object(mut obj) = value else {
            return Err(SchemaError::NotAnObject);
        };

        if !is_recognised(&obj) {
            if let Some(Value::Object(inner)) = obj.remove("analysis") {
                obj = inner;
            }
        }

        if has_any(&obj, CURRENT_MARKERS) {
            return Ok(Self::Current(Box::new(serde_json::from_value(Value::Object(obj))?)));
        }
        if has_any(&obj, LEGACY_MARKERS) {
            return Ok(Self::Legacy(Box::new(serde_json::from_value(Value::Object(obj))?)));
        }
        if is_basic(&obj) {
            return Ok(Self::Basic(serde_json::from_value(Value::Object(obj))?));
        }

        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        Err(SchemaError::UnknownFormat(keys.join(", ")))
    }

    pub fn source_format(&self) -> SourceFormat {
        match self {
            Self::Current(_) => SourceFormat::Current,
            Self::Legacy(_) => SourceFormat::Legacy,
            Self::Basic(_) => SourceFormat::Basic,
        }
    }

    pub fn into_report(self) -> Report {
        match self {
            Self::Current(report) => *report,
            Self::Legacy(legacy) => legacy.migrate(),
            Self::Basic(basic) => basic.migrate().migrate(),
        }
    }
}

impl BasicResult {
    pub fn migrate(self) -> LegacyResult {
        let general = |points: Vec<String>, solutions: Vec<String>| FeedbackGroup {
            category: "General".to_string(),
            points,
            impact: String::new(),
            solutions,
        };
        LegacyResult {
            overall_score: self.score,
            match_percentage: self.keyword_match.percentage,
            skills_analysis: SkillsAnalysis {
                technical: SkillCategory {
                    present: self.keyword_match.matched.clone(),
                    missing: self.keyword_match.missing.clone(),
                    ..Default::default()
                },
                ..Default::default()
            },
            experience_analysis: Some(ExperienceAnalysis::default()),
            detailed_feedback: DetailedFeedback {
                strengths: vec![general(self.strengths.clone(), Vec::new())],
                weaknesses: vec![general(self.weaknesses.clone(), self.suggestions.clone())],
                ..Default::default()
            },
            improvement_plan: ImprovementPlan {
                immediate: vec![PlanItem {
                    priority: "high".to_string(),
                    actions: self.suggestions,
                    estimated_impact: String::new(),
                }],
                ..Default::default()
            },
            overall_recommendation: self.overall_recommendation,
            candidate_strengths: self.strengths,
            development_areas: self.weaknesses,
            keyword_match: self.keyword_match,
            ..Default::default()
        }
    }
}

/// Points of the first feedback group whose category mentions any keyword.
fn points_for(groups: &[FeedbackGroup], keywords: &[&str]) -> Vec<String> {
    groups
        .iter()
        .find(|g| {
            let category = g.category.to_lowercase();
            keywords.iter().any(|k| category.contains(k))
        })
        .map(|g| g.points.clone())
        .unwrap_or_default()
}

fn all_points(groups: &[FeedbackGroup]) -> Vec<String> {
    groups.iter().flat_map(|g| g.points.iter().cloned()).collect()
}

fn first_non_empty(candidates: [Vec<String>; 3]) -> Vec<String> {
    candidates.into_iter().find(|c| !c.is_empty()).unwrap_or_default()
}

fn or_default(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

impl LegacyResult {
    fn section_feedback(&self, section: &str, keywords: &[&str]) -> SectionFeedback {
        let feedback = &self.detailed_feedback;
        let mut strengths = points_for(&feedback.strengths, keywords);
        if strengths.is_empty() {
            strengths = all_points(&feedback.strengths).into_iter().take(2).collect();
        }
        let mut improvements = points_for(&feedback.weaknesses, keywords);
        if improvements.is_empty() {
            improvements = all_points(&feedback.weaknesses).into_iter().take(2).collect();
        }
        let mut title = section.to_string();
        if let Some(first) = title.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        SectionFeedback {
            current_state: format!("{title} section present"),
            strengths,
            improvements,
        }
    }

    pub fn migrate(self) -> Report {
        let feedback = &self.detailed_feedback;
        let skills = &self.skills_analysis;
        let relevant = self
            .experience_analysis
            .as_ref()
            .map(|e| e.relevant)
            .unwrap_or(false);
        let eligibility = if relevant { "Eligible" } else { "Not Eligible" };

        let top_strengths = || all_points(&feedback.strengths).into_iter().take(3).collect();
        let top_weaknesses = || all_points(&feedback.weaknesses).into_iter().take(3).collect();

        let skills_section = SectionFeedback {
            current_state: "Skills section available".to_string(),
            strengths: first_non_empty([
                points_for(&feedback.strengths, &["technical"]),
                self.candidate_strengths.clone(),
                top_strengths(),
            ]),
            improvements: first_non_empty([
                points_for(&feedback.weaknesses, &["technical", "critical"]),
                skills.technical.missing.clone(),
                top_weaknesses(),
            ]),
        };
        let projects_section = SectionFeedback {
            current_state: "Projects section present".to_string(),
            strengths: first_non_empty([
                points_for(&feedback.strengths, &["project", "portfolio"]),
                skills.technical.present.clone(),
                top_strengths(),
            ]),
            improvements: points_for(&feedback.weaknesses, &["project", "experience"]),
        };

        let first_actions = |items: &[PlanItem]| {
            items.first().map(|i| i.actions.clone()).unwrap_or_default()
        };
        let soft_recommendations = skills.soft.recommendations.clone();
        let not_specified = || "Not specified".to_string();

        let detailed = DetailedReport {
            candidate_information: CandidateInformation {
                name: "Candidate".to_string(),
                position_applied: self.job_title.clone().unwrap_or_else(|| "Position".to_string()),
                experience_level: not_specified(),
                current_status: "Active".to_string(),
            },
            strengths_analysis: StrengthsAnalysis {
                technical_skills: self.candidate_strengths.clone(),
                project_portfolio: skills.technical.present.clone(),
                educational_background: skills.industry.present.clone(),
            },
            weaknesses_analysis: WeaknessesAnalysis {
                critical_gaps_against_job_description: skills.technical.missing.clone(),
                technical_deficiencies: self
                    .experience_analysis
                    .as_ref()
                    .map(|e| e.experience_gaps.clone())
                    .unwrap_or_default(),
                resume_presentation_issues: self.resume_quality.formatting.issues.clone(),
                soft_skills_gaps: skills.soft.missing.clone(),
                missing_essential_elements: self.resume_quality.structure.missing_sections.clone(),
            },
            section_wise_detailed_feedback: SectionWiseFeedback {
                contact_information: self
                    .section_feedback("contact", &["contact", "information", "personal"]),
                profile_summary: self
                    .section_feedback("profile", &["profile", "summary", "objective", "overview"]),
                education: self.section_feedback(
                    "education",
                    &["education", "academic", "degree", "university", "college"],
                ),
                skills: skills_section,
                projects: projects_section,
                missing_sections: MissingSections {
                    certifications: not_specified(),
                    experience: not_specified(),
                    achievements: not_specified(),
                    soft_skills: not_specified(),
                },
            },
            improvement_recommendations: ImprovementRecommendations {
                immediate_resume_additions: skills.technical.recommendations.clone(),
                immediate_priority_actions: first_actions(&self.improvement_plan.immediate),
                short_term_development_goals: first_actions(&self.improvement_plan.short_term),
                medium_term_objectives: first_actions(&self.improvement_plan.long_term),
            },
            soft_skills_enhancement_suggestions: SoftSkillsSuggestions {
                communication_skills: soft_recommendations.clone(),
                teamwork_and_collaboration: soft_recommendations.clone(),
                leadership_and_initiative: soft_recommendations.clone(),
                problem_solving_approach: soft_recommendations,
            },
            final_assessment: FinalAssessment {
                eligibility_status: eligibility.to_string(),
                hiring_recommendation: or_default(
                    &self.overall_recommendation,
                    "Consider for interview",
                ),
                key_interview_areas: feedback.weaknesses.iter().map(|w| w.category.clone()).collect(),
                onboarding_requirements: skills.technical.missing.clone(),
                long_term_potential: self
                    .ai_insights
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "Good potential for growth".to_string()),
            },
        };

        Report {
            job_description_validity: "Valid".to_string(),
            resume_validity: "Valid".to_string(),
            validation_error: None,
            resume_eligibility: eligibility.to_string(),
            score_out_of_100: self.overall_score,
            short_conclusion: or_default(&self.overall_recommendation, "Analysis completed"),
            chance_of_selection_percentage: self.match_percentage,
            resume_improvement_priority: self.development_areas.clone(),
            overall_fit_summary: self
                .ai_insights
                .first()
                .cloned()
                .unwrap_or_else(|| "Overall fit assessment completed".to_string()),
            resume_analysis_report: Some(detailed),
            job_title: self.job_title.clone(),
            industry: self.industry.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn legacy_fixture() -> Value {
        json!({
            "overallScore": 72,
            "matchPercentage": 64.5,
            "jobTitle": "Backend Engineer",
            "industry": "Fintech",
            "keywordMatch": {"matched": ["rust"], "missing": ["kafka"], "percentage": 50},
            "skillsAnalysis": {
                "technical": {"present": ["tokio"], "missing": ["kafka"], "recommendations": ["Add Kafka project"]},
                "soft": {"missing": ["mentoring"], "recommendations": ["Mention code reviews"]}
            },
            "experienceAnalysis": {"relevant": true, "experienceGaps": ["No on-call"]},
            "resumeQuality": {"formatting": {"issues": ["Dense layout"]}, "structure": {"missingSections": ["Summary"]}},
            "detailedFeedback": {
                "strengths": [
                    {"category": "Technical Skills", "points": ["Strong async Rust"]},
                    {"category": "Education", "points": ["CS degree"]}
                ],
                "weaknesses": [
                    {"category": "Project Depth", "points": ["Few shipped products"]}
                ]
            },
            "improvementPlan": {"immediate": [{"priority": "high", "actions": ["Quantify impact"]}]},
            "overallRecommendation": "Interview",
            "aiInsights": ["Solid systems background"],
            "candidateStrengths": ["Rust"],
            "developmentAreas": ["Streaming"]
        })
    }

    #[test]
    fn test_detects_current_format() {
        let doc = AnalysisDocument::detect(json!({
            "score_out_of_100": 81,
            "chance_of_selection_percentage": 70,
            "resume_eligibility": "Eligible",
            "resume_analysis_report": null
        }))
        .unwrap();
        assert_eq!(doc.source_format(), SourceFormat::Current);
        let report = doc.into_report();
        assert_eq!(report.score(), 81);
        assert!(report.resume_analysis_report.is_none());
    }

    #[test]
    fn test_current_markers_win_over_legacy_markers() {
        let doc = AnalysisDocument::detect(json!({"score_out_of_100": 10, "overallScore": 99})).unwrap();
        assert_eq!(doc.source_format(), SourceFormat::Current);
    }

    #[test]
    fn test_success_envelope_is_unwrapped() {
        let doc = AnalysisDocument::detect(json!({
            "success": true,
            "analysis": {"score": 55, "strengths": ["a"], "weaknesses": ["b"]},
            "metadata": {"filename": "cv.pdf"}
        }))
        .unwrap();
        assert_eq!(doc.source_format(), SourceFormat::Basic);
    }

    #[test]
    fn test_unknown_format_lists_keys() {
        let err = AnalysisDocument::detect(json!({"zeta": 1, "alpha": 2})).unwrap_err();
        assert_eq!(err.to_string(), "Unrecognised analysis document (keys: alpha, zeta)");
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(matches!(
            AnalysisDocument::detect(json!([1, 2])),
            Err(SchemaError::NotAnObject)
        ));
    }

    #[test]
    fn test_wrongly_typed_field_is_shape_error() {
        assert!(matches!(
            AnalysisDocument::detect(json!({"score_out_of_100": "high"})),
            Err(SchemaError::Shape(_))
        ));
    }

    #[test]
    fn test_legacy_migration_maps_headline_fields() {
        let report = AnalysisDocument::detect(legacy_fixture()).unwrap().into_report();
        assert_eq!(report.score(), 72);
        assert!((report.chance_of_selection_percentage - 64.5).abs() < f64::EPSILON);
        assert_eq!(report.resume_eligibility, "Eligible");
        assert_eq!(report.short_conclusion, "Interview");
        assert_eq!(report.overall_fit_summary, "Solid systems background");
        assert_eq!(report.resume_improvement_priority, vec!["Streaming"]);
        assert_eq!(report.position(), Some("Backend Engineer"));
    }

    #[test]
    fn test_legacy_migration_fills_detailed_report() {
        let report = AnalysisDocument::detect(legacy_fixture()).unwrap().into_report();
        let detailed = report.resume_analysis_report.unwrap();

        assert_eq!(detailed.candidate_information.position_applied, "Backend Engineer");
        assert_eq!(detailed.weaknesses_analysis.critical_gaps_against_job_description, vec!["kafka"]);
        assert_eq!(detailed.weaknesses_analysis.technical_deficiencies, vec!["No on-call"]);
        assert_eq!(detailed.weaknesses_analysis.missing_essential_elements, vec!["Summary"]);

        let sections = &detailed.section_wise_detailed_feedback;
        assert_eq!(sections.skills.strengths, vec!["Strong async Rust"]);
        assert_eq!(sections.education.strengths, vec!["CS degree"]);
        assert_eq!(sections.education.current_state, "Education section present");
        assert_eq!(sections.projects.improvements, vec!["Few shipped products"]);
        // no contact category: falls back to the first general strengths
        assert_eq!(
            sections.contact_information.strengths,
            vec!["Strong async Rust", "CS degree"]
        );

        assert_eq!(
            detailed.improvement_recommendations.immediate_priority_actions,
            vec!["Quantify impact"]
        );
        assert_eq!(
            detailed.improvement_recommendations.immediate_resume_additions,
            vec!["Add Kafka project"]
        );
        assert_eq!(detailed.final_assessment.key_interview_areas, vec!["Project Depth"]);
        assert_eq!(
            detailed.soft_skills_enhancement_suggestions.communication_skills,
            vec!["Mention code reviews"]
        );
    }

    #[test]
    fn test_legacy_without_experience_is_not_eligible() {
        let report = AnalysisDocument::detect(json!({"overallScore": 40})).unwrap().into_report();
        assert_eq!(report.resume_eligibility, "Not Eligible");
        assert_eq!(report.short_conclusion, "Analysis completed");
        assert_eq!(
            report.resume_analysis_report.unwrap().final_assessment.hiring_recommendation,
            "Consider for interview"
        );
    }

    #[test]
    fn test_basic_migrates_through_legacy() {
        let report = AnalysisDocument::detect(json!({
            "score": 66.6,
            "strengths": ["Clear layout"],
            "weaknesses": ["No metrics"],
            "suggestions": ["Add numbers"],
            "keyword_match": {"matched": ["rust"], "missing": ["go"], "percentage": 50.0},
            "overall_recommendation": "Promising"
        }))
        .unwrap()
        .into_report();

        assert_eq!(report.score(), 67);
        assert_eq!(report.resume_eligibility, "Eligible");
        assert_eq!(report.short_conclusion, "Promising");
        let detailed = report.resume_analysis_report.unwrap();
        assert_eq!(detailed.strengths_analysis.technical_skills, vec!["Clear layout"]);
        assert_eq!(
            detailed.improvement_recommendations.immediate_priority_actions,
            vec!["Add numbers"]
        );
        assert_eq!(detailed.final_assessment.onboarding_requirements, vec!["go"]);
    }

    #[test]
    fn test_score_is_clamped() {
        let report = Report {
            score_out_of_100: 140.0,
            ..Default::default()
        };
        assert_eq!(report.score(), 100);
    }
}
