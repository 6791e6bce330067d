use aws_sdk_s3::primitives::ByteStream;
use serde::Serialize;
use tracing::info;

use crate::analysis::schema::Report;
use crate::errors::AppError;
use crate::models::analysis::AnalysisRow;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedReport {
    pub analysis_id: String,
    pub bucket: String,
    pub key: String,
    pub bytes: usize,
}

pub fn export_key(analysis_id: &str) -> String {
    format!("exports/analyses/{analysis_id}.md")
}

/// Renders the report for a completed analysis and uploads it as Markdown.
pub async fn export_report(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    row: &AnalysisRow,
    report: &Report,
) -> Result<ExportedReport, AppError> {
    let md = render_report_to_md(row, report);
    let bytes = md.len();
    let key = export_key(&row.analysis_id);

    s3.put_object()
        .bucket(bucket)
        .key(&key)
        .body(ByteStream::from(md.into_bytes()))
        .content_type("text/markdown")
        .send()
        .await
        .map_err(|e| AppError::S3(format!("upload of {key} failed: {e}")))?;

    info!("Exported analysis {} to s3://{bucket}/{key}", row.analysis_id);

    Ok(ExportedReport {
        analysis_id: row.analysis_id.clone(),
        bucket: bucket.to_string(),
        key,
        bytes,
    })
}

fn push_list(md: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    md.push_str(&format!("### {title}\n"));
    for item in items {
        md.push_str(&format!("- {item}\n"));
    }
    md.push('\n');
}

pub fn render_report_to_md(row: &AnalysisRow, report: &Report) -> String {
    let mut md = format!("# Resume Analysis {}\n\n", row.analysis_id);
    md.push_str(&format!("- **Resume:** {}\n", row.resume_filename));
    md.push_str(&format!(
        "- **Job description:** {}\n",
        row.job_description_filename.as_deref().unwrap_or("Text Input")
    ));
    if let Some(position) = report.position() {
        md.push_str(&format!("- **Position:** {position}\n"));
    }
    md.push_str(&format!("- **Analyzed:** {}\n", row.created_at.to_rfc3339()));
    if let Some(format) = &row.source_format {
        md.push_str(&format!("- **Source format:** {format}\n"));
    }
    md.push('\n');

    md.push_str("## Summary\n\n");
    md.push_str(&format!("- **Score:** {}/100\n", report.score()));
    md.push_str(&format!(
        "- **Chance of selection:** {:.0}%\n",
        report.chance_of_selection_percentage
    ));
    md.push_str(&format!("- **Eligibility:** {}\n", report.resume_eligibility));
    if let Some(error) = &report.validation_error {
        md.push_str(&format!("- **Validation:** {error}\n"));
    }
    md.push('\n');
    if !report.short_conclusion.is_empty() {
        md.push_str(&format!("{}\n\n", report.short_conclusion));
    }
    if !report.overall_fit_summary.is_empty() {
        md.push_str(&format!("{}\n\n", report.overall_fit_summary));
    }
    push_list(&mut md, "Improvement priorities", &report.resume_improvement_priority);

    let Some(detailed) = &report.resume_analysis_report else {
        return md;
    };

    md.push_str("## Strengths\n\n");
    let strengths = &detailed.strengths_analysis;
    push_list(&mut md, "Technical skills", &strengths.technical_skills);
    push_list(&mut md, "Projects", &strengths.project_portfolio);
    push_list(&mut md, "Education", &strengths.educational_background);

    md.push_str("## Gaps\n\n");
    let weaknesses = &detailed.weaknesses_analysis;
    push_list(
        &mut md,
        "Critical gaps",
        &weaknesses.critical_gaps_against_job_description,
    );
    push_list(&mut md, "Technical deficiencies", &weaknesses.technical_deficiencies);
    push_list(&mut md, "Presentation", &weaknesses.resume_presentation_issues);
    push_list(&mut md, "Soft skills", &weaknesses.soft_skills_gaps);
    push_list(&mut md, "Missing elements", &weaknesses.missing_essential_elements);

    md.push_str("## Recommendations\n\n");
    let recommendations = &detailed.improvement_recommendations;
    push_list(&mut md, "Add now", &recommendations.immediate_resume_additions);
    push_list(&mut md, "Priority actions", &recommendations.immediate_priority_actions);
    push_list(&mut md, "Short term", &recommendations.short_term_development_goals);
    push_list(&mut md, "Medium term", &recommendations.medium_term_objectives);

    let assessment = &detailed.final_assessment;
    md.push_str("## Final assessment\n\n");
    if !assessment.hiring_recommendation.is_empty() {
        md.push_str(&format!(
            "- **Recommendation:** {}\n",
            assessment.hiring_recommendation
        ));
    }
    if !assessment.long_term_potential.is_empty() {
        md.push_str(&format!("- **Potential:** {}\n", assessment.long_term_potential));
    }
    md.push('\n');
    push_list(&mut md, "Interview focus", &assessment.key_interview_areas);

    md
}
