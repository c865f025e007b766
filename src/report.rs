//! Plain-text presentation of a reviewed submission.
//!
//! Three views, mirroring the results page: a [`Summary`] (overall score and
//! one row per explained category), the ATS block, and a detailed tip list per
//! category. [`render_submission`] stitches them together.

use crate::feedback::{Category, Feedback, Score, TipKind};
use crate::submission::Submission;
use std::fmt::{self, Write as _};

/// Badge shown next to a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreTier {
    Strong,
    GoodStart,
    NeedsWork,
}

impl ScoreTier {
    pub fn for_score(score: Score) -> Self {
        match score.value() {
            Some(s) if s > 70.0 => ScoreTier::Strong,
            Some(s) if s > 49.0 => ScoreTier::GoodStart,
            _ => ScoreTier::NeedsWork,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScoreTier::Strong => "Strong",
            ScoreTier::GoodStart => "Good Start",
            ScoreTier::NeedsWork => "Needs Work",
        }
    }
}

impl fmt::Display for ScoreTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub title: &'static str,
    pub score: Score,
    pub tier: ScoreTier,
}

/// Overall score plus the four explained categories.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub overall: Score,
    pub rows: Vec<SummaryRow>,
}

impl Summary {
    pub fn from_feedback(feedback: &Feedback) -> Self {
        let rows = Category::ALL
            .iter()
            .map(|&c| {
                let score = feedback.section(c).score;
                SummaryRow {
                    title: c.title(),
                    score,
                    tier: ScoreTier::for_score(score),
                }
            })
            .collect();
        Self {
            overall: feedback.overall_score,
            rows,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Your Resume Score: {}/100{}",
            self.overall,
            range_note(self.overall)
        )?;
        writeln!(
            f,
            "This score is calculated based on the variables listed below."
        )?;
        writeln!(f)?;
        let width = self.rows.iter().map(|r| r.title.len()).max().unwrap_or(0);
        for row in &self.rows {
            writeln!(
                f,
                "  {:<width$}  {:>3}/100  {}{}",
                row.title,
                row.score,
                row.tier,
                range_note(row.score),
                width = width
            )?;
        }
        Ok(())
    }
}

fn marker(kind: &TipKind) -> &'static str {
    match kind {
        TipKind::Good => "[+]",
        TipKind::Improve => "[!]",
        TipKind::Other(_) => "[-]",
    }
}

/// Flag for a score the model reported outside the requested shape.
fn range_note(score: Score) -> &'static str {
    if score.is_missing() {
        " [missing]"
    } else if !score.in_range() {
        " [out of range]"
    } else {
        ""
    }
}

/// The ATS score and its tips.
pub fn ats_report(feedback: &Feedback) -> String {
    let ats = &feedback.ats;
    let mut out = format!(
        "ATS Score - {}/100 ({}){}\n",
        ats.score,
        ScoreTier::for_score(ats.score),
        range_note(ats.score)
    );
    out.push_str(
        "How well your resume is likely to perform in Applicant Tracking Systems used by employers.\n",
    );
    for tip in &ats.tips {
        let _ = writeln!(out, "  {} {}", marker(&tip.kind), tip.tip);
    }
    out
}

/// Every category with its tips and explanations.
pub fn detailed_report(feedback: &Feedback) -> String {
    let mut out = String::new();
    for category in Category::ALL {
        let section = feedback.section(category);
        let _ = writeln!(
            out,
            "## {} - {}/100 ({}){}",
            category.title(),
            section.score,
            ScoreTier::for_score(section.score),
            range_note(section.score)
        );
        if section.tips.is_empty() {
            out.push_str("  No tips.\n");
        }
        for tip in &section.tips {
            let _ = writeln!(out, "  {} {}", marker(&tip.kind), tip.tip);
            if !tip.explanation.is_empty() {
                let _ = writeln!(out, "      {}", tip.explanation);
            }
        }
        out.push('\n');
    }
    out
}

/// Full results page for one submission.
pub fn render_submission(submission: &Submission) -> String {
    let mut out = String::from("Resume Review\n");
    if !submission.company_name.is_empty() {
        let _ = writeln!(out, "Company: {}", submission.company_name);
    }
    if !submission.job_title.is_empty() {
        let _ = writeln!(out, "Job title: {}", submission.job_title);
    }
    let _ = writeln!(out, "Resume: {}", submission.resume_path);
    out.push('\n');

    match submission.feedback {
        Some(ref feedback) => {
            let _ = write!(out, "{}", Summary::from_feedback(feedback));
            out.push('\n');
            out.push_str(&ats_report(feedback));
            out.push('\n');
            out.push_str(&detailed_report(feedback));
        }
        None => out.push_str("Analysis pending: no feedback has been stored yet.\n"),
    }
    out
}
