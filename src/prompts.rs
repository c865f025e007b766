//! Prompt text sent with every review request.
//!
//! Callers can replace the schema description through
//! [`crate::config::ReviewConfig::response_format`]; the constant here is used
//! otherwise.

/// Schema the model must answer with, written as a TypeScript-style interface
/// because models follow that notation more reliably than JSON Schema.
pub const AI_RESPONSE_FORMAT: &str = r#"
interface Feedback {
  overallScore: number; //max 100
  ATS: {
    score: number; //rate based on ATS suitability
    tips: {
      type: "good" | "improve";
      tip: string; //give 3-4 tips
    }[];
  };
  toneAndStyle: {
    score: number; //max 100
    tips: {
      type: "good" | "improve";
      tip: string; //make it a short "title" for the actual explanation
      explanation: string; //explain in detail here
    }[]; //give 3-4 tips
  };
  content: {
    score: number; //max 100
    tips: {
      type: "good" | "improve";
      tip: string; //make it a short "title" for the actual explanation
      explanation: string; //explain in detail here
    }[]; //give 3-4 tips
  };
  structure: {
    score: number; //max 100
    tips: {
      type: "good" | "improve";
      tip: string; //make it a short "title" for the actual explanation
      explanation: string; //explain in detail here
    }[]; //give 3-4 tips
  };
  skills: {
    score: number; //max 100
    tips: {
      type: "good" | "improve";
      tip: string; //make it a short "title" for the actual explanation
      explanation: string; //explain in detail here
    }[]; //give 3-4 tips
  };
}"#;

/// Build the review instructions for one submission.
///
/// `language`, when set, requires every piece of feedback text in that
/// language. Field names and `type` values stay in English either way.
pub fn prepare_instructions(
    job_title: &str,
    job_description: &str,
    response_format: &str,
    language: Option<&str>,
) -> String {
    let mut prompt = format!(
        "You are an expert in ATS (Applicant Tracking System) and resume analysis.
Please analyze and rate this resume and suggest how to improve it.
The rating can be low if the resume is bad.
Be thorough and detailed. Don't be afraid to point out any mistakes or areas for improvement.
If there is a lot to improve, don't hesitate to give low scores. This is to help the user to improve their resume.
If available, use the job description for the job user is applying to to give more detailed feedback.
If provided, take the job description into consideration.
The job title is: {job_title}
The job description is: {job_description}
Provide the feedback using the following format: {response_format}
Return the analysis as a JSON object, without any other text and without the backticks.
Do not include any other text or comments."
    );

    if let Some(lang) = language.map(str::trim).filter(|l| !l.is_empty()) {
        prompt.push_str(&format!(
            "\nIMPORTANT: All feedback text, tips, explanations and suggestions must be written in {lang}. \
Keep the JSON field names and the \"good\"/\"improve\" values in English."
        ));
    }

    prompt
}
