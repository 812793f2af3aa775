// Resume scoring prompt templates.

pub const SCORE_SYSTEM: &str = "\
You are an HR professional. \
Respond only with valid JSON containing 'score' and 'summary' fields.";

pub const SCORE_PROMPT: &str = r#"Analyze this resume against the job description and respond with ONLY a JSON object containing:
- score: number between 1-10
- summary: brief 2-line summary

Job Description:
{job_description}

Resume Text:
{resume_text}"#;
