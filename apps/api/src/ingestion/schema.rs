//! The résumé extraction contract: the JSON Schema sent to the extraction
//! service and the typed check applied to whatever comes back.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::models::resume::{Education, NewResume, ParsingStatus, WorkExperience};

/// JSON Schema for extraction output. Kept in sync with `ExtractedResume`.
pub fn resume_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["candidate_name", "skills", "ats_score"],
        "properties": {
            "candidate_name": {"type": "string"},
            "email": {"type": ["string", "null"]},
            "phone": {"type": ["string", "null"]},
            "skills": {"type": "array", "items": {"type": "string"}},
            "experience_years": {"type": ["integer", "null"], "minimum": 0},
            "education": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["degree", "institution"],
                    "properties": {
                        "degree": {"type": "string"},
                        "institution": {"type": "string"},
                        "year": {"type": ["string", "null"]}
                    }
                }
            },
            "work_experience": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["company", "position"],
                    "properties": {
                        "company": {"type": "string"},
                        "position": {"type": "string"},
                        "duration": {"type": ["string", "null"]}
                    }
                }
            },
            "ats_score": {"type": "integer", "minimum": 0, "maximum": 100},
            "recommended_domain": {"type": ["string", "null"]}
        }
    })
}

/// Extraction output after structural validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractedResume {
    pub candidate_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience_years: Option<u32>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub work_experience: Vec<WorkExperience>,
    pub ats_score: u8,
    #[serde(default)]
    pub recommended_domain: Option<String>,
}

/// Checks raw extraction output against the schema. Returns a message
/// describing the first violation.
pub fn validate_extraction(output: Value) -> Result<ExtractedResume, String> {
    let mut resume: ExtractedResume =
        serde_json::from_value(output).map_err(|e| format!("output violates schema: {e}"))?;

    resume.candidate_name = resume.candidate_name.trim().to_string();
    if resume.candidate_name.is_empty() {
        return Err("candidate_name is empty".to_string());
    }
    if resume.ats_score > 100 {
        return Err(format!("ats_score {} is outside 0-100", resume.ats_score));
    }
    if let Some(years) = resume.experience_years {
        if i32::try_from(years).is_err() {
            return Err(format!("experience_years {years} is out of range"));
        }
    }

    resume.skills = resume
        .skills
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    resume.email = non_blank(resume.email);
    resume.phone = non_blank(resume.phone);
    resume.recommended_domain = non_blank(resume.recommended_domain);

    Ok(resume)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl ExtractedResume {
    pub fn into_new_resume(self, file_url: String) -> NewResume {
        NewResume {
            candidate_name: self.candidate_name,
            email: self.email,
            phone: self.phone,
            skills: self.skills,
            // range checked in validate_extraction
            experience_years: self.experience_years.map(|y| y as i32),
            education: self.education,
            work_experience: self.work_experience,
            ats_score: self.ats_score as i16,
            recommended_domain: self.recommended_domain,
            parsing_status: ParsingStatus::Completed,
            file_url,
        }
    }
}
