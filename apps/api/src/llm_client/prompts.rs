// Shared prompt constants used by every capability call.
// Stage-specific prompts live next to the stage (ingestion/, interview/).

/// System prompt that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Appended to every schema-constrained prompt, followed by the schema itself.
pub const SCHEMA_INSTRUCTION: &str = "\
    Your response MUST be a single JSON value conforming exactly to the JSON Schema below. \
    Include every required field. Use only the listed enum values. Do not add extra fields.";

/// Résumé extraction prompt. Replace `{schema}` and `{document_text}` before sending.
pub const EXTRACTION_PROMPT: &str = r#"Extract structured candidate data from the résumé text below.

RULES:
1. Only report what the document states. Never invent contact details, employers or degrees.
2. "experience_years" is the total years of professional experience as a whole number; use null if it cannot be determined.
3. "ats_score" is your 0-100 estimate of how well the résumé would pass an applicant tracking system.
4. "recommended_domain" is the single job domain the candidate fits best.

JSON SCHEMA:
{schema}

RÉSUMÉ TEXT:
{document_text}"#;

/// Fills `{name}` placeholders in one pass. Substituted values are never
/// rescanned, so a value containing `{answer}` stays literal. Unknown
/// placeholders are left as written.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let hit = values.iter().find(|(name, _)| {
            tail.starts_with(name) && tail[name.len()..].starts_with('}')
        });
        match hit {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}
