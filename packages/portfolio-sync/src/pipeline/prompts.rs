//! LLM prompts for the analysis step.

use sha2::{Digest, Sha256};

/// Prompt for analyzing a company's data-room documents.
pub const ANALYZE_PROMPT: &str = r#"You are analyzing a venture capital portfolio company's data room documents.

Documents inside the PRIORITY DOCUMENTS section come from the company's performance and investor updates. They hold the most recent and most important information: prefer them over the other documents whenever the two disagree.

Based on the documents below, extract all relevant information about this company. Return a JSON object with these fields:
- "description": What does this company do? (2-3 clear sentences. Be specific about their product/service.)
- "latestUpdates": Array of strings - latest news, updates, milestones, or developments mentioned (up to 5 items, most recent first)
- "sector": Industry sector (e.g. "FinTech", "Healthcare", "AI/ML", "Blockchain", "E-commerce", "SaaS", "DeepTech", "Consumer")
- "stage": Investment stage if mentioned (e.g. "Seed", "Series A", "Series B", "Growth")
- "highlights": Array of strings - key achievements, traction metrics, partnerships, or notable facts (up to 5 items)
- "founders": Array of founder/CEO names if mentioned
- "location": Company headquarters location if mentioned
- "keyMetrics": Object with any business metrics found (e.g. {"revenue": "$1M ARR", "users": "50K", "growth": "20% MoM"})

If information is not available for a field, use null for strings/objects and empty array [] for arrays.
Return ONLY valid JSON, no markdown formatting, no code blocks.

{context}"#;

/// Generate a hash of the analysis prompt, stamped on analyzed records.
pub fn analyze_prompt_hash() -> String {
    let mut hasher = Sha256::new();
    hasher.update(ANALYZE_PROMPT.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Format the analysis prompt with an assembled context.
pub fn format_analyze_prompt(context: &str) -> String {
    ANALYZE_PROMPT.replace("{context}", context)
}
