//! Fixed instruction and generation parameters for LaTeX extraction.

/// Returned verbatim by the service when the image holds no math.
pub const NO_MATH_SENTINEL: &str = "NO_MATH_FOUND";

/// Low temperature keeps transcriptions deterministic.
pub const TEMPERATURE: f64 = 0.1;

pub const MAX_OUTPUT_TOKENS: u32 = 2048;

pub const EXTRACT_LATEX_PROMPT: &str = r#"Analyze this image and extract any mathematical equations, formulas, or expressions.
Convert them to LaTeX format.

Rules:
- Return ONLY the LaTeX code, no explanations
- Use standard LaTeX math notation
- For inline math, don't wrap in $ symbols
- For display/block equations, don't wrap in $$ or \[ \]
- If there are multiple equations, separate them with newlines
- If no math content is found, return "NO_MATH_FOUND""#;
