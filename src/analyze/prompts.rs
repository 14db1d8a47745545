/// Token the validation prompt asks for on success.
pub const VALIDATION_PASSED: &str = "VALIDATION_PASSED";

pub fn scrape_analysis(question: &str, scraped_json: &str, scrape_errors: &[String]) -> String {
    let errors = if scrape_errors.is_empty() {
        "None".to_string()
    } else {
        scrape_errors.join("; ")
    };

    format!(
        r#"
You are a data analysis expert. I have scraped data from websites and need you to analyze it to answer specific questions.

ORIGINAL QUESTION: {question}

SCRAPED DATA: {scraped_json}

SCRAPING ERRORS (if any): {errors}

INSTRUCTIONS:
1. Carefully read through all the scraped data
2. Identify the relevant information needed to answer each question
3. Perform the requested analysis (statistical calculations, correlations, descriptive statistics, charts, etc.)
4. For charts, create them as base64-encoded PNG images under 4,000 bytes (use 80x60 pixels, maximum compression, minimal detail)
5. Return ONLY a JSON object containing the answers

IMPORTANT:
- Read each question in the original prompt carefully
- Answer each question completely and accurately
- If generating charts/graphs, include them as base64 data URIs
- Return structured JSON with clear keys for each answer
- If you cannot answer a specific question due to data limitations, explain why

Respond with ONLY the final JSON result containing the analysis.
"#
    )
}

pub fn validation(question: &str, answer_json: &str) -> String {
    format!(
        r#"
Review this analysis result and verify if it correctly answers all parts of the original question.

ORIGINAL QUESTION: {question}
ANALYSIS RESULT: {answer_json}

Check:
1. Are all questions from the original prompt answered?
2. Are the answers factually correct based on the data?
3. Are any calculations or correlations accurate?
4. Is the JSON format correct?

If everything is correct, respond with: {VALIDATION_PASSED}
If there are issues, respond with: VALIDATION_FAILED: [explanation of issues]
"#
    )
}

/// `file_names` and `file_contents` are already JSON-encoded.
pub fn direct_analysis(question: &str, file_names: &str, file_contents: Option<&str>) -> String {
    let contents = file_contents.unwrap_or("No data files provided");

    format!(
        r#"
You are a data analysis expert. Analyze the provided data and answer the question directly with a JSON response.

Question: {question}

Data files provided: {file_names}
File contents: {contents}

INSTRUCTIONS:
- If data files are provided, analyze them and provide the requested metrics
- Calculate all requested statistical values (totals, mean, median, mode, correlation coefficients, standard deviation, percentiles, etc.)
- For charts, create them as base64-encoded PNG images (max 4KB, use 80x60 pixels, maximum compression, minimal detail)
- Return ONLY a valid JSON object with simple string/number values (NO nested objects allowed)
- Use ONLY simple data types: strings, numbers - absolutely NO nested objects, NO arrays, NO lists
- Each key should have a single value: string OR number (not wrapped in arrays)
- For film titles, use format: "Title (Year)" as a single string
- Do not create any scripts or intermediate files
- Perform all analysis directly and return the final JSON result

Return ONLY valid JSON - no explanatory text before or after.
"#
    )
}
