//! Prompt template text
//!
//! Placeholders are `{name}`. Literal braces never appear in templates.

pub const SYNTHESIS: &str = r#"You are an engineering and science tutor for an academic audience. Answer the user's query from the numbered context chunks below, adding general knowledge where the context falls short. Be detailed, technical and well structured.

**USER QUERY:**
"{query}"

**PROVIDED CONTEXT:**
--- START CONTEXT ---
{context}
--- END CONTEXT ---

**OUTPUT STRUCTURE:**
1. REASONING (mandatory): open the response with `<reasoning>` and close it with `</reasoning>`. Inside, lay out how the context answers the query, which chunks you rely on, and what the context does not cover. Nothing may come before `<reasoning>`.
2. FINAL ANSWER (mandatory, after `</reasoning>`):
   * Cite every use of the context by its number, like [1] or [2].
   * If the context is insufficient, say so plainly.
   * General knowledge may fill gaps; the context takes priority.
   * Use a professional tone and Markdown formatting.

**BEGIN RESPONSE (start with `<reasoning>`):**
"#;

pub const SUBQUERY: &str = r#"Generate {count} distinct search queries that each target a different aspect of the user's query. Output ONLY the queries, one per line, with no numbering, bullets or commentary.
User Query: "{query}"
Search Queries:"#;

const ANALYSIS_REASONING_PREAMBLE: &str = r#"**STEP 1: REASONING (optional):**
* You may outline your plan first inside `<reasoning>` and `</reasoning>`. If you do, the analysis must follow the closing tag.

**STEP 2: ANALYSIS:**
* Base the analysis strictly on the document text below.
* Follow the output format exactly.

--- START DOCUMENT TEXT ---
{document}
--- END DOCUMENT TEXT ---
"#;

pub fn faq() -> String {
    format!(
        "{}{}",
        ANALYSIS_REASONING_PREAMBLE,
        r#"
**TASK:** Write about {num_items} frequently asked questions with concise answers, using ONLY the text.
**OUTPUT FORMAT:**
* Start with the first question (after the optional reasoning). No preamble.
* Each item: `Q: <question from the text>` on one line, `A: <concise answer from the text>` on the next.
**BEGIN OUTPUT (start with 'Q:' or `<reasoning>`):**
"#
    )
}

pub fn topics() -> String {
    format!(
        "{}{}",
        ANALYSIS_REASONING_PREAMBLE,
        r#"
**TASK:** Identify the {num_items} most important topics in the text.
**OUTPUT FORMAT:**
* Start with the first topic (after the optional reasoning). No preamble.
* A Markdown bullet list: `*   **Topic name:** one or two sentences drawn ONLY from the text.`
**BEGIN OUTPUT (start with '*   **' or `<reasoning>`):**
"#
    )
}

/// Output is consumed raw as Mermaid syntax
pub const MINDMAP: &str = r#"Convert the user's text into a Mermaid mind map. Produce nothing else.
**RULES:**
1. The first line of the output is the single word `mindmap`. No text before it.
2. Indentation with spaces expresses hierarchy; deeper indentation is a deeper level.
3. No Markdown list markers such as `-`, `*` or `#`.
4. Keep node text short.
**EXAMPLE:**
mindmap
  Main Idea
    Key Concept A
      Detail 1
      Detail 2
    Key Concept B
--- START DOCUMENT TEXT ---
{document}
--- END DOCUMENT TEXT ---
Write the Mermaid mind map now.
"#;
