use crate::config::TaxonomyRules;
use crate::models::file_entry::EnrichedFile;

pub const SYSTEM_PROMPT: &str =
    "You are a professional file organizer. Always respond with valid JSON only.";

fn files_section(files: &[EnrichedFile]) -> String {
    let mut out = String::new();
    for (i, file) in files.iter().enumerate() {
        out.push_str(&format!("{}. {} ({})\n", i + 1, file.name, file.kind));
        if !file.content.is_empty() {
            out.push_str(&format!("   Content sample: {}\n", file.content));
        }
    }
    out
}

fn naming_pattern_rule(naming_pattern: Option<&str>) -> String {
    match naming_pattern.map(str::trim).filter(|p| !p.is_empty()) {
        Some(pattern) => format!(
            "- Follow this naming pattern for every new name: {pattern}\n"
        ),
        None => String::new(),
    }
}

/// Builds the user instruction for one suggestion request. Pure and deterministic.
pub fn build_rename_prompt(
    files: &[EnrichedFile],
    naming_pattern: Option<&str>,
    rules: &TaxonomyRules,
) -> String {
    let files_text = files_section(files);
    let pattern_rule = naming_pattern_rule(naming_pattern);
    let organizations = if rules.known_organizations.is_empty() {
        "(none configured)".to_string()
    } else {
        rules.known_organizations.join(", ")
    };
    let fallback = &rules.fallback_root;
    let count = files.len();

    format!(
        "You are an expert file organizer. I have {count} files/folders that need to be \
organized and renamed for better structure.\n\
\n\
Files to organize:\n\
{files_text}\
\n\
Use each content sample (when present) to understand what the file is about.\n\
\n\
Naming rules:\n\
- Keep file extensions exactly as they are\n\
- Use descriptive, professional naming (PascalCase or words separated by spaces)\n\
- Remove underscores, redundant tokens, stray numbers and unclear abbreviations\n\
- Make names searchable and meaningful\n\
- If it is a chapter or lesson, include its number in a consistent format\n\
{pattern_rule}\
\n\
Foldering rules:\n\
1. These names are businesses or clients and are authoritative: {organizations}. \
When a file belongs to one of them, that name is the top-level folder.\n\
2. Inside each top-level folder use functional subfolders such as SEO, Reports, \
Financials, Guides, Designs, Projects.\n\
3. Never repeat the top-level name inside a subfolder name. Use human-friendly folder \
names with spaces.\n\
4. Never nest a folder under a segment with the same name (no \"Reports/Reports\").\n\
5. Avoid naming collisions and overly deep structures (at most two levels).\n\
6. If no business, client or project is identifiable, use \"{fallback}\" as the \
top-level folder.\n\
7. A folder must never be moved into itself, nor into a folder with the same name in \
any letter case.\n\
\n\
Respond with a JSON array, one object per item above and in the same order:\n\
[\n\
  {{\n\
    \"id\": \"original_file_id\",\n\
    \"currentName\": \"current file name\",\n\
    \"newName\": \"suggested new name\",\n\
    \"newFolder\": \"Top/Function (optional)\",\n\
    \"type\": \"file or folder\",\n\
    \"reason\": \"explanation for the change\"\n\
  }}\n\
]\n\
\n\
Example response:\n\
[\n\
  {{\n\
    \"id\": \"file_1\",\n\
    \"currentName\": \"ch25.pdf\",\n\
    \"newName\": \"Chapter 25 Advanced Topics.pdf\",\n\
    \"newFolder\": \"{fallback}/Guides\",\n\
    \"type\": \"file\",\n\
    \"reason\": \"More descriptive name with proper chapter formatting\"\n\
  }}\n\
]\n\
\n\
Only return valid JSON, no other text."
    )
}
