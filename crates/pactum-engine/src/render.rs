use pactum_core::{Contract, DocumentRenderer, Result};

// Plain-text export. Richer formats (DOCX) live behind the same
// `DocumentRenderer` seam outside this crate.
pub struct TextRenderer;

impl DocumentRenderer for TextRenderer {
    fn render(&self, contract: &Contract) -> Result<Vec<u8>> {
        let metadata = &contract.metadata;
        let mut out = String::new();
        out.push_str(&metadata.title);
        out.push('\n');
        out.push_str(&"=".repeat(metadata.title.chars().count().max(1)));
        out.push('\n');
        if !metadata.description.is_empty() {
            out.push_str(&metadata.description);
            out.push('\n');
        }
        out.push_str(&format!(
            "Status: {} | Created by {} on {}\n",
            metadata.status.as_str(),
            metadata.creator_name,
            metadata.creation_date.format("%Y-%m-%d")
        ));

        for (position, clause) in contract.clauses.iter().enumerate() {
            out.push_str(&format!(
                "\n{}. {}\n\n{}\n",
                position + 1,
                clause.short_title,
                clause.latest_text()
            ));
        }

        Ok(out.into_bytes())
    }
}
