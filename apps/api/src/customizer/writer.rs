//! Format-preserving writer — inserts planned bullets after each section's anchor,
//! cloning the formatting of the section's last bullet.

use tracing::debug;

use crate::customizer::distributor::DistributionPlan;
use crate::customizer::locator::ProjectSection;
use crate::docx::{Block, BulletTemplate, DocxError, Insertion, ParsedDocument};

#[derive(Debug, Clone)]
pub struct WriteOutcome {
    pub document: ParsedDocument,
    pub points_written: usize,
    pub warnings: Vec<String>,
}

/// Applies the plan. Existing paragraphs are never modified: all new paragraphs for a
/// section are spliced in, contiguous and in plan order, right after its anchor.
///
/// Errors only if the spliced XML no longer scans, which means a rendered template
/// broke the document.
pub fn write_plan(
    document: &ParsedDocument,
    sections: &[ProjectSection],
    plan: &DistributionPlan,
) -> Result<WriteOutcome, DocxError> {
    let mut insertions = Vec::new();
    let mut warnings = Vec::new();
    let mut points_written = 0;

    for (section_index, bullets) in plan.iter() {
        if bullets.is_empty() {
            continue;
        }
        let Some(section) = sections.iter().find(|s| s.index == section_index) else {
            warnings.push(format!(
                "plan references unknown section {section_index}; {} points skipped",
                bullets.len()
            ));
            continue;
        };
        let Some(anchor) = document.block(section.insertion_anchor.block_index()) else {
            warnings.push(format!(
                "anchor for section '{}' is missing; {} points skipped",
                section.heading,
                bullets.len()
            ));
            continue;
        };

        let template = template_for(section, anchor, &mut warnings);
        let xml: String = bullets.iter().map(|b| template.render(b)).collect();
        debug!(
            section = section.index,
            heading = %section.heading,
            bullets = bullets.len(),
            "Inserting bullets"
        );

        insertions.push(Insertion {
            offset: anchor.span.end,
            xml,
        });
        points_written += bullets.len();
    }

    let document = if insertions.is_empty() {
        document.clone()
    } else {
        document.splice(insertions)?
    };

    Ok(WriteOutcome {
        document,
        points_written,
        warnings,
    })
}

fn template_for(
    section: &ProjectSection,
    anchor: &Block,
    warnings: &mut Vec<String>,
) -> BulletTemplate {
    if section.existing_bullet_count > 0 {
        return BulletTemplate::from_bullet(anchor);
    }
    BulletTemplate::from_marker(anchor).unwrap_or_else(|| {
        warnings.push(format!(
            "no formatting template for section '{}'; using default bullet style",
            section.heading
        ));
        BulletTemplate::neutral()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customizer::distributor::{distribute, ActiveSetPolicy};
    use crate::customizer::locator::{locate_sections, SectionRules};
    use crate::customizer::tech_stack::parse_tech_stacks;
    use crate::docx::fixtures::{document_xml, two_project_resume, DocxFixture};

    fn run(fixture: &DocxFixture, tech_stack: &str) -> (ParsedDocument, WriteOutcome) {
        let doc = ParsedDocument::parse(document_xml(fixture)).unwrap();
        let located = locate_sections(&doc, &SectionRules::default());
        let parsed = parse_tech_stacks(tech_stack);
        let dist = distribute(&parsed.entries, &located.sections, &ActiveSetPolicy::default());
        let outcome = write_plan(&doc, &located.sections, &dist.plan).unwrap();
        (doc, outcome)
    }

    fn texts(doc: &ParsedDocument) -> Vec<&str> {
        doc.blocks().iter().map(|b| b.text.as_str()).collect()
    }

    #[test]
    fn test_inserts_after_last_bullet_of_each_section() {
        let (_, outcome) = run(&two_project_resume(), "Python: • P1 • P2 • P3");

        assert_eq!(outcome.points_written, 3);
        assert_eq!(
            texts(&outcome.document)[3..],
            [
                "Senior Developer | Acme Corp | 2021 - Present",
                "Responsibilities:",
                "Designed order service",
                "Led migration to Postgres",
                "P1",
                "P3",
                "Software Engineer | Globex | 2018 - 2021",
                "Responsibilities:",
                "Maintained billing jobs",
                "P2",
            ]
        );
    }

    #[test]
    fn test_new_bullets_clone_numbering_and_runs() {
        let (_, outcome) = run(&two_project_resume(), "Rust: • Wrote a parser");
        let inserted = outcome
            .document
            .blocks()
            .iter()
            .find(|b| b.text == "Wrote a parser")
            .unwrap();

        let numbering = inserted.format.numbering.as_ref().expect("numbered");
        assert_eq!(numbering.num_id, "1");
        assert_eq!(inserted.format.style_id.as_deref(), Some("ListParagraph"));
        assert!(inserted
            .format
            .run_properties
            .as_deref()
            .unwrap()
            .contains(r#"<w:sz w:val="22"/>"#));
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_glyph_bullets_keep_glyph_and_font() {
        let fixture = DocxFixture::new()
            .marker("Responsibilities:")
            .glyph_bullet("Tuned queries");
        let (_, outcome) = run(&fixture, "SQL: • Added indexes");

        let inserted = outcome.document.blocks().last().unwrap();
        assert_eq!(inserted.text, "•\tAdded indexes");
        assert!(inserted.format.run_properties.as_deref().unwrap().contains("Arial"));
        assert!(inserted.is_list_item());
    }

    #[test]
    fn test_list_styled_glyph_bullets_keep_glyph() {
        let fixture = DocxFixture::new().marker("Responsibilities:").raw(concat!(
            r#"<w:p><w:pPr><w:pStyle w:val="ListParagraph"/><w:ind w:left="360"/></w:pPr>"#,
            r#"<w:r><w:t>•</w:t><w:tab/><w:t>Tuned queries</w:t></w:r></w:p>"#
        ));
        let (_, outcome) = run(&fixture, "SQL: • Added indexes");

        assert_eq!(
            texts(&outcome.document),
            vec!["Responsibilities:", "•\tTuned queries", "•\tAdded indexes"]
        );
        let inserted = outcome.document.blocks().last().unwrap();
        assert_eq!(inserted.format.style_id.as_deref(), Some("ListParagraph"));
    }

    #[test]
    fn test_existing_content_is_byte_identical() {
        let fixture = two_project_resume();
        let (original, outcome) = run(&fixture, "Python: • a • b • c • d\nAWS: • e");

        let mut remaining = outcome.document.xml().to_string();
        let mut inserted_spans: Vec<_> = outcome
            .document
            .blocks()
            .iter()
            .filter(|b| ["a", "b", "c", "d", "e"].contains(&b.text.as_str()))
            .map(|b| b.span.clone())
            .collect();
        assert_eq!(inserted_spans.len(), 5);

        inserted_spans.sort_by_key(|s| std::cmp::Reverse(s.start));
        for span in inserted_spans {
            remaining.replace_range(span, "");
        }
        assert_eq!(remaining, original.xml());
    }

    #[test]
    fn test_section_without_bullets_uses_marker_formatting() {
        let fixture = DocxFixture::new()
            .heading("Data Engineer | Initech")
            .marker("Responsibilities:")
            .plain("Trailing note");
        let (_, outcome) = run(&fixture, "Spark: • Built ETL");

        assert_eq!(
            texts(&outcome.document),
            vec!["Data Engineer | Initech", "Responsibilities:", "• Built ETL", "Trailing note"]
        );
        let inserted = &outcome.document.blocks()[2];
        assert!(inserted.format.run_properties.as_deref().unwrap().contains("<w:b/>"));
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_unformatted_marker_falls_back_with_warning() {
        let fixture = DocxFixture::new()
            .heading("Data Engineer | Initech")
            .bare_marker("Responsibilities:");
        let (_, outcome) = run(&fixture, "Spark: • Built ETL");

        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("default bullet style"));
        let inserted = outcome.document.blocks().last().unwrap();
        assert_eq!(inserted.text, "• Built ETL");
        assert!(inserted
            .format
            .paragraph_properties
            .as_deref()
            .unwrap()
            .contains(r#"w:left="720""#));
    }

    #[test]
    fn test_empty_plan_leaves_document_unchanged() {
        let (original, outcome) = run(&two_project_resume(), "");
        assert_eq!(outcome.points_written, 0);
        assert_eq!(outcome.document.xml(), original.xml());
    }

    #[test]
    fn test_bullet_text_is_escaped() {
        let (_, outcome) = run(&two_project_resume(), "C++: • Cut p99 <50ms & saved $10k");
        assert!(outcome
            .document
            .blocks()
            .iter()
            .any(|b| b.text == "Cut p99 <50ms & saved $10k"));
        assert!(outcome.document.xml().contains("Cut p99 &lt;50ms &amp; saved $10k"));
    }

    #[test]
    fn test_sections_beyond_active_set_untouched() {
        let fixture = DocxFixture::new()
            .marker("Responsibilities:")
            .numbered_bullet("one")
            .marker("Responsibilities:")
            .numbered_bullet("two")
            .marker("Responsibilities:")
            .numbered_bullet("three")
            .marker("Responsibilities:")
            .numbered_bullet("four");
        let (_, outcome) = run(&fixture, "Go: • a • b • c • d");

        assert_eq!(
            texts(&outcome.document),
            vec![
                "Responsibilities:", "one", "a", "d",
                "Responsibilities:", "two", "b",
                "Responsibilities:", "three", "c",
                "Responsibilities:", "four",
            ]
        );
    }
}
