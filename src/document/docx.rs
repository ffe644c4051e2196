use std::path::Path;

use docx_rs::{
    DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent, TableChild,
    TableRowChild, read_docx,
};

use super::ExtractionError;

/// Read every paragraph of the document body, one line per paragraph. Table cells are read
/// row by row.
pub(super) fn extract(path: &Path) -> Result<String, ExtractionError> {
    let buffer = std::fs::read(path)?;
    let document = read_docx(&buffer).map_err(|error| ExtractionError::Docx(error.to_string()))?;

    let mut text = String::new();
    for child in &document.document.children {
        match child {
            DocumentChild::Paragraph(paragraph) => {
                push_paragraph(paragraph, &mut text);
            }
            DocumentChild::Table(table) => push_table(table, &mut text),
            _ => {}
        }
    }

    Ok(text)
}

fn push_paragraph(paragraph: &Paragraph, text: &mut String) {
    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for node in &run.children {
                match node {
                    RunChild::Text(t) => text.push_str(&t.text),
                    RunChild::Tab(_) => text.push('\t'),
                    RunChild::Break(_) => text.push('\n'),
                    _ => {}
                }
            }
        }
    }
    text.push('\n');
}

fn push_table(table: &Table, text: &mut String) {
    for row in &table.rows {
        let TableChild::TableRow(row) = row;
        for cell in &row.cells {
            let TableRowChild::TableCell(cell) = cell;
            for content in &cell.children {
                if let TableCellContent::Paragraph(paragraph) = content {
                    push_paragraph(paragraph, text);
                }
            }
        }
    }
}
