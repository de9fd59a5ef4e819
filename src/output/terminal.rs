use comfy_table::presets::UTF8_FULL;
use comfy_table::{CellAlignment, ContentArrangement, Table};

use crate::rows::{Cell, RepoTables, RowTable, View};

/// Render one table with a title line.
pub fn render_table(title: &str, table: &RowTable) -> String {
    let mut rendered = Table::new();
    rendered
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(table.header.clone());
    for row in &table.rows {
        rendered.add_row(row.iter().map(|cell| {
            let text = comfy_table::Cell::new(cell.to_string());
            match cell {
                Cell::Integer(_) | Cell::Percentage(_) => text.set_alignment(CellAlignment::Right),
                Cell::Text(_) | Cell::Empty => text,
            }
        }));
    }
    format!("{}\n{}\n", title, rendered)
}

/// Render the selected views of one repository.
pub fn render_repository(name: &str, tables: &RepoTables, views: &[View]) -> String {
    let mut out = format!("== {} ==\n", name);
    for view in views {
        match view {
            View::Authors => out.push_str(&render_table("Authors", &tables.authors)),
            View::AuthorsFiles => {
                out.push_str(&render_table("Authors-Files", &tables.authors_files))
            }
            View::FilesAuthors => {
                out.push_str(&render_table("Files-Authors", &tables.files_authors))
            }
            View::Files => out.push_str(&render_table("Files", &tables.files)),
            View::Blame => {
                for (file, table) in &tables.blame {
                    out.push_str(&render_table(&format!("Blame {}", file), table));
                }
            }
        }
    }
    out
}
