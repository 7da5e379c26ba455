use booklist::{config::Config, types::book::Book};

const HEADERS: [&str; 7] = [
    "Isbn",
    "Title",
    "Author",
    "Language",
    "Published",
    "Total",
    "Available",
];

fn cells(book: &Book) -> [String; 7] {
    [
        book.isbn.clone(),
        book.title.clone(),
        book.author.clone(),
        book.language.clone(),
        book.date_published.to_display(),
        book.total_books.to_string(),
        book.available_books.to_string(),
    ]
}

fn pad(s: &str, width: usize) -> String {
    format!("{s:<width$}")
}

/// Renders the current list as an aligned table.
pub fn render(view: &[Book], config: &Config) -> String {
    if view.is_empty() {
        return config.output_info.format("No books");
    }
    let rows = view.iter().map(cells).collect::<Vec<_>>();
    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header = HEADERS
        .iter()
        .zip(widths)
        .map(|(h, w)| pad(h, w))
        .collect::<Vec<_>>()
        .join("  ");
    let mut lines = vec![config.output_header.format(header.trim_end())];
    for row in rows {
        let line = row
            .iter()
            .zip(widths)
            .map(|(cell, w)| pad(cell, w))
            .collect::<Vec<_>>()
            .join("  ");
        lines.push(config.output_row.format(line.trim_end()));
    }
    lines.join("\n")
}
