//! Interactive prompts standing in for the input dialog.

use anyhow::Result;
use booklist::types::book::{Book, BookForm};

/// Asks for one field, prefilled with its current value. `None` means the
/// user pressed escape.
fn ask(prompt: &str, current: &str, help: Option<&str>) -> Result<Option<String>> {
    let mut text = inquire::Text::new(prompt).with_initial_value(current);
    if let Some(help) = help {
        text = text.with_help_message(help);
    }
    Ok(text.prompt_skippable()?)
}

/// Walks the user through every field. Returns `false` if the dialog was
/// closed without submitting.
pub fn fill(form: &mut BookForm) -> Result<bool> {
    let fields: [(&str, Option<&str>, &mut String); 7] = [
        ("Isbn:", None, &mut form.isbn),
        ("Title:", None, &mut form.title),
        ("Author:", None, &mut form.author),
        ("Language:", None, &mut form.language),
        ("Date published:", Some("dd/MM/yyyy"), &mut form.date_published),
        ("Total number of books:", None, &mut form.total_books),
        ("Available books:", None, &mut form.available_books),
    ];
    for (prompt, help, value) in fields {
        match ask(prompt, value.as_str(), help)? {
            Some(answer) => *value = answer,
            None => return Ok(false),
        }
    }
    Ok(inquire::Confirm::new("Save book?")
        .with_default(true)
        .prompt()?)
}

/// Picks a row of the current list, either by Isbn or by asking.
pub fn select(view: &[Book], isbn: Option<&str>) -> Result<Option<Book>> {
    if let Some(isbn) = isbn {
        return Ok(view.iter().find(|book| book.isbn == isbn.trim()).cloned());
    }
    if view.is_empty() {
        return Ok(None);
    }
    Ok(inquire::Select::new("Which book?", view.to_vec()).prompt_skippable()?)
}

pub fn confirm_delete(book: &Book) -> Result<bool> {
    Ok(inquire::Confirm::new(&format!("Delete \"{}\"?", book.title))
        .with_default(false)
        .prompt()?)
}
