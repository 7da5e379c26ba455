//! Client-side checks run before anything is sent to the service.

use crate::{
    error::{ParseError, ValidationError, WorkflowError},
    types::{
        book::{Book, BookForm},
        date::PublishedDate,
    },
};

pub const ISBN_MAX_LEN: usize = 13;

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn parse_count(field: &'static str, value: &str) -> Result<u32, ParseError> {
    value.trim().parse::<u32>().map_err(|_| ParseError::Count {
        field,
        value: value.to_string(),
    })
}

/// Checks the form rule by rule and stops at the first failure. On success
/// the typed record is returned.
pub fn validate(form: &BookForm) -> Result<Book, WorkflowError> {
    if is_blank(&form.isbn) {
        return Err(ValidationError::EmptyIsbn.into());
    }
    if form.isbn.trim().chars().count() > ISBN_MAX_LEN {
        return Err(ValidationError::IsbnTooLong { max: ISBN_MAX_LEN }.into());
    }
    if is_blank(&form.title) {
        return Err(ValidationError::EmptyTitle.into());
    }
    if is_blank(&form.author) {
        return Err(ValidationError::EmptyAuthor.into());
    }
    if is_blank(&form.date_published) {
        return Err(ValidationError::EmptyDatePublished.into());
    }
    if is_blank(&form.language) {
        return Err(ValidationError::EmptyLanguage.into());
    }

    let total_books = parse_count("Total number of books", &form.total_books)?;
    let available_books = parse_count("Number of available books", &form.available_books)?;
    if total_books < available_books {
        return Err(ValidationError::AvailableExceedsTotal {
            total:     total_books,
            available: available_books,
        }
        .into());
    }

    let date_published = PublishedDate::parse_display(&form.date_published)?;

    Ok(Book {
        isbn: form.isbn.trim().to_string(),
        title: form.title.trim().to_string(),
        author: form.author.trim().to_string(),
        language: form.language.trim().to_string(),
        date_published,
        total_books,
        available_books,
    })
}

pub fn is_valid(form: &BookForm) -> bool {
    validate(form).is_ok()
}
