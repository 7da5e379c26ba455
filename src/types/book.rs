use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::types::date::PublishedDate;

/// A book as stored in the remote entity collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    #[serde(rename = "Isbn")]
    pub isbn:            String,
    #[serde(rename = "Title")]
    pub title:           String,
    #[serde(rename = "Author")]
    pub author:          String,
    #[serde(rename = "Language")]
    pub language:        String,
    #[serde(rename = "DatePublished")]
    pub date_published:  PublishedDate,
    #[serde(rename = "Totalbooks")]
    pub total_books:     u32,
    #[serde(rename = "Availbooks")]
    pub available_books: u32,
}

impl Display for Book {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} by {} ({}, {})",
            self.title, self.author, self.isbn, self.date_published
        )
    }
}

/// Working copy of a book while it is being created or edited. Every field
/// holds the raw text the user typed; turning it into a [Book] is the job of
/// [crate::validation::validate].
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookForm {
    pub isbn:            String,
    pub title:           String,
    pub author:          String,
    pub language:        String,
    /// `dd/MM/yyyy`
    pub date_published:  String,
    pub total_books:     String,
    pub available_books: String,
}

impl BookForm {
    /// Fill the form from a selected row.
    pub fn from_book(book: &Book) -> Self {
        Self {
            isbn:            book.isbn.clone(),
            title:           book.title.clone(),
            author:          book.author.clone(),
            language:        book.language.clone(),
            date_published:  book.date_published.to_display(),
            total_books:     book.total_books.to_string(),
            available_books: book.available_books.to_string(),
        }
    }

    /// Clears every field in place.
    pub fn reset(&mut self) {
        self.isbn.clear();
        self.title.clear();
        self.author.clear();
        self.language.clear();
        self.date_published.clear();
        self.total_books.clear();
        self.available_books.clear();
    }
}

/// Address of a single record inside the entity set, e.g.
/// `Z801_book_entity_daruSet('9780140449136')`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityPath {
    entity_set: String,
    isbn:       String,
}

impl IdentityPath {
    pub fn new(entity_set: impl Into<String>, isbn: impl Into<String>) -> Self {
        Self {
            entity_set: entity_set.into(),
            isbn:       isbn.into(),
        }
    }

    pub fn for_book(entity_set: impl Into<String>, book: &Book) -> Self {
        Self::new(entity_set, book.isbn.clone())
    }

    pub fn isbn(&self) -> &str {
        &self.isbn
    }

    pub fn entity_set(&self) -> &str {
        &self.entity_set
    }
}

impl Display for IdentityPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Quotes inside a string key are doubled.
        write!(
            f,
            "{}('{}')",
            self.entity_set,
            self.isbn.replace('\'', "''")
        )
    }
}
