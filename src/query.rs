//! Search filters and sorting over the book collection.

use std::{fmt::Display, str::FromStr};

use crate::types::{book::Book, date::PublishedDate};

/// Fields a view can be filtered or sorted on, named as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    Isbn,
    Title,
    Author,
    Language,
    DatePublished,
    TotalBooks,
    AvailableBooks,
}

impl SortKey {
    pub const ALL: [SortKey; 7] = [
        SortKey::Isbn,
        SortKey::Title,
        SortKey::Author,
        SortKey::Language,
        SortKey::DatePublished,
        SortKey::TotalBooks,
        SortKey::AvailableBooks,
    ];

    pub fn wire_name(&self) -> &'static str {
        match self {
            SortKey::Isbn => "Isbn",
            SortKey::Title => "Title",
            SortKey::Author => "Author",
            SortKey::Language => "Language",
            SortKey::DatePublished => "DatePublished",
            SortKey::TotalBooks => "Totalbooks",
            SortKey::AvailableBooks => "Availbooks",
        }
    }
}

impl Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        let aliases: &[(&str, SortKey)] = &[
            ("date", SortKey::DatePublished),
            ("total", SortKey::TotalBooks),
            ("available", SortKey::AvailableBooks),
        ];
        SortKey::ALL
            .iter()
            .copied()
            .find(|key| key.wire_name().to_lowercase() == wanted)
            .or_else(|| {
                aliases
                    .iter()
                    .find(|(alias, _)| *alias == wanted)
                    .map(|(_, key)| *key)
            })
            .ok_or_else(|| format!("Unknown field '{s}'"))
    }
}

/// A single condition on the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Isbn equals the key.
    IsbnEquals(String),
    /// Title contains the substring.
    TitleContains(String),
    /// Publication date within the inclusive range.
    PublishedBetween(PublishedDate, PublishedDate),
}

impl Filter {
    pub fn matches(&self, book: &Book) -> bool {
        match self {
            Filter::IsbnEquals(isbn) => book.isbn == *isbn,
            Filter::TitleContains(needle) => book
                .title
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            Filter::PublishedBetween(low, high) => {
                *low <= book.date_published && book.date_published <= *high
            }
        }
    }

    /// OData v2 `$filter` fragment.
    pub fn to_odata(&self) -> String {
        match self {
            Filter::IsbnEquals(isbn) => format!("Isbn eq {}", string_literal(isbn)),
            Filter::TitleContains(needle) => {
                format!("substringof({},Title)", string_literal(needle))
            }
            Filter::PublishedBetween(low, high) => format!(
                "(DatePublished ge {} and DatePublished le {})",
                low.to_filter_literal(),
                high.to_filter_literal()
            ),
        }
    }
}

fn string_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// A read request against the collection: all filters must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub filters:  Vec<Filter>,
    pub order_by: Option<(SortKey, bool)>,
}

impl Query {
    pub fn filter_expression(&self) -> Option<String> {
        if self.filters.is_empty() {
            return None;
        }
        Some(
            self.filters
                .iter()
                .map(Filter::to_odata)
                .collect::<Vec<_>>()
                .join(" and "),
        )
    }

    pub fn order_expression(&self) -> Option<String> {
        self.order_by.map(|(key, descending)| {
            format!("{} {}", key.wire_name(), if descending { "desc" } else { "asc" })
        })
    }

    pub fn matches(&self, book: &Book) -> bool {
        self.filters.iter().all(|filter| filter.matches(book))
    }
}

/// Why the date range was left out of a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateFilterSkipped {
    MissingBound,
    InvalidBound(String),
}

impl Display for DateFilterSkipped {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateFilterSkipped::MissingBound => write!(
                f,
                "No publication date range given, searching without date filter"
            ),
            DateFilterSkipped::InvalidBound(value) => write!(
                f,
                "'{value}' is not a valid date, searching without date filter"
            ),
        }
    }
}

/// What the user typed into the search bar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    pub title:          Option<String>,
    /// `dd/MM/yyyy`
    pub published_from: Option<String>,
    /// `dd/MM/yyyy`
    pub published_to:   Option<String>,
    /// Ordering requested from the service, descending when `true`.
    pub order_by:       Option<(SortKey, bool)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPlan {
    pub query:   Query,
    pub warning: Option<DateFilterSkipped>,
}

fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl SearchCriteria {
    /// Builds the filter conjunction. A missing or malformed date bound drops
    /// the date filter and reports why instead of failing the search.
    pub fn plan(&self) -> SearchPlan {
        let mut filters = vec![];
        if let Some(title) = non_blank(&self.title) {
            filters.push(Filter::TitleContains(title.to_string()));
        }
        let warning = match (non_blank(&self.published_from), non_blank(&self.published_to)) {
            (Some(from), Some(to)) => {
                match (PublishedDate::parse_display(from), PublishedDate::parse_display(to)) {
                    (Ok(low), Ok(high)) => {
                        filters.push(Filter::PublishedBetween(low, high));
                        None
                    }
                    (Err(_), _) => Some(DateFilterSkipped::InvalidBound(from.to_string())),
                    (_, Err(_)) => Some(DateFilterSkipped::InvalidBound(to.to_string())),
                }
            }
            _ => Some(DateFilterSkipped::MissingBound),
        };
        SearchPlan {
            query: Query {
                filters,
                order_by: self.order_by,
            },
            warning,
        }
    }
}

/// Reorders a view on one key. The sort is stable, rows with equal keys keep
/// their relative order.
pub fn sort(mut view: Vec<Book>, key: SortKey, descending: bool) -> Vec<Book> {
    view.sort_by(|a, b| {
        let ordering = match key {
            SortKey::Isbn => a.isbn.cmp(&b.isbn),
            SortKey::Title => a.title.cmp(&b.title),
            SortKey::Author => a.author.cmp(&b.author),
            SortKey::Language => a.language.cmp(&b.language),
            SortKey::DatePublished => a.date_published.cmp(&b.date_published),
            SortKey::TotalBooks => a.total_books.cmp(&b.total_books),
            SortKey::AvailableBooks => a.available_books.cmp(&b.available_books),
        };
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
    view
}
