//! The book editing workflow: validation, searching and the remote writes,
//! plus the per-dialog editing session.

use std::fmt::Display;

use tracing::{debug, error, info, warn};

use crate::{
    error::WorkflowError,
    query::{self, Filter, Query, SearchCriteria, SortKey},
    traits::{BookEndpoint, Notifier},
    types::book::{Book, BookForm, IdentityPath},
    validation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level:   Level,
    pub message: String,
}

impl Notification {
    pub fn new(level: Level, message: impl ToString) -> Self {
        Self {
            level,
            message: message.to_string(),
        }
    }

    pub fn info(message: impl ToString) -> Self {
        Self::new(Level::Info, message)
    }

    pub fn success(message: impl ToString) -> Self {
        Self::new(Level::Success, message)
    }

    pub fn warning(message: impl ToString) -> Self {
        Self::new(Level::Warning, message)
    }

    pub fn error(message: impl ToString) -> Self {
        Self::new(Level::Error, message)
    }
}

impl Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

pub const MSG_CREATED: &str = "Book created";
pub const MSG_UPDATED: &str = "Update successful";
pub const MSG_DELETED: &str = "Book deleted";
pub const MSG_REMOTE_ERROR: &str = "Error!";
pub const MSG_SEARCH_ERROR: &str = "Could not load books";

/// Ties the endpoint to the notifier. Holds no record state of its own; every
/// operation takes the record it works on and hands back the result.
pub struct BookWorkflow<E, N> {
    endpoint: E,
    notifier: N,
}

impl<E, N> BookWorkflow<E, N>
where
    E: BookEndpoint,
    N: Notifier,
{
    pub fn new(endpoint: E, notifier: N) -> Self {
        Self { endpoint, notifier }
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn identity_path(&self, isbn: &str) -> IdentityPath {
        IdentityPath::new(self.endpoint.entity_set(), isbn)
    }

    /// Validates the form, reporting the first broken rule.
    pub fn validate(&self, form: &BookForm) -> Result<Book, WorkflowError> {
        validation::validate(form).map_err(|e| {
            debug!("Rejected form for '{}': {}", form.isbn, e);
            self.notifier.notify(Notification::error(&e));
            e
        })
    }

    /// Runs a search. A missing date range only narrows less, it never fails
    /// the search.
    pub async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Book>, WorkflowError> {
        let plan = criteria.plan();
        if let Some(skipped) = &plan.warning {
            warn!("{}", skipped);
            self.notifier.notify(Notification::warning(skipped));
        }
        match self.endpoint.query(&plan.query).await {
            Ok(books) => {
                info!("Search returned {} books", books.len());
                Ok(books)
            }
            Err(e) => {
                error!("Search failed: {}", e);
                self.notifier.notify(Notification::error(MSG_SEARCH_ERROR));
                Err(e.into())
            }
        }
    }

    /// Reruns a search to pick up a completed write. Reports nothing: the
    /// write already produced its notification.
    pub async fn reload(&self, criteria: &SearchCriteria) -> Result<Vec<Book>, WorkflowError> {
        let plan = criteria.plan();
        match self.endpoint.query(&plan.query).await {
            Ok(books) => {
                debug!("Reloaded {} books", books.len());
                Ok(books)
            }
            Err(e) => {
                warn!("Reloading the list failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Looks a single record up by its Isbn.
    pub async fn find(&self, isbn: &str) -> Result<Option<Book>, WorkflowError> {
        let query = Query {
            filters:  vec![Filter::IsbnEquals(isbn.trim().to_string())],
            order_by: None,
        };
        match self.endpoint.query(&query).await {
            Ok(books) => Ok(books.into_iter().next()),
            Err(e) => {
                error!("Looking up {} failed: {}", isbn, e);
                self.notifier.notify(Notification::error(MSG_SEARCH_ERROR));
                Err(e.into())
            }
        }
    }

    pub fn sort(&self, view: Vec<Book>, key: SortKey, descending: bool) -> Vec<Book> {
        query::sort(view, key, descending)
    }

    pub async fn create(&self, form: &BookForm) -> Result<Book, WorkflowError> {
        let book = self.validate(form)?;
        self.create_book(book).await
    }

    pub async fn update(
        &self,
        form: &BookForm,
        target: &IdentityPath,
    ) -> Result<Book, WorkflowError> {
        let book = self.validate(form)?;
        self.update_book(book, target).await
    }

    /// The selected row, or a "No book selected" notification.
    pub fn selected<'a>(&self, selection: Option<&'a Book>) -> Result<&'a Book, WorkflowError> {
        selection.ok_or_else(|| {
            self.notifier
                .notify(Notification::warning(WorkflowError::NoSelection));
            WorkflowError::NoSelection
        })
    }

    /// Deletes the selected row, if any.
    pub async fn delete(&self, selection: Option<&Book>) -> Result<Book, WorkflowError> {
        let book = self.selected(selection)?;
        let path = IdentityPath::for_book(self.endpoint.entity_set(), book);
        debug!("Deleting {}", path);
        match self.endpoint.delete(&path).await {
            Ok(()) => {
                info!("Deleted {}", path);
                self.notifier.notify(Notification::success(MSG_DELETED));
                Ok(book.clone())
            }
            Err(e) => {
                error!("Deleting {} failed: {}", path, e);
                self.notifier.notify(Notification::error(MSG_REMOTE_ERROR));
                Err(e.into())
            }
        }
    }

    async fn create_book(&self, book: Book) -> Result<Book, WorkflowError> {
        debug!("Creating {}", book.isbn);
        match self.endpoint.create(&book).await {
            Ok(()) => {
                info!("Created {}", book.isbn);
                self.notifier.notify(Notification::success(MSG_CREATED));
                Ok(book)
            }
            Err(e) => {
                error!("Creating {} failed: {}", book.isbn, e);
                self.notifier.notify(Notification::error(MSG_REMOTE_ERROR));
                Err(e.into())
            }
        }
    }

    async fn update_book(&self, book: Book, target: &IdentityPath) -> Result<Book, WorkflowError> {
        debug!("Updating {}", target);
        match self.endpoint.update(target, &book).await {
            Ok(()) => {
                info!("Updated {}", target);
                self.notifier.notify(Notification::success(MSG_UPDATED));
                Ok(book)
            }
            Err(e) => {
                error!("Updating {} failed: {}", target, e);
                self.notifier.notify(Notification::error(MSG_REMOTE_ERROR));
                Err(e.into())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditMode {
    New,
    Existing(IdentityPath),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Editing {
        mode: EditMode,
        form: BookForm,
    },
    Validating {
        mode: EditMode,
        form: BookForm,
    },
    Submitting {
        mode: EditMode,
        book: Book,
    },
}

/// How a submission ended.
#[derive(Debug)]
pub enum SubmitOutcome {
    Saved(Book),
    /// Stopped before a request was issued.
    Rejected(WorkflowError),
    /// The service reported an error.
    Failed(WorkflowError),
}

impl SubmitOutcome {
    /// The dialog closes once a request has been issued, whatever the
    /// service answered. Local rejections keep it open for correction.
    pub fn closes_dialog(&self) -> bool {
        !matches!(self, SubmitOutcome::Rejected(_))
    }

    pub fn book(&self) -> Option<&Book> {
        match self {
            SubmitOutcome::Saved(book) => Some(book),
            _ => None,
        }
    }
}

impl From<Result<Book, WorkflowError>> for SubmitOutcome {
    fn from(result: Result<Book, WorkflowError>) -> Self {
        match result {
            Ok(book) => SubmitOutcome::Saved(book),
            Err(e) if e.is_local() => SubmitOutcome::Rejected(e),
            Err(e) => SubmitOutcome::Failed(e),
        }
    }
}

/// One input dialog: `Idle -> Editing -> Validating -> Submitting -> Idle`,
/// falling back to `Editing` when validation fails.
#[derive(Debug, Default)]
pub struct EditSession {
    state: SessionState,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == SessionState::Idle
    }

    /// Opens the dialog with an empty form.
    pub fn begin_new(&mut self) -> &mut BookForm {
        let mut form = match std::mem::take(&mut self.state) {
            SessionState::Editing { form, .. } | SessionState::Validating { form, .. } => form,
            _ => BookForm::default(),
        };
        form.reset();
        self.editing(EditMode::New, form)
    }

    /// Opens the dialog prefilled with the selected row.
    pub fn begin_edit(&mut self, target: IdentityPath, book: &Book) -> &mut BookForm {
        self.editing(EditMode::Existing(target), BookForm::from_book(book))
    }

    fn editing(&mut self, mode: EditMode, form: BookForm) -> &mut BookForm {
        debug!("Editing {:?}", mode);
        self.state = SessionState::Editing { mode, form };
        match &mut self.state {
            SessionState::Editing { form, .. } => form,
            _ => unreachable!("state was just set to Editing"),
        }
    }

    pub fn form(&self) -> Option<&BookForm> {
        match &self.state {
            SessionState::Editing { form, .. } => Some(form),
            _ => None,
        }
    }

    pub fn form_mut(&mut self) -> Option<&mut BookForm> {
        match &mut self.state {
            SessionState::Editing { form, .. } => Some(form),
            _ => None,
        }
    }

    /// Closes the dialog without saving.
    pub fn cancel(&mut self) {
        self.state = SessionState::Idle;
    }

    pub async fn submit<E, N>(&mut self, workflow: &BookWorkflow<E, N>) -> SubmitOutcome
    where
        E: BookEndpoint,
        N: Notifier,
    {
        let (mode, form) = match std::mem::take(&mut self.state) {
            SessionState::Editing { mode, form } => (mode, form),
            other => {
                self.state = other;
                return SubmitOutcome::Rejected(WorkflowError::NotEditing);
            }
        };

        self.state = SessionState::Validating {
            mode: mode.clone(),
            form: form.clone(),
        };
        let book = match workflow.validate(&form) {
            Ok(book) => book,
            Err(e) => {
                self.state = SessionState::Editing { mode, form };
                return SubmitOutcome::Rejected(e);
            }
        };

        self.state = SessionState::Submitting {
            mode: mode.clone(),
            book: book.clone(),
        };
        let result = match &mode {
            EditMode::New => workflow.create_book(book).await,
            EditMode::Existing(target) => workflow.update_book(book, target).await,
        };
        self.state = SessionState::Idle;
        result.into()
    }
}
