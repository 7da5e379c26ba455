#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use pretty_assertions::assert_eq;

    use booklist::{
        error::{RemoteError, WorkflowError},
        query::{DateFilterSkipped, Filter, Query, SearchCriteria, SortKey},
        traits::{BookEndpoint, Notifier},
        types::book::{Book, BookForm, IdentityPath},
        validation::validate,
        workflow::{
            BookWorkflow, EditMode, EditSession, Level, Notification, SessionState, SubmitOutcome,
        },
    };

    const ENTITY_SET: &str = "Z801_book_entity_daruSet";

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Query(Query),
        Create(String),
        Update(String, Book),
        Delete(String),
    }

    /// Entity collection kept in memory. Flip `fail` to make every call error.
    #[derive(Default)]
    struct MemoryEndpoint {
        books: RefCell<Vec<Book>>,
        calls: RefCell<Vec<Call>>,
        fail:  Cell<bool>,
    }

    impl MemoryEndpoint {
        fn with_books(books: Vec<Book>) -> Self {
            Self {
                books: RefCell::new(books),
                ..Self::default()
            }
        }

        fn check(&self) -> Result<(), RemoteError> {
            if self.fail.get() {
                return Err(RemoteError::Status {
                    status:  reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                    message: "backend unavailable".into(),
                });
            }
            Ok(())
        }
    }

    impl BookEndpoint for MemoryEndpoint {
        fn entity_set(&self) -> &str {
            ENTITY_SET
        }

        async fn query(&self, query: &Query) -> Result<Vec<Book>, RemoteError> {
            self.calls.borrow_mut().push(Call::Query(query.clone()));
            self.check()?;
            Ok(self
                .books
                .borrow()
                .iter()
                .filter(|book| query.matches(book))
                .cloned()
                .collect())
        }

        async fn create(&self, book: &Book) -> Result<(), RemoteError> {
            self.calls.borrow_mut().push(Call::Create(book.isbn.clone()));
            self.check()?;
            self.books.borrow_mut().push(book.clone());
            Ok(())
        }

        async fn update(&self, path: &IdentityPath, book: &Book) -> Result<(), RemoteError> {
            self.calls
                .borrow_mut()
                .push(Call::Update(path.to_string(), book.clone()));
            self.check()?;
            let mut books = self.books.borrow_mut();
            if let Some(existing) = books.iter_mut().find(|b| b.isbn == path.isbn()) {
                *existing = book.clone();
            }
            Ok(())
        }

        async fn delete(&self, path: &IdentityPath) -> Result<(), RemoteError> {
            self.calls.borrow_mut().push(Call::Delete(path.to_string()));
            self.check()?;
            self.books.borrow_mut().retain(|b| b.isbn != path.isbn());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        seen: RefCell<Vec<Notification>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notification: Notification) {
            self.seen.borrow_mut().push(notification);
        }
    }

    type Workflow = BookWorkflow<MemoryEndpoint, RecordingNotifier>;

    fn form(isbn: &str, title: &str, date: &str) -> BookForm {
        BookForm {
            isbn:            isbn.into(),
            title:           title.into(),
            author:          "Somebody".into(),
            language:        "English".into(),
            date_published:  date.into(),
            total_books:     "4".into(),
            available_books: "2".into(),
        }
    }

    fn book(isbn: &str, title: &str, date: &str) -> Book {
        validate(&form(isbn, title, date)).unwrap()
    }

    fn library() -> Vec<Book> {
        vec![
            book("9780140447934", "War and Peace", "01/01/1869"),
            book("9780140449136", "Meditations", "01/01/2000"),
            book("9781590302255", "The Art of War", "15/06/2005"),
        ]
    }

    fn workflow() -> Workflow {
        BookWorkflow::new(
            MemoryEndpoint::with_books(library()),
            RecordingNotifier::default(),
        )
    }

    fn calls(workflow: &Workflow) -> Vec<Call> {
        workflow.endpoint().calls.borrow().clone()
    }

    fn notifications(workflow: &Workflow) -> Vec<Notification> {
        workflow.notifier().seen.borrow().clone()
    }

    #[tokio::test]
    async fn create_valid_book() {
        let workflow = workflow();
        let meditations = BookForm {
            isbn:            "9780140449137".into(),
            title:           "Meditations".into(),
            author:          "Marcus Aurelius".into(),
            language:        "English".into(),
            date_published:  "01/01/2000".into(),
            total_books:     "5".into(),
            available_books: "3".into(),
        };
        let created = workflow.create(&meditations).await.unwrap();
        assert_eq!(created.total_books, 5);
        assert_eq!(calls(&workflow), vec![Call::Create("9780140449137".into())]);
        assert_eq!(
            notifications(&workflow),
            vec![Notification::success("Book created")]
        );
        assert_eq!(workflow.endpoint().books.borrow().len(), 4);
    }

    #[tokio::test]
    async fn invalid_book_never_reaches_the_service() {
        let workflow = workflow();
        let result = workflow.create(&form("", "Nameless", "01/01/2000")).await;
        assert!(matches!(result, Err(WorkflowError::Validation(_))));
        assert!(calls(&workflow).is_empty());
        assert_eq!(
            notifications(&workflow),
            vec![Notification::error("Empty Isbn")]
        );
    }

    #[tokio::test]
    async fn failed_create_reports_one_error() {
        let workflow = workflow();
        workflow.endpoint().fail.set(true);
        let result = workflow.create(&form("1", "One", "01/01/2000")).await;
        assert!(matches!(result, Err(WorkflowError::Remote(_))));
        assert_eq!(notifications(&workflow), vec![Notification::error("Error!")]);
    }

    #[tokio::test]
    async fn search_by_title_without_dates_warns() {
        let workflow = workflow();
        let criteria = SearchCriteria {
            title: Some("War".into()),
            ..SearchCriteria::default()
        };
        let view = workflow.search(&criteria).await.unwrap();
        assert_eq!(
            view.iter().map(|b| b.title.as_str()).collect::<Vec<_>>(),
            vec!["War and Peace", "The Art of War"]
        );
        assert_eq!(
            calls(&workflow),
            vec![Call::Query(Query {
                filters:  vec![Filter::TitleContains("War".into())],
                order_by: None,
            })]
        );
        let seen = notifications(&workflow);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].level, Level::Warning);
        assert_eq!(seen[0].message, DateFilterSkipped::MissingBound.to_string());
    }

    #[tokio::test]
    async fn search_with_one_bound_skips_date_filter() {
        let workflow = workflow();
        let criteria = SearchCriteria {
            published_from: Some("01/01/1900".into()),
            ..SearchCriteria::default()
        };
        let view = workflow.search(&criteria).await.unwrap();
        assert_eq!(view.len(), 3);
        assert_eq!(notifications(&workflow)[0].level, Level::Warning);
    }

    #[tokio::test]
    async fn search_with_date_range() {
        let workflow = workflow();
        let criteria = SearchCriteria {
            title:          Some("war".into()),
            published_from: Some("01/01/1900".into()),
            published_to:   Some("31/12/2010".into()),
            ..SearchCriteria::default()
        };
        let view = workflow.search(&criteria).await.unwrap();
        assert_eq!(
            view.iter().map(|b| b.isbn.as_str()).collect::<Vec<_>>(),
            vec!["9781590302255"]
        );
        assert!(notifications(&workflow).is_empty());
        let plan = criteria.plan();
        assert_eq!(
            plan.query.filter_expression().unwrap(),
            "substringof('war',Title) and (DatePublished ge datetime'1900-01-01T00:00:00' \
             and DatePublished le datetime'2010-12-31T00:00:00')"
        );
    }

    #[test]
    fn invalid_bound_degrades_to_warning() {
        let criteria = SearchCriteria {
            published_from: Some("yesterday-ish".into()),
            published_to:   Some("31/12/2010".into()),
            ..SearchCriteria::default()
        };
        let plan = criteria.plan();
        assert!(plan.query.filters.is_empty());
        assert_eq!(
            plan.warning,
            Some(DateFilterSkipped::InvalidBound("yesterday-ish".into()))
        );
    }

    #[tokio::test]
    async fn failed_search_notifies() {
        let workflow = workflow();
        workflow.endpoint().fail.set(true);
        let criteria = SearchCriteria {
            published_from: Some("01/01/1900".into()),
            published_to:   Some("31/12/2010".into()),
            ..SearchCriteria::default()
        };
        assert!(workflow.search(&criteria).await.is_err());
        assert_eq!(
            notifications(&workflow),
            vec![Notification::error("Could not load books")]
        );
    }

    #[test]
    fn sort_single_key() {
        let workflow = workflow();
        let by_date = workflow.sort(library(), SortKey::DatePublished, true);
        assert_eq!(
            by_date.iter().map(|b| b.isbn.as_str()).collect::<Vec<_>>(),
            vec!["9781590302255", "9780140449136", "9780140447934"]
        );
        let by_title = workflow.sort(library(), SortKey::Title, false);
        assert_eq!(
            by_title.iter().map(|b| b.title.as_str()).collect::<Vec<_>>(),
            vec!["Meditations", "The Art of War", "War and Peace"]
        );
    }

    #[test]
    fn sort_is_stable_on_ties() {
        let workflow = workflow();
        // All three share the same counts.
        let sorted = workflow.sort(library(), SortKey::TotalBooks, true);
        assert_eq!(sorted, library());
    }

    #[tokio::test]
    async fn delete_without_selection() {
        let workflow = workflow();
        let result = workflow.delete(None).await;
        assert!(matches!(result, Err(WorkflowError::NoSelection)));
        assert!(calls(&workflow).is_empty());
        assert_eq!(
            notifications(&workflow),
            vec![Notification::warning("No book selected")]
        );
    }

    #[tokio::test]
    async fn delete_selected_row() {
        let workflow = workflow();
        let selected = library()[1].clone();
        workflow.delete(Some(&selected)).await.unwrap();
        assert_eq!(
            calls(&workflow),
            vec![Call::Delete(
                "Z801_book_entity_daruSet('9780140449136')".into()
            )]
        );
        assert_eq!(notifications(&workflow), vec![Notification::success("Book deleted")]);
        assert_eq!(workflow.endpoint().books.borrow().len(), 2);
    }

    #[tokio::test]
    async fn failed_delete_reports_one_error() {
        let workflow = workflow();
        workflow.endpoint().fail.set(true);
        let selected = library()[0].clone();
        let result = workflow.delete(Some(&selected)).await;
        assert!(matches!(result, Err(WorkflowError::Remote(_))));
        assert_eq!(
            calls(&workflow),
            vec![Call::Delete(
                "Z801_book_entity_daruSet('9780140447934')".into()
            )]
        );
        assert_eq!(notifications(&workflow), vec![Notification::error("Error!")]);
        assert_eq!(workflow.endpoint().books.borrow().len(), 3);
    }

    #[tokio::test]
    async fn update_addresses_original_isbn() {
        let workflow = workflow();
        let target = workflow.identity_path("9780140449136");
        let changed = form("9780140449999", "Meditations", "01/01/2000");
        let saved = workflow.update(&changed, &target).await.unwrap();
        assert_eq!(saved.isbn, "9780140449999");
        assert_eq!(
            calls(&workflow),
            vec![Call::Update(
                "Z801_book_entity_daruSet('9780140449136')".into(),
                saved
            )]
        );
        assert_eq!(
            notifications(&workflow),
            vec![Notification::success("Update successful")]
        );
    }

    #[tokio::test]
    async fn invalid_update_never_reaches_the_service() {
        let workflow = workflow();
        let target = workflow.identity_path("9780140449136");
        let broken = BookForm {
            author: "".into(),
            ..form("9780140449136", "Meditations", "01/01/2000")
        };
        let result = workflow.update(&broken, &target).await;
        assert!(matches!(result, Err(WorkflowError::Validation(_))));
        assert!(calls(&workflow).is_empty());
        assert_eq!(
            notifications(&workflow),
            vec![Notification::error("Empty Author")]
        );
    }

    #[tokio::test]
    async fn reload_after_write_is_silent() {
        let workflow = workflow();
        workflow
            .create(&form("9780000000001", "New", "05/05/2005"))
            .await
            .unwrap();
        // No date range, which a normal search would warn about.
        let view = workflow.reload(&SearchCriteria::default()).await.unwrap();
        assert_eq!(view.len(), 4);
        assert_eq!(
            notifications(&workflow),
            vec![Notification::success("Book created")]
        );

        workflow.endpoint().fail.set(true);
        assert!(workflow.reload(&SearchCriteria::default()).await.is_err());
        assert_eq!(notifications(&workflow).len(), 1);
    }

    #[tokio::test]
    async fn find_looks_up_by_isbn() {
        let workflow = workflow();
        let found = workflow.find(" 9781590302255 ").await.unwrap();
        assert_eq!(found.map(|b| b.title), Some("The Art of War".to_string()));
        assert_eq!(
            calls(&workflow),
            vec![Call::Query(Query {
                filters:  vec![Filter::IsbnEquals("9781590302255".into())],
                order_by: None,
            })]
        );
        assert_eq!(workflow.find("0000000000000").await.unwrap(), None);
        assert!(notifications(&workflow).is_empty());
    }

    #[tokio::test]
    async fn search_passes_order_to_service() {
        let workflow = workflow();
        let criteria = SearchCriteria {
            published_from: Some("01/01/1900".into()),
            published_to:   Some("31/12/2010".into()),
            order_by:       Some((SortKey::Title, false)),
            ..SearchCriteria::default()
        };
        workflow.search(&criteria).await.unwrap();
        match &calls(&workflow)[0] {
            Call::Query(query) => {
                assert_eq!(query.order_expression().as_deref(), Some("Title asc"))
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[tokio::test]
    async fn session_creates_new_book() {
        let workflow = workflow();
        let mut session = EditSession::new();
        assert!(session.is_idle());

        let form = session.begin_new();
        assert_eq!(*form, BookForm::default());
        *form = self::form("9780000000001", "New", "05/05/2005");

        let outcome = session.submit(&workflow).await;
        assert!(matches!(outcome, SubmitOutcome::Saved(_)));
        assert!(outcome.closes_dialog());
        assert!(session.is_idle());
        assert_eq!(calls(&workflow), vec![Call::Create("9780000000001".into())]);
    }

    #[tokio::test]
    async fn session_stays_open_on_validation_failure() {
        let workflow = workflow();
        let mut session = EditSession::new();
        let form = session.begin_new();
        *form = BookForm {
            total_books: "1".into(),
            available_books: "3".into(),
            ..self::form("9780000000001", "New", "05/05/2005")
        };
        let typed = form.clone();

        let outcome = session.submit(&workflow).await;
        assert!(matches!(outcome, SubmitOutcome::Rejected(WorkflowError::Validation(_))));
        assert!(!outcome.closes_dialog());
        assert_eq!(
            session.state(),
            &SessionState::Editing {
                mode: EditMode::New,
                form: typed,
            }
        );
        assert!(calls(&workflow).is_empty());

        // Correct the input and submit again.
        if let Some(form) = session.form_mut() {
            form.available_books = "1".into();
        }
        let outcome = session.submit(&workflow).await;
        assert!(matches!(outcome, SubmitOutcome::Saved(_)));
    }

    #[tokio::test]
    async fn session_updates_original_record() {
        let workflow = workflow();
        let original = library()[1].clone();
        let mut session = EditSession::new();
        let form = session.begin_edit(workflow.identity_path(&original.isbn), &original);
        assert_eq!(form.date_published, "01/01/2000");
        form.title = "Meditations (revised)".into();

        let outcome = session.submit(&workflow).await;
        let saved = outcome.book().cloned().unwrap();
        assert_eq!(saved.title, "Meditations (revised)");
        assert_eq!(
            calls(&workflow),
            vec![Call::Update(
                "Z801_book_entity_daruSet('9780140449136')".into(),
                saved
            )]
        );
        assert_eq!(
            notifications(&workflow),
            vec![Notification::success("Update successful")]
        );
    }

    #[tokio::test]
    async fn session_closes_after_remote_error() {
        let workflow = workflow();
        workflow.endpoint().fail.set(true);
        let original = library()[0].clone();
        let mut session = EditSession::new();
        session.begin_edit(workflow.identity_path(&original.isbn), &original);

        let outcome = session.submit(&workflow).await;
        assert!(matches!(outcome, SubmitOutcome::Failed(WorkflowError::Remote(_))));
        assert!(outcome.closes_dialog());
        assert!(session.is_idle());
        assert_eq!(notifications(&workflow), vec![Notification::error("Error!")]);
    }

    #[tokio::test]
    async fn submit_without_dialog_is_rejected() {
        let workflow = workflow();
        let mut session = EditSession::new();
        let outcome = session.submit(&workflow).await;
        assert!(matches!(outcome, SubmitOutcome::Rejected(WorkflowError::NotEditing)));
        assert!(calls(&workflow).is_empty());
    }

    #[test]
    fn cancel_closes_dialog() {
        let mut session = EditSession::new();
        session.begin_new().isbn = "123".into();
        session.cancel();
        assert!(session.is_idle());
        assert_eq!(session.form(), None);
    }
}
