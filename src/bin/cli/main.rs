use std::env;

use anyhow::Result;
use clap::ArgMatches;
use reedline::Signal;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod command_parser;
mod form;
mod prompt;
mod repl;
mod table;

use booklist::{
    config::Config,
    odata::ODataClient,
    query::{SearchCriteria, SortKey},
    traits::Notifier,
    types::book::Book,
    workflow::{BookWorkflow, EditSession, Notification},
};

/// Prints notifications to the terminal, styled per level.
struct TerminalNotifier {
    config: Config,
}

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: Notification) {
        println!("{}", self.config.format_notification(&notification));
    }
}

struct App {
    config:      Config,
    workflow:    BookWorkflow<ODataClient, TerminalNotifier>,
    /// The current list, as last searched and sorted.
    view:        Vec<Book>,
    last_search: Option<SearchCriteria>,
    last_sort:   Option<(SortKey, bool)>,
}

enum Flow {
    Continue,
    Exit,
}

impl App {
    fn new(config: Config) -> Result<Self> {
        let endpoint = ODataClient::new(&config)?;
        let notifier = TerminalNotifier {
            config: config.clone(),
        };
        Ok(Self {
            config,
            workflow: BookWorkflow::new(endpoint, notifier),
            view: vec![],
            last_search: None,
            last_sort: None,
        })
    }

    fn print_view(&self) {
        println!("{}", table::render(&self.view, &self.config));
    }

    fn apply_sort(&mut self) {
        if let Some((key, descending)) = self.last_sort {
            let view = std::mem::take(&mut self.view);
            self.view = self.workflow.sort(view, key, descending);
        }
    }

    async fn search(&mut self, criteria: SearchCriteria) -> Result<()> {
        self.view = self.workflow.search(&criteria).await?;
        self.last_search = Some(criteria);
        self.apply_sort();
        self.print_view();
        Ok(())
    }

    /// Reloads the list after a write so it reflects the service. Only a list
    /// that was searched before is reloaded; a failure keeps the old rows.
    async fn refresh(&mut self) {
        let Some(criteria) = self.last_search.clone() else {
            return;
        };
        if let Ok(view) = self.workflow.reload(&criteria).await {
            self.view = view;
            self.apply_sort();
            self.print_view();
        }
    }

    /// Runs the input dialog until it is submitted or closed.
    async fn run_dialog(&mut self, mut session: EditSession) -> Result<()> {
        loop {
            let Some(form) = session.form_mut() else {
                break;
            };
            if !form::fill(form)? {
                session.cancel();
                self.workflow
                    .notifier()
                    .notify(Notification::info("Closed without saving"));
                break;
            }
            let outcome = session.submit(&self.workflow).await;
            if outcome.closes_dialog() {
                if outcome.book().is_some() {
                    self.refresh().await;
                }
                break;
            }
            if !inquire::Confirm::new("Correct the input?")
                .with_default(true)
                .prompt()?
            {
                session.cancel();
                break;
            }
        }
        Ok(())
    }

    /// The row named by Isbn, looked up on the service when it is not in the
    /// current list, or a row picked from the list.
    async fn selection(&self, matches: &ArgMatches) -> Result<Option<Book>> {
        let isbn = matches.get_one::<String>("isbn").map(String::as_str);
        let selected = form::select(&self.view, isbn)?;
        match (selected, isbn) {
            (None, Some(isbn)) => Ok(self.workflow.find(isbn).await?),
            (selected, _) => Ok(selected),
        }
    }
}

fn search_criteria(matches: &ArgMatches) -> SearchCriteria {
    SearchCriteria {
        title:          matches.get_one::<String>("title").cloned(),
        published_from: matches.get_one::<String>("from").cloned(),
        published_to:   matches.get_one::<String>("to").cloned(),
        order_by:       matches
            .get_one::<SortKey>("sort")
            .map(|key| (*key, matches.get_flag("desc"))),
    }
}

async fn handle_command(args: Vec<String>, app: &mut App) -> Result<Flow> {
    let matches = command_parser::arg_parser_repl().try_get_matches_from(args)?;
    match matches.subcommand() {
        Some(("search", matches)) => {
            if let Some(key) = matches.get_one::<SortKey>("sort") {
                app.last_sort = Some((*key, matches.get_flag("desc")));
            }
            let criteria = search_criteria(matches);
            app.search(criteria).await?;
        }
        Some(("sort", matches)) => {
            let key = matches
                .get_one::<SortKey>("key")
                .copied()
                .unwrap_or(SortKey::Title);
            app.last_sort = Some((key, matches.get_flag("desc")));
            app.apply_sort();
            app.print_view();
        }
        Some(("list", _)) => app.print_view(),
        Some(("add", _)) => {
            let mut session = EditSession::new();
            session.begin_new();
            app.run_dialog(session).await?;
        }
        Some(("edit", matches)) => {
            let selection = app.selection(matches).await?;
            let book = app.workflow.selected(selection.as_ref())?.clone();
            let mut session = EditSession::new();
            session.begin_edit(app.workflow.identity_path(&book.isbn), &book);
            app.run_dialog(session).await?;
        }
        Some(("delete", matches)) => {
            let selection = app.selection(matches).await?;
            if let Some(book) = &selection {
                if !matches.get_flag("yes") && !form::confirm_delete(book)? {
                    return Ok(Flow::Continue);
                }
            }
            app.workflow.delete(selection.as_ref()).await?;
            app.refresh().await;
        }
        Some(("config", _)) => {
            print!("{}", Config::default_as_string()?);
        }
        Some(("exit", _)) => return Ok(Flow::Exit),
        Some((name, _)) => unimplemented!("{}", name),
        None => unreachable!("subcommand required"),
    }
    Ok(Flow::Continue)
}

async fn run_repl(app: &mut App) -> Result<()> {
    let mut repl = repl::Repl::new(
        command_parser::generate_completions(),
        app.config.history_path()?,
    )?;
    loop {
        repl.set_row_count(app.last_search.as_ref().map(|_| app.view.len()));
        match repl.read_line() {
            Ok(Signal::Success(buffer)) => {
                let Some(args) = shlex::split(&buffer) else {
                    println!("Error: Invalid command");
                    continue;
                };
                if args.is_empty() {
                    continue;
                }
                match handle_command(args, app).await {
                    Ok(Flow::Continue) => (),
                    Ok(Flow::Exit) => break,
                    // Already reported through a notification.
                    Err(e) if e.downcast_ref::<booklist::error::WorkflowError>().is_some() => {
                        debug!("{}", e)
                    }
                    Err(e) => println!("Error: {}", e),
                };
            }
            Ok(Signal::CtrlD) | Ok(Signal::CtrlC) => {
                println!("\nAborted!");
                break;
            }
            Err(e) => {
                println!("Error: {}", e);
                break;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args_parsed = command_parser::arg_parser_cli().get_matches_from(env::args_os().skip(1));
    let config = Config::read_config()?;
    let mut app = App::new(config)?;

    if let Some(("repl", _)) = args_parsed.subcommand() {
        run_repl(&mut app).await?;
    } else {
        let args = env::args().skip(1).collect::<Vec<String>>();
        if let Err(e) = handle_command(args, &mut app).await {
            if e.downcast_ref::<booklist::error::WorkflowError>().is_none() {
                return Err(e);
            }
            std::process::exit(1);
        }
    }

    Ok(())
}
