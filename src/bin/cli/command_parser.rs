use booklist::query::SortKey;
use clap::{Arg, ArgAction, Command};

fn arg_sort_key(name: &'static str) -> Arg {
    Arg::new(name)
        .value_parser(|s: &str| s.parse::<SortKey>())
        .help("Isbn, Title, Author, Language, DatePublished, Totalbooks or Availbooks")
}

fn arg_descending() -> Arg {
    Arg::new("desc")
        .long("desc")
        .short('d')
        .action(ArgAction::SetTrue)
        .help("Sort descending")
}

fn arg_isbn() -> Arg {
    Arg::new("isbn")
        .help("Isbn of the book, looked up on the service if not listed; asks when omitted")
}

pub fn arg_parser() -> Command {
    Command::new("booklist")
        .about("Maintain the books of a remote OData book list")
        .multicall(true)
        .subcommand_required(true)
        .subcommand(
            Command::new("search")
                .about("Load books, optionally filtered by title and publication date")
                .arg(
                    Arg::new("title")
                        .long("title")
                        .short('t')
                        .help("Part of the title"),
                )
                .arg(
                    Arg::new("from")
                        .long("from")
                        .help("Published on or after (dd/MM/yyyy)"),
                )
                .arg(
                    Arg::new("to")
                        .long("to")
                        .help("Published on or before (dd/MM/yyyy)"),
                )
                .arg(arg_sort_key("sort").long("sort").short('s'))
                .arg(arg_descending()),
        )
        .subcommand(
            Command::new("sort")
                .about("Sort the current list")
                .arg(arg_sort_key("key").required(true))
                .arg(arg_descending()),
        )
        .subcommand(Command::new("list").about("Show the current list again"))
        .subcommand(Command::new("add").about("Add a book"))
        .subcommand(Command::new("edit").about("Edit a book").arg(arg_isbn()))
        .subcommand(
            Command::new("delete")
                .about("Delete a book")
                .arg(arg_isbn())
                .arg(
                    Arg::new("yes")
                        .long("yes")
                        .short('y')
                        .action(ArgAction::SetTrue)
                        .help("Don't ask for confirmation"),
                ),
        )
        .subcommand(Command::new("config").about("Print the default configuration"))
}

pub fn arg_parser_cli() -> Command {
    arg_parser().subcommand(Command::new("repl").about("Launch a read eval print loop"))
}

pub fn arg_parser_repl() -> Command {
    arg_parser().subcommand(Command::new("exit").about("Leave the read eval print loop"))
}

pub fn generate_completions() -> Vec<String> {
    let cmd = arg_parser_repl();
    fn add_command(parent_fn_name: &str, cmd: &Command, subcmds: &mut Vec<String>) {
        let fn_name = format!(
            "{parent_fn_name} {cmd_name}",
            parent_fn_name = parent_fn_name,
            cmd_name = cmd.get_name()
        )
        .trim()
        .to_string();
        subcmds.push(fn_name.clone());
        for subcmd in cmd.get_subcommands() {
            add_command(&fn_name, subcmd, subcmds);
        }
    }
    let mut subcmds = vec![];
    for subcmd in cmd.get_subcommands() {
        add_command("", subcmd, &mut subcmds);
    }
    subcmds.sort();
    subcmds
}
