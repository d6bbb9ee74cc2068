//! Line-oriented terminal front end.

pub mod render;
pub mod studio;

pub use studio::Studio;

/// Steps of the requirement import wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportCommand {
    Start,
    Project(String),
    Pick(Vec<String>),
    Run,
    Overwrite,
    Back,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JiraCommand {
    Status,
    Connect,
    Code(String),
    Disconnect,
}

/// Which test cases an export covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Ids(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    New,
    Sessions,
    Open(String),
    Rename(String),
    Cases,
    Export { project: String, selection: Selection, requirement: Option<String> },
    Exports,
    Projects,
    Jira(JiraCommand),
    Docs,
    Upload(String),
    Toggle(String),
    Reqs,
    Import(ImportCommand),
    DeleteReq(String),
    Analytics { search: String, page: usize },
    Help,
    Quit,
}

pub const HELP: &str = "\
Type a message to talk to the agent. Commands:
  /new                         start a new chat
  /sessions                    list chats
  /open <n|id>                 open a chat from the list
  /rename <title>              rename the open chat
  /cases                       list generated test cases and their export state
  /export <PROJECT> all|<ids..> [--req KEY]
                               export test cases to Jira
  /exports                     load previous exports of the open chat
  /projects                    list Jira projects
  /jira status|connect|code <c>|disconnect
  /docs                        list documents of the open chat
  /upload <path>               upload a document into the open chat
  /toggle <doc-id>             include or exclude a document from search
  /reqs                        list requirements of the open chat
  /import start|project <KEY>|pick <ids..>|run|overwrite|back|cancel
  /delete-req <id>             remove a requirement from the open chat
  /analytics [search] [page]   usage dashboard
  /help  /quit";

fn rest(words: &[&str]) -> String {
    words.join(" ")
}

fn one(words: &[&str], usage: &str) -> Result<String, String> {
    match words {
        [value] => Ok((*value).to_string()),
        _ => Err(format!("usage: {usage}")),
    }
}

/// Parses one input line. Lines not starting with `/` are messages.
pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let Some(stripped) = line.strip_prefix('/') else {
        return Ok(Command::Send(line.to_string()));
    };
    let words: Vec<&str> = stripped.split_whitespace().collect();
    let Some((&name, args)) = words.split_first() else {
        return Err("empty command; try /help".to_string());
    };

    let command = match name {
        "new" => Command::New,
        "sessions" => Command::Sessions,
        "open" => Command::Open(one(args, "/open <n|id>")?),
        "rename" if !args.is_empty() => Command::Rename(rest(args)),
        "rename" => return Err("usage: /rename <title>".to_string()),
        "cases" => Command::Cases,
        "export" => parse_export(args)?,
        "exports" => Command::Exports,
        "projects" => Command::Projects,
        "jira" => Command::Jira(match args {
            [] | ["status"] => JiraCommand::Status,
            ["connect"] => JiraCommand::Connect,
            ["code", code] => JiraCommand::Code((*code).to_string()),
            ["disconnect"] => JiraCommand::Disconnect,
            _ => return Err("usage: /jira status|connect|code <code>|disconnect".to_string()),
        }),
        "docs" => Command::Docs,
        "upload" if !args.is_empty() => Command::Upload(rest(args)),
        "upload" => return Err("usage: /upload <path>".to_string()),
        "toggle" => Command::Toggle(one(args, "/toggle <doc-id>")?),
        "reqs" => Command::Reqs,
        "import" => Command::Import(match args {
            ["start"] => ImportCommand::Start,
            ["project", key] => ImportCommand::Project((*key).to_string()),
            ["pick", ids @ ..] if !ids.is_empty() => {
                ImportCommand::Pick(ids.iter().map(|s| s.to_string()).collect())
            }
            ["run"] => ImportCommand::Run,
            ["overwrite"] => ImportCommand::Overwrite,
            ["back"] => ImportCommand::Back,
            ["cancel"] => ImportCommand::Cancel,
            _ => return Err("usage: /import start|project <KEY>|pick <ids..>|run|overwrite|back|cancel".to_string()),
        }),
        "delete-req" => Command::DeleteReq(one(args, "/delete-req <id>")?),
        "analytics" => parse_analytics(args),
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command /{other}; try /help")),
    };
    Ok(command)
}

fn parse_export(args: &[&str]) -> Result<Command, String> {
    const USAGE: &str = "usage: /export <PROJECT> all|<ids..> [--req KEY]";
    let mut requirement = None;
    let mut positional = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if *arg == "--req" {
            let key = iter.next().ok_or_else(|| USAGE.to_string())?;
            requirement = Some((*key).to_string());
        } else {
            positional.push(*arg);
        }
    }
    let Some((project, ids)) = positional.split_first() else {
        return Err(USAGE.to_string());
    };
    let selection = match ids {
        [] => return Err(USAGE.to_string()),
        ["all"] => Selection::All,
        ids => Selection::Ids(ids.iter().map(|s| s.to_string()).collect()),
    };
    Ok(Command::Export { project: (*project).to_string(), selection, requirement })
}

fn parse_analytics(args: &[&str]) -> Command {
    match args.split_last() {
        Some((last, head)) if last.parse::<usize>().is_ok() => Command::Analytics {
            search: rest(head),
            page: last.parse().unwrap_or(1),
        },
        _ => Command::Analytics { search: rest(args), page: 1 },
    }
}
