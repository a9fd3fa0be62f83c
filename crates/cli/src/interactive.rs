use crate::output::{self, OutputFormat};
use console::style;
use emotion_lens_core::extract::SourceFile;
use emotion_lens_core::service::{
    self, AnalysisMode, AnalysisResult, HttpAnalysisService, ServiceError,
};
use emotion_lens_core::session::{AnalyzeError, Session, Ticket};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

type Completion = (Ticket, Result<AnalysisResult, ServiceError>);

#[derive(Clone, Debug, PartialEq, Eq)]
enum ReplCommand {
    Load {
        path: String,
        media_type: Option<String>,
    },
    Mode(AnalysisMode),
    Analyze,
    Show,
    Text,
    Clear,
    Help,
    Quit,
    Append(String),
    Invalid(String),
}

impl ReplCommand {
    fn parse(line: &str) -> Self {
        let Some(rest) = line.trim_end().strip_prefix(':') else {
            return ReplCommand::Append(line.to_owned());
        };
        let mut parts = rest.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some("load"), Some(path), media_type) => ReplCommand::Load {
                path: path.to_owned(),
                media_type: media_type.map(str::to_owned),
            },
            (Some("mode"), Some(mode), None) => match mode.parse() {
                Ok(mode) => ReplCommand::Mode(mode),
                Err(e) => ReplCommand::Invalid(e),
            },
            (Some("analyze"), None, _) => ReplCommand::Analyze,
            (Some("show"), None, _) => ReplCommand::Show,
            (Some("text"), None, _) => ReplCommand::Text,
            (Some("clear"), None, _) => ReplCommand::Clear,
            (Some("help"), None, _) => ReplCommand::Help,
            (Some("quit") | Some("q"), None, _) => ReplCommand::Quit,
            _ => ReplCommand::Invalid(format!("unknown command: {}", line.trim())),
        }
    }
}

const HELP: &str = "\
Type or paste transcript lines; they are appended to the current text.
  :load <path> [media-type]   replace the text with a .txt or .pdf file
  :mode sentence|character    switch the active view (does not re-run analysis)
  :analyze                    analyze the current text in the active mode
  :show                       show the current result or error
  :text                       print the current text
  :clear                      discard the current text
  :help                       this message
  :quit                       leave";

pub async fn run(
    service: HttpAnalysisService,
    mode: AnalysisMode,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let client = Arc::new(service);
    let mut session = Session::with_mode(mode);
    let (tx, mut rx) = mpsc::channel::<Completion>(4);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{HELP}");
    print_status(&session);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match ReplCommand::parse(&line) {
                    ReplCommand::Quit => break,
                    command => handle(command, &mut session, &client, &tx, format).await?,
                }
            }
            Some((ticket, outcome)) = rx.recv() => {
                match session.finish(&ticket, outcome) {
                    Ok(()) => output::print_session(&session, format)?,
                    Err(AnalyzeError::Superseded) => {}
                    Err(e) => output::print_error(&e.to_string()),
                }
            }
        }
    }

    Ok(())
}

async fn handle(
    command: ReplCommand,
    session: &mut Session,
    client: &Arc<HttpAnalysisService>,
    tx: &mpsc::Sender<Completion>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match command {
        ReplCommand::Append(line) => {
            let mut text = session.document().as_str().to_owned();
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&line);
            session.set_text(text);
        }
        ReplCommand::Load { path, media_type } => {
            let declared = crate::declared_media_type(Path::new(&path), media_type.as_deref());
            let loaded = match SourceFile::from_path(&path, declared).await {
                Ok(file) => session.load_file(&file).await,
                Err(e) => Err(e),
            };
            match loaded {
                Ok(()) => println!(
                    "{} loaded {} characters from {path}",
                    style("✓").green(),
                    session.document().as_str().chars().count()
                ),
                Err(e) => output::print_error(&e.to_string()),
            }
        }
        ReplCommand::Mode(mode) => {
            session.set_mode(mode);
            print_status(session);
            if session.visible_result().is_some() {
                output::print_session(session, format)?;
            }
        }
        ReplCommand::Analyze => {
            if session.state().is_loading() {
                output::print_error("Analysis already in progress.");
                return Ok(());
            }
            match session.begin() {
                Ok(ticket) => {
                    println!("{}", style("Analyzing...").dim());
                    let client = Arc::clone(client);
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let text = ticket.text().to_owned();
                        let outcome = service::dispatch(&*client, ticket.mode(), text).await;
                        if tx.send((ticket, outcome)).await.is_err() {
                            tracing::debug!("session closed before analysis finished");
                        }
                    });
                }
                Err(e) => output::print_error(&e.to_string()),
            }
        }
        ReplCommand::Show => output::print_session(session, format)?,
        ReplCommand::Text => println!("{}", session.document().as_str()),
        ReplCommand::Clear => session.set_text(""),
        ReplCommand::Help => println!("{HELP}"),
        ReplCommand::Invalid(message) => output::print_error(&message),
        ReplCommand::Quit => {}
    }
    Ok(())
}

fn print_status(session: &Session) {
    println!(
        "{} mode: {} ({})",
        style("→").cyan(),
        session.mode(),
        output::mode_title(session.mode())
    );
}
