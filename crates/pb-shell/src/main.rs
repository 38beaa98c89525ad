//! `pb-shell`: line-oriented driver for the page builder editor.
//!
//! Reads commands from stdin, applies them through the editor and prints
//! results as JSON. Prompts run in the background; their results are applied
//! by the main loop as they arrive.
//!
//! ```text
//! pb-shell --page landing.json
//! > select header-1
//! > set title Welcome aboard
//! > prompt add hero title="Launch" into page at 0
//! > show
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use pb_core::{
    Catalog, DocumentError, EditError, EditIntent, NodeId, PageDocument, PageSchema, ViewportClass,
    Zoom,
};
use pb_editor::{
    ChangeEvent, ChatSession, Editor, EditorConfig, JsonResolver, PromptContext, PromptIntake,
    PromptResolver, SUGGESTIONS, ScriptResolver, Side, SpacingGroup,
};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

#[derive(Debug, thiserror::Error)]
enum ShellError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
    #[error("invalid page: {0}")]
    Page(#[from] DocumentError),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error("stdin: {0}")]
    Stdin(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "pb-shell", about = "Line-oriented driver for the page builder editor")]
struct Cli {
    /// Page document (JSON) to open. Starts from the starter page when absent.
    #[arg(long, env = "PB_PAGE")]
    page: Option<PathBuf>,

    /// Editor config (JSON).
    #[arg(long, env = "PB_CONFIG")]
    config: Option<PathBuf>,

    /// Initial prompt context: `page` or `component`.
    #[arg(long, default_value = "page", value_parser = parse_context)]
    context: PromptContext,

    /// Read prompts as JSON intent arrays instead of intent scripts.
    #[arg(long, default_value_t = false)]
    json_prompts: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive session on stdin (default).
    Repl,
    /// Print the render tree and exit.
    Render {
        #[arg(long, value_parser = parse_viewport)]
        viewport: Option<ViewportClass>,
        #[arg(long)]
        zoom: Option<u16>,
    },
    /// Search the component library and exit.
    Catalog {
        #[arg(default_value = "")]
        query: String,
    },
    /// Write the page as MessagePack (or JSON with `--json`) and exit.
    Export {
        out: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn parse_context(s: &str) -> Result<PromptContext, String> {
    match s {
        "page" => Ok(PromptContext::Page),
        "component" => Ok(PromptContext::Component),
        other => Err(format!("unknown context `{other}` (expected page or component)")),
    }
}

fn parse_viewport(s: &str) -> Result<ViewportClass, String> {
    ViewportClass::parse(s).ok_or_else(|| format!("unknown viewport `{s}`"))
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("pb-shell: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), ShellError> {
    let config = match &cli.config {
        Some(path) => EditorConfig::from_json(&read_file(path)?)?,
        None => EditorConfig::default(),
    };
    let doc = match &cli.page {
        Some(path) => PageDocument::from_json(&read_file(path)?)?,
        None => PageDocument::starter(),
    };
    let mut editor = Editor::new(PageSchema::from_document(doc)?, &config);

    match cli.command.unwrap_or(Command::Repl) {
        Command::Repl => {
            let resolver: Arc<dyn PromptResolver> = if cli.json_prompts {
                Arc::new(JsonResolver)
            } else {
                Arc::new(ScriptResolver)
            };
            let intake = PromptIntake::new(resolver, config.resolver_timeout());
            let chat = ChatSession::new(cli.context);
            repl(editor, intake, chat).await
        }
        Command::Render { viewport, zoom } => {
            if let Some(viewport) = viewport {
                editor.set_viewport(viewport);
            }
            if let Some(zoom) = zoom {
                editor.set_zoom(Zoom::new(zoom));
            }
            print_json(&editor.project());
            Ok(())
        }
        Command::Catalog { query } => {
            print_catalog(&query);
            Ok(())
        }
        Command::Export { out, json } => {
            let doc = editor.to_document();
            let bytes = if json {
                doc.to_json_pretty()?.into_bytes()
            } else {
                doc.to_msgpack()?
            };
            std::fs::write(&out, bytes).map_err(|source| ShellError::Write { path: out, source })
        }
    }
}

fn read_file(path: &Path) -> Result<String, ShellError> {
    std::fs::read_to_string(path).map_err(|source| ShellError::Read {
        path: path.to_path_buf(),
        source,
    })
}

// ─── REPL ───────────────────────────────────────────────────────────────

enum Flow {
    Continue,
    Quit,
}

struct Session {
    editor: Editor,
    intake: PromptIntake,
    chat: ChatSession,
    catalog: Catalog,
}

async fn repl(editor: Editor, intake: PromptIntake, chat: ChatSession) -> Result<(), ShellError> {
    let mut events = editor.subscribe();
    let mut session = Session {
        editor,
        intake,
        chat,
        catalog: Catalog::builtin(),
    };
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match session.handle(&line) {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Quit) => break,
                    Err(e) => print_error(&e),
                }
            }
            Some(outcome) = session.intake.next_outcome(), if session.intake.pending_count() > 0 => {
                let seq = outcome.ticket.seq;
                let result = session.editor.complete(outcome);
                session.chat.finish(seq, &result);
                match result {
                    Ok(change) => print_json(&json!({
                        "generation": seq,
                        "affected": change.affected_node_ids.to_vec(),
                    })),
                    Err(e) => print_error(&e),
                }
            }
        }
        drain_events(&mut events);
    }

    session.intake.cancel_all();
    Ok(())
}

fn drain_events(events: &mut broadcast::Receiver<ChangeEvent>) {
    loop {
        match events.try_recv() {
            Ok(event) => log::debug!("EVENT {event:?}"),
            Err(broadcast::error::TryRecvError::Lagged(n)) => log::warn!("EVENT lagged by {n}"),
            Err(_) => break,
        }
    }
}

impl Session {
    fn handle(&mut self, line: &str) -> Result<Flow, EditError> {
        let line = line.trim();
        if line.starts_with('#') {
            return Ok(Flow::Continue);
        }
        let (cmd, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        match cmd {
            "" => {}
            "quit" | "exit" => return Ok(Flow::Quit),
            "help" => print_help(),
            "show" => print_json(&self.editor.project()),
            "dump" => print_json(&self.editor.to_document()),
            "history" => {
                let entries: Vec<_> = self
                    .editor
                    .history()
                    .iter()
                    .map(|c| {
                        json!({
                            "kind": c.intent_kind,
                            "affected": c.affected_node_ids.to_vec(),
                            "at": c.timestamp.unix_timestamp(),
                        })
                    })
                    .collect();
                print_json(&entries);
            }
            "select" => {
                let target = match rest {
                    "" | "none" => None,
                    id => Some(known_id(id)?),
                };
                self.editor.select(target)?;
                println!("selected: {}", display_target(self.editor.selection()));
            }
            "inspect" => match self.editor.inspect() {
                Some(view) => print_json(&json!({
                    "id": view.node_id,
                    "kind": view.kind,
                    "properties": view.properties,
                })),
                None => println!("nothing selected"),
            },
            "set" => {
                let (key, value) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| invalid("usage: set <key> <value>"))?;
                self.editor.set_selected_input(key, value.trim())?;
            }
            "padding" | "margin" => {
                let group = if cmd == "padding" {
                    SpacingGroup::Padding
                } else {
                    SpacingGroup::Margin
                };
                let (side, value) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| invalid("usage: padding|margin <side> <px>"))?;
                let side = parse_side(side)?;
                let value: f64 = value
                    .trim()
                    .parse()
                    .map_err(|_| invalid("spacing must be a number"))?;
                self.editor.set_selected_side(group, side, value)?;
            }
            "add" => {
                let mut words = rest.split_whitespace();
                let entry_id = words.next().ok_or_else(|| invalid("usage: add <library-id> [parent] [index]"))?;
                let entry = self
                    .catalog
                    .find(entry_id)
                    .ok_or_else(|| invalid(&format!("no library entry `{entry_id}`")))?;
                let parent = match words.next() {
                    None | Some("page") => None,
                    Some(id) => Some(known_id(id)?),
                };
                let index = words
                    .next()
                    .map(|i| i.parse::<usize>().map_err(|_| invalid("index must be a number")))
                    .transpose()?;
                let change = self.editor.apply(entry.intent(parent, index))?;
                println!("added: {}", display_target(change.primary_node()));
            }
            "remove" => {
                self.editor.apply(EditIntent::remove(known_id(rest)?))?;
            }
            "apply" => {
                let intent: EditIntent = serde_json::from_str(rest)
                    .map_err(|e| invalid(&format!("bad intent: {e}")))?;
                self.editor.apply(intent)?;
            }
            "prompt" => {
                let ticket = self
                    .chat
                    .submit(rest, self.editor.selection(), &mut self.intake)?;
                println!(
                    "generation #{} pending for {}",
                    ticket.seq,
                    display_target(ticket.target)
                );
            }
            "cancel" => {
                let target = self.chat.context.target(self.editor.selection());
                if !self.intake.cancel(target) {
                    println!("nothing pending for {}", display_target(target));
                }
            }
            "context" => {
                self.chat.context = parse_context(rest).map_err(|e| invalid(&e))?;
            }
            "chat" => {
                if rest == "clear" {
                    self.chat.clear();
                } else {
                    for msg in self.chat.transcript().messages() {
                        let status = msg
                            .status
                            .map(|s| format!(" [{s:?}]"))
                            .unwrap_or_default();
                        println!("{:?}{status}: {}", msg.role, msg.content);
                    }
                }
            }
            "suggest" => {
                for (n, s) in SUGGESTIONS.iter().enumerate() {
                    println!("{}. {}: {}", n + 1, s.label, s.prompt);
                }
            }
            "search" => print_catalog(rest),
            "zoom" => {
                let zoom = match rest {
                    "in" => self.editor.zoom_in(),
                    "out" => self.editor.zoom_out(),
                    "reset" | "" => self.editor.reset_zoom(),
                    pct => {
                        let pct: u16 = pct
                            .trim_end_matches('%')
                            .parse()
                            .map_err(|_| invalid("usage: zoom in|out|reset|<percent>"))?;
                        self.editor.set_zoom(Zoom::new(pct));
                        self.editor.zoom()
                    }
                };
                println!("zoom: {}%", zoom.percent());
            }
            "grid" => {
                let on = self.editor.toggle_grid();
                println!("grid: {}", if on { "on" } else { "off" });
            }
            "viewport" => {
                let viewport = parse_viewport(rest).map_err(|e| invalid(&e))?;
                self.editor.set_viewport(viewport);
            }
            other => return Err(invalid(&format!("unknown command `{other}` (try `help`)"))),
        }
        Ok(Flow::Continue)
    }
}

fn parse_side(s: &str) -> Result<Side, EditError> {
    Side::ALL
        .into_iter()
        .find(|side| side.to_string() == s)
        .ok_or_else(|| invalid("side must be top, right, bottom or left"))
}

/// Resolve a typed id without interning it. Ids never seen by the page are
/// rejected here.
fn known_id(s: &str) -> Result<NodeId, EditError> {
    if s.is_empty() {
        return Err(invalid("missing component id"));
    }
    NodeId::lookup(s).ok_or_else(|| invalid(&format!("no component `{s}`")))
}

fn invalid(msg: &str) -> EditError {
    EditError::InvalidIntent(msg.to_string())
}

fn display_target(target: Option<NodeId>) -> String {
    target.map_or_else(|| "page".to_string(), |id| id.to_string())
}

// ─── Output ─────────────────────────────────────────────────────────────

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("error: cannot serialize output: {e}"),
    }
}

fn print_error(e: &EditError) {
    let hint = if e.retryable() { " (retry may succeed)" } else { "" };
    eprintln!("error[{}]: {e}{hint}", e.code());
}

fn print_catalog(query: &str) {
    let catalog = Catalog::builtin();
    if query.trim().is_empty() {
        for suggestion in catalog.featured_suggestions() {
            println!("try: {suggestion}");
        }
    }
    for category in catalog.search(query) {
        println!("{}", category.name);
        for entry in &category.entries {
            println!("  {:<14} {}", entry.id, entry.description);
        }
    }
}

fn print_help() {
    println!(
        "\
commands:
  show | dump | history | inspect
  select <id>|none
  set <key> <value>            padding|margin <side> <px>
  add <library-id> [parent] [index]
  remove <id>                  apply <intent-json>
  prompt <text>                cancel
  context page|component       chat [clear]     suggest
  search <query>
  zoom in|out|reset|<percent>  viewport narrow|medium|wide
  grid                         quit"
    );
}
