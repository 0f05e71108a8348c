//! Interactive REPL.

use crate::commands::{error_code, render_tree};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use substate_core::{CoreError, Interpreter, MachineDefinition};
use substate_harness::output::format_value;
use substate_harness::presets;

const HELP_TEXT: &str = r#"
Available commands:
  help                          Show this help

  start [state] [context]       Start the interpreter (optionally in a state)
  send <EVENT>...               Send one or more events
  stop                          Stop the interpreter
  reset                         Discard the interpreter and create a new one

  state                         Show the current state path
  value                         Show the current state value
  events                        List events handled in the current state
  context                       Show the current context
  history                       Show transitions observed so far
  tree                          Print the state tree

  quit, exit                    Exit the REPL
"#;

/// One interactive session over a single machine definition.
struct Session {
    definition: Arc<MachineDefinition>,
    interpreter: Interpreter,
    history: Rc<RefCell<Vec<String>>>,
}

impl Session {
    fn new(definition: Arc<MachineDefinition>) -> Self {
        let history = Rc::new(RefCell::new(Vec::new()));
        let interpreter = Self::interpreter(&definition, &history);
        Self {
            definition,
            interpreter,
            history,
        }
    }

    fn interpreter(
        definition: &Arc<MachineDefinition>,
        history: &Rc<RefCell<Vec<String>>>,
    ) -> Interpreter {
        let mut interpreter = Interpreter::from_definition(Arc::clone(definition));
        let log = Rc::clone(history);
        interpreter.on_transition(move |snapshot, event| {
            let line = match event {
                Some(event) => format!("{} -> {}", event, snapshot.path),
                None => format!("(start) -> {}", snapshot.path),
            };
            log.borrow_mut().push(line);
            Ok(())
        });
        interpreter
    }

    fn reset(&mut self) {
        self.history.borrow_mut().clear();
        self.interpreter = Self::interpreter(&self.definition, &self.history);
    }
}

pub fn run(machine: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "substate CLI".bold().cyan());

    let definition = Arc::new(presets::load_machine(machine)?);
    println!(
        "Loaded machine {} ({} states)",
        definition.id().green(),
        definition.len()
    );
    let mut session = Session::new(definition);

    // Create readline editor
    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(config)?;

    // Load history
    let history_path = std::env::var("HOME")
        .map(|h| std::path::PathBuf::from(h).join(".substate_history"))
        .unwrap_or_else(|_| ".substate_history".into());
    if let Err(e) = rl.load_history(&history_path) {
        if !matches!(&e, ReadlineError::Io(io) if io.kind() == std::io::ErrorKind::NotFound) {
            tracing::warn!("Failed to load history from {}: {}", history_path.display(), e);
        }
    }

    println!("Type 'help' for available commands.\n");

    loop {
        let prompt = format!("{} ", prompt_label(&session).cyan());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match execute_repl_command(&mut session, line) {
                    Ok(Some(output)) => println!("{}\n", output),
                    Ok(None) => break,
                    Err(e) => {
                        tracing::debug!("Command '{}' failed: {}", line, e);
                        println!("{}\n", describe_error(e.as_ref()));
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                tracing::warn!("Readline failed: {}", err);
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    // Save history
    if let Err(e) = rl.save_history(&history_path) {
        tracing::warn!("Failed to save history to {}: {}", history_path.display(), e);
    }

    Ok(())
}

fn prompt_label(session: &Session) -> String {
    if session.interpreter.is_running() {
        format!("{}>", session.interpreter.current_state().path.relative())
    } else {
        format!("{} ({})>", session.definition.id(), session.interpreter.status())
    }
}

fn execute_repl_command(
    session: &mut Session,
    line: &str,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.is_empty() {
        return Ok(Some(String::new()));
    }

    let cmd = parts[0].to_lowercase();
    let args = &parts[1..];

    match cmd.as_str() {
        "help" | "?" => Ok(Some(HELP_TEXT.to_string())),

        "quit" | "exit" | "q" => Ok(None),

        "start" => {
            // A leading `{` starts the context; anything before it is the state
            let (state, context) = match args.first() {
                Some(first) if first.starts_with('{') => (None, args),
                Some(first) => (Some(*first), &args[1..]),
                None => (None, args),
            };
            let context = if context.is_empty() {
                None
            } else {
                Some(serde_json::from_str::<Value>(&context.join(" "))?)
            };
            match state {
                Some(state) => session.interpreter.start_at(state, context)?,
                None => session.interpreter.start(context)?,
            }
            Ok(Some(format!(
                "{} in {}",
                "Started".green(),
                session.interpreter.current_state().path.to_string().yellow()
            )))
        }

        "send" | "s" => {
            if args.is_empty() {
                return Ok(Some("Usage: send <EVENT>...".to_string()));
            }
            let mut output = String::new();
            for event in args {
                let transition = session.interpreter.send(*event)?;
                let to = transition.to.to_string();
                output.push_str(&format!(
                    "{} -> {}{}\n",
                    event.cyan(),
                    if transition.handled {
                        to.yellow()
                    } else {
                        to.normal()
                    },
                    if transition.handled {
                        String::new()
                    } else {
                        format!(" {}", "(ignored)".dimmed())
                    }
                ));
            }
            Ok(Some(output.trim_end().to_string()))
        }

        "stop" => {
            session.interpreter.stop()?;
            Ok(Some("Stopped".yellow().to_string()))
        }

        "reset" => {
            session.reset();
            Ok(Some("Reset".green().to_string()))
        }

        "state" => Ok(Some(format!(
            "{} [{}]",
            session.interpreter.current_state().path,
            session.interpreter.status()
        ))),

        "value" => Ok(Some(format_value(
            &session.interpreter.current_state().value(),
        ))),

        "events" | "e" => {
            let events = session.interpreter.available_events();
            if events.is_empty() {
                Ok(Some("No events".yellow().to_string()))
            } else {
                Ok(Some(events.join(", ")))
            }
        }

        "context" | "ctx" => Ok(Some(format_json(session.interpreter.context()))),

        "history" => {
            let history = session.history.borrow();
            if history.is_empty() {
                return Ok(Some("No transitions".yellow().to_string()));
            }
            let mut output = String::new();
            for (i, line) in history.iter().enumerate() {
                output.push_str(&format!("[{}] {}\n", i.to_string().cyan(), line));
            }
            Ok(Some(output.trim_end().to_string()))
        }

        "tree" => Ok(Some(render_tree(&session.definition))),

        _ => Ok(Some(format!(
            "Unknown command: {}. Type 'help' for help.",
            cmd
        ))),
    }
}

fn describe_error(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = match error_code(err) {
        Some(code) => format!("{} [{}]: {}", "Error".red(), code, err),
        None => format!("{}: {}", "Error".red(), err),
    };
    if err
        .downcast_ref::<CoreError>()
        .is_some_and(CoreError::is_lifecycle)
    {
        message.push_str("\n  (use 'start' to begin, or 'reset' for a fresh interpreter)");
    }
    message
}

fn format_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
