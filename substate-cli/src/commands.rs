//! Command execution.

use crate::Commands;
use colored::Colorize;
use substate_core::{ConfigError, CoreError, MachineDefinition, NodeId, StateKind};
use substate_harness::config::OutputSettings;
use substate_harness::{output, presets, EventScript, HarnessError, OutputFormat, ScriptRunner};

/// Executes a command and returns the formatted output.
pub fn execute(cmd: Commands) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        Commands::Repl { .. } => unreachable!(),

        Commands::Machines => {
            let mut output = String::new();
            for name in presets::MACHINES {
                let def = presets::machine(name)?;
                output.push_str(&format!(
                    "  {}{} ({} states)\n",
                    presets::BUILTIN_PREFIX.dimmed(),
                    name.cyan(),
                    def.len()
                ));
            }
            Ok(output)
        }

        Commands::Validate { definition } => {
            let def = presets::load_machine(&definition)?;
            let atomic = def.nodes().filter(|n| n.is_atomic()).count();
            Ok(format!(
                "{} machine {}\n  States: {} ({} atomic)\n  Initial: {}\n  Checksum: {}",
                "Valid".green(),
                def.id().cyan(),
                def.len(),
                atomic,
                def.path_of(&def.initial_path()).to_string().yellow(),
                def.checksum
            ))
        }

        Commands::Inspect { definition } => {
            let def = presets::load_machine(&definition)?;
            Ok(render_tree(&def))
        }

        Commands::Run {
            machine,
            script,
            json,
            show_context,
            keep_going,
        } => {
            let def = presets::load_machine(&machine)?;
            let script = match script {
                Some(path) => EventScript::from_file(path)?,
                None => presets::reference_script()?,
            };

            let report = ScriptRunner::new(def)
                .stop_on_error(!keep_going)
                .run(&script)?;

            let settings = OutputSettings {
                format: if json {
                    OutputFormat::Json
                } else {
                    OutputFormat::Text
                },
                show_context,
            };
            let rendered = output::render(&report, &settings)?;
            Ok(rendered.trim_end().to_string())
        }
    }
}

/// Returns the stable code of a substate error, if `err` is one.
pub fn error_code(err: &(dyn std::error::Error + 'static)) -> Option<&'static str> {
    err.downcast_ref::<HarnessError>()
        .map(HarnessError::error_code)
        .or_else(|| err.downcast_ref::<CoreError>().map(CoreError::error_code))
        .or_else(|| err.downcast_ref::<ConfigError>().map(ConfigError::error_code))
}

/// Renders the state tree with initial markers and transitions.
pub fn render_tree(def: &MachineDefinition) -> String {
    let mut output = String::new();
    render_node(def, def.root(), 0, false, &mut output);
    output.trim_end().to_string()
}

fn render_node(
    def: &MachineDefinition,
    id: NodeId,
    depth: usize,
    is_initial: bool,
    output: &mut String,
) {
    let node = def.node(id);
    let indent = "  ".repeat(depth);
    let marker = if is_initial { "*" } else { " " };
    let name = match node.kind() {
        StateKind::Atomic => node.id().normal(),
        StateKind::Compound { .. } => node.id().bold(),
    };
    output.push_str(&format!("{}{}{}\n", indent, marker.yellow(), name));

    for (event, target) in node.transitions() {
        output.push_str(&format!(
            "{}    {} -> {}\n",
            indent,
            event.cyan(),
            def.node(target.node).path().relative()
        ));
    }

    if let StateKind::Compound { initial, children } = node.kind() {
        for child in children {
            render_node(def, *child, depth + 1, child == initial, output);
        }
    }
}
