use clap::{Parser, ValueEnum};
use nsxpath::{NamespaceSource, SelectConfig, Selector, XmlDocument};
use std::collections::HashMap;
use std::error::Error;
use std::fs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Print the text of every match, one per line
    Nodes,
    /// Print the text of the first match only
    First,
    /// Print the number of matches
    Count,
}

/// Evaluate a namespace-aware XPath expression against an XML file.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// XML document to query
    file: String,

    /// XPath 1.0 expression; prefixes resolve against the document's declarations
    expression: String,

    /// Extra namespace binding, overriding the document's (repeatable)
    #[arg(long = "ns", value_name = "PREFIX=URI", value_parser = parse_binding)]
    namespaces: Vec<(String, String)>,

    /// Value substituted for the next `{}` marker (repeatable)
    #[arg(long = "arg", value_name = "VALUE")]
    args: Vec<String>,

    #[arg(long, value_enum, default_value_t = Mode::Nodes)]
    mode: Mode,

    /// Placeholder marker to substitute
    #[arg(long, default_value = "{}")]
    placeholder: String,

    /// Leave markers without a matching argument in place instead of failing
    #[arg(long)]
    lenient: bool,
}

fn parse_binding(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(prefix, uri)| (prefix.to_string(), uri.to_string()))
        .ok_or_else(|| format!("expected PREFIX=URI, got '{}'", s))
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let text = fs::read_to_string(&args.file)?;
    let doc = XmlDocument::parse(&text)?;
    let root = doc.root_node();

    let selector = Selector::new(SelectConfig {
        placeholder: args.placeholder.clone(),
        strict_placeholders: !args.lenient,
    });
    let overrides: HashMap<String, String> = args.namespaces.iter().cloned().collect();
    let namespaces = if overrides.is_empty() {
        NamespaceSource::context(root)
    } else {
        NamespaceSource::with_overrides(root, &overrides)
    };
    let placeholder_args: Vec<&str> = args.args.iter().map(String::as_str).collect();

    match args.mode {
        Mode::Nodes => {
            let texts = selector.select_node_list_as_strings(root, &args.expression, namespaces, &placeholder_args)?;
            for text in texts {
                println!("{}", text);
            }
        }
        Mode::First => {
            if let Some(text) =
                selector.select_single_node_as_string(root, &args.expression, namespaces, &placeholder_args)?
            {
                println!("{}", text);
            }
        }
        Mode::Count => {
            let nodes = selector.select_node_list(root, &args.expression, namespaces, &placeholder_args)?;
            println!("{}", nodes.len());
        }
    }
    Ok(())
}
