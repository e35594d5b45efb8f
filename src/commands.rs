//! Console commands: parsing, dispatch against a [`Session`], and match
//! rendering

use crate::config::ExportFormat;
use crate::error::KonkordError;
use crate::query::{FilterScheme, RangeMode};
use crate::search::{Match, MatchGroup};
use crate::session::Session;
use crate::tokens::TokenField;
use std::fmt::Write as _;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

pub const HELP: &str = "\
Commands:
  load <source>                  load a URL or a file path
  find <scheme>                  run a query against the active corpus
                                 e.g. find lemma=run pos=VBZ window=2:3 cs
                                 or   find WF=\"\",Lemma=\"run\",POS=\"\",whole_sentence
  history                        queries for the active corpus
  replay <n>                     re-run history entry n
  sources                        loaded sources
  activate <source>              switch back to a loaded source
  recent [prefix]                recently loaded sources
  suggest <form|lemma|pos> <prefix>
  export <path> [xml|json]       export every query result
  export-corpora <path> [xml|json]
  cache [clear]                  result cache size, or empty it
  config [save]                  effective configuration, or write it
  help
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Load(String),
    Find(FilterScheme),
    History,
    Replay(usize),
    Sources,
    Activate(String),
    Recent(String),
    Suggest(TokenField, String),
    Export(PathBuf, Option<ExportFormat>),
    ExportCorpora(PathBuf, Option<ExportFormat>),
    Cache,
    ClearCache,
    Config,
    SaveConfig,
    Help,
    Quit,
}

fn usage(message: &str) -> KonkordError {
    KonkordError::Other(format!("usage: {}", message))
}

impl Command {
    /// Parse one console line. Blank lines and `#` comments give `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, KonkordError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        let command = match name {
            "load" if !rest.is_empty() => Command::Load(rest.to_string()),
            "load" => return Err(usage("load <source>")),
            "find" => Command::Find(parse_find(rest)?),
            "history" => Command::History,
            "replay" => Command::Replay(
                rest.parse()
                    .map_err(|_| usage("replay <n>"))?,
            ),
            "sources" => Command::Sources,
            "activate" if !rest.is_empty() => Command::Activate(rest.to_string()),
            "activate" => return Err(usage("activate <source>")),
            "recent" => Command::Recent(rest.to_string()),
            "suggest" => {
                let (field, prefix) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                let field = TokenField::parse(field).ok_or_else(|| usage("suggest <form|lemma|pos> <prefix>"))?;
                Command::Suggest(field, prefix.trim().to_string())
            }
            "export" | "export-corpora" => {
                let (path, format) = parse_export_args(rest)?;
                if name == "export" {
                    Command::Export(path, format)
                } else {
                    Command::ExportCorpora(path, format)
                }
            }
            "cache" if rest.is_empty() => Command::Cache,
            "cache" if rest == "clear" => Command::ClearCache,
            "cache" => return Err(usage("cache [clear]")),
            "config" if rest.is_empty() => Command::Config,
            "config" if rest == "save" => Command::SaveConfig,
            "config" => return Err(usage("config [save]")),
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(KonkordError::Other(format!("unknown command '{}', try help", other))),
        };
        Ok(Some(command))
    }
}

/// `find` accepts the canonical rendering, fields in any order, or
/// unquoted `key=value` words: `wf=`/`form=`, `lemma=`, `pos=`,
/// `window=L:R`, and the flags `cs`, `sentence` and `invalid`. Any quoted
/// value selects the canonical parser.
fn parse_find(args: &str) -> Result<FilterScheme, KonkordError> {
    if args.contains("=\"") {
        return FilterScheme::parse(args);
    }
    let mut scheme = FilterScheme::new();
    for word in args.split_whitespace() {
        match word.split_once('=') {
            Some(("window", value)) => {
                let (left, right) = value
                    .split_once(':')
                    .and_then(|(l, r)| Some((l.parse().ok()?, r.parse().ok()?)))
                    .ok_or_else(|| KonkordError::InvalidQuery(format!("bad window '{}'", value)))?;
                scheme = scheme.with_neighbors(left, right);
            }
            Some((key, value)) => match TokenField::parse(key) {
                Some(TokenField::Form) => scheme = scheme.with_word_form(value),
                Some(TokenField::Lemma) => scheme = scheme.with_lemma(value),
                Some(TokenField::Pos) => scheme = scheme.with_pos(value),
                None => return Err(KonkordError::InvalidQuery(format!("unknown key '{}'", key))),
            },
            None => match word {
                "cs" | "case-sensitive" => scheme = scheme.case_sensitive(true),
                "sentence" => scheme = scheme.with_range(RangeMode::WholeSentence),
                "invalid" => scheme = scheme.with_range(RangeMode::Invalid),
                other => return Err(KonkordError::InvalidQuery(format!("unknown word '{}'", other))),
            },
        }
    }
    if !scheme.has_constraint() {
        return Err(KonkordError::InvalidQuery("find needs wf=, lemma= or pos=".to_string()));
    }
    Ok(scheme)
}

fn parse_export_args(args: &str) -> Result<(PathBuf, Option<ExportFormat>), KonkordError> {
    let mut words = args.split_whitespace();
    let path = words.next().ok_or_else(|| usage("export <path> [xml|json]"))?;
    let format = match words.next() {
        Some(name) => Some(
            ExportFormat::parse(name)
                .ok_or_else(|| KonkordError::Export(format!("unknown format '{}'", name)))?,
        ),
        None => None,
    };
    if words.next().is_some() {
        return Err(usage("export <path> [xml|json]"));
    }
    Ok((PathBuf::from(path), format))
}

/// Three aligned rows (forms, lemmas, POS tags) with the anchor column
/// bracketed.
pub fn render_match(m: &Match) -> String {
    let cells: Vec<[String; 3]> = m
        .tokens
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let cell = |s: &str| {
                if i == m.anchor_index {
                    format!("[{}]", s)
                } else {
                    s.to_string()
                }
            };
            [cell(&t.form), cell(&t.lemma), cell(&t.pos)]
        })
        .collect();
    let widths: Vec<usize> = cells
        .iter()
        .map(|c| c.iter().map(|s| s.chars().count()).max().unwrap_or(0))
        .collect();

    (0..3)
        .map(|row| {
            cells
                .iter()
                .zip(&widths)
                .map(|(c, &width)| format!("{:<width$}", c[row], width = width))
                .collect::<Vec<_>>()
                .join(" ")
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_groups(groups: &[MatchGroup]) -> String {
    let matches: Vec<&Match> = groups.iter().flatten().collect();
    let mut out = format!("{} match(es)", matches.len());
    for m in matches {
        out.push_str("\n\n");
        out.push_str(&render_match(m));
    }
    out
}

fn render_list(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue(String),
    Quit,
}

/// Run one command. Loading happens on the blocking pool; everything else
/// is a cheap call on the session.
pub async fn execute(session: &mut Session, command: Command) -> Result<Outcome, KonkordError> {
    debug!(?command, "executing");
    let text = match command {
        Command::Load(identifier) => {
            let job = session.load_job(&identifier);
            let corpus = tokio::task::spawn_blocking(move || job.run())
                .await
                .map_err(|e| KonkordError::Other(format!("Task join error: {}", e)))??;
            let summary = format!(
                "{} sentences, {} tokens",
                corpus.sentence_count(),
                corpus.token_count()
            );
            let id = session.install(corpus);
            format!("loaded {} as corpus #{}: {}", identifier.trim(), id.0, summary)
        }
        Command::Find(scheme) => {
            let results = session.run(scheme);
            if session.active_corpus().is_none() {
                "no corpus loaded".to_string()
            } else {
                render_groups(&results)
            }
        }
        Command::History => {
            let mut out = String::new();
            for (i, entry) in session.history().iter().enumerate() {
                let _ = writeln!(out, "{:>3}. #{} {}", i, entry.corpus.0, entry.scheme);
            }
            if out.is_empty() {
                "no history".to_string()
            } else {
                out.trim_end().to_string()
            }
        }
        Command::Replay(index) => {
            let (entry, results) = session.replay_index(index)?;
            format!("{}\n{}", entry.scheme, render_groups(&results))
        }
        Command::Sources => render_list(&session.sources(), "no sources loaded"),
        Command::Activate(source) => {
            let id = session.activate(&source)?;
            format!("active corpus is #{}", id.0)
        }
        Command::Recent(prefix) => render_list(&session.recent_sources(&prefix)?, "no recent sources"),
        Command::Suggest(field, prefix) => render_list(&session.suggest(field, &prefix), "no suggestions"),
        Command::Export(path, format) => {
            let count = session.export(&path, format)?;
            format!("exported {} document(s) to {}", count, path.display())
        }
        Command::ExportCorpora(path, format) => {
            let count = session.export_corpora(&path, format)?;
            format!("exported {} corpus document(s) to {}", count, path.display())
        }
        Command::Cache => {
            let (len, cap) = session.cache_stats();
            format!("{} of {} result sets cached", len, cap)
        }
        Command::ClearCache => {
            session.clear_cache();
            "result cache cleared".to_string()
        }
        Command::Config => serde_json::to_string_pretty(session.config())
            .map_err(|e| KonkordError::Config(e.to_string()))?,
        Command::SaveConfig => {
            let path = session.save_config()?;
            format!("saved configuration to {}", path.display())
        }
        Command::Help => HELP.to_string(),
        Command::Quit => return Ok(Outcome::Quit),
    };
    Ok(Outcome::Continue(text))
}

/// Read commands line by line until EOF or `quit`. Command errors are
/// printed and the loop goes on.
pub async fn run_console<R>(session: &mut Session, input: R, echo: bool) -> Result<(), KonkordError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if echo && !line.trim().is_empty() {
            println!("> {}", line.trim());
        }
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("error: {}", e);
                continue;
            }
        };
        match execute(session, command).await {
            Ok(Outcome::Continue(text)) => println!("{}", text),
            Ok(Outcome::Quit) => break,
            Err(e) => eprintln!("error: {}", e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::Token;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("  # comment").unwrap(), None);
        assert_eq!(
            Command::parse("load  /tmp/a.txt ").unwrap(),
            Some(Command::Load("/tmp/a.txt".to_string()))
        );
        assert_eq!(Command::parse("replay 2").unwrap(), Some(Command::Replay(2)));
        assert_eq!(
            Command::parse("suggest lemma ru").unwrap(),
            Some(Command::Suggest(TokenField::Lemma, "ru".to_string()))
        );
        assert_eq!(
            Command::parse("export out.json json").unwrap(),
            Some(Command::Export(PathBuf::from("out.json"), Some(ExportFormat::Json)))
        );
        assert!(Command::parse("replay x").is_err());
        assert!(Command::parse("export out.json yaml").is_err());
        assert_eq!(Command::parse("cache clear").unwrap(), Some(Command::ClearCache));
        assert_eq!(Command::parse("config save").unwrap(), Some(Command::SaveConfig));
        assert!(Command::parse("config drop").is_err());
        assert!(Command::parse("frobnicate").is_err());
    }

    #[test]
    fn test_parse_find_forms() {
        let short = parse_find("lemma=run pos=VBZ window=2:3 cs").unwrap();
        assert_eq!(
            short,
            FilterScheme::new()
                .with_lemma("run")
                .with_pos("VBZ")
                .with_neighbors(2, 3)
                .case_sensitive(true)
        );
        let canonical = parse_find(&short.render()).unwrap();
        assert_eq!(canonical, short);

        let reordered = Command::parse(r#"find Lemma="run",WF="",POS="",whole_sentence"#).unwrap();
        assert_eq!(reordered, Some(Command::Find(FilterScheme::new().with_lemma("run"))));
        assert!(matches!(
            Command::parse(r#"find POS="NN",Lemma="run""#),
            Err(KonkordError::InvalidQuery(_))
        ));

        assert!(matches!(parse_find("window=2:3"), Err(KonkordError::InvalidQuery(_))));
        assert!(matches!(parse_find("lemma=a window=2"), Err(KonkordError::InvalidQuery(_))));
        assert!(matches!(parse_find("colour=red"), Err(KonkordError::InvalidQuery(_))));
    }

    #[test]
    fn test_render_match_brackets_anchor() {
        let m = Match {
            anchor_index: 1,
            tokens: vec![Token::new("The", "DT", "the"), Token::new("dog", "NN", "dog")],
        };
        assert_eq!(render_match(&m), "The [dog]\nthe [dog]\nDT  [NN]");
    }
}
