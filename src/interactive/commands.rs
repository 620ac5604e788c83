//! Command parsing for the interactive session

use std::path::PathBuf;

use crate::config::CompressionLevel;
use crate::error::{Error, Result};

/// One line typed at the session prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(Vec<PathBuf>),
    Unadd(String),
    Files,
    Clear,
    Fields,
    Remove(String),
    Keep(String),
    Set(String, String),
    Custom(String, Option<String>),
    Uncustom(String),
    Neutral,
    Random,
    ResetFields,
    Scan,
    Option { name: String, value: String },
    Output(Option<PathBuf>),
    Compression(CompressionLevel),
    Start,
    Stop,
    Status,
    Reset,
    ClearLog,
    Help,
    Quit,
}

pub const HELP: &str = "\
Files
  add PATH...            add PDF files or folders (folders follow the recursion options)
  unadd PATH|N           drop a file by path or by its number in 'files'
  files                  list selected files
  clear                  clear the file list
Metadata
  fields                 show metadata directives
  remove KEY             remove KEY from every file
  keep KEY               leave KEY untouched
  set KEY VALUE          write VALUE to KEY
  custom KEY [VALUE]     add a custom field (removed when no value is given)
  uncustom KEY           drop a custom field
  neutral                fill every field with neutral values
  random                 fill every field with random values
  reset-fields           clear all values, keeping remove toggles
  scan                   add fields found in the first selected file
Options
  option NAME VALUE      backup | overwrite | recursive | show-errors (on/off), max-depth N
  output PATH|none       output file or folder, none for <name>_clean.pdf
  compression LEVEL      none | low | medium | high | maximum
Processing
  start                  process the selected files
  stop                   stop after the current file
  status                 show options and progress
  reset                  clear files, fields and compression
  clear-log              clear the log
  help                   show this help
  quit                   save settings and exit";

/// Whitespace-separated words; double quotes group words containing spaces
pub fn split_words(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quoted {
        return Err(Error::DirectiveError("unterminated quote".into()));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

fn usage(text: &str) -> Error {
    Error::DirectiveError(format!("usage: {}", text))
}

fn one(args: &[String], text: &str) -> Result<String> {
    match args {
        [value] => Ok(value.clone()),
        _ => Err(usage(text)),
    }
}

/// Parses a line; `Ok(None)` for a blank line
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let words = split_words(line)?;
    let Some((verb, args)) = words.split_first() else {
        return Ok(None);
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "add" => {
            if args.is_empty() {
                return Err(usage("add PATH..."));
            }
            Command::Add(args.iter().map(PathBuf::from).collect())
        }
        "unadd" => Command::Unadd(one(args, "unadd PATH|N")?),
        "files" | "ls" => Command::Files,
        "clear" => Command::Clear,
        "fields" => Command::Fields,
        "remove" => Command::Remove(one(args, "remove KEY")?),
        "keep" => Command::Keep(one(args, "keep KEY")?),
        "set" => match args {
            [key, rest @ ..] if !rest.is_empty() => Command::Set(key.clone(), rest.join(" ")),
            _ => return Err(usage("set KEY VALUE")),
        },
        "custom" => match args {
            [key] => Command::Custom(key.clone(), None),
            [key, rest @ ..] => Command::Custom(key.clone(), Some(rest.join(" "))),
            _ => return Err(usage("custom KEY [VALUE]")),
        },
        "uncustom" => Command::Uncustom(one(args, "uncustom KEY")?),
        "neutral" => Command::Neutral,
        "random" => Command::Random,
        "reset-fields" => Command::ResetFields,
        "scan" => Command::Scan,
        "option" => match args {
            [name, value] => Command::Option {
                name: name.clone(),
                value: value.clone(),
            },
            _ => return Err(usage("option NAME VALUE")),
        },
        "output" => {
            let target = one(args, "output PATH|none")?;
            if target.eq_ignore_ascii_case("none") {
                Command::Output(None)
            } else {
                Command::Output(Some(PathBuf::from(target)))
            }
        }
        "compression" => {
            let level = one(args, "compression LEVEL")?;
            Command::Compression(level.parse()?)
        }
        "start" => Command::Start,
        "stop" => Command::Stop,
        "status" => Command::Status,
        "reset" => Command::Reset,
        "clear-log" => Command::ClearLog,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => {
            return Err(Error::DirectiveError(format!(
                "unknown command '{}', type 'help'",
                other
            )))
        }
    };
    Ok(Some(command))
}
