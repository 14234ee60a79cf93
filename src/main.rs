use anyhow::{bail, Context, Result};
use std::env;
use std::io::{self, BufRead};
use std::process;

use rulematch::Rule;

struct ClassMember {
    class: String,
    member: String,
    replacement: Option<String>,
}

struct Options {
    pattern: String,
    template: String,
    members: Vec<ClassMember>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Options> {
    let mut pattern = None;
    let mut template = None;
    let mut members = Vec::new();

    while let Some(flag) = args.next() {
        let mut value = || args.next().with_context(|| format!("missing value after {}", flag));
        match flag.as_str() {
            "-E" => pattern = Some(value()?),
            "-r" => template = Some(value()?),
            "-c" => members.push(parse_member(&value()?)?),
            other => bail!("unexpected argument: {}", other),
        }
    }

    Ok(Options {
        pattern: pattern.context("expected -E <pattern>")?,
        template: template.unwrap_or_else(|| "%0".to_string()),
        members,
    })
}

// <class>=<member>[|<replacement>]
fn parse_member(spec: &str) -> Result<ClassMember> {
    let Some((class, rest)) = spec.split_once('=') else {
        bail!("expected <class>=<member>, got {:?}", spec);
    };
    let (member, replacement) = match rest.split_once('|') {
        Some((member, replacement)) => (member, Some(replacement.to_string())),
        None => (rest, None),
    };
    Ok(ClassMember {
        class: class.to_string(),
        member: member.to_string(),
        replacement,
    })
}

fn run() -> Result<bool> {
    let options = parse_args(env::args().skip(1))?;
    let mut rule = Rule::new(&options.pattern, &options.template, ());
    for m in &options.members {
        if !rule.add_to_class(&m.class, &m.member, m.replacement.as_deref()) {
            eprintln!("warning: member {:?} of <{}> not added", m.member, m.class);
        }
    }
    for warning in rule.warnings() {
        eprintln!("warning: {}", warning);
    }

    let mut matched = false;
    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        let word = line.trim_end_matches('\r');
        if let Some(rewrite) = rule.rewrite(word) {
            for warning in &rewrite.warnings {
                eprintln!("warning: {}: {}", word, warning);
            }
            println!("{}", rewrite.text);
            matched = true;
        }
    }
    Ok(matched)
}

// Usage: rulematch -E <pattern> [-r <template>] [-c <class>=<member>[|<replacement>]]... < words
fn main() {
    match run() {
        Ok(true) => process::exit(0),
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!("error: {:#}", err);
            process::exit(2);
        }
    }
}
