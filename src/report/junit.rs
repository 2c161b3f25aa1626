//! JUnit XML import
//!
//! Turns a `junit.xml` (surefire, gradle, pytest, cargo-nextest...) into a
//! [`Batch`] so any test framework's output can be reported after the fact.

use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::{Path, PathBuf};

use crate::runner::events::{FailureCause, TestEvent, TestOutcome};
use crate::runner::Batch;

/// Property names carrying the external test id
const TEST_ID_PROPERTIES: [&str; 2] = ["testId", "test_id"];
const TITLE_PROPERTY: &str = "title";

/// Parse a single JUnit XML document
pub fn parse_junit_xml(xml: &str) -> Result<Batch> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut batch = Batch::default();
    let mut fallback_name: Option<String> = None;
    // Open <testsuite> elements, innermost last
    let mut suites: Vec<Option<String>> = Vec::new();
    let mut current: Option<CaseBuilder> = None;
    let mut collecting = false;

    loop {
        let event = reader
            .read_event()
            .with_context(|| format!("Invalid JUnit XML at byte {}", reader.buffer_position()))?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                match e.name().as_ref() {
                    b"testsuites" => {
                        if let Some(name) = attr(e, "name")?.filter(|n| !n.is_empty()) {
                            batch.name = name;
                        }
                    }
                    b"testsuite" => {
                        let name = attr(e, "name")?;
                        if fallback_name.is_none() {
                            fallback_name = name.as_deref().map(package_name);
                        }
                        if !is_empty {
                            suites.push(name);
                        }
                    }
                    b"testcase" => {
                        let case = CaseBuilder {
                            name: attr(e, "name")?.unwrap_or_default(),
                            classname: attr(e, "classname")?
                                .or_else(|| suites.iter().rev().find_map(Clone::clone)),
                            ..Default::default()
                        };
                        if is_empty {
                            batch.events.push(case.build());
                        } else {
                            current = Some(case);
                        }
                    }
                    b"failure" | b"error" => {
                        if let Some(ref mut case) = current {
                            case.outcome = TestOutcome::Failed;
                            case.kind = attr(e, "type")?;
                            case.message = attr(e, "message")?;
                            collecting = !is_empty;
                        }
                    }
                    b"skipped" => {
                        if let Some(ref mut case) = current {
                            case.outcome = TestOutcome::Disabled;
                            case.message = attr(e, "message")?;
                            collecting = !is_empty;
                        }
                    }
                    b"property" => {
                        if let Some(ref mut case) = current {
                            let name = attr(e, "name")?.unwrap_or_default();
                            let value = attr(e, "value")?;
                            if TEST_ID_PROPERTIES.contains(&name.as_str()) {
                                case.test_id = value;
                            } else if name == TITLE_PROPERTY {
                                case.title = value;
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(e) if collecting => {
                if let Some(ref mut case) = current {
                    case.body.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) if collecting => {
                if let Some(ref mut case) = current {
                    case.body.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(ref e) => match e.name().as_ref() {
                b"failure" | b"error" | b"skipped" => collecting = false,
                b"testcase" => {
                    if let Some(case) = current.take() {
                        batch.events.push(case.build());
                    }
                }
                b"testsuite" => {
                    suites.pop();
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if batch.name.is_empty() {
        batch.name = fallback_name.unwrap_or_default();
    }

    Ok(batch)
}

/// Load a JUnit report file, or every `*.xml` report in a directory
pub fn load_junit(path: &Path) -> Result<Batch> {
    let files = if path.is_dir() {
        let mut files: Vec<PathBuf> = std::fs::read_dir(path)
            .with_context(|| format!("Failed to read directory {}", path.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map_or(false, |ext| ext == "xml"))
            .collect();
        files.sort();
        files
    } else {
        vec![path.to_path_buf()]
    };

    if files.is_empty() {
        anyhow::bail!("No JUnit XML reports found in {}", path.display());
    }

    let mut merged = Batch::default();
    for file in &files {
        let xml = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let batch =
            parse_junit_xml(&xml).with_context(|| format!("Failed to parse {}", file.display()))?;

        if merged.name.is_empty() {
            merged.name = batch.name;
        }
        merged.events.extend(batch.events);
    }

    Ok(merged)
}

#[derive(Debug)]
struct CaseBuilder {
    name: String,
    classname: Option<String>,
    outcome: TestOutcome,
    kind: Option<String>,
    message: Option<String>,
    body: String,
    test_id: Option<String>,
    title: Option<String>,
}

impl Default for CaseBuilder {
    fn default() -> Self {
        Self {
            name: String::new(),
            classname: None,
            outcome: TestOutcome::Passed,
            kind: None,
            message: None,
            body: String::new(),
            test_id: None,
            title: None,
        }
    }
}

impl CaseBuilder {
    fn build(self) -> TestEvent {
        // A skipped element with a trace was aborted at runtime
        let outcome = match self.outcome {
            TestOutcome::Disabled if !self.body.trim().is_empty() => TestOutcome::Aborted,
            other => other,
        };

        let cause = match outcome {
            TestOutcome::Failed | TestOutcome::Aborted => {
                Some(parse_trace(self.kind, self.message, &self.body))
            }
            TestOutcome::Passed | TestOutcome::Disabled => None,
        };

        TestEvent {
            name: self.name.trim_end_matches("()").to_string(),
            suite: self
                .classname
                .as_deref()
                .map(simple_name)
                .unwrap_or_default(),
            outcome,
            cause,
            test_id: self.test_id,
            title: self.title,
        }
    }
}

/// Rebuild a cause chain from a printed stack trace
fn parse_trace(kind: Option<String>, message: Option<String>, body: &str) -> FailureCause {
    let mut causes = vec![FailureCause {
        kind: kind.unwrap_or_default(),
        message,
        frames: Vec::new(),
        caused_by: None,
    }];

    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(frame) = line.strip_prefix("at ") {
            if let Some(cause) = causes.last_mut() {
                cause.frames.push(frame.to_string());
            }
        } else if let Some(header) = line.strip_prefix("Caused by: ") {
            let (kind, message) = split_header(header);
            causes.push(FailureCause::new(kind, message));
        } else if causes.len() == 1 && causes[0].frames.is_empty() {
            // Header line of the outermost error
            let (kind, message) = split_header(line);
            if causes[0].kind.is_empty() {
                causes[0].kind = kind.to_string();
            }
            if causes[0].message.is_none() {
                causes[0].message = message.map(str::to_string);
            }
        }
    }

    let mut chain = causes.pop().unwrap_or_else(|| FailureCause::new("Error", None));
    while let Some(outer) = causes.pop() {
        chain = outer.with_caused_by(chain);
    }
    chain
}

/// `java.lang.RuntimeException: boom` -> (`java.lang.RuntimeException`, `boom`)
fn split_header(line: &str) -> (&str, Option<&str>) {
    match line.split_once(": ") {
        Some((kind, message)) => (kind, Some(message)),
        None => (line, None),
    }
}

/// `com.example.LoginTest` -> `LoginTest`, `com.example.Outer$Inner` -> `Inner`
fn simple_name(classname: &str) -> String {
    classname
        .rsplit(|c: char| c == '.' || c == '$')
        .next()
        .unwrap_or(classname)
        .to_string()
}

/// `com.example.LoginTest` -> `com.example`
fn package_name(classname: &str) -> String {
    match classname.rsplit_once('.') {
        Some((package, _)) => package.to_string(),
        None => classname.to_string(),
    }
}

fn attr(element: &BytesStart, name: &str) -> Result<Option<String>> {
    for attribute in element.attributes() {
        let attribute = attribute?;
        if attribute.key.as_ref() == name.as_bytes() {
            return Ok(Some(attribute.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}
