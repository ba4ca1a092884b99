use anyhow::Result;
use jcode_interpreter::{Session, Value};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const PROMPT: &str = "Shell > ";
const SOURCE_NAME: &str = "<stdin>";

#[derive(Debug, PartialEq)]
enum Input<'a> {
    Blank,
    Clear,
    Exit,
    Falsy,
    Code(&'a str),
}

impl<'a> Input<'a> {
    fn classify(line: &'a str) -> Self {
        let text = line.trim();
        if text.is_empty() {
            Input::Blank
        } else if text.eq_ignore_ascii_case("clear") || text.eq_ignore_ascii_case("cl") {
            Input::Clear
        } else if text.eq_ignore_ascii_case("exit") || text.eq_ignore_ascii_case("quit") {
            Input::Exit
        } else if text == "0" || text.eq_ignore_ascii_case("false") {
            Input::Falsy
        } else {
            Input::Code(text)
        }
    }
}

pub(crate) fn run_shell(session: &mut Session) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    editor.clear_screen()?;

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                println!("\nTerminated Shell!");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        match Input::classify(&line) {
            Input::Blank => continue,
            Input::Clear => editor.clear_screen()?,
            Input::Exit => break,
            Input::Falsy => println!("0"),
            Input::Code(text) => {
                editor.add_history_entry(text)?;
                match session.run(SOURCE_NAME, text) {
                    Ok(value) => {
                        if let Some(out) = shell_output(text, &value) {
                            println!("{}", out);
                        }
                    }
                    Err(err) => println!("{}", err.render()),
                }
            }
        }
    }

    println!("Shell session terminated");
    Ok(())
}

/// What the shell echoes after running `text`. Declarations and bare number literals stay quiet.
fn shell_output(text: &str, value: &Value) -> Option<String> {
    if text.to_ascii_lowercase().starts_with("var ") || text.parse::<f64>().is_ok() {
        return None;
    }
    display_result(value)
}

/// Formats a program result, leaving out null and zero values. A single remaining value is
/// shown on its own.
pub(crate) fn display_result(value: &Value) -> Option<String> {
    match value {
        Value::List(values) => {
            let shown: Vec<Value> = values
                .borrow()
                .iter()
                .filter(|value| !is_silent(value))
                .cloned()
                .collect();

            match shown.as_slice() {
                [] => None,
                [single] => Some(single.repr()),
                _ => Some(Value::list(shown).to_string()),
            }
        }
        other if is_silent(other) => None,
        other => Some(other.repr()),
    }
}

fn is_silent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Number(n) => *n == 0.0,
        _ => false,
    }
}
