use std::io::{self, BufRead, IsTerminal, Write};

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

/// Source of the user's answer to a confirmation prompt.
pub trait ConfirmInput {
    /// Returns what the user typed, or `None` if they gave no answer.
    fn read_response(&mut self) -> io::Result<Option<String>>;
}

/// Reads a single key press from the terminal. Enter counts as no answer.
pub struct KeyConfirm;

impl KeyConfirm {
    fn read_key() -> io::Result<Option<String>> {
        loop {
            if let Event::Key(key) = crossterm::event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                return Ok(match key {
                    KeyEvent {
                        code: KeyCode::Char('c'),
                        modifiers: KeyModifiers::CONTROL,
                        ..
                    } => Some("n".to_string()),
                    KeyEvent {
                        code: KeyCode::Enter,
                        ..
                    } => None,
                    KeyEvent {
                        code: KeyCode::Char(c),
                        ..
                    } => Some(c.to_string()),
                    KeyEvent { code, .. } => Some(format!("{code:?}")),
                });
            }
        }
    }
}

impl ConfirmInput for KeyConfirm {
    fn read_response(&mut self) -> io::Result<Option<String>> {
        enable_raw_mode()?;
        let response = Self::read_key();
        disable_raw_mode()?;
        let response = response?;
        let mut stdout = io::stdout();
        writeln!(stdout, "{}", response.as_deref().unwrap_or_default())?;
        stdout.flush()?;
        Ok(response)
    }
}

/// Reads one line from any buffered source, stdin when piped.
pub struct LineConfirm<R> {
    reader: R,
}

impl<R: BufRead> LineConfirm<R> {
    pub const fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> ConfirmInput for LineConfirm<R> {
    fn read_response(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        self.reader.read_line(&mut line)?;
        let line = line.trim();
        Ok((!line.is_empty()).then(|| line.to_string()))
    }
}

/// Picks single-key input on a terminal and line input otherwise.
pub fn stdin_confirm() -> Box<dyn ConfirmInput> {
    if io::stdin().is_terminal() {
        Box::new(KeyConfirm)
    } else {
        Box::new(LineConfirm::new(io::stdin().lock()))
    }
}

/// Asks `prompt` and reports whether to go ahead.
///
/// No answer means yes. Any answer other than `y` (either case) means no.
pub fn confirm(
    prompt: &str,
    input: &mut dyn ConfirmInput,
    out: &mut dyn Write,
) -> io::Result<bool> {
    write!(out, "{prompt} [Y/n]: ")?;
    out.flush()?;
    Ok(match input.read_response()? {
        Some(response) => response.to_lowercase() == "y",
        None => true,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::{self, Cursor};

    use super::{confirm, ConfirmInput, LineConfirm};

    /// Hands out a fixed answer and counts how often it was asked.
    pub(crate) struct ScriptedConfirm {
        pub answer: Option<String>,
        pub calls: usize,
    }

    impl ScriptedConfirm {
        pub(crate) fn new(answer: Option<&str>) -> Self {
            Self {
                answer: answer.map(str::to_string),
                calls: 0,
            }
        }
    }

    impl ConfirmInput for ScriptedConfirm {
        fn read_response(&mut self) -> io::Result<Option<String>> {
            self.calls += 1;
            Ok(self.answer.clone())
        }
    }

    fn answer(response: Option<&str>) -> bool {
        let mut out: Vec<u8> = Vec::new();
        confirm("Execute?", &mut ScriptedConfirm::new(response), &mut out).unwrap()
    }

    #[test]
    fn empty_input_confirms() {
        assert!(answer(None));
    }

    #[test]
    fn yes_and_no() {
        assert!(answer(Some("y")));
        assert!(answer(Some("Y")));
        assert!(!answer(Some("n")));
        assert!(!answer(Some("N")));
        assert!(!answer(Some("x")));
    }

    #[test]
    fn writes_prompt() {
        let mut out: Vec<u8> = Vec::new();
        confirm("Execute?", &mut ScriptedConfirm::new(None), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Execute? [Y/n]: ");
    }

    #[test]
    fn line_input() {
        let mut out: Vec<u8> = Vec::new();
        let mut blank = LineConfirm::new(Cursor::new("\n"));
        assert!(confirm("Execute?", &mut blank, &mut out).unwrap());
        let mut eof = LineConfirm::new(Cursor::new(""));
        assert!(confirm("Execute?", &mut eof, &mut out).unwrap());
        let mut no = LineConfirm::new(Cursor::new(" n \n"));
        assert!(!confirm("Execute?", &mut no, &mut out).unwrap());
        let mut yes = LineConfirm::new(Cursor::new("y\n"));
        assert!(confirm("Execute?", &mut yes, &mut out).unwrap());
    }
}
