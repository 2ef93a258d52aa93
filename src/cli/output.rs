//! Colored terminal output for pipeline runs
//!
//! Interactive runs get colored step lines; CI runs additionally get GitHub
//! Actions workflow commands (`::group::`, `::error::`).

use std::io::Write;
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Output manager for consistent colored terminal output
#[derive(Debug)]
pub struct OutputManager {
    bufwtr: BufferWriter,
    ci: bool,
}

impl Clone for OutputManager {
    fn clone(&self) -> Self {
        Self::new(self.ci)
    }
}

impl OutputManager {
    /// Create a new output manager; `ci` enables workflow commands
    pub fn new(ci: bool) -> Self {
        // Runner logs render ANSI colors; their stdout is not a terminal.
        let choice = if ci {
            ColorChoice::AlwaysAnsi
        } else {
            ColorChoice::Auto
        };
        Self {
            bufwtr: BufferWriter::stdout(choice),
            ci,
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) -> std::io::Result<()> {
        let mut buffer = self.bufwtr.buffer();
        let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)));
        let _ = write!(&mut buffer, "ℹ");
        let _ = buffer.reset();
        let _ = writeln!(&mut buffer, " {}", message);
        self.bufwtr.print(&buffer)
    }

    /// Print a success message
    pub fn success(&self, message: &str) -> std::io::Result<()> {
        let mut buffer = self.bufwtr.buffer();
        let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
        let _ = write!(&mut buffer, "✓");
        let _ = buffer.reset();
        let _ = writeln!(&mut buffer, " {}", message);
        self.bufwtr.print(&buffer)
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) -> std::io::Result<()> {
        let mut buffer = self.bufwtr.buffer();
        let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true));
        let _ = write!(&mut buffer, "⚠");
        let _ = buffer.reset();
        let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
        let _ = writeln!(&mut buffer, " {}", message);
        let _ = buffer.reset();
        self.bufwtr.print(&buffer)
    }

    /// Print an error message to stderr
    pub fn error(&self, message: &str) {
        let bufwtr = BufferWriter::stderr(ColorChoice::Auto);
        let mut buffer = bufwtr.buffer();

        if buffer.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true)).is_err()
            || write!(&mut buffer, "✗").is_err()
            || buffer.reset().is_err()
            || buffer.set_color(ColorSpec::new().set_fg(Some(Color::Red))).is_err()
            || writeln!(&mut buffer, " {}", message).is_err()
            || buffer.reset().is_err()
            || bufwtr.print(&buffer).is_err()
        {
            println!("[STDERR ERROR] ✗ {}", message);
        }
    }

    /// Print an indented, uncolored line to stderr under an error
    pub fn error_detail(&self, line: &str) {
        eprintln!("    {}", line);
    }

    /// Print a numbered step line, `[2/4] Installing dependencies`
    pub fn step(&self, number: usize, total: usize, title: &str) -> std::io::Result<()> {
        let mut buffer = self.bufwtr.buffer();
        let _ = writeln!(&mut buffer);
        let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true));
        let _ = write!(&mut buffer, "[{}/{}]", number, total);
        let _ = buffer.reset();
        let _ = buffer.set_color(ColorSpec::new().set_bold(true));
        let _ = writeln!(&mut buffer, " {}", title);
        let _ = buffer.reset();
        self.bufwtr.print(&buffer)
    }

    /// Print a section header
    pub fn section(&self, title: &str) -> std::io::Result<()> {
        let mut buffer = self.bufwtr.buffer();
        let _ = writeln!(&mut buffer);
        let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true));
        let _ = writeln!(&mut buffer, "═══ {} ═══", title);
        let _ = buffer.reset();
        self.bufwtr.print(&buffer)
    }

    /// Print indented text (for sub-items)
    pub fn indent(&self, message: &str) -> std::io::Result<()> {
        let mut buffer = self.bufwtr.buffer();
        let _ = writeln!(&mut buffer, "    {}", message);
        self.bufwtr.print(&buffer)
    }

    /// Print one line of tool output, dimmed
    pub fn tool_line(&self, line: &str) -> std::io::Result<()> {
        let mut buffer = self.bufwtr.buffer();
        let _ = buffer.set_color(ColorSpec::new().set_dimmed(true));
        let _ = writeln!(&mut buffer, "    {}", line);
        let _ = buffer.reset();
        self.bufwtr.print(&buffer)
    }

    /// Print a plain message
    pub fn println(&self, message: &str) -> std::io::Result<()> {
        let mut buffer = self.bufwtr.buffer();
        let _ = writeln!(&mut buffer, "{}", message);
        self.bufwtr.print(&buffer)
    }

    /// Open a collapsible log group (CI only)
    pub fn group(&self, title: &str) {
        if self.ci {
            let _ = self.println(&format!("::group::{}", escape_data(title)));
        }
    }

    /// Close the current log group (CI only)
    pub fn end_group(&self) {
        if self.ci {
            let _ = self.println("::endgroup::");
        }
    }

    /// Emit an error annotation on the workflow run (CI only)
    pub fn annotate_error(&self, title: &str, message: &str) {
        if self.ci {
            let _ = self.println(&format!(
                "::error title={}::{}",
                escape_property(title),
                escape_data(message)
            ));
        }
    }
}

/// Escape a workflow command message
fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Escape a workflow command property value
fn escape_property(value: &str) -> String {
    escape_data(value).replace(':', "%3A").replace(',', "%2C")
}
