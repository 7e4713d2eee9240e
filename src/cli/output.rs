/// Terminal output: banners, status lines, boxes and the answer block.
use std::io::Write;

use crossterm::style::Stylize;

use crate::source::SourceKind;

pub const APP_NAME: &str = "RAG Chat";

const CHECK: &str = "✓";
const CROSS: &str = "✗";
const ARROW: &str = "➤";
const DOT: &str = "•";
const STAR: &str = "✭";

const ANSWER_RULE_WIDTH: usize = 50;

fn width_of(s: &str) -> usize {
    s.chars().count()
}

fn pad(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(width_of(s));
    format!("{s}{}", " ".repeat(fill))
}

fn terminal_width() -> usize {
    crossterm::terminal::size()
        .map(|(cols, _)| usize::from(cols))
        .unwrap_or(80)
}

pub fn banner(source: SourceKind) {
    let text = match source {
        SourceKind::None => format!("Welcome to {APP_NAME} with OpenAI"),
        other => format!("Welcome to {APP_NAME} with {} and OpenAI", other.display_name()),
    };
    let padding = 4;
    let inner = width_of(&text) + padding * 2;
    let spaces = " ".repeat(padding);

    println!();
    println!("{}", format!("╔{}╗", "═".repeat(inner)).cyan());
    println!("{}{spaces}{}{spaces}{}", "║".cyan(), text.yellow(), "║".cyan());
    println!("{}", format!("╚{}╝", "═".repeat(inner)).cyan());
    println!();
}

pub fn success(message: &str) {
    println!("{} {message}", CHECK.green());
}

pub fn error(message: &str) {
    println!("{} {message}", CROSS.red());
}

pub fn info(message: &str) {
    println!("{} {message}", DOT.cyan());
}

pub fn warning(message: &str) {
    println!("{}  {message}", "⚠".yellow());
}

pub fn section_header(title: &str) {
    println!();
    println!("{}", title.blue().bold());
    println!("{}", "─".repeat(width_of(title)).dark_grey());
}

/// A titled box of plain-text lines drawn in red.
pub fn error_box(title: &str, items: &[String]) {
    let width = items
        .iter()
        .map(|i| width_of(i) + 2)
        .chain(std::iter::once(width_of(title)))
        .max()
        .unwrap_or(0)
        + 4;
    let rule = "─".repeat(width + 2);

    println!();
    println!("{}", format!("╭{rule}╮").red());
    println!("{} {} {}", "│".red(), pad(title, width).bold(), "│".red());
    println!("{}", format!("├{rule}┤").red());
    for item in items {
        println!(
            "{} {} {} {}",
            "│".red(),
            CROSS.red(),
            pad(item, width - 2),
            "│".red()
        );
    }
    println!("{}", format!("╰{rule}╯").red());
}

/// One line per entry: ✓ when set, ✗ when missing.
pub fn status_box(statuses: &[(bool, String)]) {
    let width = statuses
        .iter()
        .map(|(_, m)| width_of(m))
        .max()
        .unwrap_or(0)
        + 10;
    let rule = "─".repeat(width + 2);

    println!();
    println!("{}", format!("┌{rule}┐").dark_grey());
    for (ok, message) in statuses {
        let icon = if *ok { CHECK.green() } else { CROSS.red() };
        println!(
            "{} {icon} {} {}",
            "│".dark_grey(),
            pad(message, width - 2),
            "│".dark_grey()
        );
    }
    println!("{}", format!("└{rule}┘").dark_grey());
}

pub fn environment_error(missing: &[String]) {
    error("Missing required environment variables");
    error_box("Required Environment Variables", missing);
    println!();
    println!("{}", "Please set these variables in your .env file".yellow());
}

/// Print the input prompt without a trailing newline.
pub fn prompt(label: &str) {
    print!("\n{} {} ", ARROW.cyan(), format!("{label}:").bold());
    let _ = std::io::stdout().flush();
}

pub fn separator() {
    println!("{}", "─".repeat(terminal_width()).dark_grey());
}

pub fn retrieving(question: &str) {
    println!();
    println!(
        "{} {}",
        format!("{DOT} Retrieving documents for:").cyan(),
        format!("\"{question}\"").white()
    );
}

pub fn document_count(count: usize) {
    if count > 0 {
        let plural = if count == 1 { "" } else { "s" };
        println!(
            "{}",
            format!("{CHECK} Found {count} relevant document{plural}").green()
        );
    } else {
        println!("{}", format!("{DOT} No documents found").yellow());
    }
}

pub fn generating() {
    println!("{}", format!("{DOT} Generating answer...").cyan());
}

pub fn answer(answer: &str) {
    let rule = "─".repeat(ANSWER_RULE_WIDTH);
    println!();
    println!("{}", "Answer:".green().bold());
    println!("{}", rule.as_str().dark_grey());
    println!("{answer}");
    println!("{}", rule.as_str().dark_grey());
}

pub fn exit_instructions() {
    println!();
    println!("{}", "Type 'quit' or 'exit' to end the session".dark_grey());
    println!("{}", "Press Ctrl+C to cancel current operation".dark_grey());
}

pub fn goodbye() {
    println!();
    println!(
        "{}",
        format!("{STAR} Thank you for using {APP_NAME}!").cyan()
    );
    println!("{}", "Goodbye!".dark_grey());
    println!();
}
