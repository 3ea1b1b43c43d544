// blinkzero-cli/src/rendering.rs
use anyhow::Result;
use lazy_static::lazy_static;
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use std::io::{self, Write};
use syntect::{
    easy::HighlightLines,
    highlighting::{Color as SyntectColor, FontStyle, Style, Theme, ThemeSet},
    parsing::SyntaxSet,
    util::LinesWithEndings,
};
use termimad::{
    crossterm::style::{Attribute, Color, ResetColor, SetAttribute, SetForegroundColor},
    MadSkin,
};

use pulldown_cmark_to_cmark::cmark;

lazy_static! {
    static ref SYNTAX_SET: SyntaxSet = SyntaxSet::load_defaults_newlines();
    static ref THEME_SET: ThemeSet = ThemeSet::load_defaults();
    static ref CODE_THEME: &'static Theme = &THEME_SET.themes["base16-ocean.dark"];
}

fn syntect_to_crossterm_color(color: SyntectColor) -> Option<Color> {
    if color.a == 0 {
        None
    } else {
        Some(Color::Rgb {
            r: color.r,
            g: color.g,
            b: color.b,
        })
    }
}

/// Maps editor language ids and fence tags onto syntect tokens.
fn syntax_token(language: &str) -> String {
    let lower = language.to_lowercase();
    let token = match lower.as_str() {
        "shell" | "shellscript" | "bash" | "sh" => "bash",
        "javascript" | "js" => "js",
        "typescript" | "ts" => "ts",
        "python" | "py" => "py",
        "yaml" | "yml" => "yaml",
        "html" | "htm" => "html",
        "csharp" | "cs" => "cs",
        "cpp" | "c++" => "cpp",
        "rust" | "rs" => "rs",
        "markdown" | "md" => "md",
        "ruby" | "rb" => "rb",
        "diff" | "patch" => "diff",
        other => other,
    };
    token.to_string()
}

/// Writes `code` with terminal syntax highlighting. Unknown languages render as plain text.
pub fn highlight_code<W: Write>(writer: &mut W, code: &str, language: Option<&str>) -> Result<(), io::Error> {
    let syntax = language
        .map(syntax_token)
        .and_then(|token| SYNTAX_SET.find_syntax_by_token(&token))
        .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text());
    let mut highlighter = HighlightLines::new(syntax, &CODE_THEME);

    for line in LinesWithEndings::from(code) {
        let ranges: Vec<(Style, &str)> = highlighter
            .highlight_line(line, &SYNTAX_SET)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        for (style, content) in ranges {
            match syntect_to_crossterm_color(style.foreground) {
                Some(fg) => write!(writer, "{}", SetForegroundColor(fg))?,
                None => write!(writer, "{}", ResetColor)?,
            }
            let bold = style.font_style.contains(FontStyle::BOLD);
            if bold {
                write!(writer, "{}", SetAttribute(Attribute::Bold))?;
            }
            if style.font_style.contains(FontStyle::ITALIC) {
                write!(writer, "{}", SetAttribute(Attribute::Italic))?;
            }
            write!(writer, "{}", content)?;
            write!(writer, "{}{}", SetAttribute(Attribute::Reset), ResetColor)?;
        }
    }
    write!(writer, "{}", ResetColor)?;
    Ok(())
}

fn create_skin() -> MadSkin {
    let mut skin = MadSkin::default();
    skin.inline_code.set_fg(Color::Cyan);
    skin.inline_code.set_bg(Color::Reset);
    skin.code_block.set_fg(Color::Reset);
    skin.code_block.set_bg(Color::Reset);
    skin
}

/// Renders buffered non-code events through termimad.
fn flush_markdown_buffer<W: Write>(events: &mut Vec<Event<'_>>, skin: &MadSkin, writer: &mut W) -> Result<(), io::Error> {
    if events.is_empty() {
        return Ok(());
    }
    let mut md_string = String::new();
    cmark(events.iter(), &mut md_string).map_err(|e| {
        io::Error::new(io::ErrorKind::Other, format!("Markdown generation error: {}", e))
    })?;
    skin.write_text_on(writer, &md_string).map_err(|e| {
        io::Error::new(io::ErrorKind::Other, format!("Termimad rendering error: {}", e))
    })?;
    events.clear();
    Ok(())
}

/// Markdown to `writer`: prose through termimad, fenced code through syntect.
pub fn write_formatted<W: Write>(writer: &mut W, markdown_text: &str) -> Result<()> {
    let skin = create_skin();
    let parser = Parser::new_ext(markdown_text, Options::empty());

    let mut event_buffer: Vec<Event<'_>> = Vec::new();
    let mut code_buffer = String::new();
    let mut current_language: Option<String> = None;
    let mut in_code_block = false;

    for event in parser {
        match &event {
            Event::Start(Tag::CodeBlock(kind)) => {
                flush_markdown_buffer(&mut event_buffer, &skin, writer)?;
                in_code_block = true;
                current_language = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                    _ => None,
                };
                code_buffer.clear();
                writeln!(writer)?;
            }
            Event::End(TagEnd::CodeBlock) if in_code_block => {
                highlight_code(writer, &code_buffer, current_language.as_deref())?;
                in_code_block = false;
                code_buffer.clear();
                current_language = None;
                writeln!(writer)?;
            }
            Event::Text(text) if in_code_block => code_buffer.push_str(text),
            _ if in_code_block => {}
            _ => event_buffer.push(event.clone()),
        }
    }

    flush_markdown_buffer(&mut event_buffer, &skin, writer)?;
    Ok(())
}

pub fn print_formatted(markdown_text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    write_formatted(&mut stdout, markdown_text)
}

/// Prints a whole document as highlighted source.
pub fn print_code(code: &str, language: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    highlight_code(&mut stdout, code, Some(language))?;
    writeln!(stdout)?;
    Ok(())
}
