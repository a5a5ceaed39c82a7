//! Styled terminal output for the CLI.
//!
//! Uses `anstyle` for style definitions and `anstream` for auto-detecting
//! terminal capabilities (honors `NO_COLOR` and degrades to plain text when
//! piped) instead of hand-rolling ANSI escapes.

use std::io::Write;

use anstyle::{AnsiColor, Effects, Style};

const SUCCESS: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Green)));
const ERROR: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Red)));
const WARNING: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Yellow)));
const HEADER: Style = Style::new().effects(Effects::BOLD);
const LABEL: Style = Style::new().effects(Effects::BOLD);
const DIM: Style = Style::new().effects(Effects::DIMMED);

pub fn success(msg: impl std::fmt::Display) {
    let mut out = anstream::stdout().lock();
    writeln!(out, "{SUCCESS}✓ {msg}{SUCCESS:#}").ok();
}

pub fn error(msg: impl std::fmt::Display) {
    let mut out = anstream::stderr().lock();
    writeln!(out, "{ERROR}✗ {msg}{ERROR:#}").ok();
}

pub fn warning(msg: impl std::fmt::Display) {
    let mut out = anstream::stdout().lock();
    writeln!(out, "{WARNING}! {msg}{WARNING:#}").ok();
}

pub fn header(msg: impl std::fmt::Display) {
    let mut out = anstream::stdout().lock();
    writeln!(out, "{HEADER}{msg}{HEADER:#}").ok();
}

pub fn label(name: impl std::fmt::Display, value: impl std::fmt::Display) {
    let mut out = anstream::stdout().lock();
    writeln!(out, "  {LABEL}{name}:{LABEL:#} {value}").ok();
}

pub fn dim(msg: impl std::fmt::Display) {
    let mut out = anstream::stdout().lock();
    writeln!(out, "{DIM}{msg}{DIM:#}").ok();
}

pub fn item(msg: impl std::fmt::Display) {
    let mut out = anstream::stdout().lock();
    writeln!(out, "  • {msg}").ok();
}

pub fn blank() {
    let mut out = anstream::stdout().lock();
    writeln!(out).ok();
}

pub fn plain(msg: impl std::fmt::Display) {
    let mut out = anstream::stdout().lock();
    writeln!(out, "{msg}").ok();
}

/// Custom clap help styling matching the CLI's palette.
pub fn clap_styles() -> clap::builder::Styles {
    clap::builder::Styles::styled()
        .header(Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Green))).effects(Effects::BOLD))
        .usage(Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Green))).effects(Effects::BOLD))
        .literal(Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Cyan))))
        .placeholder(Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Cyan))))
        .error(Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Red))).effects(Effects::BOLD))
        .valid(Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Green))))
        .invalid(Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Yellow))))
}
